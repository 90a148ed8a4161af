//! Shared data store.
//!
//! Holds the latest applied page of every collection and the shared page
//! size. Every fetch is numbered per collection; a response is applied only
//! when it is newer than the last applied one, and starting a fetch aborts the
//! one still in flight for the same collection.

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::{AbortHandle, Abortable};
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info, warn};

use crate::client::{ClientError, CollectionSource};
use crate::model::{CollectionKind, PageRequest, PageSize, Record};

const EVENT_CAPACITY: usize = 64;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StoreEvent {
    CollectionUpdated(CollectionKind),
    PageSizeChanged(PageSize),
    FetchFailed {
        kind: CollectionKind,
        message: String,
    },
    ShutDown,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FetchOutcome {
    Applied,
    /// A newer response for the same collection was applied first.
    Superseded,
    /// Aborted by a newer fetch or by shutdown.
    Cancelled,
    /// Transport or decode failure; the previous records were kept.
    Failed(ClientError),
}

impl FetchOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied)
    }
}

/// Records and total of one collection as last applied.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CollectionSnapshot {
    pub records: Vec<Record>,
    pub total: u64,
    /// Request that produced `records`, `None` until the first fetch lands.
    pub request: Option<PageRequest>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StoreOptions {
    pub page_size: PageSize,
    /// Abort the in-flight fetch of a collection when a new one starts.
    pub cancel_superseded: bool,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            page_size: PageSize::default(),
            cancel_superseded: true,
        }
    }
}

#[derive(Default)]
struct CollectionSlot {
    snapshot: CollectionSnapshot,
    issued: u64,
    applied: u64,
    in_flight: Vec<(u64, AbortHandle)>,
}

struct StoreState {
    page_size: PageSize,
    slots: HashMap<CollectionKind, CollectionSlot>,
    shut_down: bool,
}

impl StoreState {
    fn slot_mut(&mut self, kind: CollectionKind) -> &mut CollectionSlot {
        self.slots.entry(kind).or_default()
    }
}

pub struct DataStore {
    source: Arc<dyn CollectionSource>,
    options: StoreOptions,
    state: Mutex<StoreState>,
    events: broadcast::Sender<StoreEvent>,
}

impl DataStore {
    pub fn new(source: Arc<dyn CollectionSource>, options: StoreOptions) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            source,
            options,
            state: Mutex::new(StoreState {
                page_size: options.page_size,
                slots: HashMap::new(),
                shut_down: false,
            }),
            events,
        }
    }

    pub fn source(&self) -> Arc<dyn CollectionSource> {
        Arc::clone(&self.source)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    fn emit(&self, event: StoreEvent) {
        // No subscribers is fine: nothing is mounted yet.
        let _ = self.events.send(event);
    }

    pub async fn page_size(&self) -> PageSize {
        self.state.lock().await.page_size
    }

    pub async fn set_page_size(&self, size: PageSize) {
        let mut state = self.state.lock().await;
        if state.page_size == size {
            return;
        }
        state.page_size = size;
        drop(state);
        info!(size = size.get(), "page size changed");
        self.emit(StoreEvent::PageSizeChanged(size));
    }

    pub async fn snapshot(&self, kind: CollectionKind) -> CollectionSnapshot {
        let state = self.state.lock().await;
        state
            .slots
            .get(&kind)
            .map(|slot| slot.snapshot.clone())
            .unwrap_or_default()
    }

    /// Fetch `page` of `kind` at `size` and apply it when it is still the
    /// newest response. Failures are logged and leave the previous records in
    /// place.
    pub async fn fetch_collection(
        &self,
        kind: CollectionKind,
        page: u32,
        size: PageSize,
    ) -> FetchOutcome {
        let request = PageRequest::new(page, size);
        let (seq, registration) = {
            let mut state = self.state.lock().await;
            if state.shut_down {
                return FetchOutcome::Cancelled;
            }
            let cancel_superseded = self.options.cancel_superseded;
            let slot = state.slot_mut(kind);
            slot.issued += 1;
            let seq = slot.issued;
            if cancel_superseded {
                for (previous, handle) in slot.in_flight.drain(..) {
                    debug!(collection = %kind, seq = previous, "aborting superseded fetch");
                    handle.abort();
                }
            }
            let (handle, registration) = AbortHandle::new_pair();
            slot.in_flight.push((seq, handle));
            (seq, registration)
        };

        debug!(collection = %kind, page = request.page, size = size.get(), seq, "fetching page");
        let result = Abortable::new(self.source.fetch_page(kind, request), registration).await;

        let mut state = self.state.lock().await;
        let slot = state.slot_mut(kind);
        slot.in_flight.retain(|(s, _)| *s != seq);

        let page_result = match result {
            Err(_aborted) => {
                debug!(collection = %kind, seq, "fetch cancelled");
                return FetchOutcome::Cancelled;
            }
            Ok(Err(error)) => {
                drop(state);
                warn!(
                    collection = %kind,
                    page = request.page,
                    error = %error,
                    "fetch failed, keeping previous records"
                );
                self.emit(StoreEvent::FetchFailed {
                    kind,
                    message: error.to_string(),
                });
                return FetchOutcome::Failed(error);
            }
            Ok(Ok(page_result)) => page_result,
        };

        if seq <= slot.applied {
            debug!(
                collection = %kind,
                seq,
                applied = slot.applied,
                "discarding stale response"
            );
            return FetchOutcome::Superseded;
        }

        slot.applied = seq;
        debug!(
            collection = %kind,
            records = page_result.records.len(),
            total = page_result.total,
            "applying page"
        );
        slot.snapshot = CollectionSnapshot {
            records: page_result.records,
            total: page_result.total,
            request: Some(request),
        };
        drop(state);
        self.emit(StoreEvent::CollectionUpdated(kind));
        FetchOutcome::Applied
    }

    /// Abort everything in flight and refuse further fetches.
    pub async fn shutdown(&self) {
        let mut state = self.state.lock().await;
        if state.shut_down {
            return;
        }
        state.shut_down = true;
        for slot in state.slots.values_mut() {
            for (_, handle) in slot.in_flight.drain(..) {
                handle.abort();
            }
        }
        drop(state);
        info!("store shut down");
        self.emit(StoreEvent::ShutDown);
    }

    pub async fn is_shut_down(&self) -> bool {
        self.state.lock().await.shut_down
    }
}
