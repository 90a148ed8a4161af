//! List views binding the store, a paginator and the filter state of one
//! collection.
//!
//! Every interaction is split in two halves so the caller can decide whether
//! to await the network inline or run it as a background task: the `request`
//! half updates local state and returns the work to do (`PageFetch`,
//! `PendingQuery`), the `apply` half folds the answer back in. Query answers
//! carry a ticket and are dropped when a newer query was issued meanwhile.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::client::{ClientError, CollectionSource, RemoteQuery};
use crate::context::AppContext;
use crate::filter::{self, FilterField, FilterPolicy, FilterState, RequestSequencer, Ticket};
use crate::model::{CollectionKind, PageSize, Record};
use crate::pagination::{PageSlot, Paginator, DEFAULT_MAX_VISIBLE};
use crate::store::{DataStore, FetchOutcome};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ViewError {
    #[error("filter '{field}' does not apply to {kind}")]
    FieldNotApplicable {
        field: FilterField,
        kind: CollectionKind,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ViewOptions {
    pub max_visible_pages: u32,
    pub policy: FilterPolicy,
}

impl Default for ViewOptions {
    fn default() -> Self {
        Self {
            max_visible_pages: DEFAULT_MAX_VISIBLE,
            policy: FilterPolicy::default(),
        }
    }
}

/// A page load the view wants performed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageFetch {
    pub kind: CollectionKind,
    pub page: u32,
    pub size: PageSize,
}

impl PageFetch {
    pub async fn run(self, store: &DataStore) -> FetchOutcome {
        store.fetch_collection(self.kind, self.page, self.size).await
    }
}

/// A remote search/filter the view is waiting on.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingQuery {
    pub ticket: Ticket,
    pub kind: CollectionKind,
    pub query: RemoteQuery,
}

impl PendingQuery {
    pub async fn run(self, source: &dyn CollectionSource) -> QueryCompletion {
        let result = source.query(self.kind, &self.query).await;
        QueryCompletion {
            ticket: self.ticket,
            kind: self.kind,
            query: self.query,
            result,
        }
    }
}

#[derive(Clone, Debug)]
pub struct QueryCompletion {
    pub ticket: Ticket,
    pub kind: CollectionKind,
    pub query: RemoteQuery,
    pub result: Result<Vec<Record>, ClientError>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Navigation {
    /// Target outside `1..=total_pages`; nothing happened.
    Ignored,
    Fetched(FetchOutcome),
}

#[derive(Clone, Debug)]
struct RemoteRows {
    query: RemoteQuery,
    records: Vec<Record>,
}

pub struct ListView {
    kind: CollectionKind,
    store: Arc<DataStore>,
    options: ViewOptions,
    paginator: Paginator,
    filters: FilterState,
    page_records: Vec<Record>,
    remote: Option<RemoteRows>,
    pending: Option<Ticket>,
    sequencer: RequestSequencer,
    rows: Vec<Record>,
}

impl ListView {
    pub fn new(kind: CollectionKind, store: Arc<DataStore>, options: ViewOptions) -> Self {
        Self {
            kind,
            store,
            options,
            paginator: Paginator::default(),
            filters: FilterState::default(),
            page_records: Vec::new(),
            remote: None,
            pending: None,
            sequencer: RequestSequencer::new(),
            rows: Vec::new(),
        }
    }

    /// Draw query tickets from `sequencer` instead of a private one.
    pub fn with_sequencer(mut self, sequencer: RequestSequencer) -> Self {
        self.sequencer = sequencer;
        self
    }

    pub fn users(ctx: &AppContext) -> Self {
        Self::new(CollectionKind::Users, ctx.store(), ctx.view_options())
            .with_sequencer(ctx.sequencer())
    }

    pub fn products(ctx: &AppContext) -> Self {
        Self::new(CollectionKind::Products, ctx.store(), ctx.view_options())
            .with_sequencer(ctx.sequencer())
    }

    pub fn kind(&self) -> CollectionKind {
        self.kind
    }

    pub fn rows(&self) -> &[Record] {
        &self.rows
    }

    pub fn paginator(&self) -> &Paginator {
        &self.paginator
    }

    pub fn filters(&self) -> &FilterState {
        &self.filters
    }

    pub fn options(&self) -> &ViewOptions {
        &self.options
    }

    pub fn is_waiting_on_query(&self) -> bool {
        self.pending.is_some()
    }

    pub fn window(&self) -> Vec<PageSlot> {
        self.paginator.window(self.options.max_visible_pages)
    }

    /// Whether the pagination bar belongs under the rows.
    pub fn show_pagination(&self) -> bool {
        !(self.options.policy.suppress_pagination_when_filtered
            && self.filters.has_structured_filters())
    }

    /// Reset to a fresh first page at the store's page size, dropping any
    /// filter state left from a previous mount.
    pub async fn prepare_mount(&mut self) -> PageFetch {
        let size = self.store.page_size().await;
        self.paginator = Paginator::new(size);
        self.filters.clear();
        self.remote = None;
        self.pending = None;
        self.sequencer.invalidate();
        info!(collection = %self.kind, size = size.get(), "mounting view");
        self.current_fetch()
    }

    pub async fn mount(&mut self) -> FetchOutcome {
        let fetch = self.prepare_mount().await;
        self.load(fetch).await
    }

    pub fn current_fetch(&self) -> PageFetch {
        PageFetch {
            kind: self.kind,
            page: self.paginator.current_page(),
            size: self.paginator.page_size(),
        }
    }

    async fn load(&mut self, fetch: PageFetch) -> FetchOutcome {
        let outcome = fetch.run(&self.store).await;
        self.sync_from_store().await;
        outcome
    }

    /// Re-derive rows from whatever the store currently holds for this
    /// collection.
    pub async fn sync_from_store(&mut self) {
        let snapshot = self.store.snapshot(self.kind).await;
        self.page_records = snapshot.records;
        self.paginator.set_total_items(snapshot.total);
        if let Some(request) = snapshot.request {
            if request.size == self.paginator.page_size() {
                self.paginator.set_page(request.page);
            }
        }
        self.derive_rows();
    }

    pub fn request_page(&mut self, target: u32) -> Option<PageFetch> {
        if !self.paginator.set_page(target) {
            debug!(
                collection = %self.kind,
                target,
                total_pages = self.paginator.total_pages(),
                "ignoring out-of-range page"
            );
            return None;
        }
        Some(self.current_fetch())
    }

    pub fn request_next(&mut self) -> Option<PageFetch> {
        self.request_page(self.paginator.current_page().saturating_add(1))
    }

    pub fn request_previous(&mut self) -> Option<PageFetch> {
        self.request_page(self.paginator.current_page().saturating_sub(1))
    }

    pub async fn request_page_size(&mut self, size: PageSize) -> PageFetch {
        self.store.set_page_size(size).await;
        self.paginator.set_page_size(size);
        self.current_fetch()
    }

    pub async fn go_to_page(&mut self, target: u32) -> Navigation {
        match self.request_page(target) {
            Some(fetch) => Navigation::Fetched(self.load(fetch).await),
            None => Navigation::Ignored,
        }
    }

    pub async fn next_page(&mut self) -> Navigation {
        let target = self.paginator.current_page().saturating_add(1);
        self.go_to_page(target).await
    }

    pub async fn previous_page(&mut self) -> Navigation {
        let target = self.paginator.current_page().saturating_sub(1);
        self.go_to_page(target).await
    }

    pub async fn change_page_size(&mut self, size: PageSize) -> FetchOutcome {
        let fetch = self.request_page_size(size).await;
        self.load(fetch).await
    }

    pub fn request_search(&mut self, term: &str) -> Option<PendingQuery> {
        self.filters.set_search(term);
        self.refilter()
    }

    pub fn request_filter(
        &mut self,
        field: FilterField,
        value: &str,
    ) -> Result<Option<PendingQuery>, ViewError> {
        self.check_field(field)?;
        self.filters
            .set_filter(field, value, self.options.policy.exclusive_filters);
        Ok(self.refilter())
    }

    pub fn request_clear_filter(
        &mut self,
        field: FilterField,
    ) -> Result<Option<PendingQuery>, ViewError> {
        self.check_field(field)?;
        self.filters.clear_filter(field);
        Ok(self.refilter())
    }

    pub fn request_clear_all(&mut self) -> Option<PendingQuery> {
        self.filters.clear();
        self.refilter()
    }

    pub async fn search(&mut self, term: &str) {
        let pending = self.request_search(term);
        self.settle(pending).await;
    }

    pub async fn set_filter(&mut self, field: FilterField, value: &str) -> Result<(), ViewError> {
        let pending = self.request_filter(field, value)?;
        self.settle(pending).await;
        Ok(())
    }

    pub async fn clear_filter(&mut self, field: FilterField) -> Result<(), ViewError> {
        let pending = self.request_clear_filter(field)?;
        self.settle(pending).await;
        Ok(())
    }

    pub async fn clear_filters(&mut self) {
        let pending = self.request_clear_all();
        self.settle(pending).await;
    }

    async fn settle(&mut self, pending: Option<PendingQuery>) {
        if let Some(pending) = pending {
            let source = self.store.source();
            let completion = pending.run(source.as_ref()).await;
            self.apply_query(completion);
        }
    }

    /// Fold a remote answer in. Returns `false` when the answer belongs to a
    /// superseded query and was dropped.
    pub fn apply_query(&mut self, completion: QueryCompletion) -> bool {
        if completion.kind != self.kind || !self.sequencer.is_current(completion.ticket) {
            debug!(
                collection = %self.kind,
                ticket = completion.ticket.value(),
                "dropping superseded query result"
            );
            return false;
        }
        self.pending = None;
        let records = match completion.result {
            Ok(records) => records,
            Err(error) => {
                warn!(
                    collection = %self.kind,
                    query = ?completion.query,
                    error = %error,
                    "remote query failed, showing no rows"
                );
                Vec::new()
            }
        };
        self.remote = Some(RemoteRows {
            query: completion.query,
            records,
        });
        self.derive_rows();
        true
    }

    fn check_field(&self, field: FilterField) -> Result<(), ViewError> {
        if field.applies_to(self.kind) {
            Ok(())
        } else {
            Err(ViewError::FieldNotApplicable {
                field,
                kind: self.kind,
            })
        }
    }

    fn refilter(&mut self) -> Option<PendingQuery> {
        let wanted = self.filters.remote_query(&self.options.policy);
        let pending = match wanted {
            None => {
                self.remote = None;
                self.pending = None;
                self.sequencer.invalidate();
                None
            }
            Some(query)
                if self.pending.is_none()
                    && self.remote.as_ref().is_some_and(|r| r.query == query) =>
            {
                None
            }
            Some(query) => {
                let ticket = self.sequencer.issue();
                self.remote = None;
                self.pending = Some(ticket);
                debug!(
                    collection = %self.kind,
                    ?query,
                    ticket = ticket.value(),
                    "issuing remote query"
                );
                Some(PendingQuery {
                    ticket,
                    kind: self.kind,
                    query,
                })
            }
        };
        self.derive_rows();
        pending
    }

    fn derive_rows(&mut self) {
        self.rows = match &self.remote {
            Some(remote) => filter::compose(&remote.records, &self.filters, Some(&remote.query)),
            None => filter::compose(&self.page_records, &self.filters, None),
        };
    }
}
