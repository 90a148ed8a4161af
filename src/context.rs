use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::debug;

use crate::client::{http, ClientError, CollectionSource, HttpCollectionSource, HttpOptions};
use crate::filter::{FilterPolicy, RequestSequencer, SearchMode};
use crate::model::{CollectionKind, PageSize};
use crate::pagination::DEFAULT_MAX_VISIBLE;
use crate::store::{DataStore, StoreOptions};
use crate::view::{ListView, ViewOptions};

#[derive(Clone, Debug)]
pub struct Options {
    pub base_url: String,
    pub timeout_seconds: u64,
    pub proxy: Option<String>,
    pub user_agent: Option<String>,
    pub page_size: PageSize,
    pub max_visible_pages: u32,
    pub search_mode: SearchMode,
    pub exclusive_filters: bool,
    pub suppress_pagination_when_filtered: bool,
    pub cancel_superseded_fetches: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            base_url: http::DEFAULT_BASE_URL.to_string(),
            timeout_seconds: 10,
            proxy: None,
            user_agent: None,
            page_size: PageSize::Five,
            max_visible_pages: DEFAULT_MAX_VISIBLE,
            search_mode: SearchMode::Local,
            exclusive_filters: true,
            suppress_pagination_when_filtered: false,
            cancel_superseded_fetches: true,
        }
    }
}

#[derive(Debug, Error)]
pub enum ContextError {
    #[error("invalid base URL: {url}")]
    InvalidBaseUrl { url: String },

    #[error("invalid max_visible_pages {value}, expected positive integer")]
    InvalidMaxVisiblePages { value: u32 },

    #[error("invalid timeout {value}, expected positive number of seconds")]
    InvalidTimeout { value: u64 },

    #[error("failed to build HTTP client: {source}")]
    HttpClientBuild {
        #[source]
        source: ClientError,
    },
}

/// Everything the views share: options, the collection source and the
/// store. Created once at start-up and shut down on exit.
///
/// Every view built from the context draws query tickets from the same
/// sequencer, so a view created later never reuses an earlier view's ticket.
pub struct AppContext {
    options: Options,
    store: Arc<DataStore>,
    sequencer: RequestSequencer,
}

impl AppContext {
    pub fn new(options: Options) -> Result<Self, ContextError> {
        validate(&options)?;
        let base_url =
            reqwest::Url::parse(options.base_url.trim()).map_err(|_| ContextError::InvalidBaseUrl {
                url: options.base_url.clone(),
            })?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(ContextError::InvalidBaseUrl {
                url: options.base_url.clone(),
            });
        }

        let mut http_options = HttpOptions::new(base_url);
        http_options.timeout = Duration::from_secs(options.timeout_seconds);
        http_options.proxy = options.proxy.clone();
        if let Some(user_agent) = options.user_agent.as_deref().filter(|u| !u.trim().is_empty()) {
            http_options.user_agent = user_agent.to_string();
        }
        let source = HttpCollectionSource::new(http_options)
            .map_err(|source| ContextError::HttpClientBuild { source })?;
        Self::with_source(options, Arc::new(source))
    }

    /// Build a context around an existing source.
    pub fn with_source(
        options: Options,
        source: Arc<dyn CollectionSource>,
    ) -> Result<Self, ContextError> {
        validate(&options)?;
        let store = DataStore::new(
            source,
            StoreOptions {
                page_size: options.page_size,
                cancel_superseded: options.cancel_superseded_fetches,
            },
        );
        debug!(base_url = %options.base_url, "context created");
        Ok(Self {
            options,
            store: Arc::new(store),
            sequencer: RequestSequencer::new(),
        })
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn store(&self) -> Arc<DataStore> {
        Arc::clone(&self.store)
    }

    pub fn sequencer(&self) -> RequestSequencer {
        self.sequencer.clone()
    }

    pub fn source(&self) -> Arc<dyn CollectionSource> {
        self.store.source()
    }

    pub fn view_options(&self) -> ViewOptions {
        ViewOptions {
            max_visible_pages: self.options.max_visible_pages,
            policy: FilterPolicy {
                search_mode: self.options.search_mode,
                exclusive_filters: self.options.exclusive_filters,
                suppress_pagination_when_filtered: self
                    .options
                    .suppress_pagination_when_filtered,
            },
        }
    }

    pub fn view(&self, kind: CollectionKind) -> ListView {
        match kind {
            CollectionKind::Users => ListView::users(self),
            CollectionKind::Products => ListView::products(self),
        }
    }

    pub async fn shutdown(&self) {
        self.store.shutdown().await;
    }
}

fn validate(options: &Options) -> Result<(), ContextError> {
    if options.max_visible_pages == 0 {
        return Err(ContextError::InvalidMaxVisiblePages {
            value: options.max_visible_pages,
        });
    }
    if options.timeout_seconds == 0 {
        return Err(ContextError::InvalidTimeout {
            value: options.timeout_seconds,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::fake::FakeSource;

    #[test]
    fn rejects_non_http_base_url() {
        let options = Options {
            base_url: "ftp://dummyjson.com".to_string(),
            ..Options::default()
        };
        assert!(matches!(
            AppContext::new(options),
            Err(ContextError::InvalidBaseUrl { .. })
        ));
    }

    #[test]
    fn rejects_zero_window() {
        let options = Options {
            max_visible_pages: 0,
            ..Options::default()
        };
        assert!(matches!(
            AppContext::with_source(options, Arc::new(FakeSource::new())),
            Err(ContextError::InvalidMaxVisiblePages { value: 0 })
        ));
    }

    #[tokio::test]
    async fn views_inherit_context_policy_and_page_size() {
        let options = Options {
            page_size: PageSize::Twenty,
            suppress_pagination_when_filtered: true,
            max_visible_pages: 7,
            ..Options::default()
        };
        let ctx = AppContext::with_source(options, Arc::new(FakeSource::new())).unwrap();
        let view = ctx.view(CollectionKind::Products);
        assert_eq!(view.kind(), CollectionKind::Products);
        assert_eq!(view.options().max_visible_pages, 7);
        assert!(view.options().policy.suppress_pagination_when_filtered);
        assert_eq!(ctx.store().page_size().await, PageSize::Twenty);

        ctx.shutdown().await;
        assert!(ctx.store().is_shut_down().await);
    }
}
