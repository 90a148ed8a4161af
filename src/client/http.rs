//! Reqwest-backed collection source.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use tracing::debug;

use super::dto;
use super::{ClientError, CollectionSource, RemoteQuery};
use crate::model::{CollectionKind, PageRequest, PageResult, Record};

pub const DEFAULT_BASE_URL: &str = "https://dummyjson.com";
pub const DEFAULT_USER_AGENT: &str = concat!("catalog-browser/", env!("CARGO_PKG_VERSION"));
const MAX_ERROR_BODY: usize = 256;

#[derive(Clone, Debug)]
pub struct HttpOptions {
    pub base_url: Url,
    pub timeout: Duration,
    pub proxy: Option<String>,
    pub user_agent: String,
}

impl HttpOptions {
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            timeout: Duration::from_secs(10),
            proxy: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

pub struct HttpCollectionSource {
    client: Client,
    base_url: Url,
}

impl HttpCollectionSource {
    pub fn new(options: HttpOptions) -> Result<Self, ClientError> {
        let mut headers = reqwest::header::HeaderMap::new();
        let user_agent = reqwest::header::HeaderValue::from_str(&options.user_agent)
            .map_err(|_| ClientError::invalid_request("user agent is not a valid header value"))?;
        headers.insert(reqwest::header::USER_AGENT, user_agent);
        headers.insert(
            reqwest::header::ACCEPT,
            reqwest::header::HeaderValue::from_static("application/json"),
        );

        let mut builder = Client::builder()
            .default_headers(headers)
            .timeout(options.timeout);

        if let Some(proxy) = options.proxy.as_deref().filter(|p| !p.trim().is_empty()) {
            let proxy = reqwest::Proxy::all(proxy).map_err(|e| {
                ClientError::invalid_request(format!("failed to setup proxy '{proxy}': {e}"))
            })?;
            builder = builder.proxy(proxy);
        }

        let client = builder.build().map_err(|e| {
            ClientError::invalid_request(format!("failed to build HTTP client: {e}"))
        })?;
        Ok(Self {
            client,
            base_url: options.base_url,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    async fn get(&self, url: Url) -> Result<Vec<u8>, ClientError> {
        debug!(url = %url, "GET");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        let body = response.bytes().await.map_err(map_transport_error)?;
        if !status.is_success() {
            return Err(map_status_error(status, body.as_ref()));
        }
        debug!(status = status.as_u16(), bytes = body.len(), "response received");
        Ok(body.to_vec())
    }
}

#[async_trait]
impl CollectionSource for HttpCollectionSource {
    async fn fetch_page(
        &self,
        kind: CollectionKind,
        request: PageRequest,
    ) -> Result<PageResult, ClientError> {
        let url = page_url(&self.base_url, kind, request)?;
        let body = self.get(url).await?;
        dto::decode_page(kind, &body)
    }

    async fn query(
        &self,
        kind: CollectionKind,
        query: &RemoteQuery,
    ) -> Result<Vec<Record>, ClientError> {
        let url = query_url(&self.base_url, kind, query)?;
        let body = self.get(url).await?;
        dto::decode_records(kind, &body)
    }
}

fn collection_url(base: &Url, segments: &[&str]) -> Result<Url, ClientError> {
    let mut url = base.clone();
    url.set_query(None);
    {
        let mut path = url
            .path_segments_mut()
            .map_err(|()| ClientError::invalid_request(format!("'{base}' cannot be a base URL")))?;
        path.pop_if_empty();
        path.extend(segments);
    }
    Ok(url)
}

/// `/{collection}?limit={size}&skip={(page-1)*size}`
pub(crate) fn page_url(
    base: &Url,
    kind: CollectionKind,
    request: PageRequest,
) -> Result<Url, ClientError> {
    let mut url = collection_url(base, &[kind.path()])?;
    url.query_pairs_mut()
        .append_pair("limit", &request.limit().to_string())
        .append_pair("skip", &request.skip().to_string());
    Ok(url)
}

pub(crate) fn query_url(
    base: &Url,
    kind: CollectionKind,
    query: &RemoteQuery,
) -> Result<Url, ClientError> {
    match query {
        RemoteQuery::Search(term) => {
            let mut url = collection_url(base, &[kind.path(), "search"])?;
            url.query_pairs_mut().append_pair("q", term.trim());
            Ok(url)
        }
        RemoteQuery::Category(value) => {
            if kind != CollectionKind::Products {
                return Err(ClientError::invalid_request(format!(
                    "category lookup is only available for products, not {kind}"
                )));
            }
            let value = value.trim();
            if value.is_empty() {
                return Err(ClientError::invalid_request("category must not be blank"));
            }
            collection_url(base, &[kind.path(), "category", value])
        }
        RemoteQuery::Field { key, value } => {
            if key.trim().is_empty() {
                return Err(ClientError::invalid_request("filter key must not be blank"));
            }
            let mut url = collection_url(base, &[kind.path(), "filter"])?;
            url.query_pairs_mut()
                .append_pair("key", key.trim())
                .append_pair("value", value.trim());
            Ok(url)
        }
    }
}

fn map_transport_error(error: reqwest::Error) -> ClientError {
    if error.is_timeout() {
        ClientError::Timeout {
            message: error.to_string(),
        }
    } else {
        ClientError::Transport {
            message: error.to_string(),
        }
    }
}

fn map_status_error(status: StatusCode, body: &[u8]) -> ClientError {
    let text = String::from_utf8_lossy(body);
    let body = text.chars().take(MAX_ERROR_BODY).collect::<String>();
    ClientError::Status {
        status: status.as_u16(),
        body,
    }
}
