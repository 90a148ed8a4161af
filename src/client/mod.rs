//! Remote collection client.
//!
//! `CollectionSource` is the seam between the store/views and the network;
//! `HttpCollectionSource` is the reqwest adapter for the public JSON API.

mod dto;
pub mod http;

#[cfg(test)]
pub(crate) mod fake;

use async_trait::async_trait;
use thiserror::Error;

use crate::model::{CollectionKind, PageRequest, PageResult, Record};

pub use http::{HttpCollectionSource, HttpOptions};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// The request never produced a response.
    #[error("transport failed: {message}")]
    Transport { message: String },

    #[error("request timed out: {message}")]
    Timeout { message: String },

    /// The API answered with a non-2xx status.
    #[error("unexpected status {status}: {body}")]
    Status { status: u16, body: String },

    /// The body was not the JSON shape the collection expects.
    #[error("response decode failed: {message}")]
    Decode { message: String },

    #[error("invalid request: {message}")]
    InvalidRequest { message: String },
}

impl ClientError {
    pub(crate) fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    pub(crate) fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }
}

/// A query answered by the API rather than computed over the fetched page.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum RemoteQuery {
    /// `/{collection}/search?q={term}`
    Search(String),
    /// `/products/category/{value}`
    Category(String),
    /// `/{collection}/filter?key={key}&value={value}`
    Field { key: String, value: String },
}

#[async_trait]
pub trait CollectionSource: Send + Sync {
    /// Fetch one page of `kind` together with the collection total.
    async fn fetch_page(
        &self,
        kind: CollectionKind,
        request: PageRequest,
    ) -> Result<PageResult, ClientError>;

    /// Run a search or structured filter on the API side. The answer is a
    /// complete, unpaginated result set.
    async fn query(
        &self,
        kind: CollectionKind,
        query: &RemoteQuery,
    ) -> Result<Vec<Record>, ClientError>;
}
