//! Scriptable in-memory `CollectionSource` for tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::oneshot;

use super::{ClientError, CollectionSource, RemoteQuery};
use crate::model::{CollectionKind, PageRequest, PageResult, Product, Record, User};

/// One scripted answer. When `gate` is set the call waits for it to fire
/// before returning, which lets tests control completion order.
pub(crate) struct Scripted<T> {
    pub(crate) result: Result<T, ClientError>,
    pub(crate) gate: Option<oneshot::Receiver<()>>,
}

#[derive(Default)]
pub(crate) struct FakeSource {
    pages: Mutex<HashMap<CollectionKind, VecDeque<Scripted<PageResult>>>>,
    queries: Mutex<VecDeque<Scripted<Vec<Record>>>>,
    pub(crate) page_calls: Mutex<Vec<(CollectionKind, PageRequest)>>,
    pub(crate) query_calls: Mutex<Vec<(CollectionKind, RemoteQuery)>>,
}

impl FakeSource {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push_page(&self, kind: CollectionKind, result: Result<PageResult, ClientError>) {
        self.push_page_gated(kind, result, None);
    }

    pub(crate) fn push_page_gated(
        &self,
        kind: CollectionKind,
        result: Result<PageResult, ClientError>,
        gate: Option<oneshot::Receiver<()>>,
    ) {
        self.pages
            .lock()
            .unwrap()
            .entry(kind)
            .or_default()
            .push_back(Scripted { result, gate });
    }

    pub(crate) fn push_query(&self, result: Result<Vec<Record>, ClientError>) {
        self.push_query_gated(result, None);
    }

    pub(crate) fn push_query_gated(
        &self,
        result: Result<Vec<Record>, ClientError>,
        gate: Option<oneshot::Receiver<()>>,
    ) {
        self.queries
            .lock()
            .unwrap()
            .push_back(Scripted { result, gate });
    }

    pub(crate) fn page_call_count(&self) -> usize {
        self.page_calls.lock().unwrap().len()
    }

    pub(crate) fn last_page_call(&self) -> Option<(CollectionKind, PageRequest)> {
        self.page_calls.lock().unwrap().last().copied()
    }

    pub(crate) fn last_query(&self) -> Option<(CollectionKind, RemoteQuery)> {
        self.query_calls.lock().unwrap().last().cloned()
    }
}

async fn resolve<T>(scripted: Option<Scripted<T>>) -> Result<T, ClientError> {
    let Some(scripted) = scripted else {
        return Err(ClientError::Transport {
            message: "no scripted response".to_string(),
        });
    };
    if let Some(gate) = scripted.gate {
        let _ = gate.await;
    }
    scripted.result
}

#[async_trait]
impl CollectionSource for FakeSource {
    async fn fetch_page(
        &self,
        kind: CollectionKind,
        request: PageRequest,
    ) -> Result<PageResult, ClientError> {
        self.page_calls.lock().unwrap().push((kind, request));
        let next = self
            .pages
            .lock()
            .unwrap()
            .get_mut(&kind)
            .and_then(VecDeque::pop_front);
        resolve(next).await
    }

    async fn query(
        &self,
        kind: CollectionKind,
        query: &RemoteQuery,
    ) -> Result<Vec<Record>, ClientError> {
        self.query_calls.lock().unwrap().push((kind, query.clone()));
        let next = self.queries.lock().unwrap().pop_front();
        resolve(next).await
    }
}

pub(crate) fn user(id: u64, first: &str, last: &str, age: u32, gender: &str) -> Record {
    Record::User(User {
        id,
        first_name: Some(first.to_string()),
        last_name: Some(last.to_string()),
        age: Some(age),
        gender: Some(gender.to_string()),
        email: Some(format!("{}.{}@x.dummyjson.com", first, last).to_lowercase()),
        username: Some(format!("{}{}", first.to_lowercase(), id)),
        ..Default::default()
    })
}

pub(crate) fn product(
    id: u64,
    title: &str,
    brand: &str,
    category: &str,
    stock: i64,
    rating: f64,
) -> Record {
    Record::Product(Product {
        id,
        title: Some(title.to_string()),
        brand: Some(brand.to_string()),
        category: Some(category.to_string()),
        price: Some(9.99),
        stock: Some(stock),
        rating: Some(rating),
        ..Default::default()
    })
}

pub(crate) fn page(records: Vec<Record>, total: u64) -> PageResult {
    PageResult { records, total }
}
