//! Transport DTOs for collection responses.
//!
//! Bodies are decoded leniently: a missing record array is an empty page, and
//! a single malformed record is dropped with a warning instead of failing the
//! whole response.

use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use super::ClientError;
use crate::model::{CollectionKind, PageResult, Product, Record, User};

#[derive(Debug, Deserialize)]
struct EnvelopeDto {
    #[serde(default)]
    users: Option<Vec<Value>>,
    #[serde(default)]
    products: Option<Vec<Value>>,
    #[serde(default)]
    total: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserDto {
    id: Option<u64>,
    first_name: Option<String>,
    last_name: Option<String>,
    maiden_name: Option<String>,
    age: Option<u32>,
    gender: Option<String>,
    email: Option<String>,
    username: Option<String>,
    blood_group: Option<String>,
    eye_color: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProductDto {
    id: Option<u64>,
    title: Option<String>,
    description: Option<String>,
    brand: Option<String>,
    category: Option<String>,
    price: Option<f64>,
    stock: Option<i64>,
    rating: Option<f64>,
}

impl UserDto {
    fn into_domain(self) -> Result<User, String> {
        let id = self.id.ok_or_else(|| "user record without id".to_string())?;
        Ok(User {
            id,
            first_name: self.first_name,
            last_name: self.last_name,
            maiden_name: self.maiden_name,
            age: self.age,
            gender: self.gender,
            email: self.email,
            username: self.username,
            blood_group: self.blood_group,
            eye_color: self.eye_color,
        })
    }
}

impl ProductDto {
    fn into_domain(self) -> Result<Product, String> {
        let id = self
            .id
            .ok_or_else(|| "product record without id".to_string())?;
        Ok(Product {
            id,
            title: self.title,
            description: self.description,
            brand: self.brand,
            category: self.category,
            price: self.price,
            stock: self.stock,
            rating: self.rating,
        })
    }
}

impl EnvelopeDto {
    fn parse(body: &[u8]) -> Result<Self, ClientError> {
        serde_json::from_slice(body)
            .map_err(|e| ClientError::decode(format!("invalid collection JSON payload: {e}")))
    }

    fn take_items(&mut self, kind: CollectionKind) -> Vec<Value> {
        let items = match kind {
            CollectionKind::Users => self.users.take(),
            CollectionKind::Products => self.products.take(),
        };
        items.unwrap_or_default()
    }
}

fn decode_record(kind: CollectionKind, value: Value) -> Result<Record, String> {
    match kind {
        CollectionKind::Users => serde_json::from_value::<UserDto>(value)
            .map_err(|e| e.to_string())?
            .into_domain()
            .map(Record::User),
        CollectionKind::Products => serde_json::from_value::<ProductDto>(value)
            .map_err(|e| e.to_string())?
            .into_domain()
            .map(Record::Product),
    }
}

fn decode_items(kind: CollectionKind, items: Vec<Value>) -> Vec<Record> {
    items
        .into_iter()
        .enumerate()
        .filter_map(|(index, value)| match decode_record(kind, value) {
            Ok(record) => Some(record),
            Err(reason) => {
                warn!(collection = %kind, index, %reason, "dropping malformed record");
                None
            }
        })
        .collect()
}

/// Decode a `limit`/`skip` page body. A missing `total` falls back to the
/// number of records received.
pub(super) fn decode_page(kind: CollectionKind, body: &[u8]) -> Result<PageResult, ClientError> {
    let mut envelope = EnvelopeDto::parse(body)?;
    let total = envelope.total;
    let records = decode_items(kind, envelope.take_items(kind));
    let total = total.unwrap_or(records.len() as u64);
    Ok(PageResult { records, total })
}

/// Decode a search or filter body into its records.
pub(super) fn decode_records(
    kind: CollectionKind,
    body: &[u8],
) -> Result<Vec<Record>, ClientError> {
    let mut envelope = EnvelopeDto::parse(body)?;
    Ok(decode_items(kind, envelope.take_items(kind)))
}
