pub mod record;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use record::{Product, Record, User};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ModelError {
    #[error("invalid page size {value}, expected one of 5, 10, 20, 50")]
    InvalidPageSize { value: String },

    #[error("unknown collection '{value}', expected users or products")]
    UnknownCollection { value: String },

    #[error("invalid page '{value}', expected a positive integer")]
    InvalidPage { value: String },
}

/// One of the two remote resource collections.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollectionKind {
    Users,
    Products,
}

impl CollectionKind {
    pub const ALL: [Self; 2] = [Self::Users, Self::Products];

    /// Path segment of the collection, which is also the key of the record
    /// array in every response body.
    pub fn path(self) -> &'static str {
        match self {
            Self::Users => "users",
            Self::Products => "products",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Self::Users => "Users",
            Self::Products => "Products",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "users" | "user" | "u" => Some(Self::Users),
            "products" | "product" | "p" => Some(Self::Products),
            _ => None,
        }
    }
}

impl fmt::Display for CollectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

impl FromStr for CollectionKind {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| ModelError::UnknownCollection {
            value: s.to_string(),
        })
    }
}

/// Requested number of records per page. Only the enumerated sizes exist.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PageSize {
    #[default]
    Five,
    Ten,
    Twenty,
    Fifty,
}

impl PageSize {
    pub const ALL: [Self; 4] = [Self::Five, Self::Ten, Self::Twenty, Self::Fifty];

    pub fn get(self) -> u32 {
        match self {
            Self::Five => 5,
            Self::Ten => 10,
            Self::Twenty => 20,
            Self::Fifty => 50,
        }
    }

    pub fn from_u32(value: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.get() == value)
    }
}

impl fmt::Display for PageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.get())
    }
}

impl FromStr for PageSize {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u32>()
            .ok()
            .and_then(Self::from_u32)
            .ok_or_else(|| ModelError::InvalidPageSize {
                value: s.to_string(),
            })
    }
}

impl TryFrom<u32> for PageSize {
    type Error = ModelError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::from_u32(value).ok_or(ModelError::InvalidPageSize {
            value: value.to_string(),
        })
    }
}

impl Serialize for PageSize {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u32(self.get())
    }
}

impl<'de> Deserialize<'de> for PageSize {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = u32::deserialize(deserializer)?;
        Self::try_from(raw).map_err(serde::de::Error::custom)
    }
}

/// Parse a 1-based page number typed by the user.
pub fn parse_page(value: &str) -> Result<u32, ModelError> {
    match value.trim().parse::<u32>() {
        Ok(page) if page >= 1 => Ok(page),
        _ => Err(ModelError::InvalidPage {
            value: value.to_string(),
        }),
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub size: PageSize,
}

impl PageRequest {
    /// Page numbers below 1 are raised to 1.
    pub fn new(page: u32, size: PageSize) -> Self {
        Self {
            page: page.max(1),
            size,
        }
    }

    pub fn limit(&self) -> u32 {
        self.size.get()
    }

    pub fn skip(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.size.get())
    }
}

/// One fetched page and the collection-wide item count.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PageResult {
    pub records: Vec<Record>,
    pub total: u64,
}

impl PageResult {
    pub fn total_pages(&self, size: PageSize) -> u32 {
        crate::pagination::total_pages(self.total, size.get())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("5", PageSize::Five)]
    #[case("10", PageSize::Ten)]
    #[case(" 20 ", PageSize::Twenty)]
    #[case("50", PageSize::Fifty)]
    fn page_size_parses_enumerated_values(#[case] raw: &str, #[case] expected: PageSize) {
        assert_eq!(raw.parse::<PageSize>().unwrap(), expected);
    }

    #[rstest]
    #[case("0")]
    #[case("7")]
    #[case("100")]
    #[case("ten")]
    fn page_size_rejects_other_values(#[case] raw: &str) {
        assert!(raw.parse::<PageSize>().is_err());
    }

    #[test]
    fn page_size_deserializes_only_known_sizes() {
        let ok: PageSize = serde_yaml::from_str("20").unwrap();
        assert_eq!(ok, PageSize::Twenty);
        assert!(serde_yaml::from_str::<PageSize>("15").is_err());
    }

    #[test]
    fn page_request_skip_counts_previous_pages() {
        let req = PageRequest::new(3, PageSize::Ten);
        assert_eq!(req.limit(), 10);
        assert_eq!(req.skip(), 20);
        assert_eq!(PageRequest::new(0, PageSize::Five).skip(), 0);
    }

    #[test]
    fn parse_page_rejects_zero_and_text() {
        assert_eq!(parse_page("4").unwrap(), 4);
        assert!(parse_page("0").is_err());
        assert!(parse_page("two").is_err());
        assert!(parse_page("-1").is_err());
    }

    #[test]
    fn collection_kind_accepts_short_names() {
        assert_eq!(CollectionKind::parse("P"), Some(CollectionKind::Products));
        assert_eq!("users".parse::<CollectionKind>(), Ok(CollectionKind::Users));
        assert!("orders".parse::<CollectionKind>().is_err());
    }
}
