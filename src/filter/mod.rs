//! Free-text search and structured filters over fetched records.
//!
//! Structured filters combine by AND, the search term matches if ANY field
//! matches. Gender and category filters are answered by the API; everything
//! else is a predicate over the records already held.

pub mod sequencer;

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::client::RemoteQuery;
use crate::model::{CollectionKind, Record};

pub use sequencer::{RequestSequencer, Ticket};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterField {
    Name,
    Email,
    Brand,
    Gender,
    Category,
}

impl FilterField {
    pub const ALL: [Self; 5] = [
        Self::Name,
        Self::Email,
        Self::Brand,
        Self::Gender,
        Self::Category,
    ];

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "name" | "title" => Some(Self::Name),
            "email" => Some(Self::Email),
            "brand" => Some(Self::Brand),
            "gender" => Some(Self::Gender),
            "category" => Some(Self::Category),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Email => "email",
            Self::Brand => "brand",
            Self::Gender => "gender",
            Self::Category => "category",
        }
    }

    pub fn applies_to(self, kind: CollectionKind) -> bool {
        match kind {
            CollectionKind::Users => matches!(self, Self::Name | Self::Email | Self::Gender),
            CollectionKind::Products => matches!(self, Self::Name | Self::Brand | Self::Category),
        }
    }

    pub fn fields_for(kind: CollectionKind) -> Vec<Self> {
        Self::ALL
            .into_iter()
            .filter(|f| f.applies_to(kind))
            .collect()
    }

    /// Enumerated fields are served by the API.
    pub fn is_remote(self) -> bool {
        matches!(self, Self::Gender | Self::Category)
    }

    pub fn remote_query(self, value: &str) -> Option<RemoteQuery> {
        match self {
            Self::Category => Some(RemoteQuery::Category(value.trim().to_string())),
            Self::Gender => Some(RemoteQuery::Field {
                key: "gender".to_string(),
                value: value.trim().to_string(),
            }),
            _ => None,
        }
    }

    fn values<'a>(self, record: &'a Record) -> Vec<Option<&'a str>> {
        match (self, record) {
            (Self::Name, Record::User(u)) => vec![
                u.first_name.as_deref(),
                u.last_name.as_deref(),
                u.maiden_name.as_deref(),
            ],
            (Self::Name, Record::Product(p)) => vec![p.title.as_deref()],
            (Self::Email, Record::User(u)) => vec![u.email.as_deref()],
            (Self::Brand, Record::Product(p)) => vec![p.brand.as_deref()],
            (Self::Gender, Record::User(u)) => vec![u.gender.as_deref()],
            (Self::Category, Record::Product(p)) => vec![p.category.as_deref()],
            _ => Vec::new(),
        }
    }

    /// Free-text fields match by substring; enumerated fields by equality.
    pub fn matches(self, record: &Record, value: &str) -> bool {
        let needle = value.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }
        self.values(record).into_iter().flatten().any(|v| {
            let v = v.to_lowercase();
            if self.is_remote() {
                v == needle
            } else {
                v.contains(&needle)
            }
        })
    }
}

impl fmt::Display for FilterField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for FilterField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| {
            format!("unknown filter field '{s}', expected name, email, brand, gender or category")
        })
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    /// Match the term against the records of the current page.
    #[default]
    Local,
    /// Send the term to `/{collection}/search`.
    Remote,
}

impl SearchMode {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "local" | "page" => Some(Self::Local),
            "remote" | "api" => Some(Self::Remote),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FilterPolicy {
    pub search_mode: SearchMode,
    /// Setting one structured filter clears the others.
    pub exclusive_filters: bool,
    /// Hide the pagination bar while any structured filter is active.
    pub suppress_pagination_when_filtered: bool,
}

impl Default for FilterPolicy {
    fn default() -> Self {
        Self {
            search_mode: SearchMode::Local,
            exclusive_filters: true,
            suppress_pagination_when_filtered: false,
        }
    }
}

/// Search term plus structured filters of one view.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FilterState {
    search: String,
    filters: BTreeMap<FilterField, String>,
}

impl FilterState {
    pub fn search(&self) -> &str {
        &self.search
    }

    pub fn set_search(&mut self, term: &str) {
        self.search = term.to_string();
    }

    pub fn has_search(&self) -> bool {
        !self.search.trim().is_empty()
    }

    /// Set `field` to `value`; a blank value clears the field instead.
    pub fn set_filter(&mut self, field: FilterField, value: &str, exclusive: bool) {
        let value = value.trim();
        if value.is_empty() {
            self.filters.remove(&field);
            return;
        }
        if exclusive {
            self.filters.clear();
        }
        self.filters.insert(field, value.to_string());
    }

    pub fn clear_filter(&mut self, field: FilterField) -> bool {
        self.filters.remove(&field).is_some()
    }

    pub fn clear(&mut self) {
        self.search.clear();
        self.filters.clear();
    }

    pub fn filter(&self, field: FilterField) -> Option<&str> {
        self.filters.get(&field).map(String::as_str)
    }

    pub fn filters(&self) -> impl Iterator<Item = (FilterField, &str)> {
        self.filters.iter().map(|(f, v)| (*f, v.as_str()))
    }

    pub fn has_structured_filters(&self) -> bool {
        !self.filters.is_empty()
    }

    /// The query the API has to answer for the current state, if any. A
    /// remote structured filter takes precedence over a remote search; the
    /// search is then applied locally to the filtered set.
    pub fn remote_query(&self, policy: &FilterPolicy) -> Option<RemoteQuery> {
        let structured = self
            .filters()
            .find(|(f, _)| f.is_remote())
            .and_then(|(f, v)| f.remote_query(v));
        if structured.is_some() {
            return structured;
        }
        if policy.search_mode == SearchMode::Remote && self.has_search() {
            return Some(RemoteQuery::Search(self.search.trim().to_string()));
        }
        None
    }
}

/// Case-insensitive substring match over the text fields, plus exact string
/// equality against numeric fields when the term is itself a number. An empty
/// term matches everything.
pub fn matches_search(record: &Record, term: &str) -> bool {
    let term = term.trim();
    if term.is_empty() {
        return true;
    }
    let needle = term.to_lowercase();
    if record
        .text_fields()
        .into_iter()
        .flatten()
        .any(|v| v.to_lowercase().contains(&needle))
    {
        return true;
    }
    if term.parse::<f64>().is_ok() {
        return record
            .numeric_fields()
            .into_iter()
            .flatten()
            .any(|v| v == term);
    }
    false
}

/// Produce the visible rows from `base`. `served` is the remote query that
/// produced `base`, whose criterion is not re-applied locally.
pub fn compose(base: &[Record], state: &FilterState, served: Option<&RemoteQuery>) -> Vec<Record> {
    let served_search = matches!(served, Some(RemoteQuery::Search(_)));
    let served_field = state
        .filters()
        .find(|(f, v)| served.is_some() && f.remote_query(v).as_ref() == served)
        .map(|(f, _)| f);

    base.iter()
        .filter(|record| {
            state
                .filters()
                .filter(|(f, _)| Some(*f) != served_field)
                .all(|(f, v)| f.matches(record, v))
        })
        .filter(|record| served_search || matches_search(record, state.search()))
        .cloned()
        .collect()
}
