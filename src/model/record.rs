use serde::Serialize;

use super::CollectionKind;

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: u64,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub maiden_name: Option<String>,
    pub age: Option<u32>,
    pub gender: Option<String>,
    pub email: Option<String>,
    pub username: Option<String>,
    pub blood_group: Option<String>,
    pub eye_color: Option<String>,
}

impl User {
    /// "First Last", skipping whichever half is missing.
    pub fn full_name(&self) -> String {
        [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: u64,
    pub title: Option<String>,
    pub description: Option<String>,
    pub brand: Option<String>,
    pub category: Option<String>,
    pub price: Option<f64>,
    pub stock: Option<i64>,
    pub rating: Option<f64>,
}

/// A snapshot of one remote record. The variant is fixed by the collection it
/// was fetched from.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Record {
    User(User),
    Product(Product),
}

impl Record {
    pub fn id(&self) -> u64 {
        match self {
            Self::User(u) => u.id,
            Self::Product(p) => p.id,
        }
    }

    pub fn kind(&self) -> CollectionKind {
        match self {
            Self::User(_) => CollectionKind::Users,
            Self::Product(_) => CollectionKind::Products,
        }
    }

    /// Fields the free-text search runs a substring match against.
    pub fn text_fields(&self) -> Vec<Option<&str>> {
        match self {
            Self::User(u) => vec![
                u.first_name.as_deref(),
                u.last_name.as_deref(),
                u.maiden_name.as_deref(),
                u.email.as_deref(),
                u.username.as_deref(),
                u.gender.as_deref(),
                u.blood_group.as_deref(),
                u.eye_color.as_deref(),
            ],
            Self::Product(p) => vec![
                p.title.as_deref(),
                p.brand.as_deref(),
                p.category.as_deref(),
            ],
        }
    }

    /// Numeric fields rendered the way they are compared against a numeric
    /// search term.
    pub fn numeric_fields(&self) -> Vec<Option<String>> {
        match self {
            Self::User(u) => vec![u.age.map(|a| a.to_string())],
            Self::Product(p) => vec![
                p.stock.map(|s| s.to_string()),
                p.rating.map(format_number),
            ],
        }
    }
}

/// Shortest decimal form, so `5.0` prints as `5` and `4.94` as `4.94`.
pub fn format_number(value: f64) -> String {
    format!("{value}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_name_skips_missing_parts() {
        let user = User {
            id: 1,
            first_name: Some("Emily".to_string()),
            ..Default::default()
        };
        assert_eq!(user.full_name(), "Emily");
    }

    #[test]
    fn numeric_fields_format_whole_ratings_without_fraction() {
        let product = Record::Product(Product {
            id: 7,
            stock: Some(50),
            rating: Some(5.0),
            ..Default::default()
        });
        assert_eq!(
            product.numeric_fields(),
            vec![Some("50".to_string()), Some("5".to_string())]
        );
        assert_eq!(product.kind(), CollectionKind::Products);
    }

    #[test]
    fn record_serializes_with_kind_tag_and_camel_case() {
        let record = Record::User(User {
            id: 3,
            first_name: Some("Ava".to_string()),
            ..Default::default()
        });
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["kind"], "user");
        assert_eq!(json["firstName"], "Ava");
    }
}
