//! Place records and search parameters.

use serde::{Deserialize, Serialize};

/// A single place returned by a search.
///
/// Places are only ever built from an upstream answer or decoded from the
/// cache; nothing mutates them afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Place {
    /// Upstream code (IATA city or airport code).
    pub identifier: String,
    pub title: String,
    pub subtitle: String,
}

impl Place {
    pub fn new(
        identifier: impl Into<String>,
        title: impl Into<String>,
        subtitle: impl Into<String>,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            title: title.into(),
            subtitle: subtitle.into(),
        }
    }
}

/// Normalized search request.
///
/// Equality is exact field equality, including the order of `types`.
/// Cache keys are derived with the type filters sorted, see
/// [`derive_key`](crate::derive_key).
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SearchParams {
    pub term: String,
    pub locale: String,
    pub types: Vec<String>,
}

impl SearchParams {
    pub fn new(term: impl Into<String>, locale: impl Into<String>) -> Self {
        Self {
            term: term.into(),
            locale: locale.into(),
            types: Vec::new(),
        }
    }

    /// Add a type filter, keeping insertion order.
    pub fn with_type(mut self, place_type: impl Into<String>) -> Self {
        self.types.push(place_type.into());
        self
    }

    /// Comma-joined type filters, used as a span/log attribute.
    pub fn types_label(&self) -> String {
        self.types.join(",")
    }
}
