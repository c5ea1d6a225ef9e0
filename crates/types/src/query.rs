//! Related-query filter hooks
//!
//! The framework builds list-view queries with its own query builder. This
//! module only needs that builder to accept a boolean predicate, so the
//! contract is the [`FilterableQuery`] trait and the hooks are plain data.

use serde::{Deserialize, Serialize};

/// Boolean predicate handed to a query builder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Predicate {
    /// Constant predicate; `Literal(false)` matches no row
    Literal(bool),
}

impl Predicate {
    /// Evaluate the predicate against a row
    pub fn matches<T>(&self, _row: &T) -> bool {
        match self {
            Predicate::Literal(value) => *value,
        }
    }
}

/// Query builder capable of narrowing its relation with a predicate
pub trait FilterableQuery: Sized {
    fn filter(self, predicate: Predicate) -> Self;
}

/// Named query transformation registered with the framework
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryFilterHook {
    /// Excludes every row; used to hide the user list
    HideAll,
}

impl QueryFilterHook {
    /// Apply the hook to a query
    pub fn apply<Q: FilterableQuery>(&self, query: Q) -> Q {
        match self {
            QueryFilterHook::HideAll => query.filter(Predicate::Literal(false)),
        }
    }
}
