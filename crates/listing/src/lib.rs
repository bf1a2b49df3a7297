//! Search, sort, paginate and export over an in-memory record collection.
//!
//! A [`ListController`] owns one collection plus the query state applied to
//! it and derives the rows a table shows. It never mutates the collection;
//! callers replace it wholesale after a create/update/delete.

use std::num::NonZeroUsize;

use shared::record::{FieldValue, Record};

mod controller;
mod export;

pub use controller::{ListController, Pagination, Rows, SortDirection, SortState};
pub use export::Column;

pub const DEFAULT_PAGE_SIZE: NonZeroUsize = match NonZeroUsize::new(10) {
    Some(size) => size,
    None => unreachable!(),
};
pub const DEFAULT_PAGE_WINDOW: usize = 5;

/// Named-field lookup the controller searches and sorts through.
pub trait FieldAccess {
    fn field(&self, name: &str) -> Option<&FieldValue>;
}

impl FieldAccess for Record {
    fn field(&self, name: &str) -> Option<&FieldValue> {
        self.get(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListConfig {
    pub searchable_fields: Vec<String>,
    pub page_size: NonZeroUsize,
}

impl ListConfig {
    pub fn new<I, S>(searchable_fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            searchable_fields: searchable_fields.into_iter().map(Into::into).collect(),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn with_page_size(mut self, page_size: NonZeroUsize) -> Self {
        self.page_size = page_size;
        self
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
