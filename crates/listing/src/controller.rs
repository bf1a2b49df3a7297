use std::{cmp::Ordering, iter::FusedIterator, num::NonZeroUsize, slice};

use shared::record::FieldValue;
use tracing::trace;

use crate::{export::Column, FieldAccess, ListConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn flipped(self) -> Self {
        match self {
            SortDirection::Asc => SortDirection::Desc,
            SortDirection::Desc => SortDirection::Asc,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortState {
    pub field: String,
    pub direction: SortDirection,
}

/// Metadata a table footer renders ("showing 11 to 20 of 43").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page_index: usize,
    pub page_size: usize,
    pub total_pages: usize,
    pub filtered_count: usize,
    pub total_count: usize,
    /// 1-based position of the first visible row, 0 when nothing is visible.
    pub first_item: usize,
    pub last_item: usize,
}

pub struct ListController<R> {
    rows: Vec<R>,
    config: ListConfig,
    search_text: String,
    sort: Option<SortState>,
    page_index: usize,
    // Indices into `rows`: filtered, then ordered by `sort`.
    view: Vec<usize>,
}

impl<R: FieldAccess> ListController<R> {
    pub fn new(rows: Vec<R>, config: ListConfig) -> Self {
        let mut controller = Self {
            rows,
            config,
            search_text: String::new(),
            sort: None,
            page_index: 1,
            view: Vec::new(),
        };
        controller.refresh();
        controller
    }

    /// Swaps in a freshly loaded collection, keeping the query state.
    pub fn replace_collection(&mut self, rows: Vec<R>) {
        self.rows = rows;
        self.refresh();
        self.page_index = self.page_index.clamp(1, self.total_pages().max(1));
    }

    pub fn set_search_text(&mut self, text: impl Into<String>) {
        self.search_text = text.into();
        self.page_index = 1;
        self.refresh();
    }

    /// Sorts by `field`; asking for the current field again flips direction.
    pub fn set_sort(&mut self, field: &str) {
        let next = match self.sort.take() {
            Some(current) if current.field == field => SortState {
                field: current.field,
                direction: current.direction.flipped(),
            },
            _ => SortState {
                field: field.to_string(),
                direction: SortDirection::Asc,
            },
        };
        self.sort = Some(next);
        self.refresh();
    }

    /// Out-of-range pages are ignored.
    pub fn go_to_page(&mut self, page: usize) {
        if page >= 1 && page <= self.total_pages() {
            self.page_index = page;
        }
    }

    pub fn visible_rows(&self) -> Rows<'_, R> {
        let size = self.config.page_size.get();
        let start = (self.page_index - 1).saturating_mul(size).min(self.view.len());
        let end = start.saturating_add(size).min(self.view.len());
        Rows {
            rows: &self.rows,
            indices: self.view[start..end].iter(),
        }
    }

    /// Every row passing the search, in display order, across all pages.
    pub fn filtered_rows(&self) -> Rows<'_, R> {
        Rows {
            rows: &self.rows,
            indices: self.view.iter(),
        }
    }

    /// A window of at most `window` page numbers centered on the current page.
    pub fn page_numbers(&self, window: usize) -> Vec<usize> {
        let total = self.total_pages();
        if window == 0 || total == 0 {
            return Vec::new();
        }
        let mut start = self.page_index.saturating_sub(window / 2).max(1);
        let end = start.saturating_add(window - 1).min(total);
        if end - start + 1 < window {
            start = (end + 1).saturating_sub(window).max(1);
        }
        (start..=end).collect()
    }

    pub fn export_delimited(&self, columns: &[Column<'_, R>]) -> String {
        crate::export::delimited(self.filtered_rows(), columns)
    }

    pub fn pagination(&self) -> Pagination {
        let visible = self.visible_rows().len();
        let first_item = if visible == 0 {
            0
        } else {
            (self.page_index - 1) * self.page_size().get() + 1
        };
        Pagination {
            page_index: self.page_index,
            page_size: self.page_size().get(),
            total_pages: self.total_pages(),
            filtered_count: self.view.len(),
            total_count: self.rows.len(),
            first_item,
            last_item: if visible == 0 { 0 } else { first_item + visible - 1 },
        }
    }

    pub fn total_pages(&self) -> usize {
        self.view.len().div_ceil(self.page_size().get())
    }

    pub fn page_index(&self) -> usize {
        self.page_index
    }

    pub fn page_size(&self) -> NonZeroUsize {
        self.config.page_size
    }

    pub fn filtered_count(&self) -> usize {
        self.view.len()
    }

    pub fn search_text(&self) -> &str {
        &self.search_text
    }

    pub fn sort(&self) -> Option<&SortState> {
        self.sort.as_ref()
    }

    pub fn collection(&self) -> &[R] {
        &self.rows
    }

    pub fn config(&self) -> &ListConfig {
        &self.config
    }

    fn refresh(&mut self) {
        let needle = self.search_text.to_lowercase();
        let filtering = !self.search_text.trim().is_empty();
        let fields = &self.config.searchable_fields;

        let mut view: Vec<usize> = self
            .rows
            .iter()
            .enumerate()
            .filter(|(_, row)| !filtering || matches_search(*row, fields, &needle))
            .map(|(index, _)| index)
            .collect();

        if let Some(sort) = &self.sort {
            let rows = &self.rows;
            // `sort_by` is stable, so equal keys keep collection order.
            view.sort_by(|a, b| {
                let ordering = compare_field(&rows[*a], &rows[*b], &sort.field);
                match sort.direction {
                    SortDirection::Asc => ordering,
                    SortDirection::Desc => ordering.reverse(),
                }
            });
        }

        trace!(
            total = self.rows.len(),
            filtered = view.len(),
            search = %self.search_text,
            "list view recomputed"
        );
        self.view = view;
    }
}

fn matches_search<R: FieldAccess>(row: &R, fields: &[String], needle: &str) -> bool {
    fields.iter().any(|name| match row.field(name) {
        None | Some(FieldValue::Null) => false,
        Some(value) => value.to_string().to_lowercase().contains(needle),
    })
}

fn compare_field<R: FieldAccess>(a: &R, b: &R, field: &str) -> Ordering {
    let null = FieldValue::Null;
    let left = a.field(field).unwrap_or(&null);
    let right = b.field(field).unwrap_or(&null);
    left.natural_cmp(right)
}

/// Lazy view over controller rows; clone it to iterate again.
pub struct Rows<'a, R> {
    rows: &'a [R],
    indices: slice::Iter<'a, usize>,
}

impl<R> Clone for Rows<'_, R> {
    fn clone(&self) -> Self {
        Self {
            rows: self.rows,
            indices: self.indices.clone(),
        }
    }
}

impl<'a, R> Iterator for Rows<'a, R> {
    type Item = &'a R;

    fn next(&mut self) -> Option<Self::Item> {
        let rows = self.rows;
        self.indices.next().map(move |index| &rows[*index])
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.indices.size_hint()
    }
}

impl<R> DoubleEndedIterator for Rows<'_, R> {
    fn next_back(&mut self) -> Option<Self::Item> {
        let rows = self.rows;
        self.indices.next_back().map(move |index| &rows[*index])
    }
}

impl<R> ExactSizeIterator for Rows<'_, R> {}

impl<R> FusedIterator for Rows<'_, R> {}
