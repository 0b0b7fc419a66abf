use derive_setters::Setters;
use polars::error::PolarsError;
use thiserror::Error;

use crate::filter::{DateBoundary, FilterOptions, TextMatch};

pub const DEFAULT_PAGE_SIZE: usize = 10;
pub const DEFAULT_PAGE_SIZE_OPTIONS: [usize; 4] = [10, 20, 50, 100];
pub const DEFAULT_MIN_COLUMN_WIDTH: u32 = 20;
pub const DEFAULT_COLUMN_WIDTH: u32 = 150;

/// Failures of the collaborators around the engine (file loading, export, persistence I/O).
/// Commands on a [`crate::TableModel`] never produce these.
#[derive(Debug, Error)]
pub enum TableError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("polars error: {0}")]
    Polars(#[from] PolarsError),
    #[error("clipboard error: {0}")]
    Clipboard(String),
    #[error("loading failed: {0}")]
    LoadingFailed(String),
    #[error("file not found")]
    FileNotFound,
    #[error("permission denied")]
    PermissionDenied,
    #[error("unknown file type")]
    UnknownFileType,
}

/// Engine options shared by every command and derivation of one table.
#[derive(Debug, Clone, Setters)]
#[setters(prefix = "with_")]
pub struct TableConfig {
    pub page_size: usize,
    pub page_size_options: Vec<usize>,
    pub min_column_width: u32,
    pub text_match: TextMatch,
    pub date_boundary: DateBoundary,
    /// Allow `multi` sort requests to append instead of replacing the sort list.
    pub multi_sort: bool,
}

impl Default for TableConfig {
    fn default() -> Self {
        TableConfig {
            page_size: DEFAULT_PAGE_SIZE,
            page_size_options: DEFAULT_PAGE_SIZE_OPTIONS.to_vec(),
            min_column_width: DEFAULT_MIN_COLUMN_WIDTH,
            text_match: TextMatch::default(),
            date_boundary: DateBoundary::default(),
            multi_sort: true,
        }
    }
}

impl TableConfig {
    pub fn filter_options(&self) -> FilterOptions {
        FilterOptions {
            text_match: self.text_match,
            date_boundary: self.date_boundary,
        }
    }

    /// Page size to fall back to when a requested or persisted one is unusable.
    pub fn default_page_size(&self) -> usize {
        if self.page_size > 0 {
            self.page_size
        } else {
            DEFAULT_PAGE_SIZE
        }
    }

    /// The page size option following `current`, wrapping around. Used by callers that cycle sizes.
    pub fn next_page_size(&self, current: usize) -> usize {
        let options: Vec<usize> = self
            .page_size_options
            .iter()
            .copied()
            .filter(|&n| n > 0)
            .collect();
        if options.is_empty() {
            return current.max(1);
        }
        options
            .iter()
            .copied()
            .find(|&n| n > current)
            .unwrap_or(options[0])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_size_options_cycle() {
        let config = TableConfig::default();
        assert_eq!(config.next_page_size(10), 20);
        assert_eq!(config.next_page_size(50), 100);
        assert_eq!(config.next_page_size(100), 10);
        assert_eq!(config.next_page_size(7), 10);
    }

    #[test]
    fn zero_page_size_falls_back() {
        let config = TableConfig::default().with_page_size(0);
        assert_eq!(config.default_page_size(), DEFAULT_PAGE_SIZE);
    }
}
