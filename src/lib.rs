//! A headless presentation-state engine for tabular data.
//!
//! Give a [`TableModel`] rows, a column model and a row key. It keeps the sorting, filters,
//! pagination, column layout and row expansion of the table. It derives the rows to show, and
//! it can persist that state per table id so a later session picks up where the last one left off.

pub mod column;
pub mod domain;
pub mod export;
pub mod filter;
pub mod frame;
pub mod model;
pub mod persist;
pub mod pipeline;
pub mod state;
pub mod value;

pub use column::{ColumnDef, FilterMode};
pub use domain::{TableConfig, TableError};
pub use export::{ExportScope, ExportTable, to_delimited_string, write_delimited};
pub use filter::{DateBoundary, FilterValue, TextMatch};
pub use frame::{LoadOptions, LoadedTable, Record, load_table};
pub use model::{Change, ColumnLayout, SortAction, SortDirection, SubscriptionId, TableModel};
pub use persist::{FileBackend, MemoryBackend, Persistence, StateBackend};
pub use pipeline::{ColumnFacets, DerivedView};
pub use state::{ColumnSort, Pagination, PinSide, PresentationState};
pub use value::CellValue;
