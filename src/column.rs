use std::fmt;
use std::sync::Arc;

use derive_setters::Setters;
use serde::{Deserialize, Serialize};

use crate::domain::DEFAULT_COLUMN_WIDTH;
use crate::value::CellValue;

/// Which filter evaluator a column uses, and therefore the shape its filter value must have.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FilterMode {
    None,
    #[default]
    Text,
    Number,
    NumberRange,
    Select,
    DateRange,
}

pub type Accessor<T> = Arc<dyn Fn(&T) -> CellValue + Send + Sync>;

/// Declarative description of one column. Pure data; the only behavior is running the accessor.
///
/// ```
/// use tablestate::{ColumnDef, FilterMode, CellValue};
///
/// struct Person { age: u32 }
///
/// let age = ColumnDef::new("age", "Age", |p: &Person| CellValue::from(p.age))
///     .with_filter_mode(FilterMode::NumberRange)
///     .with_initial_width(80);
/// assert!(age.is_sortable());
/// ```
#[derive(Setters)]
#[setters(prefix = "with_")]
pub struct ColumnDef<T> {
    #[setters(skip)]
    id: String,
    #[setters(into)]
    header: String,
    #[setters(skip)]
    accessor: Accessor<T>,
    sortable: bool,
    filterable: bool,
    /// Participates in the global filter.
    searchable: bool,
    filter_mode: FilterMode,
    resizable: bool,
    pinnable: bool,
    hideable: bool,
    initial_width: u32,
    #[setters(skip)]
    action: bool,
}

impl<T> ColumnDef<T> {
    pub fn new(
        id: impl Into<String>,
        header: impl Into<String>,
        accessor: impl Fn(&T) -> CellValue + Send + Sync + 'static,
    ) -> Self {
        ColumnDef {
            id: id.into(),
            header: header.into(),
            accessor: Arc::new(accessor),
            sortable: true,
            filterable: true,
            searchable: true,
            filter_mode: FilterMode::Text,
            resizable: true,
            pinnable: true,
            hideable: true,
            initial_width: DEFAULT_COLUMN_WIDTH,
            action: false,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn header(&self) -> &str {
        &self.header
    }

    pub fn value(&self, row: &T) -> CellValue {
        (self.accessor)(row)
    }

    pub fn filter_mode(&self) -> FilterMode {
        if self.is_filterable() {
            self.filter_mode
        } else {
            FilterMode::None
        }
    }

    pub fn initial_width(&self) -> u32 {
        self.initial_width
    }

    pub fn is_action(&self) -> bool {
        self.action
    }

    pub fn is_sortable(&self) -> bool {
        self.sortable && !self.action
    }

    pub fn is_filterable(&self) -> bool {
        self.filterable && !self.action && self.filter_mode != FilterMode::None
    }

    pub fn is_searchable(&self) -> bool {
        self.searchable && self.filterable && !self.action
    }

    pub fn is_resizable(&self) -> bool {
        self.resizable
    }

    pub fn is_pinnable(&self) -> bool {
        self.pinnable
    }

    pub fn is_hideable(&self) -> bool {
        self.hideable
    }
}

impl<T: 'static> ColumnDef<T> {
    /// A column holding per-row controls (edit/delete menus). It carries no data and never takes
    /// part in sorting, filtering, search or export.
    pub fn action(id: impl Into<String>, header: impl Into<String>) -> Self {
        ColumnDef {
            action: true,
            sortable: false,
            filterable: false,
            searchable: false,
            filter_mode: FilterMode::None,
            hideable: false,
            initial_width: 100,
            ..ColumnDef::new(id, header, |_: &T| CellValue::Empty)
        }
    }
}

impl<T> Clone for ColumnDef<T> {
    fn clone(&self) -> Self {
        ColumnDef {
            id: self.id.clone(),
            header: self.header.clone(),
            accessor: Arc::clone(&self.accessor),
            sortable: self.sortable,
            filterable: self.filterable,
            searchable: self.searchable,
            filter_mode: self.filter_mode,
            resizable: self.resizable,
            pinnable: self.pinnable,
            hideable: self.hideable,
            initial_width: self.initial_width,
            action: self.action,
        }
    }
}

impl<T> fmt::Debug for ColumnDef<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ColumnDef")
            .field("id", &self.id)
            .field("header", &self.header)
            .field("filter_mode", &self.filter_mode)
            .field("sortable", &self.is_sortable())
            .field("filterable", &self.is_filterable())
            .field("action", &self.action)
            .field("initial_width", &self.initial_width)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Row {
        name: &'static str,
    }

    #[test]
    fn action_columns_never_sort_filter_or_search() {
        let ops: ColumnDef<Row> = ColumnDef::action("ops", "Ops")
            .with_sortable(true)
            .with_filterable(true)
            .with_searchable(true)
            .with_filter_mode(FilterMode::Text);
        assert!(!ops.is_sortable());
        assert!(!ops.is_filterable());
        assert!(!ops.is_searchable());
        assert!(!ops.is_hideable());
        assert_eq!(ops.filter_mode(), FilterMode::None);
    }

    #[test]
    fn accessor_reads_row() {
        let name = ColumnDef::new("name", "Name", |r: &Row| CellValue::from(r.name));
        assert_eq!(name.value(&Row { name: "A" }), CellValue::from("A"));
        assert_eq!(name.clone().header(), "Name");
    }

    #[test]
    fn none_mode_is_not_filterable() {
        let c = ColumnDef::new("n", "N", |r: &Row| CellValue::from(r.name))
            .with_filter_mode(FilterMode::None);
        assert!(!c.is_filterable());
        assert!(c.is_searchable());
    }
}
