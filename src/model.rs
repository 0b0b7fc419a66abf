//! The state store. [`TableModel`] owns rows, columns and the presentation state, and is the only
//! place the state is mutated.
//!
//! Every command returns whether it changed the state. A change re-derives the view, writes the
//! state through to the persistence backend, and notifies subscribers. A command that changes
//! nothing does none of that, so repeating a command is harmless.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use tracing::{debug, trace, warn};

use crate::column::ColumnDef;
use crate::domain::TableConfig;
use crate::export::{ExportScope, ExportTable};
use crate::filter::FilterValue;
use crate::persist::Persistence;
use crate::pipeline::{self, DerivedView};
use crate::state::{ColumnSort, Pagination, PinSide, PresentationState};

pub type RowKeyFn<T> = Arc<dyn Fn(&T) -> String + Send + Sync>;
pub type SubscriptionId = usize;

type Listener = Box<dyn FnMut(Change, &PresentationState) + Send>;

/// The part of the state a notification is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Change {
    Sorting,
    ColumnFilters,
    GlobalFilter,
    Pagination,
    ColumnSizing,
    ColumnOrder,
    ColumnVisibility,
    ColumnPinning,
    Expanded,
    All,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortAction {
    /// unsorted -> ascending -> descending -> unsorted
    Toggle,
    Set(SortDirection),
    Clear,
}

/// Where a visible column is drawn. `offset` is measured from the left edge for left-pinned and
/// centre columns, and from the right edge for right-pinned ones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnLayout {
    pub id: String,
    pub width: u32,
    pub pin: PinSide,
    pub offset: u32,
}

pub struct TableModel<T> {
    table_id: String,
    columns: Vec<ColumnDef<T>>,
    rows: Vec<T>,
    row_key: RowKeyFn<T>,
    config: TableConfig,
    state: PresentationState,
    view: DerivedView,
    persistence: Option<Persistence>,
    listeners: Vec<(SubscriptionId, Listener)>,
    next_subscription: SubscriptionId,
}

fn dedupe_columns<T>(columns: Vec<ColumnDef<T>>) -> Vec<ColumnDef<T>> {
    let mut seen = HashSet::new();
    columns
        .into_iter()
        .filter(|c| {
            let fresh = seen.insert(c.id().to_string());
            if !fresh {
                warn!("Dropping column with duplicate id {}", c.id());
            }
            fresh
        })
        .collect()
}

impl<T: Sync> TableModel<T> {
    pub fn new(
        table_id: impl Into<String>,
        columns: Vec<ColumnDef<T>>,
        rows: Vec<T>,
        row_key: impl Fn(&T) -> String + Send + Sync + 'static,
        config: TableConfig,
    ) -> Self {
        let columns = dedupe_columns(columns);
        let state = PresentationState::initial(&columns, &config);
        let mut model = TableModel {
            table_id: table_id.into(),
            columns,
            rows,
            row_key: Arc::new(row_key),
            config,
            state,
            view: DerivedView::default(),
            persistence: None,
            listeners: Vec::new(),
            next_subscription: 0,
        };
        model.refresh();
        model
    }

    /// Attach a persistence backend and restore the state saved under this table's id, if any.
    pub fn with_persistence(mut self, persistence: Persistence) -> Self {
        if let Some(mut restored) = persistence.load(&self.table_id) {
            restored.reconcile(&self.columns, &self.config);
            self.state = restored;
        }
        self.persistence = Some(persistence);
        self.refresh();
        self
    }

    // ---- reads ----

    pub fn table_id(&self) -> &str {
        &self.table_id
    }

    pub fn config(&self) -> &TableConfig {
        &self.config
    }

    pub fn state(&self) -> &PresentationState {
        &self.state
    }

    pub fn view(&self) -> &DerivedView {
        &self.view
    }

    pub fn columns(&self) -> &[ColumnDef<T>] {
        &self.columns
    }

    pub fn column(&self, column_id: &str) -> Option<&ColumnDef<T>> {
        self.columns.iter().find(|c| c.id() == column_id)
    }

    pub fn rows(&self) -> &[T] {
        &self.rows
    }

    pub fn row_key(&self, row: &T) -> String {
        (self.row_key)(row)
    }

    pub fn page_rows(&self) -> Vec<&T> {
        self.view.rows.iter().map(|&idx| &self.rows[idx]).collect()
    }

    pub fn sorted_rows(&self) -> Vec<&T> {
        self.view.sorted.iter().map(|&idx| &self.rows[idx]).collect()
    }

    pub fn is_row_expanded(&self, row: &T) -> bool {
        self.state.expanded_row_keys.contains(&self.row_key(row))
    }

    pub fn column_width(&self, column_id: &str) -> Option<u32> {
        let column = self.column(column_id)?;
        Some(
            self.state
                .column_sizing
                .get(column_id)
                .copied()
                .unwrap_or(column.initial_width()),
        )
    }

    /// Visible columns in display order: left-pinned, unpinned, right-pinned.
    pub fn visible_columns(&self) -> Vec<&ColumnDef<T>> {
        let mut visible: Vec<&ColumnDef<T>> = self
            .state
            .column_order
            .iter()
            .filter_map(|id| self.column(id))
            .filter(|c| !c.is_hideable() || self.state.is_visible(c.id()))
            .collect();
        visible.sort_by_key(|c| match self.state.pin_side(c.id()) {
            PinSide::Left => 0,
            PinSide::None => 1,
            PinSide::Right => 2,
        });
        visible
    }

    pub fn column_layout(&self) -> Vec<ColumnLayout> {
        let mut layout: Vec<ColumnLayout> = self
            .visible_columns()
            .into_iter()
            .map(|c| ColumnLayout {
                id: c.id().to_string(),
                width: self.column_width(c.id()).unwrap_or(c.initial_width()),
                pin: self.state.pin_side(c.id()),
                offset: 0,
            })
            .collect();

        let left_total: u32 = layout
            .iter()
            .filter(|l| l.pin == PinSide::Left)
            .map(|l| l.width)
            .sum();
        let mut left = 0;
        let mut centre = left_total;
        for l in layout.iter_mut() {
            match l.pin {
                PinSide::Left => {
                    l.offset = left;
                    left += l.width;
                }
                PinSide::None => {
                    l.offset = centre;
                    centre += l.width;
                }
                PinSide::Right => {}
            }
        }
        let mut right = 0;
        for l in layout.iter_mut().rev().filter(|l| l.pin == PinSide::Right) {
            l.offset = right;
            right += l.width;
        }
        layout
    }

    /// Visible data columns and the rows of `scope`, as display values.
    pub fn export(&self, scope: ExportScope) -> ExportTable {
        let columns: Vec<&ColumnDef<T>> = self
            .visible_columns()
            .into_iter()
            .filter(|c| !c.is_action())
            .collect();
        let rows = match scope {
            ExportScope::Filtered => &self.view.sorted,
            ExportScope::CurrentPage => &self.view.rows,
        };
        ExportTable {
            ids: columns.iter().map(|c| c.id().to_string()).collect(),
            headers: columns.iter().map(|c| c.header().to_string()).collect(),
            records: rows
                .iter()
                .map(|&idx| columns.iter().map(|c| c.value(&self.rows[idx])).collect())
                .collect(),
        }
    }

    // ---- subscriptions ----

    pub fn subscribe(
        &mut self,
        listener: impl FnMut(Change, &PresentationState) + Send + 'static,
    ) -> SubscriptionId {
        let id = self.next_subscription;
        self.next_subscription += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(sid, _)| *sid != id);
        self.listeners.len() != before
    }

    // ---- commands ----

    pub fn set_sort(&mut self, column_id: &str, action: SortAction, multi: bool) -> bool {
        if !self.column(column_id).is_some_and(|c| c.is_sortable()) {
            debug!("Ignoring sort on unknown or unsortable column {column_id}");
            return false;
        }
        let current = self.state.sort_of(column_id).map(|s| s.descending);
        let target = match action {
            SortAction::Toggle => match current {
                None => Some(false),
                Some(false) => Some(true),
                Some(true) => None,
            },
            SortAction::Set(direction) => Some(direction == SortDirection::Descending),
            SortAction::Clear => None,
        };

        let mut next = self.state.clone();
        if multi && self.config.multi_sort {
            let position = next.sorting.iter().position(|s| s.column_id == column_id);
            match (target, position) {
                (Some(descending), Some(pos)) => next.sorting[pos].descending = descending,
                (Some(descending), None) => next.sorting.push(ColumnSort {
                    column_id: column_id.to_string(),
                    descending,
                }),
                (None, Some(pos)) => {
                    next.sorting.remove(pos);
                }
                (None, None) => {}
            }
        } else {
            next.sorting = target
                .map(|descending| {
                    vec![ColumnSort {
                        column_id: column_id.to_string(),
                        descending,
                    }]
                })
                .unwrap_or_default();
        }
        self.commit(Change::Sorting, next)
    }

    /// `None`, an empty value, or a value not matching the column's filter mode clears the filter.
    pub fn set_column_filter(&mut self, column_id: &str, value: Option<FilterValue>) -> bool {
        let Some(mode) = self
            .column(column_id)
            .filter(|c| c.is_filterable())
            .map(|c| c.filter_mode())
        else {
            debug!("Ignoring filter on unknown or unfilterable column {column_id}");
            return false;
        };
        let mut next = self.state.clone();
        match value
            .map(FilterValue::normalized)
            .filter(|v| !v.is_empty() && v.fits(mode))
        {
            Some(value) => {
                next.column_filters.insert(column_id.to_string(), value);
            }
            None => {
                next.column_filters.remove(column_id);
            }
        }
        self.commit(Change::ColumnFilters, next)
    }

    pub fn set_global_filter(&mut self, query: impl Into<String>) -> bool {
        let mut next = self.state.clone();
        next.global_filter = query.into();
        self.commit(Change::GlobalFilter, next)
    }

    pub fn set_page_index(&mut self, page_index: usize) -> bool {
        let mut next = self.state.clone();
        next.pagination.page_index = page_index.min(self.view.page_count.saturating_sub(1));
        self.commit(Change::Pagination, next)
    }

    pub fn next_page(&mut self) -> bool {
        self.set_page_index(self.state.pagination.page_index.saturating_add(1))
    }

    pub fn previous_page(&mut self) -> bool {
        self.set_page_index(self.state.pagination.page_index.saturating_sub(1))
    }

    pub fn first_page(&mut self) -> bool {
        self.set_page_index(0)
    }

    pub fn last_page(&mut self) -> bool {
        self.set_page_index(self.view.page_count.saturating_sub(1))
    }

    /// Change the page size, keeping the row at the top of the current page visible.
    pub fn set_page_size(&mut self, page_size: usize) -> bool {
        if page_size == 0 {
            return false;
        }
        let Pagination {
            page_index,
            page_size: old_size,
        } = self.state.pagination;
        let mut next = self.state.clone();
        next.pagination = Pagination {
            page_index: page_index * old_size / page_size,
            page_size,
        };
        self.commit(Change::Pagination, next)
    }

    /// Widths are floored at the configured minimum. There is no maximum.
    pub fn resize_column(&mut self, column_id: &str, width: u32) -> bool {
        if !self.column(column_id).is_some_and(|c| c.is_resizable()) {
            return false;
        }
        let mut next = self.state.clone();
        next.column_sizing.insert(
            column_id.to_string(),
            width.max(self.config.min_column_width),
        );
        self.commit(Change::ColumnSizing, next)
    }

    pub fn reset_column_size(&mut self, column_id: &str) -> bool {
        let mut next = self.state.clone();
        next.column_sizing.remove(column_id);
        self.commit(Change::ColumnSizing, next)
    }

    pub fn pin_column(&mut self, column_id: &str, side: PinSide) -> bool {
        if !self.column(column_id).is_some_and(|c| c.is_pinnable()) {
            return false;
        }
        let mut next = self.state.clone();
        if side == PinSide::None {
            next.column_pinning.remove(column_id);
        } else {
            next.column_pinning.insert(column_id.to_string(), side);
        }
        self.commit(Change::ColumnPinning, next)
    }

    /// `order` must name every column exactly once.
    pub fn reorder_columns(&mut self, order: Vec<String>) -> bool {
        let unique: HashSet<&str> = order.iter().map(String::as_str).collect();
        let is_permutation = order.len() == self.columns.len()
            && unique.len() == order.len()
            && self.columns.iter().all(|c| unique.contains(c.id()));
        if !is_permutation {
            debug!("Ignoring column order that is not a permutation of the columns: {order:?}");
            return false;
        }
        let mut next = self.state.clone();
        next.column_order = order;
        self.commit(Change::ColumnOrder, next)
    }

    pub fn move_column(&mut self, column_id: &str, to_index: usize) -> bool {
        let mut order = self.state.column_order.clone();
        let Some(from) = order.iter().position(|id| id == column_id) else {
            return false;
        };
        let id = order.remove(from);
        order.insert(to_index.min(order.len()), id);
        self.reorder_columns(order)
    }

    pub fn toggle_column_visibility(&mut self, column_id: &str) -> bool {
        let visible = self.state.is_visible(column_id);
        self.set_column_visibility(column_id, !visible)
    }

    pub fn set_column_visibility(&mut self, column_id: &str, visible: bool) -> bool {
        if !self.column(column_id).is_some_and(|c| c.is_hideable()) {
            return false;
        }
        let mut next = self.state.clone();
        if visible {
            next.column_visibility.remove(column_id);
        } else {
            next.column_visibility.insert(column_id.to_string(), false);
        }
        self.commit(Change::ColumnVisibility, next)
    }

    pub fn toggle_row_expanded(&mut self, row_key: &str) -> bool {
        let mut next = self.state.clone();
        if !next.expanded_row_keys.remove(row_key) {
            next.expanded_row_keys.insert(row_key.to_string());
        }
        self.commit(Change::Expanded, next)
    }

    pub fn reset_sorting(&mut self) -> bool {
        let mut next = self.state.clone();
        next.sorting.clear();
        self.commit(Change::Sorting, next)
    }

    /// Clears the column filters and the global filter.
    pub fn reset_filters(&mut self) -> bool {
        let mut next = self.state.clone();
        next.column_filters.clear();
        next.global_filter.clear();
        self.commit(Change::ColumnFilters, next)
    }

    pub fn reset_global_filter(&mut self) -> bool {
        self.set_global_filter("")
    }

    pub fn reset_column_order(&mut self) -> bool {
        let mut next = self.state.clone();
        next.column_order = self.columns.iter().map(|c| c.id().to_string()).collect();
        self.commit(Change::ColumnOrder, next)
    }

    pub fn reset_column_sizing(&mut self) -> bool {
        let mut next = self.state.clone();
        next.column_sizing.clear();
        self.commit(Change::ColumnSizing, next)
    }

    pub fn reset_column_pinning(&mut self) -> bool {
        let mut next = self.state.clone();
        next.column_pinning.clear();
        self.commit(Change::ColumnPinning, next)
    }

    pub fn reset_column_visibility(&mut self) -> bool {
        let mut next = self.state.clone();
        next.column_visibility.clear();
        self.commit(Change::ColumnVisibility, next)
    }

    pub fn reset_pagination(&mut self) -> bool {
        let mut next = self.state.clone();
        next.pagination = Pagination {
            page_index: 0,
            page_size: self.config.default_page_size(),
        };
        self.commit(Change::Pagination, next)
    }

    pub fn reset_expanded(&mut self) -> bool {
        let mut next = self.state.clone();
        next.expanded_row_keys.clear();
        self.commit(Change::Expanded, next)
    }

    pub fn reset_all(&mut self) -> bool {
        let next = PresentationState::initial(&self.columns, &self.config);
        self.commit(Change::All, next)
    }

    // ---- row and column mutation ----

    /// Replace the rows. The presentation state is kept; only the page index may be clamped.
    pub fn set_rows(&mut self, rows: Vec<T>) {
        self.rows = rows;
        self.rows_changed(self.state.clone());
    }

    /// Replace the row with the same key, or insert it at the top.
    pub fn upsert_row(&mut self, row: T) {
        let key = self.row_key(&row);
        match self.rows.iter().position(|r| (self.row_key)(r) == key) {
            Some(pos) => self.rows[pos] = row,
            None => self.rows.insert(0, row),
        }
        self.rows_changed(self.state.clone());
    }

    pub fn remove_row(&mut self, row_key: &str) -> bool {
        let Some(pos) = self.rows.iter().position(|r| (self.row_key)(r) == row_key) else {
            return false;
        };
        self.rows.remove(pos);
        let mut next = self.state.clone();
        next.expanded_row_keys.remove(row_key);
        self.rows_changed(next);
        true
    }

    pub fn set_columns(&mut self, columns: Vec<ColumnDef<T>>) {
        self.columns = dedupe_columns(columns);
        let mut next = self.state.clone();
        next.reconcile(&self.columns, &self.config);
        let view = self.derive(&mut next);
        self.view = view;
        if next != self.state {
            self.state = next;
            self.persist();
            self.notify(Change::All);
        }
    }

    // ---- internals ----

    fn derive(&self, state: &mut PresentationState) -> DerivedView {
        let view = pipeline::derive(&self.rows, &self.columns, state, &self.config);
        state.pagination.page_index = view.page_index;
        view
    }

    fn refresh(&mut self) {
        let mut state = std::mem::take(&mut self.state);
        self.view = self.derive(&mut state);
        self.state = state;
    }

    fn commit(&mut self, change: Change, mut next: PresentationState) -> bool {
        if next == self.state {
            return false;
        }
        let view = self.derive(&mut next);
        if next == self.state {
            return false;
        }
        debug!("Table {}: {change:?} changed", self.table_id);
        self.state = next;
        self.view = view;
        self.persist();
        self.notify(change);
        true
    }

    fn rows_changed(&mut self, mut next: PresentationState) {
        self.view = self.derive(&mut next);
        trace!(
            "Table {} now has {} rows",
            self.table_id,
            self.view.total_row_count
        );
        let expanded = next.expanded_row_keys != self.state.expanded_row_keys;
        let pagination = next.pagination != self.state.pagination;
        if !expanded && !pagination {
            return;
        }
        self.state = next;
        self.persist();
        if expanded {
            self.notify(Change::Expanded);
        }
        if pagination {
            self.notify(Change::Pagination);
        }
    }

    fn persist(&mut self) {
        if let Some(persistence) = self.persistence.as_mut()
            && let Err(e) = persistence.save(&self.table_id, &self.state)
        {
            warn!("Failed to persist state of table {}: {e}", self.table_id);
        }
    }

    fn notify(&mut self, change: Change) {
        for (_, listener) in self.listeners.iter_mut() {
            listener(change, &self.state);
        }
    }
}

impl<T> fmt::Debug for TableModel<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TableModel")
            .field("table_id", &self.table_id)
            .field("columns", &self.columns)
            .field("rows", &self.rows.len())
            .field("state", &self.state)
            .field("listeners", &self.listeners.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::FilterMode;
    use crate::persist::MemoryBackend;
    use crate::value::CellValue;
    use pretty_assertions::assert_eq;
    use std::sync::Mutex;

    #[derive(Debug, Clone, PartialEq)]
    struct Person {
        id: u32,
        name: &'static str,
        age: u32,
        eye: &'static str,
    }

    fn person(id: u32, name: &'static str, age: u32, eye: &'static str) -> Person {
        Person { id, name, age, eye }
    }

    fn people(n: u32) -> Vec<Person> {
        let eyes = ["Blue", "Brown", "Green"];
        (0..n)
            .map(|i| person(i, "someone", 20 + i % 30, eyes[(i % 3) as usize]))
            .collect()
    }

    fn columns() -> Vec<ColumnDef<Person>> {
        vec![
            ColumnDef::new("name", "Name", |p: &Person| CellValue::from(p.name)),
            ColumnDef::new("age", "Age", |p: &Person| CellValue::from(p.age))
                .with_filter_mode(FilterMode::NumberRange)
                .with_initial_width(60),
            ColumnDef::new("eye", "Eye", |p: &Person| CellValue::from(p.eye))
                .with_filter_mode(FilterMode::Select)
                .with_resizable(false),
            ColumnDef::action("ops", "Ops"),
        ]
    }

    fn model(rows: Vec<Person>) -> TableModel<Person> {
        TableModel::new(
            "people",
            columns(),
            rows,
            |p: &Person| p.id.to_string(),
            TableConfig::default(),
        )
    }

    fn recorder(model: &mut TableModel<Person>) -> Arc<Mutex<Vec<Change>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        model.subscribe(move |change, _| sink.lock().unwrap().push(change));
        seen
    }

    fn sort_ids(model: &TableModel<Person>) -> Vec<(String, bool)> {
        model
            .state()
            .sorting
            .iter()
            .map(|s| (s.column_id.clone(), s.descending))
            .collect()
    }

    #[test]
    fn toggle_cycles_through_directions() {
        let mut m = model(people(5));
        assert!(m.set_sort("age", SortAction::Toggle, false));
        assert_eq!(sort_ids(&m), vec![("age".to_string(), false)]);
        assert!(m.set_sort("age", SortAction::Toggle, false));
        assert_eq!(sort_ids(&m), vec![("age".to_string(), true)]);
        assert!(m.set_sort("age", SortAction::Toggle, false));
        assert!(m.state().sorting.is_empty());
    }

    #[test]
    fn multi_sort_appends_and_single_replaces() {
        let mut m = model(people(5));
        m.set_sort("age", SortAction::Set(SortDirection::Descending), false);
        m.set_sort("name", SortAction::Toggle, true);
        assert_eq!(
            sort_ids(&m),
            vec![("age".to_string(), true), ("name".to_string(), false)]
        );
        m.set_sort("age", SortAction::Clear, true);
        assert_eq!(sort_ids(&m), vec![("name".to_string(), false)]);
        m.set_sort("eye", SortAction::Toggle, false);
        assert_eq!(sort_ids(&m), vec![("eye".to_string(), false)]);
    }

    #[test]
    fn multi_sort_can_be_disabled() {
        let mut m = TableModel::new(
            "people",
            columns(),
            people(3),
            |p: &Person| p.id.to_string(),
            TableConfig::default().with_multi_sort(false),
        );
        m.set_sort("age", SortAction::Toggle, true);
        m.set_sort("name", SortAction::Toggle, true);
        assert_eq!(sort_ids(&m), vec![("name".to_string(), false)]);
    }

    #[test]
    fn unknown_targets_are_noops() {
        let mut m = model(people(5));
        let seen = recorder(&mut m);
        let before = m.state().clone();
        assert!(!m.set_sort("nope", SortAction::Toggle, false));
        assert!(!m.set_sort("ops", SortAction::Toggle, false));
        assert!(!m.set_column_filter("ops", Some(FilterValue::Text("x".into()))));
        assert!(!m.resize_column("eye", 300));
        assert!(!m.set_column_visibility("ops", false));
        assert!(!m.reorder_columns(vec!["name".into(), "age".into()]));
        assert!(!m.reorder_columns(vec![
            "name".into(),
            "name".into(),
            "eye".into(),
            "ops".into()
        ]));
        assert!(!m.set_page_size(0));
        assert_eq!(m.state(), &before);
        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn commands_are_idempotent() {
        let mut m = model(people(5));
        let seen = recorder(&mut m);
        assert!(m.set_global_filter("some"));
        assert!(!m.set_global_filter("some"));
        assert!(m.resize_column("age", 90));
        assert!(!m.resize_column("age", 90));
        assert_eq!(
            *seen.lock().unwrap(),
            vec![Change::GlobalFilter, Change::ColumnSizing]
        );
    }

    #[test]
    fn filter_values_of_wrong_shape_clear_the_filter() {
        let mut m = model(people(9));
        assert!(m.set_column_filter("eye", Some(FilterValue::Select(vec!["Blue".into()]))));
        assert_eq!(m.view().filtered_row_count, 3);
        assert!(m.set_column_filter("eye", Some(FilterValue::Text("Blue".into()))));
        assert!(m.state().column_filters.is_empty());
        assert!(!m.set_column_filter("eye", Some(FilterValue::Select(vec![]))));
    }

    #[test]
    fn paging_is_clamped() {
        let mut m = model(people(25));
        assert_eq!(m.view().page_count, 3);
        assert!(m.last_page());
        assert_eq!(m.state().pagination.page_index, 2);
        assert!(!m.next_page());
        assert!(!m.set_page_index(99));
        assert_eq!(m.page_rows().len(), 5);
        assert!(m.first_page());
        assert!(!m.previous_page());
    }

    #[test]
    fn shrinking_filter_clamps_and_writes_back_page_index() {
        let mut m = model(people(25));
        m.last_page();
        m.set_global_filter("nobody");
        assert_eq!(m.state().pagination.page_index, 0);
        assert_eq!(m.view().page_count, 1);
    }

    #[test]
    fn page_size_change_keeps_top_row_visible() {
        let mut m = model(people(100));
        m.set_page_index(3);
        let top = m.page_rows()[0].id;
        assert!(m.set_page_size(25));
        assert_eq!(m.state().pagination.page_index, 1);
        assert!(m.page_rows().iter().any(|p| p.id == top));

        let top = m.page_rows()[0].id;
        assert!(m.set_page_size(5));
        assert!(m.page_rows().iter().any(|p| p.id == top));
    }

    #[test]
    fn resize_is_floored() {
        let mut m = model(people(3));
        assert_eq!(m.column_width("age"), Some(60));
        m.resize_column("age", 5);
        assert_eq!(m.column_width("age"), Some(20));
        m.resize_column("age", 5000);
        assert_eq!(m.column_width("age"), Some(5000));
        assert!(m.reset_column_size("age"));
        assert_eq!(m.column_width("age"), Some(60));
    }

    #[test]
    fn visible_columns_follow_pinning_order_and_visibility() {
        let mut m = model(people(3));
        m.pin_column("eye", PinSide::Left);
        m.pin_column("name", PinSide::Right);
        m.set_column_visibility("age", false);
        let ids: Vec<&str> = m.visible_columns().iter().map(|c| c.id()).collect();
        assert_eq!(ids, vec!["eye", "ops", "name"]);

        m.toggle_column_visibility("age");
        m.pin_column("name", PinSide::None);
        m.move_column("ops", 0);
        let ids: Vec<&str> = m.visible_columns().iter().map(|c| c.id()).collect();
        assert_eq!(ids, vec!["eye", "ops", "name", "age"]);
    }

    #[test]
    fn layout_offsets() {
        let mut m = model(people(3));
        m.resize_column("name", 100);
        m.pin_column("name", PinSide::Left);
        m.pin_column("age", PinSide::Right);
        let layout = m.column_layout();
        let offsets: Vec<(&str, u32, u32)> = layout
            .iter()
            .map(|l| (l.id.as_str(), l.width, l.offset))
            .collect();
        assert_eq!(
            offsets,
            vec![("name", 100, 0), ("eye", 150, 100), ("ops", 100, 250), ("age", 60, 0)]
        );
    }

    #[test]
    fn expansion_survives_sort_and_filter() {
        let mut m = model(people(12));
        assert!(m.toggle_row_expanded("4"));
        m.set_sort("age", SortAction::Toggle, false);
        m.set_column_filter("eye", Some(FilterValue::Select(vec!["Brown".into()])));
        let row = person(4, "someone", 24, "Brown");
        assert!(m.is_row_expanded(&row));
        assert!(m.toggle_row_expanded("4"));
        assert!(!m.is_row_expanded(&row));
    }

    #[test]
    fn row_mutation_keeps_state() {
        let mut m = model(people(3));
        m.set_sort("age", SortAction::Set(SortDirection::Descending), false);
        m.toggle_row_expanded("1");
        let seen = recorder(&mut m);

        m.upsert_row(person(9, "new", 99, "Blue"));
        assert_eq!(m.rows()[0].id, 9);
        assert_eq!(m.sorted_rows()[0].id, 9);
        m.upsert_row(person(9, "renamed", 1, "Blue"));
        assert_eq!(m.rows().len(), 4);
        assert_eq!(m.rows()[0].name, "renamed");

        assert!(m.remove_row("1"));
        assert!(!m.remove_row("1"));
        assert!(m.state().expanded_row_keys.is_empty());
        assert_eq!(m.state().sorting.len(), 1);
        assert_eq!(*seen.lock().unwrap(), vec![Change::Expanded]);
    }

    #[test]
    fn removing_rows_clamps_page() {
        let mut m = model(people(21));
        m.last_page();
        let seen = recorder(&mut m);
        m.remove_row("20");
        assert_eq!(m.state().pagination.page_index, 1);
        assert_eq!(*seen.lock().unwrap(), vec![Change::Pagination]);
    }

    #[test]
    fn resets_restore_defaults() {
        let mut m = model(people(30));
        m.set_sort("age", SortAction::Toggle, false);
        m.set_global_filter("x");
        m.set_column_filter("eye", Some(FilterValue::Select(vec!["Blue".into()])));
        m.set_page_size(20);
        m.pin_column("name", PinSide::Left);

        assert!(m.reset_filters());
        assert!(m.state().column_filters.is_empty());
        assert!(m.state().global_filter.is_empty());
        assert!(m.reset_all());
        assert_eq!(
            m.state(),
            &PresentationState::initial(&columns(), &TableConfig::default())
        );
        assert!(!m.reset_all());
    }

    #[test]
    fn unsubscribe_stops_notifications() {
        let mut m = model(people(3));
        let seen = Arc::new(Mutex::new(0));
        let sink = Arc::clone(&seen);
        let id = m.subscribe(move |_, _| *sink.lock().unwrap() += 1);
        m.set_global_filter("a");
        assert!(m.unsubscribe(id));
        assert!(!m.unsubscribe(id));
        m.set_global_filter("b");
        assert_eq!(*seen.lock().unwrap(), 1);
    }

    #[test]
    fn duplicate_columns_are_dropped() {
        let mut cols = columns();
        cols.push(ColumnDef::new("age", "Age again", |_: &Person| CellValue::Empty));
        let m = TableModel::new(
            "t",
            cols,
            people(1),
            |p: &Person| p.id.to_string(),
            TableConfig::default(),
        );
        assert_eq!(m.columns().len(), 4);
        assert_eq!(m.column("age").map(|c| c.header()), Some("Age"));
    }

    #[test]
    fn set_columns_reconciles_state() {
        let mut m = model(people(3));
        m.set_sort("eye", SortAction::Toggle, false);
        m.pin_column("eye", PinSide::Left);
        let remaining: Vec<ColumnDef<Person>> =
            columns().into_iter().filter(|c| c.id() != "eye").collect();
        m.set_columns(remaining);
        assert!(m.state().sorting.is_empty());
        assert!(m.state().column_pinning.is_empty());
        assert_eq!(m.state().column_order, vec!["name", "age", "ops"]);
    }

    #[test]
    fn export_scopes() {
        let mut m = model(people(12));
        m.set_page_size(5);
        m.set_column_visibility("name", false);
        let page = m.export(ExportScope::CurrentPage);
        assert_eq!(page.ids, vec!["age", "eye"]);
        assert_eq!(page.row_count(), 5);
        assert_eq!(m.export(ExportScope::Filtered).row_count(), 12);
    }

    #[test]
    fn state_is_written_through_and_restored() {
        let backend = MemoryBackend::new();
        let mut m = model(people(30)).with_persistence(Persistence::new(backend.clone()));
        m.set_sort("age", SortAction::Toggle, false);
        m.set_page_index(2);
        assert!(backend.get("people").is_some());

        let restored = model(people(30)).with_persistence(Persistence::new(backend));
        assert_eq!(restored.state(), m.state());
        assert_eq!(restored.view(), m.view());
    }
}
