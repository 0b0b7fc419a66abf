use std::collections::{BTreeMap, BTreeSet, HashSet};

use serde::{Deserialize, Deserializer, Serialize};
use tracing::{debug, warn};

use crate::column::ColumnDef;
use crate::domain::{DEFAULT_PAGE_SIZE, TableConfig};
use crate::filter::FilterValue;

/// Version written into every persisted blob.
pub const STATE_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnSort {
    pub column_id: String,
    #[serde(default)]
    pub descending: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Pagination {
    pub page_index: usize,
    pub page_size: usize,
}

impl Default for Pagination {
    fn default() -> Self {
        Pagination {
            page_index: 0,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PinSide {
    #[default]
    None,
    Left,
    Right,
}

/// Everything about how a table is presented. This is the unit that gets persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PresentationState {
    pub version: u32,
    /// First entry is the primary sort key.
    pub sorting: Vec<ColumnSort>,
    #[serde(deserialize_with = "lenient_filters")]
    pub column_filters: BTreeMap<String, FilterValue>,
    pub global_filter: String,
    pub pagination: Pagination,
    pub column_sizing: BTreeMap<String, u32>,
    pub column_order: Vec<String>,
    pub column_visibility: BTreeMap<String, bool>,
    pub column_pinning: BTreeMap<String, PinSide>,
    pub expanded_row_keys: BTreeSet<String>,
}

impl Default for PresentationState {
    fn default() -> Self {
        PresentationState {
            version: STATE_VERSION,
            sorting: Vec::new(),
            column_filters: BTreeMap::new(),
            global_filter: String::new(),
            pagination: Pagination::default(),
            column_sizing: BTreeMap::new(),
            column_order: Vec::new(),
            column_visibility: BTreeMap::new(),
            column_pinning: BTreeMap::new(),
            expanded_row_keys: BTreeSet::new(),
        }
    }
}

// A single undecodable filter must not throw away the rest of a persisted state.
fn lenient_filters<'de, D>(deserializer: D) -> Result<BTreeMap<String, FilterValue>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = BTreeMap::<String, serde_json::Value>::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .filter_map(|(id, value)| match serde_json::from_value::<FilterValue>(value) {
            Ok(filter) => Some((id, filter)),
            Err(e) => {
                warn!("Dropping unreadable filter for column {id}: {e}");
                None
            }
        })
        .collect())
}

impl PresentationState {
    /// The default state for a column set.
    pub fn initial<T>(columns: &[ColumnDef<T>], config: &TableConfig) -> Self {
        PresentationState {
            pagination: Pagination {
                page_index: 0,
                page_size: config.default_page_size(),
            },
            column_order: columns.iter().map(|c| c.id().to_string()).collect(),
            ..PresentationState::default()
        }
    }

    pub fn is_visible(&self, column_id: &str) -> bool {
        self.column_visibility
            .get(column_id)
            .copied()
            .unwrap_or(true)
    }

    pub fn pin_side(&self, column_id: &str) -> PinSide {
        self.column_pinning
            .get(column_id)
            .copied()
            .unwrap_or_default()
    }

    pub fn sort_of(&self, column_id: &str) -> Option<&ColumnSort> {
        self.sorting.iter().find(|s| s.column_id == column_id)
    }

    /// Make the state consistent with `columns`: entries for unknown columns go away, new
    /// columns are appended to the order, and filter values that do not fit their column's mode
    /// are dropped.
    pub fn reconcile<T>(&mut self, columns: &[ColumnDef<T>], config: &TableConfig) {
        let known: HashSet<&str> = columns.iter().map(|c| c.id()).collect();
        let column = |id: &str| columns.iter().find(|c| c.id() == id);

        let mut seen = HashSet::new();
        self.column_order
            .retain(|id| known.contains(id.as_str()) && seen.insert(id.clone()));
        for c in columns {
            if !seen.contains(c.id()) {
                debug!("Appending new column {} to column order", c.id());
                self.column_order.push(c.id().to_string());
            }
        }

        self.column_sizing
            .retain(|id, _| column(id).is_some_and(|c| c.is_resizable()));
        self.column_visibility
            .retain(|id, visible| column(id).is_some_and(|c| c.is_hideable() || *visible));
        self.column_pinning.retain(|id, side| {
            *side != PinSide::None && column(id).is_some_and(|c| c.is_pinnable())
        });
        self.column_filters.retain(|id, value| {
            column(id).is_some_and(|c| value.fits(c.filter_mode()) && !value.is_empty())
        });

        let mut sorted = HashSet::new();
        self.sorting.retain(|s| {
            column(&s.column_id).is_some_and(|c| c.is_sortable())
                && sorted.insert(s.column_id.clone())
        });

        if self.pagination.page_size == 0 {
            self.pagination.page_size = config.default_page_size();
        }
        self.version = STATE_VERSION;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::FilterMode;
    use crate::value::CellValue;
    use pretty_assertions::assert_eq;

    struct Row;

    fn columns(ids: &[&str]) -> Vec<ColumnDef<Row>> {
        ids.iter()
            .map(|id| ColumnDef::new(*id, *id, |_: &Row| CellValue::Empty))
            .collect()
    }

    #[test]
    fn initial_state_orders_all_columns() {
        let config = TableConfig::default().with_page_size(20);
        let state = PresentationState::initial(&columns(&["a", "b"]), &config);
        assert_eq!(state.column_order, vec!["a", "b"]);
        assert_eq!(state.pagination.page_size, 20);
        assert!(state.is_visible("a"));
        assert_eq!(state.pin_side("a"), PinSide::None);
    }

    #[test]
    fn reconcile_drops_unknown_and_appends_new() {
        let mut state = PresentationState::default();
        state.column_order = vec!["gone".into(), "b".into(), "b".into()];
        state.column_sizing.insert("gone".into(), 40);
        state.column_sizing.insert("b".into(), 40);
        state.column_visibility.insert("gone".into(), false);
        state.column_pinning.insert("gone".into(), PinSide::Left);
        state.sorting.push(ColumnSort {
            column_id: "gone".into(),
            descending: false,
        });

        state.reconcile(&columns(&["a", "b", "c"]), &TableConfig::default());

        assert_eq!(state.column_order, vec!["b", "a", "c"]);
        assert_eq!(state.column_sizing.len(), 1);
        assert!(state.column_visibility.is_empty());
        assert!(state.column_pinning.is_empty());
        assert!(state.sorting.is_empty());
    }

    #[test]
    fn reconcile_drops_filters_of_wrong_shape() {
        let cols = vec![
            ColumnDef::new("age", "Age", |_: &Row| CellValue::Empty)
                .with_filter_mode(FilterMode::NumberRange),
        ];
        let mut state = PresentationState::default();
        state
            .column_filters
            .insert("age".into(), FilterValue::Select(vec!["1".into()]));
        state.reconcile(&cols, &TableConfig::default());
        assert!(state.column_filters.is_empty());

        state.column_filters.insert(
            "age".into(),
            FilterValue::NumberRange {
                min: Some(1.0),
                max: None,
            },
        );
        state.reconcile(&cols, &TableConfig::default());
        assert_eq!(state.column_filters.len(), 1);
    }

    #[test]
    fn missing_fields_are_defaulted_and_unknown_ignored() {
        let state: PresentationState =
            serde_json::from_str(r#"{"globalFilter":"x","someFutureField":[1,2]}"#).unwrap();
        assert_eq!(state.global_filter, "x");
        assert_eq!(state.pagination, Pagination::default());
        assert_eq!(state.version, STATE_VERSION);
    }

    #[test]
    fn unreadable_filter_entries_are_dropped_alone() {
        let state: PresentationState = serde_json::from_str(
            r#"{"columnFilters":{
                "a":{"kind":"select","value":["x"]},
                "b":{"kind":"teleport","value":3}
            }}"#,
        )
        .unwrap();
        assert_eq!(state.column_filters.len(), 1);
        assert!(state.column_filters.contains_key("a"));
    }

    #[test]
    fn zero_page_size_is_repaired() {
        let mut state: PresentationState =
            serde_json::from_str(r#"{"pagination":{"pageIndex":3,"pageSize":0}}"#).unwrap();
        state.reconcile(&columns(&["a"]), &TableConfig::default());
        assert_eq!(state.pagination.page_size, DEFAULT_PAGE_SIZE);
        assert_eq!(state.pagination.page_index, 3);
    }
}
