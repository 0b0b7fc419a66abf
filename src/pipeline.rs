//! Derivation pipeline: rows -> global filter -> column filters -> facets -> sort -> page.
//!
//! `derive` is a pure function of its inputs. Identical inputs always give an identical view,
//! which is what makes a reloaded state show exactly what was shown before.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::time::Instant;

use rayon::prelude::*;
use tracing::trace;

use crate::column::ColumnDef;
use crate::domain::TableConfig;
use crate::filter::{self, FilterOptions, FilterValue, TextMatch};
use crate::state::{ColumnSort, PresentationState};
use crate::value::{CellValue, compare_cells};

/// Value distribution of one column over the rows that pass every filter except its own.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnFacets {
    pub counts: BTreeMap<String, usize>,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl ColumnFacets {
    fn add(&mut self, cell: &CellValue) {
        if cell.is_empty() {
            return;
        }
        *self.counts.entry(cell.display()).or_insert(0) += 1;
        if let CellValue::Number(n) = cell {
            self.min = Some(self.min.map_or(*n, |m| m.min(*n)));
            self.max = Some(self.max.map_or(*n, |m| m.max(*n)));
        }
    }

    pub fn count(&self, value: &str) -> usize {
        self.counts.get(value).copied().unwrap_or(0)
    }

    /// Distinct values, sorted.
    pub fn options(&self) -> impl Iterator<Item = &str> {
        self.counts.keys().map(String::as_str)
    }

    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }
}

/// The result of running the pipeline. Rows are referenced by their index in the source slice.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DerivedView {
    /// Rows on the current page, in display order.
    pub rows: Vec<usize>,
    /// Every row that passed the filters, in display order.
    pub sorted: Vec<usize>,
    pub total_row_count: usize,
    pub filtered_row_count: usize,
    pub page_count: usize,
    /// The page index after clamping into `[0, page_count)`.
    pub page_index: usize,
    pub facets: BTreeMap<String, ColumnFacets>,
}

struct ActiveFilter<'a> {
    column: usize,
    value: &'a FilterValue,
}

pub fn derive<T: Sync>(
    rows: &[T],
    columns: &[ColumnDef<T>],
    state: &PresentationState,
    config: &TableConfig,
) -> DerivedView {
    let start_time = Instant::now();
    let options = config.filter_options();

    // Column-major cell matrix, one accessor call per cell.
    let cells: Vec<Vec<CellValue>> = columns
        .par_iter()
        .map(|c| rows.iter().map(|r| c.value(r)).collect())
        .collect();

    let global = global_matches(
        &cells,
        rows.len(),
        columns,
        &state.global_filter,
        options.text_match,
    );
    let active = active_filters(columns, state);

    // For every row: how many column filters it fails, and the last one it failed.
    let failures: Vec<(usize, Option<usize>)> = (0..rows.len())
        .map(|ridx| {
            let mut failed = 0;
            let mut last = None;
            for (fidx, f) in active.iter().enumerate() {
                if !passes(f, &cells, ridx, &options, columns) {
                    failed += 1;
                    last = Some(fidx);
                }
            }
            (failed, last)
        })
        .collect();

    let filtered: Vec<usize> = (0..rows.len())
        .filter(|&ridx| global[ridx] && failures[ridx].0 == 0)
        .collect();

    let facets = build_facets(&cells, columns, &active, &global, &failures);
    let sorted = sort_rows(filtered, &cells, columns, &state.sorting);

    let page_size = state.pagination.page_size.max(1);
    let filtered_row_count = sorted.len();
    let page_count = filtered_row_count.div_ceil(page_size).max(1);
    let page_index = state.pagination.page_index.min(page_count - 1);
    let begin = (page_index * page_size).min(filtered_row_count);
    let end = (begin + page_size).min(filtered_row_count);

    trace!(
        "Derived {} of {} rows, page {}/{} in {}us",
        filtered_row_count,
        rows.len(),
        page_index + 1,
        page_count,
        start_time.elapsed().as_micros()
    );

    DerivedView {
        rows: sorted[begin..end].to_vec(),
        total_row_count: rows.len(),
        filtered_row_count,
        page_count,
        page_index,
        facets,
        sorted,
    }
}

fn global_matches<T>(
    cells: &[Vec<CellValue>],
    nrows: usize,
    columns: &[ColumnDef<T>],
    query: &str,
    text_match: TextMatch,
) -> Vec<bool> {
    if query.is_empty() {
        return vec![true; nrows];
    }
    let searchable: Vec<usize> = columns
        .iter()
        .enumerate()
        .filter(|(_, c)| c.is_searchable())
        .map(|(cidx, _)| cidx)
        .collect();
    (0..nrows)
        .map(|ridx| {
            searchable
                .iter()
                .any(|&cidx| filter::text_contains(&cells[cidx][ridx], query, text_match))
        })
        .collect()
}

fn active_filters<'a, T>(
    columns: &[ColumnDef<T>],
    state: &'a PresentationState,
) -> Vec<ActiveFilter<'a>> {
    columns
        .iter()
        .enumerate()
        .filter_map(|(cidx, c)| {
            let value = state.column_filters.get(c.id())?;
            (c.is_filterable() && value.fits(c.filter_mode()) && !value.is_empty())
                .then_some(ActiveFilter { column: cidx, value })
        })
        .collect()
}

fn passes<T>(
    f: &ActiveFilter<'_>,
    cells: &[Vec<CellValue>],
    ridx: usize,
    options: &FilterOptions,
    columns: &[ColumnDef<T>],
) -> bool {
    filter::evaluate(
        columns[f.column].filter_mode(),
        &cells[f.column][ridx],
        f.value,
        options,
    )
}

fn build_facets<T>(
    cells: &[Vec<CellValue>],
    columns: &[ColumnDef<T>],
    active: &[ActiveFilter<'_>],
    global: &[bool],
    failures: &[(usize, Option<usize>)],
) -> BTreeMap<String, ColumnFacets> {
    columns
        .par_iter()
        .enumerate()
        .filter(|(_, c)| c.is_filterable())
        .map(|(cidx, c)| {
            let own = active.iter().position(|f| f.column == cidx);
            let mut facets = ColumnFacets::default();
            for (ridx, &(failed, last)) in failures.iter().enumerate() {
                let qualifies = failed == 0 || (failed == 1 && own.is_some() && last == own);
                if global[ridx] && qualifies {
                    facets.add(&cells[cidx][ridx]);
                }
            }
            (c.id().to_string(), facets)
        })
        .collect()
}

/// Stable multi-key sort. Sort entries for unknown or unsortable columns are skipped.
fn sort_rows<T>(
    mut rows: Vec<usize>,
    cells: &[Vec<CellValue>],
    columns: &[ColumnDef<T>],
    sorting: &[ColumnSort],
) -> Vec<usize> {
    let keys: Vec<(usize, bool)> = sorting
        .iter()
        .filter_map(|s| {
            columns
                .iter()
                .position(|c| c.id() == s.column_id && c.is_sortable())
                .map(|cidx| (cidx, s.descending))
        })
        .collect();
    if keys.is_empty() {
        return rows;
    }
    rows.sort_by(|&a, &b| {
        for &(cidx, descending) in &keys {
            let ordering = compare_for_sort(&cells[cidx][a], &cells[cidx][b], descending);
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    });
    rows
}

/// Empty cells go last in both directions.
fn compare_for_sort(a: &CellValue, b: &CellValue, descending: bool) -> Ordering {
    match (a.is_empty(), b.is_empty()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => {
            let ordering = compare_cells(a, b);
            if descending { ordering.reverse() } else { ordering }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::FilterMode;
    use crate::state::ColumnSort;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    #[derive(Debug, Clone)]
    struct Person {
        name: &'static str,
        age: u32,
        eye: &'static str,
        team: &'static str,
    }

    fn people() -> Vec<Person> {
        vec![
            Person { name: "Ann", age: 30, eye: "Blue", team: "red" },
            Person { name: "Bob", age: 25, eye: "Brown", team: "red" },
            Person { name: "Cid", age: 40, eye: "Blue", team: "blue" },
            Person { name: "Dee", age: 22, eye: "Green", team: "blue" },
            Person { name: "Eve", age: 30, eye: "Brown", team: "red" },
        ]
    }

    fn columns() -> Vec<ColumnDef<Person>> {
        vec![
            ColumnDef::action("ops", "Ops"),
            ColumnDef::new("name", "Name", |p: &Person| CellValue::from(p.name)),
            ColumnDef::new("age", "Age", |p: &Person| CellValue::from(p.age))
                .with_filter_mode(FilterMode::NumberRange),
            ColumnDef::new("eye", "Eye", |p: &Person| CellValue::from(p.eye))
                .with_filter_mode(FilterMode::Select),
            ColumnDef::new("team", "Team", |p: &Person| CellValue::from(p.team))
                .with_filter_mode(FilterMode::Select)
                .with_searchable(false),
        ]
    }

    fn names(rows: &[Person], view: &[usize]) -> Vec<&'static str> {
        view.iter().map(|&i| rows[i].name).collect()
    }

    fn state() -> PresentationState {
        PresentationState::initial(&columns(), &TableConfig::default())
    }

    #[test]
    fn no_state_keeps_source_order() {
        let rows = people();
        let view = derive(&rows, &columns(), &state(), &TableConfig::default());
        assert_eq!(names(&rows, &view.rows), vec!["Ann", "Bob", "Cid", "Dee", "Eve"]);
        assert_eq!(view.page_count, 1);
        assert_eq!(view.total_row_count, 5);
    }

    #[test]
    fn filters_compose_as_conjunction() {
        let rows = people();
        let cols = columns();
        let mut s = state();
        s.global_filter = "e".into();
        s.column_filters.insert(
            "age".into(),
            FilterValue::NumberRange { min: Some(23.0), max: Some(35.0) },
        );
        s.column_filters
            .insert("eye".into(), FilterValue::Select(vec!["Blue".into(), "Brown".into()]));
        s.column_filters.insert("name".into(), FilterValue::Text("N".into()));
        let view = derive(&rows, &cols, &s, &TableConfig::default());

        let expected: Vec<&str> = rows
            .iter()
            .filter(|p| p.name.to_lowercase().contains('e') || p.eye.to_lowercase().contains('e'))
            .filter(|p| (23..=35).contains(&p.age))
            .filter(|p| p.eye == "Blue" || p.eye == "Brown")
            .filter(|p| p.name.to_lowercase().contains('n'))
            .map(|p| p.name)
            .collect();
        assert_eq!(expected, vec!["Ann"]);
        assert_eq!(names(&rows, &view.sorted), expected);
        assert_eq!(view.filtered_row_count, expected.len());

        s.column_filters.remove("name");
        let view = derive(&rows, &cols, &s, &TableConfig::default());
        assert_eq!(names(&rows, &view.sorted), vec!["Ann", "Eve"]);
    }

    #[test]
    fn rows_without_columns_still_derive() {
        let rows = people();
        let cols: Vec<ColumnDef<Person>> = Vec::new();
        let mut s = PresentationState::initial(&cols, &TableConfig::default());
        s.pagination.page_size = 2;
        let view = derive(&rows, &cols, &s, &TableConfig::default());
        assert_eq!(view.total_row_count, 5);
        assert_eq!(view.filtered_row_count, 5);
        assert_eq!(view.page_count, 3);
        assert_eq!(view.rows, vec![0, 1]);
        assert!(view.facets.is_empty());

        s.global_filter = "ann".into();
        let view = derive(&rows, &cols, &s, &TableConfig::default());
        assert_eq!(view.filtered_row_count, 0);
        assert_eq!((view.page_count, view.page_index), (1, 0));
    }

    #[test]
    fn global_filter_skips_unsearchable_columns() {
        let rows = people();
        let mut s = state();
        s.global_filter = "blue".into();
        let view = derive(&rows, &columns(), &s, &TableConfig::default());
        // "blue" team is not searchable, only the eye colour matches.
        assert_eq!(names(&rows, &view.sorted), vec!["Ann", "Cid"]);
    }

    #[test]
    fn sort_is_stable_for_ties() {
        let rows = people();
        let mut s = state();
        s.sorting = vec![ColumnSort { column_id: "age".into(), descending: false }];
        let view = derive(&rows, &columns(), &s, &TableConfig::default());
        assert_eq!(names(&rows, &view.sorted), vec!["Dee", "Bob", "Ann", "Eve", "Cid"]);

        s.sorting[0].descending = true;
        let view = derive(&rows, &columns(), &s, &TableConfig::default());
        assert_eq!(names(&rows, &view.sorted), vec!["Cid", "Ann", "Eve", "Bob", "Dee"]);
    }

    #[test]
    fn secondary_sort_breaks_ties() {
        let rows = people();
        let mut s = state();
        s.sorting = vec![
            ColumnSort { column_id: "team".into(), descending: false },
            ColumnSort { column_id: "age".into(), descending: true },
        ];
        let view = derive(&rows, &columns(), &s, &TableConfig::default());
        assert_eq!(names(&rows, &view.sorted), vec!["Cid", "Dee", "Ann", "Eve", "Bob"]);
    }

    #[test]
    fn empty_cells_sort_last_both_ways() {
        let rows = vec![Some(2.0), None, Some(1.0)];
        let cols = vec![ColumnDef::new("v", "V", |v: &Option<f64>| CellValue::from(*v))];
        let mut s = PresentationState::initial(&cols, &TableConfig::default());
        s.sorting = vec![ColumnSort { column_id: "v".into(), descending: false }];
        let view = derive(&rows, &cols, &s, &TableConfig::default());
        assert_eq!(view.sorted, vec![2, 0, 1]);
        s.sorting[0].descending = true;
        let view = derive(&rows, &cols, &s, &TableConfig::default());
        assert_eq!(view.sorted, vec![0, 2, 1]);
    }

    #[test]
    fn dates_sort_chronologically() {
        let rows = vec!["2002-07-07", "1988-03-03", "1995-05-05"];
        let cols = vec![ColumnDef::new("d", "D", |d: &&str| {
            CellValue::from(NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
        })];
        let mut s = PresentationState::initial(&cols, &TableConfig::default());
        s.sorting = vec![ColumnSort { column_id: "d".into(), descending: false }];
        let view = derive(&rows, &cols, &s, &TableConfig::default());
        assert_eq!(view.sorted, vec![1, 2, 0]);
    }

    #[test]
    fn action_and_unknown_sort_keys_are_ignored() {
        let rows = people();
        let mut s = state();
        s.sorting = vec![
            ColumnSort { column_id: "ops".into(), descending: true },
            ColumnSort { column_id: "nope".into(), descending: true },
        ];
        let view = derive(&rows, &columns(), &s, &TableConfig::default());
        assert_eq!(names(&rows, &view.sorted), vec!["Ann", "Bob", "Cid", "Dee", "Eve"]);
    }

    #[test]
    fn facets_exclude_own_filter_only() {
        let rows = people();
        let mut s = state();
        s.column_filters
            .insert("eye".into(), FilterValue::Select(vec!["Blue".into()]));
        s.column_filters
            .insert("team".into(), FilterValue::Select(vec!["red".into()]));
        let view = derive(&rows, &columns(), &s, &TableConfig::default());

        assert_eq!(names(&rows, &view.sorted), vec!["Ann"]);

        // Eye facets: every red-team row, ignoring the eye filter.
        let eye = &view.facets["eye"];
        assert_eq!(eye.count("Blue"), 1);
        assert_eq!(eye.count("Brown"), 2);
        assert_eq!(eye.count("Green"), 0);
        assert_eq!(eye.options().collect::<Vec<_>>(), vec!["Blue", "Brown"]);

        // Team facets: every blue-eyed row, ignoring the team filter.
        let team = &view.facets["team"];
        assert_eq!(team.count("red"), 1);
        assert_eq!(team.count("blue"), 1);

        // Age has no filter of its own: facets equal the filtered set.
        let age = &view.facets["age"];
        assert_eq!(age.total(), 1);
        assert_eq!((age.min, age.max), (Some(30.0), Some(30.0)));
        assert!(!view.facets.contains_key("ops"));
    }

    #[test]
    fn facets_match_true_distribution_without_filters() {
        let rows = people();
        let view = derive(&rows, &columns(), &state(), &TableConfig::default());
        let eye = &view.facets["eye"];
        assert_eq!(eye.counts.len(), 3);
        assert_eq!(
            (eye.count("Blue"), eye.count("Brown"), eye.count("Green")),
            (2, 2, 1)
        );
        assert_eq!((view.facets["age"].min, view.facets["age"].max), (Some(22.0), Some(40.0)));
    }

    #[test]
    fn paginates_and_clamps() {
        let rows = people();
        let mut s = state();
        s.pagination.page_size = 2;
        s.pagination.page_index = 2;
        let view = derive(&rows, &columns(), &s, &TableConfig::default());
        assert_eq!(view.page_count, 3);
        assert_eq!(names(&rows, &view.rows), vec!["Eve"]);

        s.pagination.page_index = 9;
        let view = derive(&rows, &columns(), &s, &TableConfig::default());
        assert_eq!(view.page_index, 2);

        s.global_filter = "nobody".into();
        let view = derive(&rows, &columns(), &s, &TableConfig::default());
        assert_eq!((view.page_count, view.page_index), (1, 0));
        assert!(view.rows.is_empty());
    }

    #[test]
    fn derive_is_deterministic() {
        let rows = people();
        let mut s = state();
        s.sorting = vec![ColumnSort { column_id: "eye".into(), descending: true }];
        s.global_filter = "e".into();
        let a = derive(&rows, &columns(), &s, &TableConfig::default());
        let b = derive(&rows, &columns(), &s, &TableConfig::default());
        assert_eq!(a, b);
    }
}
