//! Filter evaluators. Every predicate is pure and total: a malformed filter argument includes the
//! row instead of failing.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::column::FilterMode;
use crate::value::CellValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TextMatch {
    CaseSensitive,
    #[default]
    CaseInsensitive,
}

/// Whether the bounds of a date range filter match dates equal to them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DateBoundary {
    /// `start < date < end`
    #[default]
    Exclusive,
    /// `start <= date <= end`
    Inclusive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FilterOptions {
    pub text_match: TextMatch,
    pub date_boundary: DateBoundary,
}

/// The argument of a column filter. The variant must agree with the column's [`FilterMode`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind", content = "value")]
pub enum FilterValue {
    Text(String),
    Number(f64),
    NumberRange {
        #[serde(default)]
        min: Option<f64>,
        #[serde(default)]
        max: Option<f64>,
    },
    Select(Vec<String>),
    DateRange {
        #[serde(default)]
        start: Option<NaiveDate>,
        #[serde(default)]
        end: Option<NaiveDate>,
    },
}

impl FilterValue {
    /// An empty value restricts nothing and is never stored.
    pub fn is_empty(&self) -> bool {
        match self {
            FilterValue::Text(s) => s.is_empty(),
            FilterValue::Number(n) => !n.is_finite(),
            FilterValue::NumberRange { min, max } => {
                finite(*min).is_none() && finite(*max).is_none()
            }
            FilterValue::Select(values) => values.is_empty(),
            FilterValue::DateRange { start, end } => start.is_none() && end.is_none(),
        }
    }

    /// Drops range bounds that are not finite numbers. They restrict nothing and do not survive
    /// a round trip through json.
    pub fn normalized(self) -> Self {
        match self {
            FilterValue::NumberRange { min, max } => FilterValue::NumberRange {
                min: finite(min),
                max: finite(max),
            },
            other => other,
        }
    }

    pub fn fits(&self, mode: FilterMode) -> bool {
        matches!(
            (mode, self),
            (FilterMode::Text, FilterValue::Text(_))
                | (FilterMode::Number, FilterValue::Number(_))
                | (FilterMode::NumberRange, FilterValue::NumberRange { .. })
                | (FilterMode::Select, FilterValue::Select(_))
                | (FilterMode::DateRange, FilterValue::DateRange { .. })
        )
    }
}

/// Dispatch on the column's mode. A value of the wrong shape counts as no filter.
pub fn evaluate(
    mode: FilterMode,
    cell: &CellValue,
    value: &FilterValue,
    options: &FilterOptions,
) -> bool {
    match (mode, value) {
        (FilterMode::Text, FilterValue::Text(query)) => {
            text_contains(cell, query, options.text_match)
        }
        (FilterMode::Number, FilterValue::Number(target)) => number_equals(cell, *target),
        (FilterMode::NumberRange, FilterValue::NumberRange { min, max }) => {
            number_in_range(cell, *min, *max)
        }
        (FilterMode::Select, FilterValue::Select(selected)) => select_contains(cell, selected),
        (FilterMode::DateRange, FilterValue::DateRange { start, end }) => {
            date_in_range(cell, *start, *end, options.date_boundary)
        }
        _ => true,
    }
}

pub fn text_contains(cell: &CellValue, query: &str, text_match: TextMatch) -> bool {
    if query.is_empty() {
        return true;
    }
    let haystack = cell.display();
    match text_match {
        TextMatch::CaseSensitive => haystack.contains(query),
        TextMatch::CaseInsensitive => haystack.to_lowercase().contains(&query.to_lowercase()),
    }
}

fn finite(bound: Option<f64>) -> Option<f64> {
    bound.filter(|n| n.is_finite())
}

pub fn number_equals(cell: &CellValue, target: f64) -> bool {
    if !target.is_finite() {
        return true;
    }
    cell.as_number() == Some(target)
}

/// Both bounds inclusive, either may be open. Reversed bounds are swapped.
pub fn number_in_range(cell: &CellValue, min: Option<f64>, max: Option<f64>) -> bool {
    let min = finite(min);
    let max = finite(max);
    let (min, max) = match (min, max) {
        (Some(lo), Some(hi)) if lo > hi => (Some(hi), Some(lo)),
        bounds => bounds,
    };
    if min.is_none() && max.is_none() {
        return true;
    }
    let Some(n) = cell.as_number() else {
        return false;
    };
    min.is_none_or(|lo| n >= lo) && max.is_none_or(|hi| n <= hi)
}

pub fn select_contains(cell: &CellValue, selected: &[String]) -> bool {
    if selected.is_empty() {
        return true;
    }
    let shown = cell.display();
    selected.iter().any(|s| *s == shown)
}

/// Cells without a valid date never match, whatever the bounds.
pub fn date_in_range(
    cell: &CellValue,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    boundary: DateBoundary,
) -> bool {
    let Some(date) = cell.as_date() else {
        return false;
    };
    let after_start = |s: NaiveDate| match boundary {
        DateBoundary::Exclusive => s < date,
        DateBoundary::Inclusive => s <= date,
    };
    let before_end = |e: NaiveDate| match boundary {
        DateBoundary::Exclusive => date < e,
        DateBoundary::Inclusive => date <= e,
    };
    start.is_none_or(after_start) && end.is_none_or(before_end)
}
