//! Applying the filter panel to the patient roster.
use crate::{ArcStr, FilterConfig, Predicate, Schema, Table, Value};
use itertools::Itertools;
use qu::ick_use::*;
use serde::{Deserialize, Serialize};

/// The roster with row-number columns removed.
pub fn without_marker_columns(table: &Table, schema: &Schema) -> Table {
    table.drop_columns(|name| schema.is_marker_column(name))
}

/// Filter the base roster.
///
/// Row-number columns are dropped first, and the leading row of the sheet (source index 0, a
/// known artifact of the workbook) is always left out. The source table is not modified and
/// row order is preserved.
pub fn filter_roster(base: &Table, schema: &Schema, config: &FilterConfig) -> Table {
    let working = without_marker_columns(base, schema);
    let predicate = Predicate::build(config, schema, &working);
    let filtered = working.filter(|rec| rec.index != 0 && predicate.matches(&working, rec));
    event!(
        Level::DEBUG,
        "filtered roster from {} to {} rows",
        base.len(),
        filtered.len()
    );
    filtered
}

/// The raw indicator sum over the disease columns, for every row of `roster`.
///
/// Non-numeric cells count as 0.
pub fn detected_counts(roster: &Table, schema: &Schema) -> Vec<f64> {
    let idxs = schema
        .disease_columns(roster)
        .iter()
        .filter_map(|name| roster.column_index(name))
        .collect::<Vec<_>>();
    roster
        .iter()
        .map(|rec| {
            idxs.iter()
                .filter_map(|idx| rec.cells[*idx].as_number())
                .sum::<f64>()
        })
        .collect()
}

/// The choices offered by each filter control.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterOptions {
    /// Sorted.
    pub collaborators: Vec<String>,
    /// First-seen order.
    pub classifications: Vec<String>,
    /// First-seen order.
    pub genders: Vec<String>,
    pub weight_categories: Vec<ArcStr>,
    pub diseases: Vec<ArcStr>,
    /// Sorted. Empty when the roster has no admission-date column.
    pub admission_years: Vec<i32>,
}

impl FilterOptions {
    pub fn from_roster(base: &Table, schema: &Schema) -> Self {
        let working = without_marker_columns(base, schema);
        let distinct = |column: &str| -> Vec<String> {
            working
                .column_values(column)
                .map(|values| {
                    values
                        .filter_map(Value::as_text)
                        .map(|text| text.into_owned())
                        .unique()
                        .collect()
                })
                .unwrap_or_default()
        };
        let mut collaborators = distinct(&schema.collaborator_column);
        collaborators.sort();
        let admission_years = working
            .column_values(&schema.admission_date_column)
            .map(|values| values.filter_map(Value::year).unique().sorted().collect())
            .unwrap_or_default();
        FilterOptions {
            collaborators,
            classifications: distinct(&schema.classification_column),
            genders: distinct(&schema.gender_column),
            weight_categories: schema.weight_categories.clone(),
            diseases: schema.disease_columns(&working),
            admission_years,
        }
    }
}
