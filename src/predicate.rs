//! Row predicates built from the dashboard's filter controls.
//!
//! Each control contributes at most one constraint, and the constraints are joined with AND. A
//! control left empty contributes nothing, so an untouched filter panel gives `Predicate::True`.
use crate::{sort::SortKey, util::optional_search, ArcStr, Record, Schema, Table};
use qu::ick_use::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// The user's selections in the filter panel.
///
/// Every field is independently optional: empty means "no constraint".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Collaborator name search (case-insensitive substring).
    #[serde(deserialize_with = "optional_search")]
    pub collaborator: Option<String>,
    /// Patient code search (case-insensitive substring).
    #[serde(deserialize_with = "optional_search")]
    pub code: Option<String>,
    pub classifications: BTreeSet<String>,
    pub genders: BTreeSet<String>,
    /// Weight-category column names. A row matches if any of them is set.
    pub weight_categories: BTreeSet<String>,
    /// Disease-indicator column names. A row matches if any of them is set.
    pub diseases: BTreeSet<String>,
    pub admission_years: BTreeSet<i32>,
    pub sort: SortKey,
}

impl FilterConfig {
    /// The collaborator search, trimmed, if it is non-empty.
    pub fn collaborator_search(&self) -> Option<&str> {
        non_blank(self.collaborator.as_deref())
    }

    /// The code search, trimmed, if it is non-empty.
    pub fn code_search(&self) -> Option<&str> {
        non_blank(self.code.as_deref())
    }

    /// Whether the detection chart and recommendation lookup should be shown.
    ///
    /// Only the text searches and the indicator selections drive these views; the categorical
    /// and year selections don't.
    pub fn drives_detection(&self) -> bool {
        self.collaborator_search().is_some()
            || self.code_search().is_some()
            || !self.weight_categories.is_empty()
            || !self.diseases.is_empty()
    }

    /// `true` when no filter dimension is constrained.
    pub fn is_unconstrained(&self) -> bool {
        !self.drives_detection()
            && self.classifications.is_empty()
            && self.genders.is_empty()
            && self.admission_years.is_empty()
    }
}

fn non_blank(s: Option<&str>) -> Option<&str> {
    s.map(str::trim).filter(|s| !s.is_empty())
}

/// A boolean test on a roster row.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Matches every row.
    True,
    /// The column's text contains `needle` (stored lowercase), ignoring case.
    Contains { column: ArcStr, needle: String },
    /// The column's text is one of `values`.
    OneOf {
        column: ArcStr,
        values: BTreeSet<String>,
    },
    /// The sum of the indicator columns is positive. Absent columns count as 0.
    AnyIndicator { columns: Vec<ArcStr> },
    /// The year of the column's date is one of `years`.
    YearIn { column: ArcStr, years: BTreeSet<i32> },
    And(Box<Predicate>, Box<Predicate>),
}

impl Predicate {
    /// Build the predicate for `config` against the columns of `table`.
    ///
    /// If the admission-date column doesn't exist, the year selection is ignored.
    pub fn build(config: &FilterConfig, schema: &Schema, table: &Table) -> Self {
        let mut pred = Predicate::True;
        if let Some(search) = config.collaborator_search() {
            pred = pred.and(Predicate::contains(
                schema.collaborator_column.clone(),
                search,
            ));
        }
        if let Some(search) = config.code_search() {
            pred = pred.and(Predicate::contains(schema.code_column.clone(), search));
        }
        if !config.classifications.is_empty() {
            pred = pred.and(Predicate::OneOf {
                column: schema.classification_column.clone(),
                values: config.classifications.clone(),
            });
        }
        if !config.genders.is_empty() {
            pred = pred.and(Predicate::OneOf {
                column: schema.gender_column.clone(),
                values: config.genders.clone(),
            });
        }
        if !config.weight_categories.is_empty() {
            pred = pred.and(Predicate::any_indicator(&config.weight_categories));
        }
        if !config.diseases.is_empty() {
            pred = pred.and(Predicate::any_indicator(&config.diseases));
        }
        if !config.admission_years.is_empty() {
            if table.has_column(&schema.admission_date_column) {
                pred = pred.and(Predicate::YearIn {
                    column: schema.admission_date_column.clone(),
                    years: config.admission_years.clone(),
                });
            } else {
                event!(
                    Level::WARN,
                    "no \"{}\" column, ignoring the admission year filter",
                    schema.admission_date_column
                );
            }
        }
        pred
    }

    pub fn contains(column: ArcStr, needle: &str) -> Self {
        Predicate::Contains {
            column,
            needle: needle.to_lowercase(),
        }
    }

    fn any_indicator(columns: &BTreeSet<String>) -> Self {
        Predicate::AnyIndicator {
            columns: columns.iter().map(|c| c.as_str().into()).collect(),
        }
    }

    /// Combine with AND. `True` on either side is dropped.
    #[must_use]
    pub fn and(self, rhs: Self) -> Self {
        match (self, rhs) {
            (Predicate::True, rhs) => rhs,
            (lhs, Predicate::True) => lhs,
            (lhs, rhs) => Predicate::And(Box::new(lhs), Box::new(rhs)),
        }
    }

    pub fn is_trivial(&self) -> bool {
        matches!(self, Predicate::True)
    }

    /// Test a row of `table`.
    ///
    /// Rows with a missing value never match a constraint on that value, and neither do rows of
    /// a table that lacks the constrained column.
    pub fn matches(&self, table: &Table, record: &Record) -> bool {
        match self {
            Predicate::True => true,
            Predicate::Contains { column, needle } => {
                matches!(table.value(record, column), Some(v) if v.contains_lower(needle))
            }
            Predicate::OneOf { column, values } => match table.value(record, column) {
                Some(v) => matches!(v.as_text(), Some(text) if values.contains(&*text)),
                None => false,
            },
            Predicate::AnyIndicator { columns } => {
                let sum: f64 = columns
                    .iter()
                    .filter_map(|col| table.value(record, col))
                    .filter_map(|v| v.as_number())
                    .sum();
                sum > 0.
            }
            Predicate::YearIn { column, years } => {
                matches!(table.value(record, column).and_then(|v| v.year()), Some(y) if years.contains(&y))
            }
            Predicate::And(lhs, rhs) => lhs.matches(table, record) && rhs.matches(table, record),
        }
    }
}

#[cfg(test)]
mod test {
    use super::{FilterConfig, Predicate};
    use crate::{Schema, Table, Value};
    use chrono::NaiveDate;

    fn roster() -> Table {
        let date = |y| Value::Date(NaiveDate::from_ymd_opt(y, 6, 1).unwrap());
        Table::from_rows(
            [
                "Code",
                "Collaborator",
                "Classification",
                "Gender",
                "AdmissionDate",
                "Diabetes",
                "Hypertension",
                "Overweight",
            ],
            vec![
                vec![
                    Value::from("A1"),
                    Value::from("Jane Roe"),
                    Value::from("Operative"),
                    Value::from("F"),
                    date(2020),
                    Value::from(1.),
                    Value::from(0.),
                    Value::from(0.),
                ],
                vec![
                    Value::from(202.),
                    Value::from("Mark Doe"),
                    Value::from("Admin"),
                    Value::from("M"),
                    Value::from("garbage"),
                    Value::from(0.),
                    Value::from(1.),
                    Value::from(1.),
                ],
                vec![
                    Value::Empty,
                    Value::Empty,
                    Value::Empty,
                    Value::Empty,
                    Value::Empty,
                    Value::Empty,
                    Value::Empty,
                    Value::Empty,
                ],
            ],
        )
    }

    fn matching(config: &FilterConfig) -> Vec<usize> {
        let table = roster();
        let pred = Predicate::build(config, &Schema::english(), &table);
        table
            .iter()
            .filter(|rec| pred.matches(&table, rec))
            .map(|rec| rec.index)
            .collect()
    }

    #[test]
    fn empty_config_is_trivial() {
        let table = roster();
        let pred = Predicate::build(&FilterConfig::default(), &Schema::english(), &table);
        assert!(pred.is_trivial());
        assert_eq!(matching(&FilterConfig::default()), [0, 1, 2]);
    }

    #[test]
    fn text_search_ignores_case_and_missing() {
        let config = FilterConfig {
            collaborator: Some("JANE".into()),
            ..Default::default()
        };
        assert_eq!(matching(&config), [0]);
        let config = FilterConfig {
            code: Some("20".into()),
            ..Default::default()
        };
        assert_eq!(matching(&config), [1]);
    }

    #[test]
    fn blank_search_is_no_constraint() {
        let config = FilterConfig {
            code: Some("  ".into()),
            ..Default::default()
        };
        assert_eq!(matching(&config), [0, 1, 2]);
    }

    #[test]
    fn membership() {
        let config = FilterConfig {
            genders: ["M".to_string()].into(),
            ..Default::default()
        };
        assert_eq!(matching(&config), [1]);
    }

    #[test]
    fn indicators_or_across_columns() {
        let config = FilterConfig {
            diseases: ["Diabetes".to_string(), "Hypertension".to_string()].into(),
            ..Default::default()
        };
        assert_eq!(matching(&config), [0, 1]);
        let config = FilterConfig {
            diseases: ["Diabetes".to_string()].into(),
            weight_categories: ["Overweight".to_string()].into(),
            ..Default::default()
        };
        assert!(matching(&config).is_empty());
    }

    #[test]
    fn unknown_indicator_matches_nothing() {
        let config = FilterConfig {
            diseases: ["Gout".to_string()].into(),
            ..Default::default()
        };
        assert!(matching(&config).is_empty());
    }

    #[test]
    fn years_skip_unparseable() {
        let config = FilterConfig {
            admission_years: [2020, 2021].into(),
            ..Default::default()
        };
        assert_eq!(matching(&config), [0]);
    }

    #[test]
    fn year_filter_needs_column() {
        let table = roster().drop_columns(|c| c == "AdmissionDate");
        let config = FilterConfig {
            admission_years: [1999].into(),
            ..Default::default()
        };
        assert!(Predicate::build(&config, &Schema::english(), &table).is_trivial());
    }

    #[test]
    fn detection_dimensions() {
        let mut config = FilterConfig {
            genders: ["F".to_string()].into(),
            ..Default::default()
        };
        assert!(!config.drives_detection());
        assert!(!config.is_unconstrained());
        config.code = Some("A".into());
        assert!(config.drives_detection());
    }
}
