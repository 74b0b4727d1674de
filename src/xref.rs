//! Cross-referencing patients against the recommendation workbook.
//!
//! The recommendation workbook has one sheet per disease, each listing the patients who were given
//! nutritional recommendations for it. A patient's "possible detected diseases" is the number of
//! disease sheets with at least one row matching the patient:
//!
//! 1. Sheets named in the schema's reserved set (patient lists, summaries) are not diseases.
//! 2. A row matches when its collaborator contains the patient's collaborator and its code
//!    contains the patient's code (case-insensitive). An identifier the patient lacks isn't
//!    checked.
//! 3. Each sheet counts at most once, however many rows match.
//!
//! The same scan also runs with the dashboard's search inputs in place of a patient's identity,
//! to count how many disease sheets the current search touches.
use crate::{ArcStr, FilterConfig, Record, Schema, Table, Value};
use qu::ick_use::*;
use serde::{Deserialize, Serialize};

/// A named sheet of recommendation rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationSheet {
    pub name: ArcStr,
    pub rows: Table,
}

/// All recommendation sheets of the workbook, in workbook order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecommendationBook {
    sheets: Vec<RecommendationSheet>,
}

/// Whose identity a sheet scan looks for.
#[derive(Debug, Clone, Copy)]
pub enum Scope<'a> {
    /// One patient's code and collaborator.
    ///
    /// A patient with neither matches nothing.
    Patient {
        code: Option<&'a Value>,
        collaborator: Option<&'a Value>,
    },
    /// The text searches of the filter panel.
    ///
    /// With neither search set, every row matches.
    Search(&'a FilterConfig),
}

impl<'a> Scope<'a> {
    /// The identity of row `record` of `roster`.
    pub fn patient(roster: &Table, record: &'a Record, schema: &Schema) -> Self {
        Scope::Patient {
            code: roster.value(record, &schema.code_column),
            collaborator: roster.value(record, &schema.collaborator_column),
        }
    }

    /// Lowercased needles to search for, or `None` if this scope can't match anything.
    fn needles(&self) -> Option<Needles> {
        match self {
            Scope::Patient { code, collaborator } => {
                let code = code.and_then(|v| v.as_text()).map(|s| s.to_lowercase());
                let collaborator = collaborator
                    .and_then(|v| v.as_text())
                    .map(|s| s.to_lowercase());
                if code.is_none() && collaborator.is_none() {
                    return None;
                }
                Some(Needles { code, collaborator })
            }
            Scope::Search(config) => Some(Needles {
                code: config.code_search().map(str::to_lowercase),
                collaborator: config.collaborator_search().map(str::to_lowercase),
            }),
        }
    }
}

struct Needles {
    code: Option<String>,
    collaborator: Option<String>,
}

/// Rows of one sheet that matched a scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SheetMatches {
    pub sheet: ArcStr,
    pub rows: Table,
}

impl RecommendationBook {
    pub fn new(sheets: Vec<RecommendationSheet>) -> Self {
        Self { sheets }
    }

    pub fn len(&self) -> usize {
        self.sheets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sheets.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RecommendationSheet> + '_ {
        self.sheets.iter()
    }

    pub fn get(&self, name: &str) -> Option<&RecommendationSheet> {
        self.sheets.iter().find(|sheet| &*sheet.name == name)
    }

    pub fn disease_sheets<'a>(
        &'a self,
        schema: &'a Schema,
    ) -> impl Iterator<Item = &'a RecommendationSheet> + 'a {
        self.sheets
            .iter()
            .filter(move |sheet| schema.is_disease_sheet(&sheet.name))
    }

    pub fn disease_sheet_count(&self, schema: &Schema) -> usize {
        self.disease_sheets(schema).count()
    }

    /// The number of disease sheets with at least one row matching `scope`.
    ///
    /// Sheets without both identifying columns contribute nothing.
    pub fn count_matching_sheets(&self, scope: Scope<'_>, schema: &Schema) -> usize {
        let Some(needles) = scope.needles() else {
            return 0;
        };
        self.disease_sheets(schema)
            .filter(|sheet| {
                sheet_matcher(sheet, &needles, schema)
                    .map(|matcher| sheet.rows.iter().any(matcher))
                    .unwrap_or(false)
            })
            .count()
    }

    /// The number of matching disease sheets for every row of `roster`, in row order.
    pub fn count_for_roster(&self, roster: &Table, schema: &Schema) -> Vec<usize> {
        roster
            .iter()
            .map(|rec| self.count_matching_sheets(Scope::patient(roster, rec, schema), schema))
            .collect()
    }

    /// The rows matching `scope` in every sheet (reserved sheets included), skipping sheets with
    /// no matches.
    pub fn matching(&self, scope: Scope<'_>, schema: &Schema) -> Vec<SheetMatches> {
        let Some(needles) = scope.needles() else {
            return vec![];
        };
        self.sheets
            .iter()
            .filter_map(|sheet| {
                let matcher = sheet_matcher(sheet, &needles, schema)?;
                let rows = sheet.rows.filter(matcher);
                if rows.is_empty() {
                    None
                } else {
                    Some(SheetMatches {
                        sheet: sheet.name.clone(),
                        rows,
                    })
                }
            })
            .collect()
    }
}

/// A row test for `sheet`, or `None` if the sheet lacks an identifying column.
fn sheet_matcher<'a>(
    sheet: &'a RecommendationSheet,
    needles: &'a Needles,
    schema: &Schema,
) -> Option<impl Fn(&Record) -> bool + 'a> {
    let (Some(code_idx), Some(collab_idx)) = (
        sheet.rows.column_index(&schema.code_column),
        sheet.rows.column_index(&schema.collaborator_column),
    ) else {
        event!(
            Level::DEBUG,
            "sheet \"{}\" has no code or collaborator column, skipping",
            sheet.name
        );
        return None;
    };
    Some(move |rec: &Record| {
        let collab_ok = match &needles.collaborator {
            Some(needle) => rec.cells[collab_idx].contains_lower(needle),
            None => true,
        };
        let code_ok = match &needles.code {
            Some(needle) => rec.cells[code_idx].contains_lower(needle),
            None => true,
        };
        collab_ok && code_ok
    })
}

#[cfg(test)]
mod test {
    use super::{RecommendationBook, RecommendationSheet, Scope};
    use crate::{FilterConfig, Schema, Table, Value};

    fn sheet(name: &str, rows: &[(&str, &str)]) -> RecommendationSheet {
        RecommendationSheet {
            name: name.into(),
            rows: Table::from_rows(
                ["Code", "Collaborator", "Recommendations"],
                rows.iter()
                    .map(|(code, collab)| {
                        vec![Value::from(*code), Value::from(*collab), Value::from("eat well")]
                    })
                    .collect::<Vec<_>>(),
            ),
        }
    }

    fn book() -> RecommendationBook {
        RecommendationBook::new(vec![
            sheet("Patients", &[("A1", "Jane"), ("A2", "Mark")]),
            sheet("Diabetes", &[("A1", "Jane"), ("A1", "Jane"), ("A3", "Ana")]),
            sheet("Hypertension", &[("A1", "Jane")]),
            sheet("Gout", &[("A2", "Mark")]),
        ])
    }

    fn patient_count(book: &RecommendationBook, code: Value, collab: Value) -> usize {
        let scope = Scope::Patient {
            code: Some(&code),
            collaborator: Some(&collab),
        };
        book.count_matching_sheets(scope, &Schema::english())
    }

    #[test]
    fn sheets_count_once() {
        let book = book();
        assert_eq!(patient_count(&book, "A1".into(), "Jane".into()), 2);
        assert_eq!(patient_count(&book, "a2".into(), "MARK".into()), 1);
    }

    #[test]
    fn blank_identity_counts_zero() {
        let book = book();
        assert_eq!(patient_count(&book, Value::Empty, Value::Empty), 0);
        let scope = Scope::Patient {
            code: None,
            collaborator: None,
        };
        assert_eq!(book.count_matching_sheets(scope, &Schema::english()), 0);
    }

    #[test]
    fn missing_identifier_is_not_checked() {
        let book = book();
        assert_eq!(patient_count(&book, Value::Empty, "jan".into()), 2);
        // both given: both must match the same row
        assert_eq!(patient_count(&book, "A3".into(), "Jane".into()), 0);
    }

    #[test]
    fn never_exceeds_sheet_count() {
        let book = book();
        let schema = Schema::english();
        let everyone = FilterConfig::default();
        let n = book.count_matching_sheets(Scope::Search(&everyone), &schema);
        assert_eq!(n, book.disease_sheet_count(&schema));
        assert_eq!(n, 3);
    }

    #[test]
    fn search_scope() {
        let book = book();
        let schema = Schema::english();
        let config = FilterConfig {
            code: Some("A".into()),
            collaborator: Some("mar".into()),
            ..Default::default()
        };
        assert_eq!(book.count_matching_sheets(Scope::Search(&config), &schema), 1);
    }

    #[test]
    fn malformed_sheet_is_skipped() {
        let mut sheets = vec![sheet("Diabetes", &[("A1", "Jane")])];
        sheets.push(RecommendationSheet {
            name: "Asthma".into(),
            rows: Table::from_rows(
                ["Code", "Recommendations"],
                vec![vec![Value::from("A1"), Value::from("walk")]],
            ),
        });
        let book = RecommendationBook::new(sheets);
        let schema = Schema::english();
        assert_eq!(patient_count(&book, "A1".into(), "Jane".into()), 1);
        assert_eq!(book.disease_sheet_count(&schema), 2);
    }

    #[test]
    fn empty_book() {
        let book = RecommendationBook::default();
        assert_eq!(patient_count(&book, "A1".into(), "Jane".into()), 0);
    }

    #[test]
    fn matching_rows_include_reserved_sheets() {
        let book = book();
        let config = FilterConfig {
            code: Some("A1".into()),
            ..Default::default()
        };
        let found = book.matching(Scope::Search(&config), &Schema::english());
        let names: Vec<&str> = found.iter().map(|m| &*m.sheet).collect();
        assert_eq!(names, ["Patients", "Diabetes", "Hypertension"]);
        assert_eq!(found[1].rows.len(), 2);
    }

    #[test]
    fn roster_counts() {
        let book = book();
        let schema = Schema::english();
        let roster = Table::from_rows(
            ["Code", "Collaborator"],
            vec![
                vec![Value::from("A1"), Value::from("Jane")],
                vec![Value::Empty, Value::Empty],
                vec![Value::from("Z9"), Value::Empty],
            ],
        );
        assert_eq!(book.count_for_roster(&roster, &schema), [2, 0, 0]);
    }
}
