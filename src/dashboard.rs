//! One full recomputation of the dashboard.
//!
//! Every change to the filter panel recomputes everything from the loaded data: filter, annotate
//! with disease counts, sort, then summarise. Nothing is kept between runs.
use crate::{
    aggregate::{disease_population, DetectionChart, DiseasePopulation, Stats},
    export::{display_projection, export_projection},
    filter::{detected_counts, filter_roster, without_marker_columns, FilterOptions},
    loader::Datasets,
    sort::sort_roster,
    xref::{Scope, SheetMatches},
    FilterConfig, Result, Schema, Table, Value,
};
use qu::ick_use::*;
use serde::{Deserialize, Serialize};

/// Everything the presentation layer needs to draw the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardView {
    /// The filtered, annotated and sorted roster.
    pub filtered: Table,
    /// `filtered` as shown on screen.
    pub display: Table,
    pub stats: Stats,
    /// Only present when a search or indicator selection is active.
    pub detection_chart: Option<DetectionChart>,
    pub population: Vec<DiseasePopulation>,
    /// Recommendation rows for the current search, under the same condition as the chart.
    pub recommendations: Option<Vec<SheetMatches>>,
    /// What a download would contain. `None` when no patients match.
    pub export: Option<Table>,
    pub options: FilterOptions,
}

pub struct Dashboard;

impl Dashboard {
    /// Run the whole pipeline.
    ///
    /// Fails only if the base or disease roster is missing.
    pub fn compute(
        data: &Datasets,
        schema: &Schema,
        config: &FilterConfig,
    ) -> Result<DashboardView> {
        let (base, diseases) = data.require()?;

        let filtered = annotate(&filter_roster(base, schema, config), data, schema);
        let filtered = sort_roster(&filtered, config.sort, schema);

        let stats = Stats::from_roster(&filtered, schema);
        let detection_chart = DetectionChart::compute(&data.book, schema, config);
        let recommendations = config
            .drives_detection()
            .then(|| data.book.matching(Scope::Search(config), schema));
        let export = if filtered.is_empty() {
            event!(Level::DEBUG, "no patients match, nothing to export");
            None
        } else {
            Some(export_projection(&filtered, schema))
        };

        Ok(DashboardView {
            display: display_projection(&filtered, schema),
            stats,
            detection_chart,
            population: disease_population(diseases, schema),
            recommendations,
            export,
            options: FilterOptions::from_roster(base, schema),
            filtered,
        })
    }
}

/// The unfiltered input tables, for browsing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FullTables {
    /// The patient roster without row-number columns.
    pub base: Table,
    /// The disease roster without row-number columns.
    pub diseases: Table,
    /// The patient sheet of the recommendation workbook, as read.
    pub recommendation_patients: Option<Table>,
}

impl FullTables {
    /// Fails if either roster is missing.
    pub fn from_datasets(data: &Datasets, schema: &Schema) -> Result<Self> {
        let (base, diseases) = data.require()?;
        Ok(FullTables {
            base: without_marker_columns(base, schema),
            diseases: without_marker_columns(diseases, schema),
            recommendation_patients: data.recommendation_patients.clone(),
        })
    }
}

/// Append both disease counts to the filtered roster.
fn annotate(roster: &Table, data: &Datasets, schema: &Schema) -> Table {
    let detected = detected_counts(roster, schema)
        .into_iter()
        .map(Value::from)
        .collect();
    let possible = data
        .book
        .count_for_roster(roster, schema)
        .into_iter()
        .map(|n| Value::from(n as f64))
        .collect();
    roster
        .with_column(schema.detected_column.clone(), detected)
        .with_column(schema.possible_column.clone(), possible)
}

#[cfg(test)]
mod test {
    use super::{Dashboard, FullTables};
    use crate::{
        loader::Datasets,
        xref::{RecommendationBook, RecommendationSheet},
        FilterConfig, Schema, SortKey, Table, Value,
    };

    fn base() -> Table {
        Table::from_rows(
            ["No.", "Code", "Collaborator", "Age", "Diabetes", "Hypertension"],
            vec![
                vec![
                    Value::Empty,
                    Value::Empty,
                    Value::Empty,
                    Value::Empty,
                    Value::Empty,
                    Value::Empty,
                ],
                vec![
                    Value::from(1.),
                    Value::from("A1"),
                    Value::from("Jane"),
                    Value::from(52.),
                    Value::from(1.),
                    Value::from(0.),
                ],
                vec![
                    Value::from(2.),
                    Value::from("A2"),
                    Value::from("Mark"),
                    Value::from(37.),
                    Value::from(0.),
                    Value::from(1.),
                ],
            ],
        )
    }

    fn diseases() -> Table {
        Table::from_rows(
            ["Diabetes - No.", "Hypertension - No."],
            vec![
                vec![Value::from(1.), Value::from(1.)],
                vec![Value::Empty, Value::from(2.)],
            ],
        )
    }

    fn sheet(name: &str, rows: &[(&str, &str)]) -> RecommendationSheet {
        RecommendationSheet {
            name: name.into(),
            rows: Table::from_rows(
                ["Code", "Collaborator", "Recommendations"],
                rows.iter()
                    .map(|(code, collab)| {
                        vec![Value::from(*code), Value::from(*collab), Value::from("rest")]
                    })
                    .collect::<Vec<_>>(),
            ),
        }
    }

    fn datasets(book: RecommendationBook) -> Datasets {
        Datasets {
            base: Some(base()),
            diseases: Some(diseases()),
            recommendation_patients: None,
            book,
        }
    }

    fn codes(table: &Table) -> Vec<String> {
        table
            .iter()
            .map(|rec| table.value(rec, "Code").unwrap().to_string())
            .collect()
    }

    #[test]
    fn disease_filter() {
        let schema = Schema::english();
        let config = FilterConfig {
            diseases: ["Diabetes".to_string()].into(),
            ..Default::default()
        };
        let view = Dashboard::compute(&datasets(Default::default()), &schema, &config).unwrap();
        assert_eq!(codes(&view.filtered), ["A1"]);
        assert_eq!(view.stats.total_patients, 1);
        assert_eq!(view.stats.unique_collaborators, 1);
    }

    #[test]
    fn duplicate_sheet_rows_count_once() {
        let schema = Schema::english();
        let book = RecommendationBook::new(vec![
            sheet("Diabetes", &[("A1", "Jane"), ("A1", "Jane")]),
            sheet("Hypertension", &[("A1", "Jane")]),
        ]);
        let view = Dashboard::compute(&datasets(book), &schema, &FilterConfig::default()).unwrap();
        let possible: Vec<_> = view
            .filtered
            .column_values("PossibleDetectedDiseaseCount")
            .unwrap()
            .cloned()
            .collect();
        assert_eq!(possible, [Value::from(2.), Value::from(0.)]);
        assert_eq!(view.stats.mean_diseases_per_patient, 1.);
    }

    #[test]
    fn empty_book() {
        let schema = Schema::english();
        let config = FilterConfig {
            collaborator: Some("jane".into()),
            ..Default::default()
        };
        let view = Dashboard::compute(&datasets(Default::default()), &schema, &config).unwrap();
        let chart = view.detection_chart.unwrap();
        assert_eq!((chart.has_diseases, chart.no_diseases), (0, 0));
        assert_eq!(view.stats.mean_diseases_per_patient, 0.);
        assert_eq!(view.recommendations, Some(vec![]));
    }

    #[test]
    fn no_chart_without_search() {
        let schema = Schema::english();
        let view = Dashboard::compute(
            &datasets(Default::default()),
            &schema,
            &FilterConfig::default(),
        )
        .unwrap();
        assert!(view.detection_chart.is_none());
        assert!(view.recommendations.is_none());
    }

    #[test]
    fn projections_and_sort() {
        let schema = Schema::english();
        let config = FilterConfig {
            sort: SortKey::AgeAsc,
            ..Default::default()
        };
        let view = Dashboard::compute(&datasets(Default::default()), &schema, &config).unwrap();
        assert_eq!(codes(&view.filtered), ["A2", "A1"]);
        assert!(view.filtered.has_column("DetectedDiseaseCount"));
        assert!(!view.display.has_column("DetectedDiseaseCount"));
        assert!(view.display.has_column("PossibleDetectedDiseaseCount"));
        let export = view.export.unwrap();
        assert!(!export.has_column("PossibleDetectedDiseaseCount"));
        assert!(!export.has_column("No."));
        assert_eq!(codes(&export), ["A2", "A1"]);
    }

    #[test]
    fn nothing_to_export() {
        let schema = Schema::english();
        let config = FilterConfig {
            code: Some("zzz".into()),
            ..Default::default()
        };
        let view = Dashboard::compute(&datasets(Default::default()), &schema, &config).unwrap();
        assert!(view.filtered.is_empty());
        assert!(view.export.is_none());
        assert_eq!(view.stats.mean_diseases_per_patient, 0.);
    }

    #[test]
    fn population() {
        let schema = Schema::english();
        let view = Dashboard::compute(
            &datasets(Default::default()),
            &schema,
            &FilterConfig::default(),
        )
        .unwrap();
        let pop: Vec<(&str, usize)> = view
            .population
            .iter()
            .map(|p| (&*p.disease, p.patients))
            .collect();
        assert_eq!(pop, [("Hypertension", 2), ("Diabetes", 1)]);
    }

    #[test]
    fn full_tables_drop_row_numbers() {
        let schema = Schema::english();
        let patients = Table::from_rows(["Code", "Collaborator"], vec![vec![
            Value::from("A1"),
            Value::from("Jane"),
        ]]);
        let data = Datasets {
            recommendation_patients: Some(patients.clone()),
            ..datasets(Default::default())
        };
        let full = FullTables::from_datasets(&data, &schema).unwrap();
        assert!(!full.base.has_column("No."));
        assert_eq!(full.base.len(), 3);
        assert!(full.diseases.columns().is_empty());
        assert_eq!(full.diseases.len(), 2);
        assert_eq!(full.recommendation_patients, Some(patients));

        let missing = Datasets {
            base: None,
            ..data
        };
        assert!(FullTables::from_datasets(&missing, &schema).is_err());
    }

    #[test]
    fn load_failure() {
        let schema = Schema::english();
        let data = Datasets {
            diseases: None,
            ..datasets(Default::default())
        };
        assert!(Dashboard::compute(&data, &schema, &FilterConfig::default()).is_err());
    }

    #[test]
    fn view_serializes() {
        let schema = Schema::english();
        let view = Dashboard::compute(
            &datasets(Default::default()),
            &schema,
            &FilterConfig::default(),
        )
        .unwrap();
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["stats"]["total_patients"], 2);
        assert!(json["detection_chart"].is_null());
    }
}
