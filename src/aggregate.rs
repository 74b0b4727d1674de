//! Summary statistics and chart data for the filtered roster.
use crate::{
    xref::{RecommendationBook, Scope},
    ArcStr, FilterConfig, Schema, Table,
};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

pub const HAS_DISEASES: &str = "has diseases";
pub const NO_DISEASES: &str = "no diseases";

/// The headline numbers of the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Stats {
    /// Distinct non-missing collaborator names.
    pub unique_collaborators: usize,
    pub total_patients: usize,
    /// Mean cross-referenced disease count. 0 for an empty roster.
    pub mean_diseases_per_patient: f64,
}

impl Stats {
    /// Compute statistics for an annotated roster (one carrying the possible-diseases column).
    pub fn from_roster(roster: &Table, schema: &Schema) -> Self {
        let unique_collaborators = roster
            .column_values(&schema.collaborator_column)
            .map(|values| {
                values
                    .filter_map(|v| v.as_text())
                    .map(|text| text.into_owned())
                    .collect::<BTreeSet<_>>()
                    .len()
            })
            .unwrap_or(0);
        let total_patients = roster.len();
        let total_diseases: f64 = roster
            .column_values(&schema.possible_column)
            .map(|values| values.filter_map(|v| v.as_number()).sum::<f64>())
            .unwrap_or(0.);
        let mean_diseases_per_patient = if total_patients > 0 {
            total_diseases / total_patients as f64
        } else {
            0.
        };
        Stats {
            unique_collaborators,
            total_patients,
            mean_diseases_per_patient,
        }
    }
}

/// Disease sheets touched by the current search versus those that aren't.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectionChart {
    pub has_diseases: usize,
    pub no_diseases: usize,
    /// The number of disease sheets evaluated.
    pub total_sheets: usize,
}

impl DetectionChart {
    /// `None` unless `config` has a search or indicator selection active.
    pub fn compute(
        book: &RecommendationBook,
        schema: &Schema,
        config: &FilterConfig,
    ) -> Option<Self> {
        if !config.drives_detection() {
            return None;
        }
        let total_sheets = book.disease_sheet_count(schema);
        let has_diseases = book.count_matching_sheets(Scope::Search(config), schema);
        Some(DetectionChart {
            has_diseases,
            no_diseases: total_sheets - has_diseases,
            total_sheets,
        })
    }

    /// Label/count pairs ready for a pie chart.
    pub fn rows(&self) -> [(&'static str, usize); 2] {
        [
            (HAS_DISEASES, self.has_diseases),
            (NO_DISEASES, self.no_diseases),
        ]
    }
}

/// The number of patients listed for one disease.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiseasePopulation {
    pub disease: ArcStr,
    pub patients: usize,
}

/// Per-disease patient counts from the disease roster, largest first.
///
/// Every row-number column is one disease; its non-missing entries are its patients. Ties keep
/// column order.
pub fn disease_population(diseases: &Table, schema: &Schema) -> Vec<DiseasePopulation> {
    diseases
        .columns()
        .iter()
        .filter(|name| schema.is_marker_column(name))
        .filter_map(|name| {
            let patients = diseases
                .column_values(name)?
                .filter(|v| !v.is_missing())
                .count();
            Some(DiseasePopulation {
                disease: schema.disease_label(name).into(),
                patients,
            })
        })
        .sorted_by(|a, b| b.patients.cmp(&a.patients))
        .collect()
}
