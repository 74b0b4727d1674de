//! Column and sheet roles for the input workbooks.
//!
//! The dashboard finds its data by name: identifying columns, the weight-category indicators, the
//! reserved (non-disease) sheets of the recommendation workbook, and the row-number marker that
//! tags per-disease columns. All of these are declared here rather than hard-coded, so a workbook
//! with different headers only needs a schema file.
//!
//! Disease-indicator columns are either declared explicitly (`disease_columns`) or, by default,
//! inferred as every column that isn't excluded, a weight category, or a row-number column.
use crate::{ArcStr, Context, Result, Table};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

static SOURCE_SCHEMA: Lazy<Schema> = Lazy::new(|| Schema {
    code_column: "CÓDIGO".into(),
    collaborator_column: "COLABORADOR".into(),
    classification_column: "CLASIFICACIÓN".into(),
    gender_column: "GENERO".into(),
    admission_date_column: "FECHA INGRESO".into(),
    age_column: "Años".into(),
    recommendation_column: "Recomendaciones".into(),
    patients_sheet: "Pacientes".into(),
    weight_categories: arcs(&[
        "Bajo Peso",
        "Normal Peso",
        "Sobrepeso",
        "Obesidad I",
        "Obesidad II",
        "Obesidad III",
    ]),
    excluded_columns: arcs(&[
        "No.",
        "CÓDIGO",
        "FECHA INGRESO",
        "CLASIFICACIÓN",
        "GENERO",
        "COLABORADOR",
        "PUESTO",
        "Años",
        "F.de Nac.",
        "Libras",
        "cm",
        "IMC",
        "Frecuencia cardíaca",
        "Saturación de Oxígeno",
        "Creatinina",
        "TFG",
        "Glucosa en ayunas",
        "Normal Presión",
    ]),
    disease_columns: None,
    non_disease_sheets: arcs(&["Pacientes", "Predicciones", "Resumen", "Info"]),
    row_number_marker: "No.".into(),
    detected_column: "Enfermedades Detectadas".into(),
    possible_column: "Posibles Enfermedades Detectadas".into(),
});

/// Names and roles of the columns and sheets the dashboard reads.
///
/// `Default` matches the headers of the clinic's workbooks. When deserializing, any key left out
/// takes its default value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Schema {
    pub code_column: ArcStr,
    pub collaborator_column: ArcStr,
    pub classification_column: ArcStr,
    pub gender_column: ArcStr,
    /// Optional in the data; without it the year filter is unavailable.
    pub admission_date_column: ArcStr,
    /// Optional in the data; without it the age sorts do nothing.
    pub age_column: ArcStr,
    pub recommendation_column: ArcStr,
    /// The sheet of the recommendation workbook that lists patients.
    pub patients_sheet: ArcStr,
    pub weight_categories: Vec<ArcStr>,
    /// Columns that are never disease indicators (identity, demographics, vital signs).
    pub excluded_columns: Vec<ArcStr>,
    /// Explicit list of disease-indicator columns. `None` infers them from `excluded_columns`.
    pub disease_columns: Option<Vec<ArcStr>>,
    /// Recommendation sheets that are not evidence of a disease.
    pub non_disease_sheets: Vec<ArcStr>,
    /// Suffix of row-number columns. These are dropped from the patient roster, and in the
    /// per-disease roster they hold one entry per patient with that disease.
    pub row_number_marker: ArcStr,
    /// Name of the derived raw indicator sum column.
    pub detected_column: ArcStr,
    /// Name of the derived cross-referenced disease count column.
    pub possible_column: ArcStr,
}

impl Default for Schema {
    fn default() -> Self {
        SOURCE_SCHEMA.clone()
    }
}

impl Schema {
    /// The same layout with English names.
    pub fn english() -> Self {
        Schema {
            code_column: "Code".into(),
            collaborator_column: "Collaborator".into(),
            classification_column: "Classification".into(),
            gender_column: "Gender".into(),
            admission_date_column: "AdmissionDate".into(),
            age_column: "Age".into(),
            recommendation_column: "Recommendations".into(),
            patients_sheet: "Patients".into(),
            weight_categories: arcs(&[
                "Underweight",
                "Normal Weight",
                "Overweight",
                "Obesity I",
                "Obesity II",
                "Obesity III",
            ]),
            excluded_columns: arcs(&[
                "No.",
                "Code",
                "AdmissionDate",
                "Classification",
                "Gender",
                "Collaborator",
                "Position",
                "Age",
                "BirthDate",
                "Pounds",
                "cm",
                "BMI",
                "Heart Rate",
                "Oxygen Saturation",
                "Creatinine",
                "GFR",
                "Fasting Glucose",
                "Normal Pressure",
            ]),
            disease_columns: None,
            non_disease_sheets: arcs(&["Patients", "Predictions", "Summary", "Info"]),
            row_number_marker: "No.".into(),
            detected_column: "DetectedDiseaseCount".into(),
            possible_column: "PossibleDetectedDiseaseCount".into(),
        }
    }

    /// Load a schema from a toml file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        fn inner(path: &Path) -> Result<Schema> {
            let text = fs::read_to_string(path)?;
            Ok(toml::from_str(&text)?)
        }
        let path = path.as_ref();
        inner(path).with_context(|| format!("loading schema \"{}\"", path.display()))
    }

    pub fn is_marker_column(&self, name: &str) -> bool {
        name.ends_with(&*self.row_number_marker)
    }

    pub fn is_weight_category(&self, name: &str) -> bool {
        self.weight_categories.iter().any(|c| &**c == name)
    }

    pub fn is_derived_column(&self, name: &str) -> bool {
        name == &*self.detected_column || name == &*self.possible_column
    }

    /// Sheets not in the reserved set are disease sheets.
    pub fn is_disease_sheet(&self, name: &str) -> bool {
        !self.non_disease_sheets.iter().any(|s| &**s == name)
    }

    /// The disease-indicator columns of `table`, in table order.
    ///
    /// Declared columns that `table` doesn't have are left out.
    pub fn disease_columns(&self, table: &Table) -> Vec<ArcStr> {
        match &self.disease_columns {
            Some(declared) => declared
                .iter()
                .filter(|name| table.has_column(name))
                .cloned()
                .collect(),
            None => table
                .columns()
                .iter()
                .filter(|name| {
                    !self.excluded_columns.contains(*name)
                        && !self.is_weight_category(name)
                        && !self.is_marker_column(name)
                        && !self.is_derived_column(name)
                })
                .cloned()
                .collect(),
        }
    }

    /// The disease name of a row-number column: `"Diabetes - No."` gives `"Diabetes"`.
    ///
    /// A column that is only the marker keeps its full name.
    pub fn disease_label<'a>(&self, column: &'a str) -> &'a str {
        let label = column
            .strip_suffix(&*self.row_number_marker)
            .unwrap_or(column)
            .trim_end()
            .trim_end_matches('-')
            .trim();
        if label.is_empty() {
            column
        } else {
            label
        }
    }
}

fn arcs(names: &[&str]) -> Vec<ArcStr> {
    names.iter().map(|&name| name.into()).collect()
}
