//! Reading the dashboard's workbooks.
//!
//! Three files feed the dashboard: the patient roster, the per-disease roster, and the
//! recommendation workbook (one sheet per disease). Sheets are read with calamine; the first row
//! of a sheet is its header.
use crate::{
    check_extension, load, save,
    xref::{RecommendationBook, RecommendationSheet},
    ArcStr, Record, Result, Schema, Table, Value,
};
use calamine::{DataType, Reader};
use qu::ick_use::*;
use serde::{Deserialize, Serialize};
use std::{
    collections::hash_map::DefaultHasher,
    hash::{Hash, Hasher},
    path::{Path, PathBuf},
};

/// Where the three workbooks live.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetPaths {
    pub base: PathBuf,
    pub diseases: PathBuf,
    pub recommendations: PathBuf,
}

impl DatasetPaths {
    /// File name for a cache of these workbooks read under `schema`.
    ///
    /// The name changes whenever a path or the schema does, so a cache is never reused for
    /// different inputs.
    pub fn cache_file_name(&self, schema: &Schema) -> Result<String> {
        let key = serde_json::to_string(&(self, schema))?;
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        Ok(format!("datasets-{:016x}.bin", hasher.finish()))
    }
}

/// The loaded input data.
///
/// The two rosters are `None` if they couldn't be read; the dashboard can't be computed without
/// them. A missing recommendation workbook just gives an empty book.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Datasets {
    pub base: Option<Table>,
    pub diseases: Option<Table>,
    /// The patient sheet of the recommendation workbook, if it has one.
    pub recommendation_patients: Option<Table>,
    pub book: RecommendationBook,
}

impl Datasets {
    /// Read all three workbooks. Failures are logged and leave the dataset empty.
    pub fn load(paths: &DatasetPaths, schema: &Schema) -> Self {
        let base = load_first_sheet(&paths.base)
            .map_err(|e| event!(Level::WARN, "{:#}", e))
            .ok();
        let diseases = load_first_sheet(&paths.diseases)
            .map_err(|e| event!(Level::WARN, "{:#}", e))
            .ok();
        let (recommendation_patients, book) = RecommendationBook::load(&paths.recommendations, schema)
            .map_err(|e| event!(Level::WARN, "{:#}", e))
            .unwrap_or_default();
        Datasets {
            base,
            diseases,
            recommendation_patients,
            book,
        }
    }

    /// The base and disease rosters, or an error naming the one that failed to load.
    pub fn require(&self) -> Result<(&Table, &Table)> {
        let base = self
            .base
            .as_ref()
            .context("the patient roster could not be loaded")?;
        let diseases = self
            .diseases
            .as_ref()
            .context("the disease roster could not be loaded")?;
        Ok((base, diseases))
    }

    /// Load previously parsed workbooks from a `.bin` cache file.
    pub fn load_cache(path: impl AsRef<Path>) -> Result<Self> {
        load(path)
    }

    /// Cache parsed workbooks to a `.bin` file.
    pub fn save_cache(&self, path: impl AsRef<Path>) -> Result {
        let path = path.as_ref();
        check_extension(path, "bin")?;
        save(self, path)
    }
}

impl RecommendationBook {
    /// See [`load_recommendations`].
    pub fn load(path: impl AsRef<Path>, schema: &Schema) -> Result<(Option<Table>, Self)> {
        load_recommendations(path, schema)
    }
}

/// Read the first sheet of a workbook.
pub fn load_first_sheet(path: impl AsRef<Path>) -> Result<Table> {
    fn inner(path: &Path) -> Result<Table> {
        let mut workbook = calamine::open_workbook_auto(path)?;
        let name = workbook
            .sheet_names()
            .first()
            .cloned()
            .context("workbook has no sheets")?;
        let range = workbook
            .worksheet_range(&name)
            .with_context(|| format!("missing `{}` worksheet", name))??;
        Ok(range_to_table(&range))
    }
    let path = path.as_ref();
    inner(path).with_context(|| format!("while loading \"{}\"", path.display()))
}

/// Read a named sheet of a workbook.
pub fn load_sheet(path: impl AsRef<Path>, sheet: &str) -> Result<Table> {
    fn inner(path: &Path, sheet: &str) -> Result<Table> {
        let mut workbook = calamine::open_workbook_auto(path)?;
        let range = workbook
            .worksheet_range(sheet)
            .with_context(|| format!("missing `{}` worksheet", sheet))??;
        Ok(range_to_table(&range))
    }
    let path = path.as_ref();
    inner(path, sheet).with_context(|| format!("while loading \"{}\"", path.display()))
}

/// Read the recommendation workbook.
///
/// Returns the patient sheet (if present) and a book of every sheet that has a recommendation
/// column, cut down to the code, collaborator and recommendation columns.
pub fn load_recommendations(
    path: impl AsRef<Path>,
    schema: &Schema,
) -> Result<(Option<Table>, RecommendationBook)> {
    fn inner(path: &Path, schema: &Schema) -> Result<(Option<Table>, RecommendationBook)> {
        let mut workbook = calamine::open_workbook_auto(path)?;
        let names = workbook.sheet_names().to_owned();
        let mut patients = None;
        let mut sheets = Vec::new();
        for name in names {
            let range = workbook
                .worksheet_range(&name)
                .with_context(|| format!("missing `{}` worksheet", name))??;
            let table = range_to_table(&range);
            if name == &*schema.patients_sheet {
                patients = Some(table.clone());
            }
            let Some(sheet) = recommendation_sheet(name.as_str().into(), &table, schema) else {
                continue;
            };
            sheets.push(sheet);
        }
        event!(
            Level::DEBUG,
            "{} recommendation sheets ({} diseases)",
            sheets.len(),
            sheets
                .iter()
                .filter(|s| schema.is_disease_sheet(&s.name))
                .count()
        );
        Ok((patients, RecommendationBook::new(sheets)))
    }
    let path = path.as_ref();
    inner(path, schema).with_context(|| format!("while loading \"{}\"", path.display()))
}

/// Keep a sheet only if it has a recommendation column.
fn recommendation_sheet(
    name: ArcStr,
    table: &Table,
    schema: &Schema,
) -> Option<RecommendationSheet> {
    if !table.has_column(&schema.recommendation_column) {
        return None;
    }
    let rows = table.select([
        &*schema.code_column,
        &*schema.collaborator_column,
        &*schema.recommendation_column,
    ]);
    if rows.columns().len() < 3 {
        event!(
            Level::WARN,
            "recommendation sheet \"{}\" lacks identifying columns",
            name
        );
    }
    Some(RecommendationSheet { name, rows })
}

/// Convert a worksheet to a table, taking the first row as the header.
///
/// Blank header cells are named `Unnamed: <position>`.
fn range_to_table(range: &calamine::Range<DataType>) -> Table {
    let mut rows = range.rows();
    let Some(header) = rows.next() else {
        return Table::empty(Vec::<ArcStr>::new());
    };
    let columns = header
        .iter()
        .enumerate()
        .map(|(idx, cell)| match Value::from_cell(cell).as_text() {
            Some(name) => ArcStr::from(&*name),
            None => format!("Unnamed: {}", idx).into(),
        })
        .collect();
    let records = rows
        .enumerate()
        .map(|(index, cells)| Record::new(index, cells.iter().map(Value::from_cell).collect()))
        .collect();
    Table::new(columns, records)
}
