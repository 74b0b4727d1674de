//! Filtering and summarising a clinic's patient roster.
//!
//! The roster, a per-disease roster and a workbook of per-disease nutritional recommendations are
//! loaded once ([`Datasets`]). Each interaction then runs [`Dashboard::compute`] with the current
//! [`FilterConfig`] to get a fresh [`DashboardView`].
pub mod aggregate;
pub mod dashboard;
pub mod export;
pub mod filter;
pub mod loader;
pub mod predicate;
pub mod schema;
pub mod sort;
mod table;
mod util;
mod value;
pub mod xref;

pub use anyhow::{Context, Error};
use qu::ick_use::*;
use serde::{de::DeserializeOwned, Serialize};
use std::{fs, io, path::Path, sync::Arc};

pub use crate::{
    aggregate::{DetectionChart, DiseasePopulation, Stats},
    dashboard::{Dashboard, DashboardView, FullTables},
    filter::FilterOptions,
    loader::{DatasetPaths, Datasets},
    predicate::{FilterConfig, Predicate},
    schema::Schema,
    sort::SortKey,
    table::{Record, Table},
    util::{header, path_exists, ResultExt, DEFAULT_MAX_ROWS},
    value::Value,
    xref::{RecommendationBook, RecommendationSheet, Scope, SheetMatches},
};

pub type ArcStr = Arc<str>;
pub type Result<T = (), E = anyhow::Error> = std::result::Result<T, E>;

/// Load bincode data from disk.
fn load<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T> {
    fn inner<T: DeserializeOwned>(path: &Path) -> Result<T> {
        let reader = io::BufReader::new(fs::File::open(path)?);
        bincode::deserialize_from(reader).map_err(Into::into)
    }
    let path = path.as_ref();
    check_extension(path, "bin")?;

    inner(path).with_context(|| format!("unable to load data from \"{}\"", path.display()))
}

/// Save data to disk as bincode.
fn save<T: Serialize>(contents: &T, path: impl AsRef<Path>) -> Result {
    fn inner<T: Serialize>(contents: &T, path: &Path) -> Result {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context("could not create parent")?;
        }
        if util::path_exists(path)? {
            event!(
                Level::WARN,
                "overwriting existing file at \"{}\"",
                path.display()
            );
        }
        let mut out = io::BufWriter::new(fs::File::create(path)?);
        bincode::serialize_into(&mut out, contents)?;
        Ok(())
    }
    let path = path.as_ref();
    check_extension(path, "bin")?;

    inner(contents, path).with_context(|| format!("unable to save data to \"{}\"", path.display()))
}

pub fn check_extension(path: &Path, ext: &str) -> Result<()> {
    ensure!(
        matches!(path.extension(), Some(p) if p == ext),
        "filename should end with `.{}`",
        ext
    );
    Ok(())
}
