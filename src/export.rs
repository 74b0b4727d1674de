//! Tables handed to the user: what is shown and what is downloaded.
use crate::{Context, Result, Schema, Table};
use std::{io, path::Path};

/// File name, without extension, offered for downloads.
pub const DEFAULT_EXPORT_STEM: &str = "pacientes_filtrados";

/// The filtered roster without either derived disease count. Tables without them come back
/// unchanged.
pub fn export_projection(roster: &Table, schema: &Schema) -> Table {
    roster.drop_columns(|name| schema.is_derived_column(name))
}

/// The filtered roster as shown on screen: the raw indicator sum is hidden, the cross-referenced
/// count stays.
pub fn display_projection(roster: &Table, schema: &Schema) -> Table {
    roster.drop_columns(|name| name == &*schema.detected_column)
}

/// Write `table` as CSV, header first. Missing values are written as empty fields.
pub fn write_csv(table: &Table, writer: impl io::Write) -> Result {
    let mut out = csv::Writer::from_writer(writer);
    out.write_record(table.columns().iter().map(|name| name.as_bytes()))?;
    for rec in table.iter() {
        out.write_record(rec.cells.iter().map(|v| v.to_string()))?;
    }
    out.flush()?;
    Ok(())
}

/// Save `table` to a CSV file at `path`.
pub fn save_csv(table: &Table, path: impl AsRef<Path>) -> Result {
    let path = path.as_ref();
    let file = std::fs::File::create(path)
        .with_context(|| format!("creating export file \"{}\"", path.display()))?;
    write_csv(table, io::BufWriter::new(file))
        .with_context(|| format!("writing export to \"{}\"", path.display()))
}
