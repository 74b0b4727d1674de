use clap::Parser;
use clinical_dashboard::{
    export::{save_csv, DEFAULT_EXPORT_STEM},
    header, path_exists, Dashboard, DashboardView, DatasetPaths, Datasets, FilterConfig,
    FullTables, ResultExt, Schema, SortKey, DEFAULT_MAX_ROWS,
};
use qu::ick_use::*;
use std::path::PathBuf;
use term_data_table::{Cell, Row, Table};

#[derive(Parser)]
struct Opt {
    /// The patient roster workbook.
    #[clap(long, default_value = "BA.xlsx")]
    base: PathBuf,
    /// The per-disease roster workbook.
    #[clap(long, default_value = "Pacientes_por_enfermedad.xlsx")]
    diseases: PathBuf,
    /// The recommendation workbook, one sheet per disease.
    #[clap(long, default_value = "resultados_BA.xlsx")]
    recommendations: PathBuf,
    /// A toml file overriding column and sheet names.
    #[clap(long)]
    schema: Option<PathBuf>,
    /// Directory for a cache of the parsed workbooks.
    ///
    /// Each combination of workbook paths and schema gets its own cache file, which is used
    /// instead of the workbooks once it exists.
    #[clap(long)]
    cache: Option<PathBuf>,

    /// Search collaborator names (case-insensitive substring).
    #[clap(long)]
    collaborator: Option<String>,
    /// Search patient codes (case-insensitive substring).
    #[clap(long)]
    code: Option<String>,
    #[clap(long)]
    classification: Vec<String>,
    #[clap(long)]
    gender: Vec<String>,
    /// Keep patients in any of these weight categories.
    #[clap(long)]
    weight: Vec<String>,
    /// Keep patients with any of these diseases.
    #[clap(long)]
    disease: Vec<String>,
    #[clap(long)]
    year: Vec<i32>,
    /// One of none, disease-count-desc, code-asc, code-desc, age-asc, age-desc.
    #[clap(long, default_value = "none")]
    sort: SortKey,

    /// Print the whole view as JSON instead of tables.
    #[clap(long)]
    json: bool,
    /// Write the filtered patients to a CSV file (`pacientes_filtrados.csv` if no path is given).
    #[clap(long)]
    export: Option<Option<PathBuf>>,
    /// Also print the unfiltered rosters and the recommendation workbook's patient sheet.
    #[clap(long)]
    full_tables: bool,
    /// Maximum number of patient rows to print.
    #[clap(long, default_value_t = DEFAULT_MAX_ROWS)]
    max_rows: usize,
}

impl Opt {
    fn filter_config(&self) -> FilterConfig {
        let search = |s: &Option<String>| {
            s.as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_owned)
        };
        FilterConfig {
            collaborator: search(&self.collaborator),
            code: search(&self.code),
            classifications: self.classification.iter().cloned().collect(),
            genders: self.gender.iter().cloned().collect(),
            weight_categories: self.weight.iter().cloned().collect(),
            diseases: self.disease.iter().cloned().collect(),
            admission_years: self.year.iter().copied().collect(),
            sort: self.sort,
        }
    }
}

#[qu::ick]
pub fn main(opt: Opt) -> Result {
    let schema = match &opt.schema {
        Some(path) => Schema::load(path)?,
        None => Schema::default(),
    };
    let data = load_data(&opt, &schema)?;
    let config = opt.filter_config();
    let view = Dashboard::compute(&data, &schema, &config).print_error()?;

    if opt.json {
        println!("{}", serde_json::to_string_pretty(&view)?);
    } else {
        print_view(&view, opt.max_rows);
    }
    if opt.full_tables {
        let full = FullTables::from_datasets(&data, &schema)?;
        if opt.json {
            println!("{}", serde_json::to_string_pretty(&full)?);
        } else {
            print_full_tables(&full, opt.max_rows);
        }
    }

    if let Some(path) = &opt.export {
        let path = match path {
            Some(path) => path.clone(),
            None => PathBuf::from(DEFAULT_EXPORT_STEM).with_extension("csv"),
        };
        match &view.export {
            Some(table) => {
                save_csv(table, &path)?;
                event!(
                    Level::INFO,
                    "exported {} patients to \"{}\"",
                    table.len(),
                    path.display()
                );
            }
            None => event!(Level::WARN, "no patients match, nothing exported"),
        }
    }
    Ok(())
}

fn load_data(opt: &Opt, schema: &Schema) -> Result<Datasets> {
    let paths = DatasetPaths {
        base: opt.base.clone(),
        diseases: opt.diseases.clone(),
        recommendations: opt.recommendations.clone(),
    };
    let Some(dir) = &opt.cache else {
        return Ok(Datasets::load(&paths, schema));
    };
    let cache = dir.join(paths.cache_file_name(schema)?);
    if path_exists(&cache)? {
        event!(
            Level::WARN,
            "using cached data at \"{}\", the workbooks are not re-read",
            cache.display()
        );
        return Datasets::load_cache(&cache);
    }
    let data = Datasets::load(&paths, schema);
    if data.require().is_ok() {
        data.save_cache(&cache)?;
    }
    Ok(data)
}

fn print_view(view: &DashboardView, max_rows: usize) {
    header("Summary");
    println!(
        "unique collaborators: {}",
        view.stats.unique_collaborators
    );
    println!("patients: {}", view.stats.total_patients);
    println!(
        "mean diseases per patient: {:.2}",
        view.stats.mean_diseases_per_patient
    );

    header("Disease detection");
    match &view.detection_chart {
        Some(chart) => {
            let mut table = Table::new().with_row(
                Row::new()
                    .with_cell(Cell::from("Category"))
                    .with_cell(Cell::from("Sheets")),
            );
            for (label, count) in chart.rows() {
                table.add_row(
                    Row::new()
                        .with_cell(Cell::from(label))
                        .with_cell(Cell::from(count.to_string())),
                );
            }
            println!("{}", table);
            println!("disease sheets evaluated: {}", chart.total_sheets);
        }
        None => println!("search by collaborator or code, or pick a disease, to see this chart"),
    }

    header("Patients per disease");
    let mut table = Table::new().with_row(
        Row::new()
            .with_cell(Cell::from("Disease"))
            .with_cell(Cell::from("Patients")),
    );
    for pop in &view.population {
        table.add_row(
            Row::new()
                .with_cell(Cell::from(pop.disease.to_string()))
                .with_cell(Cell::from(pop.patients.to_string())),
        );
    }
    println!("{}", table);

    if let Some(found) = &view.recommendations {
        header("Recommendations");
        if found.is_empty() {
            println!("no recommendations for this search");
        }
        for matches in found {
            println!("{}", matches.sheet);
            println!("{}", matches.rows.term_table(Some(max_rows)));
        }
    }

    header("Filtered patients");
    if view.display.is_empty() {
        println!("no patients match the current filters");
    } else {
        println!("{}", view.display.term_table(Some(max_rows)));
    }
}

fn print_full_tables(full: &FullTables, max_rows: usize) {
    header("Full table: patients");
    println!("{}", full.base.term_table(Some(max_rows)));
    header("Full table: patients per disease");
    println!("{}", full.diseases.term_table(Some(max_rows)));
    if let Some(patients) = &full.recommendation_patients {
        header("Full table: recommendation patients");
        println!("{}", patients.term_table(Some(max_rows)));
    }
}
