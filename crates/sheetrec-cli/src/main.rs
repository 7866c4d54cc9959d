//! sheetrec CLI
//!
//! Command-line tool for reading, writing and reconciling records in a
//! CSV-backed workbook directory.

use clap::{Args, Parser, Subcommand};
use sheetrec_core::{
    append_mapped_rows, append_rows, read_numbered_rows, read_rows, sheet_by_id, update_mapped_rows_data,
    update_mapped_rows_in_place, update_row_in_place, update_rows_data, update_rows_in_place, upsert_headers,
    write_mapped_rows, write_rows, CsvWorkbook, Error, HeaderMapping, Options, Record, UpdateStatus, Workbook,
};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "sheetrec")]
#[command(about = "Read, write and reconcile records in CSV-backed workbooks", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Workbook, sheet and options shared by every sheet command
#[derive(Args)]
struct Target {
    /// Workbook directory
    #[arg(short, long)]
    workbook: PathBuf,

    /// Sheet name
    #[arg(short, long)]
    sheet: String,

    /// Options file (JSON, camelCase keys)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Header row, overriding the options file
    #[arg(long)]
    header_row: Option<u32>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the header row, adding any missing expected headers
    Headers {
        #[command(flatten)]
        target: Target,

        /// Expected headers (comma-separated)
        #[arg(short, long, value_delimiter = ',')]
        expect: Vec<String>,

        /// Freeze the rows up to and including the header row
        #[arg(long)]
        freeze: bool,
    },

    /// Print the sheet's records as JSON
    Read {
        #[command(flatten)]
        target: Target,

        /// Include each record's sheet row number
        #[arg(short, long)]
        numbered: bool,
    },

    /// Write records from a JSON file below the header row
    Write {
        #[command(flatten)]
        target: Target,

        /// Records file (JSON object or array of objects)
        #[arg(short, long)]
        input: PathBuf,

        /// Header mapping file (JSON object: sheet header -> record field)
        #[arg(long)]
        map: Option<PathBuf>,
    },

    /// Append records from a JSON file after the last populated row
    Append {
        #[command(flatten)]
        target: Target,

        /// Records file (JSON object or array of objects)
        #[arg(short, long)]
        input: PathBuf,

        /// Header mapping file (JSON object: sheet header -> record field)
        #[arg(long)]
        map: Option<PathBuf>,
    },

    /// Update matching rows in place, or one known row
    Update {
        #[command(flatten)]
        target: Target,

        /// Records file (JSON object or array of objects)
        #[arg(short, long)]
        input: PathBuf,

        /// Headers forming the join key (comma-separated)
        #[arg(short, long = "match", value_delimiter = ',')]
        match_headers: Vec<String>,

        /// Overwrite this sheet row instead of scanning (not with mappings)
        #[arg(short, long, conflicts_with_all = ["map_match", "map_update"])]
        row: Option<u32>,

        /// With --row, check the row still holds the matching record
        #[arg(long)]
        require_match: bool,

        /// Fail if any row matches
        #[arg(long)]
        require_unique: bool,

        /// Join key mapping file (sheet header -> record field)
        #[arg(long, requires = "map_update")]
        map_match: Option<PathBuf>,

        /// Update mask mapping file (sheet header -> record field)
        #[arg(long, requires = "map_match")]
        map_update: Option<PathBuf>,
    },

    /// Reconcile the sheet with a complete record set
    Reconcile {
        #[command(flatten)]
        target: Target,

        /// Records file (JSON array of objects)
        #[arg(short, long)]
        input: PathBuf,

        /// Headers forming the join key (comma-separated)
        #[arg(short, long = "match", value_delimiter = ',')]
        match_headers: Vec<String>,

        /// Add source records that match nothing
        #[arg(long)]
        upsert: bool,

        /// Move unmatched sheet records to <sheet>_archive
        #[arg(long)]
        archive: bool,

        /// Join key mapping file (sheet header -> record field)
        #[arg(long, requires = "map_update")]
        map_match: Option<PathBuf>,

        /// Update mask mapping file (sheet header -> record field)
        #[arg(long, requires = "map_match")]
        map_update: Option<PathBuf>,
    },

    /// List sheets and their ids
    Sheets {
        /// Workbook directory
        #[arg(short, long)]
        workbook: PathBuf,

        /// Look up a single sheet by id
        #[arg(long)]
        id: Option<String>,
    },
}

fn main() {
    init_logging();
    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn run() -> sheetrec_core::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Headers { target, expect, freeze } => cmd_headers(&target, expect, freeze),
        Commands::Read { target, numbered } => cmd_read(&target, numbered),
        Commands::Write { target, input, map } => cmd_write(&target, &input, map.as_deref(), false),
        Commands::Append { target, input, map } => cmd_write(&target, &input, map.as_deref(), true),
        Commands::Update {
            target,
            input,
            match_headers,
            row,
            require_match,
            require_unique,
            map_match,
            map_update,
        } => {
            let mut options = load_options(&target)?;
            options.require_match |= require_match;
            options.require_unique |= require_unique;
            if !match_headers.is_empty() {
                options.match_headers = Some(match_headers);
            }
            let mappings = load_mappings(map_match.as_deref(), map_update.as_deref())?;
            cmd_update(&target, &input, row, mappings, &options)
        }
        Commands::Reconcile {
            target,
            input,
            match_headers,
            upsert,
            archive,
            map_match,
            map_update,
        } => {
            let mut options = load_options(&target)?;
            options.upsert_new_records |= upsert;
            options.remove_and_archive_non_matching_records |= archive;
            if !match_headers.is_empty() {
                options.match_headers = Some(match_headers);
            }
            let mappings = load_mappings(map_match.as_deref(), map_update.as_deref())?;
            cmd_reconcile(&target, &input, mappings, &options)
        }
        Commands::Sheets { workbook, id } => cmd_sheets(&workbook, id.as_deref()),
    }
}

fn load_options(target: &Target) -> sheetrec_core::Result<Options> {
    let mut options = match &target.config {
        Some(path) => Options::load(path)?,
        None => Options::default(),
    };
    if let Some(row) = target.header_row {
        options.column_headers_row_index = Some(row);
    }
    Ok(options)
}

/// Load records from a JSON object or an array of objects
fn load_records(path: &Path) -> sheetrec_core::Result<Vec<Record>> {
    let content = fs::read_to_string(path).map_err(|e| Error::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;
    let value: serde_json::Value = serde_json::from_str(&content)?;
    if value.is_array() {
        Ok(serde_json::from_value(value)?)
    } else {
        Ok(vec![serde_json::from_value(value)?])
    }
}

fn load_mapping(path: &Path) -> sheetrec_core::Result<HeaderMapping> {
    let content = fs::read_to_string(path).map_err(|e| Error::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;
    Ok(serde_json::from_str(&content)?)
}

fn load_mappings(
    map_match: Option<&Path>,
    map_update: Option<&Path>,
) -> sheetrec_core::Result<Option<(HeaderMapping, HeaderMapping)>> {
    match (map_match, map_update) {
        (Some(m), Some(u)) => Ok(Some((load_mapping(m)?, load_mapping(u)?))),
        _ => Ok(None),
    }
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> sheetrec_core::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn cmd_headers(target: &Target, expect: Vec<String>, freeze: bool) -> sheetrec_core::Result<()> {
    let mut options = load_options(target)?;
    if !expect.is_empty() {
        options.expected_headers = Some(expect);
    }
    options.freeze_headers |= freeze;

    let mut book = CsvWorkbook::open(&target.workbook)?;
    book.locate_or_create_sheet(&target.sheet)?;
    let headers = upsert_headers(&mut book, &target.sheet, &options)?;
    if book.has_pending_writes() {
        book.commit()?;
    }
    print_json(&headers)
}

fn cmd_read(target: &Target, numbered: bool) -> sheetrec_core::Result<()> {
    let options = load_options(target)?;
    let book = CsvWorkbook::open(&target.workbook)?;

    if numbered {
        let rows: Vec<serde_json::Value> = read_numbered_rows(&book, &target.sheet, &options)?
            .into_iter()
            .map(|(row, record)| serde_json::json!({ "row": row, "record": record }))
            .collect();
        print_json(&rows)
    } else {
        print_json(&read_rows(&book, &target.sheet, &options)?)
    }
}

fn cmd_write(target: &Target, input: &Path, map: Option<&Path>, append: bool) -> sheetrec_core::Result<()> {
    let options = load_options(target)?;
    let records = load_records(input)?;
    let mapping = map.map(load_mapping).transpose()?;

    let mut book = CsvWorkbook::open(&target.workbook)?;
    match (&mapping, append) {
        (Some(mapping), false) => write_mapped_rows(&mut book, &target.sheet, &records, mapping, &options)?,
        (Some(mapping), true) => append_mapped_rows(&mut book, &target.sheet, &records, mapping, &options)?,
        (None, false) => write_rows(&mut book, &target.sheet, &records, &options)?,
        (None, true) => append_rows(&mut book, &target.sheet, &records, &options)?,
    }
    book.commit()?;

    println!(
        "{} {} record(s) to {}",
        if append { "Appended" } else { "Wrote" },
        records.len(),
        target.sheet
    );
    Ok(())
}

fn cmd_update(
    target: &Target,
    input: &Path,
    row: Option<u32>,
    mappings: Option<(HeaderMapping, HeaderMapping)>,
    options: &Options,
) -> sheetrec_core::Result<()> {
    let records = load_records(input)?;
    if row.is_some() && records.len() != 1 {
        eprintln!("--row updates exactly one record, {} given", records.len());
        std::process::exit(1);
    }

    tracing::debug!(sheet = %target.sheet, records = records.len(), ?row, "updating rows");

    let mut book = CsvWorkbook::open(&target.workbook)?;
    let match_headers = options.match_headers.clone().unwrap_or_default();
    let mut status = UpdateStatus::new();

    for record in &records {
        status += match (&mappings, row) {
            (_, Some(row)) => update_row_in_place(&mut book, &target.sheet, record, Some(row), options)?,
            (Some((matching, update)), None) => {
                update_mapped_rows_in_place(&mut book, &target.sheet, record, matching, update, options)?
            }
            (None, None) => update_rows_in_place(&mut book, &target.sheet, record, &match_headers, options)?,
        };
    }
    book.commit()?;

    print_json(&status)
}

fn cmd_reconcile(
    target: &Target,
    input: &Path,
    mappings: Option<(HeaderMapping, HeaderMapping)>,
    options: &Options,
) -> sheetrec_core::Result<()> {
    let records = load_records(input)?;
    tracing::debug!(sheet = %target.sheet, records = records.len(), "reconciling");
    let mut book = CsvWorkbook::open(&target.workbook)?;

    let status = match &mappings {
        Some((matching, update)) => {
            update_mapped_rows_data(&mut book, &target.sheet, &records, matching, update, options)?
        }
        None => {
            let match_headers = options.match_headers.clone().unwrap_or_default();
            update_rows_data(&mut book, &target.sheet, &records, &match_headers, options)?
        }
    };
    book.commit()?;

    print_json(&status)
}

fn cmd_sheets(workbook: &Path, id: Option<&str>) -> sheetrec_core::Result<()> {
    let book = CsvWorkbook::open(workbook)?;

    if let Some(id) = id {
        match sheet_by_id(&book, id)? {
            Some(name) => println!("{}", name),
            None => {
                eprintln!("No sheet with id {}", id);
                std::process::exit(1);
            }
        }
        return Ok(());
    }

    println!("Sheets ({}):", book.sheet_names().len());
    for name in book.sheet_names() {
        let id = book.sheet_id(&name).map(|id| id.to_string()).unwrap_or_default();
        let rows = book.extents(&name)?.rows;
        println!("  [{}] {} ({} rows)", id, name, rows);
    }
    Ok(())
}
