//! Sheet reader - turns QC sheet exports into raw records
//!
//! Supported inputs:
//! * `.csv`  - export of the QC sheet: one title row, then one row per run
//! * `.json` - `[{ "level": "level-1", "results": [...], "failed": [...], "date": "..." }]`

use crate::config::{is_ignored, ReaderConfig};
use crate::pipeline::RecordSource;
use crate::RawRecord;
use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use globset::GlobSet;
use regex::Regex;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use walkdir::WalkDir;

const SHEET_EXTENSIONS: [&str; 2] = ["csv", "json"];

/// Record source over QC sheet exports
pub struct SheetReader {
    paths: Vec<PathBuf>,
    layout: ReaderConfig,
    ignore: Option<GlobSet>,
}

impl SheetReader {
    pub fn new(paths: Vec<PathBuf>, layout: ReaderConfig) -> Self {
        Self {
            paths,
            layout,
            ignore: None,
        }
    }

    /// Skip files matching the set
    pub fn with_ignore(mut self, ignore: GlobSet) -> Self {
        self.ignore = Some(ignore);
        self
    }

    /// Sheet files under the configured paths, sorted
    pub fn files(&self) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for path in &self.paths {
            files.extend(collect_sheet_files(path, self.ignore.as_ref())?);
        }
        files.sort();
        files.dedup();
        Ok(files)
    }
}

impl RecordSource for SheetReader {
    fn read_records(&self) -> Result<Vec<RawRecord>> {
        let mut records = Vec::new();
        for file in self.files()? {
            let parsed = read_file(&file, &self.layout)?;
            log::info!("{}: {} runs", file.display(), parsed.len());
            records.extend(parsed);
        }
        Ok(records)
    }
}

/// Whether the path has a supported sheet extension
pub fn is_sheet_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| SHEET_EXTENSIONS.iter().any(|s| e.eq_ignore_ascii_case(s)))
        .unwrap_or(false)
}

/// Expand a file or directory into the sheet files it contains
pub fn collect_sheet_files(path: &Path, ignore_set: Option<&GlobSet>) -> Result<Vec<PathBuf>> {
    if path.is_file() {
        if !is_sheet_file(path) {
            log::warn!("skipping {}: not a .csv or .json export", path.display());
            return Ok(vec![]);
        }
        if let Some(set) = ignore_set {
            if is_ignored(path, set) {
                return Ok(vec![]);
            }
        }
        return Ok(vec![path.to_path_buf()]);
    }

    if !path.is_dir() {
        bail!("Path does not exist: {}", path.display());
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(path)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let file_path = entry.path();
        if !entry.file_type().is_file() || !is_sheet_file(file_path) {
            continue;
        }
        if let Some(set) = ignore_set {
            if is_ignored(file_path, set) {
                continue;
            }
        }
        files.push(file_path.to_path_buf());
    }
    files.sort();
    Ok(files)
}

/// Read one sheet export. Dispatch by extension.
pub fn read_file(path: &Path, layout: &ReaderConfig) -> Result<Vec<RawRecord>> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match ext.as_str() {
        "csv" => {
            let date = path
                .file_name()
                .and_then(|n| n.to_str())
                .and_then(run_date_from_file_name)
                .unwrap_or_else(today);
            let file = fs::File::open(path)
                .with_context(|| format!("Failed to open {}", path.display()))?;
            read_csv(file, &date, layout).with_context(|| format!("in {}", path.display()))
        }
        "json" => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            serde_json::from_str(&text)
                .with_context(|| format!("Invalid QC records in {}", path.display()))
        }
        other => bail!("Unsupported file extension: .{other}"),
    }
}

/// Parse a sheet export. The first row holds the analyte titles; every
/// later row is one run dated `date`.
pub fn read_csv<R: Read>(input: R, date: &str, layout: &ReaderConfig) -> Result<Vec<RawRecord>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(input);

    let mut rows = reader.records();
    let Some(titles) = rows.next() else {
        return Ok(Vec::new());
    };
    let titles = titles.context("reading title row")?;

    // Analyte columns: past the metadata columns, with a usable title
    let analytes: Vec<(usize, String)> = titles
        .iter()
        .enumerate()
        .skip(layout.first_result_column)
        .filter_map(|(idx, title)| {
            let title = title.trim();
            if title.is_empty() || title.contains('/') {
                None
            } else {
                Some((idx, title.to_string()))
            }
        })
        .collect();

    let mut records = Vec::new();
    for (row_no, row) in rows.enumerate() {
        let row = row.with_context(|| format!("CSV row {}", row_no + 2))?;
        if row.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }

        let level = layout.level_for(row.get(layout.sample_type_column).unwrap_or(""));
        let mut record = RawRecord::new(level, date);
        record.failed = row
            .get(layout.failed_tests_column)
            .map(split_failed)
            .unwrap_or_default();

        for (idx, analyte) in &analytes {
            let cell = row.get(*idx).unwrap_or("").trim();
            match cell.parse::<f64>() {
                Ok(value) if value.is_finite() => {
                    record.insert_result(analyte.clone(), round_to(value, layout.decimals));
                }
                _ => {
                    if !cell.is_empty() {
                        log::debug!("row {}: {} = '{}' is not a number", row_no + 2, analyte, cell);
                    }
                }
            }
        }
        records.push(record);
    }
    Ok(records)
}

fn split_failed(cell: &str) -> Vec<String> {
    cell.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

fn date_token() -> &'static Regex {
    static TOKEN: OnceLock<Regex> = OnceLock::new();
    TOKEN.get_or_init(|| Regex::new(r"\d{2}_\d{2}_\d{2}").expect("valid date pattern"))
}

/// Run date encoded as `DD_MM_YY` in a file name, formatted `YYYY-MM-DD`
pub fn run_date_from_file_name(name: &str) -> Option<String> {
    let token = date_token().find(name)?;
    let date = NaiveDate::parse_from_str(token.as_str(), "%d_%m_%y").ok()?;
    Some(date.format("%Y-%m-%d").to_string())
}

fn today() -> String {
    chrono::Utc::now().date_naive().format("%Y-%m-%d").to_string()
}
