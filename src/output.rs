//! CSV rendering and persistence for the derived tables.
//!
//! Tables are rendered to memory first and then written through
//! [`write_atomically`], so a failed run never leaves one fresh output
//! next to one stale one.

use csv::WriterBuilder;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::analyzers::types::{CragBreakdown, RankingTable};
use crate::error::ExportError;

const BREAKDOWN_HEADERS: [&str; 7] = [
    "crag",
    "total_routes",
    "avg_stars_crag",
    "rating_category",
    "num_routes",
    "avg_stars",
    "pct_of_routes",
];

/// Formats a float the way the breakdown serializer does (`3.0`, `2.67`).
fn format_float(value: f64) -> String {
    format!("{value:?}")
}

fn format_stars(value: Option<f64>) -> String {
    value.map(format_float).unwrap_or_default()
}

/// Column names for a ranking table: crag totals, then one
/// `num_routes_<bucket>`/`avg_stars_<bucket>` pair per tracked bucket.
pub fn ranking_headers(table: &RankingTable) -> Vec<String> {
    let mut headers = vec![
        "crag".to_string(),
        "total_routes".to_string(),
        "avg_stars_crag".to_string(),
    ];
    for bucket in &table.tracked {
        headers.push(format!("num_routes_{bucket}"));
        headers.push(format!("avg_stars_{bucket}"));
    }
    headers
}

/// Renders a ranking table as CSV, indexed by crag name. Missing bucket
/// cells are written as empty fields.
pub fn render_ranking(table: &RankingTable) -> Result<Vec<u8>, ExportError> {
    let mut writer = WriterBuilder::new().has_headers(false).from_writer(Vec::new());
    writer.write_record(ranking_headers(table))?;

    for row in &table.rows {
        let mut record = vec![
            row.crag.clone(),
            row.total_routes.to_string(),
            format_stars(row.avg_stars_crag),
        ];
        for bucket in &table.tracked {
            match row.cell(*bucket) {
                Some(cell) => {
                    record.push(cell.num_routes.to_string());
                    record.push(format_stars(cell.avg_stars));
                }
                None => {
                    record.push(String::new());
                    record.push(String::new());
                }
            }
        }
        writer.write_record(&record)?;
    }

    into_bytes(writer)
}

/// Renders the crag×bucket breakdown as CSV.
pub fn render_breakdown(rows: &[CragBreakdown]) -> Result<Vec<u8>, ExportError> {
    let mut writer = WriterBuilder::new().has_headers(false).from_writer(Vec::new());
    writer.write_record(BREAKDOWN_HEADERS)?;
    for row in rows {
        writer.serialize(row)?;
    }
    into_bytes(writer)
}

fn into_bytes(writer: csv::Writer<Vec<u8>>) -> Result<Vec<u8>, ExportError> {
    writer
        .into_inner()
        .map_err(|e| ExportError::Csv(csv::Error::from(e.into_error())))
}

/// Hidden sibling of `path` used while replacing it, e.g. `.all.csv.tmp`.
fn sibling_path(path: &Path, suffix: &str) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{name}.{suffix}"))
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> ExportError + '_ {
    move |source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// A destination touched by the rename phase.
struct Replaced<'a> {
    path: &'a Path,
    /// Where the previous contents were moved, if there were any.
    backup: Option<PathBuf>,
    installed: bool,
}

/// Writes every `(path, contents)` pair, or none of them.
///
/// All contents are staged next to their destinations first; destinations
/// are only replaced once every stage write has succeeded. Existing
/// destinations are moved aside before being replaced, and moved back if a
/// later rename fails, so the previous outputs survive as a set.
pub fn write_atomically(outputs: &[(&Path, &[u8])]) -> Result<(), ExportError> {
    let mut staged: Vec<(PathBuf, &Path)> = Vec::with_capacity(outputs.len());
    let mut replaced: Vec<Replaced<'_>> = Vec::with_capacity(outputs.len());

    let result = stage(outputs, &mut staged).and_then(|()| replace(&staged, &mut replaced));

    match result {
        Ok(()) => {
            for backup in replaced.iter().filter_map(|r| r.backup.as_ref()) {
                remove_quietly(backup);
            }
        }
        Err(_) => {
            restore(&replaced);
            for (tmp, _) in &staged {
                remove_quietly(tmp);
            }
        }
    }
    result
}

fn stage<'a>(
    outputs: &[(&'a Path, &[u8])],
    staged: &mut Vec<(PathBuf, &'a Path)>,
) -> Result<(), ExportError> {
    for &(path, contents) in outputs {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_error(parent))?;
        }
        let tmp = sibling_path(path, "tmp");
        fs::write(&tmp, contents).map_err(io_error(&tmp))?;
        debug!(path = %tmp.display(), bytes = contents.len(), "Staged output");
        staged.push((tmp, path));
    }
    Ok(())
}

fn replace<'a>(
    staged: &[(PathBuf, &'a Path)],
    replaced: &mut Vec<Replaced<'a>>,
) -> Result<(), ExportError> {
    for (tmp, path) in staged.iter().map(|(tmp, path)| (tmp, *path)) {
        let backup = if path.is_file() {
            let backup = sibling_path(path, "bak");
            fs::rename(path, &backup).map_err(io_error(path))?;
            Some(backup)
        } else {
            None
        };
        replaced.push(Replaced {
            path,
            backup,
            installed: false,
        });

        fs::rename(tmp, path).map_err(io_error(path))?;
        if let Some(last) = replaced.last_mut() {
            last.installed = true;
        }
    }
    Ok(())
}

/// Puts back whatever the rename phase displaced, newest first.
fn restore(replaced: &[Replaced<'_>]) {
    for r in replaced.iter().rev() {
        let outcome = match &r.backup {
            Some(backup) => fs::rename(backup, r.path),
            None if r.installed => fs::remove_file(r.path),
            None => Ok(()),
        };
        if let Err(e) = outcome {
            warn!(path = %r.path.display(), error = %e, "Failed to restore previous output");
        }
    }
}

fn remove_quietly(path: &Path) {
    if path.exists() {
        if let Err(e) = fs::remove_file(path) {
            warn!(path = %path.display(), error = %e, "Failed to remove temporary output");
        }
    }
}

/// Writes the full ranking and its diversity subset as a pair.
pub fn write_rankings(
    all_path: &Path,
    all: &RankingTable,
    diverse_path: &Path,
    diverse: &RankingTable,
) -> Result<(), ExportError> {
    let all_csv = render_ranking(all)?;
    let diverse_csv = render_ranking(diverse)?;

    write_atomically(&[
        (all_path, all_csv.as_slice()),
        (diverse_path, diverse_csv.as_slice()),
    ])?;

    info!(
        all = %all_path.display(),
        all_rows = all.len(),
        diverse = %diverse_path.display(),
        diverse_rows = diverse.len(),
        "Rankings written"
    );
    Ok(())
}

/// Writes the crag×bucket breakdown table.
pub fn write_breakdown(path: &Path, rows: &[CragBreakdown]) -> Result<(), ExportError> {
    let csv = render_breakdown(rows)?;
    write_atomically(&[(path, csv.as_slice())])?;
    info!(path = %path.display(), rows = rows.len(), "Breakdown written");
    Ok(())
}

/// Prints a value to stdout as pretty JSON.
pub fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
