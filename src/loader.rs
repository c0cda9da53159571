//! CSV loader for route-finder exports.

use csv::{ReaderBuilder, StringRecord};
use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::Path;
use tracing::{debug, info};

use crate::error::DataLoadError;

pub const LOCATION: &str = "Location";
pub const ROUTE_TYPE: &str = "Route Type";
pub const RATING: &str = "Rating";
pub const AVG_STARS: &str = "Avg Stars";

/// One row of the export. The typed fields are the ones the pipeline
/// reads; `columns` keeps the whole source row.
#[derive(Debug, Clone)]
pub struct RouteRecord {
    /// 1-based line in the source file.
    pub line: u64,
    pub location: String,
    pub route_type: String,
    pub rating: String,
    pub avg_stars: Option<f64>,
    pub columns: StringRecord,
}

/// The loaded export, in file order.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    pub headers: StringRecord,
    pub routes: Vec<RouteRecord>,
}

/// Index of `column` in `headers`, ignoring whitespace around header names.
fn header_index(headers: &StringRecord, column: &str) -> Option<usize> {
    headers.iter().position(|h| h.trim() == column.trim())
}

impl RouteTable {
    /// Looks up any source column of a route by header name.
    pub fn field<'a>(&self, route: &'a RouteRecord, column: &str) -> Option<&'a str> {
        let idx = header_index(&self.headers, column)?;
        route.columns.get(idx)
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

struct ColumnIndex {
    location: usize,
    route_type: usize,
    rating: usize,
    avg_stars: usize,
}

impl ColumnIndex {
    fn resolve(path: &Path, headers: &StringRecord) -> Result<Self, DataLoadError> {
        let find = |column: &'static str| {
            header_index(headers, column)
                .ok_or_else(|| DataLoadError::MissingColumn {
                    path: path.to_path_buf(),
                    column,
                })
        };
        Ok(Self {
            location: find(LOCATION)?,
            route_type: find(ROUTE_TYPE)?,
            rating: find(RATING)?,
            avg_stars: find(AVG_STARS)?,
        })
    }
}

/// Reads a route-finder CSV from disk.
///
/// # Errors
///
/// Returns a [`DataLoadError`] if the file is missing or unreadable, has
/// no header, lacks one of the required columns, has rows whose column
/// count differs from the header, or has a non-numeric `Avg Stars`.
#[tracing::instrument(skip(path), fields(path = %path.display()))]
pub fn load_routes(path: &Path) -> Result<RouteTable, DataLoadError> {
    let file = File::open(path).map_err(|source| match source.kind() {
        ErrorKind::NotFound => DataLoadError::Missing {
            path: path.to_path_buf(),
        },
        _ => DataLoadError::Unreadable {
            path: path.to_path_buf(),
            source,
        },
    })?;

    let table = read_routes(path, file)?;
    info!(rows = table.len(), columns = table.headers.len(), "Routes loaded");
    Ok(table)
}

/// Parses route rows from any reader. `path` is only used in errors.
pub fn read_routes<R: Read>(path: &Path, reader: R) -> Result<RouteTable, DataLoadError> {
    let malformed = |source: csv::Error| DataLoadError::Malformed {
        path: path.to_path_buf(),
        source,
    };

    let mut rdr = ReaderBuilder::new().has_headers(true).from_reader(reader);

    let headers = rdr.headers().map_err(malformed)?.clone();
    if headers.is_empty() || headers.iter().all(|h| h.trim().is_empty()) {
        return Err(DataLoadError::MissingHeader {
            path: path.to_path_buf(),
        });
    }
    let idx = ColumnIndex::resolve(path, &headers)?;

    let mut routes = Vec::new();
    for result in rdr.records() {
        let record = result.map_err(malformed)?;
        let line = record.position().map(|p| p.line()).unwrap_or_default();
        let get = |i: usize| record.get(i).unwrap_or_default();

        let raw_stars = get(idx.avg_stars).trim();
        let avg_stars = if raw_stars.is_empty() {
            None
        } else {
            let stars = raw_stars
                .parse::<f64>()
                .ok()
                .filter(|s| s.is_finite())
                .ok_or_else(|| DataLoadError::InvalidStars {
                    path: path.to_path_buf(),
                    line,
                    value: raw_stars.to_string(),
                })?;
            Some(stars)
        };

        routes.push(RouteRecord {
            line,
            location: get(idx.location).to_string(),
            route_type: get(idx.route_type).to_string(),
            rating: get(idx.rating).to_string(),
            avg_stars,
            columns: record,
        });
    }

    debug!(rows = routes.len(), "Parsed route rows");
    Ok(RouteTable { headers, routes })
}
