//! End-to-end runs of the crag pipeline.

use serde::Serialize;
use std::path::PathBuf;
use tracing::info;

use crate::analyzers::aggregate::{group_by_crag, routes_by_crag};
use crate::analyzers::rank::rank_crags;
use crate::analyzers::types::{CragBreakdown, RankingTable};
use crate::classify::filter_routes;
use crate::config::RunConfig;
use crate::error::Result;
use crate::loader::{RouteTable, load_routes};
use crate::output::{write_breakdown, write_rankings};

/// What a ranking run read and wrote.
#[derive(Debug, Clone, Serialize)]
pub struct ReportSummary {
    pub area: String,
    pub input: PathBuf,
    pub routes_loaded: usize,
    pub routes_kept: usize,
    pub crags: usize,
    pub diverse_crags: usize,
    pub all_crags_path: PathBuf,
    pub diverse_crags_path: PathBuf,
}

/// The in-memory result of ranking a route table.
#[derive(Debug, Clone)]
pub struct CragReport {
    pub routes_kept: usize,
    pub breakdown: Vec<CragBreakdown>,
    pub all: RankingTable,
    pub diverse: RankingTable,
}

/// Filters, aggregates and ranks an already loaded table.
pub fn build_report(table: &RouteTable, config: &RunConfig) -> CragReport {
    let routes = filter_routes(table, &config.policy);
    let crags = group_by_crag(&routes);
    let breakdown = routes_by_crag(&routes, &config.priorities);
    let all = rank_crags(&crags, &breakdown, &config.priorities);
    let diverse = all.diverse();

    CragReport {
        routes_kept: routes.len(),
        breakdown,
        all,
        diverse,
    }
}

/// Loads the area's export, ranks its crags, and writes the full and
/// diversity-filtered rankings.
///
/// # Errors
///
/// Fails on a [`DataLoadError`](crate::DataLoadError) before anything is
/// written, or on an [`ExportError`](crate::ExportError) while writing; in
/// the latter case existing outputs are left as they were.
#[tracing::instrument(skip_all, fields(area = %config.area))]
pub fn run(config: &RunConfig) -> Result<ReportSummary> {
    let input = config.input_path();
    let table = load_routes(&input)?;
    let report = build_report(&table, config);

    let all_crags_path = config.all_crags_path();
    let diverse_crags_path = config.diverse_crags_path();
    write_rankings(
        &all_crags_path,
        &report.all,
        &diverse_crags_path,
        &report.diverse,
    )?;

    let summary = ReportSummary {
        area: config.area.clone(),
        input,
        routes_loaded: table.len(),
        routes_kept: report.routes_kept,
        crags: report.all.len(),
        diverse_crags: report.diverse.len(),
        all_crags_path,
        diverse_crags_path,
    };
    info!(
        routes_loaded = summary.routes_loaded,
        routes_kept = summary.routes_kept,
        crags = summary.crags,
        diverse_crags = summary.diverse_crags,
        "Report complete"
    );
    Ok(summary)
}

/// Loads the area's export and writes the crag×bucket breakdown table.
/// Returns the path written and the number of rows.
#[tracing::instrument(skip_all, fields(area = %config.area))]
pub fn run_breakdown(config: &RunConfig, output: Option<PathBuf>) -> Result<(PathBuf, usize)> {
    let table = load_routes(&config.input_path())?;
    let routes = filter_routes(&table, &config.policy);
    let breakdown = routes_by_crag(&routes, &config.priorities);

    let path = output.unwrap_or_else(|| config.breakdown_path());
    write_breakdown(&path, &breakdown)?;
    Ok((path, breakdown.len()))
}
