use crate::fetch::PageSource;
use crate::model::LagSeries;
use crate::pipeline::{ExtractOptions, extract_lag_series};
use anyhow::Result;
use serde::Serialize;
use sha2::{Digest, Sha256};

#[derive(Debug, Clone, Serialize)]
pub struct HarnessReport {
    pub months: usize,
    pub first_run_network_fetches: usize,
    pub first_run_cache_hits: usize,
    pub second_run_network_fetches: usize,
    pub second_run_cache_hits: usize,
    pub first_run_digest: String,
    pub second_run_digest: String,
    pub identical: bool,
}

/// Runs the extraction twice over the same source. With a cache-backed
/// source the second run must be served entirely from disk and produce the
/// same series.
pub fn run_harness<S, F>(mut make_source: F, options: &ExtractOptions) -> Result<HarnessReport>
where
    S: PageSource,
    F: FnMut() -> Result<S>,
{
    let mut first_source = make_source()?;
    let (first, first_report) = extract_lag_series(&mut first_source, options)?;

    let mut second_source = make_source()?;
    let (second, second_report) = extract_lag_series(&mut second_source, options)?;

    let first_run_digest = series_digest(&first)?;
    let second_run_digest = series_digest(&second)?;

    Ok(HarnessReport {
        months: first.month_axis.len(),
        first_run_network_fetches: first_report.network_fetches,
        first_run_cache_hits: first_report.cache_hits,
        second_run_network_fetches: second_report.network_fetches,
        second_run_cache_hits: second_report.cache_hits,
        identical: first == second && first_run_digest == second_run_digest,
        first_run_digest,
        second_run_digest,
    })
}

pub fn series_digest(series: &LagSeries) -> Result<String> {
    let json = serde_json::to_vec(series)?;
    Ok(hex::encode(Sha256::digest(json)))
}
