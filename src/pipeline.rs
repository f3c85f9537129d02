use crate::chart::{ChartOutcome, chart_title, render_lag_chart};
use crate::config::{ExtractConfig, RunConfig};
use crate::fetch::{CachedSource, HttpSource, PageSource, fetch_bulletin};
use crate::lag::compute_lags;
use crate::model::{BulletinMonth, LagSeries, LagValue, MissingReason, RunReport};
use crate::store::PageCache;
use crate::table::{ExtractError, locate_table_in_html, resolve_column};
use anyhow::{Result, bail};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

pub const MIN_START_YEAR: i32 = 1999;

#[derive(Debug, Clone)]
pub struct ExtractOptions {
    pub config: RunConfig,
    pub target: String,
    pub start_year: i32,
    pub end_year: i32,
}

impl ExtractOptions {
    pub fn validate(&self) -> Result<()> {
        if self.start_year < MIN_START_YEAR {
            bail!(
                "start year must be greater than {}, got {}",
                MIN_START_YEAR - 1,
                self.start_year
            );
        }
        if self.target.trim().is_empty() {
            bail!("country/category target must not be empty");
        }
        self.config.validate()
    }

    pub fn months(&self) -> Vec<BulletinMonth> {
        BulletinMonth::grid(self.start_year, self.end_year)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IntegrityError {
    #[error("series '{category}' has {len} values but the month axis has {axis_len}")]
    LengthMismatch {
        category: String,
        len: usize,
        axis_len: usize,
    },
}

#[derive(Debug, Clone)]
pub struct Assembler {
    categories: Vec<String>,
    month_axis: Vec<String>,
    series: BTreeMap<String, Vec<LagValue>>,
}

impl Assembler {
    pub fn new(categories: Vec<String>) -> Self {
        Self {
            categories,
            month_axis: Vec::new(),
            series: BTreeMap::new(),
        }
    }

    pub fn record(&mut self, month: BulletinMonth, lags: &BTreeMap<String, LagValue>) {
        self.month_axis.push(month.label());
        for category in &self.categories {
            let value = lags
                .get(category)
                .copied()
                .unwrap_or(LagValue::missing(MissingReason::NoCategory));
            self.series.entry(category.clone()).or_default().push(value);
        }
    }

    pub fn record_missing(&mut self, month: BulletinMonth, reason: MissingReason) {
        self.month_axis.push(month.label());
        for category in &self.categories {
            self.series
                .entry(category.clone())
                .or_default()
                .push(LagValue::missing(reason));
        }
    }

    pub fn finalize(mut self) -> Result<LagSeries, IntegrityError> {
        let axis_len = self.month_axis.len();
        for values in self.series.values_mut() {
            if values.len() < axis_len {
                values.resize(axis_len, LagValue::missing(MissingReason::NoCategory));
            }
        }

        if let Some((category, values)) = self.series.iter().find(|(_, v)| v.len() != axis_len) {
            return Err(IntegrityError::LengthMismatch {
                category: category.clone(),
                len: values.len(),
                axis_len,
            });
        }

        Ok(LagSeries {
            month_axis: self.month_axis,
            series: self.series,
        })
    }
}

pub fn extract_page_lags(
    html: &str,
    month: BulletinMonth,
    target: &str,
    extract: &ExtractConfig,
    report: &mut RunReport,
) -> Result<BTreeMap<String, LagValue>, MissingReason> {
    let Some(base_date) = month.base_date() else {
        return Err(MissingReason::NoTable);
    };

    let table = locate_table_in_html(html, &extract.table_identifier).map_err(|err| {
        warn!(month = %month.label(), error = %err, "table extraction failed");
        MissingReason::NoTable
    })?;
    report.tables_located += 1;

    let column = resolve_column(&table, target, &extract.fallback_column).map_err(
        |err: ExtractError| {
            warn!(month = %month.label(), error = %err, "column resolution failed");
            MissingReason::NoColumn
        },
    )?;
    report.columns_resolved += 1;
    if column.via_fallback {
        report.fallback_columns += 1;
        debug!(month = %month.label(), column = %column.name, "using fallback column");
    }

    Ok(compute_lags(&table, &column, base_date, extract.unavailable))
}

pub fn extract_lag_series<S: PageSource>(
    source: &mut S,
    options: &ExtractOptions,
) -> Result<(LagSeries, RunReport)> {
    options.validate()?;

    let extract = &options.config.extract;
    let mut assembler = Assembler::new(extract.categories.clone());
    let mut report = RunReport::default();

    for month in options.months() {
        report.months_attempted += 1;

        let Some(page) = fetch_bulletin(source, &options.config.fetch, month) else {
            warn!(month = %month.label(), "no candidate url produced a page; skipping");
            assembler.record_missing(month, MissingReason::FetchFailed);
            continue;
        };
        report.pages_obtained += 1;
        debug!(month = %month.label(), url = %page.url, "page obtained");

        match extract_page_lags(&page.body, month, &options.target, extract, &mut report) {
            Ok(lags) => assembler.record(month, &lags),
            Err(reason) => assembler.record_missing(month, reason),
        }
    }

    let series = assembler.finalize()?;
    for values in series.series.values() {
        for value in values {
            if value.is_missing() {
                report.values_missing += 1;
            } else {
                report.values_computed += 1;
            }
        }
    }
    report.network_fetches = source.network_fetches();
    report.cache_hits = source.cache_hits();

    info!(
        months = report.months_attempted,
        pages = report.pages_obtained,
        tables = report.tables_located,
        computed = report.values_computed,
        missing = report.values_missing,
        network = report.network_fetches,
        cached = report.cache_hits,
        "extraction complete"
    );

    Ok((series, report))
}

pub fn default_source(config: &RunConfig) -> Result<CachedSource<HttpSource>> {
    let http = HttpSource::from_config(&config.fetch)?;
    Ok(CachedSource::new(
        PageCache::new(config.fetch.cache_dir.clone()),
        http,
    ))
}

#[derive(Debug)]
pub struct ChartRun {
    pub series: LagSeries,
    pub report: RunReport,
    pub outcome: ChartOutcome,
}

pub fn run_chart<S: PageSource>(source: &mut S, options: &ExtractOptions) -> Result<ChartRun> {
    let (series, report) = extract_lag_series(source, options)?;
    let title = chart_title(&options.target);
    let outcome = render_lag_chart(&series, &title, &options.config.chart)?;

    match &outcome {
        ChartOutcome::Written(path) => info!(file = %path.display(), "chart written"),
        ChartOutcome::Skipped => info!("no months extracted; chart skipped"),
    }

    Ok(ChartRun {
        series,
        report,
        outcome,
    })
}
