mod support;

use anyhow::Result;
use std::collections::BTreeMap;
use support::{
    BASE_URL, MemorySource, bulletin_url, employment_page, family_only_page, options,
};
use tempfile::tempdir;
use vblag::chart::ChartOutcome;
use vblag::config::ExtractConfig;
use vblag::model::{BulletinMonth, LagValue, MissingReason, RunReport};
use vblag::pipeline::{Assembler, IntegrityError, extract_lag_series, extract_page_lags, run_chart};

fn month(year: i32, month: u32) -> BulletinMonth {
    BulletinMonth::new(year, month).expect("valid month")
}

#[test]
fn two_pages_produce_aligned_series() {
    let extract = ExtractConfig {
        categories: vec!["1st".to_string()],
        ..ExtractConfig::default()
    };
    let mut report = RunReport::default();
    let mut assembler = Assembler::new(extract.categories.clone());

    let pages = [
        (month(2020, 1), employment_page("22DEC19", "C", "C")),
        (month(2020, 2), family_only_page()),
    ];
    for (month, html) in &pages {
        match extract_page_lags(html, *month, "INDIA", &extract, &mut report) {
            Ok(lags) => assembler.record(*month, &lags),
            Err(reason) => assembler.record_missing(*month, reason),
        }
    }

    let series = assembler.finalize().expect("series aligned");
    assert_eq!(series.month_axis, vec!["Jan 2020", "Feb 2020"]);
    assert_eq!(
        series.series["1st"],
        vec![
            LagValue::Days { days: 10 },
            LagValue::missing(MissingReason::NoTable)
        ]
    );
    assert_eq!(report.tables_located, 1);
}

#[test]
fn full_year_run_keeps_every_series_on_the_axis() -> Result<()> {
    let temp = tempdir()?;
    let opts = options(&temp.path().join("images"), &temp.path().join("cache"), 2020, 2021);

    let mut source = MemorySource::default()
        .with_page(
            &bulletin_url(2020, "january", 2020),
            &employment_page("22DEC19", "01JAN15", "U"),
        )
        .with_page(
            &format!("{BASE_URL}/2020/visa-bulletin-february-2020.html"),
            &family_only_page(),
        )
        .with_page(
            &bulletin_url(2020, "october", 2020),
            &employment_page("C", "01OCT19", "garbage"),
        );

    let (series, report) = extract_lag_series(&mut source, &opts)?;

    assert_eq!(series.month_axis.len(), 12);
    assert_eq!(series.series.len(), 3);
    for values in series.series.values() {
        assert_eq!(values.len(), series.month_axis.len());
    }

    let first = &series.series["1st"];
    assert_eq!(first[0], LagValue::Days { days: 10 });
    assert_eq!(first[1], LagValue::missing(MissingReason::NoTable));
    assert_eq!(first[2], LagValue::missing(MissingReason::FetchFailed));
    assert_eq!(first[9], LagValue::Current);

    assert_eq!(series.series["2nd"][0].days(), Some(1826));
    assert_eq!(series.series["2nd"][9].days(), Some(366));
    assert_eq!(
        series.series["3rd"][0],
        LagValue::missing(MissingReason::Unavailable)
    );
    assert_eq!(
        series.series["3rd"][9],
        LagValue::missing(MissingReason::Unparseable)
    );

    assert_eq!(series.month_axis[9], "Oct 2020");
    assert_eq!(report.months_attempted, 12);
    assert_eq!(report.pages_obtained, 3);
    assert_eq!(report.tables_located, 2);
    Ok(())
}

#[test]
fn first_candidate_url_wins() -> Result<()> {
    let temp = tempdir()?;
    let opts = options(&temp.path().join("images"), &temp.path().join("cache"), 2020, 2021);
    let january = bulletin_url(2020, "january", 2020);

    let mut source = MemorySource::default()
        .with_page(&january, &employment_page("C", "C", "C"))
        .with_page(
            &format!("{BASE_URL}/2020/visa-bulletin-january-2020.html"),
            &family_only_page(),
        );

    extract_lag_series(&mut source, &opts)?;

    let january_requests = source
        .requested
        .iter()
        .filter(|url| url.contains("january"))
        .collect::<Vec<_>>();
    assert_eq!(january_requests, vec![&january]);

    let february_requests = source
        .requested
        .iter()
        .filter(|url| url.contains("february"))
        .cloned()
        .collect::<Vec<_>>();
    assert_eq!(
        february_requests,
        vec![
            format!("{BASE_URL}/2020/visa-bulletin-for-february-2020.html"),
            format!("{BASE_URL}/2020/visa-bulletin-february-2020.html"),
            format!("{BASE_URL}/2021/visa-bulletin-for-february-2020.html"),
        ]
    );
    Ok(())
}

#[test]
fn fallback_column_is_used_when_target_absent() -> Result<()> {
    let temp = tempdir()?;
    let mut opts = options(&temp.path().join("images"), &temp.path().join("cache"), 2020, 2021);
    opts.target = "PHILIPPINES".to_string();

    let mut source = MemorySource::default().with_page(
        &bulletin_url(2020, "january", 2020),
        &employment_page("01JAN10", "01JAN10", "01JAN10"),
    );

    let (series, report) = extract_lag_series(&mut source, &opts)?;
    assert_eq!(series.series["1st"][0], LagValue::Current);
    assert_eq!(series.series["3rd"][0].days(), Some(365));
    assert_eq!(report.fallback_columns, 1);
    Ok(())
}

#[test]
fn empty_year_range_skips_rendering() -> Result<()> {
    let temp = tempdir()?;
    let images = temp.path().join("images");
    let opts = options(&images, &temp.path().join("cache"), 2020, 2020);

    let mut source = MemorySource::default();
    let run = run_chart(&mut source, &opts)?;

    assert!(run.series.month_axis.is_empty());
    assert!(run.series.series.is_empty());
    assert_eq!(run.outcome, ChartOutcome::Skipped);
    assert!(source.requested.is_empty());
    assert!(!images.exists());
    Ok(())
}

#[test]
fn chart_is_written_under_title_derived_name() -> Result<()> {
    let temp = tempdir()?;
    let images = temp.path().join("images");
    let opts = options(&images, &temp.path().join("cache"), 2020, 2021);

    let mut source = MemorySource::default().with_page(
        &bulletin_url(2020, "january", 2020),
        &employment_page("22DEC19", "01JAN15", "C"),
    );

    let run = run_chart(&mut source, &opts)?;

    let expected = images.join("lag_trends_for_india_column.svg");
    assert_eq!(run.outcome, ChartOutcome::Written(expected.clone()));
    let svg = std::fs::read_to_string(expected)?;
    assert!(svg.starts_with("<svg"));
    assert!(svg.contains("Lag Trends for &apos;INDIA&apos; Column"));
    assert!(svg.contains(">Jan 2020</text>"));
    assert!(svg.contains(">2nd</text>"));
    Ok(())
}

#[test]
fn start_year_must_be_after_1998() -> Result<()> {
    let temp = tempdir()?;
    let opts = options(&temp.path().join("images"), &temp.path().join("cache"), 1998, 2000);

    let mut source = MemorySource::default();
    assert!(extract_lag_series(&mut source, &opts).is_err());
    assert!(source.requested.is_empty());
    Ok(())
}

#[test]
fn finalize_pads_short_series() {
    let mut assembler = Assembler::new(vec!["1st".to_string()]);
    assembler.record(month(2020, 1), &BTreeMap::new());
    assembler.record_missing(month(2020, 2), MissingReason::FetchFailed);

    let series = assembler.finalize().expect("aligned");
    assert_eq!(series.month_axis.len(), 2);
    assert_eq!(
        series.series["1st"],
        vec![
            LagValue::missing(MissingReason::NoCategory),
            LagValue::missing(MissingReason::FetchFailed)
        ]
    );
}

#[test]
fn integrity_error_names_the_category() {
    let err = IntegrityError::LengthMismatch {
        category: "1st".to_string(),
        len: 3,
        axis_len: 2,
    };
    assert_eq!(
        err.to_string(),
        "series '1st' has 3 values but the month axis has 2"
    );
}
