use anyhow::Result;
use std::fs;
use tempfile::tempdir;
use vblag::config::{RunConfig, load_config};
use vblag::fetch::candidate_urls;
use vblag::lag::UnavailablePolicy;
use vblag::model::BulletinMonth;

const BASE: &str = "https://travel.state.gov/content/travel/en/legal/visa-law0/visa-bulletin";

#[test]
fn defaults_are_valid() -> Result<()> {
    let config = load_config(None)?;

    assert_eq!(config.fetch.base_url, BASE);
    assert_eq!(config.fetch.url_templates.len(), 3);
    assert_eq!(config.extract.table_identifier, "Employment-based");
    assert_eq!(config.extract.categories, vec!["1st", "2nd", "3rd"]);
    assert_eq!(config.extract.unavailable, UnavailablePolicy::Missing);
    assert_eq!(config.chart.out_dir, std::path::PathBuf::from("images"));
    Ok(())
}

#[test]
fn partial_toml_keeps_remaining_defaults() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("vblag.toml");
    fs::write(
        &path,
        r#"
[fetch]
cache_dir = "/tmp/vblag-cache"

[extract]
categories = ["1st"]
unavailable = "zero"

[chart]
file_name = "visa-bulletin-india.svg"
"#,
    )?;

    let config = load_config(Some(path.as_path()))?;
    assert_eq!(config.fetch.base_url, BASE);
    assert_eq!(config.extract.categories, vec!["1st"]);
    assert_eq!(config.extract.unavailable, UnavailablePolicy::Zero);
    assert_eq!(
        config.chart.file_name.as_deref(),
        Some("visa-bulletin-india.svg")
    );
    Ok(())
}

#[test]
fn templates_without_month_are_rejected() {
    let mut config = RunConfig::default();
    config.fetch.url_templates = vec!["{{base_url}}/{{year}}.html".to_string()];
    assert!(config.validate().is_err());

    let mut config = RunConfig::default();
    config.fetch.base_url = "not a url".to_string();
    assert!(config.validate().is_err());
}

#[test]
fn chart_must_leave_room_for_the_plot() {
    let mut config = RunConfig::default();
    config.chart.width = 250;
    assert!(config.validate().is_err());

    config.chart.width = 410;
    config.chart.height = 270;
    assert!(config.validate().is_ok());

    config.chart.height = 200;
    assert!(config.validate().is_err());
}

#[test]
fn candidate_urls_follow_fiscal_year_rules() {
    let config = RunConfig::default();

    let october = BulletinMonth::new(2019, 10).expect("valid month");
    assert_eq!(
        candidate_urls(&config.fetch, october),
        vec![
            format!("{BASE}/2020/visa-bulletin-for-october-2019.html"),
            format!("{BASE}/2020/visa-bulletin-october-2019.html"),
            format!("{BASE}/2019/visa-bulletin-for-october-2019.html"),
        ]
    );

    let january = BulletinMonth::new(2020, 1).expect("valid month");
    assert_eq!(
        candidate_urls(&config.fetch, january),
        vec![
            format!("{BASE}/2020/visa-bulletin-for-january-2020.html"),
            format!("{BASE}/2020/visa-bulletin-january-2020.html"),
            format!("{BASE}/2021/visa-bulletin-for-january-2020.html"),
        ]
    );
}

#[test]
fn trailing_slash_on_base_url_is_ignored() {
    let mut config = RunConfig::default();
    config.fetch.base_url = "https://example.test/vb/".to_string();

    let march = BulletinMonth::new(2005, 3).expect("valid month");
    assert_eq!(
        candidate_urls(&config.fetch, march)[0],
        "https://example.test/vb/2005/visa-bulletin-for-march-2005.html"
    );
}

#[test]
fn month_grid_is_chronological() {
    let grid = BulletinMonth::grid(2002, 2004);
    assert_eq!(grid.len(), 24);
    assert_eq!(grid[0].label(), "Jan 2002");
    assert_eq!(grid[23].label(), "Dec 2003");
    assert!(grid.windows(2).all(|w| w[0] < w[1]));

    assert!(BulletinMonth::grid(2025, 2025).is_empty());
    assert!(BulletinMonth::new(2020, 13).is_none());
}
