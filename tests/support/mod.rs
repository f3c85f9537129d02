#![allow(dead_code)]

use anyhow::Result;
use std::collections::HashMap;
use std::path::Path;
use vblag::config::RunConfig;
use vblag::fetch::PageSource;
use vblag::pipeline::ExtractOptions;

pub const BASE_URL: &str = "https://bulletins.example.test/visa-bulletin";

/// Serves pages from memory and remembers every URL it was asked for.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    pub pages: HashMap<String, String>,
    pub requested: Vec<String>,
}

impl MemorySource {
    pub fn with_page(mut self, url: &str, body: &str) -> Self {
        self.pages.insert(url.to_string(), body.to_string());
        self
    }
}

impl PageSource for MemorySource {
    fn fetch(&mut self, url: &str) -> Result<Option<String>> {
        self.requested.push(url.to_string());
        Ok(self.pages.get(url).cloned())
    }

    fn network_fetches(&self) -> usize {
        self.requested.len()
    }
}

pub fn bulletin_url(fiscal_year: i32, month: &str, year: i32) -> String {
    format!("{BASE_URL}/{fiscal_year}/visa-bulletin-for-{month}-{year}.html")
}

/// An employment-based table with one INDIA cut-off per category.
pub fn employment_page(first: &str, second: &str, third: &str) -> String {
    format!(
        r#"<html><body>
        <table>
          <tr><td>Employment-based</td><td>All Chargeability Areas Except Those Listed</td><td>CHINA-mainland born</td><td>INDIA</td></tr>
          <tr><td>1st</td><td>C</td><td>01JAN18</td><td>{first}</td></tr>
          <tr><td>2nd</td><td>C</td><td>01JAN16</td><td>{second}</td></tr>
          <tr><td>3rd</td><td>01JAN19</td><td>01JAN16</td><td>{third}</td></tr>
        </table>
        </body></html>"#
    )
}

pub fn family_only_page() -> String {
    r#"<html><body>
    <table>
      <tr><td>Family-Sponsored</td><td>INDIA</td></tr>
      <tr><td>F1</td><td>01JAN12</td></tr>
    </table>
    </body></html>"#
        .to_string()
}

pub fn options(out_dir: &Path, cache_dir: &Path, start_year: i32, end_year: i32) -> ExtractOptions {
    let mut config = RunConfig::default();
    config.fetch.base_url = BASE_URL.to_string();
    config.fetch.cache_dir = cache_dir.to_path_buf();
    config.chart.out_dir = out_dir.to_path_buf();

    ExtractOptions {
        config,
        target: "INDIA".to_string(),
        start_year,
        end_year,
    }
}
