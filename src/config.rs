use crate::chart::{MIN_CHART_HEIGHT, MIN_CHART_WIDTH};
use crate::lag::UnavailablePolicy;
use crate::table::{DEFAULT_FALLBACK_COLUMN, DEFAULT_TABLE_IDENTIFIER};
use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use url::Url;

#[derive(Debug, Clone, Deserialize, Default)]
pub struct RunConfig {
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub extract: ExtractConfig,
    #[serde(default)]
    pub chart: ChartConfig,
}

impl RunConfig {
    pub fn validate(&self) -> Result<()> {
        Url::parse(&self.fetch.base_url)
            .with_context(|| format!("fetch.base_url is not a valid url: {}", self.fetch.base_url))?;

        if self.fetch.url_templates.is_empty() {
            bail!("fetch.url_templates must not be empty");
        }
        for template in &self.fetch.url_templates {
            if !template.contains("{{month}}") {
                bail!("url template must contain {{{{month}}}}: {template}");
            }
        }

        if self.extract.table_identifier.trim().is_empty() {
            bail!("extract.table_identifier must not be empty");
        }
        if self.extract.fallback_column.trim().is_empty() {
            bail!("extract.fallback_column must not be empty");
        }
        if self.extract.categories.is_empty() {
            bail!("extract.categories must not be empty");
        }

        if f64::from(self.chart.width) < MIN_CHART_WIDTH
            || f64::from(self.chart.height) < MIN_CHART_HEIGHT
        {
            bail!(
                "chart dimensions too small: {}x{} (minimum {MIN_CHART_WIDTH}x{MIN_CHART_HEIGHT})",
                self.chart.width,
                self.chart.height
            );
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct FetchConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,
    #[serde(default = "default_url_templates")]
    pub url_templates: Vec<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub user_agent: Option<String>,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            cache_dir: default_cache_dir(),
            url_templates: default_url_templates(),
            timeout_secs: default_timeout_secs(),
            user_agent: None,
            headers: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExtractConfig {
    #[serde(default = "default_table_identifier")]
    pub table_identifier: String,
    #[serde(default = "default_fallback_column")]
    pub fallback_column: String,
    #[serde(default = "default_categories")]
    pub categories: Vec<String>,
    #[serde(default)]
    pub unavailable: UnavailablePolicy,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            table_identifier: default_table_identifier(),
            fallback_column: default_fallback_column(),
            categories: default_categories(),
            unavailable: UnavailablePolicy::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChartConfig {
    #[serde(default = "default_out_dir")]
    pub out_dir: PathBuf,
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            out_dir: default_out_dir(),
            file_name: None,
            width: default_width(),
            height: default_height(),
        }
    }
}

pub fn load_config(path: Option<&Path>) -> Result<RunConfig> {
    let config = match path {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            toml::from_str::<RunConfig>(&text)
                .with_context(|| format!("failed to parse toml in {}", path.display()))?
        }
        None => RunConfig::default(),
    };

    config.validate().with_context(|| match path {
        Some(path) => format!("invalid config {}", path.display()),
        None => "invalid default config".to_string(),
    })?;
    Ok(config)
}

fn default_base_url() -> String {
    "https://travel.state.gov/content/travel/en/legal/visa-law0/visa-bulletin".to_string()
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from("cache")
}

fn default_url_templates() -> Vec<String> {
    vec![
        "{{base_url}}/{{fiscal_year}}/visa-bulletin-for-{{month}}-{{year}}.html".to_string(),
        "{{base_url}}/{{fiscal_year}}/visa-bulletin-{{month}}-{{year}}.html".to_string(),
        "{{base_url}}/{{alternate_fiscal_year}}/visa-bulletin-for-{{month}}-{{year}}.html"
            .to_string(),
    ]
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_table_identifier() -> String {
    DEFAULT_TABLE_IDENTIFIER.to_string()
}

fn default_fallback_column() -> String {
    DEFAULT_FALLBACK_COLUMN.to_string()
}

fn default_categories() -> Vec<String> {
    vec!["1st".to_string(), "2nd".to_string(), "3rd".to_string()]
}

fn default_out_dir() -> PathBuf {
    PathBuf::from("images")
}

fn default_width() -> u32 {
    1400
}

fn default_height() -> u32 {
    800
}
