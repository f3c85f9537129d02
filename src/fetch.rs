use crate::config::FetchConfig;
use crate::model::BulletinMonth;
use crate::store::PageCache;
use anyhow::{Context, Result};
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, USER_AGENT};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Anything that can hand back the body of a bulletin page by URL.
/// `Ok(None)` means the page does not exist at that URL.
pub trait PageSource {
    fn fetch(&mut self, url: &str) -> Result<Option<String>>;

    fn network_fetches(&self) -> usize {
        0
    }

    fn cache_hits(&self) -> usize {
        0
    }
}

#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub url: String,
    pub body: String,
}

pub struct HttpSource {
    client: Client,
}

impl HttpSource {
    pub fn from_config(fetch: &FetchConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        for (k, v) in &fetch.headers {
            let name = HeaderName::from_bytes(k.as_bytes())
                .with_context(|| format!("invalid header name {k}"))?;
            let value =
                HeaderValue::from_str(v).with_context(|| format!("invalid header value for {k}"))?;
            headers.insert(name, value);
        }

        if let Some(user_agent) = &fetch.user_agent {
            headers.insert(USER_AGENT, HeaderValue::from_str(user_agent)?);
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(fetch.timeout_secs))
            .default_headers(headers)
            .build()
            .context("failed to build reqwest client")?;

        Ok(Self { client })
    }
}

impl PageSource for HttpSource {
    fn fetch(&mut self, url: &str) -> Result<Option<String>> {
        info!(%url, "fetching page");
        let resp = self
            .client
            .get(url)
            .send()
            .with_context(|| format!("request to {url} failed"))?;

        let status = resp.status();
        if !status.is_success() {
            warn!(%url, %status, "request returned non-success status");
            return Ok(None);
        }

        let body = resp
            .text()
            .with_context(|| format!("failed to read body from {url}"))?;
        Ok(Some(body))
    }
}

/// Serves pages from the disk cache and only falls through to `inner` on a
/// miss. Successful responses are written back and pages `inner` reports as
/// absent get a marker, so a warm cache answers both without the network.
pub struct CachedSource<S> {
    cache: PageCache,
    inner: S,
    network_fetches: usize,
    cache_hits: usize,
}

impl<S: PageSource> CachedSource<S> {
    pub fn new(cache: PageCache, inner: S) -> Self {
        Self {
            cache,
            inner,
            network_fetches: 0,
            cache_hits: 0,
        }
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: PageSource> PageSource for CachedSource<S> {
    fn fetch(&mut self, url: &str) -> Result<Option<String>> {
        match self.cache.read(url) {
            Ok(Some(body)) => {
                debug!(%url, "loaded cached page");
                self.cache_hits += 1;
                return Ok(Some(body));
            }
            Ok(None) if self.cache.is_known_absent(url) => {
                debug!(%url, "page known to be absent");
                self.cache_hits += 1;
                return Ok(None);
            }
            Ok(None) => {}
            Err(err) => warn!(%url, error = %err, "cache read failed; refetching"),
        }

        self.network_fetches += 1;
        let Some(body) = self.inner.fetch(url)? else {
            match self.cache.mark_absent(url) {
                Ok(path) => debug!(%url, file = %path.display(), "absent page recorded"),
                Err(err) => warn!(%url, error = %err, "failed to record absent page"),
            }
            return Ok(None);
        };

        match self.cache.write(url, &body) {
            Ok(path) => debug!(%url, file = %path.display(), "page cached"),
            Err(err) => warn!(%url, error = %err, "failed to cache page"),
        }

        Ok(Some(body))
    }

    fn network_fetches(&self) -> usize {
        self.network_fetches
    }

    fn cache_hits(&self) -> usize {
        self.cache_hits
    }
}

pub fn candidate_urls(fetch: &FetchConfig, month: BulletinMonth) -> Vec<String> {
    let base_url = fetch.base_url.trim_end_matches('/');
    fetch
        .url_templates
        .iter()
        .map(|template| {
            template
                .replace("{{base_url}}", base_url)
                .replace("{{fiscal_year}}", &month.fiscal_year().to_string())
                .replace(
                    "{{alternate_fiscal_year}}",
                    &month.alternate_fiscal_year().to_string(),
                )
                .replace("{{month}}", month.month_slug())
                .replace("{{year}}", &month.year.to_string())
        })
        .collect()
}

pub fn fetch_bulletin<S: PageSource + ?Sized>(
    source: &mut S,
    fetch: &FetchConfig,
    month: BulletinMonth,
) -> Option<FetchedPage> {
    for url in candidate_urls(fetch, month) {
        match source.fetch(&url) {
            Ok(Some(body)) => return Some(FetchedPage { url, body }),
            Ok(None) => debug!(%url, "candidate url unavailable"),
            Err(err) => warn!(%url, error = %format!("{err:#}"), "candidate url failed"),
        }
    }

    None
}
