use anyhow::{Context, Result, anyhow};
use once_cell::sync::OnceCell;
use reqwest::blocking::Client;
use reqwest::header::USER_AGENT;

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/47.0.2526.106 Safari/537.36";

static CLIENT: OnceCell<Client> = OnceCell::new();

/// Shared blocking client. No request timeout is set; the transport default applies.
pub fn http_client() -> Result<&'static Client> {
    CLIENT.get_or_try_init(|| {
        Client::builder()
            .build()
            .context("failed to build http client")
    })
}

/// Source of raw season pages.
pub trait PageFetcher {
    fn fetch_page(&self, url: &str) -> Result<String>;
}

pub struct HttpFetcher {
    client: &'static Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self> {
        Ok(Self {
            client: http_client()?,
        })
    }
}

impl PageFetcher for HttpFetcher {
    fn fetch_page(&self, url: &str) -> Result<String> {
        let resp = self
            .client
            .get(url)
            .header(USER_AGENT, BROWSER_USER_AGENT)
            .send()
            .with_context(|| format!("request failed: {url}"))?;
        let status = resp.status();
        let body = resp.text().context("failed reading body")?;
        if !status.is_success() {
            return Err(anyhow!("http {} for {}", status, url));
        }
        Ok(body)
    }
}
