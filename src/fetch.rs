use std::time::Duration;

use reqwest::blocking::Client as HttpClient;
use reqwest::header::{ACCEPT, USER_AGENT};
use scraper::Html;
use serde_json::Value;
use url::Url;

use crate::config::FetchConfig;
use crate::error::{MediaError, Result};

/// Which request path a fetch goes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    /// Same-origin requests against the hosting site (comments, pagination).
    Page,
    /// Cross-origin requests to media provider APIs.
    Privileged,
}

pub type Headers = Vec<(String, String)>;

/// One attempt per call; the caller decides what a failure means.
pub trait Fetcher: Send + Sync {
    fn fetch_text(&self, url: &str, headers: &[(String, String)], tier: Tier) -> Result<String>;

    fn fetch_json(&self, url: &str, headers: &[(String, String)], tier: Tier) -> Result<Value> {
        let mut headers = headers.to_vec();
        if !headers
            .iter()
            .any(|(name, _)| name.eq_ignore_ascii_case("accept"))
        {
            headers.push(("Accept".into(), "application/json".into()));
        }
        let body = self.fetch_text(url, &headers, tier)?;
        serde_json::from_str(&body).map_err(|_| {
            tracing::debug!(url, "response is not valid JSON");
            MediaError::Parse {
                url: url.to_string(),
                body,
            }
        })
    }

    fn fetch_document(
        &self,
        url: &str,
        headers: &[(String, String)],
        tier: Tier,
    ) -> Result<Html> {
        let body = self.fetch_text(url, headers, tier)?;
        Ok(Html::parse_document(&body))
    }
}

/// Reduces a host to its last two labels (`i.imgur.com` -> `imgur.com`).
pub fn registrable_domain(host: &str) -> String {
    let host = host.trim_end_matches('.').to_ascii_lowercase();
    let labels: Vec<&str> = host.split('.').filter(|l| !l.is_empty()).collect();
    if labels.len() <= 2 {
        return labels.join(".");
    }
    labels[labels.len() - 2..].join(".")
}

pub struct HttpFetcher {
    http: HttpClient,
    user_agent: String,
    page_domain: String,
}

impl HttpFetcher {
    pub fn new(config: &FetchConfig) -> anyhow::Result<Self> {
        let page_origin = Url::parse(&config.page_origin)?;
        let page_domain = page_origin
            .host_str()
            .map(registrable_domain)
            .unwrap_or_default();
        let timeout = if config.timeout.is_zero() {
            Duration::from_secs(20)
        } else {
            config.timeout
        };
        let http = HttpClient::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            user_agent: config.user_agent.clone(),
            page_domain,
        })
    }

    fn check_tier(&self, url: &Url, tier: Tier) -> Result<()> {
        if tier == Tier::Privileged {
            return Ok(());
        }
        let domain = url.host_str().map(registrable_domain).unwrap_or_default();
        if domain != self.page_domain {
            return Err(MediaError::fetch(
                url.as_str(),
                format!("cross-origin request blocked (page origin is {})", self.page_domain),
            ));
        }
        Ok(())
    }
}

impl Fetcher for HttpFetcher {
    fn fetch_text(&self, url: &str, headers: &[(String, String)], tier: Tier) -> Result<String> {
        let parsed = Url::parse(url).map_err(|err| MediaError::fetch(url, err))?;
        self.check_tier(&parsed, tier)?;
        tracing::debug!(url, ?tier, "fetching");

        let mut req = self.http.get(parsed).header(USER_AGENT, &self.user_agent);
        for (name, value) in headers {
            req = req.header(name.as_str(), value.as_str());
        }
        if tier == Tier::Page && !headers.iter().any(|(n, _)| n.eq_ignore_ascii_case("accept")) {
            req = req.header(ACCEPT, "text/html,application/xhtml+xml");
        }

        let resp = req.send().map_err(|err| {
            tracing::warn!(url, error = %err, "fetch failed");
            MediaError::fetch(url, err)
        })?;
        let status = resp.status();
        if !status.is_success() {
            tracing::warn!(url, %status, "fetch returned error status");
            return Err(MediaError::fetch(url, format!("status {status}")));
        }
        let body = resp.text().map_err(|err| MediaError::fetch(url, err))?;
        tracing::debug!(url, bytes = body.len(), "fetched");
        Ok(body)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::HashMap;

    use parking_lot::Mutex;

    use super::*;

    /// Canned responses keyed by exact URL; records every request.
    #[derive(Default)]
    pub struct StubFetcher {
        responses: Mutex<HashMap<String, std::result::Result<String, String>>>,
        pub calls: Mutex<Vec<(String, Headers, Tier)>>,
    }

    impl StubFetcher {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with(self, url: &str, body: &str) -> Self {
            self.responses
                .lock()
                .insert(url.to_string(), Ok(body.to_string()));
            self
        }

        pub fn failing(self, url: &str, reason: &str) -> Self {
            self.responses
                .lock()
                .insert(url.to_string(), Err(reason.to_string()));
            self
        }

        pub fn call_count(&self) -> usize {
            self.calls.lock().len()
        }

        pub fn urls(&self) -> Vec<String> {
            self.calls.lock().iter().map(|(u, _, _)| u.clone()).collect()
        }
    }

    impl Fetcher for StubFetcher {
        fn fetch_text(&self, url: &str, headers: &[(String, String)], tier: Tier) -> Result<String> {
            self.calls
                .lock()
                .push((url.to_string(), headers.to_vec(), tier));
            match self.responses.lock().get(url) {
                Some(Ok(body)) => Ok(body.clone()),
                Some(Err(reason)) => Err(MediaError::fetch(url, reason)),
                None => Err(MediaError::fetch(url, "no canned response")),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::StubFetcher;
    use super::*;

    #[test]
    fn registrable_domain_keeps_last_two_labels() {
        assert_eq!(registrable_domain("i.imgur.com"), "imgur.com");
        assert_eq!(registrable_domain("www.old.reddit.com"), "reddit.com");
        assert_eq!(registrable_domain("xkcd.com"), "xkcd.com");
        assert_eq!(registrable_domain("Gfycat.COM."), "gfycat.com");
        assert_eq!(registrable_domain("localhost"), "localhost");
    }

    #[test]
    fn fetch_json_adds_accept_header_and_reports_parse_errors() {
        let fetcher = StubFetcher::new()
            .with("https://api.test/ok", "{\"a\":1}")
            .with("https://api.test/bad", "<html>");
        let value = fetcher
            .fetch_json("https://api.test/ok", &[], Tier::Privileged)
            .unwrap();
        assert_eq!(value["a"], 1);
        let calls = fetcher.calls.lock();
        assert!(calls[0]
            .1
            .iter()
            .any(|(k, v)| k == "Accept" && v == "application/json"));
        drop(calls);

        let err = fetcher
            .fetch_json("https://api.test/bad", &[], Tier::Privileged)
            .unwrap_err();
        assert_eq!(
            err,
            MediaError::Parse {
                url: "https://api.test/bad".into(),
                body: "<html>".into()
            }
        );
    }

    #[test]
    fn page_tier_refuses_foreign_domains() {
        let fetcher = HttpFetcher::new(&FetchConfig::default()).unwrap();
        let err = fetcher
            .fetch_text("https://imgur.com/a/x", &[], Tier::Page)
            .unwrap_err();
        match err {
            MediaError::Fetch { reason, .. } => assert!(reason.contains("cross-origin")),
            other => panic!("unexpected error {other:?}"),
        }
    }
}
