//! Domain-keyed dispatch from a target URL to the resolver that knows the
//! host's quirks, with a generic fallback for everything else.

use std::collections::HashMap;
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use url::Url;

use crate::artifact::MediaArtifact;
use crate::config::ExtractionConfig;
use crate::error::{MediaError, Result};
use crate::fetch::{registrable_domain, Fetcher};

mod deviantart;
mod explosm;
mod generic;
mod gfycat;
mod imgflip;
mod imgur;
mod instagram;
mod reddit;
mod soundcloud;
mod streamable;
mod xkcd;

pub use deviantart::DeviantArt;
pub use explosm::Explosm;
pub use generic::Generic;
pub use gfycat::Gfycat;
pub use imgflip::Imgflip;
pub use imgur::Imgur;
pub use instagram::Instagram;
pub use reddit::RedditComments;
pub use soundcloud::Soundcloud;
pub use streamable::Streamable;
pub use xkcd::Xkcd;

pub(crate) static IMAGE_SUFFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\.(jpe?g|png)$").unwrap());

pub trait Provider: Send + Sync {
    fn name(&self) -> &'static str;
    fn resolve(&self, url: &Url, fetcher: &dyn Fetcher) -> Result<MediaArtifact>;
}

pub struct Registry {
    providers: HashMap<&'static str, Arc<dyn Provider>>,
    fallback: Arc<dyn Provider>,
    fetcher: Arc<dyn Fetcher>,
}

impl Registry {
    pub fn new(fetcher: Arc<dyn Fetcher>, extraction: &ExtractionConfig) -> Self {
        let mut registry = Self::empty(fetcher, Arc::new(Generic::new(extraction)));
        registry.register("imgur.com", Arc::new(Imgur));
        registry.register("gfycat.com", Arc::new(Gfycat));
        registry.register("imgflip.com", Arc::new(Imgflip));
        registry.register("streamable.com", Arc::new(Streamable));
        registry.register("instagram.com", Arc::new(Instagram));
        registry.register("deviantart.com", Arc::new(DeviantArt));
        registry.register("reddit.com", Arc::new(RedditComments));
        registry.register("xkcd.com", Arc::new(Xkcd));
        registry.register("explosm.net", Arc::new(Explosm));
        registry.register("soundcloud.com", Arc::new(Soundcloud));
        registry
    }

    pub fn empty(fetcher: Arc<dyn Fetcher>, fallback: Arc<dyn Provider>) -> Self {
        Self {
            providers: HashMap::new(),
            fallback,
            fetcher,
        }
    }

    pub fn register(&mut self, domain: &'static str, provider: Arc<dyn Provider>) {
        self.providers.insert(domain, provider);
    }

    pub fn fetcher(&self) -> &Arc<dyn Fetcher> {
        &self.fetcher
    }

    pub fn provider_for(&self, url: &Url) -> &dyn Provider {
        let domain = url.host_str().map(registrable_domain).unwrap_or_default();
        match self.providers.get(domain.as_str()) {
            Some(provider) => provider.as_ref(),
            None => self.fallback.as_ref(),
        }
    }

    pub fn try_resolve(&self, url: &str) -> Result<MediaArtifact> {
        let parsed = Url::parse(url).map_err(|err| MediaError::unsupported(url, err.to_string()))?;
        let provider = self.provider_for(&parsed);
        tracing::debug!(url, provider = provider.name(), "dispatching");
        provider.resolve(&parsed, self.fetcher.as_ref())
    }

    /// Never fails outwardly: every error becomes a failure artifact.
    pub fn resolve(&self, url: &str) -> MediaArtifact {
        match self.try_resolve(url) {
            Ok(artifact) => artifact,
            Err(err) => {
                tracing::info!(url, error = %err, "resolution failed");
                MediaArtifact::failure(err)
            }
        }
    }
}

pub(crate) fn first_attr(doc: &Html, selector: &str, attr: &str) -> Option<String> {
    let selector = match Selector::parse(selector) {
        Ok(s) => s,
        Err(_) => return None,
    };
    doc.select(&selector)
        .filter_map(|el| el.value().attr(attr))
        .map(str::trim)
        .find(|value| !value.is_empty())
        .map(str::to_string)
}

pub(crate) fn meta_property(doc: &Html, property: &str) -> Option<String> {
    first_attr(doc, &format!("meta[property=\"{property}\"]"), "content")
}

/// Resolves relative and protocol-relative references against `base`.
pub(crate) fn absolutize(base: &Url, src: &str) -> String {
    base.join(src)
        .map(|url| url.to_string())
        .unwrap_or_else(|_| src.to_string())
}
