use html_escape::encode_double_quoted_attribute;
use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

use super::Provider;
use crate::artifact::{EmbeddedDocument, MediaArtifact};
use crate::error::{MediaError, Result};
use crate::fetch::{Fetcher, Tier};

static EMBED_URL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"meta itemprop="embedUrl" content="([^"]*)""#).unwrap());
static TWITTER_PLAYER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"meta property="twitter:player" content="([^"]*)""#).unwrap());

pub struct Soundcloud;

impl Provider for Soundcloud {
    fn name(&self) -> &'static str {
        "soundcloud"
    }

    fn resolve(&self, url: &Url, fetcher: &dyn Fetcher) -> Result<MediaArtifact> {
        let body = fetcher.fetch_text(url.as_str(), &[], Tier::Privileged)?;
        let player = EMBED_URL
            .captures(&body)
            .or_else(|| TWITTER_PLAYER.captures(&body))
            .map(|caps| caps[1].to_string())
            .filter(|player| !player.is_empty())
            .ok_or_else(|| MediaError::not_found("soundcloud player", url.as_str()))?;
        let html = format!(
            "<iframe style=\"width:100%; height:50vh\" src=\"{}\"></iframe>",
            encode_double_quoted_attribute(&player)
        );
        Ok(MediaArtifact::Document(EmbeddedDocument::embed(html)))
    }
}
