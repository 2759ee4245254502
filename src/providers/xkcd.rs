use html_escape::{encode_double_quoted_attribute, encode_text};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use url::Url;

use super::Provider;
use crate::artifact::{EmbeddedDocument, MediaArtifact};
use crate::error::{MediaError, Result};
use crate::fetch::{Fetcher, Tier};

static COMIC_NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"xkcd\.com/([0-9]+)").unwrap());
static IMAGE_SUFFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\.(png|gif|jpe?g)$").unwrap());

#[derive(Debug, Deserialize)]
struct ComicInfo {
    #[serde(default)]
    title: String,
    img: String,
    #[serde(default)]
    alt: String,
}

pub struct Xkcd;

impl Provider for Xkcd {
    fn name(&self) -> &'static str {
        "xkcd"
    }

    fn resolve(&self, url: &Url, fetcher: &dyn Fetcher) -> Result<MediaArtifact> {
        if let Some(caps) = COMIC_NUMBER.captures(url.as_str()) {
            let api = format!("https://xkcd.com/{}/info.0.json", &caps[1]);
            let json = fetcher.fetch_json(&api, &[], Tier::Privileged)?;
            let info: ComicInfo = serde_json::from_value(json)
                .map_err(|_| MediaError::not_found("xkcd metadata", api.as_str()))?;
            let html = format!(
                "<div><h3>{}</h3><img src=\"{}\" title=\"{}\"><h5>{}</h5></div>",
                encode_text(&info.title),
                encode_double_quoted_attribute(&info.img),
                encode_double_quoted_attribute(&info.alt),
                encode_text(&info.alt),
            );
            return Ok(MediaArtifact::Document(EmbeddedDocument::embed(html)));
        }
        if IMAGE_SUFFIX.is_match(url.as_str()) {
            return Ok(MediaArtifact::single_image(url.as_str()));
        }
        Err(MediaError::not_found("xkcd metadata", url.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::testing::StubFetcher;

    #[test]
    fn builds_comic_block_from_metadata() {
        let fetcher = StubFetcher::new().with(
            "https://xkcd.com/927/info.0.json",
            r#"{"title":"Standards","img":"https://imgs.xkcd.com/comics/standards.png","alt":"Fortunately, the charging one has been solved <now>"}"#,
        );
        let url = Url::parse("https://xkcd.com/927/").unwrap();
        let MediaArtifact::Document(doc) = Xkcd.resolve(&url, &fetcher).unwrap() else {
            panic!("expected document");
        };
        assert!(doc.html.contains("<h3>Standards</h3>"));
        assert!(doc.html.contains("src=\"https://imgs.xkcd.com/comics/standards.png\""));
        assert!(doc.html.contains("&lt;now&gt;"));
    }

    #[test]
    fn image_links_resolve_directly() {
        let fetcher = StubFetcher::new();
        let url = Url::parse("https://imgs.xkcd.com/comics/standards.png").unwrap();
        assert_eq!(
            Xkcd.resolve(&url, &fetcher).unwrap(),
            MediaArtifact::single_image("https://imgs.xkcd.com/comics/standards.png")
        );
    }

    #[test]
    fn other_pages_fail() {
        let fetcher = StubFetcher::new();
        let url = Url::parse("https://xkcd.com/about").unwrap();
        assert!(Xkcd.resolve(&url, &fetcher).is_err());
    }
}
