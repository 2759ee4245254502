use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

use super::{meta_property, Provider};
use crate::artifact::MediaArtifact;
use crate::error::{MediaError, Result};
use crate::fetch::{Fetcher, Tier};

static POST_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"instagram\.com/p/([a-zA-Z0-9_\-]+)").unwrap());

pub struct Instagram;

impl Provider for Instagram {
    fn name(&self) -> &'static str {
        "instagram"
    }

    fn resolve(&self, url: &Url, fetcher: &dyn Fetcher) -> Result<MediaArtifact> {
        let id = POST_ID
            .captures(url.as_str())
            .map(|caps| caps[1].to_string())
            .ok_or_else(|| MediaError::not_found("instagram post id", url.as_str()))?;
        let page = format!("https://instagram.com/p/{id}/");
        let doc = fetcher.fetch_document(&page, &[], Tier::Privileged)?;

        if let Some(video) = meta_property(&doc, "og:video") {
            return Ok(MediaArtifact::video(video));
        }
        meta_property(&doc, "og:image")
            .map(MediaArtifact::single_image)
            .ok_or_else(|| MediaError::not_found("instagram media", page))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::testing::StubFetcher;

    const PAGE: &str = "https://instagram.com/p/BxY_1-z/";

    fn resolve(fetcher: &StubFetcher) -> Result<MediaArtifact> {
        let url = Url::parse("https://www.instagram.com/p/BxY_1-z/?taken-by=someone").unwrap();
        Instagram.resolve(&url, fetcher)
    }

    #[test]
    fn prefers_open_graph_video() {
        let fetcher = StubFetcher::new().with(
            PAGE,
            r#"<head><meta property="og:image" content="https://cdn/i.jpg"><meta property="og:video" content="https://cdn/v.mp4"></head>"#,
        );
        assert_eq!(resolve(&fetcher).unwrap(), MediaArtifact::video("https://cdn/v.mp4"));
    }

    #[test]
    fn uses_open_graph_image_otherwise() {
        let fetcher = StubFetcher::new().with(
            PAGE,
            r#"<head><meta property="og:image" content="https://cdn/i.jpg"></head>"#,
        );
        assert_eq!(
            resolve(&fetcher).unwrap(),
            MediaArtifact::single_image("https://cdn/i.jpg")
        );
    }

    #[test]
    fn fails_without_meta() {
        let fetcher = StubFetcher::new().with(PAGE, "<head></head>");
        let err = resolve(&fetcher).unwrap_err();
        assert!(err.to_string().contains(PAGE));
    }

    #[test]
    fn non_post_url_fails_without_fetching() {
        let fetcher = StubFetcher::new();
        let url = Url::parse("https://instagram.com/someone").unwrap();
        assert!(Instagram.resolve(&url, &fetcher).is_err());
        assert_eq!(fetcher.call_count(), 0);
    }
}
