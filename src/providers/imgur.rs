use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use url::Url;

use super::Provider;
use crate::artifact::{ImageSequence, MediaArtifact};
use crate::error::{MediaError, Result};
use crate::fetch::{Fetcher, Tier};

static ALBUM_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)imgur\.com/(?:gallery|a|r/[^/]+)/(\w+)").unwrap());
static VIDEO_SUFFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"\.(gifv?|mp4)$").unwrap());
static GIF_SUFFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"\.gifv?$").unwrap());
static SUBDOMAIN: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^/]*\.imgur\.com").unwrap());
static EXTRA_SEGMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"/\w+/").unwrap());
static SIZE_SUFFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"_[a-z]\.").unwrap());
static IMAGE_EXT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\.(gif|jpg|jpeg|png)$").unwrap());

#[derive(Debug, Deserialize)]
struct AlbumImage {
    hash: String,
    #[serde(default)]
    ext: String,
}

pub struct Imgur;

impl Provider for Imgur {
    fn name(&self) -> &'static str {
        "imgur"
    }

    fn resolve(&self, url: &Url, fetcher: &dyn Fetcher) -> Result<MediaArtifact> {
        let text = url.as_str();
        if let Some(caps) = ALBUM_ID.captures(text) {
            return resolve_album(&caps[1], fetcher);
        }
        if VIDEO_SUFFIX.is_match(text) {
            return Ok(MediaArtifact::video(GIF_SUFFIX.replace(text, ".mp4")));
        }
        Ok(MediaArtifact::single_image(guess_direct_image(text)))
    }
}

fn resolve_album(album_id: &str, fetcher: &dyn Fetcher) -> Result<MediaArtifact> {
    let api = format!("https://imgur.com/ajaxalbums/getimages/{album_id}/hit.json");
    let json = fetcher.fetch_json(&api, &[], Tier::Privileged)?;
    let images: Vec<AlbumImage> = match json.pointer("/data/images") {
        Some(value) if value.as_array().is_some_and(|entries| !entries.is_empty()) => {
            serde_json::from_value(value.clone()).map_err(|_| MediaError::Parse {
                url: api.clone(),
                body: value.to_string(),
            })?
        }
        _ => Vec::new(),
    };

    let urls = images
        .iter()
        .map(|image| format!("https://i.imgur.com/{}{}", image.hash, image.ext))
        .collect();
    match ImageSequence::new(urls) {
        Some(sequence) => {
            tracing::debug!(album_id, images = sequence.len(), "imgur album");
            Ok(MediaArtifact::Images(sequence))
        }
        None => {
            tracing::debug!(album_id, "imgur album listing empty, assuming single image");
            Ok(MediaArtifact::single_image(format!(
                "https://i.imgur.com/{album_id}.jpg"
            )))
        }
    }
}

/// Rewrites a page or thumbnail URL into a direct `.jpg` link.
fn guess_direct_image(text: &str) -> String {
    let text = SUBDOMAIN.replace(text, "i.imgur.com");
    let text = EXTRA_SEGMENT.replace(&text, "/");
    let text = SIZE_SUFFIX.replace(&text, ".");
    let text = IMAGE_EXT.replace(&text, "");
    format!("{text}.jpg")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::testing::StubFetcher;

    fn resolve(url: &str, fetcher: &StubFetcher) -> MediaArtifact {
        Imgur.resolve(&Url::parse(url).unwrap(), fetcher).unwrap()
    }

    #[test]
    fn album_listing_builds_sequence_in_order() {
        let fetcher = StubFetcher::new().with(
            "https://imgur.com/ajaxalbums/getimages/AbCd12/hit.json",
            r#"{"data":{"images":[{"hash":"x1","ext":".jpg"},{"hash":"x2","ext":".png"}]}}"#,
        );
        let artifact = resolve("https://imgur.com/a/AbCd12", &fetcher);
        let MediaArtifact::Images(images) = artifact else {
            panic!("expected images");
        };
        assert_eq!(
            images.urls(),
            ["https://i.imgur.com/x1.jpg", "https://i.imgur.com/x2.png"]
        );
        assert_eq!(images.index(), 0);
        assert_eq!(fetcher.calls.lock()[0].2, Tier::Privileged);
    }

    #[test]
    fn empty_album_falls_back_to_single_image() {
        let fetcher = StubFetcher::new().with(
            "https://imgur.com/ajaxalbums/getimages/Zz9/hit.json",
            r#"{"data":{"images":[]}}"#,
        );
        let artifact = resolve("https://imgur.com/gallery/Zz9", &fetcher);
        assert_eq!(artifact, MediaArtifact::single_image("https://i.imgur.com/Zz9.jpg"));

        let fetcher = StubFetcher::new().with(
            "https://imgur.com/ajaxalbums/getimages/Zz9/hit.json",
            r#"{"data":[],"success":true}"#,
        );
        let artifact = resolve("https://imgur.com/r/pics/Zz9", &fetcher);
        assert_eq!(artifact, MediaArtifact::single_image("https://i.imgur.com/Zz9.jpg"));
    }

    #[test]
    fn malformed_album_entry_is_a_parse_error() {
        let api = "https://imgur.com/ajaxalbums/getimages/Bad1/hit.json";
        let fetcher = StubFetcher::new().with(
            api,
            r#"{"data":{"images":[{"hash":"ok","ext":".jpg"},{"ext":".png"}]}}"#,
        );
        let err = Imgur
            .resolve(&Url::parse("https://imgur.com/a/Bad1").unwrap(), &fetcher)
            .unwrap_err();
        match err {
            MediaError::Parse { url, body } => {
                assert_eq!(url, api);
                assert!(body.contains("\"ext\":\".png\""));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn gifv_becomes_mp4_video() {
        let fetcher = StubFetcher::new();
        let artifact = resolve("https://i.imgur.com/abc.gifv", &fetcher);
        assert_eq!(artifact, MediaArtifact::video("https://i.imgur.com/abc.mp4"));
        assert_eq!(fetcher.call_count(), 0);
    }

    #[test]
    fn single_item_urls_are_rewritten() {
        let fetcher = StubFetcher::new();
        assert_eq!(
            resolve("https://i.imgur.com/abc_l.png", &fetcher),
            MediaArtifact::single_image("https://i.imgur.com/abc.jpg")
        );
        assert_eq!(
            resolve("https://m.imgur.com/t/abc", &fetcher),
            MediaArtifact::single_image("https://i.imgur.com/abc.jpg")
        );
        assert_eq!(fetcher.call_count(), 0);
    }

    #[test]
    fn album_fetch_failure_propagates() {
        let fetcher = StubFetcher::new().failing(
            "https://imgur.com/ajaxalbums/getimages/Q1/hit.json",
            "timeout",
        );
        let err = Imgur
            .resolve(&Url::parse("https://imgur.com/a/Q1").unwrap(), &fetcher)
            .unwrap_err();
        assert!(err.to_string().contains("timeout"));
    }
}
