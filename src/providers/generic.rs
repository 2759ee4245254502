use once_cell::sync::Lazy;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use regex::Regex;
use url::Url;

use super::Provider;
use crate::artifact::{EmbeddedDocument, MediaArtifact};
use crate::config::ExtractionConfig;
use crate::error::{MediaError, Result};
use crate::fetch::{Fetcher, Tier};

static DIRECT_MEDIA: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\.(jpe?g|gif|png|mp4)(\?.*)?$").unwrap());

const EMPTY_EXTRACTION: &str = "<body></body>";

/// Characters `encodeURIComponent` leaves alone.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Direct media by suffix, then the readability extraction service.
pub struct Generic {
    endpoint: String,
    api_key: String,
}

impl Generic {
    pub fn new(config: &ExtractionConfig) -> Self {
        Self {
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
        }
    }

    fn extract(&self, url: &str, fetcher: &dyn Fetcher) -> Result<MediaArtifact> {
        let request = format!("{}?url={}", self.endpoint, utf8_percent_encode(url, COMPONENT));
        let mut headers = Vec::new();
        if !self.api_key.is_empty() {
            headers.push(("x-api-key".to_string(), self.api_key.clone()));
        }
        let json = fetcher.fetch_json(&request, &headers, Tier::Privileged)?;
        match json.get("content").and_then(|value| value.as_str()) {
            Some(content) if !content.trim().is_empty() && content != EMPTY_EXTRACTION => {
                Ok(MediaArtifact::Document(EmbeddedDocument::article(format!(
                    "<div class=\"redditmod-media-other\">{content}</div>"
                ))))
            }
            _ => Err(MediaError::empty("extraction service", url)),
        }
    }
}

impl Provider for Generic {
    fn name(&self) -> &'static str {
        "generic"
    }

    fn resolve(&self, url: &Url, fetcher: &dyn Fetcher) -> Result<MediaArtifact> {
        let text = url.as_str();
        if let Some(caps) = DIRECT_MEDIA.captures(text) {
            if caps[1].eq_ignore_ascii_case("mp4") {
                return Ok(MediaArtifact::video(text));
            }
            return Ok(MediaArtifact::single_image(text));
        }
        self.extract(text, fetcher)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::testing::StubFetcher;

    fn generic(api_key: &str) -> Generic {
        Generic::new(&ExtractionConfig {
            endpoint: "https://extract.test/parser".into(),
            api_key: api_key.into(),
        })
    }

    #[test]
    fn direct_media_needs_no_fetch() {
        let fetcher = StubFetcher::new();
        let image = Url::parse("https://cdn.example.org/cat.JPG?width=640").unwrap();
        assert_eq!(
            generic("").resolve(&image, &fetcher).unwrap(),
            MediaArtifact::single_image("https://cdn.example.org/cat.JPG?width=640")
        );
        let video = Url::parse("https://cdn.example.org/clip.mp4").unwrap();
        assert_eq!(
            generic("").resolve(&video, &fetcher).unwrap(),
            MediaArtifact::video("https://cdn.example.org/clip.mp4")
        );
        assert_eq!(fetcher.call_count(), 0);
    }

    #[test]
    fn wraps_extracted_article() {
        let fetcher = StubFetcher::new().with(
            "https://extract.test/parser?url=https%3A%2F%2Fblog.example.org%2Fpost%3Fa%3D1",
            r#"{"content":"<p>Hello</p>"}"#,
        );
        let url = Url::parse("https://blog.example.org/post?a=1").unwrap();
        let artifact = generic("k3y").resolve(&url, &fetcher).unwrap();
        assert_eq!(
            artifact,
            MediaArtifact::Document(EmbeddedDocument::article(
                "<div class=\"redditmod-media-other\"><p>Hello</p></div>"
            ))
        );
        let calls = fetcher.calls.lock();
        assert!(calls[0].1.iter().any(|(k, v)| k == "x-api-key" && v == "k3y"));
        assert_eq!(calls[0].2, Tier::Privileged);
    }

    #[test]
    fn empty_extraction_is_failure_naming_source() {
        let fetcher = StubFetcher::new().with(
            "https://extract.test/parser?url=https%3A%2F%2Fblog.example.org%2F",
            r#"{"content":"<body></body>"}"#,
        );
        let url = Url::parse("https://blog.example.org/").unwrap();
        let err = generic("").resolve(&url, &fetcher).unwrap_err();
        assert_eq!(err, MediaError::empty("extraction service", "https://blog.example.org/"));
        assert!(err.to_string().contains("https://blog.example.org/"));
        assert!(fetcher.calls.lock()[0].1.iter().all(|(k, _)| k != "x-api-key"));
    }
}
