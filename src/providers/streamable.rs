use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

use super::Provider;
use crate::artifact::MediaArtifact;
use crate::error::{MediaError, Result};
use crate::fetch::{Fetcher, Tier};

static VIDEO_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"streamable\.com/([a-zA-Z0-9]+)").unwrap());

pub struct Streamable;

impl Provider for Streamable {
    fn name(&self) -> &'static str {
        "streamable"
    }

    fn resolve(&self, url: &Url, fetcher: &dyn Fetcher) -> Result<MediaArtifact> {
        let id = VIDEO_ID
            .captures(url.as_str())
            .map(|caps| caps[1].to_string())
            .ok_or_else(|| MediaError::not_found("streamable video id", url.as_str()))?;
        let api = format!("https://api.streamable.com/videos/{id}");
        let json = fetcher.fetch_json(&api, &[], Tier::Privileged)?;
        let src = json
            .pointer("/files/mp4/url")
            .and_then(|value| value.as_str())
            .filter(|src| !src.is_empty())
            .ok_or_else(|| MediaError::not_found("streamable mp4 file", api.as_str()))?;
        let src = if src.starts_with("//") {
            format!("https:{src}")
        } else {
            src.to_string()
        };
        Ok(MediaArtifact::video(src))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::testing::StubFetcher;

    #[test]
    fn builds_video_from_api_response() {
        let fetcher = StubFetcher::new().with(
            "https://api.streamable.com/videos/abc123",
            r#"{"files":{"mp4":{"url":"https://cdn/v.mp4"}}}"#,
        );
        let url = Url::parse("https://streamable.com/abc123").unwrap();
        let artifact = Streamable.resolve(&url, &fetcher).unwrap();
        assert_eq!(artifact, MediaArtifact::video("https://cdn/v.mp4"));
    }

    #[test]
    fn protocol_relative_file_gets_https() {
        let fetcher = StubFetcher::new().with(
            "https://api.streamable.com/videos/x9",
            r#"{"files":{"mp4":{"url":"//cdn-b.streamable.com/x9.mp4"}}}"#,
        );
        let url = Url::parse("https://streamable.com/x9").unwrap();
        let artifact = Streamable.resolve(&url, &fetcher).unwrap();
        assert_eq!(artifact, MediaArtifact::video("https://cdn-b.streamable.com/x9.mp4"));
    }

    #[test]
    fn missing_id_fails_without_fetching() {
        let fetcher = StubFetcher::new();
        let url = Url::parse("https://streamable.com/").unwrap();
        let err = Streamable.resolve(&url, &fetcher).unwrap_err();
        assert!(matches!(err, MediaError::NotFound { .. }));
        assert_eq!(fetcher.call_count(), 0);
    }

    #[test]
    fn missing_file_field_fails() {
        let fetcher = StubFetcher::new().with(
            "https://api.streamable.com/videos/abc",
            r#"{"status":1,"files":{}}"#,
        );
        let url = Url::parse("https://streamable.com/abc").unwrap();
        assert!(Streamable.resolve(&url, &fetcher).is_err());
    }
}
