use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

use super::{absolutize, first_attr, Provider};
use crate::artifact::MediaArtifact;
use crate::error::{MediaError, Result};
use crate::fetch::{Fetcher, Tier};

static SHORT_CODE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)gfycat\.com/(?:.*/)?([a-z0-9]+)").unwrap());

const VIDEO_SELECTORS: [&str; 2] = ["#mp4Source", ".video.media source[type=\"video/mp4\"]"];

pub struct Gfycat;

impl Provider for Gfycat {
    fn name(&self) -> &'static str {
        "gfycat"
    }

    fn resolve(&self, url: &Url, fetcher: &dyn Fetcher) -> Result<MediaArtifact> {
        let page = match SHORT_CODE.captures(url.as_str()) {
            Some(caps) => format!("https://gfycat.com/{}", &caps[1]),
            None => url.to_string(),
        };
        let doc = fetcher.fetch_document(&page, &[], Tier::Privileged)?;
        let base = Url::parse(&page).unwrap_or_else(|_| url.clone());

        VIDEO_SELECTORS
            .iter()
            .find_map(|selector| first_attr(&doc, selector, "src"))
            .map(|src| MediaArtifact::video(absolutize(&base, &src)))
            .ok_or_else(|| MediaError::not_found("gfycat video", page))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::testing::StubFetcher;

    fn resolve(url: &str, fetcher: &StubFetcher) -> Result<MediaArtifact> {
        Gfycat.resolve(&Url::parse(url).unwrap(), fetcher)
    }

    #[test]
    fn normalizes_short_code_and_reads_primary_source() {
        let fetcher = StubFetcher::new().with(
            "https://gfycat.com/HappyDog",
            r#"<video><source id="mp4Source" src="https://giant.gfycat.com/HappyDog.mp4"></video>"#,
        );
        let artifact = resolve("https://gfycat.com/gifs/detail/HappyDog", &fetcher).unwrap();
        assert_eq!(artifact, MediaArtifact::video("https://giant.gfycat.com/HappyDog.mp4"));
        assert_eq!(fetcher.urls(), ["https://gfycat.com/HappyDog"]);
    }

    #[test]
    fn falls_back_to_second_selector() {
        let fetcher = StubFetcher::new().with(
            "https://gfycat.com/Cat",
            r#"<div class="video media"><source type="video/mp4" src="//thumbs.gfycat.com/Cat.mp4"></div>"#,
        );
        let artifact = resolve("https://gfycat.com/Cat", &fetcher).unwrap();
        assert_eq!(artifact, MediaArtifact::video("https://thumbs.gfycat.com/Cat.mp4"));
    }

    #[test]
    fn missing_source_is_not_found() {
        let fetcher = StubFetcher::new().with(
            "https://gfycat.com/Cat",
            r#"<video><source id="mp4Source" src=""></video>"#,
        );
        let err = resolve("https://gfycat.com/Cat", &fetcher).unwrap_err();
        assert!(matches!(err, MediaError::NotFound { .. }));
        assert!(err.to_string().contains("https://gfycat.com/Cat"));
    }
}
