use url::Url;

use super::{absolutize, first_attr, Provider, IMAGE_SUFFIX};
use crate::artifact::MediaArtifact;
use crate::error::{MediaError, Result};
use crate::fetch::{Fetcher, Tier};

pub struct Imgflip;

impl Provider for Imgflip {
    fn name(&self) -> &'static str {
        "imgflip"
    }

    fn resolve(&self, url: &Url, fetcher: &dyn Fetcher) -> Result<MediaArtifact> {
        if IMAGE_SUFFIX.is_match(url.as_str()) {
            return Ok(MediaArtifact::single_image(url.as_str()));
        }
        let doc = fetcher.fetch_document(url.as_str(), &[], Tier::Privileged)?;
        first_attr(&doc, "img#im", "src")
            .map(|src| MediaArtifact::single_image(absolutize(url, &src)))
            .ok_or_else(|| MediaError::not_found("imgflip image", url.as_str()))
    }
}
