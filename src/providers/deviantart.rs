use url::Url;

use super::{absolutize, first_attr, meta_property, Provider};
use crate::artifact::MediaArtifact;
use crate::error::{MediaError, Result};
use crate::fetch::{Fetcher, Tier};

pub struct DeviantArt;

impl Provider for DeviantArt {
    fn name(&self) -> &'static str {
        "deviantart"
    }

    fn resolve(&self, url: &Url, fetcher: &dyn Fetcher) -> Result<MediaArtifact> {
        let doc = fetcher.fetch_document(url.as_str(), &[], Tier::Privileged)?;
        first_attr(&doc, "img[dev-content-full]", "src")
            .or_else(|| meta_property(&doc, "og:image"))
            .map(|src| MediaArtifact::single_image(absolutize(url, &src)))
            .ok_or_else(|| MediaError::not_found("deviantart image", url.as_str()))
    }
}
