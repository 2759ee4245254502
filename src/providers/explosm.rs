use url::Url;

use super::{absolutize, first_attr, Provider};
use crate::artifact::MediaArtifact;
use crate::error::{MediaError, Result};
use crate::fetch::{Fetcher, Tier};

pub struct Explosm;

impl Provider for Explosm {
    fn name(&self) -> &'static str {
        "explosm"
    }

    fn resolve(&self, url: &Url, fetcher: &dyn Fetcher) -> Result<MediaArtifact> {
        let doc = fetcher.fetch_document(url.as_str(), &[], Tier::Privileged)?;
        first_attr(&doc, "img#main-comic", "src")
            .map(|src| MediaArtifact::single_image(absolutize(url, &src)))
            .ok_or_else(|| MediaError::not_found("explosm comic", url.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::testing::StubFetcher;

    #[test]
    fn reads_main_comic() {
        let fetcher = StubFetcher::new().with(
            "https://explosm.net/comics/4000/",
            r#"<img id="main-comic" src="//files.explosm.net/comics/x.png">"#,
        );
        let url = Url::parse("https://explosm.net/comics/4000/").unwrap();
        assert_eq!(
            Explosm.resolve(&url, &fetcher).unwrap(),
            MediaArtifact::single_image("https://files.explosm.net/comics/x.png")
        );
    }
}
