use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

use super::Provider;
use crate::artifact::MediaArtifact;
use crate::comments::resolve_comments;
use crate::error::{MediaError, Result};
use crate::fetch::Fetcher;

static COMMENTS_THREAD: Lazy<Regex> = Lazy::new(|| Regex::new(r"reddit\.com.*/comments/").unwrap());

/// Same-site links only resolve when they point at a comment thread.
pub struct RedditComments;

impl Provider for RedditComments {
    fn name(&self) -> &'static str {
        "reddit"
    }

    fn resolve(&self, url: &Url, fetcher: &dyn Fetcher) -> Result<MediaArtifact> {
        if !COMMENTS_THREAD.is_match(url.as_str()) {
            return Err(MediaError::unsupported(
                url.as_str(),
                "unable to load non-comments reddit page",
            ));
        }
        resolve_comments(fetcher, url.as_str())
    }
}
