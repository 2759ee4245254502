use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::{Captures, NoExpand, Regex};
use scraper::{Html, Selector};
use serde::Serialize;

use crate::artifact::{DocumentKind, EmbeddedDocument, MediaArtifact};
use crate::error::{MediaError, Result};
use crate::fetch::{Fetcher, Tier};
use crate::tweaks::{Tweak, Tweaks};

static COMMENT_AREA: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".commentarea .sitetable > *:not(.clearleft)").unwrap());
static THING: Lazy<Selector> = Lazy::new(|| Selector::parse(".thing").unwrap());
static TAG_WITH_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"<[a-zA-Z][^>]*\sid="([^"]+)"[^>]*>"#).unwrap());
static CLASS_ATTR: Lazy<Regex> = Lazy::new(|| Regex::new(r#"\sclass="([^"]*)""#).unwrap());

/// Result of a double click on a comment node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DoubleClick {
    /// Event intercepted; the node is now collapsed (`true`) or expanded.
    Toggled(bool),
    PassThrough,
}

/// Collapse state of every bound comment node, keyed by node identifier.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CommentThread {
    nodes: BTreeMap<String, bool>,
}

impl CommentThread {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds the collapse toggle to a node. Binding the same node again keeps
    /// its current state.
    pub fn bind(&mut self, id: impl Into<String>, collapsed: bool) {
        self.nodes.entry(id.into()).or_insert(collapsed);
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn is_bound(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn is_collapsed(&self, id: &str) -> bool {
        self.nodes.get(id).copied().unwrap_or(false)
    }

    /// Presentation class for a node, mirroring the site's own toggle.
    pub fn class_for(&self, id: &str) -> &'static str {
        if self.is_collapsed(id) {
            "collapsed"
        } else {
            "noncollapsed"
        }
    }

    pub fn on_double_click(&mut self, id: &str, tweaks: &Tweaks) -> DoubleClick {
        if !tweaks.is_enabled(Tweak::CollapsableComments) {
            return DoubleClick::PassThrough;
        }
        match self.nodes.get_mut(id) {
            Some(collapsed) => {
                *collapsed = !*collapsed;
                DoubleClick::Toggled(*collapsed)
            }
            None => DoubleClick::PassThrough,
        }
    }

    /// Rewrites the collapse class of every bound node in `html` from the
    /// current state. Unbound elements are left untouched.
    pub fn project(&self, html: &str) -> String {
        TAG_WITH_ID
            .replace_all(html, |caps: &Captures<'_>| {
                let tag = &caps[0];
                let id = &caps[1];
                if !self.is_bound(id) {
                    return tag.to_string();
                }
                let state = self.class_for(id);
                match CLASS_ATTR.captures(tag) {
                    Some(class) => {
                        let classes: Vec<&str> = class[1]
                            .split_whitespace()
                            .filter(|c| *c != "collapsed" && *c != "noncollapsed")
                            .chain(std::iter::once(state))
                            .collect();
                        let attr = format!(" class=\"{}\"", classes.join(" "));
                        CLASS_ATTR.replace(tag, NoExpand(&attr)).into_owned()
                    }
                    None => tag.replacen(" id=", &format!(" class=\"{state}\" id="), 1),
                }
            })
            .into_owned()
    }

    /// Binds every `.thing` under `root_html`, reading the initial state from
    /// its class list.
    pub fn bind_markup(&mut self, root_html: &str) {
        let fragment = Html::parse_fragment(root_html);
        for thing in fragment.select(&THING) {
            if let Some(id) = thing.value().id() {
                let collapsed = thing.value().classes().any(|c| c == "collapsed");
                self.bind(id, collapsed);
            }
        }
    }
}

/// Fetches a same-site thread and returns its comment listing subtree.
pub fn resolve_comments(fetcher: &dyn Fetcher, url: &str) -> Result<MediaArtifact> {
    let doc = fetcher.fetch_document(url, &[], Tier::Page)?;
    let area = doc
        .select(&COMMENT_AREA)
        .next()
        .ok_or_else(|| MediaError::not_found("comment area", url))?;

    let area_html = area.html();
    let mut thread = CommentThread::new();
    thread.bind_markup(&area_html);
    tracing::debug!(url, nodes = thread.len(), "loaded comment thread");

    Ok(MediaArtifact::Document(EmbeddedDocument {
        html: format!("<div class=\"redditmod-media-comments-area\">{area_html}</div>"),
        kind: DocumentKind::Comments(thread),
    }))
}
