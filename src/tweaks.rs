use std::sync::Arc;

use anyhow::{Context, Result};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::storage::KeyValueStore;

pub const TWEAKS_KEY: &str = "redditmod-tweaks";

pub const COLLAPSABLE_COMMENTS_CSS: &str = ".comment.collapsed {padding-bottom: 20px;padding-top: 8px;} .comment.collapsed .tagline, .comment.collapsed .tagline a, .comment.collapsed .search-result-meta, .comment.collapsed .search-result-meta a, .comment.collapsed > span {font-style: normal !important;} .tagline > a.expamd {display: none !important}";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tweak {
    InfiniteScrolling,
    LoadPostsInline,
    AutoAlign,
    CollapsableComments,
    UsernamePrivacy,
    KarmaPrivacy,
}

impl Tweak {
    pub const ALL: [Tweak; 6] = [
        Tweak::InfiniteScrolling,
        Tweak::LoadPostsInline,
        Tweak::AutoAlign,
        Tweak::CollapsableComments,
        Tweak::UsernamePrivacy,
        Tweak::KarmaPrivacy,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            Tweak::InfiniteScrolling => "infiniteScrolling",
            Tweak::LoadPostsInline => "loadPostsInline",
            Tweak::AutoAlign => "autoAlign",
            Tweak::CollapsableComments => "collapsableComments",
            Tweak::UsernamePrivacy => "usernamePrivacy",
            Tweak::KarmaPrivacy => "karmaPrivacy",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Tweak::InfiniteScrolling => "Infinite Scrolling",
            Tweak::LoadPostsInline => "Load Pages Inline",
            Tweak::AutoAlign => "Auto-align on expand",
            Tweak::CollapsableComments => "Collapsable comments",
            Tweak::UsernamePrivacy => "Username Privacy",
            Tweak::KarmaPrivacy => "Karma Privacy",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Tweak::InfiniteScrolling => "Load next page when you reach the bottom",
            Tweak::LoadPostsInline => "Add the next page of posts to the bottom of the current page (ignored when 'Infinite Scrolling' is enabled).",
            Tweak::AutoAlign => "Scroll so the clicked post is at the top of the screen.",
            Tweak::CollapsableComments => "Double click on a comment to collapse its tree",
            Tweak::UsernamePrivacy => "Hide username",
            Tweak::KarmaPrivacy => "Hide karma",
        }
    }

    pub fn from_id(id: &str) -> Option<Tweak> {
        Tweak::ALL.iter().copied().find(|tweak| tweak.id() == id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TweakSet {
    #[serde(default = "enabled")]
    pub auto_align: bool,
    #[serde(default = "enabled")]
    pub infinite_scrolling: bool,
    #[serde(default = "enabled")]
    pub load_posts_inline: bool,
    #[serde(default = "enabled")]
    pub collapsable_comments: bool,
    #[serde(default = "enabled")]
    pub username_privacy: bool,
    #[serde(default = "enabled")]
    pub karma_privacy: bool,
}

fn enabled() -> bool {
    true
}

impl Default for TweakSet {
    fn default() -> Self {
        Self {
            auto_align: true,
            infinite_scrolling: true,
            load_posts_inline: true,
            collapsable_comments: true,
            username_privacy: true,
            karma_privacy: true,
        }
    }
}

impl TweakSet {
    pub fn get(&self, tweak: Tweak) -> bool {
        match tweak {
            Tweak::InfiniteScrolling => self.infinite_scrolling,
            Tweak::LoadPostsInline => self.load_posts_inline,
            Tweak::AutoAlign => self.auto_align,
            Tweak::CollapsableComments => self.collapsable_comments,
            Tweak::UsernamePrivacy => self.username_privacy,
            Tweak::KarmaPrivacy => self.karma_privacy,
        }
    }

    fn set(&mut self, tweak: Tweak, value: bool) {
        let slot = match tweak {
            Tweak::InfiniteScrolling => &mut self.infinite_scrolling,
            Tweak::LoadPostsInline => &mut self.load_posts_inline,
            Tweak::AutoAlign => &mut self.auto_align,
            Tweak::CollapsableComments => &mut self.collapsable_comments,
            Tweak::UsernamePrivacy => &mut self.username_privacy,
            Tweak::KarmaPrivacy => &mut self.karma_privacy,
        };
        *slot = value;
    }
}

/// Menu-facing view of a single tweak.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TweakEntry {
    pub tweak: Tweak,
    pub enabled: bool,
}

/// Shared tweak configuration handed to every component at construction.
///
/// Reads go against the last loaded snapshot; writes update the snapshot and
/// persist the tweak key before returning.
#[derive(Clone)]
pub struct Tweaks {
    snapshot: Arc<RwLock<TweakSet>>,
    store: Arc<dyn KeyValueStore>,
}

impl std::fmt::Debug for Tweaks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tweaks")
            .field("snapshot", &*self.snapshot.read())
            .finish()
    }
}

impl Tweaks {
    pub fn load(store: Arc<dyn KeyValueStore>) -> Result<Self> {
        let snapshot = match store.get(TWEAKS_KEY).context("tweaks: read store")? {
            Some(raw) => serde_json::from_str(&raw).context("tweaks: decode stored value")?,
            None => TweakSet::default(),
        };
        Ok(Self {
            snapshot: Arc::new(RwLock::new(snapshot)),
            store,
        })
    }

    pub fn is_enabled(&self, tweak: Tweak) -> bool {
        self.snapshot.read().get(tweak)
    }

    pub fn snapshot(&self) -> TweakSet {
        *self.snapshot.read()
    }

    /// The snapshot only changes once the store has accepted the new value.
    pub fn set(&self, tweak: Tweak, enabled: bool) -> Result<()> {
        let mut snapshot = self.snapshot.write();
        let mut next = *snapshot;
        next.set(tweak, enabled);
        let encoded = serde_json::to_string(&next).context("tweaks: encode")?;
        tracing::debug!(tweak = tweak.id(), enabled, "persisting tweak");
        self.store.set(TWEAKS_KEY, &encoded)?;
        *snapshot = next;
        Ok(())
    }

    pub fn toggle(&self, tweak: Tweak) -> Result<bool> {
        let next = !self.is_enabled(tweak);
        self.set(tweak, next)?;
        Ok(next)
    }

    pub fn entries(&self) -> Vec<TweakEntry> {
        let snapshot = self.snapshot();
        Tweak::ALL
            .iter()
            .map(|tweak| TweakEntry {
                tweak: *tweak,
                enabled: snapshot.get(*tweak),
            })
            .collect()
    }

    pub fn css(&self) -> String {
        let mut rules = Vec::new();
        if self.is_enabled(Tweak::CollapsableComments) {
            rules.push(COLLAPSABLE_COMMENTS_CSS);
        }
        rules.concat()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Store;

    fn store() -> Arc<dyn KeyValueStore> {
        Arc::new(Store::open_in_memory().unwrap())
    }

    #[test]
    fn defaults_when_nothing_stored() {
        let tweaks = Tweaks::load(store()).unwrap();
        for tweak in Tweak::ALL {
            assert!(tweaks.is_enabled(tweak), "{} should default on", tweak.id());
        }
        assert_eq!(tweaks.css(), COLLAPSABLE_COMMENTS_CSS);
    }

    #[test]
    fn set_persists_single_key() {
        let store = store();
        let tweaks = Tweaks::load(store.clone()).unwrap();
        tweaks.set(Tweak::CollapsableComments, false).unwrap();
        assert!(tweaks.css().is_empty());

        let raw = store.get(TWEAKS_KEY).unwrap().unwrap();
        assert!(raw.contains("\"collapsableComments\":false"));

        let reloaded = Tweaks::load(store).unwrap();
        assert!(!reloaded.is_enabled(Tweak::CollapsableComments));
        assert!(reloaded.is_enabled(Tweak::AutoAlign));
    }

    #[test]
    fn partial_stored_value_fills_defaults() {
        let store = store();
        store.set(TWEAKS_KEY, "{\"autoAlign\":false}").unwrap();
        let tweaks = Tweaks::load(store).unwrap();
        assert!(!tweaks.is_enabled(Tweak::AutoAlign));
        assert!(tweaks.is_enabled(Tweak::InfiniteScrolling));
    }

    struct ReadOnlyStore;

    impl KeyValueStore for ReadOnlyStore {
        fn get(&self, _key: &str) -> Result<Option<String>> {
            Ok(None)
        }

        fn set(&self, _key: &str, _value: &str) -> Result<()> {
            anyhow::bail!("disk full")
        }
    }

    #[test]
    fn failed_persist_keeps_previous_value() {
        let tweaks = Tweaks::load(Arc::new(ReadOnlyStore)).unwrap();
        let err = tweaks.set(Tweak::AutoAlign, false).unwrap_err();
        assert!(err.to_string().contains("disk full"));
        assert!(tweaks.is_enabled(Tweak::AutoAlign));
        assert!(tweaks.toggle(Tweak::CollapsableComments).is_err());
        assert_eq!(tweaks.css(), COLLAPSABLE_COMMENTS_CSS);
    }

    #[test]
    fn toggle_flips_and_reports() {
        let tweaks = Tweaks::load(store()).unwrap();
        assert!(!tweaks.toggle(Tweak::KarmaPrivacy).unwrap());
        assert!(tweaks.toggle(Tweak::KarmaPrivacy).unwrap());
        assert_eq!(Tweak::from_id("karmaPrivacy"), Some(Tweak::KarmaPrivacy));
        assert_eq!(Tweak::from_id("nope"), None);
    }
}
