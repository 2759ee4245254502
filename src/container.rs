//! Per-item media and comments containers: resolution status, expansion,
//! and the decision whether an interaction is ours to handle at all.

use std::collections::HashMap;

use crossbeam_channel::{Receiver, TryRecvError};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::artifact::MediaArtifact;
use crate::comments::DoubleClick;
use crate::page::ListingItem;
use crate::pool::Pool;
use crate::render::{self, spinner, Fragment};
use crate::tweaks::{Tweak, Tweaks};

/// Hosts the site already knows how to embed through its own expando.
static NATIVE_EMBED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"https?://(\w+\.)*(v\.redd\.it|clips\.twitch\.tv|reddituploads\.com|vimeo\.com|youtube\.com|youtu\.be)/.*$",
    )
    .unwrap()
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Media,
    Comments,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Status {
    Absent,
    Loading,
    Ready(Fragment),
    Errored(String),
}

impl Status {
    pub fn is_absent(&self) -> bool {
        matches!(self, Status::Absent)
    }

    fn to_html(&self) -> Option<String> {
        match self {
            Status::Absent => None,
            Status::Loading => Some(spinner()),
            Status::Ready(fragment) => Some(fragment.to_html()),
            Status::Errored(message) => Some(render::error_block(message)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expanded {
    None,
    Media,
    Comments,
}

/// What the user clicked inside a listing item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClickTarget {
    CommentsLink(String),
    NativeExpando,
    Link,
    VideoControls,
    Body,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Not ours; let the page handle the event.
    PassThrough,
    /// Click the item's native expando instead.
    DelegateToNative,
    Toggled {
        kind: Kind,
        expanded: bool,
        scroll_into_view: bool,
    },
    UnknownItem,
}

#[derive(Debug, Clone)]
pub struct ItemState {
    target_url: Option<String>,
    comments_url: Option<String>,
    native_embed: bool,
    media: Status,
    comments: Status,
    expanded: Expanded,
}

impl ItemState {
    fn new(item: &ListingItem) -> Self {
        let native_embed = item.has_expando
            && (item.is_self_post()
                || item
                    .url
                    .as_deref()
                    .map(|url| NATIVE_EMBED.is_match(url))
                    .unwrap_or(false));
        Self {
            target_url: item.url.clone(),
            comments_url: item.comments_url.clone(),
            native_embed,
            media: Status::Absent,
            comments: Status::Absent,
            expanded: Expanded::None,
        }
    }

    pub fn status(&self, kind: Kind) -> &Status {
        match kind {
            Kind::Media => &self.media,
            Kind::Comments => &self.comments,
        }
    }

    fn status_mut(&mut self, kind: Kind) -> &mut Status {
        match kind {
            Kind::Media => &mut self.media,
            Kind::Comments => &mut self.comments,
        }
    }

    pub fn expanded(&self) -> Expanded {
        self.expanded
    }

    fn media_video(&mut self) -> Option<&mut render::VideoPlayer> {
        match &mut self.media {
            Status::Ready(fragment) => fragment.video_mut(),
            _ => None,
        }
    }
}

/// Rendered projection of one item's containers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemView {
    pub expanded: Expanded,
    pub media_html: Option<String>,
    pub comments_html: Option<String>,
}

struct Pending {
    item_id: String,
    kind: Kind,
    rx: Receiver<MediaArtifact>,
}

pub struct Controller {
    items: HashMap<String, ItemState>,
    pending: Vec<Pending>,
    tweaks: Tweaks,
}

impl Controller {
    pub fn new(tweaks: Tweaks) -> Self {
        Self {
            items: HashMap::new(),
            pending: Vec::new(),
            tweaks,
        }
    }

    /// Returns `false` for rows without an identifier; those are never wired.
    pub fn register(&mut self, item: &ListingItem) -> bool {
        match &item.id {
            Some(id) => {
                self.items
                    .entry(id.clone())
                    .or_insert_with(|| ItemState::new(item));
                true
            }
            None => false,
        }
    }

    pub fn item(&self, id: &str) -> Option<&ItemState> {
        self.items.get(id)
    }

    pub fn in_flight(&self) -> usize {
        self.pending.len()
    }

    pub fn on_click(&mut self, pool: &Pool, item_id: &str, target: ClickTarget) -> Outcome {
        let Some(state) = self.items.get(item_id) else {
            return Outcome::UnknownItem;
        };

        if let ClickTarget::CommentsLink(href) = &target {
            let href = href.clone();
            return self.toggle(pool, item_id, Kind::Comments, Some(href));
        }
        if state.native_embed {
            return if target == ClickTarget::NativeExpando {
                Outcome::PassThrough
            } else {
                Outcome::DelegateToNative
            };
        }
        match target {
            ClickTarget::Link | ClickTarget::VideoControls | ClickTarget::NativeExpando => {
                Outcome::PassThrough
            }
            _ => self.toggle(pool, item_id, Kind::Media, None),
        }
    }

    fn toggle(
        &mut self,
        pool: &Pool,
        item_id: &str,
        kind: Kind,
        comments_href: Option<String>,
    ) -> Outcome {
        self.ensure_started(pool, item_id, kind, comments_href);
        let auto_align = self.tweaks.is_enabled(Tweak::AutoAlign);
        let Some(state) = self.items.get_mut(item_id) else {
            return Outcome::UnknownItem;
        };

        let target = match kind {
            Kind::Media => Expanded::Media,
            Kind::Comments => Expanded::Comments,
        };
        let was_media = state.expanded == Expanded::Media;
        let expanding = state.expanded != target;
        state.expanded = if expanding { target } else { Expanded::None };
        let is_media = state.expanded == Expanded::Media;

        if was_media && !is_media {
            if let Some(video) = state.media_video() {
                video.on_hide();
            }
        } else if !was_media && is_media {
            if let Some(video) = state.media_video() {
                video.on_show();
            }
        }

        Outcome::Toggled {
            kind,
            expanded: expanding,
            scroll_into_view: expanding && auto_align,
        }
    }

    /// Starts at most one resolution per item and kind.
    fn ensure_started(
        &mut self,
        pool: &Pool,
        item_id: &str,
        kind: Kind,
        comments_href: Option<String>,
    ) {
        let Some(state) = self.items.get_mut(item_id) else {
            return;
        };
        if !state.status(kind).is_absent() {
            return;
        }
        let url = match kind {
            Kind::Media => state.target_url.clone(),
            Kind::Comments => comments_href.or_else(|| state.comments_url.clone()),
        };
        match url {
            Some(url) => {
                tracing::debug!(item_id, ?kind, url, "starting resolution");
                *state.status_mut(kind) = Status::Loading;
                let rx = pool.resolve(kind, url);
                self.pending.push(Pending {
                    item_id: item_id.to_string(),
                    kind,
                    rx,
                });
            }
            None => {
                *state.status_mut(kind) = Status::Errored(format!("{item_id} has no target url"));
            }
        }
    }

    /// Applies every completed resolution without blocking.
    pub fn poll(&mut self) -> usize {
        let mut applied = 0;
        let mut still_pending = Vec::new();
        for pending in std::mem::take(&mut self.pending) {
            match pending.rx.try_recv() {
                Ok(artifact) => {
                    self.apply(&pending.item_id, pending.kind, artifact);
                    applied += 1;
                }
                Err(TryRecvError::Empty) => still_pending.push(pending),
                Err(TryRecvError::Disconnected) => {
                    self.apply(
                        &pending.item_id,
                        pending.kind,
                        MediaArtifact::failure("resolver stopped before completing"),
                    );
                    applied += 1;
                }
            }
        }
        self.pending = still_pending;
        applied
    }

    /// Blocks until every in-flight resolution has been applied.
    pub fn wait(&mut self) {
        for pending in std::mem::take(&mut self.pending) {
            let artifact = pending
                .rx
                .recv()
                .unwrap_or_else(|_| MediaArtifact::failure("resolver stopped before completing"));
            self.apply(&pending.item_id, pending.kind, artifact);
        }
    }

    /// Late completions still fill their container, expanded or not.
    fn apply(&mut self, item_id: &str, kind: Kind, artifact: MediaArtifact) {
        let Some(state) = self.items.get_mut(item_id) else {
            return;
        };
        let status = match render::render(artifact) {
            Fragment::Error(message) => Status::Errored(message),
            fragment => Status::Ready(fragment),
        };
        tracing::debug!(item_id, ?kind, ready = matches!(status, Status::Ready(_)), "resolution applied");
        *state.status_mut(kind) = status;

        if kind == Kind::Media && state.expanded == Expanded::Media {
            if let Some(video) = state.media_video() {
                video.on_show();
            }
        }
    }

    pub fn gallery_next(&mut self, item_id: &str) -> Option<[render::SourceChange; 2]> {
        self.gallery(item_id).map(|gallery| gallery.next())
    }

    pub fn gallery_prev(&mut self, item_id: &str) -> Option<[render::SourceChange; 2]> {
        self.gallery(item_id).map(|gallery| gallery.prev())
    }

    fn gallery(&mut self, item_id: &str) -> Option<&mut render::Gallery> {
        match &mut self.items.get_mut(item_id)?.media {
            Status::Ready(fragment) => fragment.gallery_mut(),
            _ => None,
        }
    }

    /// Double click on a comment inside one of the item's loaded containers.
    pub fn on_comment_double_click(&mut self, item_id: &str, comment_id: &str) -> DoubleClick {
        let tweaks = self.tweaks.clone();
        let Some(state) = self.items.get_mut(item_id) else {
            return DoubleClick::PassThrough;
        };
        for status in [&mut state.comments, &mut state.media] {
            if let Status::Ready(fragment) = status {
                if let Some(thread) = fragment.document_mut().and_then(|doc| doc.comments_mut()) {
                    if thread.is_bound(comment_id) {
                        return thread.on_double_click(comment_id, &tweaks);
                    }
                }
            }
        }
        DoubleClick::PassThrough
    }

    pub fn view(&self, item_id: &str) -> Option<ItemView> {
        let state = self.items.get(item_id)?;
        Some(ItemView {
            expanded: state.expanded,
            media_html: state.media.to_html(),
            comments_html: state.comments.to_html(),
        })
    }
}
