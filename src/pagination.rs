//! Endless listing: fetches the next page when asked and splices its items
//! ahead of the trailing nav block, skipping anything already shown.

use std::collections::HashSet;

use crate::error::{MediaError, Result};
use crate::page::{ListingItem, Page};
use crate::tweaks::{Tweak, Tweaks};

pub const DEFAULT_THRESHOLD_PX: u32 = 200;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Fetching { url: String },
    Splicing,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpliceReport {
    pub inserted: usize,
    pub skipped: usize,
    /// Another page is linked; the host should re-run the proximity check
    /// once layout settles.
    pub recheck: bool,
}

#[derive(Debug)]
pub struct Paginator {
    phase: Phase,
    known: HashSet<String>,
    trigger_attached: bool,
    threshold_px: u32,
    tweaks: Tweaks,
}

impl Paginator {
    pub fn new(page: &Page, threshold_px: u32, tweaks: Tweaks) -> Self {
        Self {
            phase: Phase::Idle,
            known: page.known_ids(),
            trigger_attached: true,
            threshold_px,
            tweaks,
        }
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn is_loading(&self) -> bool {
        self.phase != Phase::Idle
    }

    pub fn trigger_attached(&self) -> bool {
        self.trigger_attached
    }

    pub fn knows(&self, id: &str) -> bool {
        self.known.contains(id)
    }

    /// Proximity trigger. Returns the URL to fetch when a load starts.
    ///
    /// A detached trigger is re-attached by this call when idle, so a failed
    /// load is retried only once the user scrolls again.
    pub fn on_scroll(&mut self, remaining_px: u32, page: &mut Page) -> Option<String> {
        if self.phase == Phase::Idle && !self.trigger_attached {
            self.trigger_attached = true;
        }
        if !self.trigger_attached || remaining_px >= self.threshold_px {
            return None;
        }
        if !self.tweaks.is_enabled(Tweak::InfiniteScrolling) {
            return None;
        }
        self.begin(page)
    }

    /// Click on the "next" link. `None` means the click is not intercepted.
    pub fn on_next_click(&mut self, page: &mut Page) -> Option<NextClick> {
        if !self.tweaks.is_enabled(Tweak::LoadPostsInline) {
            return None;
        }
        Some(match self.begin(page) {
            Some(url) => NextClick::Load(url),
            None => NextClick::Ignored,
        })
    }

    /// Enters `Fetching` if the guard is clear and a next link exists.
    pub fn begin(&mut self, page: &mut Page) -> Option<String> {
        if self.phase != Phase::Idle {
            tracing::debug!("next page already loading");
            return None;
        }
        let url = page.next_url()?.to_string();
        tracing::info!(url, "loading next page");
        self.phase = Phase::Fetching { url: url.clone() };
        self.trigger_attached = false;
        page.set_nav_disabled(true);
        Some(url)
    }

    /// Applies the outcome of the outstanding fetch. `wire` runs on every
    /// new item that carries an identifier, before it is inserted.
    pub fn complete(
        &mut self,
        page: &mut Page,
        body: Result<String>,
        wire: &mut dyn FnMut(&mut ListingItem),
    ) -> Option<SpliceReport> {
        let Phase::Fetching { url } = std::mem::replace(&mut self.phase, Phase::Splicing) else {
            self.phase = Phase::Idle;
            return None;
        };

        let fetched = body.and_then(|html| {
            let next = Page::parse(&html, Some(&url));
            if next.has_listing() {
                Ok(next)
            } else {
                Err(MediaError::fetch(&url, "response contains no listing"))
            }
        });

        let report = match fetched {
            Ok(next) => {
                let report = self.splice(page, next, wire);
                self.trigger_attached = true;
                tracing::info!(url, inserted = report.inserted, skipped = report.skipped, "spliced next page");
                Some(report)
            }
            Err(err) => {
                tracing::warn!(url, error = %err, "next page failed");
                page.set_nav_disabled(false);
                page.append_nav_error(format!(
                    "Error loading next page. URL: {url} Reason: {}",
                    failure_reason(&err)
                ));
                None
            }
        };
        self.phase = Phase::Idle;
        report
    }

    fn splice(
        &mut self,
        page: &mut Page,
        next: Page,
        wire: &mut dyn FnMut(&mut ListingItem),
    ) -> SpliceReport {
        let mut report = SpliceReport::default();
        let (items, nav) = next.into_parts();
        for mut item in items {
            match item.id.clone() {
                None => page.insert_before_nav(item),
                Some(id) if self.known.contains(&id) => {
                    tracing::debug!(id, "ignoring duplicate item");
                    report.skipped += 1;
                }
                Some(id) => {
                    wire(&mut item);
                    page.insert_before_nav(item);
                    self.known.insert(id);
                    report.inserted += 1;
                }
            }
        }
        page.replace_nav(nav);
        report.recheck = page.next_url().is_some();
        report
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NextClick {
    Load(String),
    /// Intercepted, but a load is already running or no link exists.
    Ignored,
}

fn failure_reason(err: &MediaError) -> String {
    match err {
        MediaError::Fetch { reason, .. } => reason.clone(),
        other => other.to_string(),
    }
}
