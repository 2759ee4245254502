use std::sync::Arc;

use anyhow::{Context, Result};
use crossbeam_channel::{Receiver, TryRecvError};

use crate::artifact::MediaArtifact;
use crate::comments::DoubleClick;
use crate::config::Config;
use crate::container::{ClickTarget, Controller, ItemView, Outcome};
use crate::error::{self, MediaError};
use crate::fetch::{Fetcher, HttpFetcher};
use crate::menu::{Menu, MenuEntry, TWEAKS_SECTION_ID, TWEAKS_SECTION_TITLE};
use crate::page::{ListingItem, Page};
use crate::pagination::{NextClick, Paginator, SpliceReport};
use crate::pool::Pool;
use crate::providers::Registry;
use crate::render::SourceChange;
use crate::storage::{self, KeyValueStore, Store};
use crate::style::{
    StyleSheets, MEDIA_STYLE_CSS, MEDIA_STYLE_ID, MENU_STYLE_CSS, MENU_STYLE_ID, TWEAK_STYLE_ID,
};
use crate::tweaks::{Tweak, Tweaks};

/// One enhanced listing page. Everything here is owned by the caller's
/// thread; fetches happen on the pool and are applied by `poll`/`wait`.
pub struct App {
    tweaks: Tweaks,
    styles: StyleSheets,
    menu: Menu,
    page: Page,
    controller: Controller,
    paginator: Paginator,
    pool: Pool,
    next_page: Option<Receiver<error::Result<String>>>,
}

impl App {
    pub fn new(
        cfg: &Config,
        store: Arc<dyn KeyValueStore>,
        fetcher: Arc<dyn Fetcher>,
        page_html: &str,
        page_url: &str,
    ) -> Result<Self> {
        let tweaks = Tweaks::load(store).context("load tweaks")?;

        let mut styles = StyleSheets::new();
        styles.apply_style(MEDIA_STYLE_ID, MEDIA_STYLE_CSS);
        styles.apply_style(MENU_STYLE_ID, MENU_STYLE_CSS);
        styles.apply_style(TWEAK_STYLE_ID, &tweaks.css());

        let mut page = Page::parse(page_html, Some(page_url));
        let mut controller = Controller::new(tweaks.clone());
        for item in page.items_mut() {
            wire(&mut controller, item);
        }
        let paginator = Paginator::new(&page, cfg.pagination.threshold_px, tweaks.clone());

        let registry = Arc::new(Registry::new(fetcher, &cfg.extraction));
        let pool = Pool::new(registry, cfg.media.workers);

        tracing::info!(
            url = page_url,
            items = page.items().len(),
            comments = page.comments().len(),
            "page enhanced"
        );

        let mut app = Self {
            tweaks,
            styles,
            menu: Menu::new(),
            page,
            controller,
            paginator,
            pool,
            next_page: None,
        };
        app.refresh_menu();
        Ok(app)
    }

    /// Wires a page against the on-disk store and the live network.
    pub fn open(cfg: &Config, page_html: &str, page_url: &str) -> Result<Self> {
        let store = Store::open(storage::Options {
            path: cfg.storage.path.clone(),
        })
        .context("open storage")?;
        let fetcher = HttpFetcher::new(&cfg.fetch).context("build http client")?;
        Self::new(cfg, Arc::new(store), Arc::new(fetcher), page_html, page_url)
    }

    pub fn tweaks(&self) -> &Tweaks {
        &self.tweaks
    }

    pub fn styles(&self) -> &StyleSheets {
        &self.styles
    }

    pub fn menu(&self) -> &Menu {
        &self.menu
    }

    pub fn page(&self) -> &Page {
        &self.page
    }

    pub fn paginator(&self) -> &Paginator {
        &self.paginator
    }

    pub fn controller(&self) -> &Controller {
        &self.controller
    }

    pub fn view(&self, item_id: &str) -> Option<ItemView> {
        self.controller.view(item_id)
    }

    pub fn click(&mut self, item_id: &str, target: ClickTarget) -> Outcome {
        self.controller.on_click(&self.pool, item_id, target)
    }

    pub fn gallery_next(&mut self, item_id: &str) -> Option<[SourceChange; 2]> {
        self.controller.gallery_next(item_id)
    }

    pub fn gallery_prev(&mut self, item_id: &str) -> Option<[SourceChange; 2]> {
        self.controller.gallery_prev(item_id)
    }

    /// `item_id` is `None` for comments that were part of the page itself.
    pub fn comment_double_click(&mut self, item_id: Option<&str>, comment_id: &str) -> DoubleClick {
        match item_id {
            Some(item_id) => self.controller.on_comment_double_click(item_id, comment_id),
            None => self.page.comments_mut().on_double_click(comment_id, &self.tweaks),
        }
    }

    /// Returns `true` when a next-page load was started.
    pub fn scroll(&mut self, remaining_px: u32) -> bool {
        match self.paginator.on_scroll(remaining_px, &mut self.page) {
            Some(url) => {
                self.start_next_page(url);
                true
            }
            None => false,
        }
    }

    pub fn click_next(&mut self) -> Option<NextClick> {
        let click = self.paginator.on_next_click(&mut self.page)?;
        if let NextClick::Load(url) = &click {
            self.start_next_page(url.clone());
        }
        Some(click)
    }

    fn start_next_page(&mut self, url: String) {
        self.next_page = Some(self.pool.fetch_page(url));
    }

    pub fn toggle_tweak(&mut self, id: &str) -> Result<bool> {
        let tweak = Tweak::from_id(id).with_context(|| format!("unknown tweak {id}"))?;
        let enabled = self
            .tweaks
            .toggle(tweak)
            .with_context(|| format!("toggle {id}"))?;
        self.styles.apply_style(TWEAK_STYLE_ID, &self.tweaks.css());
        self.refresh_menu();
        Ok(enabled)
    }

    fn refresh_menu(&mut self) {
        let entries = self
            .tweaks
            .entries()
            .iter()
            .map(MenuEntry::for_tweak)
            .collect();
        self.menu
            .update_section(TWEAKS_SECTION_TITLE, TWEAKS_SECTION_ID, entries);
    }

    /// Applies whatever has completed so far without blocking. A report with
    /// `recheck` set asks for another [`App::scroll`] with the current distance.
    pub fn poll(&mut self) -> Option<SpliceReport> {
        self.controller.poll();
        let body = match self.next_page.as_ref()?.try_recv() {
            Ok(body) => body,
            Err(TryRecvError::Empty) => return None,
            Err(TryRecvError::Disconnected) => Err(MediaError::fetch(
                self.page.next_url().unwrap_or_default(),
                "fetch worker stopped",
            )),
        };
        self.finish_next_page(body)
    }

    /// Blocks until every outstanding resolution and page load is applied.
    pub fn wait(&mut self) -> Option<SpliceReport> {
        self.controller.wait();
        let rx = self.next_page.as_ref()?;
        let body = rx.recv().unwrap_or_else(|_| {
            Err(MediaError::fetch(
                self.page.next_url().unwrap_or_default(),
                "fetch worker stopped",
            ))
        });
        self.finish_next_page(body)
    }

    fn finish_next_page(&mut self, body: error::Result<String>) -> Option<SpliceReport> {
        self.next_page = None;
        let controller = &mut self.controller;
        self.paginator
            .complete(&mut self.page, body, &mut |item| wire(controller, item))
    }

    pub fn to_html(&self) -> String {
        format!(
            "{}<div class=\"drop-choices srdrop\">{}</div>{}",
            self.styles.to_html(),
            self.menu.to_html(),
            self.page.to_html(&self.tweaks)
        )
    }
}

/// Resolves a single URL against the live providers, outside any page.
pub fn resolve_once(cfg: &Config, url: &str) -> Result<MediaArtifact> {
    let fetcher = HttpFetcher::new(&cfg.fetch).context("build http client")?;
    let registry = Registry::new(Arc::new(fetcher), &cfg.extraction);
    Ok(registry.resolve(url))
}

/// Per-item setup shared by the initial page and spliced pages.
fn wire(controller: &mut Controller, item: &mut ListingItem) {
    item.strip_tracking();
    controller.register(item);
}
