use std::collections::HashSet;

use html_escape::encode_text;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::comments::CommentThread;
use crate::render::error_block;
use crate::tweaks::{Tweak, Tweaks};

static LISTING: Lazy<Selector> = Lazy::new(|| Selector::parse("#siteTable").unwrap());
static LISTING_CHILDREN: Lazy<Selector> = Lazy::new(|| Selector::parse("#siteTable > *").unwrap());
static TITLE_LINK: Lazy<Selector> = Lazy::new(|| Selector::parse("a.title").unwrap());
static COMMENTS_LINK: Lazy<Selector> = Lazy::new(|| Selector::parse("a.comments").unwrap());
static EXPANDO: Lazy<Selector> = Lazy::new(|| Selector::parse(".expando-button").unwrap());
static NAV: Lazy<Selector> = Lazy::new(|| Selector::parse(".nav-buttons").unwrap());
static NEXT_LINK: Lazy<Selector> = Lazy::new(|| Selector::parse(".next-button a").unwrap());
static PAGE_COMMENTS: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".commentarea .sitetable > *:not(.clearleft)").unwrap());
static USERNAME: Lazy<Selector> = Lazy::new(|| Selector::parse("span.user > a").unwrap());
static KARMA: Lazy<Selector> = Lazy::new(|| Selector::parse("span.userkarma").unwrap());

static TRACKING_ATTRS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"\s+data-(?:outbound-url|outbound-expiration|inbound-url)="[^"]*""#).unwrap()
});

/// One row of the listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingItem {
    pub id: Option<String>,
    pub classes: Vec<String>,
    pub url: Option<String>,
    pub comments_url: Option<String>,
    pub has_expando: bool,
    pub html: String,
}

impl ListingItem {
    fn from_element(el: ElementRef<'_>, base: Option<&Url>) -> Self {
        let value = el.value();
        let url = value
            .attr("data-url")
            .map(str::to_string)
            .or_else(|| link_href(el, &TITLE_LINK))
            .map(|href| resolve_href(base, &href));
        let comments_url = link_href(el, &COMMENTS_LINK).map(|href| resolve_href(base, &href));
        Self {
            id: value.id().map(str::to_string),
            classes: value.classes().map(str::to_string).collect(),
            url,
            comments_url,
            has_expando: el.select(&EXPANDO).next().is_some(),
            html: el.html(),
        }
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }

    pub fn is_self_post(&self) -> bool {
        self.has_class("self")
    }

    pub fn is_layout(&self) -> bool {
        self.has_class("clearleft")
    }

    /// Drops outbound/inbound tracking attributes from the row's links.
    pub fn strip_tracking(&mut self) {
        if TRACKING_ATTRS.is_match(&self.html) {
            self.html = TRACKING_ATTRS.replace_all(&self.html, "").into_owned();
        }
    }
}

/// The trailing navigation block holding the "next" link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavBlock {
    pub html: String,
    pub next_url: Option<String>,
    pub disabled: bool,
    pub errors: Vec<String>,
}

impl NavBlock {
    fn to_html(&self) -> String {
        let style = if self.disabled {
            " style=\"background-color:#aaa; opacity:0.5; cursor:not-allowed\""
        } else {
            ""
        };
        let errors: String = self.errors.iter().map(|e| error_block(e)).collect();
        format!("<div class=\"redditmod-nav\"{style}>{}{errors}</div>", self.html)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Page {
    has_listing: bool,
    items: Vec<ListingItem>,
    nav: Option<NavBlock>,
    comments: CommentThread,
    comment_nodes: Vec<String>,
    username: Option<String>,
    karma: Option<String>,
}

impl Page {
    pub fn parse(html: &str, base: Option<&str>) -> Self {
        let base = base.and_then(|b| Url::parse(b).ok());
        let doc = Html::parse_document(html);

        let items = doc
            .select(&LISTING_CHILDREN)
            .filter(|el| !el.value().classes().any(|c| c == "nav-buttons"))
            .map(|el| ListingItem::from_element(el, base.as_ref()))
            .filter(|item| !item.is_layout())
            .collect();

        let nav = doc.select(&NAV).next().map(|el| NavBlock {
            html: el.inner_html(),
            next_url: link_href(el, &NEXT_LINK).map(|href| resolve_href(base.as_ref(), &href)),
            disabled: false,
            errors: Vec::new(),
        });

        let mut comments = CommentThread::new();
        let comment_nodes: Vec<String> = doc.select(&PAGE_COMMENTS).map(|node| node.html()).collect();
        for node in &comment_nodes {
            comments.bind_markup(node);
        }

        Self {
            has_listing: doc.select(&LISTING).next().is_some(),
            items,
            nav,
            comments,
            comment_nodes,
            username: first_text(&doc, &USERNAME),
            karma: first_text(&doc, &KARMA),
        }
    }

    pub fn has_listing(&self) -> bool {
        self.has_listing
    }

    pub fn items(&self) -> &[ListingItem] {
        &self.items
    }

    pub fn items_mut(&mut self) -> &mut [ListingItem] {
        &mut self.items
    }

    pub fn item(&self, id: &str) -> Option<&ListingItem> {
        self.items.iter().find(|item| item.id.as_deref() == Some(id))
    }

    pub fn into_parts(self) -> (Vec<ListingItem>, Option<NavBlock>) {
        (self.items, self.nav)
    }

    pub fn known_ids(&self) -> HashSet<String> {
        self.items.iter().filter_map(|item| item.id.clone()).collect()
    }

    pub fn nav(&self) -> Option<&NavBlock> {
        self.nav.as_ref()
    }

    pub fn next_url(&self) -> Option<&str> {
        self.nav.as_ref().and_then(|nav| nav.next_url.as_deref())
    }

    /// Items always precede the trailing nav block.
    pub fn insert_before_nav(&mut self, item: ListingItem) {
        self.items.push(item);
    }

    pub fn replace_nav(&mut self, nav: Option<NavBlock>) {
        self.nav = nav;
    }

    pub fn set_nav_disabled(&mut self, disabled: bool) {
        if let Some(nav) = self.nav.as_mut() {
            nav.disabled = disabled;
        }
    }

    pub fn append_nav_error(&mut self, message: String) {
        match self.nav.as_mut() {
            Some(nav) => nav.errors.push(message),
            None => {
                self.nav = Some(NavBlock {
                    html: String::new(),
                    next_url: None,
                    disabled: false,
                    errors: vec![message],
                })
            }
        }
    }

    pub fn comments(&self) -> &CommentThread {
        &self.comments
    }

    pub fn comments_mut(&mut self) -> &mut CommentThread {
        &mut self.comments
    }

    /// Username and karma as displayed, honouring the privacy tweaks.
    pub fn user_badge(&self, tweaks: &Tweaks) -> (Option<String>, Option<String>) {
        let username = self.username.as_ref().map(|name| {
            if tweaks.is_enabled(Tweak::UsernamePrivacy) {
                "Hidden".to_string()
            } else {
                name.clone()
            }
        });
        let karma = self.karma.as_ref().map(|karma| {
            if tweaks.is_enabled(Tweak::KarmaPrivacy) {
                "~".to_string()
            } else {
                karma.clone()
            }
        });
        (username, karma)
    }

    pub fn to_html(&self, tweaks: &Tweaks) -> String {
        let mut out = String::new();
        let (username, karma) = self.user_badge(tweaks);
        if username.is_some() || karma.is_some() {
            out.push_str(&format!(
                "<span class=\"user\"><a>{}</a> <span class=\"userkarma\">{}</span></span>",
                encode_text(username.as_deref().unwrap_or_default()),
                encode_text(karma.as_deref().unwrap_or_default()),
            ));
        }
        out.push_str("<div id=\"siteTable\">");
        for item in &self.items {
            out.push_str(&item.html);
        }
        if let Some(nav) = &self.nav {
            out.push_str(&nav.to_html());
        }
        out.push_str("</div>");
        if !self.comment_nodes.is_empty() {
            out.push_str("<div class=\"commentarea\"><div class=\"sitetable\">");
            for node in &self.comment_nodes {
                out.push_str(&self.comments.project(node));
            }
            out.push_str("</div></div>");
        }
        out
    }
}

fn link_href(el: ElementRef<'_>, selector: &Selector) -> Option<String> {
    el.select(selector)
        .find_map(|link| link.value().attr("href"))
        .map(str::to_string)
}

fn resolve_href(base: Option<&Url>, href: &str) -> String {
    match base.and_then(|base| base.join(href).ok()) {
        Some(url) => url.to_string(),
        None => href.to_string(),
    }
}

fn first_text(doc: &Html, selector: &Selector) -> Option<String> {
    doc.select(selector)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|text| !text.is_empty())
}
