use html_escape::{encode_double_quoted_attribute, encode_text};

use crate::tweaks::{Tweak, TweakEntry};

pub const TWEAKS_SECTION_ID: &str = "redditmod-menu-tweaks";
pub const TWEAKS_SECTION_TITLE: &str = "tweaks";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuEntry {
    /// Identifier handed back when the entry is clicked.
    pub id: String,
    pub label: String,
    pub title: String,
}

impl MenuEntry {
    pub fn for_tweak(entry: &TweakEntry) -> Self {
        let mark = if entry.enabled { '\u{2611}' } else { '\u{2610}' };
        Self {
            id: entry.tweak.id().to_string(),
            label: format!("{mark} {}", entry.tweak.name()),
            title: entry.tweak.title().to_string(),
        }
    }

    pub fn tweak(&self) -> Option<Tweak> {
        Tweak::from_id(&self.id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuSection {
    pub id: String,
    pub title: String,
    pub entries: Vec<MenuEntry>,
}

/// The options dropdown. Sections keep the order they were first added in.
#[derive(Debug, Clone, Default)]
pub struct Menu {
    sections: Vec<MenuSection>,
}

impl Menu {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update_section(&mut self, title: &str, id: &str, entries: Vec<MenuEntry>) {
        match self.sections.iter_mut().find(|section| section.id == id) {
            Some(section) => {
                section.title = title.to_string();
                section.entries = entries;
            }
            None => self.sections.push(MenuSection {
                id: id.to_string(),
                title: title.to_string(),
                entries,
            }),
        }
    }

    pub fn sections(&self) -> &[MenuSection] {
        &self.sections
    }

    pub fn section(&self, id: &str) -> Option<&MenuSection> {
        self.sections.iter().find(|section| section.id == id)
    }

    pub fn to_html(&self) -> String {
        let mut out = String::new();
        for (i, section) in self.sections.iter().enumerate() {
            if i > 0 {
                out.push_str("<hr class=\"redditmod-menu-spacer\">");
            }
            out.push_str(&format!(
                "<div id=\"{}\"><h3 class=\"redditmod-menu-header\">{}</h3><div class=\"redditmod-menu-links\">",
                encode_double_quoted_attribute(&section.id),
                encode_text(&section.title),
            ));
            for entry in &section.entries {
                out.push_str(&format!(
                    "<a href=\"#\" class=\"choice\" data-id=\"{}\" title=\"{}\">{}</a>",
                    encode_double_quoted_attribute(&entry.id),
                    encode_double_quoted_attribute(&entry.title),
                    encode_text(&entry.label),
                ));
            }
            out.push_str("</div></div>");
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: &str) -> MenuEntry {
        MenuEntry {
            id: id.into(),
            label: id.into(),
            title: String::new(),
        }
    }

    #[test]
    fn update_replaces_entries_and_keeps_order() {
        let mut menu = Menu::new();
        menu.update_section("tweaks", "a", vec![entry("one")]);
        menu.update_section("other", "b", vec![entry("two")]);
        menu.update_section("tweaks", "a", vec![entry("three"), entry("four")]);

        let ids: Vec<_> = menu.sections().iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, ["a", "b"]);
        assert_eq!(menu.section("a").unwrap().entries.len(), 2);

        let html = menu.to_html();
        assert_eq!(html.matches("redditmod-menu-spacer").count(), 1);
        assert!(html.find("id=\"a\"").unwrap() < html.find("redditmod-menu-spacer").unwrap());
    }

    #[test]
    fn tweak_entries_show_checkbox_state() {
        let on = MenuEntry::for_tweak(&TweakEntry {
            tweak: Tweak::AutoAlign,
            enabled: true,
        });
        let off = MenuEntry::for_tweak(&TweakEntry {
            tweak: Tweak::KarmaPrivacy,
            enabled: false,
        });
        assert_eq!(on.label, "\u{2611} Auto-align on expand");
        assert_eq!(off.label, "\u{2610} Karma Privacy");
        assert_eq!(off.tweak(), Some(Tweak::KarmaPrivacy));
        assert_eq!(on.title, "Scroll so the clicked post is at the top of the screen.");
    }
}
