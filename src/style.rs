use std::collections::BTreeMap;

use html_escape::encode_double_quoted_attribute;

pub const MEDIA_STYLE_ID: &str = "redditmod-media-style";
pub const TWEAK_STYLE_ID: &str = "redditmod-tweak-style";
pub const MENU_STYLE_ID: &str = "redditmod-menu-style";

pub const MEDIA_STYLE_CSS: &str = concat!(
    ".redditmod-media-box, .redditmod-comments-box{max-height:0; height:0; overflow:hidden; transition: height linear 0.2s, max-height linear 0.2s}",
    ".redditmod-media-expanded .redditmod-media-box, .redditmod-comments-expanded .redditmod-comments-box{max-height:10000px; height:auto}",
    ".redditmod-media-spinner,.redditmod-media-spinner:after{border-radius:50%;width:10em;height:10em}",
    ".redditmod-media-spinner{margin:60px auto;font-size:10px;position:relative;text-indent:-9999em;border-top:1.1em solid rgba(255,255,255,.2);border-right:1.1em solid rgba(255,255,255,.2);border-bottom:1.1em solid rgba(255,255,255,.2);border-left:1.1em solid #fff;transform:translateZ(0);animation:load8 1.1s infinite linear}",
    "@keyframes load8{0%{transform:rotate(0)}100%{transform:rotate(360deg)}}",
    ".redditmod-media-error{background-color:rgba(255,0,0,0.3); color:#fff; text-shadow:1px 1px #000}",
);

pub const MENU_STYLE_CSS: &str = ".redditmod-menu-header{margin:3px 5px 3px 5px}";

/// Named blocks of presentation rules, replaced wholesale by id.
#[derive(Debug, Clone, Default)]
pub struct StyleSheets {
    blocks: BTreeMap<String, String>,
}

impl StyleSheets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces the block; applying the same id twice leaves one block.
    pub fn apply_style(&mut self, id: &str, css: &str) {
        tracing::trace!(id, bytes = css.len(), "applying style");
        self.blocks.insert(id.to_string(), css.to_string());
    }

    pub fn remove_style(&mut self, id: &str) {
        self.blocks.remove(id);
    }

    pub fn get(&self, id: &str) -> Option<&str> {
        self.blocks.get(id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn to_html(&self) -> String {
        self.blocks
            .iter()
            .map(|(id, css)| {
                format!(
                    "<style id=\"{}\" type=\"text/css\">{css}</style>",
                    encode_double_quoted_attribute(id)
                )
            })
            .collect()
    }
}
