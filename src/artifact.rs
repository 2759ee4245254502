use serde::Serialize;

use crate::comments::CommentThread;

/// The normalized result of one resolution attempt.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MediaArtifact {
    Images(ImageSequence),
    Video(Video),
    Document(EmbeddedDocument),
    Failure { message: String },
}

impl MediaArtifact {
    pub fn single_image(url: impl Into<String>) -> Self {
        MediaArtifact::Images(ImageSequence {
            urls: vec![url.into()],
            index: 0,
        })
    }

    pub fn video(url: impl Into<String>) -> Self {
        MediaArtifact::Video(Video::new(vec![url.into()]))
    }

    pub fn failure(message: impl ToString) -> Self {
        MediaArtifact::Failure {
            message: message.to_string(),
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, MediaArtifact::Failure { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageSequence {
    urls: Vec<String>,
    index: usize,
}

impl ImageSequence {
    /// Returns `None` for an empty list.
    pub fn new(urls: Vec<String>) -> Option<Self> {
        if urls.is_empty() {
            return None;
        }
        Some(Self { urls, index: 0 })
    }

    pub fn urls(&self) -> &[String] {
        &self.urls
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn current(&self) -> &str {
        &self.urls[self.index]
    }

    pub fn advance(&mut self) -> &str {
        self.index = (self.index + 1) % self.urls.len();
        self.current()
    }

    pub fn retreat(&mut self) -> &str {
        self.index = if self.index == 0 {
            self.urls.len() - 1
        } else {
            self.index - 1
        };
        self.current()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Playback {
    Idle,
    Playing,
    Paused,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Video {
    pub sources: Vec<String>,
    pub playback: Playback,
}

impl Video {
    pub fn new(sources: Vec<String>) -> Self {
        Self {
            sources,
            playback: Playback::Idle,
        }
    }

    /// "Became visible": reload and start playback.
    pub fn on_show(&mut self) {
        self.playback = Playback::Playing;
    }

    /// "Became hidden": pause without dropping the sources.
    pub fn on_hide(&mut self) {
        if self.playback == Playback::Playing {
            self.playback = Playback::Paused;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DocumentKind {
    Article,
    Embed,
    Comments(CommentThread),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmbeddedDocument {
    pub html: String,
    pub kind: DocumentKind,
}

impl EmbeddedDocument {
    pub fn article(html: impl Into<String>) -> Self {
        Self {
            html: html.into(),
            kind: DocumentKind::Article,
        }
    }

    pub fn embed(html: impl Into<String>) -> Self {
        Self {
            html: html.into(),
            kind: DocumentKind::Embed,
        }
    }

    /// Markup as currently presented; comment nodes reflect their collapse state.
    pub fn to_html(&self) -> String {
        match &self.kind {
            DocumentKind::Comments(thread) => thread.project(&self.html),
            _ => self.html.clone(),
        }
    }

    pub fn comments(&self) -> Option<&CommentThread> {
        match &self.kind {
            DocumentKind::Comments(thread) => Some(thread),
            _ => None,
        }
    }

    pub fn comments_mut(&mut self) -> Option<&mut CommentThread> {
        match &mut self.kind {
            DocumentKind::Comments(thread) => Some(thread),
            _ => None,
        }
    }
}
