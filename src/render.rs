use html_escape::{encode_double_quoted_attribute, encode_text};

use crate::artifact::{EmbeddedDocument, ImageSequence, MediaArtifact, Video};

pub const CLASS_MEDIA: &str = "redditmod-media";
pub const CLASS_ERROR: &str = "redditmod-media-error";
pub const CLASS_SPINNER: &str = "redditmod-media-spinner";

/// One step of an image swap. A swap always clears before setting so the
/// host reloads even when the URL repeats.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceChange {
    Clear,
    Set(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Gallery {
    images: ImageSequence,
}

impl Gallery {
    pub fn new(images: ImageSequence) -> Self {
        Self { images }
    }

    pub fn images(&self) -> &ImageSequence {
        &self.images
    }

    pub fn shows_navigation(&self) -> bool {
        self.images.len() > 1
    }

    pub fn counter(&self) -> String {
        format!("{}/{}", self.images.index() + 1, self.images.len())
    }

    pub fn next(&mut self) -> [SourceChange; 2] {
        let src = self.images.advance().to_string();
        [SourceChange::Clear, SourceChange::Set(src)]
    }

    pub fn prev(&mut self) -> [SourceChange; 2] {
        let src = self.images.retreat().to_string();
        [SourceChange::Clear, SourceChange::Set(src)]
    }

    pub fn to_html(&self) -> String {
        let nav_style = if self.shows_navigation() {
            ""
        } else {
            " style=\"display:none\""
        };
        format!(
            "<div class=\"{CLASS_MEDIA}\"><div class=\"redditmod-gallery-nav\"{nav_style}>\
<a href=\"#\" class=\"redditmod-gallery-prev\">&lt;</a>\
<span class=\"redditmod-gallery-current\">{}</span><span>/</span>\
<span class=\"redditmod-gallery-total\">{}</span>\
<a href=\"#\" class=\"redditmod-gallery-next\">&gt;</a></div>\
<div><img src=\"{}\" style=\"max-width:100%; max-height:100%; object-fit:scale-down\"></div></div>",
            self.images.index() + 1,
            self.images.len(),
            encode_double_quoted_attribute(self.images.current()),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoPlayer {
    video: Video,
}

impl VideoPlayer {
    pub fn new(video: Video) -> Self {
        Self { video }
    }

    pub fn video(&self) -> &Video {
        &self.video
    }

    pub fn on_show(&mut self) {
        self.video.on_show();
    }

    pub fn on_hide(&mut self) {
        self.video.on_hide();
    }

    pub fn to_html(&self) -> String {
        let sources: String = self
            .video
            .sources
            .iter()
            .map(|src| format!("<source src=\"{}\">", encode_double_quoted_attribute(src)))
            .collect();
        format!(
            "<video class=\"{CLASS_MEDIA}\" autoplay loop style=\"display:block; width:100%\">{sources}</video>"
        )
    }
}

/// Renderable projection of a resolved artifact.
#[derive(Debug, Clone, PartialEq)]
pub enum Fragment {
    Gallery(Gallery),
    Video(VideoPlayer),
    Document(EmbeddedDocument),
    Error(String),
}

impl Fragment {
    pub fn to_html(&self) -> String {
        match self {
            Fragment::Gallery(gallery) => gallery.to_html(),
            Fragment::Video(player) => player.to_html(),
            Fragment::Document(doc) => doc.to_html(),
            Fragment::Error(message) => error_block(message),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Fragment::Error(_))
    }

    pub fn video_mut(&mut self) -> Option<&mut VideoPlayer> {
        match self {
            Fragment::Video(player) => Some(player),
            _ => None,
        }
    }

    pub fn gallery_mut(&mut self) -> Option<&mut Gallery> {
        match self {
            Fragment::Gallery(gallery) => Some(gallery),
            _ => None,
        }
    }

    pub fn document_mut(&mut self) -> Option<&mut EmbeddedDocument> {
        match self {
            Fragment::Document(doc) => Some(doc),
            _ => None,
        }
    }
}

pub fn render(artifact: MediaArtifact) -> Fragment {
    match artifact {
        MediaArtifact::Images(images) => Fragment::Gallery(Gallery::new(images)),
        MediaArtifact::Video(video) => Fragment::Video(VideoPlayer::new(video)),
        MediaArtifact::Document(doc) => Fragment::Document(doc),
        MediaArtifact::Failure { message } => Fragment::Error(message),
    }
}

pub fn error_block(message: &str) -> String {
    format!("<div class=\"{CLASS_ERROR}\">{}</div>", encode_text(message))
}

pub fn spinner() -> String {
    format!("<div class=\"{CLASS_SPINNER}\"></div>")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::Playback;

    fn gallery(urls: &[&str]) -> Gallery {
        Gallery::new(ImageSequence::new(urls.iter().map(|u| u.to_string()).collect()).unwrap())
    }

    #[test]
    fn gallery_navigation_wraps_and_clears_first() {
        let mut gallery = gallery(&["https://i/a.jpg", "https://i/b.jpg", "https://i/a.jpg"]);
        assert!(gallery.shows_navigation());
        assert_eq!(gallery.counter(), "1/3");

        assert_eq!(
            gallery.prev(),
            [SourceChange::Clear, SourceChange::Set("https://i/a.jpg".into())]
        );
        assert_eq!(gallery.counter(), "3/3");
        gallery.next();
        assert_eq!(gallery.counter(), "1/3");
        assert_eq!(
            gallery.next(),
            [SourceChange::Clear, SourceChange::Set("https://i/b.jpg".into())]
        );
        assert_eq!(gallery.images().len(), 3);
    }

    #[test]
    fn single_image_hides_navigation() {
        let gallery = gallery(&["https://i/a.jpg"]);
        assert!(!gallery.shows_navigation());
        assert!(gallery.to_html().contains("style=\"display:none\""));
        assert!(gallery.to_html().contains("src=\"https://i/a.jpg\""));
    }

    #[test]
    fn video_renders_every_source_with_autoplay_loop() {
        let mut fragment = render(MediaArtifact::Video(Video::new(vec![
            "https://cdn/v.webm".into(),
            "https://cdn/v.mp4".into(),
        ])));
        let html = fragment.to_html();
        assert!(html.contains("autoplay loop"));
        assert!(html.contains("<source src=\"https://cdn/v.webm\">"));
        assert!(html.contains("<source src=\"https://cdn/v.mp4\">"));

        let player = fragment.video_mut().unwrap();
        player.on_show();
        assert_eq!(player.video().playback, Playback::Playing);
        player.on_hide();
        assert_eq!(player.video().playback, Playback::Paused);
    }

    #[test]
    fn failure_renders_escaped_error_block() {
        let fragment = render(MediaArtifact::failure("gfycat video not found at <x>"));
        assert!(fragment.is_error());
        assert_eq!(
            fragment.to_html(),
            "<div class=\"redditmod-media-error\">gfycat video not found at &lt;x&gt;</div>"
        );
    }

    #[test]
    fn documents_are_inserted_verbatim() {
        let fragment = render(MediaArtifact::Document(EmbeddedDocument::article("<p>x</p>")));
        assert_eq!(fragment.to_html(), "<p>x</p>");
    }
}
