// Now-playing track records

use serde::Serialize;

use crate::vorbis::{VorbisComment, VorbisFields};

/// Title/artist pair announced by the DJ software
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Track {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artist: Option<String>,
    /// Carried along when present; never decides whether a track is emitted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub album: Option<String>,
}

impl Track {
    /// Build a track from lowercased comment pairs.
    ///
    /// Uses the first `title` and the first `artist`; returns `None` when both
    /// are missing or empty.
    pub fn from_comments(comments: &[(String, String)]) -> Option<Self> {
        let first = |key: &str| {
            comments
                .iter()
                .find(|(field, _)| field == key)
                .map(|(_, value)| value.clone())
                .filter(|value| !value.is_empty())
        };

        let title = first(VorbisFields::TITLE);
        let artist = first(VorbisFields::ARTIST);
        if title.is_none() && artist.is_none() {
            return None;
        }

        Some(Track {
            title,
            artist,
            album: first(VorbisFields::ALBUM),
        })
    }

    pub fn from_vorbis_comment(comment: &VorbisComment) -> Option<Self> {
        Self::from_comments(&comment.comments)
    }
}

impl std::fmt::Display for Track {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (&self.artist, &self.title) {
            (Some(artist), Some(title)) => write!(f, "{} - {}", artist, title),
            (Some(artist), None) => write!(f, "{}", artist),
            (None, Some(title)) => write!(f, "{}", title),
            (None, None) => write!(f, "(unknown)"),
        }
    }
}
