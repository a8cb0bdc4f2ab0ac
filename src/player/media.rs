use serde::{Deserialize, Serialize};
use std::fmt;

use crate::player::error::PlayerError;
use crate::player::surface::Surface;

const VIDEO_EXTENSIONS: [&str; 3] = ["mp4", "webm", "mov"];
const IMAGE_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "webp"];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Video,
    Image,
}

impl MediaKind {
    /// Classifies a media path by its extension, ignoring any query string or fragment.
    pub fn classify(path: &str) -> Option<Self> {
        let without_suffix = path.split(['?', '#']).next().unwrap_or(path);
        let file_name = without_suffix
            .rsplit('/')
            .next()
            .unwrap_or(without_suffix);
        let (_, extension) = file_name.rsplit_once('.')?;
        let extension = extension.to_ascii_lowercase();

        if VIDEO_EXTENSIONS.contains(&extension.as_str()) {
            Some(Self::Video)
        } else if IMAGE_EXTENSIONS.contains(&extension.as_str()) {
            Some(Self::Image)
        } else {
            None
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Video => "video",
            Self::Image => "image",
        }
    }

    pub fn surface(self) -> Surface {
        match self {
            Self::Video => Surface::Video,
            Self::Image => Surface::Image,
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MediaItem {
    pub kind: MediaKind,
    pub src: String,
}

impl MediaItem {
    #[cfg(test)]
    pub fn video(src: impl Into<String>) -> Self {
        Self {
            kind: MediaKind::Video,
            src: src.into(),
        }
    }

    #[cfg(test)]
    pub fn image(src: impl Into<String>) -> Self {
        Self {
            kind: MediaKind::Image,
            src: src.into(),
        }
    }

    pub fn from_path(path: &str) -> Result<Self, PlayerError> {
        let kind = MediaKind::classify(path).ok_or_else(|| PlayerError::UnsupportedMedia {
            path: path.to_string(),
        })?;

        Ok(Self {
            kind,
            src: path.to_string(),
        })
    }
}

/// How a playlist entry is written in a showcase document: either a bare path
/// or an explicitly tagged object.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MediaEntry {
    Path(String),
    Tagged { kind: MediaKind, src: String },
}

impl TryFrom<&MediaEntry> for MediaItem {
    type Error = PlayerError;

    fn try_from(entry: &MediaEntry) -> Result<Self, Self::Error> {
        match entry {
            MediaEntry::Path(path) => Self::from_path(path),
            MediaEntry::Tagged { kind, src } => Ok(Self {
                kind: *kind,
                src: src.clone(),
            }),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Playlist {
    items: Vec<MediaItem>,
}

impl Playlist {
    pub fn new(items: Vec<MediaItem>) -> Result<Self, PlayerError> {
        if items.is_empty() {
            return Err(PlayerError::invalid_playlist("playlist has no media items"));
        }

        Ok(Self { items })
    }

    #[cfg(test)]
    pub fn from_paths<S: AsRef<str>>(paths: &[S]) -> Result<Self, PlayerError> {
        let items = paths
            .iter()
            .map(|path| MediaItem::from_path(path.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;

        Self::new(items)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn get(&self, index: usize) -> Option<&MediaItem> {
        self.items.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &MediaItem> {
        self.items.iter()
    }

    pub fn is_last(&self, index: usize) -> bool {
        index + 1 == self.items.len()
    }

    pub fn next_index(&self, index: usize) -> usize {
        (index + 1) % self.items.len()
    }
}
