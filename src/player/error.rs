use crate::player::media::MediaKind;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PlayerError {
    #[error("invalid playlist: {0}")]
    InvalidPlaylist(String),

    #[error("unsupported media type for `{path}`")]
    UnsupportedMedia { path: String },

    #[cfg(any(target_arch = "wasm32", test))]
    #[error("failed to mount player surfaces: {0}")]
    Mount(String),
}

impl PlayerError {
    pub fn invalid_playlist(msg: impl Into<String>) -> Self {
        Self::InvalidPlaylist(msg.into())
    }

    #[cfg(any(target_arch = "wasm32", test))]
    pub fn mount(msg: impl Into<String>) -> Self {
        Self::Mount(msg.into())
    }
}

/// A single playlist item could not be loaded. Never fatal to playback.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("failed to load {kind} `{src}`: {reason}")]
pub struct MediaLoadError {
    pub kind: MediaKind,
    pub src: String,
    pub reason: String,
}

impl MediaLoadError {
    pub fn new(kind: MediaKind, src: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            kind,
            src: src.into(),
            reason: reason.into(),
        }
    }
}
