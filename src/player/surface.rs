use futures_util::future::LocalBoxFuture;
use std::time::Duration;

use crate::player::error::{MediaLoadError, PlayerError};
use crate::player::media::{MediaItem, MediaKind};

pub const OPAQUE: f32 = 1.0;
pub const TRANSPARENT: f32 = 0.0;

pub type MediaFuture<T> = LocalBoxFuture<'static, T>;
pub type VisibilityCallback = Box<dyn Fn(bool)>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Surface {
    Video,
    Image,
}

impl Surface {
    pub fn other(self) -> Self {
        match self {
            Self::Video => Self::Image,
            Self::Image => Self::Video,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    /// Intrinsic sizes of zero mean the resource has not reported them.
    #[cfg(any(target_arch = "wasm32", test))]
    pub fn known(width: u32, height: u32) -> Option<Self> {
        (width > 0 && height > 0).then_some(Self { width, height })
    }
}

/// Delivered to the container every time a new item is faded in.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MediaChanged {
    pub item_index: usize,
    pub kind: MediaKind,
    pub native: Option<Dimensions>,
}

impl MediaChanged {
    pub fn is_video(&self) -> bool {
        self.kind == MediaKind::Video
    }

    pub fn is_image(&self) -> bool {
        self.kind == MediaKind::Image
    }

    pub fn native_width(&self) -> Option<u32> {
        self.native.map(|size| size.width)
    }

    pub fn native_height(&self) -> Option<u32> {
        self.native.map(|size| size.height)
    }
}

/// The pair of rendering surfaces a player owns once initialized.
pub trait Stage {
    fn set_opacity(&self, surface: Surface, opacity: f32);

    /// Resolves once the item is ready to render, with its intrinsic size when known.
    fn load(&self, item: &MediaItem) -> MediaFuture<Result<Option<Dimensions>, MediaLoadError>>;

    /// Starts the loaded video and resolves at its natural end, or right away if it cannot play.
    fn play_video(&self) -> MediaFuture<()>;

    fn pause_video(&self);

    fn rewind_video(&self);

    /// Detaches both surfaces from the container and drops their sources.
    fn release(&self);
}

pub trait VisibilityObserver {
    fn disconnect(&self);
}

/// The host-supplied attachment point a player renders into.
pub trait Container {
    fn mount_stage(&self, fade_duration: Duration) -> Result<Box<dyn Stage>, PlayerError>;

    fn observe_visibility(&self, on_change: VisibilityCallback) -> Box<dyn VisibilityObserver>;

    fn media_changed(&self, event: &MediaChanged);

    fn playing_changed(&self, _playing: bool) {}

    fn media_failed(&self, _error: &MediaLoadError) {}
}

/// Timer and task primitives of the single-threaded event loop the player runs on.
pub trait Scheduler {
    fn sleep(&self, duration: Duration) -> MediaFuture<()>;

    fn spawn(&self, task: MediaFuture<()>);
}
