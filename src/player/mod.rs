mod config;
mod error;
mod layout;
mod media;
mod registry;
mod surface;

#[cfg(test)]
mod testing;

pub use config::{PlayerConfig, PlayerOptions};
pub use error::{MediaLoadError, PlayerError};
pub use layout::{fit_within, Bounds};
pub use media::{MediaEntry, MediaItem, MediaKind, Playlist};
pub use registry::PlayerRegistry;
pub use surface::{
    Container, Dimensions, MediaChanged, MediaFuture, Scheduler, Stage, Surface,
    VisibilityCallback, VisibilityObserver, OPAQUE, TRANSPARENT,
};

use futures_util::future::{self, AbortHandle, FutureExt};
use std::{
    cell::RefCell,
    rc::{Rc, Weak},
};
use tracing::{debug, info, warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LifecycleState {
    Uninitialized,
    Initialized,
    Playing,
    Paused,
    Stopped,
    Destroyed,
}

impl LifecycleState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::Initialized => "initialized",
            Self::Playing => "playing",
            Self::Paused => "paused",
            Self::Stopped => "stopped",
            Self::Destroyed => "destroyed",
        }
    }
}

struct Runtime {
    lifecycle: LifecycleState,
    current_index: usize,
    visible: bool,
    // Bumped on every play/pause/stop/destroy; an advance loop only acts for its own session.
    session: u64,
    advancing: bool,
    showing: Option<Surface>,
    stage: Option<Rc<dyn Stage>>,
    observer: Option<Box<dyn VisibilityObserver>>,
    advance: Option<AbortHandle>,
}

impl Runtime {
    fn new() -> Self {
        Self {
            lifecycle: LifecycleState::Uninitialized,
            current_index: 0,
            visible: true,
            session: 0,
            advancing: false,
            showing: None,
            stage: None,
            observer: None,
            advance: None,
        }
    }
}

struct Shared {
    playlist: Playlist,
    config: PlayerConfig,
    container: Rc<dyn Container>,
    scheduler: Rc<dyn Scheduler>,
    runtime: RefCell<Runtime>,
}

impl Drop for Shared {
    fn drop(&mut self) {
        let runtime = self.runtime.get_mut();
        if runtime.lifecycle == LifecycleState::Destroyed {
            return;
        }

        if let Some(handle) = runtime.advance.take() {
            handle.abort();
        }
        if let Some(observer) = runtime.observer.take() {
            observer.disconnect();
        }
        if let Some(stage) = runtime.stage.take() {
            stage.pause_video();
            stage.release();
        }
    }
}

/// Plays an ordered list of videos and stills on two cross-fading surfaces.
///
/// Cloning yields another handle to the same player. Every `play` restarts the
/// sequence at the first item; there is no resume-from-position.
#[derive(Clone)]
pub struct MediaSequencePlayer {
    shared: Rc<Shared>,
}

impl MediaSequencePlayer {
    pub fn create(
        container: Rc<dyn Container>,
        scheduler: Rc<dyn Scheduler>,
        items: Vec<MediaItem>,
        config: PlayerConfig,
    ) -> Result<Self, PlayerError> {
        let playlist = Playlist::new(items)?;
        debug!(items = playlist.len(), "media player created");

        Ok(Self {
            shared: Rc::new(Shared {
                playlist,
                config,
                container,
                scheduler,
                runtime: RefCell::new(Runtime::new()),
            }),
        })
    }

    pub fn initialize(&self) -> Result<(), PlayerError> {
        if self.state() != LifecycleState::Uninitialized {
            return Ok(());
        }

        let shared = &self.shared;
        let stage: Rc<dyn Stage> = Rc::from(shared.container.mount_stage(shared.config.fade_duration)?);
        stage.set_opacity(Surface::Video, TRANSPARENT);
        stage.set_opacity(Surface::Image, TRANSPARENT);

        let weak = Rc::downgrade(shared);
        let observer = shared.container.observe_visibility(Box::new(move |visible| {
            if let Some(shared) = weak.upgrade() {
                MediaSequencePlayer { shared }.visibility_changed(visible);
            }
        }));

        let mut runtime = shared.runtime.borrow_mut();
        runtime.stage = Some(stage);
        runtime.observer = Some(observer);
        runtime.lifecycle = LifecycleState::Initialized;
        info!(items = shared.playlist.len(), "media player initialized");
        Ok(())
    }

    pub fn play(&self) -> Result<(), PlayerError> {
        {
            let runtime = self.shared.runtime.borrow();
            if runtime.lifecycle == LifecycleState::Destroyed {
                debug!("play ignored, player destroyed");
                return Ok(());
            }
            if !runtime.visible {
                debug!("play ignored, container not visible");
                return Ok(());
            }
        }

        self.initialize()?;

        let (stage, session, superseded) = {
            let mut runtime = self.shared.runtime.borrow_mut();
            let Some(stage) = runtime.stage.clone() else {
                return Ok(());
            };
            let superseded = runtime.advance.take();
            runtime.session += 1;
            runtime.current_index = 0;
            runtime.lifecycle = LifecycleState::Playing;
            runtime.advancing = true;
            (stage, runtime.session, superseded)
        };

        if let Some(handle) = superseded {
            handle.abort();
        }

        let advance = AdvanceLoop {
            shared: Rc::downgrade(&self.shared),
            session,
            stage,
            container: self.shared.container.clone(),
            scheduler: self.shared.scheduler.clone(),
            playlist: self.shared.playlist.clone(),
            config: self.shared.config,
        };
        let (task, handle) = future::abortable(advance.run());
        self.shared.runtime.borrow_mut().advance = Some(handle);

        info!(items = self.shared.playlist.len(), session, "media playback started");
        self.shared.container.playing_changed(true);
        self.shared.scheduler.spawn(task.map(|_| ()).boxed_local());
        Ok(())
    }

    pub fn pause(&self) {
        if self.halt(LifecycleState::Paused) {
            info!(index = self.current_index(), "media playback paused");
        }
    }

    pub fn stop(&self) {
        if self.halt(LifecycleState::Stopped) {
            info!("media playback stopped");
        }
    }

    pub fn destroy(&self) {
        let (stage, observer, handle, was_playing) = {
            let mut runtime = self.shared.runtime.borrow_mut();
            if runtime.lifecycle == LifecycleState::Destroyed {
                return;
            }
            let was_playing = runtime.lifecycle == LifecycleState::Playing;
            runtime.lifecycle = LifecycleState::Destroyed;
            runtime.session += 1;
            runtime.advancing = false;
            runtime.showing = None;
            (
                runtime.stage.take(),
                runtime.observer.take(),
                runtime.advance.take(),
                was_playing,
            )
        };

        if let Some(handle) = handle {
            handle.abort();
        }
        if let Some(stage) = stage {
            silence(stage.as_ref(), true);
            stage.release();
        }
        if let Some(observer) = observer {
            observer.disconnect();
        }
        if was_playing {
            self.shared.container.playing_changed(false);
        }
        info!("media player destroyed");
    }

    pub fn state(&self) -> LifecycleState {
        self.shared.runtime.borrow().lifecycle
    }

    pub fn current_index(&self) -> usize {
        self.shared.runtime.borrow().current_index
    }

    pub fn is_visible(&self) -> bool {
        self.shared.runtime.borrow().visible
    }

    pub fn is_playing(&self) -> bool {
        self.state() == LifecycleState::Playing
    }

    /// False once a non-looping playlist has shown its last item, even while still `Playing`.
    pub fn is_advancing(&self) -> bool {
        self.shared.runtime.borrow().advancing
    }

    pub fn playlist(&self) -> &Playlist {
        &self.shared.playlist
    }

    pub fn config(&self) -> &PlayerConfig {
        &self.shared.config
    }

    fn halt(&self, target: LifecycleState) -> bool {
        let (stage, handle, was_playing) = {
            let mut runtime = self.shared.runtime.borrow_mut();
            let allowed = match target {
                LifecycleState::Paused => runtime.lifecycle == LifecycleState::Playing,
                LifecycleState::Stopped => matches!(
                    runtime.lifecycle,
                    LifecycleState::Playing | LifecycleState::Paused
                ),
                _ => false,
            };
            if !allowed {
                return false;
            }

            let was_playing = runtime.lifecycle == LifecycleState::Playing;
            runtime.lifecycle = target;
            runtime.session += 1;
            runtime.advancing = false;
            runtime.showing = None;
            (runtime.stage.clone(), runtime.advance.take(), was_playing)
        };

        if let Some(handle) = handle {
            handle.abort();
        }
        if let Some(stage) = stage {
            silence(stage.as_ref(), target == LifecycleState::Stopped);
        }
        if was_playing {
            self.shared.container.playing_changed(false);
        }
        true
    }

    fn visibility_changed(&self, visible: bool) {
        let should_pause = {
            let mut runtime = self.shared.runtime.borrow_mut();
            if runtime.lifecycle == LifecycleState::Destroyed {
                return;
            }
            runtime.visible = visible;
            !visible && runtime.lifecycle == LifecycleState::Playing
        };

        if should_pause {
            debug!("container left the viewport, pausing");
            self.pause();
        }
    }
}

fn silence(stage: &dyn Stage, rewind: bool) {
    stage.pause_video();
    if rewind {
        stage.rewind_video();
    }
    stage.set_opacity(Surface::Video, TRANSPARENT);
    stage.set_opacity(Surface::Image, TRANSPARENT);
}

struct AdvanceLoop {
    shared: Weak<Shared>,
    session: u64,
    stage: Rc<dyn Stage>,
    container: Rc<dyn Container>,
    scheduler: Rc<dyn Scheduler>,
    playlist: Playlist,
    config: PlayerConfig,
}

impl AdvanceLoop {
    async fn run(self) {
        let mut index = 0;

        loop {
            let Some(item) = self.playlist.get(index).cloned() else {
                return;
            };

            // Both videos share one element; hide it before swapping the source.
            if item.kind == MediaKind::Video && self.showing() == Some(Surface::Video) {
                self.stage.pause_video();
                self.stage.set_opacity(Surface::Video, TRANSPARENT);
                self.mark_showing(None);
                self.scheduler.sleep(self.config.fade_duration).await;
                if !self.is_current() {
                    return;
                }
            }

            debug!(index, kind = %item.kind, src = %item.src, "loading media item");
            let loaded = self.stage.load(&item).await;
            if !self.is_current() {
                return;
            }

            let (native, failed) = match loaded {
                Ok(native) => (native, false),
                Err(error) => {
                    warn!(index, %error, "media item failed to load, continuing");
                    self.container.media_failed(&error);
                    (None, true)
                }
            };
            if !self.is_current() {
                return;
            }

            self.crossfade(item.kind);
            self.container.media_changed(&MediaChanged {
                item_index: index,
                kind: item.kind,
                native,
            });
            if !self.is_current() {
                return;
            }

            // A failed item holds the still-image timer so the sequence keeps its pace.
            let display = match (item.kind, failed) {
                (MediaKind::Video, false) => self.stage.play_video(),
                _ => self.scheduler.sleep(self.config.image_display),
            };
            // An item never ends before its fade-in has finished.
            future::join(display, self.scheduler.sleep(self.config.fade_duration)).await;
            if !self.is_current() {
                return;
            }

            if !self.config.loop_playlist && self.playlist.is_last(index) {
                self.finish();
                return;
            }

            self.scheduler.sleep(self.config.gap_duration).await;
            let Some(next) = self.advance_from(index) else {
                return;
            };
            index = next;
        }
    }

    fn is_current(&self) -> bool {
        self.shared.upgrade().is_some_and(|shared| {
            let runtime = shared.runtime.borrow();
            runtime.lifecycle == LifecycleState::Playing && runtime.session == self.session
        })
    }

    fn crossfade(&self, kind: MediaKind) {
        let target = kind.surface();
        if target == Surface::Image {
            self.stage.pause_video();
        }
        self.stage.set_opacity(target.other(), TRANSPARENT);
        self.stage.set_opacity(target, OPAQUE);
        self.mark_showing(Some(target));
    }

    fn showing(&self) -> Option<Surface> {
        let shared = self.shared.upgrade()?;
        let showing = shared.runtime.borrow().showing;
        showing
    }

    fn mark_showing(&self, surface: Option<Surface>) {
        if let Some(shared) = self.shared.upgrade() {
            let mut runtime = shared.runtime.borrow_mut();
            if runtime.session == self.session {
                runtime.showing = surface;
            }
        }
    }

    fn advance_from(&self, index: usize) -> Option<usize> {
        let shared = self.shared.upgrade()?;
        let mut runtime = shared.runtime.borrow_mut();
        if runtime.lifecycle != LifecycleState::Playing || runtime.session != self.session {
            return None;
        }

        let next = self.playlist.next_index(index);
        runtime.current_index = next;
        debug!(index = next, "advanced to next media item");
        Some(next)
    }

    fn finish(&self) {
        let Some(shared) = self.shared.upgrade() else {
            return;
        };
        let mut runtime = shared.runtime.borrow_mut();
        if runtime.session == self.session {
            runtime.advancing = false;
            runtime.advance = None;
            info!(index = runtime.current_index, "playlist finished, holding last item");
        }
    }
}
