use futures_util::future::{self, FutureExt};
use std::{
    cell::{Cell, RefCell},
    collections::{HashMap, HashSet},
    future::Future,
    rc::Rc,
    time::Duration,
};
use tokio::{task::LocalSet, time::Instant};

use crate::player::{
    Container, Dimensions, MediaChanged, MediaFuture, MediaItem, MediaKind, MediaLoadError,
    PlayerError, Scheduler, Stage, Surface, VisibilityCallback, VisibilityObserver, OPAQUE,
};

pub const VIDEO_SIZE: Dimensions = Dimensions {
    width: 1920,
    height: 1080,
};
pub const IMAGE_SIZE: Dimensions = Dimensions {
    width: 800,
    height: 600,
};

pub async fn run_local<F: Future>(future: F) -> F::Output {
    LocalSet::new().run_until(future).await
}

pub async fn advance_ms(millis: u64) {
    tokio::time::sleep(Duration::from_millis(millis)).await;
}

pub struct TokioTestScheduler;

impl Scheduler for TokioTestScheduler {
    fn sleep(&self, duration: Duration) -> MediaFuture<()> {
        tokio::time::sleep(duration).boxed_local()
    }

    fn spawn(&self, task: MediaFuture<()>) {
        tokio::task::spawn_local(task);
    }
}

pub fn scheduler() -> Rc<dyn Scheduler> {
    Rc::new(TokioTestScheduler)
}

#[derive(Clone, Debug, PartialEq)]
pub enum StageEvent {
    Opacity(Surface, f32),
    Load(String),
    PlayVideo,
    PauseVideo,
    RewindVideo,
    Release,
}

struct FakeState {
    origin: Instant,
    video_length: Duration,
    load_delay: Cell<Duration>,
    failing: RefCell<HashSet<String>>,
    events: RefCell<Vec<(Duration, StageEvent)>>,
    opacity: RefCell<HashMap<Surface, f32>>,
    changes: RefCell<Vec<(Duration, MediaChanged)>>,
    failures: RefCell<Vec<MediaLoadError>>,
    playing: RefCell<Vec<bool>>,
    visibility: RefCell<Option<VisibilityCallback>>,
    disconnected: Cell<bool>,
    mounts: Cell<usize>,
}

impl FakeState {
    fn elapsed(&self) -> Duration {
        Instant::now().duration_since(self.origin)
    }

    fn record(&self, event: StageEvent) {
        self.events.borrow_mut().push((self.elapsed(), event));
    }
}

/// Records everything a player does to its container and stage.
pub struct FakeContainer {
    state: Rc<FakeState>,
}

impl FakeContainer {
    pub fn new(video_length: Duration) -> Rc<Self> {
        Rc::new(Self {
            state: Rc::new(FakeState {
                origin: Instant::now(),
                video_length,
                load_delay: Cell::new(Duration::ZERO),
                failing: RefCell::new(HashSet::new()),
                events: RefCell::new(Vec::new()),
                opacity: RefCell::new(HashMap::new()),
                changes: RefCell::new(Vec::new()),
                failures: RefCell::new(Vec::new()),
                playing: RefCell::new(Vec::new()),
                visibility: RefCell::new(None),
                disconnected: Cell::new(false),
                mounts: Cell::new(0),
            }),
        })
    }

    pub fn fail_loading(&self, src: &str) {
        self.state.failing.borrow_mut().insert(src.to_string());
    }

    /// Every later `load` stays pending for `delay` before resolving.
    pub fn load_delay(&self, delay: Duration) {
        self.state.load_delay.set(delay);
    }

    pub fn set_visible(&self, visible: bool) {
        if self.state.disconnected.get() {
            return;
        }
        if let Some(callback) = self.state.visibility.borrow().as_ref() {
            callback(visible);
        }
    }

    pub fn events(&self) -> Vec<(Duration, StageEvent)> {
        self.state.events.borrow().clone()
    }

    pub fn event_count(&self) -> usize {
        self.state.events.borrow().len()
    }

    pub fn has_event(&self, event: &StageEvent) -> bool {
        self.state
            .events
            .borrow()
            .iter()
            .any(|(_, recorded)| recorded == event)
    }

    pub fn changes(&self) -> Vec<(Duration, MediaChanged)> {
        self.state.changes.borrow().clone()
    }

    pub fn changed_indices(&self) -> Vec<usize> {
        self.state
            .changes
            .borrow()
            .iter()
            .map(|(_, change)| change.item_index)
            .collect()
    }

    pub fn failures(&self) -> Vec<MediaLoadError> {
        self.state.failures.borrow().clone()
    }

    pub fn playing_signals(&self) -> Vec<bool> {
        self.state.playing.borrow().clone()
    }

    pub fn opaque_surfaces(&self) -> Vec<Surface> {
        let mut opaque: Vec<Surface> = self
            .state
            .opacity
            .borrow()
            .iter()
            .filter(|(_, opacity)| **opacity >= OPAQUE)
            .map(|(surface, _)| *surface)
            .collect();
        opaque.sort_by_key(|surface| matches!(surface, Surface::Image));
        opaque
    }

    pub fn is_disconnected(&self) -> bool {
        self.state.disconnected.get()
    }

    pub fn mounts(&self) -> usize {
        self.state.mounts.get()
    }
}

impl Container for FakeContainer {
    fn mount_stage(&self, _fade_duration: Duration) -> Result<Box<dyn Stage>, PlayerError> {
        self.state.mounts.set(self.state.mounts.get() + 1);
        Ok(Box::new(FakeStage {
            state: self.state.clone(),
        }))
    }

    fn observe_visibility(&self, on_change: VisibilityCallback) -> Box<dyn VisibilityObserver> {
        *self.state.visibility.borrow_mut() = Some(on_change);
        Box::new(FakeObserver {
            state: self.state.clone(),
        })
    }

    fn media_changed(&self, event: &MediaChanged) {
        self.state
            .changes
            .borrow_mut()
            .push((self.state.elapsed(), event.clone()));
    }

    fn playing_changed(&self, playing: bool) {
        self.state.playing.borrow_mut().push(playing);
    }

    fn media_failed(&self, error: &MediaLoadError) {
        self.state.failures.borrow_mut().push(error.clone());
    }
}

struct FakeObserver {
    state: Rc<FakeState>,
}

impl VisibilityObserver for FakeObserver {
    fn disconnect(&self) {
        self.state.disconnected.set(true);
    }
}

struct FakeStage {
    state: Rc<FakeState>,
}

impl Stage for FakeStage {
    fn set_opacity(&self, surface: Surface, opacity: f32) {
        self.state.opacity.borrow_mut().insert(surface, opacity);
        self.state.record(StageEvent::Opacity(surface, opacity));
    }

    fn load(&self, item: &MediaItem) -> MediaFuture<Result<Option<Dimensions>, MediaLoadError>> {
        self.state.record(StageEvent::Load(item.src.clone()));

        let result = if self.state.failing.borrow().contains(&item.src) {
            Err(MediaLoadError::new(item.kind, item.src.clone(), "simulated failure"))
        } else {
            Ok(Some(match item.kind {
                MediaKind::Video => VIDEO_SIZE,
                MediaKind::Image => IMAGE_SIZE,
            }))
        };
        let delay = self.state.load_delay.get();
        if delay.is_zero() {
            return future::ready(result).boxed_local();
        }

        async move {
            tokio::time::sleep(delay).await;
            result
        }
        .boxed_local()
    }

    fn play_video(&self) -> MediaFuture<()> {
        self.state.record(StageEvent::PlayVideo);
        tokio::time::sleep(self.state.video_length).boxed_local()
    }

    fn pause_video(&self) {
        self.state.record(StageEvent::PauseVideo);
    }

    fn rewind_video(&self) {
        self.state.record(StageEvent::RewindVideo);
    }

    fn release(&self) {
        self.state.record(StageEvent::Release);
    }
}
