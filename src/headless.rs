use clap::Parser;
use futures_util::future::{self, FutureExt};
use std::{
    cell::RefCell,
    path::{Path, PathBuf},
    rc::Rc,
    time::Duration,
};
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::player::{
    fit_within, Bounds, Container, Dimensions, MediaChanged, MediaFuture, MediaItem,
    MediaLoadError, MediaSequencePlayer, PlayerError, PlayerRegistry, Scheduler, Stage, Surface,
    VisibilityCallback, VisibilityObserver,
};
use crate::showcase::Showcase;

const DEFAULT_LOG_FILTER: &str = "portfolio_preview=info";
const VISUAL_AREA: Bounds = Bounds {
    max_width: 600.0,
    max_height: 400.0,
};

/// Dry-runs the project previews of a showcase without a browser.
#[derive(Parser, Debug)]
#[command(name = "portfolio-preview", version)]
pub struct Args {
    /// Showcase document listing projects and their media.
    #[arg(long, env = "PREVIEW_SHOWCASE", default_value = "static/showcase.json")]
    pub showcase: PathBuf,

    /// Project to preview; defaults to the first project in the showcase.
    #[arg(long)]
    pub project: Option<String>,

    /// How long to let the preview run before tearing everything down.
    #[arg(long, env = "PREVIEW_RUN_MS", default_value_t = 10_000)]
    pub run_ms: u64,

    /// Simulated length of every video item.
    #[arg(long, env = "PREVIEW_VIDEO_MS", default_value_t = 3_000)]
    pub video_ms: u64,

    /// Directory media paths resolve against; missing files are reported as load failures.
    #[arg(long, env = "PREVIEW_MEDIA_ROOT")]
    pub media_root: Option<PathBuf>,

    /// Simulate the preview scrolling out of view after this many milliseconds.
    #[arg(long)]
    pub hide_after_ms: Option<u64>,
}

pub fn init_tracing() {
    let registry = tracing_subscriber::registry().with(
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
    );

    let json = std::env::var("LOG_FORMAT")
        .map(|value| value.trim().eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

pub async fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let showcase = Showcase::load(&args.showcase)?;
    let scheduler: Rc<dyn Scheduler> = Rc::new(TokioScheduler);
    let mut registry = PlayerRegistry::new();
    let mut containers = Vec::new();

    for project in &showcase.projects {
        let container = Rc::new(HeadlessContainer::new(
            &project.id,
            Duration::from_millis(args.video_ms),
            args.media_root.clone(),
        ));
        let player = MediaSequencePlayer::create(
            container.clone(),
            scheduler.clone(),
            project.playlist_items()?,
            project.player_config(&showcase.defaults),
        )?;
        debug!(
            project = %project.id,
            media = ?player.playlist().iter().map(|item| item.src.as_str()).collect::<Vec<_>>(),
            loop_playlist = player.config().loop_playlist,
            "registered preview"
        );
        registry.insert(project.id.clone(), player);
        containers.push((project.id.clone(), container));
    }

    let project_id = match args.project {
        Some(id) => showcase
            .project(&id)
            .map(|project| project.id.clone())
            .ok_or_else(|| format!("unknown project `{id}`"))?,
        None => showcase
            .projects
            .first()
            .map(|project| project.id.clone())
            .ok_or("showcase has no projects")?,
    };

    registry.play_exclusive(&project_id)?;
    info!(project = %project_id, run_ms = args.run_ms, "preview started");

    let run_for = Duration::from_millis(args.run_ms);
    match args.hide_after_ms.map(Duration::from_millis) {
        Some(hide_after) if hide_after < run_for => {
            tokio::time::sleep(hide_after).await;
            if let Some((_, container)) = containers.iter().find(|(id, _)| *id == project_id) {
                container.set_visible(false);
            }
            tokio::time::sleep(run_for - hide_after).await;
        }
        _ => tokio::time::sleep(run_for).await,
    }

    if let Some(player) = registry.get(&project_id) {
        info!(
            project = %project_id,
            state = player.state().as_str(),
            playing = player.is_playing(),
            advancing = player.is_advancing(),
            visible = player.is_visible(),
            index = player.current_index(),
            "preview finished"
        );
    }
    registry.destroy_all();

    for (id, container) in &containers {
        let summary = container.summary();
        info!(
            project = %id,
            shown = summary.shown,
            failed = summary.failed,
            "preview summary"
        );
    }

    Ok(())
}

pub struct TokioScheduler;

impl Scheduler for TokioScheduler {
    fn sleep(&self, duration: Duration) -> MediaFuture<()> {
        tokio::time::sleep(duration).boxed_local()
    }

    fn spawn(&self, task: MediaFuture<()>) {
        tokio::task::spawn_local(task);
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PreviewSummary {
    pub shown: usize,
    pub failed: usize,
}

struct HeadlessShared {
    project: String,
    video_length: Duration,
    media_root: Option<PathBuf>,
    visibility: RefCell<Option<VisibilityCallback>>,
    summary: RefCell<PreviewSummary>,
}

/// Logs what a browser container would render.
pub struct HeadlessContainer {
    shared: Rc<HeadlessShared>,
}

impl HeadlessContainer {
    pub fn new(project: &str, video_length: Duration, media_root: Option<PathBuf>) -> Self {
        Self {
            shared: Rc::new(HeadlessShared {
                project: project.to_string(),
                video_length,
                media_root,
                visibility: RefCell::new(None),
                summary: RefCell::new(PreviewSummary::default()),
            }),
        }
    }

    pub fn set_visible(&self, visible: bool) {
        info!(project = %self.shared.project, visible, "visibility changed");
        if let Some(callback) = self.shared.visibility.borrow().as_ref() {
            callback(visible);
        }
    }

    pub fn summary(&self) -> PreviewSummary {
        *self.shared.summary.borrow()
    }
}

impl Container for HeadlessContainer {
    fn mount_stage(&self, fade_duration: Duration) -> Result<Box<dyn Stage>, PlayerError> {
        debug!(
            project = %self.shared.project,
            ?fade_duration,
            "mounting headless stage"
        );
        Ok(Box::new(HeadlessStage {
            shared: self.shared.clone(),
        }))
    }

    fn observe_visibility(&self, on_change: VisibilityCallback) -> Box<dyn VisibilityObserver> {
        *self.shared.visibility.borrow_mut() = Some(on_change);
        Box::new(HeadlessObserver {
            shared: self.shared.clone(),
        })
    }

    fn media_changed(&self, event: &MediaChanged) {
        self.shared.summary.borrow_mut().shown += 1;
        let fitted = event.native.and_then(|native| fit_within(native, VISUAL_AREA));
        info!(
            project = %self.shared.project,
            index = event.item_index,
            is_video = event.is_video(),
            is_image = event.is_image(),
            native_width = event.native_width(),
            native_height = event.native_height(),
            fitted_width = fitted.map(|size| size.width),
            fitted_height = fitted.map(|size| size.height),
            "media changed"
        );
    }

    fn playing_changed(&self, playing: bool) {
        debug!(project = %self.shared.project, playing, "playing indicator");
    }

    fn media_failed(&self, error: &MediaLoadError) {
        self.shared.summary.borrow_mut().failed += 1;
        warn!(project = %self.shared.project, %error, "media error overlay");
    }
}

struct HeadlessObserver {
    shared: Rc<HeadlessShared>,
}

impl VisibilityObserver for HeadlessObserver {
    fn disconnect(&self) {
        self.shared.visibility.borrow_mut().take();
    }
}

struct HeadlessStage {
    shared: Rc<HeadlessShared>,
}

impl HeadlessStage {
    fn check_exists(&self, item: &MediaItem) -> Result<Option<Dimensions>, MediaLoadError> {
        let Some(root) = self.shared.media_root.as_deref() else {
            return Ok(None);
        };

        let path = resolve_media_path(root, &item.src);
        if path.is_file() {
            Ok(None)
        } else {
            Err(MediaLoadError::new(
                item.kind,
                item.src.clone(),
                format!("not found at {}", path.display()),
            ))
        }
    }
}

impl Stage for HeadlessStage {
    fn set_opacity(&self, surface: Surface, opacity: f32) {
        debug!(project = %self.shared.project, ?surface, opacity, "surface opacity");
    }

    fn load(&self, item: &MediaItem) -> MediaFuture<Result<Option<Dimensions>, MediaLoadError>> {
        future::ready(self.check_exists(item)).boxed_local()
    }

    fn play_video(&self) -> MediaFuture<()> {
        tokio::time::sleep(self.shared.video_length).boxed_local()
    }

    fn pause_video(&self) {
        debug!(project = %self.shared.project, "video paused");
    }

    fn rewind_video(&self) {
        debug!(project = %self.shared.project, "video rewound");
    }

    fn release(&self) {
        debug!(project = %self.shared.project, "stage released");
    }
}

fn resolve_media_path(root: &Path, src: &str) -> PathBuf {
    let relative = src.split(['?', '#']).next().unwrap_or(src).trim_start_matches('/');
    root.join(relative)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::{LifecycleState, PlayerConfig};
    use tokio::task::LocalSet;

    #[test]
    fn media_paths_resolve_under_root() {
        let root = Path::new("/srv/site");
        assert_eq!(
            resolve_media_path(root, "/media/reptify/intro.mp4?v=2"),
            PathBuf::from("/srv/site/media/reptify/intro.mp4")
        );
        assert_eq!(
            resolve_media_path(root, "media/a.png"),
            PathBuf::from("/srv/site/media/a.png")
        );
    }

    #[test]
    fn args_parse_with_defaults() {
        let args = Args::try_parse_from(["portfolio-preview", "--project", "reptify"])
            .expect("valid args");

        assert_eq!(args.project.as_deref(), Some("reptify"));
        assert_eq!(args.video_ms, 3_000);
        assert_eq!(args.hide_after_ms, None);
    }

    #[tokio::test(start_paused = true)]
    async fn unknown_project_is_rejected_before_playback() {
        let path = std::env::temp_dir().join("portfolio-preview-unknown-project.json");
        std::fs::write(
            &path,
            r#"{"projects": [{"id": "reptify", "title": "Reptify", "media": ["a.png"]}]}"#,
        )
        .expect("showcase written");

        let args = Args::try_parse_from([
            "portfolio-preview",
            "--showcase",
            path.to_str().expect("utf-8 path"),
            "--project",
            "aeolis",
        ])
        .expect("valid args");

        let error = LocalSet::new()
            .run_until(run(args))
            .await
            .expect_err("unknown project fails");
        assert_eq!(error.to_string(), "unknown project `aeolis`");
    }

    #[tokio::test(start_paused = true)]
    async fn missing_media_is_counted_as_failed_and_skipped() {
        LocalSet::new()
            .run_until(async {
                let root = std::env::temp_dir().join("portfolio-preview-missing-media");
                let container = Rc::new(HeadlessContainer::new(
                    "reptify",
                    Duration::from_millis(1_000),
                    Some(root),
                ));
                let player = MediaSequencePlayer::create(
                    container.clone(),
                    Rc::new(TokioScheduler),
                    vec![MediaItem::image("/a.png"), MediaItem::video("/b.mp4")],
                    PlayerConfig::default(),
                )
                .expect("player is created");

                player.play().expect("plays");
                tokio::time::sleep(Duration::from_millis(2_000)).await;

                assert_eq!(player.current_index(), 1);
                assert_eq!(
                    container.summary(),
                    PreviewSummary {
                        shown: 2,
                        failed: 2
                    }
                );

                container.set_visible(false);
                assert_eq!(player.state(), LifecycleState::Paused);
            })
            .await;
    }
}
