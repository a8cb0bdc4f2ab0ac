use futures_util::future::{FutureExt, LocalBoxFuture};
use js_sys::{Array, Function, Promise};
use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
    time::Duration,
};
use tracing::{debug, warn};
use wasm_bindgen::{closure::Closure, JsCast, JsValue};
use wasm_bindgen_futures::{spawn_local, JsFuture};
use web_sys::{
    window, Document, EventTarget, HtmlElement, HtmlImageElement, HtmlVideoElement,
    IntersectionObserver, IntersectionObserverEntry, IntersectionObserverInit,
};

use crate::player::{
    fit_within, Bounds, Container, Dimensions, MediaChanged, MediaFuture, MediaItem, MediaKind,
    MediaLoadError, PlayerError, Scheduler, Stage, Surface, VisibilityCallback,
    VisibilityObserver,
};

const VISIBILITY_THRESHOLD: f64 = 0.1;
const ERROR_OVERLAY_MS: u64 = 3_000;
const PLAYING_CLASS: &str = "playing";
const VIDEO_READY_EVENTS: &[&str] = &["canplaythrough", "error"];
const VIDEO_END_EVENTS: &[&str] = &["ended", "error"];
const IMAGE_READY_EVENTS: &[&str] = &["load", "error"];

fn js_error(value: JsValue) -> String {
    value
        .as_string()
        .unwrap_or_else(|| format!("{value:?}"))
}

fn document() -> Option<Document> {
    window()?.document()
}

/// A `setTimeout` that is cleared when dropped before firing.
pub struct Timeout {
    handle: Option<i32>,
    fired: LocalBoxFuture<'static, Result<JsValue, JsValue>>,
}

impl Timeout {
    pub fn new(duration: Duration) -> Self {
        let millis = i32::try_from(duration.as_millis()).unwrap_or(i32::MAX);
        let mut handle = None;
        let promise = Promise::new(&mut |resolve: Function, _reject: Function| {
            handle = window().and_then(|w| {
                w.set_timeout_with_callback_and_timeout_and_arguments_0(&resolve, millis)
                    .ok()
            });
            if handle.is_none() {
                let _ = resolve.call0(&JsValue::NULL);
            }
        });

        Self {
            handle,
            fired: JsFuture::from(promise).boxed_local(),
        }
    }
}

impl Future for Timeout {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        match self.fired.poll_unpin(cx) {
            Poll::Ready(_) => {
                self.handle = None;
                Poll::Ready(())
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl Drop for Timeout {
    fn drop(&mut self) {
        if let (Some(handle), Some(w)) = (self.handle.take(), window()) {
            w.clear_timeout_with_handle(handle);
        }
    }
}

/// Resolves on the first of `events` fired at `target`; listeners are removed on drop.
struct EventWait {
    target: EventTarget,
    events: &'static [&'static str],
    listener: Option<Function>,
    fired: LocalBoxFuture<'static, Result<JsValue, JsValue>>,
}

impl EventWait {
    fn new(target: &EventTarget, events: &'static [&'static str]) -> Self {
        let mut listener = None;
        let promise = Promise::new(&mut |resolve: Function, _reject: Function| {
            for event in events {
                let _ = target.add_event_listener_with_callback(event, &resolve);
            }
            listener = Some(resolve);
        });

        Self {
            target: target.clone(),
            events,
            listener,
            fired: JsFuture::from(promise).boxed_local(),
        }
    }
}

impl Future for EventWait {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        self.fired.poll_unpin(cx).map(|_| ())
    }
}

impl Drop for EventWait {
    fn drop(&mut self) {
        if let Some(listener) = self.listener.take() {
            for event in self.events {
                let _ = self
                    .target
                    .remove_event_listener_with_callback(event, &listener);
            }
        }
    }
}

pub struct BrowserScheduler;

impl Scheduler for BrowserScheduler {
    fn sleep(&self, duration: Duration) -> MediaFuture<()> {
        Timeout::new(duration).boxed_local()
    }

    fn spawn(&self, task: MediaFuture<()>) {
        spawn_local(task);
    }
}

/// The visual area of one project card.
pub struct DomContainer {
    element: HtmlElement,
    bounds: Bounds,
}

impl DomContainer {
    pub fn new(element: HtmlElement, bounds: Bounds) -> Self {
        Self { element, bounds }
    }

    fn create_surface<T: JsCast>(&self, tag: &str, css: &str) -> Result<T, PlayerError> {
        let document = document().ok_or_else(|| PlayerError::mount("no document"))?;
        let element = document
            .create_element(tag)
            .map_err(|error| PlayerError::mount(js_error(error)))?
            .dyn_into::<HtmlElement>()
            .map_err(|_| PlayerError::mount(format!("<{tag}> is not an HTML element")))?;
        element.style().set_css_text(css);

        element
            .dyn_into::<T>()
            .map_err(|_| PlayerError::mount(format!("unexpected element type for <{tag}>")))
    }

    fn show_error_overlay(&self) {
        let Some(document) = document() else {
            return;
        };
        let Ok(overlay) = document.create_element("div") else {
            return;
        };

        overlay.set_class_name("media-error");
        overlay.set_text_content(Some("Media Error: unable to load media file"));
        if self.element.append_child(&overlay).is_err() {
            return;
        }

        spawn_local(async move {
            Timeout::new(Duration::from_millis(ERROR_OVERLAY_MS)).await;
            overlay.remove();
        });
    }
}

impl Container for DomContainer {
    fn mount_stage(&self, fade_duration: Duration) -> Result<Box<dyn Stage>, PlayerError> {
        let fade_ms = fade_duration.as_millis();
        let video: HtmlVideoElement = self.create_surface(
            "video",
            &format!(
                "position: absolute; inset: 0; width: 100%; height: 100%; object-fit: cover; \
                 opacity: 0; transition: opacity {fade_ms}ms ease; z-index: 2; border-radius: 6px;"
            ),
        )?;
        let image: HtmlImageElement = self.create_surface(
            "img",
            &format!(
                "position: absolute; inset: 0; width: 100%; height: 100%; object-fit: contain; \
                 opacity: 0; transition: opacity {fade_ms}ms ease; z-index: 1; border-radius: 6px;"
            ),
        )?;

        video.set_muted(true);
        video.set_loop(false);
        video.set_controls(false);
        video.set_preload("none");
        let _ = video.set_attribute("playsinline", "");
        let _ = video.set_attribute("disablepictureinpicture", "");
        image.set_alt("");

        self.element
            .append_child(&image)
            .and_then(|_| self.element.append_child(&video))
            .map_err(|error| PlayerError::mount(js_error(error)))?;

        Ok(Box::new(DomStage { video, image }))
    }

    fn observe_visibility(&self, on_change: VisibilityCallback) -> Box<dyn VisibilityObserver> {
        let callback = Closure::<dyn FnMut(Array, IntersectionObserver)>::new(
            move |entries: Array, _observer: IntersectionObserver| {
                for entry in entries.iter() {
                    if let Ok(entry) = entry.dyn_into::<IntersectionObserverEntry>() {
                        on_change(entry.is_intersecting());
                    }
                }
            },
        );

        let options = IntersectionObserverInit::new();
        options.set_threshold(&JsValue::from_f64(VISIBILITY_THRESHOLD));

        match IntersectionObserver::new_with_options(callback.as_ref().unchecked_ref(), &options) {
            Ok(observer) => {
                observer.observe(&self.element);
                Box::new(DomVisibilityObserver {
                    observer,
                    _callback: callback,
                })
            }
            Err(error) => {
                warn!(error = %js_error(error), "intersection observer unavailable");
                Box::new(NoopObserver)
            }
        }
    }

    fn media_changed(&self, event: &MediaChanged) {
        let Some(fitted) = event.native.and_then(|native| fit_within(native, self.bounds)) else {
            return;
        };

        let style = self.element.style();
        let _ = style.set_property("width", &format!("{:.0}px", fitted.width));
        let _ = style.set_property("height", &format!("{:.0}px", fitted.height));
        debug!(
            index = event.item_index,
            width = fitted.width,
            height = fitted.height,
            "visual area resized"
        );
    }

    fn playing_changed(&self, playing: bool) {
        let Some(parent) = self.element.parent_element() else {
            return;
        };

        let classes = parent.class_list();
        let _ = if playing {
            classes.add_1(PLAYING_CLASS)
        } else {
            classes.remove_1(PLAYING_CLASS)
        };
    }

    fn media_failed(&self, _error: &MediaLoadError) {
        self.show_error_overlay();
    }
}

struct DomVisibilityObserver {
    observer: IntersectionObserver,
    _callback: Closure<dyn FnMut(Array, IntersectionObserver)>,
}

impl VisibilityObserver for DomVisibilityObserver {
    fn disconnect(&self) {
        self.observer.disconnect();
    }
}

struct NoopObserver;

impl VisibilityObserver for NoopObserver {
    fn disconnect(&self) {}
}

struct DomStage {
    video: HtmlVideoElement,
    image: HtmlImageElement,
}

impl Stage for DomStage {
    fn set_opacity(&self, surface: Surface, opacity: f32) {
        let element: &HtmlElement = match surface {
            Surface::Video => self.video.as_ref(),
            Surface::Image => self.image.as_ref(),
        };
        let _ = element.style().set_property("opacity", &opacity.to_string());
    }

    fn load(&self, item: &MediaItem) -> MediaFuture<Result<Option<Dimensions>, MediaLoadError>> {
        let kind = item.kind;
        let src = item.src.clone();

        match kind {
            MediaKind::Video => {
                let video = self.video.clone();
                let ready = EventWait::new(&video, VIDEO_READY_EVENTS);
                video.set_preload("auto");
                video.set_src(&src);
                video.load();

                async move {
                    ready.await;
                    if let Some(error) = video.error() {
                        return Err(MediaLoadError::new(
                            kind,
                            src,
                            format!("media error code {}", error.code()),
                        ));
                    }
                    Ok(Dimensions::known(video.video_width(), video.video_height()))
                }
                .boxed_local()
            }
            MediaKind::Image => {
                let image = self.image.clone();
                let ready = EventWait::new(&image, IMAGE_READY_EVENTS);
                image.set_src(&src);

                async move {
                    ready.await;
                    if image.natural_width() == 0 {
                        return Err(MediaLoadError::new(kind, src, "image failed to decode"));
                    }
                    Ok(Dimensions::known(image.natural_width(), image.natural_height()))
                }
                .boxed_local()
            }
        }
    }

    fn play_video(&self) -> MediaFuture<()> {
        let video = self.video.clone();
        let ended = EventWait::new(&video, VIDEO_END_EVENTS);

        async move {
            let started = match video.play() {
                Ok(promise) => JsFuture::from(promise).await.map(|_| ()),
                Err(error) => Err(error),
            };
            if let Err(error) = started {
                warn!(error = %js_error(error), "video playback was refused");
                return;
            }
            ended.await;
        }
        .boxed_local()
    }

    fn pause_video(&self) {
        let _ = self.video.pause();
    }

    fn rewind_video(&self) {
        self.video.set_current_time(0.0);
    }

    fn release(&self) {
        let _ = self.video.pause();
        let _ = self.video.remove_attribute("src");
        self.video.load();
        self.video.remove();

        let _ = self.image.remove_attribute("src");
        self.image.remove();
    }
}
