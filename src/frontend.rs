use gloo_net::http::Request;
use std::{cell::RefCell, rc::Rc};
use wasm_bindgen_futures::spawn_local;
use web_sys::{window, FocusEvent, HtmlElement, MouseEvent};
use yew::prelude::*;

use crate::browser::{BrowserScheduler, DomContainer};
use crate::player::{Bounds, MediaSequencePlayer, PlayerError, PlayerOptions, PlayerRegistry};
use crate::showcase::{Showcase, ShowcaseError, ShowcaseProject};

const SHOWCASE_URL: &str = "/showcase.json";
const VISUAL_MAX_WIDTH: f64 = 600.0;
const VISUAL_MAX_HEIGHT: f64 = 400.0;

#[derive(Clone)]
struct RegistryHandle(Rc<RefCell<PlayerRegistry>>);

impl PartialEq for RegistryHandle {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl RegistryHandle {
    fn play_exclusive(&self, project_id: &str) {
        match self.0.borrow().play_exclusive(project_id) {
            Ok(true) => {}
            Ok(false) => tracing::debug!(project = %project_id, "no player registered yet"),
            Err(error) => tracing::warn!(project = %project_id, %error, "preview failed to start"),
        }
    }

    fn stop(&self, project_id: &str) {
        self.0.borrow().stop(project_id);
    }
}

#[derive(Clone, PartialEq)]
enum ShowcaseState {
    Loading,
    Ready(Rc<Showcase>),
    Failed(AttrValue),
}

async fn fetch_showcase() -> Result<Showcase, String> {
    let response = Request::get(SHOWCASE_URL)
        .send()
        .await
        .map_err(|error| error.to_string())?;

    if !response.ok() {
        return Err(format!("showcase request failed with status {}", response.status()));
    }

    let raw = response.text().await.map_err(|error| error.to_string())?;
    Showcase::from_json(&raw).map_err(|error: ShowcaseError| error.to_string())
}

fn mount_player(
    element: HtmlElement,
    project: &ShowcaseProject,
    defaults: &PlayerOptions,
) -> Result<MediaSequencePlayer, PlayerError> {
    let items = project.playlist_items().map_err(|error| match error {
        ShowcaseError::Project { source, .. } => source,
        other => PlayerError::invalid_playlist(other.to_string()),
    })?;

    let container = DomContainer::new(
        element,
        Bounds {
            max_width: VISUAL_MAX_WIDTH,
            max_height: VISUAL_MAX_HEIGHT,
        },
    );

    MediaSequencePlayer::create(
        Rc::new(container),
        Rc::new(BrowserScheduler),
        items,
        project.player_config(defaults),
    )
}

#[derive(Properties, PartialEq)]
struct ProjectCardProps {
    project: ShowcaseProject,
    defaults: PlayerOptions,
    registry: RegistryHandle,
}

#[function_component(ProjectCard)]
fn project_card(props: &ProjectCardProps) -> Html {
    let visual_ref = use_node_ref();

    {
        let visual_ref = visual_ref.clone();
        let registry = props.registry.clone();
        let project = props.project.clone();
        let defaults = props.defaults;
        use_effect_with(props.project.id.clone(), move |project_id| {
            let project_id = project_id.clone();

            if let Some(element) = visual_ref.cast::<HtmlElement>() {
                match mount_player(element, &project, &defaults) {
                    Ok(player) => registry.0.borrow_mut().insert(project_id.clone(), player),
                    Err(error) => {
                        tracing::warn!(project = %project_id, %error, "preview player unavailable")
                    }
                }
            }

            move || {
                registry.0.borrow_mut().remove(&project_id);
            }
        });
    }

    let onmouseenter = {
        let registry = props.registry.clone();
        let project_id = props.project.id.clone();
        Callback::from(move |_: MouseEvent| registry.play_exclusive(&project_id))
    };

    let onmouseleave = {
        let registry = props.registry.clone();
        let project_id = props.project.id.clone();
        Callback::from(move |_: MouseEvent| registry.stop(&project_id))
    };

    let onfocus = {
        let registry = props.registry.clone();
        let project_id = props.project.id.clone();
        Callback::from(move |_: FocusEvent| registry.play_exclusive(&project_id))
    };

    let onblur = {
        let registry = props.registry.clone();
        let project_id = props.project.id.clone();
        Callback::from(move |_: FocusEvent| registry.stop(&project_id))
    };

    let heading_id = format!("{}-heading", props.project.id);

    html! {
        <article
            class={classes!("project", props.project.id.clone())}
            tabindex="0"
            aria-labelledby={heading_id.clone()}
            onmouseenter={onmouseenter}
            onmouseleave={onmouseleave}
            onfocus={onfocus}
            onblur={onblur}
        >
            <div class="visual-area" ref={visual_ref} aria-hidden="true"></div>
            <h3 id={heading_id}>{props.project.title.clone()}</h3>
            <p class="muted">{props.project.description.clone()}</p>
        </article>
    }
}

#[function_component(App)]
fn app() -> Html {
    let showcase = use_state(|| ShowcaseState::Loading);
    let registry = RegistryHandle(use_mut_ref(PlayerRegistry::new));

    {
        let showcase = showcase.clone();
        use_effect_with((), move |_| {
            spawn_local(async move {
                match fetch_showcase().await {
                    Ok(loaded) => showcase.set(ShowcaseState::Ready(Rc::new(loaded))),
                    Err(error) => {
                        tracing::warn!(%error, "showcase unavailable");
                        showcase.set(ShowcaseState::Failed(AttrValue::from(error)));
                    }
                }
            });
            || ()
        });
    }

    {
        let registry = registry.clone();
        use_effect_with((), move |_| {
            move || registry.0.borrow_mut().destroy_all()
        });
    }

    let projects = match &*showcase {
        ShowcaseState::Loading => html! { <p class="muted">{"Loading projects…"}</p> },
        ShowcaseState::Failed(error) => html! {
            <p class="muted" role="status">{format!("Projects unavailable: {error}")}</p>
        },
        ShowcaseState::Ready(loaded) => html! {
            <div class="project-list">
                { for loaded.projects.iter().map(|project| html! {
                    <ProjectCard
                        key={project.id.clone()}
                        project={project.clone()}
                        defaults={loaded.defaults}
                        registry={registry.clone()}
                    />
                }) }
            </div>
        },
    };

    html! {
        <>
            <a class="skip-link" href="#content">{"Skip to main content"}</a>
            <div class="page-shell">
                <main id="content">
                    <section aria-labelledby="projects-heading" class="section-block">
                        <h2 id="projects-heading">{"Projects"}</h2>
                        {projects}
                    </section>
                </main>
            </div>
        </>
    }
}

pub fn run() {
    console_error_panic_hook::set_once();
    tracing_wasm::set_as_global_default();

    yew::Renderer::<App>::with_root(
        window()
            .and_then(|w| w.document())
            .and_then(|d| d.get_element_by_id("app"))
            .expect("missing #app mount point"),
    )
    .render();
}
