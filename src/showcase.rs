use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::player::{MediaEntry, MediaItem, PlayerConfig, PlayerError, PlayerOptions};

#[derive(thiserror::Error, Debug)]
pub enum ShowcaseError {
    #[error("failed to read showcase: {0}")]
    Read(#[from] std::io::Error),

    #[error("failed to parse showcase: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("duplicate project id `{0}`")]
    DuplicateProject(String),

    #[error("project `{id}`: {source}")]
    Project {
        id: String,
        #[source]
        source: PlayerError,
    },
}

/// The projects a portfolio page previews, as served in `showcase.json`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Showcase {
    #[serde(default)]
    pub defaults: PlayerOptions,
    pub projects: Vec<ShowcaseProject>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShowcaseProject {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub media: Vec<MediaEntry>,
    #[serde(default)]
    pub player: PlayerOptions,
}

impl ShowcaseProject {
    pub fn playlist_items(&self) -> Result<Vec<MediaItem>, ShowcaseError> {
        let items = self
            .media
            .iter()
            .map(MediaItem::try_from)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|source| self.error(source))?;

        if items.is_empty() {
            return Err(self.error(PlayerError::invalid_playlist("playlist has no media items")));
        }

        Ok(items)
    }

    pub fn player_config(&self, defaults: &PlayerOptions) -> PlayerConfig {
        PlayerConfig::from_options(&self.player.or(defaults))
    }

    fn error(&self, source: PlayerError) -> ShowcaseError {
        ShowcaseError::Project {
            id: self.id.clone(),
            source,
        }
    }
}

impl Showcase {
    pub fn from_json(raw: &str) -> Result<Self, ShowcaseError> {
        let showcase: Self = serde_json::from_str(raw)?;
        showcase.validate()?;
        Ok(showcase)
    }

    #[cfg(not(target_arch = "wasm32"))]
    pub fn load(path: &std::path::Path) -> Result<Self, ShowcaseError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    pub fn project(&self, id: &str) -> Option<&ShowcaseProject> {
        self.projects.iter().find(|project| project.id == id)
    }

    fn validate(&self) -> Result<(), ShowcaseError> {
        let mut seen = HashSet::new();
        for project in &self.projects {
            if !seen.insert(project.id.as_str()) {
                return Err(ShowcaseError::DuplicateProject(project.id.clone()));
            }
            project.playlist_items()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::MediaKind;
    use std::time::Duration;

    const SHOWCASE: &str = r#"{
        "defaults": { "imageDisplayMs": 2000 },
        "projects": [
            {
                "id": "reptify",
                "title": "Reptify",
                "description": "Reptile husbandry tracker.",
                "media": ["/media/reptify/intro.mp4", "/media/reptify/dashboard.png"],
                "player": { "gapDurationMs": 100 }
            },
            {
                "id": "attackvector",
                "title": "AttackVector",
                "media": [{ "kind": "video", "src": "/media/attackvector/stream" }],
                "player": { "loopPlaylist": false, "imageDisplayMs": 900 }
            }
        ]
    }"#;

    #[test]
    fn parses_projects_and_classifies_media() {
        let showcase = Showcase::from_json(SHOWCASE).expect("valid showcase");

        assert_eq!(showcase.projects.len(), 2);
        let reptify = showcase.project("reptify").expect("project exists");
        let items = reptify.playlist_items().expect("valid playlist");
        assert_eq!(items[0].kind, MediaKind::Video);
        assert_eq!(items[1].kind, MediaKind::Image);

        let attack = showcase.project("attackvector").expect("project exists");
        assert_eq!(attack.description, "");
        assert_eq!(
            attack.playlist_items().expect("valid playlist"),
            vec![MediaItem::video("/media/attackvector/stream")]
        );
    }

    #[test]
    fn project_options_override_showcase_defaults() {
        let showcase = Showcase::from_json(SHOWCASE).expect("valid showcase");

        let reptify = showcase
            .project("reptify")
            .expect("project exists")
            .player_config(&showcase.defaults);
        assert_eq!(reptify.image_display, Duration::from_millis(2_000));
        assert_eq!(reptify.gap_duration, Duration::from_millis(100));
        assert!(reptify.loop_playlist);

        let attack = showcase
            .project("attackvector")
            .expect("project exists")
            .player_config(&showcase.defaults);
        assert_eq!(attack.image_display, Duration::from_millis(900));
        assert!(!attack.loop_playlist);
    }

    #[test]
    fn duplicate_project_ids_are_rejected() {
        let raw = r#"{"projects": [
            {"id": "megaherb", "title": "A", "media": ["a.png"]},
            {"id": "megaherb", "title": "B", "media": ["b.png"]}
        ]}"#;

        let result = Showcase::from_json(raw);
        assert!(matches!(result, Err(ShowcaseError::DuplicateProject(id)) if id == "megaherb"));
    }

    #[test]
    fn invalid_playlists_name_the_project() {
        let empty = r#"{"projects": [{"id": "aeolis", "title": "Aeolis", "media": []}]}"#;
        let error = Showcase::from_json(empty).expect_err("empty playlist fails");
        assert_eq!(
            error.to_string(),
            "project `aeolis`: invalid playlist: playlist has no media items"
        );

        let unsupported = r#"{"projects": [{"id": "aeolis", "title": "Aeolis", "media": ["notes.txt"]}]}"#;
        let error = Showcase::from_json(unsupported).expect_err("unsupported media fails");
        assert!(matches!(
            error,
            ShowcaseError::Project {
                source: PlayerError::UnsupportedMedia { .. },
                ..
            }
        ));
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        let result = Showcase::from_json("{\"projects\": ");
        assert!(matches!(result, Err(ShowcaseError::Parse(_))));
    }
}
