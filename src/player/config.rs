use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_FADE_DURATION_MS: u64 = 500;
pub const DEFAULT_GAP_DURATION_MS: u64 = 200;
pub const DEFAULT_LOOP_PLAYLIST: bool = true;
pub const DEFAULT_IMAGE_DISPLAY_MS: u64 = 1_500;

const FADE_DURATION_MS_BOUNDS: (u64, u64) = (0, 10_000);
const GAP_DURATION_MS_BOUNDS: (u64, u64) = (0, 60_000);
const IMAGE_DISPLAY_MS_BOUNDS: (u64, u64) = (100, 600_000);

/// Player options as written by a host. Every field is optional; unknown keys are ignored.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fade_duration_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gap_duration_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loop_playlist: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_display_ms: Option<u64>,
}

impl PlayerOptions {
    /// Fills every unset field from `fallback`.
    pub fn or(self, fallback: &Self) -> Self {
        Self {
            fade_duration_ms: self.fade_duration_ms.or(fallback.fade_duration_ms),
            gap_duration_ms: self.gap_duration_ms.or(fallback.gap_duration_ms),
            loop_playlist: self.loop_playlist.or(fallback.loop_playlist),
            image_display_ms: self.image_display_ms.or(fallback.image_display_ms),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PlayerConfig {
    pub fade_duration: Duration,
    pub gap_duration: Duration,
    pub loop_playlist: bool,
    pub image_display: Duration,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            fade_duration: Duration::from_millis(DEFAULT_FADE_DURATION_MS),
            gap_duration: Duration::from_millis(DEFAULT_GAP_DURATION_MS),
            loop_playlist: DEFAULT_LOOP_PLAYLIST,
            image_display: Duration::from_millis(DEFAULT_IMAGE_DISPLAY_MS),
        }
    }
}

impl PlayerConfig {
    /// Merges `options` over the defaults. Out-of-bounds values keep the default.
    pub fn from_options(options: &PlayerOptions) -> Self {
        let fade_duration_ms = millis_with_bounds(
            options.fade_duration_ms,
            DEFAULT_FADE_DURATION_MS,
            FADE_DURATION_MS_BOUNDS,
        );
        let gap_duration_ms = millis_with_bounds(
            options.gap_duration_ms,
            DEFAULT_GAP_DURATION_MS,
            GAP_DURATION_MS_BOUNDS,
        );
        let image_display_ms = millis_with_bounds(
            options.image_display_ms,
            DEFAULT_IMAGE_DISPLAY_MS,
            IMAGE_DISPLAY_MS_BOUNDS,
        );

        Self {
            fade_duration: Duration::from_millis(fade_duration_ms),
            gap_duration: Duration::from_millis(gap_duration_ms),
            loop_playlist: options.loop_playlist.unwrap_or(DEFAULT_LOOP_PLAYLIST),
            image_display: Duration::from_millis(image_display_ms),
        }
    }
}

fn millis_with_bounds(value: Option<u64>, default: u64, bounds: (u64, u64)) -> u64 {
    value
        .filter(|value| (bounds.0..=bounds.1).contains(value))
        .unwrap_or(default)
}
