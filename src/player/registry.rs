use std::collections::HashMap;
use tracing::{debug, info};

use crate::player::{error::PlayerError, MediaSequencePlayer};

/// Players of one page, keyed by project id. Owned by the page controller.
#[derive(Default)]
pub struct PlayerRegistry {
    players: HashMap<String, MediaSequencePlayer>,
}

impl PlayerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a player; a player already registered under the same id is destroyed.
    pub fn insert(&mut self, project_id: impl Into<String>, player: MediaSequencePlayer) {
        let project_id = project_id.into();
        if let Some(previous) = self.players.insert(project_id.clone(), player) {
            debug!(project = %project_id, "replacing registered player");
            previous.destroy();
        }
    }

    pub fn get(&self, project_id: &str) -> Option<&MediaSequencePlayer> {
        self.players.get(project_id)
    }

    pub fn contains(&self, project_id: &str) -> bool {
        self.players.contains_key(project_id)
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.players.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    /// Returns `false` when no player is registered under `project_id`.
    pub fn play(&self, project_id: &str) -> Result<bool, PlayerError> {
        let Some(player) = self.players.get(project_id) else {
            return Ok(false);
        };

        player.play()?;
        Ok(true)
    }

    /// Stops every other project's preview, then plays this one.
    pub fn play_exclusive(&self, project_id: &str) -> Result<bool, PlayerError> {
        if !self.contains(project_id) {
            return Ok(false);
        }

        for (id, player) in &self.players {
            if id != project_id {
                player.stop();
            }
        }

        self.play(project_id)
    }

    #[cfg(any(target_arch = "wasm32", test))]
    pub fn stop(&self, project_id: &str) -> bool {
        match self.players.get(project_id) {
            Some(player) => {
                player.stop();
                true
            }
            None => false,
        }
    }

    #[cfg(any(target_arch = "wasm32", test))]
    pub fn remove(&mut self, project_id: &str) -> bool {
        match self.players.remove(project_id) {
            Some(player) => {
                player.destroy();
                true
            }
            None => false,
        }
    }

    /// Tears down every player, as before leaving the page.
    pub fn destroy_all(&mut self) {
        let count = self.players.len();
        for (_, player) in self.players.drain() {
            player.destroy();
        }
        if count > 0 {
            info!(count, "destroyed all registered players");
        }
    }
}

impl Drop for PlayerRegistry {
    fn drop(&mut self) {
        self.destroy_all();
    }
}
