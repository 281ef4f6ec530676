use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::scene::Scene;
use crate::ticker::TickerManager;
use crate::Result;

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, info};

#[derive(Default)]
struct GameState {
    scenes: HashMap<String, Arc<Scene>>,
    active: Option<Arc<Scene>>,
}

/// Holds the scenes of a game and tracks which one is active.
///
/// Every scene owns its ticker manager; `ticker_manager` resolves to the
/// manager of the active scene.
pub struct Game {
    config: EngineConfig,
    state: Mutex<GameState>,
}

impl Game {
    /// Creates a game without scenes; new scenes use `config`
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            state: Mutex::new(GameState::default()),
        }
    }

    /// Returns the configuration new scenes are created with
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn lock_state(&self) -> MutexGuard<'_, GameState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Creates a scene and registers it under `name`. The first scene
    /// becomes the active one.
    pub fn create_scene(&self, name: &str) -> Result<Arc<Scene>> {
        let scene = Scene::with_name(name, self.config.clone())?;
        self.add_scene(scene)
    }

    /// Registers an existing scene under its name
    pub fn add_scene(&self, scene: Scene) -> Result<Arc<Scene>> {
        let mut state = self.lock_state();

        if state.scenes.contains_key(scene.name()) {
            return Err(EngineError::Lifecycle(format!("a scene named {} already exists", scene.name())));
        }

        let scene = Arc::new(scene);
        state.scenes.insert(scene.name().to_string(), Arc::clone(&scene));
        if state.active.is_none() {
            state.active = Some(Arc::clone(&scene));
        }

        debug!(scene = %scene.name(), "scene added to game");
        Ok(scene)
    }

    /// Returns the scene registered under `name`
    pub fn scene(&self, name: &str) -> Option<Arc<Scene>> {
        self.lock_state().scenes.get(name).cloned()
    }

    /// Returns the number of scenes
    pub fn scene_count(&self) -> usize {
        self.lock_state().scenes.len()
    }

    /// Makes the scene registered under `name` the active one
    pub fn set_active_scene(&self, name: &str) -> Result<()> {
        let mut state = self.lock_state();
        let scene = state
            .scenes
            .get(name)
            .cloned()
            .ok_or_else(|| EngineError::Lifecycle(format!("no scene named {}", name)))?;

        info!(scene = %name, "active scene changed");
        state.active = Some(scene);
        Ok(())
    }

    /// Returns the active scene
    pub fn active_scene(&self) -> Option<Arc<Scene>> {
        self.lock_state().active.clone()
    }

    /// Returns the ticker manager of the active scene
    pub fn ticker_manager(&self) -> Result<Arc<TickerManager>> {
        self.active_scene()
            .map(|scene| Arc::clone(scene.ticker_manager()))
            .ok_or_else(|| EngineError::Lifecycle("the game has no active scene".to_string()))
    }

    /// Removes a scene and shuts its tickers down
    pub fn remove_scene(&self, name: &str) -> Option<Arc<Scene>> {
        let scene = {
            let mut state = self.lock_state();
            let scene = state.scenes.remove(name)?;
            if state.active.as_ref().map_or(false, |active| Arc::ptr_eq(active, &scene)) {
                state.active = None;
            }
            scene
        };

        scene.shutdown();
        Some(scene)
    }

    /// Shuts every scene down
    pub fn shutdown(&self) {
        let scenes: Vec<Arc<Scene>> = {
            let mut state = self.lock_state();
            state.active = None;
            state.scenes.drain().map(|(_, scene)| scene).collect()
        };

        for scene in scenes {
            scene.shutdown();
        }
    }
}

impl Default for Game {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl std::fmt::Debug for Game {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock_state();
        f.debug_struct("Game")
            .field("scenes", &state.scenes.keys().collect::<Vec<_>>())
            .field("active", &state.active.as_ref().map(|scene| scene.name().to_string()))
            .finish()
    }
}
