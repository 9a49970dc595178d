//! Scene file handling
//!
//! A scene file is TOML with an optional `[engine]` table and one
//! `[[entity]]` table per record:
//!
//! ```toml
//! [engine]
//! max_lines = 3
//!
//! [[entity]]
//! id = "verse-1"
//! start_time = 1000.0
//! end_time = 3000.0
//! head_time = 500.0
//! tail_time = 500.0
//! initial_speed = 4.0
//! final_speed = 0.1
//! ```

use anyhow::{Context, Result};
use marquee_animation::{EngineConfig, EntityConfig, Scene};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct SceneFile {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default, rename = "entity")]
    pub entities: Vec<EntityConfig>,
}

impl SceneFile {
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            anyhow::bail!("No scene file found at {}", path.display());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;

        Self::parse(&content).with_context(|| format!("Failed to parse {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        let file: SceneFile = toml::from_str(content)?;
        tracing::debug!(entities = file.entities.len(), "scene file parsed");
        Ok(file)
    }

    /// Validate and link the records against the file's engine defaults
    pub fn build(&self) -> Scene {
        Scene::build(self.entities.iter().cloned(), &self.engine)
    }
}
