use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::constants::*;
use crate::error::SettingsError;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct EngineSettings {
    #[serde(default)]
    pub world: WorldSettings,
    #[serde(default)]
    pub lighting: LightingSettings,
    #[serde(default)]
    pub liquid: LiquidSettings,
    #[serde(default)]
    pub update: UpdateSettings,
    #[serde(default)]
    pub store: StoreSettings,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct WorldSettings {
    pub seed: u32,
    pub sea_level: i32,
    /// Use the flat generator instead of noise terrain.
    pub flat: bool,
    /// Chunks within this distance (in chunks) of the focus are kept loaded.
    pub load_radius: i32,
    /// Chunks beyond this distance are evicted to the store.
    pub unload_radius: i32,
}

impl Default for WorldSettings {
    fn default() -> Self {
        Self {
            seed: 2147,
            sea_level: SEA_LEVEL,
            flat: false,
            load_radius: LOAD_RADIUS,
            unload_radius: UNLOAD_RADIUS,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct LightingSettings {
    /// Light value of unobstructed sky, at most 15.
    pub max_light: u8,
}

impl Default for LightingSettings {
    fn default() -> Self {
        Self {
            max_light: MAX_LIGHT,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct LiquidSettings {
    /// Depth of a source block, at most 7.
    pub max_depth: u8,
    pub outgoing_flow: [[u8; 8]; 5],
    pub propagation_delay: u64,
}

impl LiquidSettings {
    /// `max_depth` limited to what a packed liquid state can hold.
    pub fn source_depth(&self) -> u8 {
        self.max_depth.clamp(1, MAX_LIQUID_DEPTH)
    }
}

impl Default for LiquidSettings {
    fn default() -> Self {
        Self {
            max_depth: MAX_LIQUID_DEPTH,
            outgoing_flow: OUTGOING_FLOW,
            propagation_delay: LIQUID_PROPAGATION_DELAY,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct UpdateSettings {
    /// Worker threads for chunk updates; half the processors when unset.
    pub worker_count: Option<usize>,
}

impl UpdateSettings {
    pub fn effective_worker_count(&self) -> usize {
        self.worker_count
            .unwrap_or_else(|| num_cpus::get() / 2)
            .max(1)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct StoreSettings {
    /// Deflate level, 0 (none) to 9 (best).
    pub compression_level: u32,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            compression_level: 6,
        }
    }
}

pub fn save_settings(path: &Path, settings: &EngineSettings) -> Result<(), SettingsError> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    bincode::serialize_into(&mut writer, settings)?;
    writer.flush()?;
    Ok(())
}

pub fn load_settings(path: &Path) -> Result<EngineSettings, SettingsError> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);
    let settings = bincode::deserialize_from(&mut reader)?;
    Ok(settings)
}

/// Falls back to defaults when the file is missing or unreadable.
pub fn load_or_default(path: &Path) -> EngineSettings {
    match load_settings(path) {
        Ok(settings) => settings,
        Err(e) => {
            tracing::warn!("Using default settings, cannot load {}: {}", path.display(), e);
            EngineSettings::default()
        }
    }
}
