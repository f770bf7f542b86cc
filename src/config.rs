// src/config.rs

//! Runtime configuration.
//!
//! Every section deserializes with `#[serde(default)]`, so a config file only
//! needs the keys it changes. The file is JSON; its path comes from the
//! `MIDI_LIFE_CONFIG` environment variable. Without the variable the defaults
//! apply; a named file that cannot be loaded is an error.

use crate::life::controller::{LifeSettings, CONTROL_GRID_SIZE};
use crate::life::{CellCoord, GridError};
use crate::view::Palette;
use anyhow::{Context, Result};
use log::info;
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable naming the JSON config file.
pub const CONFIG_ENV_VAR: &str = "MIDI_LIFE_CONFIG";

/// Process-wide configuration, initialized once by `main` through `Config::from_env`.
pub static CONFIG: OnceCell<Config> = OnceCell::new();

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub grid: GridConfig,
    pub timing: TimingConfig,
    pub display: DisplayConfig,
    pub midi: MidiConfig,
}

// --- Grid ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    pub width: usize,
    pub height: usize,
    /// Number of distinct cells brought to life at startup.
    pub seed_count: usize,
    /// Fixed seed for reproducible boards. `None` seeds from the OS.
    pub rng_seed: Option<u64>,
    /// Extra live cells, each `[col, row]`. Negative values wrap.
    pub seed_cells: Vec<Vec<isize>>,
}

impl Default for GridConfig {
    fn default() -> Self {
        GridConfig {
            width: 8,
            height: 8,
            seed_count: 30,
            rng_seed: None,
            seed_cells: Vec::new(),
        }
    }
}

// --- Timing ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    pub tick_interval_ms: u64,
    pub poll_interval_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        TimingConfig {
            tick_interval_ms: 1000,
            poll_interval_ms: 100,
        }
    }
}

// --- Display ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DriverKind {
    Midi,
    #[default]
    Console,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub driver: DriverKind,
    /// Wrap the driver so every call is logged.
    pub debug: bool,
    pub on_velocity: u8,
    pub off_velocity: u8,
    pub pause_on_velocity: u8,
    pub pause_off_velocity: u8,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        let palette = Palette::default();
        DisplayConfig {
            driver: DriverKind::default(),
            debug: false,
            on_velocity: palette.alive,
            off_velocity: palette.dead,
            pause_on_velocity: palette.paused,
            pause_off_velocity: palette.running,
        }
    }
}

impl DisplayConfig {
    pub fn palette(&self) -> Palette {
        Palette {
            alive: self.on_velocity,
            dead: self.off_velocity,
            paused: self.pause_on_velocity,
            running: self.pause_off_velocity,
        }
    }
}

// --- MIDI ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MidiConfig {
    /// Raw MIDI node used for both directions, e.g. `/dev/snd/midiC1D0`.
    pub device: Option<PathBuf>,
    /// Looked up among the enumerated devices when `device` is unset.
    pub device_name: Option<String>,
    /// Separate input node. Requires `output`.
    pub input: Option<PathBuf>,
    /// Separate output node. Requires `input`.
    pub output: Option<PathBuf>,
    /// Time the controller gets to settle after opening.
    pub startup_delay_ms: u64,
}

impl Default for MidiConfig {
    fn default() -> Self {
        MidiConfig {
            device: None,
            device_name: None,
            input: None,
            output: None,
            startup_delay_ms: 2000,
        }
    }
}

impl Config {
    /// Loads the file named by `MIDI_LIFE_CONFIG`, or the defaults when it is unset.
    pub fn from_env() -> Result<Self> {
        let path = std::env::var_os(CONFIG_ENV_VAR);
        Self::resolve(path.as_deref().map(Path::new))
    }

    pub fn resolve(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => {
                info!("Config: {} not set, using defaults", CONFIG_ENV_VAR);
                Ok(Self::default())
            }
        }
    }

    /// Reads, parses and validates the config file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config = Self::from_json(&text)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        info!("Config: loaded {}", path.display());
        Ok(config)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects combinations the selected driver cannot display. The MIDI
    /// grid has 8x8 pads; larger boards would spill onto the control column.
    pub fn validate(&self) -> Result<()> {
        let grid = &self.grid;
        if self.display.driver == DriverKind::Midi
            && (grid.width > CONTROL_GRID_SIZE || grid.height > CONTROL_GRID_SIZE)
        {
            anyhow::bail!(
                "a {}x{} board does not fit the {}x{} MIDI pad grid",
                grid.width,
                grid.height,
                CONTROL_GRID_SIZE,
                CONTROL_GRID_SIZE
            );
        }
        Ok(())
    }

    /// Builds controller settings. Fails if a seed cell is not a `[col, row]` pair.
    pub fn to_settings(&self) -> Result<LifeSettings, GridError> {
        let seed_cells = self
            .grid
            .seed_cells
            .iter()
            .map(|index| CellCoord::try_from(index.as_slice()).map(|c| (c.col, c.row)))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(LifeSettings {
            width: self.grid.width,
            height: self.grid.height,
            seed_count: self.grid.seed_count,
            seed_cells,
            tick_interval: Duration::from_millis(self.timing.tick_interval_ms),
            poll_interval: Duration::from_millis(self.timing.poll_interval_ms),
            palette: self.display.palette(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_should_match_controller_defaults() -> Result<()> {
        let settings = Config::default().to_settings()?;
        assert_eq!(settings, LifeSettings::default());
        Ok(())
    }

    #[test]
    fn it_should_fill_missing_keys_with_defaults() -> Result<()> {
        let config = Config::from_json(
            r#"{
                "grid": { "width": 6, "rng_seed": 42 },
                "display": { "driver": "midi", "debug": true }
            }"#,
        )?;
        assert_eq!(config.grid.width, 6);
        assert_eq!(config.grid.height, 8);
        assert_eq!(config.grid.rng_seed, Some(42));
        assert_eq!(config.display.driver, DriverKind::Midi);
        assert!(config.display.debug);
        assert_eq!(config.display.on_velocity, 127);
        assert_eq!(config.timing, TimingConfig::default());
        assert_eq!(config.midi.startup_delay_ms, 2000);
        Ok(())
    }

    #[test]
    fn it_should_reject_unknown_driver_kinds() {
        assert!(Config::from_json(r#"{ "display": { "driver": "hologram" } }"#).is_err());
    }

    #[test]
    fn it_should_convert_seed_cells_and_intervals() -> Result<()> {
        let config = Config::from_json(
            r#"{
                "grid": { "seed_cells": [[0, 1], [-1, -1]] },
                "timing": { "tick_interval_ms": 250, "poll_interval_ms": 20 },
                "display": { "pause_off_velocity": 0 }
            }"#,
        )?;
        let settings = config.to_settings()?;
        assert_eq!(settings.seed_cells, vec![(0, 1), (-1, -1)]);
        assert_eq!(settings.tick_interval, Duration::from_millis(250));
        assert_eq!(settings.poll_interval, Duration::from_millis(20));
        assert_eq!(settings.palette.running, 0);
        Ok(())
    }

    #[test]
    fn it_should_reject_seed_cells_that_are_not_pairs() -> Result<()> {
        let config = Config::from_json(r#"{ "grid": { "seed_cells": [[1, 2, 3]] } }"#)?;
        assert!(matches!(
            config.to_settings(),
            Err(GridError::InvalidIndexShape { arity: 3 })
        ));
        Ok(())
    }

    #[test]
    fn it_should_report_the_path_of_a_missing_file() {
        let err = Config::load(Path::new("/nonexistent/midi-life.json")).unwrap_err();
        assert!(format!("{:#}", err).contains("/nonexistent/midi-life.json"));
    }

    #[test]
    fn it_should_fail_instead_of_defaulting_when_the_named_file_is_bad() -> Result<()> {
        assert!(Config::resolve(Some(Path::new("/nonexistent/midi-life.json"))).is_err());

        let path = std::env::temp_dir().join(format!("midi-life-{}-bad.json", std::process::id()));
        std::fs::write(&path, r#"{ "display": { "driver": "midi" "#)?;
        let result = Config::resolve(Some(&path));
        std::fs::remove_file(&path)?;
        assert!(result.is_err());
        Ok(())
    }

    #[test]
    fn it_should_use_defaults_only_when_no_file_is_named() -> Result<()> {
        assert_eq!(Config::resolve(None)?, Config::default());
        Ok(())
    }

    #[test]
    fn it_should_reject_boards_larger_than_the_midi_pad_grid() -> Result<()> {
        for grid in [r#"{ "width": 9 }"#, r#"{ "height": 16 }"#] {
            let json = format!(r#"{{ "grid": {}, "display": {{ "driver": "midi" }} }}"#, grid);
            let err = Config::from_json(&json).unwrap_err();
            assert!(err.to_string().contains("MIDI pad grid"));
        }

        let console = Config::from_json(r#"{ "grid": { "width": 16, "height": 16 } }"#)?;
        assert_eq!(console.grid.width, 16);
        let midi = Config::from_json(r#"{ "display": { "driver": "midi" } }"#)?;
        assert!(midi.validate().is_ok());
        Ok(())
    }
}
