use crate::audio_io::CpalSinkConfig;
use crate::engine::EngineOptions;
use crate::soundscape::{FireTuning, Soundscape};
use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const SETTINGS_FILE: &str = "settings.json";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct AppSettings {
    pub host_name: Option<String>,
    pub output_device: Option<String>,
    pub sample_rate: Option<u32>,
    pub buffer_size: Option<u32>,
    pub master_volume: f32,
    pub soundscape: String,
    pub seed: Option<u64>,
    pub tone_shaping: bool,
    pub tuning: FireTuning,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            host_name: None,
            output_device: None,
            sample_rate: None,
            buffer_size: None,
            master_volume: 0.8,
            soundscape: Soundscape::Fire.id().to_string(),
            seed: None,
            tone_shaping: true,
            tuning: FireTuning::default(),
        }
    }
}

impl AppSettings {
    pub fn sink_config(&self) -> CpalSinkConfig {
        CpalSinkConfig {
            host_name: self.host_name.clone(),
            output_device: self.output_device.clone(),
            sample_rate: self.sample_rate,
            buffer_size: self.buffer_size,
            tone_shaping: self.tone_shaping,
        }
    }

    /// Engine options for these settings. An unknown soundscape id falls back to the default.
    pub fn engine_options(&self) -> EngineOptions {
        let soundscape = self.soundscape.parse::<Soundscape>().unwrap_or_else(|e| {
            warn!("{}, using '{}'", e, Soundscape::default());
            Soundscape::default()
        });
        EngineOptions {
            tuning: self.tuning,
            soundscape,
            master_volume: Some(self.master_volume),
            seed: self.seed,
        }
    }
}

pub fn get_config_dir() -> Option<PathBuf> {
    let Some(dirs) = ProjectDirs::from("", "", "emberglow") else {
        warn!("Could not determine a configuration directory.");
        return None;
    };
    let dir = dirs.config_dir().to_path_buf();
    if !dir.exists() {
        if let Err(e) = fs::create_dir_all(&dir) {
            warn!("Failed to create directory at {}: {}", dir.display(), e);
            return None;
        }
    }
    Some(dir)
}

pub fn settings_path() -> Option<PathBuf> {
    get_config_dir().map(|dir| dir.join(SETTINGS_FILE))
}

pub fn save_settings_to(path: &Path, settings: &AppSettings) -> Result<()> {
    let json_string =
        serde_json::to_string_pretty(settings).context("Failed to serialize settings")?;
    fs::write(path, json_string)
        .with_context(|| format!("Failed to write settings to {}", path.display()))?;
    debug!("settings saved to {}", path.display());
    Ok(())
}

pub fn load_settings_from(path: &Path) -> Result<AppSettings> {
    let json_string = fs::read_to_string(path)
        .with_context(|| format!("Failed to read settings file {}", path.display()))?;
    serde_json::from_str(&json_string)
        .with_context(|| format!("Failed to parse settings file {}", path.display()))
}

pub fn save_settings(settings: &AppSettings) {
    if let Some(path) = settings_path() {
        if let Err(e) = save_settings_to(&path, settings) {
            warn!("{:#}", e);
        }
    }
}

/// Loads the user's settings, falling back to defaults on any problem.
pub fn load_settings() -> AppSettings {
    match settings_path() {
        Some(path) if path.exists() => load_settings_from(&path).unwrap_or_else(|e| {
            warn!("{:#}, using defaults", e);
            AppSettings::default()
        }),
        _ => AppSettings::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_file(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("emberglow-{}-{}.json", name, std::process::id()))
    }

    #[test]
    fn test_round_trip_through_disk() {
        let path = temp_file("roundtrip");
        let mut settings = AppSettings::default();
        settings.master_volume = 0.3;
        settings.seed = Some(99);
        settings.tuning.crackle.decay = 0.97;
        save_settings_to(&path, &settings).unwrap();
        let loaded = load_settings_from(&path).unwrap();
        let _ = fs::remove_file(&path);
        assert_eq!(loaded, settings);
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let settings: AppSettings = serde_json::from_str(r#"{ "master_volume": 0.4 }"#).unwrap();
        assert_eq!(settings.master_volume, 0.4);
        assert_eq!(settings.soundscape, "fire");
        assert_eq!(settings.tuning, FireTuning::default());
    }

    #[test]
    fn test_garbage_file_is_an_error() {
        let path = temp_file("garbage");
        fs::write(&path, "not json").unwrap();
        let result = load_settings_from(&path);
        let _ = fs::remove_file(&path);
        assert!(result.is_err());
    }

    #[test]
    fn test_unknown_soundscape_falls_back() {
        let settings = AppSettings {
            soundscape: "ocean".into(),
            ..AppSettings::default()
        };
        assert_eq!(settings.engine_options().soundscape, Soundscape::Fire);
        assert_eq!(settings.engine_options().master_volume, Some(0.8));
    }
}
