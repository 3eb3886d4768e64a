use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    sync::RwLock,
    time::Duration,
};

const DEFAULT_INFERENCE_TIMEOUT_MS: u64 = 2_000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AppSettings {
    /// JSON weights for the realtime classifier, relative to the data dir.
    pub classifier_model_path: PathBuf,
    /// JSON coefficients for the weekly forecaster, relative to the data dir.
    pub forecast_model_path: PathBuf,
    pub inference_timeout_ms: u64,
    pub persist_readings: bool,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            classifier_model_path: PathBuf::from("models/fatigue_classifier.json"),
            forecast_model_path: PathBuf::from("models/weekly_forecaster.json"),
            inference_timeout_ms: DEFAULT_INFERENCE_TIMEOUT_MS,
            persist_readings: true,
        }
    }
}

impl AppSettings {
    pub fn inference_timeout(&self) -> Duration {
        Duration::from_millis(self.inference_timeout_ms.max(1))
    }
}

pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<AppSettings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Malformed settings file {}", path.display()))?
        } else {
            AppSettings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self) -> AppSettings {
        self.data
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn update(&self, settings: AppSettings) -> Result<()> {
        let mut guard = self
            .data
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        self.persist(&settings)?;
        *guard = settings;
        Ok(())
    }

    /// Resolves a model path from the settings against `base`.
    pub fn resolve(&self, base: &Path, relative: &Path) -> PathBuf {
        if relative.is_absolute() {
            relative.to_path_buf()
        } else {
            base.join(relative)
        }
    }

    fn persist(&self, data: &AppSettings) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create settings directory {}", parent.display())
            })?;
        }
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }
}
