use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use strum::Display;

use crate::error::{Error, Result};

pub const MIN_TARGET_BUDGET: u32 = 1_000;
pub const MAX_TARGET_BUDGET: u32 = 200_000;
pub const DEFAULT_TARGET_BUDGET: u32 = 15_000;

/// Kind of page the engine is running on, derived from the route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum Surface {
    /// A live conversation the user is taking part in.
    Conversation,
    /// A read-only shared transcript (`/share/...`).
    SharedTranscript,
}

impl Surface {
    pub fn from_path(path: &str) -> Self {
        let first = path.trim_start_matches('/').split('/').next().unwrap_or("");
        if first.eq_ignore_ascii_case("share") {
            Surface::SharedTranscript
        } else {
            Surface::Conversation
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SurfaceToggles {
    pub conversations: bool,
    pub shared_transcripts: bool,
}

impl SurfaceToggles {
    pub fn allows(&self, surface: Surface) -> bool {
        match surface {
            Surface::Conversation => self.conversations,
            Surface::SharedTranscript => self.shared_transcripts,
        }
    }
}

impl Default for SurfaceToggles {
    fn default() -> Self {
        Self {
            conversations: true,
            shared_transcripts: true,
        }
    }
}

/// User settings the engine reads at session start and on every apply command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    pub target_budget: u32,
    pub enabled: bool,
    pub surfaces: SurfaceToggles,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            target_budget: DEFAULT_TARGET_BUDGET,
            enabled: true,
            surfaces: SurfaceToggles::default(),
        }
    }
}

impl Preferences {
    pub fn windowing_allowed(&self, surface: Surface) -> bool {
        self.enabled && self.surfaces.allows(surface)
    }

    pub fn budget(&self) -> f64 {
        f64::from(self.target_budget)
    }
}

/// External key-value store holding [`Preferences`]. The engine never owns
/// persistence; it only loads at session start and saves on explicit commands.
pub trait PreferenceStore: Send {
    fn load(&self) -> Result<Preferences>;

    fn save(&mut self, preferences: &Preferences) -> Result<()>;
}

#[derive(Debug, Default, Clone)]
pub struct MemoryPreferenceStore {
    preferences: Preferences,
}

impl MemoryPreferenceStore {
    pub fn new(preferences: Preferences) -> Self {
        Self { preferences }
    }
}

impl PreferenceStore for MemoryPreferenceStore {
    fn load(&self) -> Result<Preferences> {
        Ok(self.preferences)
    }

    fn save(&mut self, preferences: &Preferences) -> Result<()> {
        self.preferences = *preferences;
        Ok(())
    }
}

/// TOML file store, by default under the user's config directory.
#[derive(Debug, Clone)]
pub struct TomlPreferenceStore {
    path: PathBuf,
}

impl TomlPreferenceStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().ok_or_else(|| {
            Error::Configuration("Could not determine config directory".to_string())
        })?;
        Ok(config_dir.join("threadtrim").join("preferences.toml"))
    }

    pub fn at_default_path() -> Result<Self> {
        Ok(Self::new(Self::default_path()?))
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

impl PreferenceStore for TomlPreferenceStore {
    fn load(&self) -> Result<Preferences> {
        if !self.path.exists() {
            return Ok(Preferences::default());
        }

        let contents = std::fs::read_to_string(&self.path)?;
        match toml::from_str(&contents) {
            Ok(prefs) => Ok(prefs),
            Err(e) => {
                tracing::warn!(
                    "Failed to parse preferences file at {:?}: {}. Using defaults.",
                    self.path,
                    e
                );
                Ok(Preferences::default())
            }
        }
    }

    fn save(&mut self, preferences: &Preferences) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(preferences)
            .map_err(|e| Error::Serialization(format!("Failed to serialize preferences: {e}")))?;
        std::fs::write(&self.path, contents)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn surface_follows_first_path_segment() {
        assert_eq!(Surface::from_path("/c/123"), Surface::Conversation);
        assert_eq!(Surface::from_path("/"), Surface::Conversation);
        assert_eq!(Surface::from_path("/share/abc"), Surface::SharedTranscript);
        assert_eq!(Surface::from_path("/c/share"), Surface::Conversation);
    }

    #[test]
    fn windowing_requires_global_and_surface_toggle() {
        let mut prefs = Preferences::default();
        assert!(prefs.windowing_allowed(Surface::Conversation));

        prefs.surfaces.shared_transcripts = false;
        assert!(!prefs.windowing_allowed(Surface::SharedTranscript));

        prefs.enabled = false;
        assert!(!prefs.windowing_allowed(Surface::Conversation));
    }

    #[test]
    fn toml_store_round_trips_and_defaults_when_missing() {
        let dir = TempDir::new().unwrap();
        let mut store = TomlPreferenceStore::new(dir.path().join("nested").join("prefs.toml"));
        assert_eq!(store.load().unwrap(), Preferences::default());

        let prefs = Preferences {
            target_budget: 8_000,
            enabled: false,
            surfaces: SurfaceToggles {
                conversations: true,
                shared_transcripts: false,
            },
        };
        store.save(&prefs).unwrap();
        assert_eq!(store.load().unwrap(), prefs);
    }

    #[test]
    fn toml_store_falls_back_to_defaults_on_garbage() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("prefs.toml");
        std::fs::write(&path, "target_budget = \"lots\"").unwrap();
        let store = TomlPreferenceStore::new(path);
        assert_eq!(store.load().unwrap(), Preferences::default());
    }
}
