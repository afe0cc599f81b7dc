use super::Command;
use crate::error::Error;
use async_trait::async_trait;
use eyre::Result;
use std::io::Write;
use threadtrim_core::preferences::{
    MAX_TARGET_BUDGET, MIN_TARGET_BUDGET, PreferenceStore, Preferences, TomlPreferenceStore,
};

pub struct PreferencesCommand {
    pub action: PreferencesAction,
    pub store: TomlPreferenceStore,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreferenceChanges {
    pub budget: Option<u32>,
    pub enabled: Option<bool>,
    pub conversations: Option<bool>,
    pub shared_transcripts: Option<bool>,
}

impl PreferenceChanges {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Applies the changes, rejecting a budget outside the accepted range.
    pub fn apply_to(&self, preferences: &mut Preferences) -> std::result::Result<(), Error> {
        if let Some(budget) = self.budget {
            if !(MIN_TARGET_BUDGET..=MAX_TARGET_BUDGET).contains(&budget) {
                return Err(Error::Config(format!(
                    "budget must be between {MIN_TARGET_BUDGET} and {MAX_TARGET_BUDGET}, \
                     got {budget}"
                )));
            }
            preferences.target_budget = budget;
        }
        if let Some(enabled) = self.enabled {
            preferences.enabled = enabled;
        }
        if let Some(conversations) = self.conversations {
            preferences.surfaces.conversations = conversations;
        }
        if let Some(shared_transcripts) = self.shared_transcripts {
            preferences.surfaces.shared_transcripts = shared_transcripts;
        }
        Ok(())
    }
}

pub enum PreferencesAction {
    Show,
    Set(PreferenceChanges),
    Reset,
}

#[async_trait]
impl Command for PreferencesCommand {
    async fn execute(&self) -> Result<()> {
        match &self.action {
            PreferencesAction::Show => self.show().map_err(Into::into),
            PreferencesAction::Set(changes) => self.set(changes).map_err(Into::into),
            PreferencesAction::Reset => self.reset().map_err(Into::into),
        }
    }
}

impl PreferencesCommand {
    fn show(&self) -> std::result::Result<(), Error> {
        let prefs = self.store.load()?;

        let mut stdout = std::io::stdout();
        writeln!(stdout, "Preferences file: {}", self.store.path().display())?;
        writeln!(stdout, "\n{}", toml::to_string_pretty(&prefs)?)?;
        Ok(())
    }

    fn set(&self, changes: &PreferenceChanges) -> std::result::Result<(), Error> {
        if changes.is_empty() {
            return Err(Error::Config(
                "nothing to change; pass at least one flag".to_string(),
            ));
        }

        let mut prefs = self.store.load()?;
        changes.apply_to(&mut prefs)?;
        let mut store = self.store.clone();
        store.save(&prefs)?;

        let mut stdout = std::io::stdout();
        writeln!(stdout, "Saved {}", self.store.path().display())?;
        writeln!(stdout, "\n{}", toml::to_string_pretty(&prefs)?)?;
        Ok(())
    }

    fn reset(&self) -> std::result::Result<(), Error> {
        let path = self.store.path();

        let mut stdout = std::io::stdout();
        if path.exists() {
            std::fs::remove_file(path)?;
            writeln!(stdout, "Preferences reset to defaults")?;
        } else {
            writeln!(stdout, "No preferences file found")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn changes_only_touch_given_fields() {
        let mut prefs = Preferences::default();
        let changes = PreferenceChanges {
            budget: Some(8_000),
            shared_transcripts: Some(false),
            ..PreferenceChanges::default()
        };
        changes.apply_to(&mut prefs).unwrap();

        assert_eq!(prefs.target_budget, 8_000);
        assert!(prefs.enabled);
        assert!(prefs.surfaces.conversations);
        assert!(!prefs.surfaces.shared_transcripts);
    }

    #[test]
    fn out_of_range_budget_is_rejected() {
        let mut prefs = Preferences::default();
        let changes = PreferenceChanges {
            budget: Some(10),
            ..PreferenceChanges::default()
        };
        assert!(matches!(changes.apply_to(&mut prefs), Err(Error::Config(_))));
        assert_eq!(prefs, Preferences::default());
    }

    #[tokio::test]
    async fn set_then_reset_round_trips_through_the_file() {
        let dir = TempDir::new().unwrap();
        let store = TomlPreferenceStore::new(dir.path().join("preferences.toml"));

        let set = PreferencesCommand {
            action: PreferencesAction::Set(PreferenceChanges {
                enabled: Some(false),
                ..PreferenceChanges::default()
            }),
            store: store.clone(),
        };
        set.execute().await.unwrap();
        assert!(!store.load().unwrap().enabled);

        let reset = PreferencesCommand {
            action: PreferencesAction::Reset,
            store: store.clone(),
        };
        reset.execute().await.unwrap();
        assert_eq!(store.load().unwrap(), Preferences::default());
    }
}
