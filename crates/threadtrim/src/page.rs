//! Loading a page snapshot into an engine, shared by the page commands.

use std::io::Write;
use std::path::{Path, PathBuf};
use threadtrim_core::config::EngineConfig;
use threadtrim_core::preferences::{MemoryPreferenceStore, PreferenceStore, TomlPreferenceStore};
use threadtrim_core::status::{RecordingStatusSink, StatusReport};
use threadtrim_core::Engine;
use threadtrim_dom::{HostDom, MemoryDom, PageSnapshot};
use tracing::debug;

use crate::error::Error;

/// Where the page commands read their configuration from.
#[derive(Debug, Clone, Default)]
pub struct PageSources {
    pub config: Option<PathBuf>,
    pub preferences: Option<PathBuf>,
}

impl PageSources {
    pub fn engine_config(&self) -> Result<EngineConfig, Error> {
        match &self.config {
            Some(path) => Ok(EngineConfig::load(path)?),
            None => Ok(EngineConfig::default()),
        }
    }

    pub fn preference_store(&self) -> Result<TomlPreferenceStore, Error> {
        match &self.preferences {
            Some(path) => Ok(TomlPreferenceStore::new(path.clone())),
            None => Ok(TomlPreferenceStore::at_default_path()?),
        }
    }

    /// Builds an engine over the snapshot. With `persist` unset the saved
    /// preferences are copied into memory so the run never writes them back.
    pub fn open(
        &self,
        snapshot: &Path,
        persist: bool,
    ) -> Result<(Engine<MemoryDom>, RecordingStatusSink), Error> {
        let dom = PageSnapshot::load(snapshot)?.into_dom()?;
        debug!(path = %dom.location_path(), nodes = dom.arena_len(), "Loaded snapshot");

        let toml_store = self.preference_store()?;
        let store: Box<dyn PreferenceStore> = if persist {
            Box::new(toml_store)
        } else {
            Box::new(MemoryPreferenceStore::new(toml_store.load()?))
        };

        let sink = RecordingStatusSink::new();
        let engine = Engine::new(dom, self.engine_config()?, store, Box::new(sink.clone()));
        Ok((engine, sink))
    }
}

pub fn write_status(out: &mut impl Write, status: &StatusReport) -> std::io::Result<()> {
    if !status.available {
        writeln!(out, "Session:  {} (no conversation detected)", status.session_id)?;
        return Ok(());
    }
    writeln!(out, "Session:  {} ({})", status.session_id, status.phase)?;
    writeln!(
        out,
        "Hidden:   {} blocks, {:.0}px",
        status.hidden_count, status.hidden_extent
    )?;
    writeln!(
        out,
        "Visible:  {:.0}px of {:.0}px",
        status.visible_extent, status.total_extent
    )?;
    Ok(())
}

/// The content parent rendered as HTML, if one was detected.
pub fn content_html(engine: &Engine<MemoryDom>) -> Result<Option<String>, Error> {
    let Some(window) = engine.session().window.as_ref() else {
        return Ok(None);
    };
    let fragment = engine.dom().serialize(window.content_parent)?;
    Ok(Some(fragment.to_html()))
}
