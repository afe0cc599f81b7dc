use async_trait::async_trait;
use eyre::{Result, eyre};
use serde_json::json;
use std::io::Write;
use std::path::PathBuf;
use threadtrim_core::Engine;
use threadtrim_dom::{HostDom, MemoryDom};

use super::Command;
use crate::error::Error;
use crate::page::{PageSources, content_html, write_status};

pub struct RestoreCommand {
    pub snapshot: PathBuf,
    pub batches: Option<usize>,
    pub html: bool,
    pub sources: PageSources,
}

#[async_trait]
impl Command for RestoreCommand {
    async fn execute(&self) -> Result<()> {
        let (mut engine, _) = self.sources.open(&self.snapshot, false)?;
        engine.start(0);

        let mut stdout = std::io::stdout();
        writeln!(stdout, "Before:")?;
        write_status(&mut stdout, &engine.status())?;

        match self.batches {
            Some(batches) => {
                let mut now_ms = 0;
                for _ in 0..batches {
                    now_ms = scroll_to_top(&mut engine, now_ms)?;
                }
            }
            None => {
                let response = engine.handle_message(&json!({"type": "restore"}));
                if let Some(error) = response.error {
                    return Err(eyre!("{} ({})", error.message, error.kind));
                }
            }
        }

        writeln!(stdout, "\nAfter:")?;
        write_status(&mut stdout, &engine.status())?;

        if self.html
            && let Some(html) = content_html(&engine)?
        {
            writeln!(stdout, "\n{html}")?;
        }
        Ok(())
    }
}

/// Drives one incremental restore the way a user scrolling up would: from the
/// bottom of the container to the top, then past the debounce. Returns the
/// clock after the restore ran.
fn scroll_to_top(engine: &mut Engine<MemoryDom>, now_ms: u64) -> Result<u64, Error> {
    let Some(container) = engine.session().container else {
        return Ok(now_ms);
    };

    engine.dom_mut().set_scroll_top(container, f64::MAX)?;
    engine.on_scroll(now_ms);
    engine.dom_mut().set_scroll_top(container, 0.0)?;
    engine.on_scroll(now_ms + 1);

    let due = now_ms + 1 + engine.config().timing.scroll_debounce_ms;
    engine.advance(due);
    Ok(due)
}
