use async_trait::async_trait;
use eyre::{Result, eyre};
use serde_json::json;
use std::io::Write;
use std::path::PathBuf;

use super::Command;
use crate::page::{PageSources, content_html, write_status};

pub struct ApplyCommand {
    pub snapshot: PathBuf,
    pub budget: Option<u32>,
    pub html: bool,
    pub json: bool,
    pub sources: PageSources,
}

#[async_trait]
impl Command for ApplyCommand {
    async fn execute(&self) -> Result<()> {
        let (mut engine, _) = self.sources.open(&self.snapshot, self.budget.is_some())?;

        let response = match self.budget {
            Some(budget) => {
                let enabled = engine.preferences().enabled;
                engine.handle_message(&json!({
                    "type": "apply-window",
                    "targetBudget": budget,
                    "enabled": enabled,
                }))
            }
            None => {
                engine.start(0);
                engine.handle_message(&json!({"type": "get-status"}))
            }
        };

        let mut stdout = std::io::stdout();
        if self.json {
            writeln!(stdout, "{}", serde_json::to_string_pretty(&response)?)?;
        } else if let Some(error) = &response.error {
            return Err(eyre!("{} ({})", error.message, error.kind));
        } else {
            write_status(&mut stdout, &engine.status())?;
        }

        if self.html
            && let Some(html) = content_html(&engine)?
        {
            writeln!(stdout, "\n{html}")?;
        }
        Ok(())
    }
}
