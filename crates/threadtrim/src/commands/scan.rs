use async_trait::async_trait;
use eyre::{Result, eyre};
use serde_json::json;
use std::io::Write;
use std::path::PathBuf;

use super::Command;
use crate::page::PageSources;

pub struct ScanCommand {
    pub snapshot: PathBuf,
    pub json: bool,
    pub sources: PageSources,
}

#[async_trait]
impl Command for ScanCommand {
    async fn execute(&self) -> Result<()> {
        let (mut engine, _) = self.sources.open(&self.snapshot, false)?;
        let response = engine.handle_message(&json!({"type": "debug-scan"}));

        let mut stdout = std::io::stdout();
        if self.json {
            writeln!(stdout, "{}", serde_json::to_string_pretty(&response)?)?;
            return Ok(());
        }

        let Some(report) = response.data.filter(|_| response.success) else {
            let message = response.error.map(|e| e.message).unwrap_or_default();
            return Err(eyre!("Debug scan failed: {}", message));
        };

        writeln!(
            stdout,
            "Candidates: {} ({} scoring)",
            report["candidateCount"], report["scoringCount"]
        )?;
        writeln!(stdout, "{:<8} {:>10}  {:<24} Class", "Node", "Score", "Excluded")?;
        writeln!(stdout, "{}", "-".repeat(72))?;
        for candidate in report["topCandidates"].as_array().into_iter().flatten() {
            let exclusion = candidate["breakdown"]["exclusion"]
                .as_str()
                .unwrap_or("");
            writeln!(
                stdout,
                "#{:<7} {:>10.0}  {:<24} {}",
                candidate["node"],
                candidate["score"].as_f64().unwrap_or_default(),
                exclusion,
                candidate["className"].as_str().unwrap_or(""),
            )?;
        }

        match report["container"]["node"].as_u64() {
            Some(node) => writeln!(
                stdout,
                "\nContainer #{node}, {} message blocks under #{}",
                report["contentBlockCount"], report["contentParent"]
            )?,
            None => writeln!(stdout, "\nNo container detected.")?,
        }
        Ok(())
    }
}
