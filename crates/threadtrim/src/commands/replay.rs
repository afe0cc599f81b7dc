//! Deterministic replay of host activity.
//!
//! Each script line carries a timestamp in milliseconds. Timers due before an
//! event fire first, so debounces and navigation retries behave as they would
//! in the page, without waiting in real time.

use async_trait::async_trait;
use eyre::Result;
use serde::Deserialize;
use serde_json::Value;
use std::io::Write;
use std::path::PathBuf;
use threadtrim_core::Engine;
use threadtrim_core::status::RecordingStatusSink;
use threadtrim_dom::{HostDom, Layout, MemoryDom, Rect};

use super::Command;
use crate::error::Error;
use crate::page::{PageSources, write_status};

/// Time allowed after the last event for pending timers to run.
const SETTLE_MS: u64 = 10_000;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ReplayStep {
    #[serde(default)]
    pub at: u64,
    #[serde(flatten)]
    pub event: ReplayEvent,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "event", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ReplayEvent {
    /// An inbound command, exactly as the popup would send it.
    Message { message: Value },
    /// The user scrolled the conversation container to `scroll_top`.
    Scroll { scroll_top: f64 },
    /// The host appended message blocks, as a streaming reply does.
    Append {
        height: f64,
        #[serde(default = "default_count")]
        count: usize,
    },
    /// Client-side route change.
    Navigate { path: String },
    ClickPlaceholder,
    /// Only lets time pass.
    Tick,
}

fn default_count() -> usize {
    1
}

/// Parses a JSON-lines script. Blank lines are skipped; line numbers are
/// 1-based.
pub fn parse_script(contents: &str) -> Result<Vec<(usize, ReplayStep)>, Error> {
    let mut steps = Vec::new();
    let mut last_at = 0;
    for (index, line) in contents.lines().enumerate() {
        let line_number = index + 1;
        if line.trim().is_empty() {
            continue;
        }
        let step: ReplayStep = serde_json::from_str(line).map_err(|e| Error::Replay {
            line: line_number,
            message: e.to_string(),
        })?;
        if step.at < last_at {
            return Err(Error::Replay {
                line: line_number,
                message: format!("time went backwards ({} < {})", step.at, last_at),
            });
        }
        last_at = step.at;
        steps.push((line_number, step));
    }
    Ok(steps)
}

pub struct ReplayCommand {
    pub snapshot: PathBuf,
    pub script: PathBuf,
    pub sources: PageSources,
}

#[async_trait]
impl Command for ReplayCommand {
    async fn execute(&self) -> Result<()> {
        let steps = parse_script(&std::fs::read_to_string(&self.script)?)?;
        let (mut engine, sink) = self.sources.open(&self.snapshot, false)?;

        let mut stdout = std::io::stdout();
        replay(&mut engine, &sink, &steps, &mut stdout)?;
        Ok(())
    }
}

/// Runs `steps` against `engine`, writing one line per event and fired timer.
pub fn replay(
    engine: &mut Engine<MemoryDom>,
    sink: &RecordingStatusSink,
    steps: &[(usize, ReplayStep)],
    out: &mut impl Write,
) -> Result<(), Error> {
    engine.start(0);
    writeln!(out, "[{:>6}ms] start", 0)?;

    let mut now_ms = 0;
    for (line, step) in steps {
        now_ms = step.at;
        write_fired(out, now_ms, &engine.advance(now_ms))?;
        let summary = apply_event(engine, &step.event, now_ms).map_err(|e| match e {
            Error::Replay { message, .. } => Error::Replay {
                line: *line,
                message,
            },
            other => other,
        })?;
        writeln!(out, "[{now_ms:>6}ms] {summary}")?;
    }

    let settled = now_ms + SETTLE_MS;
    write_fired(out, settled, &engine.advance(settled))?;

    writeln!(out, "\nStatus events published: {}", sink.events().len())?;
    write_status(out, &engine.status())?;
    Ok(())
}

fn write_fired(
    out: &mut impl Write,
    now_ms: u64,
    fired: &[threadtrim_core::scheduler::TimerKind],
) -> std::io::Result<()> {
    for kind in fired {
        writeln!(out, "[{now_ms:>6}ms]   timer {kind}")?;
    }
    Ok(())
}

fn apply_event(
    engine: &mut Engine<MemoryDom>,
    event: &ReplayEvent,
    now_ms: u64,
) -> Result<String, Error> {
    match event {
        ReplayEvent::Message { message } => {
            let response = engine.handle_message(message);
            Ok(format!("message -> {}", serde_json::to_string(&response)?))
        }
        ReplayEvent::Scroll { scroll_top } => {
            let Some(container) = engine.session().container else {
                return Ok("scroll ignored, no container".to_string());
            };
            engine.dom_mut().set_scroll_top(container, *scroll_top)?;
            engine.on_scroll(now_ms);
            Ok(format!("scroll to {scroll_top:.0} ({})", engine.session().phase))
        }
        ReplayEvent::Append { height, count } => {
            let Some(content_parent) = engine.session().window.as_ref().map(|w| w.content_parent)
            else {
                return Err(Error::Replay {
                    line: 0,
                    message: "append before a content parent was detected".to_string(),
                });
            };
            let rect = engine.dom().layout(content_parent).rect;
            for _ in 0..*count {
                let dom = engine.dom_mut();
                let block = dom.append_element(content_parent, "div", "")?;
                dom.set_layout(
                    block,
                    Layout::from_rect(Rect::new(rect.left, 0.0, rect.width, *height)),
                )?;
            }
            engine.on_mutations(now_ms);
            Ok(format!("appended {count} block(s) of {height:.0}px"))
        }
        ReplayEvent::Navigate { path } => {
            engine.dom_mut().set_location_path(path.clone());
            engine.on_history_change(now_ms);
            Ok(format!("navigate to {}", engine.session().id))
        }
        ReplayEvent::ClickPlaceholder => {
            let placeholder = engine.session().window.as_ref().and_then(|w| w.placeholder);
            match placeholder {
                Some(node) => {
                    let restored = engine.on_click(node)?.map_or(0, |outcome| outcome.restored);
                    Ok(format!("placeholder clicked, {restored} restored"))
                }
                None => Ok("click ignored, no placeholder".to_string()),
            }
        }
        ReplayEvent::Tick => Ok("tick".to_string()),
    }
}
