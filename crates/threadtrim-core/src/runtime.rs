//! Async host for an [`Engine`].
//!
//! The engine lives on a single task that owns the page. Host notifications
//! and commands arrive over a channel and are applied one at a time, and the
//! task sleeps until the engine's next timer deadline in between.

use serde_json::Value;
use std::time::Duration;
use threadtrim_dom::{HostDom, NodeId};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep_until};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::command::Response;
use crate::engine::Engine;
use crate::error::{Error, Result};
use crate::restore::RestoreOutcome;
use crate::status::StatusReport;

const COMMAND_CHANNEL_CAPACITY: usize = 64;

type HostMutation<D> = Box<dyn FnOnce(&mut D) + Send>;

enum EngineCmd<D> {
    Message {
        message: Value,
        reply: oneshot::Sender<Response>,
    },
    Status {
        reply: oneshot::Sender<StatusReport>,
    },
    Click {
        node: NodeId,
        reply: oneshot::Sender<Result<Option<RestoreOutcome>>>,
    },
    Scroll,
    Mutations,
    HistoryChanged,
    /// Host-side page change. Observed mutations are delivered right after,
    /// as a mutation observer callback would be.
    Host {
        mutate: HostMutation<D>,
        reply: oneshot::Sender<()>,
    },
}

pub struct EngineHandle<D> {
    cmd_tx: mpsc::Sender<EngineCmd<D>>,
    cancel: CancellationToken,
}

impl<D> Clone for EngineHandle<D> {
    fn clone(&self) -> Self {
        Self {
            cmd_tx: self.cmd_tx.clone(),
            cancel: self.cancel.clone(),
        }
    }
}

impl<D: Send + 'static> EngineHandle<D> {
    pub async fn send_message(&self, message: Value) -> Result<Response> {
        let (reply, rx) = oneshot::channel();
        self.send(EngineCmd::Message { message, reply }).await?;
        rx.await.map_err(|_| Error::ChannelClosed)
    }

    pub async fn status(&self) -> Result<StatusReport> {
        let (reply, rx) = oneshot::channel();
        self.send(EngineCmd::Status { reply }).await?;
        rx.await.map_err(|_| Error::ChannelClosed)
    }

    pub async fn click(&self, node: NodeId) -> Result<Option<RestoreOutcome>> {
        let (reply, rx) = oneshot::channel();
        self.send(EngineCmd::Click { node, reply }).await?;
        rx.await.map_err(|_| Error::ChannelClosed)?
    }

    pub async fn notify_scroll(&self) -> Result<()> {
        self.send(EngineCmd::Scroll).await
    }

    pub async fn notify_mutations(&self) -> Result<()> {
        self.send(EngineCmd::Mutations).await
    }

    pub async fn notify_history_change(&self) -> Result<()> {
        self.send(EngineCmd::HistoryChanged).await
    }

    /// Runs `mutate` against the page on the engine task and waits for it.
    pub async fn with_host<F>(&self, mutate: F) -> Result<()>
    where
        F: FnOnce(&mut D) + Send + 'static,
    {
        let (reply, rx) = oneshot::channel();
        self.send(EngineCmd::Host {
            mutate: Box::new(mutate),
            reply,
        })
        .await?;
        rx.await.map_err(|_| Error::ChannelClosed)
    }

    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    async fn send(&self, cmd: EngineCmd<D>) -> Result<()> {
        self.cmd_tx.send(cmd).await.map_err(|_| Error::ChannelClosed)
    }
}

struct EngineActor<D: HostDom> {
    engine: Engine<D>,
    epoch: Instant,
}

impl<D: HostDom> EngineActor<D> {
    fn now_ms(&self) -> u64 {
        u64::try_from(self.epoch.elapsed().as_millis()).unwrap_or(u64::MAX)
    }

    fn deadline(&self) -> Option<Instant> {
        self.engine
            .next_deadline()
            .map(|due_ms| self.epoch + Duration::from_millis(due_ms))
    }

    async fn run(
        mut self,
        mut cmd_rx: mpsc::Receiver<EngineCmd<D>>,
        cancel: CancellationToken,
    ) -> Engine<D> {
        self.engine.start(self.now_ms());

        loop {
            let deadline = self.deadline();
            tokio::select! {
                biased;

                () = cancel.cancelled() => break,

                cmd = cmd_rx.recv() => match cmd {
                    Some(cmd) => self.handle(cmd),
                    None => break,
                },

                () = sleep_until_deadline(deadline) => {
                    let fired = self.engine.advance(self.now_ms());
                    trace!(?fired, "Timers fired");
                }
            }
        }

        debug!(session_id = %self.engine.session().id, "Engine actor stopped");
        self.engine
    }

    fn handle(&mut self, cmd: EngineCmd<D>) {
        let now_ms = self.now_ms();
        match cmd {
            EngineCmd::Message { message, reply } => {
                let _ = reply.send(self.engine.handle_message(&message));
            }
            EngineCmd::Status { reply } => {
                let _ = reply.send(self.engine.status());
            }
            EngineCmd::Click { node, reply } => {
                let _ = reply.send(self.engine.on_click(node));
            }
            EngineCmd::Scroll => self.engine.on_scroll(now_ms),
            EngineCmd::Mutations => self.engine.on_mutations(now_ms),
            EngineCmd::HistoryChanged => self.engine.on_history_change(now_ms),
            EngineCmd::Host { mutate, reply } => {
                mutate(self.engine.dom_mut());
                self.engine.on_mutations(now_ms);
                let _ = reply.send(());
            }
        }
    }
}

async fn sleep_until_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

/// Spawns the engine on its own task. The task returns the engine once every
/// handle is dropped or [`EngineHandle::shutdown`] is called.
pub fn spawn_engine<D>(engine: Engine<D>) -> (EngineHandle<D>, JoinHandle<Engine<D>>)
where
    D: HostDom + Send + 'static,
{
    let (cmd_tx, cmd_rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);
    let cancel = CancellationToken::new();

    let actor = EngineActor {
        engine,
        epoch: Instant::now(),
    };
    let task = tokio::spawn(actor.run(cmd_rx, cancel.clone()));

    (EngineHandle { cmd_tx, cancel }, task)
}
