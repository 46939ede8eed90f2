// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! State Owner and its handles.
//!
//! All mutations of [`DeviceState`] go through one task, the State Owner.
//! Transports hold a cloneable [`Dispatcher`] and submit command lines to it;
//! they read state only through immutable snapshots.
//!
//! Every committed change is, in order:
//!
//! 1. written to the event log,
//! 2. published as the new snapshot,
//! 3. queued for the rendering collaborator (if a [`RenderQueue`] was taken),
//! 4. broadcast on the [`EventBus`](crate::event::EventBus).
//!
//! # Examples
//!
//! ```
//! use onair_core::dispatcher::{Dispatcher, Outcome};
//! use onair_core::event::CommandSource;
//! use onair_core::state::DeviceState;
//! use onair_core::types::LedIndex;
//!
//! # #[tokio::main]
//! # async fn main() -> onair_core::Result<()> {
//! let handles = Dispatcher::builder(DeviceState::new()).without_tick().spawn();
//! let dispatcher = handles.dispatcher;
//!
//! let outcome = dispatcher.execute("LED1:ON", CommandSource::Http).await?;
//! assert_eq!(outcome, Outcome::Applied { revision: 1 });
//! assert!(dispatcher.snapshot().led(LedIndex::new(1).unwrap()).on);
//! # Ok(())
//! # }
//! ```

mod actor;
mod collaborators;
mod tick;
mod time_sync;

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;

use crate::command::{Command, SystemRequest, parse_line, split_lines};
use crate::error::{Error, Result};
use crate::event::{CommandSource, DeviceEvent, EventBus};
use crate::settings::SettingsStore;
use crate::state::{DeviceState, StateChange, StatusReport};
use crate::types::WarningPriority;

use actor::{Message, Outlets, StateOwner};

pub use collaborators::{LoggingSystemOperations, SystemOperations};
pub use time_sync::TimeSyncHandle;

/// Capacity of the State Owner inbox.
pub const INBOX_CAPACITY: usize = 1024;

/// Default tick interval.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Result of one accepted command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum Outcome {
    /// The state changed.
    Applied {
        /// Revision after the change.
        revision: u64,
    },
    /// The command was valid but changed nothing.
    Unchanged {
        /// Current revision.
        revision: u64,
    },
    /// A `CONF` edit was staged.
    Staged {
        /// Entries now pending.
        pending: usize,
    },
    /// Staged configuration was committed.
    Committed {
        /// Revision after the commit.
        revision: u64,
        /// Number of committed entries.
        entries: usize,
    },
    /// The target does not support the event.
    Ignored {
        /// Why.
        reason: String,
    },
    /// A `CMD` request was handed to the OS-operations collaborator.
    Forwarded {
        /// The request.
        request: SystemRequest,
    },
}

/// Result of one line of a multi-line payload.
#[derive(Debug)]
pub struct LineResult {
    /// The line as received.
    pub line: String,
    /// What happened to it.
    pub result: Result<Outcome>,
}

/// Per-line results of a payload, in payload order.
#[derive(Debug, Default)]
pub struct PacketReport {
    lines: Vec<LineResult>,
}

impl PacketReport {
    /// Returns every line result.
    #[must_use]
    pub fn lines(&self) -> &[LineResult] {
        &self.lines
    }

    /// Returns the lines that failed.
    pub fn failures(&self) -> impl Iterator<Item = &LineResult> {
        self.lines.iter().filter(|line| line.result.is_err())
    }

    /// Returns `true` if every line was accepted.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failures().next().is_none()
    }

    /// Returns the number of lines.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Returns `true` if the payload had no command lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// One committed change, as delivered to the rendering collaborator.
#[derive(Debug, Clone)]
pub struct RenderUpdate {
    /// Revision after the change.
    pub revision: u64,
    /// The change.
    pub change: StateChange,
    /// The complete state after the change.
    pub snapshot: Arc<DeviceState>,
}

/// Single-consumer queue of committed changes, in commit order.
pub type RenderQueue = mpsc::UnboundedReceiver<RenderUpdate>;

/// Everything produced by [`DispatcherBuilder::spawn`].
#[derive(Debug)]
pub struct DispatcherHandles {
    /// Cloneable handle for transports.
    pub dispatcher: Dispatcher,
    /// The only writer of the time-sync warning level.
    pub time_sync: TimeSyncHandle,
    /// Present if [`DispatcherBuilder::render_queue`] was requested.
    pub render_queue: Option<RenderQueue>,
    /// Background tasks: State Owner, tick driver and workers.
    pub tasks: Vec<JoinHandle<()>>,
}

/// Builder for the State Owner.
#[must_use]
pub struct DispatcherBuilder {
    state: DeviceState,
    settings: Option<Arc<dyn SettingsStore>>,
    system: Arc<dyn SystemOperations>,
    render_queue: bool,
    event_capacity: usize,
    tick_interval: Option<Duration>,
}

impl DispatcherBuilder {
    fn new(state: DeviceState) -> Self {
        Self {
            state,
            settings: None,
            system: Arc::new(LoggingSystemOperations),
            render_queue: false,
            event_capacity: crate::event::DEFAULT_CHANNEL_CAPACITY,
            tick_interval: Some(DEFAULT_TICK_INTERVAL),
        }
    }

    /// Persists committed configuration to `store`.
    pub fn settings(mut self, store: Arc<dyn SettingsStore>) -> Self {
        self.settings = Some(store);
        self
    }

    /// Sets the OS-operations collaborator for `CMD:` requests.
    pub fn system_operations(mut self, ops: Arc<dyn SystemOperations>) -> Self {
        self.system = ops;
        self
    }

    /// Creates a [`RenderQueue`] for the rendering collaborator.
    pub fn render_queue(mut self) -> Self {
        self.render_queue = true;
        self
    }

    /// Sets the event bus capacity.
    pub fn event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity;
        self
    }

    /// Sets the tick interval.
    pub fn tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = Some(interval);
        self
    }

    /// Disables the tick driver. Timers then only move on commands.
    pub fn without_tick(mut self) -> Self {
        self.tick_interval = None;
        self
    }

    /// Spawns the State Owner and its workers on the current runtime.
    pub fn spawn(self) -> DispatcherHandles {
        let mut tasks = Vec::new();

        let (tx, rx) = mpsc::channel(INBOX_CAPACITY);
        let (snapshot_tx, snapshot_rx) = watch::channel(Arc::new(self.state.clone()));
        let events = EventBus::with_capacity(self.event_capacity);

        let (system, system_task) = collaborators::spawn_system_worker(self.system);
        tasks.push(system_task);

        let persist = self.settings.map(|store| {
            let (persist, task) = collaborators::spawn_persist_worker(store);
            tasks.push(task);
            persist
        });

        let (render, render_queue) = if self.render_queue {
            let (render_tx, render_rx) = mpsc::unbounded_channel();
            (Some(render_tx), Some(render_rx))
        } else {
            (None, None)
        };

        let owner = StateOwner::new(
            self.state,
            Outlets {
                snapshot: snapshot_tx,
                events: events.clone(),
                render,
                system,
                persist,
            },
        );
        tasks.push(tokio::spawn(owner.run(rx)));

        if let Some(interval) = self.tick_interval {
            tasks.push(tick::spawn(tx.clone(), interval));
        }

        DispatcherHandles {
            dispatcher: Dispatcher {
                tx: tx.clone(),
                snapshot: snapshot_rx,
                events,
            },
            time_sync: TimeSyncHandle::new(tx),
            render_queue,
            tasks,
        }
    }
}

/// Cloneable handle to the State Owner.
///
/// Commands submitted through one handle are applied in submission order.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    tx: mpsc::Sender<Message>,
    snapshot: watch::Receiver<Arc<DeviceState>>,
    events: EventBus,
}

impl Dispatcher {
    /// Creates a builder around the initial state.
    pub fn builder(state: DeviceState) -> DispatcherBuilder {
        DispatcherBuilder::new(state)
    }

    /// Parses and applies one command line.
    ///
    /// # Errors
    ///
    /// Returns the parse, validation or commit error of the line, or
    /// [`Error::ChannelClosed`] if the State Owner is gone.
    pub async fn execute(&self, line: &str, source: CommandSource) -> Result<Outcome> {
        let command = parse_line(line).inspect_err(|e| log_rejected(source, line, e))?;
        let mut results = self.request(vec![command], source).await?;
        results.pop().ok_or(Error::ChannelClosed)?
    }

    /// Applies a multi-line payload and reports every line.
    ///
    /// Invalid lines do not stop the remaining ones.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ChannelClosed`] if the State Owner is gone.
    pub async fn submit(&self, payload: &str, source: CommandSource) -> Result<PacketReport> {
        let (slots, commands) = parse_payload(payload, source);
        let mut outcomes = if commands.is_empty() {
            Vec::new()
        } else {
            self.request(commands, source).await?
        }
        .into_iter();

        let lines = slots
            .into_iter()
            .map(|(line, parsed)| LineResult {
                line,
                result: match parsed {
                    Err(e) => Err(e),
                    Ok(()) => outcomes.next().unwrap_or(Err(Error::ChannelClosed)),
                },
            })
            .collect();
        Ok(PacketReport { lines })
    }

    /// Applies a multi-line payload without waiting for the results.
    ///
    /// Used by fire-and-forget transports; rejected lines are only logged.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ChannelClosed`] if the State Owner is gone.
    pub async fn enqueue(&self, payload: &str, source: CommandSource) -> Result<()> {
        let (_, commands) = parse_payload(payload, source);
        if commands.is_empty() {
            return Ok(());
        }
        self.tx
            .send(Message::Commands {
                commands,
                source,
                reply: None,
            })
            .await
            .map_err(|_| Error::ChannelClosed)
    }

    /// Clears one operator warning level (0-2).
    ///
    /// # Errors
    ///
    /// Returns a validation error for level -1, which only the time-sync
    /// collaborator may write, and for levels outside -1..=2.
    pub async fn clear_warning(&self, level: i8) -> Result<Outcome> {
        let priority = WarningPriority::operator(level)?;
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Message::ClearWarning {
                priority,
                source: CommandSource::Internal,
                reply,
            })
            .await
            .map_err(|_| Error::ChannelClosed)?;
        rx.await.map_err(|_| Error::ChannelClosed)
    }

    /// Returns the latest committed state.
    #[must_use]
    pub fn snapshot(&self) -> Arc<DeviceState> {
        self.snapshot.borrow().clone()
    }

    /// Returns the status document of the latest committed state.
    #[must_use]
    pub fn status(&self) -> StatusReport {
        StatusReport::from(self.snapshot().as_ref())
    }

    /// Returns a receiver that is notified of every new snapshot.
    #[must_use]
    pub fn watch(&self) -> watch::Receiver<Arc<DeviceState>> {
        self.snapshot.clone()
    }

    /// Subscribes to device events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<DeviceEvent> {
        self.events.subscribe()
    }

    /// Returns `true` while the State Owner accepts messages.
    #[must_use]
    pub fn is_running(&self) -> bool {
        !self.tx.is_closed()
    }

    async fn request(
        &self,
        commands: Vec<Command>,
        source: CommandSource,
    ) -> Result<Vec<Result<Outcome>>> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Message::Commands {
                commands,
                source,
                reply: Some(reply),
            })
            .await
            .map_err(|_| Error::ChannelClosed)?;
        rx.await.map_err(|_| Error::ChannelClosed)
    }
}

type Slot = (String, std::result::Result<(), Error>);

fn parse_payload(payload: &str, source: CommandSource) -> (Vec<Slot>, Vec<Command>) {
    let mut slots = Vec::new();
    let mut commands = Vec::new();
    for line in split_lines(payload) {
        match parse_line(line) {
            Ok(command) => {
                commands.push(command);
                slots.push((line.to_string(), Ok(())));
            }
            Err(e) => {
                log_rejected(source, line, &e);
                slots.push((line.to_string(), Err(e)));
            }
        }
    }
    (slots, commands)
}

fn log_rejected(source: CommandSource, line: &str, error: &Error) {
    tracing::warn!(%source, line = %line, kind = %error.kind(), error = %error, "Rejected command line");
}
