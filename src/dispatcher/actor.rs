// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The State Owner task.
//!
//! Exactly one task holds the mutable [`DeviceState`] and the
//! [`StagingStore`]. Messages are handled one at a time, in arrival order,
//! so every commit is atomic with respect to every other.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, watch};

use crate::command::{Command, SystemRequest};
use crate::error::{Error, Result};
use crate::event::{CommandSource, DeviceEvent, EventBus, log};
use crate::settings::{SettingsMap, StagingStore, to_settings_map};
use crate::state::{DeviceState, StateChange, Transition, set_elapsed, transition};
use crate::types::{AirIndex, WarningPriority};

use super::{Outcome, RenderUpdate};

/// Messages accepted by the State Owner.
#[derive(Debug)]
pub(crate) enum Message {
    /// Parsed commands from one payload, applied in order.
    Commands {
        commands: Vec<Command>,
        source: CommandSource,
        reply: Option<oneshot::Sender<Vec<Result<Outcome>>>>,
    },
    /// One second elapsed.
    Tick,
    /// Time-sync warning raised (`Some`) or resolved (`None`).
    TimeSync {
        text: Option<String>,
        reply: oneshot::Sender<Outcome>,
    },
    /// Clear one warning level.
    ClearWarning {
        priority: WarningPriority,
        source: CommandSource,
        reply: oneshot::Sender<Outcome>,
    },
}

/// Outbound channels of the State Owner.
pub(crate) struct Outlets {
    pub(crate) snapshot: watch::Sender<Arc<DeviceState>>,
    pub(crate) events: EventBus,
    pub(crate) render: Option<mpsc::UnboundedSender<RenderUpdate>>,
    pub(crate) system: mpsc::UnboundedSender<SystemRequest>,
    pub(crate) persist: Option<mpsc::UnboundedSender<SettingsMap>>,
}

pub(crate) struct StateOwner {
    state: DeviceState,
    staging: StagingStore,
    outlets: Outlets,
}

impl StateOwner {
    pub(crate) fn new(state: DeviceState, outlets: Outlets) -> Self {
        Self {
            state,
            staging: StagingStore::new(),
            outlets,
        }
    }

    pub(crate) async fn run(mut self, mut rx: mpsc::Receiver<Message>) {
        tracing::debug!(revision = self.state.revision(), "State Owner started");
        while let Some(message) = rx.recv().await {
            self.handle(message);
        }
        tracing::debug!(revision = self.state.revision(), "State Owner stopped");
    }

    fn handle(&mut self, message: Message) {
        match message {
            Message::Commands {
                commands,
                source,
                reply,
            } => {
                let results = commands
                    .into_iter()
                    .map(|command| self.execute(command, source))
                    .collect::<Vec<_>>();
                if let Some(reply) = reply {
                    // The caller may have given up waiting.
                    let _ = reply.send(results);
                }
            }
            Message::Tick => {
                if let Some(change) = self.state.tick() {
                    self.commit(change, CommandSource::Internal);
                }
            }
            Message::TimeSync { text, reply } => {
                let change = StateChange::Warning {
                    priority: WarningPriority::TimeSync,
                    text,
                };
                let outcome = self.applied(change, CommandSource::Internal);
                let _ = reply.send(outcome);
            }
            Message::ClearWarning {
                priority,
                source,
                reply,
            } => {
                let change = StateChange::Warning {
                    priority,
                    text: None,
                };
                let outcome = self.applied(change, source);
                let _ = reply.send(outcome);
            }
        }
    }

    fn execute(&mut self, command: Command, source: CommandSource) -> Result<Outcome> {
        match command {
            Command::Led { index, action } => {
                let on = action.resolve(self.state.led(index).on);
                Ok(self.applied(StateChange::Led { index, on }, source))
            }
            Command::Air { index, event } => {
                let resolved = transition(self.state.timer(index), event);
                Ok(self.timer_outcome(index, resolved, source, || {
                    format!("{index} does not support {event}")
                }))
            }
            Command::AirTime { seconds } => {
                let index = AirIndex::RADIO;
                let resolved = set_elapsed(self.state.timer(index), seconds);
                Ok(self.timer_outcome(index, resolved, source, || {
                    format!("{index} does not support setting elapsed time")
                }))
            }
            Command::Text { field, text } => {
                Ok(self.applied(StateChange::Text { field, text }, source))
            }
            Command::Warn { priority, text } => {
                let text = (!text.is_empty()).then_some(text);
                Ok(self.applied(StateChange::Warning { priority, text }, source))
            }
            Command::Conf { key, value } => {
                tracing::debug!(%source, key = %key, value = %value, "Staged configuration change");
                self.staging.stage(key, value);
                Ok(Outcome::Staged {
                    pending: self.staging.len(),
                })
            }
            Command::Apply => self.apply_staged(source),
            Command::System(request) => {
                self.forward(request, source);
                Ok(Outcome::Forwarded { request })
            }
        }
    }

    fn timer_outcome(
        &mut self,
        index: AirIndex,
        resolved: Transition,
        source: CommandSource,
        reason: impl FnOnce() -> String,
    ) -> Outcome {
        match resolved {
            Transition::Apply {
                running,
                elapsed,
                kind,
            } => self.applied(
                StateChange::Timer {
                    index,
                    running,
                    elapsed,
                    kind,
                },
                source,
            ),
            Transition::NoOp => Outcome::Unchanged {
                revision: self.state.revision(),
            },
            Transition::Unsupported => {
                let reason = reason();
                tracing::info!(%source, timer = %index, reason = %reason, "Timer event ignored");
                Outcome::Ignored { reason }
            }
        }
    }

    fn apply_staged(&mut self, source: CommandSource) -> Result<Outcome> {
        if self.staging.is_empty() {
            return Ok(Outcome::Committed {
                revision: self.state.revision(),
                entries: 0,
            });
        }

        let values = self.staging.validate().map_err(|e| {
            tracing::warn!(
                %source,
                failures = e.failures().len(),
                error = %e,
                "Configuration commit aborted, staged changes kept"
            );
            Error::from(e)
        })?;

        self.staging.clear();
        let entries = values.len();
        if let Some(persist) = &self.outlets.persist
            && persist.send(to_settings_map(&values)).is_err()
        {
            tracing::error!("Settings persistence worker is gone");
        }

        let revision = self
            .commit(StateChange::Settings(values), source)
            .unwrap_or(self.state.revision());
        Ok(Outcome::Committed { revision, entries })
    }

    fn forward(&mut self, request: SystemRequest, source: CommandSource) {
        log::record_system(source, request);
        if self.outlets.system.send(request).is_err() {
            tracing::error!(request = %request, "System operations worker is gone");
        }
        self.outlets
            .events
            .publish(DeviceEvent::SystemRequested { request, source });
    }

    fn applied(&mut self, change: StateChange, source: CommandSource) -> Outcome {
        match self.commit(change, source) {
            Some(revision) => Outcome::Applied { revision },
            None => Outcome::Unchanged {
                revision: self.state.revision(),
            },
        }
    }

    /// Applies a change and fans it out. Returns the new revision, or `None`
    /// if the change was a no-op.
    fn commit(&mut self, change: StateChange, source: CommandSource) -> Option<u64> {
        if !self.state.apply(&change) {
            return None;
        }
        let revision = self.state.bump_revision();
        let snapshot = Arc::new(self.state.clone());

        log::record_change(revision, source, &change);
        self.outlets.snapshot.send_replace(Arc::clone(&snapshot));

        let render_closed = self.outlets.render.as_ref().is_some_and(|render| {
            render
                .send(RenderUpdate {
                    revision,
                    change: change.clone(),
                    snapshot: Arc::clone(&snapshot),
                })
                .is_err()
        });
        if render_closed {
            tracing::debug!("Render queue closed, display updates stopped");
            self.outlets.render = None;
        }

        self.outlets.events.publish(DeviceEvent::StateChanged {
            revision,
            source,
            change,
            snapshot,
        });
        Some(revision)
    }
}
