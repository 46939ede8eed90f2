// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Time-sync warning handle.

use tokio::sync::{mpsc, oneshot};

use crate::error::{Error, Result};
use crate::validate::{self, TEXT_MAX_LEN};

use super::Outcome;
use super::actor::Message;

/// Writer of the time-sync warning level (-1).
///
/// Exactly one handle exists per State Owner. It is not cloneable, and
/// transports never receive it, so network input cannot raise or clear the
/// time-sync warning.
#[derive(Debug)]
pub struct TimeSyncHandle {
    tx: mpsc::Sender<Message>,
}

impl TimeSyncHandle {
    pub(super) fn new(tx: mpsc::Sender<Message>) -> Self {
        Self { tx }
    }

    /// Raises or replaces the time-sync warning.
    ///
    /// An empty `text` resolves the warning.
    ///
    /// # Errors
    ///
    /// Returns a validation error for unsafe text, or
    /// [`Error::ChannelClosed`] if the State Owner is gone.
    pub async fn raise(&self, text: &str) -> Result<Outcome> {
        let text = validate::sanitize_text("time_sync", text, TEXT_MAX_LEN)?;
        self.send((!text.is_empty()).then_some(text)).await
    }

    /// Clears the time-sync warning.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ChannelClosed`] if the State Owner is gone.
    pub async fn resolve(&self) -> Result<Outcome> {
        self.send(None).await
    }

    async fn send(&self, text: Option<String>) -> Result<Outcome> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Message::TimeSync { text, reply })
            .await
            .map_err(|_| Error::ChannelClosed)?;
        rx.await.map_err(|_| Error::ChannelClosed)
    }
}
