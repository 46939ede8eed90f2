// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Periodic tick driver.
//!
//! The tick is a producer like any transport: it only sends a message to the
//! State Owner, which advances every running timer in one revision.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::actor::Message;

pub(super) fn spawn(tx: mpsc::Sender<Message>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        interval.tick().await;

        loop {
            interval.tick().await;
            if tx.send(Message::Tick).await.is_err() {
                tracing::debug!("State Owner gone, tick driver stopping");
                break;
            }
        }
    })
}
