// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Blocking collaborators run off the dispatch path.
//!
//! The State Owner never performs blocking calls. OS requests and settings
//! writes are queued to a worker task, which runs each one on the blocking
//! thread pool in submission order.

use std::io;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::command::SystemRequest;
use crate::settings::{SettingsMap, SettingsStore};

/// OS-operations collaborator for `CMD:` requests.
pub trait SystemOperations: Send + Sync + 'static {
    /// Reboots the host.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the request could not be carried out.
    fn reboot(&self) -> io::Result<()>;

    /// Powers the host off.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the request could not be carried out.
    fn shutdown(&self) -> io::Result<()>;

    /// Quits the display application.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the request could not be carried out.
    fn quit(&self) -> io::Result<()>;
}

/// Default collaborator that only logs requests.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingSystemOperations;

impl SystemOperations for LoggingSystemOperations {
    fn reboot(&self) -> io::Result<()> {
        tracing::warn!("Reboot requested, no system operations collaborator configured");
        Ok(())
    }

    fn shutdown(&self) -> io::Result<()> {
        tracing::warn!("Shutdown requested, no system operations collaborator configured");
        Ok(())
    }

    fn quit(&self) -> io::Result<()> {
        tracing::warn!("Quit requested, no system operations collaborator configured");
        Ok(())
    }
}

fn perform(ops: &dyn SystemOperations, request: SystemRequest) -> io::Result<()> {
    match request {
        SystemRequest::Reboot => ops.reboot(),
        SystemRequest::Shutdown => ops.shutdown(),
        SystemRequest::Quit => ops.quit(),
    }
}

pub(crate) fn spawn_system_worker(
    ops: Arc<dyn SystemOperations>,
) -> (mpsc::UnboundedSender<SystemRequest>, JoinHandle<()>) {
    let (tx, mut rx) = mpsc::unbounded_channel::<SystemRequest>();
    let handle = tokio::spawn(async move {
        while let Some(request) = rx.recv().await {
            let ops = Arc::clone(&ops);
            match tokio::task::spawn_blocking(move || perform(ops.as_ref(), request)).await {
                Ok(Ok(())) => tracing::info!(request = %request, "System request handled"),
                Ok(Err(e)) => tracing::error!(request = %request, error = %e, "System request failed"),
                Err(e) => tracing::error!(request = %request, error = %e, "System request panicked"),
            }
        }
    });
    (tx, handle)
}

pub(crate) fn spawn_persist_worker(
    store: Arc<dyn SettingsStore>,
) -> (mpsc::UnboundedSender<SettingsMap>, JoinHandle<()>) {
    let (tx, mut rx) = mpsc::unbounded_channel::<SettingsMap>();
    let handle = tokio::spawn(async move {
        while let Some(entries) = rx.recv().await {
            let store = Arc::clone(&store);
            match tokio::task::spawn_blocking(move || store.persist(&entries)).await {
                Ok(Ok(())) => tracing::debug!("Committed settings persisted"),
                // The commit already applied; a failed write is reported, not rolled back.
                Ok(Err(e)) => tracing::error!(error = %e, "Failed to persist committed settings"),
                Err(e) => tracing::error!(error = %e, "Settings persistence panicked"),
            }
        }
    });
    (tx, handle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Counting {
        reboots: AtomicUsize,
        quits: AtomicUsize,
    }

    impl SystemOperations for Counting {
        fn reboot(&self) -> io::Result<()> {
            self.reboots.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn shutdown(&self) -> io::Result<()> {
            Err(io::Error::other("not permitted"))
        }

        fn quit(&self) -> io::Result<()> {
            self.quits.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn system_worker_runs_requests_in_order() {
        let ops = Arc::new(Counting::default());
        let (tx, handle) = spawn_system_worker(ops.clone());

        tx.send(SystemRequest::Reboot).unwrap();
        tx.send(SystemRequest::Shutdown).unwrap();
        tx.send(SystemRequest::Quit).unwrap();
        drop(tx);
        handle.await.unwrap();

        assert_eq!(ops.reboots.load(Ordering::SeqCst), 1);
        assert_eq!(ops.quits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn persist_worker_writes_through() {
        let store = Arc::new(crate::settings::MemorySettings::new());
        let (tx, handle) = spawn_persist_worker(store.clone());

        let mut map = SettingsMap::new();
        map.entry("General".into())
            .or_default()
            .insert("slogan".into(), "hi".into());
        tx.send(map).unwrap();
        drop(tx);
        handle.await.unwrap();

        assert_eq!(store.snapshot()["General"]["slogan"], "hi");
    }
}
