//! Install and activation.
//!
//! ```text
//! Idle -> Installing -> Installed -> Activating -> Activated
//!              \
//!               -> Redundant   (a critical resource could not be stored)
//! ```
//!
//! Installing pre-warms the `static` store with every critical resource and
//! fails as a whole if any one is missing. Background resources are warmed
//! into `dynamic` on a detached task and never fail the install.
//! Activating deletes every store outside the current version's names and
//! claims the connected clients.

use std::collections::BTreeSet;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use stash_client::StrategyEngine;
use stash_core::{Envelope, Error, LogicalStore, Request};
use tokio::task::JoinHandle;

use super::Worker;
use super::control::WorkerMessage;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum Phase {
    Idle,
    Installing,
    Installed,
    Activating,
    Activated,
    Redundant,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::Installing => "installing",
            Phase::Installed => "installed",
            Phase::Activating => "activating",
            Phase::Activated => "activated",
            Phase::Redundant => "redundant",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug)]
pub struct InstallReport {
    pub version: String,
    /// Critical paths stored in the `static` store.
    pub precached: Vec<String>,
    /// Stores from an older version exist, so activation waits.
    pub update_available: bool,
    /// Set when a forced activation was queued during install.
    pub activated: Option<ActivateReport>,
    /// Background warm task; yields the number of resources stored.
    pub background: JoinHandle<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ActivateReport {
    pub version: String,
    /// Stores removed because they belong to another version.
    pub deleted: Vec<String>,
    pub claimed: usize,
    /// Clients that received `UPDATE_ACTIVATED`.
    pub notified: usize,
}

impl Worker {
    pub async fn install(&self) -> Result<InstallReport, Error> {
        {
            let mut state = self.state.lock().await;
            if state.phase != Phase::Idle {
                return Err(Error::InvalidState(format!("cannot install while {}", state.phase)));
            }
            state.phase = Phase::Installing;
        }

        tracing::info!(version = %self.config.version, "installing");

        let precached = match self.precache_critical().await {
            Ok(paths) => paths,
            Err(e) => {
                self.state.lock().await.phase = Phase::Redundant;
                tracing::error!(version = %self.config.version, error = %e, "install failed");
                return Err(e);
            }
        };

        let background = self.spawn_background_warm();
        let update_available = self.has_foreign_stores().await;

        // Broadcast before leaving Installing so UPDATE_ACTIVATED cannot overtake it.
        let force = {
            let mut state = self.state.lock().await;
            state.update_available = update_available;
            if update_available {
                let message = WorkerMessage::UpdateAvailable { version: self.config.version.clone() };
                self.clients.broadcast(message).await;
            }
            state.phase = Phase::Installed;
            std::mem::take(&mut state.activate_after_install)
        };

        tracing::info!(
            version = %self.config.version,
            precached = precached.len(),
            update_available,
            "installed"
        );

        let activated = if force { Some(self.activate().await?) } else { None };

        Ok(InstallReport { version: self.config.version.clone(), precached, update_available, activated, background })
    }

    pub async fn activate(&self) -> Result<ActivateReport, Error> {
        {
            let mut state = self.state.lock().await;
            if state.phase != Phase::Installed {
                return Err(Error::InvalidState(format!("cannot activate while {}", state.phase)));
            }
            state.phase = Phase::Activating;
        }

        let current = LogicalStore::current_names(&self.config.version);
        let deleted = match self.db.delete_stores_not_in(&current).await {
            Ok(deleted) => deleted,
            Err(e) => {
                tracing::warn!(error = %e, "old store cleanup failed");
                Vec::new()
            }
        };

        let claimed = self.clients.claim(&self.config.version).await;
        {
            let mut state = self.state.lock().await;
            state.phase = Phase::Activated;
            state.update_available = false;
        }

        let message = WorkerMessage::UpdateActivated { version: self.config.version.clone() };
        let notified = self.clients.broadcast(message).await;

        tracing::info!(
            version = %self.config.version,
            deleted = deleted.len(),
            claimed,
            "activated"
        );

        Ok(ActivateReport { version: self.config.version.clone(), deleted, claimed, notified })
    }

    /// Activate now if installed, or as soon as an in-flight install finishes.
    pub(crate) async fn force_activate(&self) -> Result<Option<ActivateReport>, Error> {
        let phase = {
            let mut state = self.state.lock().await;
            if state.phase == Phase::Installing {
                state.activate_after_install = true;
            }
            state.phase
        };

        match phase {
            Phase::Installed => self.activate().await.map(Some),
            Phase::Installing | Phase::Activating | Phase::Activated => Ok(None),
            Phase::Idle | Phase::Redundant => Err(Error::InvalidState(format!("nothing to activate while {phase}"))),
        }
    }

    /// Fetch every critical resource, then write them in one transaction.
    /// A single failure leaves the `static` store untouched.
    async fn precache_critical(&self) -> Result<Vec<String>, Error> {
        let mut entries = Vec::with_capacity(self.config.critical_resources.len());

        for path in &self.config.critical_resources {
            let request = Request::get(path, &self.origin).map_err(|e| Error::InstallFailed(format!("{path}: {e}")))?;
            let response =
                self.engine.fetch_success(&request).await.map_err(|e| Error::InstallFailed(format!("{path}: {e}")))?;
            entries.push((request, Envelope::now(response)));
        }

        self.db
            .put_entries(&self.engine.stores().static_store, &entries)
            .await
            .map_err(|e| Error::InstallFailed(format!("static store write: {e}")))?;

        Ok(self.config.critical_resources.clone())
    }

    fn spawn_background_warm(&self) -> JoinHandle<usize> {
        let requests: Vec<Request> = self
            .config
            .background_resources
            .iter()
            .filter_map(|path| match Request::get(path, &self.origin) {
                Ok(request) => Some(request),
                Err(e) => {
                    tracing::warn!(path = %path, error = %e, "skipping background resource");
                    None
                }
            })
            .collect();

        tokio::spawn(warm(self.engine.clone(), requests))
    }

    async fn has_foreign_stores(&self) -> bool {
        let current: BTreeSet<String> = LogicalStore::current_names(&self.config.version);
        match self.db.list_stores().await {
            Ok(names) => names.iter().any(|name| !current.contains(name)),
            Err(e) => {
                tracing::warn!(error = %e, "store listing failed");
                false
            }
        }
    }
}

async fn warm(engine: StrategyEngine, requests: Vec<Request>) -> usize {
    let store = engine.stores().dynamic.clone();
    let mut stored = 0;
    for request in &requests {
        match engine.precache(&store, request).await {
            Ok(()) => stored += 1,
            Err(e) => tracing::debug!(url = %request.url(), error = %e, "background warm skipped"),
        }
    }
    stored
}
