//! engine::batch
//!
//! Runs one operation over many repositories.
//!
//! # Lifecycle
//!
//! Repositories are queued by [`RepoId`] or predicate (`Available -> Queued`),
//! dispatched by [`Batch::run`] (`Queued -> Working`) and finish in
//! `Success` or `Fail`. [`Batch::reset`] makes finished repositories
//! available again.
//!
//! # Concurrency
//!
//! Each dispatched entity is moved into its own blocking task and handed back
//! when the task ends, so one entity is never touched by two tasks. At most
//! `jobs` tasks run at once. A failing repository does not stop the others,
//! and a panicking operation fails only its own repository.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tokio::sync::Semaphore;

use super::modes::Mode;
use crate::core::types::RepoId;
use crate::repo::{OperationError, RepoState, RepositoryEntity, StateError};

/// Errors from queueing and running a batch.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BatchError {
    /// No repository in the batch has this id.
    #[error("no repository with id '{id}'")]
    UnknownRepository { id: RepoId },

    /// The repository cannot be (un)queued from its current state.
    #[error("cannot queue '{name}': {source}")]
    NotQueueable { name: String, source: StateError },

    /// `jobs` was zero.
    #[error("worker count must be at least 1")]
    NoWorkers,
}

/// Result of one repository in a batch run.
#[derive(Debug, Clone, Serialize)]
pub struct RepoOutcome {
    pub id: RepoId,
    pub name: String,
    pub path: PathBuf,
    pub state: RepoState,
    /// Whether any local or remote-tracking branch tip moved
    pub changed: bool,
    pub error: Option<String>,
}

/// Outcomes of a batch run, in batch order.
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub mode: Mode,
    pub outcomes: Vec<RepoOutcome>,
}

impl BatchReport {
    pub fn succeeded(&self) -> usize {
        self.count(RepoState::Success)
    }

    pub fn failed(&self) -> usize {
        self.count(RepoState::Fail)
    }

    /// Whether every dispatched repository succeeded.
    pub fn all_succeeded(&self) -> bool {
        self.failed() == 0
    }

    fn count(&self, state: RepoState) -> usize {
        self.outcomes.iter().filter(|o| o.state == state).count()
    }
}

/// A set of repositories and their batch states.
#[derive(Debug, Default)]
pub struct Batch {
    entities: Vec<RepositoryEntity>,
}

impl Batch {
    pub fn new(entities: Vec<RepositoryEntity>) -> Self {
        Self { entities }
    }

    pub fn entities(&self) -> &[RepositoryEntity] {
        &self.entities
    }

    pub fn get(&self, id: &RepoId) -> Option<&RepositoryEntity> {
        self.entities.iter().find(|e| e.id() == id)
    }

    /// Repositories whose directory is called `name`; there may be several.
    pub fn named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a RepositoryEntity> + 'a {
        self.entities.iter().filter(move |e| e.name() == name)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Number of repositories waiting for the next run.
    pub fn queued(&self) -> usize {
        self.entities
            .iter()
            .filter(|e| e.state() == RepoState::Queued)
            .count()
    }

    /// Queue the repository with `id`.
    ///
    /// # Errors
    ///
    /// - [`BatchError::UnknownRepository`] if there is no such repository
    /// - [`BatchError::NotQueueable`] unless it is `Available`
    pub fn queue(&mut self, id: &RepoId) -> Result<(), BatchError> {
        self.move_to(id, RepoState::Queued)
    }

    /// Take the repository with `id` back out of the queue.
    pub fn unqueue(&mut self, id: &RepoId) -> Result<(), BatchError> {
        self.move_to(id, RepoState::Available)
    }

    /// Queue every `Available` repository matching `predicate`.
    ///
    /// Returns how many were queued. Repositories in other states are left
    /// alone.
    pub fn queue_where(&mut self, mut predicate: impl FnMut(&RepositoryEntity) -> bool) -> usize {
        let mut queued = 0;
        for entity in &mut self.entities {
            if entity.state() == RepoState::Available
                && predicate(entity)
                && entity.transition(RepoState::Queued).is_ok()
            {
                queued += 1;
            }
        }
        queued
    }

    /// Move every finished repository back to `Available`.
    pub fn reset(&mut self) -> usize {
        let mut reset = 0;
        for entity in &mut self.entities {
            if entity.state().is_terminal() && entity.transition(RepoState::Available).is_ok() {
                reset += 1;
            }
        }
        reset
    }

    /// Apply `mode` to every queued repository, at most `jobs` at a time.
    ///
    /// Only `Queued` repositories are dispatched; the report lists those in
    /// batch order. Operation failures are recorded on the entity and in the
    /// report, never returned. A panicking operation fails its repository
    /// with [`OperationError::Panicked`].
    ///
    /// Dispatched repositories live in their tasks until the run completes;
    /// dropping the returned future early loses them from the batch.
    ///
    /// # Errors
    ///
    /// [`BatchError::NoWorkers`] if `jobs` is zero; nothing is dispatched.
    pub async fn run(&mut self, mode: Mode, jobs: usize) -> Result<BatchReport, BatchError> {
        self.run_with(mode, jobs, move |entity: &mut RepositoryEntity| mode.apply(entity))
            .await
    }

    /// Like [`Batch::run`], with `op` doing the work and `mode` naming it in
    /// the report.
    pub async fn run_with<F>(
        &mut self,
        mode: Mode,
        jobs: usize,
        op: F,
    ) -> Result<BatchReport, BatchError>
    where
        F: Fn(&mut RepositoryEntity) -> Result<(), OperationError> + Copy + Send + 'static,
    {
        if jobs == 0 {
            return Err(BatchError::NoWorkers);
        }

        let semaphore = Arc::new(Semaphore::new(jobs));
        let entities = std::mem::take(&mut self.entities);
        let mut slots: Vec<Slot> = Vec::with_capacity(entities.len());

        let queued = entities
            .iter()
            .filter(|e| e.state() == RepoState::Queued)
            .count();
        tracing::info!(mode = %mode, jobs, queued, "batch started");

        for mut entity in entities {
            if entity.state() != RepoState::Queued {
                slots.push(Slot::Idle(entity));
                continue;
            }

            let Ok(permit) = Arc::clone(&semaphore).acquire_owned().await else {
                slots.push(Slot::Idle(entity));
                continue;
            };
            if let Err(err) = entity.transition(RepoState::Working) {
                tracing::warn!(repo = %entity.name(), error = %err, "not dispatched");
                slots.push(Slot::Idle(entity));
                continue;
            }

            let id = entity.id().clone();
            let name = entity.name().to_string();
            let path = entity.path().to_path_buf();
            let handle = tokio::task::spawn_blocking(move || {
                let _permit = permit;
                let before = entity.fingerprint();
                let result = panic::catch_unwind(AssertUnwindSafe(|| op(&mut entity)))
                    .unwrap_or_else(|payload| {
                        Err(OperationError::Panicked {
                            operation: mode.to_string(),
                            message: panic_message(payload.as_ref()),
                        })
                    });
                let changed = entity.fingerprint() != before;
                match &result {
                    Ok(()) => tracing::info!(repo = %entity.name(), changed, "{}", mode.done()),
                    Err(err) => tracing::warn!(repo = %entity.name(), error = %err, "{} failed", mode),
                }
                if let Err(err) = entity.finish(result) {
                    tracing::error!(repo = %entity.name(), error = %err, "cannot record outcome");
                }
                (entity, changed)
            });
            slots.push(Slot::Dispatched {
                id,
                name,
                path,
                handle,
            });
        }

        let mut outcomes = Vec::new();
        for slot in slots {
            match slot {
                Slot::Idle(entity) => self.entities.push(entity),
                Slot::Dispatched {
                    id,
                    name,
                    path,
                    handle,
                } => match handle.await {
                    Ok((entity, changed)) => {
                        outcomes.push(RepoOutcome {
                            id: entity.id().clone(),
                            name: entity.name().to_string(),
                            path: entity.path().to_path_buf(),
                            state: entity.state(),
                            changed,
                            error: entity.last_error().map(|e| e.to_string()),
                        });
                        self.entities.push(entity);
                    }
                    // The entity went down with its task; it leaves the batch.
                    Err(err) => {
                        tracing::error!(repo = %name, error = %err, "worker lost");
                        outcomes.push(RepoOutcome {
                            id,
                            name,
                            path,
                            state: RepoState::Fail,
                            changed: false,
                            error: Some(format!("worker lost: {}", err)),
                        });
                    }
                },
            }
        }

        let report = BatchReport { mode, outcomes };
        tracing::info!(
            mode = %mode,
            succeeded = report.succeeded(),
            failed = report.failed(),
            "batch finished"
        );
        Ok(report)
    }

    fn move_to(&mut self, id: &RepoId, to: RepoState) -> Result<(), BatchError> {
        let entity = self
            .entities
            .iter_mut()
            .find(|e| e.id() == id)
            .ok_or_else(|| BatchError::UnknownRepository { id: id.clone() })?;
        let name = entity.name().to_string();
        entity
            .transition(to)
            .map_err(|source| BatchError::NotQueueable { name, source })
    }
}

enum Slot {
    Idle(RepositoryEntity),
    Dispatched {
        id: RepoId,
        name: String,
        path: PathBuf,
        handle: tokio::task::JoinHandle<(RepositoryEntity, bool)>,
    },
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}
