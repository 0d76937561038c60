//! ReconciliationServer — the periodic reconcile-or-kill loop.
//!
//! Each tick either asks the resource manager to reconcile tasks whose
//! state is unconfirmed, or, once every cluster is confirmed, terminates
//! the nodes cluster policy wants gone. Never both in the same tick.
//!
//! The state lock is held for the whole tick, including driver calls.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use quorum_state::SchedulerState;

use crate::cluster::{ClusterNode, ManagedCluster};
use crate::config::ReconcileConfig;
use crate::core::SchedulerCore;
use crate::driver::{DriverError, DriverStatus, SchedulerDriver};
use crate::error::{SchedulerError, SchedulerResult};

/// What a single tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Disabled,
    /// Reconciliation was requested for this many clusters; nothing was
    /// killed.
    Reconciled { clusters: usize },
    /// Nothing needed reconciling and the kill phase ran.
    Converged { persisted: bool },
}

pub struct ReconciliationServer<C> {
    enabled: AtomicBool,
    driver: Arc<dyn SchedulerDriver>,
    core: Arc<SchedulerCore<C>>,
    config: ReconcileConfig,
}

impl<C: ManagedCluster> ReconciliationServer<C> {
    /// Create a disabled server.
    pub fn new(
        driver: Arc<dyn SchedulerDriver>,
        core: Arc<SchedulerCore<C>>,
        config: ReconcileConfig,
    ) -> Self {
        Self {
            enabled: AtomicBool::new(false),
            driver,
            core,
            config,
        }
    }

    pub fn enable(&self) {
        info!("reconciliation enabled");
        self.enabled.store(true, Ordering::SeqCst);
    }

    pub fn disable(&self) {
        info!("reconciliation disabled");
        self.enabled.store(false, Ordering::SeqCst);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    /// Run one reconcile-or-kill pass.
    ///
    /// Returns `SchedulerError::DriverNotRunning` as soon as the driver
    /// reports it is down; the remaining clusters are not visited and
    /// nothing is persisted. Changes from a tick whose save failed are
    /// saved by the next tick.
    pub async fn tick(&self) -> SchedulerResult<TickOutcome> {
        if !self.is_enabled() {
            return Ok(TickOutcome::Disabled);
        }

        let mut state = self.core.lock().await;

        let reconciled = self.reconcile_tasks(&state);
        if reconciled > 0 {
            self.core.persist_if_needed(&state, false)?;
            return Ok(TickOutcome::Reconciled {
                clusters: reconciled,
            });
        }

        let dirty = self.kill_tasks(&mut state)?;
        let persisted = self.core.persist_if_needed(&state, dirty)?;
        Ok(TickOutcome::Converged { persisted })
    }

    /// Request reconciliation for every cluster with unconfirmed tasks.
    /// Returns the number of clusters a request was made for.
    fn reconcile_tasks(&self, state: &SchedulerState<C>) -> usize {
        let mut requested = 0;
        for cluster in state.clusters.values() {
            let tasks = cluster.tasks_to_reconcile();
            if tasks.is_empty() {
                continue;
            }
            debug!(cluster = cluster.name(), tasks = tasks.len(), "reconciling tasks");
            if let Err(e) = self.driver.reconcile_tasks(&tasks) {
                warn!(cluster = cluster.name(), error = %e, "reconcile request failed");
            }
            requested += 1;
        }
        requested
    }

    /// Terminate, drop and retire according to cluster policy. Returns
    /// whether the state changed.
    fn kill_tasks(&self, state: &mut SchedulerState<C>) -> SchedulerResult<bool> {
        let mut dirty = false;
        let names: Vec<String> = state.clusters.keys().cloned().collect();

        for name in names {
            let Some(cluster) = state.clusters.get_mut(&name) else {
                continue;
            };

            let (to_kill, to_remove) = cluster.nodes_to_kill_or_remove();
            for node in &to_kill {
                self.terminate(&name, node)?;
            }
            for node in &to_remove {
                cluster.remove_node(node);
                dirty = true;
            }

            if cluster.can_be_removed() && state.retire_cluster(&name) {
                info!(cluster = %name, "cluster moved to graveyard");
                dirty = true;
            }

            // A retired cluster still gets its restart pass, from the graveyard.
            let cluster = match state.clusters.get_mut(&name) {
                Some(cluster) => cluster,
                None => match state.graveyard.get_mut(&name) {
                    Some(cluster) => cluster,
                    None => continue,
                },
            };
            let (to_restart, modified) = cluster.nodes_to_restart();
            dirty |= modified;
            for node in &to_restart {
                self.terminate(&name, node)?;
            }
        }
        Ok(dirty)
    }

    /// Ask the node to finish, falling back to killing its task.
    fn terminate(&self, cluster: &str, node: &C::Node) -> SchedulerResult<()> {
        let task_id = node.task_id();

        if let Some(slave_id) = node.slave_id() {
            info!(cluster, %task_id, "sending finish message");
            match self.driver.send_framework_message(
                &node.executor_id(),
                slave_id,
                &self.config.finish_message,
            ) {
                Ok(()) => return Ok(()),
                Err(DriverError::NotRunning(status)) => return Err(driver_down(status)),
                Err(DriverError::Call(e)) => {
                    warn!(cluster, %task_id, error = %e, "finish message failed, killing task");
                }
            }
        }

        info!(cluster, %task_id, "killing task");
        match self.driver.kill_task(&task_id) {
            Ok(()) => Ok(()),
            Err(DriverError::NotRunning(status)) => Err(driver_down(status)),
            Err(DriverError::Call(e)) => {
                warn!(cluster, %task_id, error = %e, "kill task failed");
                Ok(())
            }
        }
    }

    /// Tick immediately, then every interval, until `shutdown` changes.
    ///
    /// Returns the fatal error that stopped the loop, if any. Other tick
    /// errors are logged and the loop continues.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> SchedulerResult<()> {
        let interval = self.config.interval();
        info!(interval_secs = interval.as_secs(), "reconciliation loop started");

        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match self.tick().await {
                        Ok(outcome) => debug!(?outcome, "reconciliation tick"),
                        Err(e) if e.is_fatal() => return Err(e),
                        Err(e) => error!(error = %e, "reconciliation tick failed"),
                    }
                }
                _ = shutdown.changed() => {
                    info!("reconciliation loop shutting down");
                    return Ok(());
                }
            }
        }
    }

    /// Run the loop on the tokio runtime. The process exits if the driver
    /// goes down.
    pub fn spawn(self: Arc<Self>, shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(async move {
            if let Err(e) = self.run(shutdown).await {
                error!(error = %e, "reconciliation stopped, exiting");
                std::process::exit(1);
            }
        })
    }
}

fn driver_down(status: DriverStatus) -> SchedulerError {
    error!(%status, "driver not running");
    SchedulerError::DriverNotRunning(status)
}
