//! Integration tests for the reconciliation loop.
//!
//! Drives a `FrameworkCluster` through its whole lifecycle against a
//! recording driver and a redb in-memory `StateStore`:
//! 1. A node is matched against an offer and launched
//! 2. The launched task is reconciled until a status update confirms it
//! 3. Decommissioning sends a finish message, then drops the node once
//!    its task ends
//! 4. A destroyed, empty cluster lands in the graveyard and the persisted
//!    state reflects it

use std::sync::{Arc, Mutex, Once};

use quorum_resources::{CPUS, DISK, MEM, OfferEvaluator, OfferMatch, PORTS, Resource, ValueRange};
use quorum_scheduler::{
    DriverResult, FrameworkCluster, ReconcileConfig, ReconciliationServer, SchedulerCore,
    SchedulerDriver, TickOutcome,
};
use quorum_state::{ExecutorId, SchedulerState, SlaveId, StateStore, TaskId, TaskState, TaskStatus};

// ── Tracing setup ────────────────────────────────────────────────

static TRACING_INIT: Once = Once::new();

/// Controlled by `RUST_LOG` (e.g. `RUST_LOG=debug`).
fn init_tracing() {
    TRACING_INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init()
            .ok();
    });
}

// ── Fake driver ──────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
enum Call {
    Message(ExecutorId, SlaveId),
    Kill(TaskId),
    Reconcile(Vec<TaskId>),
}

#[derive(Default)]
struct RecordingDriver {
    calls: Mutex<Vec<Call>>,
}

impl RecordingDriver {
    fn take(&self) -> Vec<Call> {
        std::mem::take(&mut *self.calls.lock().unwrap())
    }
}

impl SchedulerDriver for RecordingDriver {
    fn send_framework_message(
        &self,
        executor_id: &ExecutorId,
        slave_id: &SlaveId,
        _data: &str,
    ) -> DriverResult<()> {
        self.calls
            .lock()
            .unwrap()
            .push(Call::Message(executor_id.clone(), slave_id.clone()));
        Ok(())
    }

    fn kill_task(&self, task_id: &TaskId) -> DriverResult<()> {
        self.calls.lock().unwrap().push(Call::Kill(task_id.clone()));
        Ok(())
    }

    fn reconcile_tasks(&self, statuses: &[TaskStatus]) -> DriverResult<()> {
        let ids = statuses.iter().map(|s| s.task_id.clone()).collect();
        self.calls.lock().unwrap().push(Call::Reconcile(ids));
        Ok(())
    }
}

fn offer() -> Vec<Resource> {
    vec![
        Resource::scalar(CPUS, 8.0),
        Resource::scalar(MEM, 16_384.0),
        Resource::scalar(DISK, 100_000.0),
        Resource::ranges(PORTS, vec![ValueRange::new(31000, 32000)]),
    ]
}

fn status(task_id: &TaskId, state: TaskState) -> TaskStatus {
    TaskStatus {
        task_id: task_id.clone(),
        slave_id: Some(SlaveId::new("agent-1")),
        state,
    }
}

#[tokio::test]
async fn cluster_lifecycle_end_to_end() {
    init_tracing();

    let store = StateStore::open_in_memory().unwrap();
    let config = quorum_scheduler::SchedulerConfig::default();

    let mut cluster = FrameworkCluster::new("riak", config.node.request());
    cluster.add_node("a");
    let mut state = SchedulerState::new(config.framework_name.clone());
    state.add_cluster("riak", cluster);

    let core = Arc::new(SchedulerCore::new(state, Arc::new(store.clone())));
    let driver = Arc::new(RecordingDriver::default());
    let server = ReconciliationServer::new(driver.clone(), core.clone(), ReconcileConfig::default());

    // Disabled until the framework registers.
    assert_eq!(server.tick().await.unwrap(), TickOutcome::Disabled);
    server.enable();

    // Match the pending node against an offer and launch it.
    let task_id = {
        let mut state = core.lock().await;
        let cluster = state.cluster_mut("riak").unwrap();
        assert_eq!(cluster.pending_nodes(), vec!["a"]);

        let result = OfferEvaluator::default().evaluate(&offer(), &cluster.node_request);
        let OfferMatch::Fits(allocation) = result else {
            panic!("offer should fit");
        };
        assert_eq!(allocation.ask.len(), 4);

        cluster.mark_launched("a", SlaveId::new("agent-1")).unwrap()
    };

    // Unconfirmed task: reconcile, never kill.
    assert_eq!(
        server.tick().await.unwrap(),
        TickOutcome::Reconciled { clusters: 1 }
    );
    assert_eq!(driver.take(), vec![Call::Reconcile(vec![task_id.clone()])]);

    assert!(core.status_update(&status(&task_id, TaskState::Running)).await.unwrap());
    assert_eq!(
        server.tick().await.unwrap(),
        TickOutcome::Converged { persisted: false }
    );
    assert!(driver.take().is_empty());

    // Tear the cluster down: finish message first.
    core.lock().await.cluster_mut("riak").unwrap().destroy();
    server.tick().await.unwrap();
    assert_eq!(
        driver.take(),
        vec![Call::Message(ExecutorId::new("riak-a"), SlaveId::new("agent-1"))]
    );

    // The task ends; the node is dropped and the cluster retired in one tick.
    assert!(core.status_update(&status(&task_id, TaskState::Finished)).await.unwrap());
    let revision_before = store.revision().unwrap();
    assert_eq!(
        server.tick().await.unwrap(),
        TickOutcome::Converged { persisted: true }
    );
    assert_eq!(store.revision().unwrap(), revision_before + 1);

    let persisted: SchedulerState<FrameworkCluster> =
        store.load_scheduler_state().unwrap().unwrap();
    assert!(persisted.cluster("riak").is_none());
    assert!(persisted.is_retired("riak"));
    assert!(persisted.graveyard["riak"].nodes.is_empty());
}

#[tokio::test]
async fn spawned_loop_reconciles_and_stops() {
    init_tracing();

    let mut cluster = FrameworkCluster::new(
        "riak",
        quorum_scheduler::NodeDefaults::default().request(),
    );
    cluster.add_node("a");
    cluster.mark_launched("a", SlaveId::new("agent-1"));
    let mut state = SchedulerState::new("quorum");
    state.add_cluster("riak", cluster);

    let store = StateStore::open_in_memory().unwrap();
    let core = Arc::new(SchedulerCore::new(state, Arc::new(store)));
    let driver = Arc::new(RecordingDriver::default());
    let server = Arc::new(ReconciliationServer::new(
        driver.clone(),
        core,
        ReconcileConfig::default(),
    ));
    server.enable();

    let (tx, rx) = tokio::sync::watch::channel(false);
    let handle = server.clone().spawn(rx);

    // The first tick fires immediately.
    tokio::time::timeout(std::time::Duration::from_secs(2), async {
        loop {
            if !driver.calls.lock().unwrap().is_empty() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();

    tx.send(true).unwrap();
    handle.await.unwrap();

    assert_eq!(
        driver.take(),
        vec![Call::Reconcile(vec![TaskId::new("riak-a-0")])]
    );
}
