//! Cluster and node lifecycle policy.
//!
//! The reconciliation loop only talks to clusters through
//! [`ManagedCluster`]; it never decides on its own which node to kill,
//! restart or drop. [`FrameworkCluster`] is the policy shipped with the
//! framework.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use quorum_resources::NodeRequest;
use quorum_state::{ExecutorId, SlaveId, TaskId, TaskState, TaskStatus};

/// A node as seen by the reconciliation loop.
pub trait ClusterNode {
    fn task_id(&self) -> TaskId;
    fn executor_id(&self) -> ExecutorId;
    /// Agent the node's task was launched on, if it was launched.
    fn slave_id(&self) -> Option<&SlaveId>;
}

/// Policy queries and mutations the reconciliation loop needs from a cluster.
pub trait ManagedCluster: Send + 'static {
    type Node: ClusterNode + Send;

    fn name(&self) -> &str;

    /// Tasks whose state has not been confirmed by the resource manager.
    fn tasks_to_reconcile(&self) -> Vec<TaskStatus>;

    /// Nodes whose tasks must be terminated, and nodes that can be dropped.
    fn nodes_to_kill_or_remove(&self) -> (Vec<Self::Node>, Vec<Self::Node>);

    /// Nodes whose tasks must be terminated so they can relaunch. The flag
    /// reports whether collecting them modified the cluster.
    fn nodes_to_restart(&mut self) -> (Vec<Self::Node>, bool);

    fn can_be_removed(&self) -> bool;

    fn remove_node(&mut self, node: &Self::Node);

    /// Apply a task status update. Returns true if a node of this cluster
    /// owned the task.
    fn handle_status_update(&mut self, task_id: &TaskId, state: TaskState) -> bool;
}

// ── Framework policy ───────────────────────────────────────────────

/// Where a node is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeState {
    /// Waiting for an offer.
    Pending,
    Launching,
    Running,
    /// Task is being terminated so it can relaunch.
    Restarting,
    /// Task is being terminated for good.
    ShuttingDown,
    Shutdown,
}

impl NodeState {
    /// True while a task may be alive on an agent.
    pub fn has_task(&self) -> bool {
        matches!(
            self,
            Self::Launching | Self::Running | Self::Restarting | Self::ShuttingDown
        )
    }
}

/// Where the node should end up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Destination {
    Running,
    Shutdown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameworkNode {
    pub cluster: String,
    pub name: String,
    /// Bumped on every relaunch so each launch gets a fresh task ID.
    pub generation: u64,
    pub slave_id: Option<SlaveId>,
    pub current: NodeState,
    pub destination: Destination,
    pub last_task_state: Option<TaskState>,
    pub reconciled: bool,
    pub restart_requested: bool,
}

impl FrameworkNode {
    fn new(cluster: &str, name: &str) -> Self {
        Self {
            cluster: cluster.to_string(),
            name: name.to_string(),
            generation: 0,
            slave_id: None,
            current: NodeState::Pending,
            destination: Destination::Running,
            last_task_state: None,
            reconciled: true,
            restart_requested: false,
        }
    }

    fn relaunch(&mut self) {
        self.current = NodeState::Pending;
        self.generation += 1;
        self.slave_id = None;
        self.last_task_state = None;
    }
}

impl ClusterNode for FrameworkNode {
    fn task_id(&self) -> TaskId {
        TaskId::new(format!("{}-{}-{}", self.cluster, self.name, self.generation))
    }

    fn executor_id(&self) -> ExecutorId {
        ExecutorId::new(format!("{}-{}", self.cluster, self.name))
    }

    fn slave_id(&self) -> Option<&SlaveId> {
        self.slave_id.as_ref()
    }
}

/// A named group of nodes sharing one resource request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameworkCluster {
    pub name: String,
    pub node_request: NodeRequest,
    pub nodes: BTreeMap<String, FrameworkNode>,
    pub destroyed: bool,
}

impl FrameworkCluster {
    pub fn new(name: impl Into<String>, node_request: NodeRequest) -> Self {
        Self {
            name: name.into(),
            node_request,
            nodes: BTreeMap::new(),
            destroyed: false,
        }
    }

    /// Add a pending node. Returns false if the name is taken.
    pub fn add_node(&mut self, name: &str) -> bool {
        if self.nodes.contains_key(name) {
            return false;
        }
        self.nodes
            .insert(name.to_string(), FrameworkNode::new(&self.name, name));
        true
    }

    pub fn node(&self, name: &str) -> Option<&FrameworkNode> {
        self.nodes.get(name)
    }

    /// Names of nodes waiting for an offer.
    pub fn pending_nodes(&self) -> Vec<&str> {
        self.nodes
            .values()
            .filter(|n| n.current == NodeState::Pending && n.destination == Destination::Running)
            .map(|n| n.name.as_str())
            .collect()
    }

    /// Record that a pending node's task was launched on `slave_id`.
    pub fn mark_launched(&mut self, name: &str, slave_id: SlaveId) -> Option<TaskId> {
        let node = self.nodes.get_mut(name)?;
        if node.current != NodeState::Pending {
            return None;
        }
        node.slave_id = Some(slave_id);
        node.current = NodeState::Launching;
        node.reconciled = false;
        let task_id = node.task_id();
        debug!(cluster = %self.name, node = name, %task_id, "node launched");
        Some(task_id)
    }

    /// Send a node towards shutdown. Returns false if there is no such node.
    pub fn decommission_node(&mut self, name: &str) -> bool {
        let Some(node) = self.nodes.get_mut(name) else {
            return false;
        };
        node.destination = Destination::Shutdown;
        node.restart_requested = false;
        node.current = if node.current.has_task() {
            NodeState::ShuttingDown
        } else {
            NodeState::Shutdown
        };
        info!(cluster = %self.name, node = name, "node decommissioned");
        true
    }

    pub fn request_restart(&mut self, name: &str) -> bool {
        match self.nodes.get_mut(name) {
            Some(node) if node.destination == Destination::Running => {
                node.restart_requested = true;
                true
            }
            _ => false,
        }
    }

    /// Decommission every node and mark the cluster for removal.
    pub fn destroy(&mut self) {
        let names: Vec<String> = self.nodes.keys().cloned().collect();
        for name in names {
            self.decommission_node(&name);
        }
        self.destroyed = true;
    }

    /// Ask for every launched node to be reconciled again, e.g. after
    /// re-registering with the resource manager.
    pub fn mark_unreconciled(&mut self) {
        for node in self.nodes.values_mut().filter(|n| n.current.has_task()) {
            node.reconciled = false;
        }
    }
}

impl ManagedCluster for FrameworkCluster {
    type Node = FrameworkNode;

    fn name(&self) -> &str {
        &self.name
    }

    fn tasks_to_reconcile(&self) -> Vec<TaskStatus> {
        self.nodes
            .values()
            .filter(|n| n.current.has_task() && !n.reconciled)
            .map(|n| TaskStatus {
                task_id: n.task_id(),
                slave_id: n.slave_id.clone(),
                state: n.last_task_state.unwrap_or(TaskState::Staging),
            })
            .collect()
    }

    fn nodes_to_kill_or_remove(&self) -> (Vec<FrameworkNode>, Vec<FrameworkNode>) {
        self.nodes
            .values()
            .filter(|n| n.destination == Destination::Shutdown)
            .cloned()
            .partition(|n| n.current.has_task())
    }

    fn nodes_to_restart(&mut self) -> (Vec<FrameworkNode>, bool) {
        let mut modified = false;
        let mut restart = Vec::new();
        for node in self.nodes.values_mut() {
            if node.restart_requested && node.current == NodeState::Running {
                node.restart_requested = false;
                node.current = NodeState::Restarting;
                modified = true;
            }
            if node.current == NodeState::Restarting {
                restart.push(node.clone());
            }
        }
        (restart, modified)
    }

    fn can_be_removed(&self) -> bool {
        self.destroyed && self.nodes.is_empty()
    }

    fn remove_node(&mut self, node: &FrameworkNode) {
        if self.nodes.remove(&node.name).is_some() {
            info!(cluster = %self.name, node = %node.name, "node removed");
        }
    }

    fn handle_status_update(&mut self, task_id: &TaskId, state: TaskState) -> bool {
        // Only the current generation matches; updates for earlier
        // launches are dropped here.
        let Some(node) = self
            .nodes
            .values_mut()
            .find(|n| n.current.has_task() && n.task_id() == *task_id)
        else {
            return false;
        };

        node.reconciled = true;
        node.last_task_state = Some(state);

        if state.is_terminal() {
            if node.destination == Destination::Shutdown {
                node.current = NodeState::Shutdown;
            } else {
                node.relaunch();
            }
            info!(cluster = %self.name, node = %node.name, %task_id, ?state, current = ?node.current, "task ended");
        } else if state == TaskState::Running && node.current == NodeState::Launching {
            node.current = NodeState::Running;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> NodeRequest {
        NodeRequest {
            cpus: 1.0,
            mem: 1024.0,
            disk: 4096.0,
            ports: 2,
        }
    }

    fn running_cluster() -> FrameworkCluster {
        let mut cluster = FrameworkCluster::new("riak", request());
        cluster.add_node("a");
        let task_id = cluster.mark_launched("a", SlaveId::new("agent-1")).unwrap();
        cluster.handle_status_update(&task_id, TaskState::Running);
        cluster
    }

    #[test]
    fn ids_follow_naming_scheme() {
        let cluster = running_cluster();
        let node = cluster.node("a").unwrap();
        assert_eq!(node.task_id().as_str(), "riak-a-0");
        assert_eq!(node.executor_id().as_str(), "riak-a");
    }

    #[test]
    fn launched_nodes_need_reconciliation_until_confirmed() {
        let mut cluster = FrameworkCluster::new("riak", request());
        assert!(cluster.add_node("a"));
        assert!(!cluster.add_node("a"));
        assert!(cluster.tasks_to_reconcile().is_empty());

        let task_id = cluster.mark_launched("a", SlaveId::new("agent-1")).unwrap();
        let pending = cluster.tasks_to_reconcile();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].task_id, task_id);
        assert_eq!(pending[0].state, TaskState::Staging);

        assert!(cluster.handle_status_update(&task_id, TaskState::Running));
        assert!(cluster.tasks_to_reconcile().is_empty());
        assert_eq!(cluster.node("a").unwrap().current, NodeState::Running);

        cluster.mark_unreconciled();
        assert_eq!(cluster.tasks_to_reconcile()[0].state, TaskState::Running);
    }

    #[test]
    fn decommissioned_node_is_killed_then_removed() {
        let mut cluster = running_cluster();
        cluster.decommission_node("a");

        let (kill, remove) = cluster.nodes_to_kill_or_remove();
        assert_eq!(kill.len(), 1);
        assert!(remove.is_empty());

        let task_id = kill[0].task_id();
        cluster.handle_status_update(&task_id, TaskState::Killed);
        let (kill, remove) = cluster.nodes_to_kill_or_remove();
        assert!(kill.is_empty());
        assert_eq!(remove.len(), 1);

        cluster.remove_node(&remove[0]);
        assert!(cluster.nodes.is_empty());
        assert!(!cluster.can_be_removed());
    }

    #[test]
    fn restart_relaunches_with_new_generation() {
        let mut cluster = running_cluster();
        assert!(cluster.request_restart("a"));

        let (restart, modified) = cluster.nodes_to_restart();
        assert!(modified);
        assert_eq!(restart.len(), 1);

        // Still terminating on the next pass, but nothing new changed.
        let (restart, modified) = cluster.nodes_to_restart();
        assert!(!modified);
        assert_eq!(restart.len(), 1);

        let old = restart[0].task_id();
        cluster.handle_status_update(&old, TaskState::Killed);
        let node = cluster.node("a").unwrap();
        assert_eq!(node.current, NodeState::Pending);
        assert_eq!(node.generation, 1);
        assert_eq!(cluster.pending_nodes(), vec!["a"]);

        // A late update for the previous launch is ignored.
        assert!(!cluster.handle_status_update(&old, TaskState::Lost));
    }

    #[test]
    fn destroyed_cluster_is_removable_once_empty() {
        let mut cluster = FrameworkCluster::new("riak", request());
        cluster.add_node("a");
        cluster.destroy();

        let (kill, remove) = cluster.nodes_to_kill_or_remove();
        assert!(kill.is_empty());
        assert_eq!(remove.len(), 1);
        cluster.remove_node(&remove[0]);
        assert!(cluster.can_be_removed());
    }
}
