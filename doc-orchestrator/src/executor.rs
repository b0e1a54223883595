//! Dependency-gated task execution over a bounded worker pool.
//!
//! The `TaskManager` owns every pending task behind a single mutex.
//! Workers poll `next`, run the handler outside the lock, and `complete`
//! the task whatever the handler outcome, so dependents always unblock.
//! Every tenth successful pickup asks the calling worker to run the sync
//! callback, after the lock is released; the callback coordinates with
//! the snapshot file through its own lock.

use doctree_prep::ItemId;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tracing::debug;

/// How often (in successful pickups) the sync callback fires.
const SYNC_EVERY: u64 = 10;

/// Poll interval for workers finding no ready task.
const IDLE_SLEEP: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    Pending,
    Running,
}

/// One scheduled regeneration.
#[derive(Debug)]
pub struct Task {
    pub id: i64,
    /// Ids of tasks that must complete first; pruned by [`TaskManager::complete`].
    pub dependencies: Vec<i64>,
    pub status: TaskStatus,
    pub payload: ItemId,
}

/// A successful pickup from [`TaskManager::next`].
#[derive(Debug, Clone, Copy)]
pub struct Pickup {
    pub task_id: i64,
    pub payload: ItemId,
    /// The caller should run the sync callback before handling the task.
    pub sync_due: bool,
}

#[derive(Debug, Default)]
struct ManagerState {
    tasks: BTreeMap<i64, Task>,
    next_id: i64,
    pickups: u64,
}

/// Mutex-guarded task map shared by all workers.
#[derive(Debug, Default)]
pub struct TaskManager {
    state: Mutex<ManagerState>,
}

impl TaskManager {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, ManagerState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Register a task depending on `dep_ids`; ids of already-absent tasks
    /// are ignored. Returns the new task's id.
    pub fn add_task(&self, dep_ids: &[i64], payload: ItemId) -> i64 {
        let mut state = self.lock();
        let id = state.next_id;
        state.next_id += 1;
        let mut dependencies: Vec<i64> = dep_ids
            .iter()
            .copied()
            .filter(|d| state.tasks.contains_key(d))
            .collect();
        dependencies.sort_unstable();
        dependencies.dedup();
        state.tasks.insert(
            id,
            Task {
                id,
                dependencies,
                status: TaskStatus::Pending,
                payload,
            },
        );
        id
    }

    /// First pending task with no outstanding dependencies, flipped to
    /// `Running`. `None` when nothing is ready yet.
    pub fn next(&self, worker_id: usize) -> Option<Pickup> {
        let mut state = self.lock();
        let ready = state
            .tasks
            .values()
            .find(|t| t.status == TaskStatus::Pending && t.dependencies.is_empty())
            .map(|t| t.id)?;
        let remaining = state.tasks.len();
        if let Some(task) = state.tasks.get_mut(&ready) {
            task.status = TaskStatus::Running;
        }
        state.pickups += 1;
        let sync_due = state.pickups % SYNC_EVERY == 0;
        let payload = state.tasks[&ready].payload;
        debug!(worker = worker_id, task = ready, remaining, "picked task");
        Some(Pickup {
            task_id: ready,
            payload,
            sync_due,
        })
    }

    /// Drop the task and prune it from every dependency list, unblocking
    /// dependents.
    pub fn complete(&self, task_id: i64) {
        let mut state = self.lock();
        state.tasks.remove(&task_id);
        for task in state.tasks.values_mut() {
            task.dependencies.retain(|&d| d != task_id);
        }
    }

    /// True once every task has completed.
    pub fn all_success(&self) -> bool {
        self.lock().tasks.is_empty()
    }

    pub fn len(&self) -> usize {
        self.lock().tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, task_id: i64) -> bool {
        self.lock().tasks.contains_key(&task_id)
    }

    /// `(id, payload, dependency ids)` for every live task, for run logs.
    pub fn overview(&self) -> Vec<(i64, ItemId, Vec<i64>)> {
        self.lock()
            .tasks
            .values()
            .map(|t| (t.id, t.payload, t.dependencies.clone()))
            .collect()
    }
}

/// One worker loop: exit when the map drains, otherwise pick, sync when
/// due, handle, complete. Handler errors are the handler's business; the
/// task completes either way so dependents proceed.
pub async fn worker<H, HFut, S, SFut>(
    manager: Arc<TaskManager>,
    worker_id: usize,
    handler: H,
    sync: S,
) where
    H: Fn(ItemId) -> HFut,
    HFut: Future<Output = ()>,
    S: Fn() -> SFut,
    SFut: Future<Output = ()>,
{
    loop {
        if manager.all_success() {
            return;
        }
        let Some(pickup) = manager.next(worker_id) else {
            tokio::time::sleep(IDLE_SLEEP).await;
            continue;
        };
        if pickup.sync_due {
            sync().await;
        }
        handler(pickup.payload).await;
        manager.complete(pickup.task_id);
    }
}
