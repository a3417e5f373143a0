//! Transfer supervisor: spawns one engine invocation per submitted task,
//! aggregates progress into a single event stream, and supports per-task
//! and global cancellation.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use uuid::Uuid;

use nimbus_api::DriveClient;
use nimbus_credentials::IdentityProvider;
use nimbus_transfer::{TransferEngine, TransferError, UploadRequest, UploadStrategy, UserAction};

use crate::types::{TaskEvent, TaskState, TransferTask, UploadSpec};

struct TaskEntry {
    task: TransferTask,
    cancel: CancellationToken,
}

type TaskMap = Arc<Mutex<HashMap<Uuid, TaskEntry>>>;

/// Supervises background transfers.
///
/// Tasks for different files or accounts run concurrently; each task's own
/// chunk loop stays strictly sequential inside the engine.
pub struct TransferSupervisor<C, P: IdentityProvider> {
    engine: Arc<TransferEngine<C, P>>,
    tasks: TaskMap,
    events_tx: mpsc::Sender<TaskEvent>,
    events_rx: Option<mpsc::Receiver<TaskEvent>>,
    root_cancel: CancellationToken,
    active_tx: watch::Sender<usize>,
    active_rx: watch::Receiver<usize>,
}

impl<C, P> TransferSupervisor<C, P>
where
    C: DriveClient + 'static,
    P: IdentityProvider + 'static,
{
    pub fn new(engine: Arc<TransferEngine<C, P>>) -> Self {
        let (events_tx, events_rx) = mpsc::channel(256);
        let (active_tx, active_rx) = watch::channel(0);
        Self {
            engine,
            tasks: Arc::new(Mutex::new(HashMap::new())),
            events_tx,
            events_rx: Some(events_rx),
            root_cancel: CancellationToken::new(),
            active_tx,
            active_rx,
        }
    }

    /// Takes the event receiver. Can only be called once.
    pub fn take_events(&mut self) -> Option<mpsc::Receiver<TaskEvent>> {
        self.events_rx.take()
    }

    /// Queues an upload and starts it in the background.
    pub fn submit(&self, spec: UploadSpec) -> Uuid {
        let task_id = Uuid::new_v4();
        let cancel = self.root_cancel.child_token();
        let task = TransferTask {
            task_id,
            account_id: spec.account_id.clone(),
            file_name: spec.file_name.clone(),
            content_type: spec.content_type.clone(),
            total_bytes: 0,
            strategy: None,
            progress_percent: 0,
            state: TaskState::Queued,
        };
        self.tasks.lock().unwrap().insert(
            task_id,
            TaskEntry {
                task,
                cancel: cancel.clone(),
            },
        );
        self.active_tx.send_modify(|n| *n += 1);
        info!(task = %task_id, file = %spec.file_name, "task submitted");

        let engine = Arc::clone(&self.engine);
        let tasks = Arc::clone(&self.tasks);
        let events = self.events_tx.clone();
        let active = self.active_tx.clone();
        tokio::spawn(async move {
            run_task(engine, tasks, events, spec, task_id, cancel).await;
            active.send_modify(|n| *n -= 1);
        });
        task_id
    }

    /// Requests cancellation of one task. Returns `false` for unknown or
    /// already-terminal tasks.
    pub fn cancel(&self, task_id: Uuid) -> bool {
        let tasks = self.tasks.lock().unwrap();
        match tasks.get(&task_id) {
            Some(entry) if !entry.task.state.is_terminal() => {
                entry.cancel.cancel();
                true
            }
            _ => false,
        }
    }

    /// Requests cancellation of every running task.
    pub fn cancel_all(&self) {
        self.root_cancel.cancel();
    }

    /// Number of tasks not yet terminal.
    pub fn active_count(&self) -> usize {
        *self.active_rx.borrow()
    }

    /// Resolves once every submitted task has reached a terminal state.
    pub async fn await_idle(&self) {
        let mut rx = self.active_rx.clone();
        // Sender lives in self, so wait_for cannot observe a closed channel.
        let _ = rx.wait_for(|n| *n == 0).await;
    }

    /// Snapshot of one task.
    pub fn task(&self, task_id: Uuid) -> Option<TransferTask> {
        self.tasks
            .lock()
            .unwrap()
            .get(&task_id)
            .map(|e| e.task.clone())
    }

    /// Snapshot of every known task.
    pub fn tasks(&self) -> Vec<TransferTask> {
        self.tasks
            .lock()
            .unwrap()
            .values()
            .map(|e| e.task.clone())
            .collect()
    }
}

async fn run_task<C: DriveClient, P: IdentityProvider>(
    engine: Arc<TransferEngine<C, P>>,
    tasks: TaskMap,
    events: mpsc::Sender<TaskEvent>,
    spec: UploadSpec,
    task_id: Uuid,
    cancel: CancellationToken,
) {
    // Record size and strategy up front; an unreadable file is left for the
    // engine to surface as the task's terminal error.
    if let Ok(meta) = tokio::fs::metadata(&spec.path).await {
        let threshold = engine.config().simple_upload_threshold;
        let mut tasks = tasks.lock().unwrap();
        if let Some(entry) = tasks.get_mut(&task_id) {
            entry.task.total_bytes = meta.len();
            entry.task.strategy =
                Some(UploadStrategy::select_with_threshold(meta.len(), threshold));
        }
    }
    set_state(&tasks, task_id, TaskState::Uploading);

    let request = UploadRequest {
        account_id: spec.account_id,
        parent_id: spec.parent_id,
        file_name: spec.file_name,
        content_type: spec.content_type,
        path: spec.path,
    };

    let progress_tasks = Arc::clone(&tasks);
    let progress_events = events.clone();
    let result = engine
        .upload(&request, &cancel, move |percent| {
            // Clamped monotonic at the task record; a stale report is
            // dropped without an event.
            {
                let mut tasks = progress_tasks.lock().unwrap();
                match tasks.get_mut(&task_id) {
                    Some(entry) if percent > entry.task.progress_percent => {
                        entry.task.progress_percent = percent;
                    }
                    _ => return,
                }
            }
            // Progress is lossy under backpressure; terminal events are not.
            let _ = progress_events.try_send(TaskEvent::Progress { task_id, percent });
        })
        .await;

    let (state, detail, action) = match &result {
        Ok(item) => {
            info!(task = %task_id, item = %item.id, "task succeeded");
            (TaskState::Succeeded, None, UserAction::Nothing)
        }
        Err(TransferError::Cancelled) => {
            info!(task = %task_id, "task cancelled");
            (TaskState::Cancelled, None, UserAction::Nothing)
        }
        Err(err) => {
            error!(task = %task_id, error = %err, "task failed");
            (TaskState::Failed, Some(err.to_string()), err.user_action())
        }
    };

    {
        let mut tasks = tasks.lock().unwrap();
        if let Some(entry) = tasks.get_mut(&task_id) {
            entry.task.state = state;
            if state == TaskState::Succeeded {
                entry.task.progress_percent = 100;
            }
        }
    }
    let _ = events
        .send(TaskEvent::Terminal {
            task_id,
            state,
            detail,
            action,
        })
        .await;
}

fn set_state(tasks: &TaskMap, task_id: Uuid, state: TaskState) {
    let mut tasks = tasks.lock().unwrap();
    if let Some(entry) = tasks.get_mut(&task_id) {
        entry.task.state = state;
    }
}
