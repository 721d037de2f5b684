//! Tick scheduler: delayed, repeating and sync-callback tasks.

use hookbind_api::{CallbackFn, ExecutionMode, NativeHandle, TaskFn, TaskManager, WorkFn};
use tracing::debug;

use crate::actions::{with_api, PendingAction};

// ─── Types ───────────────────────────────────────────────────────────────────

enum TaskBody {
    Run(TaskFn),
    /// `work` runs in the async phase; `callback` gets its result on the next tick.
    Work { work: WorkFn, callback: CallbackFn },
}

/// A scheduled task owned by a script.
struct ScheduledTask {
    handle: u64,
    script: String,
    mode: ExecutionMode,
    remaining_ticks: u64,
    /// `None` = one-shot, `Some(n)` = repeating every `n` ticks.
    interval: Option<u64>,
    body: TaskBody,
}

/// Result of async work waiting for its sync callback.
struct PendingCallback {
    handle: u64,
    script: String,
    value: serde_json::Value,
    callback: CallbackFn,
}

// ─── TickScheduler ───────────────────────────────────────────────────────────

#[derive(Default)]
pub struct TickScheduler {
    next_handle: u64,
    current_tick: u64,
    tasks: Vec<ScheduledTask>,
    callbacks: Vec<PendingCallback>,
}

impl TickScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_tick(&self) -> u64 {
        self.current_tick
    }

    /// Scheduled tasks plus sync callbacks still waiting to run.
    pub fn task_count(&self) -> usize {
        self.tasks.len() + self.callbacks.len()
    }

    fn schedule(
        &mut self,
        script: &str,
        mode: ExecutionMode,
        delay: u64,
        interval: Option<u64>,
        body: TaskBody,
    ) -> NativeHandle {
        self.next_handle += 1;
        self.tasks.push(ScheduledTask {
            handle: self.next_handle,
            script: script.to_string(),
            mode,
            remaining_ticks: delay,
            interval,
            body,
        });
        NativeHandle(self.next_handle)
    }

    /// Advance one tick. Returns pending actions from everything that ran.
    ///
    /// Order within a tick: sync callbacks for last tick's async work, then
    /// fired sync tasks, then fired async tasks.
    pub fn tick(&mut self) -> Vec<PendingAction> {
        self.current_tick += 1;
        let tick = self.current_tick;
        let mut all_actions = Vec::new();

        for pending in std::mem::take(&mut self.callbacks) {
            let PendingCallback {
                script,
                value,
                callback,
                ..
            } = pending;
            let ((), actions) = with_api(&script, tick, |api| callback(value, api));
            all_actions.extend(actions);
        }

        // Decrement and collect fired tasks
        let mut fired = Vec::new();
        for task in &mut self.tasks {
            if task.remaining_ticks > 0 {
                task.remaining_ticks -= 1;
            }
            if task.remaining_ticks == 0 {
                fired.push(task.handle);
                if let Some(interval) = task.interval {
                    task.remaining_ticks = interval;
                }
            }
        }
        if fired.is_empty() {
            return all_actions;
        }

        // One-shot tasks leave the list before they run
        let (mut one_shots, remaining): (Vec<_>, Vec<_>) = std::mem::take(&mut self.tasks)
            .into_iter()
            .partition(|t| t.interval.is_none() && fired.contains(&t.handle));
        self.tasks = remaining;

        for phase in [ExecutionMode::Sync, ExecutionMode::Async] {
            if phase == ExecutionMode::Async {
                debug!("Tick {tick}: async phase");
            }
            for handle in &fired {
                if let Some(pos) = one_shots
                    .iter()
                    .position(|t| t.handle == *handle && t.mode == phase)
                {
                    let task = one_shots.swap_remove(pos);
                    all_actions.extend(self.run_once(task, tick));
                } else if let Some(task) = self
                    .tasks
                    .iter_mut()
                    .find(|t| t.handle == *handle && t.mode == phase)
                {
                    if let TaskBody::Run(f) = &mut task.body {
                        let ((), actions) = with_api(&task.script, tick, |api| f(api));
                        all_actions.extend(actions);
                    }
                }
            }
        }

        all_actions
    }

    fn run_once(&mut self, task: ScheduledTask, tick: u64) -> Vec<PendingAction> {
        match task.body {
            TaskBody::Run(mut f) => with_api(&task.script, tick, |api| f(api)).1,
            TaskBody::Work { work, callback } => {
                let value = work();
                self.callbacks.push(PendingCallback {
                    handle: task.handle,
                    script: task.script,
                    value,
                    callback,
                });
                Vec::new()
            }
        }
    }
}

impl TaskManager for TickScheduler {
    fn run_task(&mut self, script: &str, mode: ExecutionMode, task: TaskFn) -> NativeHandle {
        self.schedule(script, mode, 0, None, TaskBody::Run(task))
    }

    fn run_task_later(
        &mut self,
        script: &str,
        mode: ExecutionMode,
        delay: u64,
        task: TaskFn,
    ) -> NativeHandle {
        self.schedule(script, mode, delay, None, TaskBody::Run(task))
    }

    fn schedule_repeating_task(
        &mut self,
        script: &str,
        mode: ExecutionMode,
        delay: u64,
        interval: u64,
        task: TaskFn,
    ) -> NativeHandle {
        self.schedule(script, mode, delay, Some(interval), TaskBody::Run(task))
    }

    fn run_sync_callback_task(
        &mut self,
        script: &str,
        delay: u64,
        work: WorkFn,
        callback: CallbackFn,
    ) -> NativeHandle {
        self.schedule(
            script,
            ExecutionMode::Async,
            delay,
            None,
            TaskBody::Work { work, callback },
        )
    }

    /// Also drops a sync callback whose work already ran.
    fn stop_task(&mut self, handle: NativeHandle) -> bool {
        let before = self.task_count();
        self.tasks.retain(|t| t.handle != handle.0);
        self.callbacks.retain(|c| c.handle != handle.0);
        self.task_count() != before
    }

    fn is_task_active(&self, handle: NativeHandle) -> bool {
        self.tasks.iter().any(|t| t.handle == handle.0)
            || self.callbacks.iter().any(|c| c.handle == handle.0)
    }
}
