//! Delay/interval policy for task registrations.

use hookbind_api::{ExecutionMode, HookError, NativeHandle, TaskFn, TaskManager};

/// Which scheduler entry point a `(delay, interval)` pair maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulePlan {
    /// Next scheduler pass.
    Immediate { mode: ExecutionMode },
    /// One run after `delay` ticks.
    Delayed { delay: u64, mode: ExecutionMode },
    /// First run after `delay`, then every `interval` ticks until cancelled.
    Repeating {
        delay: u64,
        interval: u64,
        mode: ExecutionMode,
    },
}

impl SchedulePlan {
    /// `interval > 0` always repeats. Otherwise `delay > 0` runs once later,
    /// and `(0, 0)` runs immediately. Negative values are rejected.
    pub fn select(delay: i64, interval: i64, mode: ExecutionMode) -> Result<Self, HookError> {
        if delay < 0 || interval < 0 {
            return Err(HookError::InvalidScheduleParameters { delay, interval });
        }
        let (delay, interval) = (delay as u64, interval as u64);

        Ok(if interval > 0 {
            SchedulePlan::Repeating {
                delay,
                interval,
                mode,
            }
        } else if delay > 0 {
            SchedulePlan::Delayed { delay, mode }
        } else {
            SchedulePlan::Immediate { mode }
        })
    }

    pub fn mode(&self) -> ExecutionMode {
        match *self {
            SchedulePlan::Immediate { mode }
            | SchedulePlan::Delayed { mode, .. }
            | SchedulePlan::Repeating { mode, .. } => mode,
        }
    }

    pub fn is_repeating(&self) -> bool {
        matches!(self, SchedulePlan::Repeating { .. })
    }

    pub fn dispatch(self, tasks: &mut dyn TaskManager, script: &str, task: TaskFn) -> NativeHandle {
        match self {
            SchedulePlan::Immediate { mode } => tasks.run_task(script, mode, task),
            SchedulePlan::Delayed { delay, mode } => tasks.run_task_later(script, mode, delay, task),
            SchedulePlan::Repeating {
                delay,
                interval,
                mode,
            } => tasks.schedule_repeating_task(script, mode, delay, interval, task),
        }
    }
}
