use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::types::TaskId;

/// Cooperative cancellation flag shared between the controller and running actions.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    pub(crate) fn reset(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

/// What an action gets to see about the task it runs for.
#[derive(Debug, Clone)]
pub struct ActionContext {
    pub task_id: TaskId,
    pub title: String,
    pub cancel: CancelToken,
}

/// Callable bound to a task.
///
/// `Ok(true)` means success. `Ok(false)`, `Err` and panics all count as a failed
/// task; the engine does not interpret the reason.
pub trait TaskAction: Send + Sync {
    fn run(&self, ctx: &ActionContext) -> anyhow::Result<bool>;
}

impl<F> TaskAction for F
where
    F: Fn(&ActionContext) -> anyhow::Result<bool> + Send + Sync,
{
    fn run(&self, ctx: &ActionContext) -> anyhow::Result<bool> {
        self(ctx)
    }
}

/// Adapter for zero-argument boolean callables.
pub struct SimpleAction<F>(F);

pub fn simple_action<F>(f: F) -> SimpleAction<F>
where
    F: Fn() -> bool + Send + Sync,
{
    SimpleAction(f)
}

impl<F> TaskAction for SimpleAction<F>
where
    F: Fn() -> bool + Send + Sync,
{
    fn run(&self, _ctx: &ActionContext) -> anyhow::Result<bool> {
        Ok((self.0)())
    }
}

/// Runs an action and folds every failure mode into a boolean.
pub(crate) fn invoke(action: &dyn TaskAction, ctx: &ActionContext) -> bool {
    match catch_unwind(AssertUnwindSafe(|| action.run(ctx))) {
        Ok(Ok(ok)) => ok,
        Ok(Err(e)) => {
            tracing::error!(task_id = %ctx.task_id, title = %ctx.title, "action failed: {e:#}");
            false
        }
        Err(_) => {
            tracing::error!(task_id = %ctx.task_id, title = %ctx.title, "action panicked");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> ActionContext {
        ActionContext {
            task_id: TaskId(0),
            title: "Synthesis".into(),
            cancel: CancelToken::new(),
        }
    }

    #[test]
    fn errors_and_panics_map_to_false() {
        let ok = simple_action(|| true);
        assert!(invoke(&ok, &ctx()));

        let err = |_: &ActionContext| -> anyhow::Result<bool> { anyhow::bail!("yosys crashed") };
        assert!(!invoke(&err, &ctx()));

        let boom = |_: &ActionContext| -> anyhow::Result<bool> { panic!("boom") };
        assert!(!invoke(&boom, &ctx()));
    }

    #[test]
    fn cancel_token_is_shared() {
        let token = CancelToken::new();
        let clone = token.clone();
        clone.cancel();
        assert!(token.is_cancelled());
        token.reset();
        assert!(!clone.is_cancelled());
    }
}
