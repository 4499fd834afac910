use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;

use riskplace_core::solver::{LpBackend, LpModel, LpOutcome, MicrolpBackend};

/// Gives up on solves running longer than `timeout` and reports the batch as
/// infeasible, so that the repair loop sheds a cohort and retries with a
/// smaller model. An abandoned solve runs to completion on its own thread.
///
/// `solve` blocks; call it from a blocking thread, never from an async task.
pub struct TimeoutBackend {
    inner: Arc<dyn LpBackend>,
    timeout: Duration,
}

impl TimeoutBackend {
    pub fn new(inner: Arc<dyn LpBackend>, timeout: Duration) -> Self {
        TimeoutBackend { inner, timeout }
    }
}

impl LpBackend for TimeoutBackend {
    fn solve(&self, model: &LpModel) -> LpOutcome {
        let runtime = match tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
        {
            Ok(runtime) => runtime,
            Err(error) => return LpOutcome::failed(format!("cannot start timer: {error}")),
        };
        let (sender, receiver) = oneshot::channel();
        let inner = self.inner.clone();
        let model = model.clone();
        let spawned = std::thread::Builder::new()
            .name("lp-solve".into())
            .spawn(move || {
                // The receiver is gone when the solve timed out.
                let _ = sender.send(inner.solve(&model));
            });
        if let Err(error) = spawned {
            return LpOutcome::failed(format!("cannot start solver thread: {error}"));
        }
        match runtime.block_on(tokio::time::timeout(self.timeout, receiver)) {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(_)) => LpOutcome::failed("solver thread panicked"),
            Err(_) => {
                log::warn!(
                    "Solver did not finish within {:?}, treating the batch as infeasible",
                    self.timeout
                );
                LpOutcome::infeasible()
            }
        }
    }
}

/// The default `microlp` backend, bounded by `timeout` when one is given.
pub fn create_backend(timeout: Option<Duration>) -> Arc<dyn LpBackend> {
    let backend: Arc<dyn LpBackend> = Arc::new(MicrolpBackend);
    match timeout {
        Some(timeout) => Arc::new(TimeoutBackend::new(backend, timeout)),
        None => backend,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use riskplace_core::solver::LpStatus;

    struct SlowBackend(Duration);

    impl LpBackend for SlowBackend {
        fn solve(&self, model: &LpModel) -> LpOutcome {
            std::thread::sleep(self.0);
            LpOutcome::optimal(vec![1.0; model.n_variables()], 0.0)
        }
    }

    #[test]
    fn test_slow_solve_is_infeasible() {
        let backend = TimeoutBackend::new(
            Arc::new(SlowBackend(Duration::from_millis(500))),
            Duration::from_millis(10),
        );
        let outcome = backend.solve(&LpModel::new());
        assert_eq!(outcome.status, LpStatus::Infeasible);
    }

    struct PanickingBackend;

    impl LpBackend for PanickingBackend {
        fn solve(&self, _model: &LpModel) -> LpOutcome {
            panic!("solver crashed");
        }
    }

    #[test]
    fn test_panicking_solver_fails() {
        let backend = TimeoutBackend::new(Arc::new(PanickingBackend), Duration::from_secs(10));
        let outcome = backend.solve(&LpModel::new());
        assert!(matches!(outcome.status, LpStatus::Failed(_)));
    }

    #[tokio::test]
    async fn test_timeout_inside_blocking_task() {
        let backend = TimeoutBackend::new(
            Arc::new(SlowBackend(Duration::from_millis(500))),
            Duration::from_millis(10),
        );
        let outcome = tokio::task::spawn_blocking(move || backend.solve(&LpModel::new()))
            .await
            .unwrap();
        assert_eq!(outcome.status, LpStatus::Infeasible);
    }

    #[test]
    fn test_fast_solve_passes_through() {
        let backend = TimeoutBackend::new(
            Arc::new(SlowBackend(Duration::ZERO)),
            Duration::from_secs(10),
        );
        let mut model = LpModel::new();
        model.add_bool_variable(1.0);
        let outcome = backend.solve(&model);
        assert_eq!(outcome.status, LpStatus::Optimal);
        assert_eq!(outcome.values(), &[1.0]);
    }
}
