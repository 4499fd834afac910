use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::internal::solver::{LpBackend, LpModel, LpOutcome};

/// Backend answering with canned outcomes in order. Once the script runs
/// out it returns an optimal solution with every variable set to one.
pub struct ScriptedBackend {
    script: Mutex<VecDeque<LpOutcome>>,
    calls: AtomicUsize,
}

impl ScriptedBackend {
    pub fn new(script: Vec<LpOutcome>) -> Self {
        ScriptedBackend {
            script: Mutex::new(script.into()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl LpBackend for ScriptedBackend {
    fn solve(&self, model: &LpModel) -> LpOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| LpOutcome::optimal(vec![1.0; model.n_variables()], 0.0))
    }
}
