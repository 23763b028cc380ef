use std::time::Duration;

use leadscout_common::Lead;

/// Default per-step timeout each worker enforces on its own adapter calls.
/// The supervisor has no overall job timeout; only workers time out.
pub const DEFAULT_STEP_TIMEOUT: Duration = Duration::from_secs(120);

/// Runs `fut` under [`DEFAULT_STEP_TIMEOUT`], collapsing a timeout into the
/// same error type an adapter failure would produce.
pub async fn with_step_timeout<T>(
    fut: impl std::future::Future<Output = anyhow::Result<T>>,
) -> anyhow::Result<T> {
    match tokio::time::timeout(DEFAULT_STEP_TIMEOUT, fut).await {
        Ok(result) => result,
        Err(_) => Err(anyhow::anyhow!("step timed out after {DEFAULT_STEP_TIMEOUT:?}")),
    }
}

/// Outcome of one worker invocation. A worker may return `success: true`
/// with empty `leads` (a valid "no matches" outcome); this is distinguished
/// from failure by the absence of `error`.
#[derive(Debug, Clone)]
pub struct WorkerResult {
    pub success: bool,
    pub leads: Vec<Lead>,
    pub error: Option<String>,
    pub last_step: &'static str,
    pub trace: Vec<String>,
}

impl WorkerResult {
    pub fn ok(leads: Vec<Lead>, last_step: &'static str, trace: Vec<String>) -> Self {
        Self {
            success: true,
            leads,
            error: None,
            last_step,
            trace,
        }
    }

    pub fn failed(error: impl Into<String>, last_step: &'static str, trace: Vec<String>) -> Self {
        Self {
            success: false,
            leads: Vec::new(),
            error: Some(error.into()),
            last_step,
            trace,
        }
    }
}

/// Per-worker lead target: `ceil(target/workers) + buffer`.
pub fn per_worker_target(target: usize, workers: usize, buffer: usize) -> usize {
    target.div_ceil(workers) + buffer
}
