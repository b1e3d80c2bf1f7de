//! Forecaster execution on the blocking thread pool

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use super::cancel::CancelToken;
use crate::data::FeatureFrame;
use crate::model::{Forecast, ForecastMode, ForecastRequest, Forecaster};
use crate::utils::RuntimeConfig;
use crate::{Error, Result};

/// Outcome of one forecaster in a batch run
#[derive(Debug)]
pub struct ModelOutcome {
    pub model: String,
    pub result: Result<Forecast>,
}

/// Runs CPU-bound forecasters off the async executor
///
/// At most `workers` forecasts run at once. Each call gets its own copy of
/// the input frame and a fresh [`CancelToken`]; when the timeout elapses
/// the token is cancelled, the caller receives [`Error::Timeout`] and the
/// worker stops at its next epoch or step boundary.
#[derive(Debug, Clone)]
pub struct ForecastRunner {
    timeout: Duration,
    permits: Arc<Semaphore>,
}

impl ForecastRunner {
    pub fn new(config: &RuntimeConfig) -> Self {
        Self::with_limits(
            Duration::from_secs(config.timeout_secs),
            config.worker_threads,
        )
    }

    pub fn with_limits(timeout: Duration, workers: usize) -> Self {
        Self {
            timeout,
            permits: Arc::new(Semaphore::new(workers.max(1))),
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Run one forecaster with the runner's timeout
    pub async fn run(
        &self,
        forecaster: Arc<dyn Forecaster>,
        frame: FeatureFrame,
        horizon: usize,
        mode: ForecastMode,
    ) -> Result<Forecast> {
        self.run_with_cancel(forecaster, frame, horizon, mode, CancelToken::new())
            .await
    }

    /// Run one forecaster, also stopping when `cancel` is triggered
    pub async fn run_with_cancel(
        &self,
        forecaster: Arc<dyn Forecaster>,
        frame: FeatureFrame,
        horizon: usize,
        mode: ForecastMode,
        cancel: CancelToken,
    ) -> Result<Forecast> {
        let name = forecaster.name();
        let permit = self
            .permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| Error::Cancelled(format!("{} runner closed", name)))?;

        let task_cancel = cancel.clone();
        let handle = tokio::task::spawn_blocking(move || {
            // Held until the worker really finishes, even after a timeout
            let _permit = permit;
            let request = ForecastRequest::new(&frame, horizon, mode).with_cancel(task_cancel);
            forecaster.forecast(&request)
        });

        match tokio::time::timeout(self.timeout, handle).await {
            Ok(Ok(result)) => {
                debug!(model = name, ok = result.is_ok(), "forecast worker finished");
                result
            }
            Ok(Err(join_error)) => Err(Error::ModelFit(format!(
                "{} worker failed: {}",
                name, join_error
            ))),
            Err(_) => {
                cancel.cancel();
                warn!(model = name, timeout = ?self.timeout, "forecast timed out");
                Err(Error::Timeout {
                    model: name.to_string(),
                    after: self.timeout,
                })
            }
        }
    }

    /// Run every forecaster concurrently, preserving input order
    ///
    /// Failures stay with their model; one model timing out or failing
    /// never affects the others.
    pub async fn run_all(
        &self,
        forecasters: Vec<Arc<dyn Forecaster>>,
        frame: &FeatureFrame,
        horizon: usize,
        mode: ForecastMode,
    ) -> Vec<ModelOutcome> {
        let mut set = JoinSet::new();
        for (idx, forecaster) in forecasters.into_iter().enumerate() {
            let runner = self.clone();
            let frame = frame.clone();
            set.spawn(async move {
                let model = forecaster.name().to_string();
                let result = runner.run(forecaster, frame, horizon, mode).await;
                (idx, ModelOutcome { model, result })
            });
        }

        let mut outcomes = Vec::new();
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => warn!(error = %e, "forecast task aborted"),
            }
        }
        outcomes.sort_by_key(|(idx, _)| *idx);
        outcomes.into_iter().map(|(_, outcome)| outcome).collect()
    }
}
