//! Caller-facing conversion service.
//!
//! Admits one conversion at a time, runs it on a tokio worker task, and
//! exposes a phase status channel plus run metrics.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::{Semaphore, watch};
use tokio_util::sync::CancellationToken;
use tracing::{instrument, warn};

use pdfsuper_core::config::converter::ConverterConfig;

use crate::error::ConversionError;
use crate::locator::ConverterLocator;
use crate::metrics::{ConversionMetrics, MetricsSnapshot};
use crate::models::{ConversionReport, ConversionRequest, Phase};
use crate::orchestrator::ConversionOrchestrator;

/// Long-lived entry point for conversions.
#[derive(Debug)]
pub struct ConversionService {
    config: ConverterConfig,
    locator: ConverterLocator,
    in_flight: Arc<Semaphore>,
    metrics: Arc<ConversionMetrics>,
    status: Arc<watch::Sender<Phase>>,
}

impl ConversionService {
    /// Create a service for the given converter configuration.
    pub fn new(config: ConverterConfig) -> Self {
        let (status, _) = watch::channel(Phase::Idle);
        Self {
            locator: ConverterLocator::from_config(&config),
            config,
            in_flight: Arc::new(Semaphore::new(1)),
            metrics: Arc::new(ConversionMetrics::new()),
            status: Arc::new(status),
        }
    }

    /// Replace the converter locator used by every run.
    pub fn with_locator(mut self, locator: ConverterLocator) -> Self {
        self.locator = locator;
        self
    }

    /// The converter configuration.
    pub fn config(&self) -> &ConverterConfig {
        &self.config
    }

    /// The locator runs use.
    pub fn locator(&self) -> &ConverterLocator {
        &self.locator
    }

    /// Subscribe to phase changes. The receiver starts at the current phase.
    pub fn subscribe(&self) -> watch::Receiver<Phase> {
        self.status.subscribe()
    }

    /// Current run counters.
    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Convert and return the destination path.
    pub async fn convert(
        &self,
        request: ConversionRequest,
        cancel: CancellationToken,
    ) -> Result<PathBuf, ConversionError> {
        self.convert_with_report(request, cancel)
            .await
            .map(|report| report.destination)
    }

    /// Convert and return the full report.
    ///
    /// Fails with [`ConversionError::Busy`] while another conversion from
    /// this service is running. The run continues on its worker task if this
    /// future is dropped; use `cancel` to stop it.
    #[instrument(skip_all, fields(source = %request.source().display()))]
    pub async fn convert_with_report(
        &self,
        request: ConversionRequest,
        cancel: CancellationToken,
    ) -> Result<ConversionReport, ConversionError> {
        let permit = match Arc::clone(&self.in_flight).try_acquire_owned() {
            Ok(permit) => permit,
            Err(_) => {
                self.metrics.record_busy();
                warn!("Rejected conversion, another one is in progress");
                return Err(ConversionError::Busy);
            }
        };
        self.metrics.record_started();

        let orchestrator = ConversionOrchestrator::new(self.config.clone())
            .with_locator(self.locator.clone())
            .with_status(Arc::clone(&self.status));

        let start = Instant::now();
        let worker = tokio::spawn(async move {
            let _permit = permit;
            orchestrator.run(request, cancel).await
        });

        let result = match worker.await {
            Ok(result) => result,
            Err(join_error) => {
                self.status.send_replace(Phase::Failed);
                Err(ConversionError::Join(join_error))
            }
        };

        match &result {
            Ok(report) => self.metrics.record_success(start.elapsed(), report.size),
            Err(e) => self.metrics.record_failure(start.elapsed(), e),
        }
        result
    }
}
