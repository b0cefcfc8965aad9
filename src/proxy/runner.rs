//! Batch runner: probes many proxies with a bounded number in flight

use crate::proxy::checker::Prober;
use crate::proxy::error::Error;
use crate::proxy::models::{ProbeResult, ProxyDescriptor};
use crate::Result;
use futures::stream::{self, StreamExt};
use futures::FutureExt;
use indicatif::ProgressBar;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use tracing::{debug, info};

/// Take the first `limit` descriptors, or all of them when `limit` is 0
pub fn select(descriptors: &[ProxyDescriptor], limit: usize) -> &[ProxyDescriptor] {
    if limit == 0 || limit >= descriptors.len() {
        descriptors
    } else {
        &descriptors[..limit]
    }
}

/// Runs a [`Prober`] over a batch of descriptors
pub struct BatchRunner<P> {
    prober: P,
    progress: Option<ProgressBar>,
}

impl<P: Prober> BatchRunner<P> {
    pub fn new(prober: P) -> Self {
        Self {
            prober,
            progress: None,
        }
    }

    /// Tick `progress` once per finished probe
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn prober(&self) -> &P {
        &self.prober
    }

    /// Probe the selected descriptors, at most `concurrency` at a time.
    ///
    /// Results come back in descriptor order whatever order the probes
    /// finish in. A probe that panics is recorded as a connection failure.
    pub async fn run(
        &self,
        descriptors: &[ProxyDescriptor],
        concurrency: usize,
        limit: usize,
    ) -> Result<Vec<ProbeResult>> {
        if concurrency == 0 {
            return Err(Error::InvalidConfig(
                "concurrency must be at least 1".to_string(),
            ));
        }

        let selected = select(descriptors, limit);
        info!(total = selected.len(), concurrency, "starting probe batch");
        if let Some(progress) = &self.progress {
            progress.set_length(selected.len() as u64);
        }

        let mut indexed: Vec<(usize, ProbeResult)> = stream::iter(selected.iter().enumerate())
            .map(|(index, descriptor)| async move {
                let result = AssertUnwindSafe(self.prober.probe(descriptor))
                    .catch_unwind()
                    .await
                    .unwrap_or_else(|panic| {
                        ProbeResult::connection_failed(
                            descriptor.clone(),
                            format!("probe panicked: {}", panic_message(panic.as_ref())),
                        )
                    });
                self.record(&result);
                (index, result)
            })
            .buffer_unordered(concurrency)
            .collect()
            .await;

        indexed.sort_by_key(|(index, _)| *index);
        Ok(indexed.into_iter().map(|(_, result)| result).collect())
    }

    fn record(&self, result: &ProbeResult) {
        match result.reason() {
            Some(reason) => debug!(
                proxy = %result.descriptor.name,
                port = result.descriptor.port,
                status = %result.status(),
                reason,
                "probe finished"
            ),
            None => debug!(
                proxy = %result.descriptor.name,
                port = result.descriptor.port,
                status = %result.status(),
                "probe finished"
            ),
        }

        if let Some(progress) = &self.progress {
            progress.inc(1);
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
