use crate::collectors::MetricRecord;
use anyhow::{Context, Result};
use futures::future::BoxFuture;
use std::{io::Write, time::Duration};
use tracing::debug;
use url::Url;

/// Ships one collected batch to the monitoring backend.
pub trait Reporter: Send + Sync {
    fn report<'a>(&'a self, records: &'a [MetricRecord]) -> BoxFuture<'a, Result<()>>;
}

/// Writes each record as one JSON line on stdout.
#[derive(Clone, Copy, Debug, Default)]
pub struct StdoutReporter;

impl Reporter for StdoutReporter {
    fn report<'a>(&'a self, records: &'a [MetricRecord]) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let mut out = std::io::stdout().lock();
            for record in records {
                serde_json::to_writer(&mut out, record)?;
                writeln!(out)?;
            }
            out.flush()?;
            Ok(())
        })
    }
}

/// POSTs the batch as a JSON array, e.g. to a Falcon agent's `/v1/push`.
#[derive(Clone, Debug)]
pub struct PushReporter {
    client: reqwest::Client,
    url: Url,
}

impl PushReporter {
    /// # Errors
    ///
    /// Returns an error if `url` does not parse or the HTTP client cannot be built.
    pub fn new(url: &str) -> Result<Self> {
        let url = Url::parse(url).with_context(|| format!("Invalid push URL: {url}"))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()?;

        Ok(Self { client, url })
    }

    #[must_use]
    pub const fn url(&self) -> &Url {
        &self.url
    }
}

impl Reporter for PushReporter {
    fn report<'a>(&'a self, records: &'a [MetricRecord]) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            if records.is_empty() {
                return Ok(());
            }

            let response = self
                .client
                .post(self.url.clone())
                .json(records)
                .send()
                .await
                .with_context(|| format!("Failed to push metrics to {}", self.url))?;

            response
                .error_for_status()
                .with_context(|| format!("Push to {} rejected", self.url))?;

            debug!(records = records.len(), url = %self.url, "metrics pushed");

            Ok(())
        })
    }
}
