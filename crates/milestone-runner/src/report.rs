//! Report delivery.
//!
//! The final [`RunReport`] is always printed to stdout as pretty JSON. When
//! a collector URL is configured it is also posted there, with a bearer
//! credential if one is set. Delivery to the collector is best effort: a
//! failure is logged and never changes the run's exit status.

use milestone_types::RunReport;
use tracing::{info, warn};

use crate::config::ReportConfig;
use crate::error::RunnerError;

/// Render a report as pretty-printed JSON.
///
/// # Errors
///
/// Returns [`RunnerError::Serde`] if serialization fails.
pub fn render(report: &RunReport) -> Result<String, RunnerError> {
    Ok(serde_json::to_string_pretty(report)?)
}

/// HTTP collector that accepts run reports.
pub struct CollectorSink {
    client: reqwest::Client,
    url: String,
    api_key: Option<String>,
}

impl CollectorSink {
    /// Create a sink posting to `url`, authenticating with `api_key` if set.
    pub fn new(url: String, api_key: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url,
            api_key,
        }
    }

    /// Post one report to the collector.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError::Report`] if the request fails or the collector
    /// answers with a non-success status.
    pub async fn send(&self, report: &RunReport) -> Result<(), RunnerError> {
        let mut request = self.client.post(&self.url).json(report);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| RunnerError::Report(format!("request to {} failed: {e}", self.url)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unable to read error body".to_owned());
            return Err(RunnerError::Report(format!(
                "collector returned {status}: {body}"
            )));
        }
        Ok(())
    }
}

impl std::fmt::Debug for CollectorSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollectorSink")
            .field("url", &self.url)
            .field("authenticated", &self.api_key.is_some())
            .finish_non_exhaustive()
    }
}

/// Where the final report goes.
#[derive(Debug, Default)]
pub struct ReportSink {
    collector: Option<CollectorSink>,
}

impl ReportSink {
    /// Build a sink from the report configuration.
    pub fn from_config(config: &ReportConfig) -> Self {
        Self {
            collector: config
                .url
                .clone()
                .map(|url| CollectorSink::new(url, config.api_key.clone())),
        }
    }

    /// Print the report and post it to the collector if one is configured.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError::Serde`] only if the report cannot be rendered.
    /// Collector failures are logged.
    pub async fn deliver(&self, report: &RunReport) -> Result<(), RunnerError> {
        let rendered = render(report)?;
        println!("{rendered}");

        if let Some(collector) = &self.collector {
            match collector.send(report).await {
                Ok(()) => info!(run_id = %report.run_id, url = collector.url, "report delivered"),
                Err(e) => warn!(
                    run_id = %report.run_id,
                    error = %e,
                    "failed to deliver report to collector"
                ),
            }
        }
        Ok(())
    }
}
