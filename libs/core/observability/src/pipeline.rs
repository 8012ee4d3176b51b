//! Metrics for a single aggregation-pipeline run.

use metrics::{counter, gauge, histogram};

/// Pipeline metrics recorder, one call site per pipeline stage.
pub struct PipelineMetrics;

impl PipelineMetrics {
    /// Record that a partition read completed for a provider.
    pub fn record_rows_read(provider_kind: &str, subtype: &str, rows: usize) {
        counter!("aggregator_rows_read_total", "provider_kind" => provider_kind.to_string(), "subtype" => subtype.to_string())
            .increment(rows as u64);
    }

    /// Record rows produced by the OCP aggregator for one data source.
    pub fn record_rows_aggregated(data_source: &str, rows: usize) {
        counter!("aggregator_rows_aggregated_total", "data_source" => data_source.to_string())
            .increment(rows as u64);
    }

    /// Record AWS rows matched (or not) to OCP resources.
    pub fn record_rows_matched(matched: bool, count: usize) {
        counter!("aggregator_rows_matched_total", "matched" => matched.to_string()).increment(count as u64);
    }

    /// Record rows emitted by the warehouse writer for one target table.
    pub fn record_rows_written(table: &str, rows: usize) {
        counter!("aggregator_rows_written_total", "table" => table.to_string()).increment(rows as u64);
    }

    /// Record a retried transient read.
    pub fn record_retry(stage: &str) {
        counter!("aggregator_retries_total", "stage" => stage.to_string()).increment(1);
    }

    /// Record a fatal provider failure by error kind.
    pub fn record_failure(provider_id: &str, kind: &str) {
        counter!("aggregator_failures_total", "provider" => provider_id.to_string(), "kind" => kind.to_string())
            .increment(1);
    }

    /// Record the wall-clock duration of a completed provider run.
    pub fn record_run_duration(provider_id: &str, seconds: f64) {
        histogram!("aggregator_run_duration_seconds", "provider" => provider_id.to_string()).record(seconds);
        gauge!("aggregator_last_run_duration_seconds", "provider" => provider_id.to_string()).set(seconds);
    }
}

/// Register metric descriptions for documentation / discovery.
pub fn register_metric_descriptions() {
    use metrics::{describe_counter, describe_gauge, describe_histogram};

    describe_counter!("aggregator_rows_read_total", "Rows read from object-store partitions");
    describe_counter!("aggregator_rows_aggregated_total", "Rows produced by the OCP aggregator");
    describe_counter!("aggregator_rows_matched_total", "AWS rows evaluated by the resource matcher");
    describe_counter!("aggregator_rows_written_total", "Rows bulk-loaded into the warehouse");
    describe_counter!("aggregator_retries_total", "Transient read retries");
    describe_counter!("aggregator_failures_total", "Fatal provider failures by kind");
    describe_histogram!("aggregator_run_duration_seconds", "Provider run duration");
    describe_gauge!("aggregator_last_run_duration_seconds", "Duration of the most recent provider run");
}
