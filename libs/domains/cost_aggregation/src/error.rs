use thiserror::Error;

/// Result type for the aggregation pipeline.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// The stage a `PipelineError` was raised in, for structured log fields and
/// the coordinator's state machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum Stage {
    Reading,
    Aggregating,
    Matching,
    Attributing,
    Writing,
}

/// The nine error kinds this pipeline raises. Every variant carries the provider and
/// stage that raised it so the coordinator's structured logs can filter on
/// them without parsing the `Display` string.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("[{provider}/{stage}] configuration invalid: {message}")]
    ConfigInvalid {
        provider: String,
        stage: Stage,
        message: String,
    },

    #[error("[{provider}/{stage}] no objects found for partition: {message}")]
    InputMissing {
        provider: String,
        stage: Stage,
        message: String,
    },

    #[error("[{provider}/{stage}] object-store read unavailable after retries: {message}")]
    InputUnavailable {
        provider: String,
        stage: Stage,
        message: String,
        #[source]
        cause: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("[{provider}/{stage}] parquet schema mismatch: {message}")]
    InputSchema {
        provider: String,
        stage: Stage,
        message: String,
    },

    #[error("[{provider}/{stage}] unreadable parquet object: {message}")]
    InputCorrupt {
        provider: String,
        stage: Stage,
        message: String,
        #[source]
        cause: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("[{provider}/{stage}] arithmetic invariant violated: {message}")]
    AggregationArithmetic {
        provider: String,
        stage: Stage,
        message: String,
    },

    #[error("[{provider}/{stage}] attribution invariant violated: {message}")]
    AttributionInvariant {
        provider: String,
        stage: Stage,
        message: String,
    },

    #[error("[{provider}/{stage}] warehouse row count mismatch after commit: {message}")]
    WarehouseConflict {
        provider: String,
        stage: Stage,
        message: String,
    },

    #[error("[{provider}/{stage}] provider exceeded configured timeout")]
    Timeout { provider: String, stage: Stage },
}

impl PipelineError {
    pub fn provider(&self) -> &str {
        match self {
            PipelineError::ConfigInvalid { provider, .. }
            | PipelineError::InputMissing { provider, .. }
            | PipelineError::InputUnavailable { provider, .. }
            | PipelineError::InputSchema { provider, .. }
            | PipelineError::InputCorrupt { provider, .. }
            | PipelineError::AggregationArithmetic { provider, .. }
            | PipelineError::AttributionInvariant { provider, .. }
            | PipelineError::WarehouseConflict { provider, .. }
            | PipelineError::Timeout { provider, .. } => provider,
        }
    }

    pub fn stage(&self) -> Stage {
        match self {
            PipelineError::ConfigInvalid { stage, .. }
            | PipelineError::InputMissing { stage, .. }
            | PipelineError::InputUnavailable { stage, .. }
            | PipelineError::InputSchema { stage, .. }
            | PipelineError::InputCorrupt { stage, .. }
            | PipelineError::AggregationArithmetic { stage, .. }
            | PipelineError::AttributionInvariant { stage, .. }
            | PipelineError::WarehouseConflict { stage, .. }
            | PipelineError::Timeout { stage, .. } => *stage,
        }
    }

    /// Stable error-kind name for metrics labels and log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::ConfigInvalid { .. } => "config_invalid",
            PipelineError::InputMissing { .. } => "input_missing",
            PipelineError::InputUnavailable { .. } => "input_unavailable",
            PipelineError::InputSchema { .. } => "input_schema",
            PipelineError::InputCorrupt { .. } => "input_corrupt",
            PipelineError::AggregationArithmetic { .. } => "aggregation_arithmetic",
            PipelineError::AttributionInvariant { .. } => "attribution_invariant",
            PipelineError::WarehouseConflict { .. } => "warehouse_conflict",
            PipelineError::Timeout { .. } => "timeout",
        }
    }

    /// CLI exit code: 1=config, 2=input, 3=invariant, 4=warehouse, 5=timeout.
    pub fn exit_code(&self) -> i32 {
        match self {
            PipelineError::ConfigInvalid { .. } => 1,
            PipelineError::InputMissing { .. }
            | PipelineError::InputUnavailable { .. }
            | PipelineError::InputSchema { .. }
            | PipelineError::InputCorrupt { .. } => 2,
            PipelineError::AggregationArithmetic { .. } | PipelineError::AttributionInvariant { .. } => 3,
            PipelineError::WarehouseConflict { .. } => 4,
            PipelineError::Timeout { .. } => 5,
        }
    }
}
