use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalysisError {
    /// A collaborator returned empty or partial data.
    #[error("Data unavailable: {0}")]
    DataUnavailable(String),

    /// A calculation had no meaningful result (zero divisor, empty window).
    #[error("Degenerate computation: {0}")]
    ComputationDegenerate(String),

    /// A collaborator raised or timed out.
    #[error("Upstream failure: {0}")]
    UpstreamFailure(String),
}
