//! Error types for rollout tracking.

use thiserror::Error;

use crate::kind::ResourceKind;

/// Result type alias for multitrack operations.
pub type MultitrackResult<T> = Result<T, MultitrackError>;

/// Errors surfaced to the caller of [`multitrack`](crate::multitrack).
#[derive(Debug, Error)]
pub enum MultitrackError {
    /// The aggregate verdict is failure. The message holds one
    /// `<tag><name> failed: <reason>` line per failed resource.
    #[error("{0}")]
    RolloutFailed(String),

    /// A tracker could not keep watching its resource for reasons
    /// unrelated to workload health.
    #[error("{kind}{name} track failed: {source}")]
    Track {
        kind: ResourceKind,
        name: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("verdict channel closed before the rollout concluded")]
    VerdictChannelClosed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn track_error_is_prefixed_with_resource() {
        let err = MultitrackError::Track {
            kind: ResourceKind::StatefulSet,
            name: "db".to_string(),
            source: anyhow::anyhow!("connection refused"),
        };
        assert_eq!(err.to_string(), "sts/db track failed: connection refused");
    }

    #[test]
    fn rollout_failure_displays_summary_verbatim() {
        let err = MultitrackError::RolloutFailed("po/a failed: x\njob/b failed: y".to_string());
        assert_eq!(err.to_string(), "po/a failed: x\njob/b failed: y");
    }
}
