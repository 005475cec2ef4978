//! Solver errors

use tangent_core::TangentError;
use thiserror::Error;

/// Failures talking to the symbolic engine
#[derive(Error, Debug)]
pub enum SolverError {
    #[error("Transport error: {0}")]
    Transport(#[from] std::io::Error),

    /// The engine answered with `ok: false`
    #[error("Symbolic engine error: {0}")]
    Remote(String),

    #[error("Malformed message: {0}")]
    Protocol(String),

    #[error("Worker closed: {0}")]
    WorkerClosed(String),

    #[error("Symbolic engine unavailable: {0}")]
    Unavailable(String),

    #[error("No answer from the {capability} worker within {millis} ms")]
    Timeout { capability: &'static str, millis: u64 },
}

impl From<serde_json::Error> for SolverError {
    fn from(e: serde_json::Error) -> Self {
        SolverError::Protocol(e.to_string())
    }
}

impl From<SolverError> for TangentError {
    fn from(e: SolverError) -> Self {
        match e {
            SolverError::Timeout { capability, millis } => TangentError::remote_timeout(capability, millis),
            SolverError::Remote(msg) => TangentError::remote_failure(msg),
            other => TangentError::remote_failure(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tangent_core::codes;

    #[test]
    fn test_timeout_maps_to_remote_timeout() {
        let e: TangentError = SolverError::Timeout { capability: "limit", millis: 45000 }.into();
        assert!(e.is(codes::REMOTE_TIMEOUT));
        assert!(e.message.contains("45000"));
    }

    #[test]
    fn test_other_errors_map_to_remote_failure() {
        let e: TangentError = SolverError::WorkerClosed("stdout closed".into()).into();
        assert!(e.is(codes::REMOTE_FAILURE));
        assert!(e.message.contains("stdout closed"));
    }

    #[test]
    fn test_json_errors_are_protocol_errors() {
        let err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        assert!(matches!(SolverError::from(err), SolverError::Protocol(_)));
    }
}
