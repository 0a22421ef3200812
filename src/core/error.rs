use std::sync::Arc;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, LifestyleError>;

/// Failure carried as task state through the dataflow graph.
///
/// Errors are cheap to clone so every dependant of a failed task observes the
/// same cause.
#[derive(Debug, Clone, Error)]
pub enum LifestyleError {
    #[error("source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("unknown super strategy: {0}")]
    UnknownStrategy(String),

    #[error("cannot spread a balance over {retirement_years} retirement years")]
    DivisionByZero { retirement_years: i32 },

    #[error("{stage} failed: {cause}")]
    CombinationFailure {
        stage: &'static str,
        cause: Arc<LifestyleError>,
    },

    #[error("{0} stopped before producing a value")]
    Abandoned(&'static str),
}

impl LifestyleError {
    pub(crate) fn upstream(stage: &'static str, cause: LifestyleError) -> Self {
        LifestyleError::CombinationFailure {
            stage,
            cause: Arc::new(cause),
        }
    }

    /// The failure that started a chain of `CombinationFailure`s.
    pub fn root_cause(&self) -> &LifestyleError {
        let mut current = self;
        while let LifestyleError::CombinationFailure { cause, .. } = current {
            current = cause;
        }
        current
    }

    pub fn is_source_unavailable(&self) -> bool {
        matches!(self.root_cause(), LifestyleError::SourceUnavailable(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_cause_unwraps_nested_upstream_failures() {
        let source = LifestyleError::SourceUnavailable("no person named Bob".to_string());
        let err = LifestyleError::upstream(
            "lifestyle_ratio",
            LifestyleError::upstream("death_age", source),
        );

        assert!(matches!(
            err.root_cause(),
            LifestyleError::SourceUnavailable(msg) if msg == "no person named Bob"
        ));
        assert!(err.is_source_unavailable());
    }

    #[test]
    fn combination_failure_message_names_stage_and_cause() {
        let err = LifestyleError::upstream(
            "super_balance",
            LifestyleError::UnknownStrategy("aggressive".to_string()),
        );
        assert_eq!(
            err.to_string(),
            "super_balance failed: unknown super strategy: aggressive"
        );
        assert!(!err.is_source_unavailable());
    }
}
