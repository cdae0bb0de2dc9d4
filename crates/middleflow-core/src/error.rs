use thiserror::Error;

/// Boxed error raised by a handler or a fallback.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

pub type Result<T, E = FlowError> = std::result::Result<T, E>;

/// Errors surfaced by flow construction, registration and execution.
///
/// Configuration errors (`MissingResolver`, `NullDescriptor`,
/// `InvalidMiddlewareType`) are raised eagerly, before any `execute` call.
/// Everything else comes from the resolver or a handler and is passed back
/// to the caller as-is.
#[derive(Debug, Error)]
pub enum FlowError {
    #[error("handler type `{handler}` does not implement `{capability}`")]
    InvalidMiddlewareType {
        handler: &'static str,
        capability: &'static str,
    },

    #[error("no handler descriptor was supplied")]
    NullDescriptor,

    #[error("a resolver must be provided (ActivatorResolver constructs handlers via Default)")]
    MissingResolver,

    #[error("handler type `{0}` has no parameterless constructor")]
    NotActivatable(&'static str),

    #[error("resolver returned an instance that is not `{0}`")]
    ResolvedTypeMismatch(&'static str),

    #[error("factory for handler type `{0}` is already registered")]
    DuplicateFactory(&'static str),

    #[error(transparent)]
    Handler(#[from] BoxError),
}

impl FlowError {
    /// Wrap an arbitrary handler failure.
    pub fn handler(err: impl Into<BoxError>) -> Self {
        FlowError::Handler(err.into())
    }

    /// True for errors raised while building a flow.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            FlowError::InvalidMiddlewareType { .. }
                | FlowError::NullDescriptor
                | FlowError::MissingResolver
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handler_error_is_transparent() {
        let err = FlowError::handler("disk on fire");
        assert_eq!(err.to_string(), "disk on fire");
        assert!(!err.is_configuration());
    }

    #[test]
    fn invalid_type_message_names_both_sides() {
        let err = FlowError::InvalidMiddlewareType {
            handler: "NotAHandler",
            capability: "dyn Middleware<Log>",
        };
        let msg = err.to_string();
        assert!(msg.contains("NotAHandler"));
        assert!(msg.contains("dyn Middleware<Log>"));
        assert!(err.is_configuration());
    }
}
