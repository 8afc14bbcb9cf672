use std::io;
use thiserror::Error;

/// Application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("configuration error: {message}")]
    Config { message: String },

    #[error("network error: {message}")]
    Network { message: String },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("path error: {path} - {reason}")]
    Path { path: String, reason: String },

    #[error("signing key error: {message}")]
    SigningKey { message: String },

    #[error("template error: {message}")]
    Template { message: String },

    #[error("unsupported: {message}")]
    Unsupported { message: String },

    #[error("validation error: {field} - {reason}")]
    Validation { field: String, reason: String },
}

/// Context attached to a fatal error before it reaches the user
#[derive(Debug, Clone)]
pub struct ErrorContext {
    pub operation: String,
    pub suggestions: Vec<String>,
}

impl AppError {
    /// Attach the failing operation (provider identity, stage) to the error
    pub fn with_context(self, operation: impl Into<String>) -> ContextualError {
        ContextualError {
            error: self,
            context: ErrorContext {
                operation: operation.into(),
                suggestions: Vec::new(),
            },
        }
    }
}

/// Error carrying the operation that failed
#[derive(Error, Debug)]
pub struct ContextualError {
    #[source]
    pub error: AppError,
    pub context: ErrorContext,
}

impl std::fmt::Display for ContextualError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.context.operation, self.error)
    }
}

impl ContextualError {
    /// Add a hint shown below the error
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.context.suggestions.push(suggestion.into());
        self
    }

    /// User facing message
    pub fn user_message(&self) -> String {
        let mut msg = format!("❌ {}\n", self.context.operation);
        msg.push_str(&format!("cause: {}\n", self.error));

        if !self.context.suggestions.is_empty() {
            msg.push_str("💡 suggestions:\n");
            for suggestion in &self.context.suggestions {
                msg.push_str(&format!("  • {}\n", suggestion));
            }
        }

        msg
    }
}

pub type AppResult<T> = Result<T, AppError>;
pub type ContextualResult<T> = Result<T, ContextualError>;

/// Shorthand constructors
impl AppError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    pub fn signing_key(message: impl Into<String>) -> Self {
        Self::SigningKey {
            message: message.into(),
        }
    }

    pub fn validation(field: &str, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.to_string(),
            reason: reason.into(),
        }
    }

    pub fn path_conversion_failed(path: &std::path::Path) -> Self {
        Self::Path {
            path: format!("{:?}", path),
            reason: "path contains invalid characters".to_string(),
        }
    }
}

impl From<handlebars::RenderError> for AppError {
    fn from(error: handlebars::RenderError) -> Self {
        Self::Template {
            message: error.to_string(),
        }
    }
}

impl From<handlebars::TemplateError> for AppError {
    fn from(error: handlebars::TemplateError) -> Self {
        Self::Template {
            message: error.to_string(),
        }
    }
}

impl From<AppError> for ContextualError {
    fn from(error: AppError) -> Self {
        Self {
            error,
            context: ErrorContext {
                operation: "generate registry".to_string(),
                suggestions: Vec::new(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contextual_error_message() {
        let err = AppError::signing_key("expected 1 key in \"key.asc\", got 2")
            .with_context("collect provider \"acme/tool\"")
            .with_suggestion("export only the release signing key");

        assert_eq!(
            err.to_string(),
            "collect provider \"acme/tool\": signing key error: expected 1 key in \"key.asc\", got 2"
        );
        let msg = err.user_message();
        assert!(msg.contains("collect provider"));
        assert!(msg.contains("export only the release signing key"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: AppError = io.into();
        assert!(matches!(err, AppError::Io(_)));
    }
}
