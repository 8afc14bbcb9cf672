use crate::error::{AppError, ContextualError};

/// Attach an operation description to the error side of a result
pub fn with_context<T, E: Into<AppError>>(
    result: Result<T, E>,
    operation: &str,
) -> Result<T, ContextualError> {
    result.map_err(|e| e.into().with_context(operation))
}
