use crate::error::{AppError, Result};

/// Rejects values that are empty once surrounding whitespace is removed.
pub fn validate_not_blank(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("{} cannot be empty", field)));
    }

    Ok(())
}
