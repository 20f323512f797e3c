//! Result type alias for Medcloak
//!
//! This module provides a convenient Result type alias that uses
//! [`AnonymizerError`] as the error type.

use super::errors::AnonymizerError;

/// Result type alias for Medcloak operations
///
/// # Examples
///
/// ```
/// use medcloak::domain::result::Result;
/// use medcloak::domain::errors::AnonymizerError;
///
/// fn example_function() -> Result<String> {
///     Ok("success".to_string())
/// }
///
/// fn failing_function() -> Result<()> {
///     Err(AnonymizerError::Validation("Invalid input".to_string()))
/// }
/// ```
pub type Result<T> = std::result::Result<T, AnonymizerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_err() {
        let result: Result<i32> = Err(AnonymizerError::Validation("test error".to_string()));
        assert!(result.is_err());
    }

    #[test]
    fn test_result_with_question_mark() -> Result<()> {
        fn inner() -> Result<i32> {
            Ok(42)
        }

        let value = inner()?;
        assert_eq!(value, 42);
        Ok(())
    }
}
