use validator::{Validate, ValidationErrors};

use crate::application::{ApplicationError, FieldErrors};

/// Flatten validator output into field name -> messages
///
/// A rule without a custom message is reported by its code.
pub fn field_errors(errors: &ValidationErrors) -> FieldErrors {
    errors
        .field_errors()
        .iter()
        .map(|(field, errs)| {
            let messages = errs
                .iter()
                .map(|e| match &e.message {
                    Some(message) => message.to_string(),
                    None => e.code.to_string(),
                })
                .collect();
            (field.to_string(), messages)
        })
        .collect()
}

/// Run the derived rules on a request DTO before it reaches the core
pub fn validate_request<T: Validate>(request: &T) -> Result<(), ApplicationError> {
    request
        .validate()
        .map_err(|e| ApplicationError::Validation(field_errors(&e)))
}
