use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ClassifyError {
    /// A weight or attribute-table entry the engine needs is absent.
    #[error("incomplete configuration: {0}")]
    IncompleteConfiguration(String),

    /// A feature value outside its attribute's declared domain.
    #[error("invalid value for attribute '{attribute}': {reason}")]
    InvalidAttributeValue { attribute: String, reason: String },

    #[error("invalid weight for attribute '{attribute}': {weight}")]
    InvalidWeight { attribute: String, weight: f64 },
}

impl ClassifyError {
    pub(crate) fn invalid_value(attribute: &str, reason: impl Into<String>) -> Self {
        ClassifyError::InvalidAttributeValue {
            attribute: attribute.to_string(),
            reason: reason.into(),
        }
    }
}
