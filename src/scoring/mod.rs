pub mod engine;
pub mod error;
pub mod factors;
pub mod features;
pub mod table;
pub mod validation;

pub use engine::{
    classify, AttributeContribution, CanonicalResult, CategoryScore, Classification,
    ClassifyOptions, InputSource, ResolvedInput, ValidationMode, DEFAULT_AMBIGUITY_THRESHOLD,
};
pub use error::ClassifyError;
pub use factors::{Term, TermSource};
pub use features::{FeatureValue, Features, Weights};
pub use table::*;
pub use validation::validate_scoring;
