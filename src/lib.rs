pub mod compiler;
pub mod config;
pub mod deadline;
pub mod errors;
pub mod executor;
pub mod fixtures;
pub mod grader;
pub mod inspect;
pub mod normalize;
pub mod report;
pub mod similarity;
pub mod source;
pub mod types;

pub use config::GraderConfig;
pub use errors::{FailureKind, GraderError, GraderResult};
pub use grader::Grader;
pub use report::{BatchReport, SubmissionReport};
pub use types::*;
