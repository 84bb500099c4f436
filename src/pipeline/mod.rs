//! Declarative extraction specs, validation, and execution.
//!
//! ## Submodules
//!
//! - [`spec`]: the JSON [`ExtractionSpec`] selecting a policy
//! - [`validation`]: rule engine collecting every problem in a spec
//! - [`error_code`] / [`errors`]: stable codes and error payloads
//! - [`observer`]: progress hooks invoked by the extractors
//! - [`runner`]: builds an engine from a spec and runs it in a tracing span

pub mod error_code;
pub mod errors;
pub mod observer;
pub mod runner;
pub mod spec;
pub mod validation;

pub use error_code::ErrorCode;
pub use errors::{RunError, SpecError};
pub use observer::{CountingObserver, ExtractionObserver, NoopObserver};
pub use runner::{Engine, Runner};
pub use spec::{ExtractionSpec, PolicySpec};
pub use validation::{ValidationEngine, ValidationReport, ValidationRule};
