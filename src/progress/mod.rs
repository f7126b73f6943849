//! Progress reporting for builds

mod handler;
mod logging;

pub use handler::{notify, NoOpHandler, ProgressEvent, ProgressHandler, StepCallback};
pub use logging::LoggingHandler;
