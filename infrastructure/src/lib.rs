//! Infrastructure layer for tribunal
//!
//! This crate contains adapters that implement the ports defined in the
//! application layer: the Responses API gateway, configuration loading,
//! grading resource loading, and logging setup.

pub mod config;
pub mod llm;
pub mod logging;
pub mod resources;

// Re-export commonly used types
pub use config::{
    ConfigLoader, ConfigValidationError, FileCalibrationPaths, FileConfig, FileGatewayConfig,
    FileGradingConfig, FileResourcesConfig,
};
pub use llm::{GatewaySetupError, ResponsesGateway};
pub use resources::{ResourceError, load_calibration_set, load_rubric};
