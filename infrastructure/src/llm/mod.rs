//! LLM gateway adapters

pub mod responses;

pub use responses::{GatewaySetupError, ResponsesGateway};
