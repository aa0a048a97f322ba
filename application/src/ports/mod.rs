//! Port definitions (interfaces to be implemented by adapters)

pub mod llm_gateway;
pub mod state_sink;
