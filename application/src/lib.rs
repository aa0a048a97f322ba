//! Application layer for tribunal
//!
//! This crate contains the grading use cases and port definitions.
//! It depends only on the domain layer; adapters for the ports live in
//! the infrastructure layer.

pub mod ports;
pub mod structured_output;
pub mod use_cases;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export commonly used types
pub use ports::{
    llm_gateway::{
        GatewayError, LlmGateway, LlmRequest, LlmResponse, OutputFormat, ResponseStatus,
        TokenUsage,
    },
    state_sink::{NoSink, StateSink},
};
pub use structured_output::{
    InvokeOptions, StructuredInvokeResult, StructuredOutputError, Tier, TierAttempt,
    invoke_structured,
};
pub use use_cases::run_consensus::{ConsensusError, ConsensusInput, RunConsensusUseCase};
pub use use_cases::run_grading::{GradingError, GradingInput, RunGradingUseCase};
pub use use_cases::run_judge::{JudgeError, JudgeInput, RunJudgeUseCase};
pub use use_cases::screen_content::{ContentSafetyResult, ScreenContentUseCase};
