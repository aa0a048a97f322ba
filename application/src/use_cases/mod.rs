//! Grading use cases

pub mod run_consensus;
pub mod run_grading;
pub mod run_judge;
pub mod screen_content;
