//! Core value types shared by the agent and the evaluation harness.
//!
//! Kept free of any runtime or provider dependency so both sides can use
//! them without pulling in the tool-calling machinery.

pub mod scoring;
pub mod usage;

pub use scoring::{ScoringFormula, WeightedScore, hit_rate, mrr};
pub use usage::TokenUsage;
