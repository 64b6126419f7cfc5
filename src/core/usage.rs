//! Token accounting.

use std::ops::{Add, AddAssign};

use serde::{Deserialize, Serialize};

/// Token usage of one or more model calls.
///
/// Fields are private so `total` can only ever equal `input + output`.
/// Deserialisation ignores any stored total and recomputes it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawUsage", into = "RawUsage")]
pub struct TokenUsage {
    input: u64,
    output: u64,
    total: u64,
}

impl TokenUsage {
    /// Creates usage from input and output counts.
    #[must_use]
    pub const fn new(input: u64, output: u64) -> Self {
        Self {
            input,
            output,
            total: input.saturating_add(output),
        }
    }

    /// Usage of zero tokens.
    #[must_use]
    pub const fn zero() -> Self {
        Self::new(0, 0)
    }

    /// Prompt tokens.
    #[must_use]
    pub const fn input_tokens(&self) -> u64 {
        self.input
    }

    /// Completion tokens.
    #[must_use]
    pub const fn output_tokens(&self) -> u64 {
        self.output
    }

    /// Prompt plus completion tokens.
    #[must_use]
    pub const fn total_tokens(&self) -> u64 {
        self.total
    }
}

impl Add for TokenUsage {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(
            self.input.saturating_add(rhs.input),
            self.output.saturating_add(rhs.output),
        )
    }
}

impl AddAssign for TokenUsage {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

#[derive(Serialize, Deserialize)]
struct RawUsage {
    input_tokens: u64,
    output_tokens: u64,
    #[serde(default)]
    total_tokens: u64,
}

impl From<RawUsage> for TokenUsage {
    fn from(raw: RawUsage) -> Self {
        Self::new(raw.input_tokens, raw.output_tokens)
    }
}

impl From<TokenUsage> for RawUsage {
    fn from(usage: TokenUsage) -> Self {
        Self {
            input_tokens: usage.input,
            output_tokens: usage.output,
            total_tokens: usage.total,
        }
    }
}
