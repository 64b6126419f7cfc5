//! Search-effort policy.
//!
//! A [`SearchMode`] selects both the instruction text handed to the model
//! and the [`SearchBudget`] the tool-calling loop enforces. The loop asks the
//! budget twice: before executing a tool call ([`SearchBudget::allows`]) and
//! when the model proposes a final answer ([`SearchBudget::review`]).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::answer::SearchAgentAnswer;
use super::prompt;

/// How much searching the agent must do before answering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    /// Thorough and predictable: fixed minimums, generous caps.
    #[default]
    Evaluation,
    /// Cheap: tight caps, early stop on high confidence.
    Production,
    /// Exhaustive: high minimums, no caps.
    Research,
}

impl SearchMode {
    /// All modes, in display order.
    pub const ALL: [Self; 3] = [Self::Evaluation, Self::Production, Self::Research];

    /// Lower-case mode name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Evaluation => "evaluation",
            Self::Production => "production",
            Self::Research => "research",
        }
    }

    /// Call budget for this mode.
    #[must_use]
    pub const fn budget(self) -> SearchBudget {
        match self {
            Self::Evaluation => SearchBudget {
                min_search: 3,
                max_search: Some(17),
                min_retrieval: 2,
                max_retrieval: Some(10),
                early_stop_confidence: None,
            },
            Self::Production => SearchBudget {
                min_search: 3,
                max_search: Some(8),
                min_retrieval: 2,
                max_retrieval: Some(5),
                early_stop_confidence: Some(0.9),
            },
            Self::Research => SearchBudget {
                min_search: 11,
                max_search: None,
                min_retrieval: 5,
                max_retrieval: None,
                early_stop_confidence: None,
            },
        }
    }
}

impl fmt::Display for SearchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a mode name is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown search mode '{0}' (expected evaluation, production or research)")]
pub struct UnknownMode(pub String);

impl FromStr for SearchMode {
    type Err = UnknownMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "evaluation" => Ok(Self::Evaluation),
            "production" => Ok(Self::Production),
            "research" => Ok(Self::Research),
            _ => Err(UnknownMode(s.to_string())),
        }
    }
}

/// Which kind of tool call is being counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    /// A page search.
    Search,
    /// A page retrieval.
    Retrieval,
}

/// Minimum and maximum call counts for one run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchBudget {
    /// Searches required before a final answer is accepted.
    pub min_search: usize,
    /// Searches allowed, if capped.
    pub max_search: Option<usize>,
    /// Page retrievals required before a final answer is accepted.
    pub min_retrieval: usize,
    /// Page retrievals allowed, if capped.
    pub max_retrieval: Option<usize>,
    /// Confidence at which the minimums may be skipped.
    pub early_stop_confidence: Option<f64>,
}

/// Outcome of reviewing a proposed final answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BudgetVerdict {
    /// The answer may be returned.
    Accept,
    /// The model must keep searching; carries the nudge to send back.
    Continue(String),
}

impl SearchBudget {
    /// Whether one more call of `kind` fits, given `done` calls so far.
    #[must_use]
    pub fn allows(&self, kind: CallKind, done: usize) -> bool {
        let cap = match kind {
            CallKind::Search => self.max_search,
            CallKind::Retrieval => self.max_retrieval,
        };
        cap.is_none_or(|max| done < max)
    }

    /// Decides whether a proposed answer satisfies the budget.
    #[must_use]
    pub fn review(
        &self,
        searches: usize,
        retrievals: usize,
        answer: &SearchAgentAnswer,
    ) -> BudgetVerdict {
        if searches >= self.min_search && retrievals >= self.min_retrieval {
            return BudgetVerdict::Accept;
        }

        if let Some(threshold) = self.early_stop_confidence {
            let grounded = !answer.answer.trim().is_empty()
                && !answer.sources_used.is_empty()
                && searches >= 1;
            if grounded && answer.confidence >= threshold {
                return BudgetVerdict::Accept;
            }
        }

        // A capped budget can make the minimum unreachable.
        let search_floor = self
            .max_search
            .map_or(self.min_search, |max| self.min_search.min(max));
        let retrieval_floor = self
            .max_retrieval
            .map_or(self.min_retrieval, |max| self.min_retrieval.min(max));
        if searches >= search_floor && retrievals >= retrieval_floor {
            return BudgetVerdict::Accept;
        }

        BudgetVerdict::Continue(prompt::budget_nudge(
            searches,
            self.min_search,
            retrievals,
            self.min_retrieval,
        ))
    }
}

/// Instruction text and budget for one mode.
#[derive(Debug, Clone)]
pub struct ModeInstructions {
    /// System prompt for the agent.
    pub text: String,
    /// Budget the loop enforces.
    pub budget: SearchBudget,
}

/// Returns the instructions and budget for `mode`.
#[must_use]
pub fn instructions_for(mode: SearchMode) -> ModeInstructions {
    let budget = mode.budget();
    ModeInstructions {
        text: prompt::agent_instructions(mode, &budget),
        budget,
    }
}
