//! # vigil-rules — Rule Evaluation
//!
//! Structured compliance rules and their evaluation over record batches:
//!
//! - **Rule** ([`rule`]): The versioned rule aggregate with its tagged
//!   [`RuleCondition`] variant (threshold, pattern, comparison, and the
//!   explicit unrecognized-kind fallback).
//!
//! - **Policy** ([`policy`]): Immutable policy version snapshots that own
//!   rule sets.
//!
//! - **Evaluator** ([`evaluator`]): Total evaluation — malformed field
//!   references, type mismatches, and invalid patterns produce zero
//!   matches instead of errors, so one bad rule never aborts a scan.

pub mod evaluator;
pub mod policy;
pub mod rule;

pub use evaluator::{RuleEvaluator, RuleMatch};
pub use policy::Policy;
pub use rule::{CompareOp, ConditionKind, Rule, RuleCondition};
