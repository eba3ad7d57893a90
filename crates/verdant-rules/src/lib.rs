//! Rule definitions, the concurrent rule store, and the pure evaluator.
//!
//! A [`Rule`](rule::Rule) binds one sensor field to a threshold or range
//! condition plus the actions to take when it is violated. Rules are
//! validated at write time in the [`store::RuleStore`]; the
//! [`evaluator`] then classifies each incoming reading against every
//! enabled rule into a [`Verdict`](verdant_common::types::Verdict)
//! without side effects.

pub mod error;
pub mod evaluator;
pub mod rule;
pub mod store;


pub use error::ValidationError;
pub use rule::{Condition, Rule, RuleAction};
pub use store::RuleStore;
