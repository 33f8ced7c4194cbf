//! GraphScribe Evaluator
//!
//! Scores a stored prompt template against sample texts with four heuristic
//! metrics:
//!
//! | Metric | Measures |
//! |---|---|
//! | completeness | share of source clauses mentioned by some extracted name, alias or attribute |
//! | accuracy | share of relationships whose relation type appears in an allowed triplet |
//! | consistency | share of nodes and relationships with the required JSON shape |
//! | relevance | how literally node names occur in the source text |
//!
//! Every score lies in `[0, 1]` and comes with a short note. A text whose LLM
//! call fails, or whose reply is not JSON, gets zero scores and an error note;
//! the other texts are unaffected.

#![warn(missing_docs)]

mod error;
mod evaluator;
pub mod scoring;
mod types;

pub use error::EvaluatorError;
pub use evaluator::{parse_metrics, recommendation, summarize, Evaluator};
pub use types::EvaluationRequest;
