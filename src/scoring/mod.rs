//! Similarity scoring of a live sample against a trained profile.

mod engine;

pub use engine::{Decision, MatchResult, SimilarityScorer};
