//! Recommendation engine: vector search + graph enrichment + skill gaps.

pub mod engine;
pub mod handlers;
pub mod skill_gap;
