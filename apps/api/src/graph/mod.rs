//! Relational graph store for the occupation/skill taxonomy.
//!
//! Nodes (occupations, skills, groups, schemes) and typed edges (requires,
//! in-group, in-scheme, broader-than) live in PostgreSQL, populated by an
//! external ETL. This module is read-mostly query logic; the only writes are
//! the notes feature.

pub mod filters;
pub mod models;
pub mod store;

pub use filters::{CandidateFilter, GroupMatch};
pub use store::GraphStore;
