//! Orchestration of one recommendation request: resolve skill labels, build
//! the query vector, over-fetch candidates from the vector index, enrich and
//! filter them through the graph store, attach skill gaps, rank, truncate.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use serde::Serialize;
use tracing::{debug, warn};

use crate::errors::AppError;
use crate::graph::models::{OccupationRecord, RequiredSkill};
use crate::graph::{CandidateFilter, GraphStore};
use crate::ml::{average_normalized, MlContext};
use crate::recommend::skill_gap;

pub const MIN_LIMIT: usize = 1;
pub const MAX_LIMIT: usize = 100;

/// Over-fetch factor applied when group/scheme filters are active, since
/// post-filtering may discard a large fraction of the candidate pool. A
/// tunable heuristic, not a correctness requirement.
const FILTERED_OVERFETCH_FACTOR: usize = 3;

/// One ranked result. Always fully populated: similarity score and
/// skill-gap data are both present on every element returned to callers.
#[derive(Debug, Clone, Serialize)]
pub struct Recommendation {
    pub uri: String,
    pub label: String,
    pub description: Option<String>,
    pub isco_code: Option<String>,
    pub similarity_score: f64,
    pub match_percentage: f64,
    pub matched_skills: Vec<RequiredSkill>,
    pub missing_skills: Vec<RequiredSkill>,
    pub groups: Vec<String>,
    pub schemes: Vec<String>,
}

/// A vector-search candidate in original search order.
#[derive(Debug, Clone)]
struct Candidate {
    uri: String,
    similarity: f64,
}

pub struct RecommendationEngine<'a> {
    ml: &'a MlContext,
    store: &'a GraphStore,
}

impl<'a> RecommendationEngine<'a> {
    pub fn new(ml: &'a MlContext, store: &'a GraphStore) -> Self {
        Self { ml, store }
    }

    pub async fn recommend(
        &self,
        skill_uris: &[String],
        filter: &CandidateFilter,
        limit: usize,
    ) -> Result<Vec<Recommendation>, AppError> {
        // Invalid requests are rejected before any downstream call.
        if skill_uris.is_empty() {
            return Err(AppError::Validation(
                "At least one skill URI is required".to_string(),
            ));
        }
        if !(MIN_LIMIT..=MAX_LIMIT).contains(&limit) {
            return Err(AppError::Validation(format!(
                "limit must be between {MIN_LIMIT} and {MAX_LIMIT}"
            )));
        }

        // 1. Resolve labels; an unknown skill URI falls back to the URI
        //    itself rather than failing the whole request.
        let labels = self.resolve_labels(skill_uris).await?;

        // 2. Encode each label independently, then average and re-normalize.
        let vectors = self
            .ml
            .embedder
            .encode(&labels)
            .await
            .map_err(|e| AppError::Embedding(e.to_string()))?;
        let query = average_normalized(&vectors)
            .ok_or_else(|| AppError::Embedding("Degenerate query embedding".to_string()))?;

        // 3. Over-fetch when filters will thin the pool.
        if self.ml.index.is_empty() {
            return Ok(vec![]);
        }
        let k = overfetch(limit, filter.is_active()).min(self.ml.index.len());

        // 4. Nearest neighbors, mapped to URIs in search order.
        let hits = self.ml.index.search(&query, k)?;
        let candidates = self.map_candidates_to_uris(&hits);
        if candidates.is_empty() {
            return Ok(vec![]);
        }

        // 5. Bulk fetch + filter at the query layer, then gap analysis.
        let candidate_uris: Vec<String> = candidates.iter().map(|c| c.uri.clone()).collect();
        let records = self.store.fetch_candidates(&candidate_uris, filter).await?;
        debug!(
            "Recommendation pool: {} candidates, {} after graph filters",
            candidates.len(),
            records.len()
        );

        let user_skills: HashSet<String> = skill_uris.iter().cloned().collect();
        Ok(assemble(&candidates, records, &user_skills, limit))
    }

    async fn resolve_labels(&self, skill_uris: &[String]) -> Result<Vec<String>, AppError> {
        let label_map = self.store.skill_labels(skill_uris).await?;
        Ok(skill_uris
            .iter()
            .map(|uri| label_map.get(uri).cloned().unwrap_or_else(|| uri.clone()))
            .collect())
    }

    fn map_candidates_to_uris(&self, hits: &[crate::ml::index::SearchHit]) -> Vec<Candidate> {
        let mut candidates = Vec::with_capacity(hits.len());
        for hit in hits {
            // Tolerates benign index/mapping drift from the offline build;
            // anything else about the artifacts is validated at load time.
            let Some(uri) = self.ml.index.uri_for_row(hit.row) else {
                warn!("Vector index returned invalid row {}; skipping", hit.row);
                continue;
            };
            candidates.push(Candidate {
                uri: uri.to_string(),
                similarity: similarity_from_distance(hit.distance),
            });
        }
        candidates
    }
}

/// Converts an L2 distance between unit vectors into cosine similarity:
/// `1 − d²/2`, clamped to [0, 1].
fn similarity_from_distance(distance: f32) -> f64 {
    let distance = distance as f64;
    (1.0 - distance * distance / 2.0).clamp(0.0, 1.0)
}

fn overfetch(limit: usize, filters_active: bool) -> usize {
    if filters_active {
        limit * FILTERED_OVERFETCH_FACTOR
    } else {
        limit
    }
}

/// Joins filtered records back onto the candidate list (preserving original
/// search order), attaches skill gaps, then stable-sorts by similarity
/// descending and truncates. Ties keep candidate order. Fewer than `limit`
/// survivors is a valid outcome, never an error.
fn assemble(
    candidates: &[Candidate],
    records: Vec<OccupationRecord>,
    user_skills: &HashSet<String>,
    limit: usize,
) -> Vec<Recommendation> {
    let mut by_uri: HashMap<String, OccupationRecord> = records
        .into_iter()
        .map(|record| (record.uri.clone(), record))
        .collect();

    let mut results = Vec::new();
    for candidate in candidates {
        let Some(record) = by_uri.remove(&candidate.uri) else {
            continue; // removed by group/scheme filters
        };
        let gap = skill_gap::resolve(&record.required_skills, user_skills);
        results.push(Recommendation {
            uri: record.uri,
            label: record.label,
            description: record.description,
            isco_code: record.isco_code,
            similarity_score: candidate.similarity,
            match_percentage: gap.match_percentage,
            matched_skills: gap.matched,
            missing_skills: gap.missing,
            groups: record.groups,
            schemes: record.schemes,
        });
    }

    results.sort_by(|a, b| {
        b.similarity_score
            .partial_cmp(&a.similarity_score)
            .unwrap_or(Ordering::Equal)
    });
    results.truncate(limit);
    results
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(uri: &str, similarity: f64) -> Candidate {
        Candidate {
            uri: uri.to_string(),
            similarity,
        }
    }

    fn record(uri: &str, required: &[(&str, &str)]) -> OccupationRecord {
        OccupationRecord {
            uri: uri.to_string(),
            label: uri.to_string(),
            description: None,
            isco_code: None,
            required_skills: required
                .iter()
                .map(|(skill_uri, relation)| RequiredSkill {
                    uri: skill_uri.to_string(),
                    label: skill_uri.to_string(),
                    skill_type: None,
                    relation_type: relation.to_string(),
                })
                .collect(),
            groups: vec![],
            schemes: vec![],
        }
    }

    fn user(uris: &[&str]) -> HashSet<String> {
        uris.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_similarity_from_distance_bounds() {
        assert_eq!(similarity_from_distance(0.0), 1.0);
        // Orthogonal unit vectors: d = √2 → similarity 0
        assert!(similarity_from_distance(std::f32::consts::SQRT_2) < 1e-6);
        // Opposite unit vectors: d = 2 → clamped to 0
        assert_eq!(similarity_from_distance(2.0), 0.0);
    }

    #[test]
    fn test_overfetch_triples_under_filters() {
        assert_eq!(overfetch(20, false), 20);
        assert_eq!(overfetch(20, true), 60);
    }

    #[test]
    fn test_assemble_sorts_descending_by_similarity() {
        let candidates = vec![
            candidate("occ:a", 0.4),
            candidate("occ:b", 0.9),
            candidate("occ:c", 0.7),
        ];
        let records = vec![record("occ:a", &[]), record("occ:b", &[]), record("occ:c", &[])];

        let results = assemble(&candidates, records, &user(&[]), 10);
        let uris: Vec<&str> = results.iter().map(|r| r.uri.as_str()).collect();
        assert_eq!(uris, vec!["occ:b", "occ:c", "occ:a"]);
        for pair in results.windows(2) {
            assert!(pair[0].similarity_score >= pair[1].similarity_score);
        }
    }

    #[test]
    fn test_assemble_ties_keep_candidate_order() {
        let candidates = vec![
            candidate("occ:first", 0.5),
            candidate("occ:second", 0.5),
            candidate("occ:third", 0.5),
        ];
        let records = vec![
            record("occ:third", &[]),
            record("occ:first", &[]),
            record("occ:second", &[]),
        ];

        let results = assemble(&candidates, records, &user(&[]), 10);
        let uris: Vec<&str> = results.iter().map(|r| r.uri.as_str()).collect();
        assert_eq!(uris, vec!["occ:first", "occ:second", "occ:third"]);
    }

    #[test]
    fn test_assemble_truncates_to_limit() {
        let candidates: Vec<Candidate> = (0..10)
            .map(|i| candidate(&format!("occ:{i}"), 1.0 - i as f64 * 0.05))
            .collect();
        let records: Vec<OccupationRecord> =
            (0..10).map(|i| record(&format!("occ:{i}"), &[])).collect();

        let results = assemble(&candidates, records, &user(&[]), 3);
        assert_eq!(results.len(), 3);
    }

    #[test]
    fn test_assemble_returns_fewer_when_filters_thinned_pool() {
        // limit 5 but only 3 candidates survived graph filtering
        let candidates: Vec<Candidate> = (0..15)
            .map(|i| candidate(&format!("occ:{i}"), 1.0 - i as f64 * 0.01))
            .collect();
        let records = vec![record("occ:2", &[]), record("occ:7", &[]), record("occ:11", &[])];

        let results = assemble(&candidates, records, &user(&[]), 5);
        assert_eq!(results.len(), 3);
    }

    #[test]
    fn test_assemble_attaches_skill_gap_to_every_result() {
        let candidates = vec![candidate("occ:a", 0.8)];
        let records = vec![record(
            "occ:a",
            &[("skill:python", "essential"), ("skill:sql", "essential")],
        )];

        let results = assemble(&candidates, records, &user(&["skill:python"]), 10);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].match_percentage, 50.0);
        assert_eq!(results[0].matched_skills.len(), 1);
        assert_eq!(results[0].missing_skills.len(), 1);
        assert_eq!(
            results[0].matched_skills.len() + results[0].missing_skills.len(),
            2
        );
    }

    #[test]
    fn test_assemble_skips_candidates_without_records() {
        let candidates = vec![candidate("occ:kept", 0.9), candidate("occ:filtered", 0.8)];
        let records = vec![record("occ:kept", &[])];

        let results = assemble(&candidates, records, &user(&[]), 10);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].uri, "occ:kept");
    }
}
