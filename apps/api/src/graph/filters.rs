//! Typed filter predicates for candidate queries.
//!
//! Group membership in the source taxonomy is represented inconsistently:
//! some hierarchy lives in broader/narrower edges, some only in numeric
//! classification-code prefixes. The filter therefore evaluates three match
//! strategies OR'd together (see [`GroupMatch`]). This is a data-quality
//! compensation, not a canonical hierarchy model.
//!
//! All fragments are composed onto a `sqlx::QueryBuilder` with `push_bind` —
//! user input never reaches the SQL text.

use sqlx::{Postgres, QueryBuilder};

/// Maximum number of broader-edge hops considered by the transitive strategy.
pub const MAX_BROADER_DEPTH: i32 = 5;

/// Group/scheme constraints applied to the candidate fetch.
#[derive(Debug, Clone, Default)]
pub struct CandidateFilter {
    pub groups: Vec<String>,
    pub schemes: Vec<String>,
}

impl CandidateFilter {
    pub fn new(groups: Vec<String>, schemes: Vec<String>) -> Self {
        Self { groups, schemes }
    }

    /// True when any filter is present; drives the engine's over-fetch factor.
    pub fn is_active(&self) -> bool {
        !self.groups.is_empty() || !self.schemes.is_empty()
    }
}

/// How an occupation's group membership can satisfy a group filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupMatch {
    /// Membership in a requested group itself.
    Direct,
    /// Membership in a group reachable from a requested group via at most
    /// `max_depth` narrower hops (the inverse of the broader walk).
    Transitive { max_depth: i32 },
    /// Membership in a group whose classification code starts with a
    /// requested group's code.
    CodePrefix,
}

impl GroupMatch {
    /// The full strategy set, in evaluation order.
    pub fn all() -> [GroupMatch; 3] {
        [
            GroupMatch::Direct,
            GroupMatch::Transitive {
                max_depth: MAX_BROADER_DEPTH,
            },
            GroupMatch::CodePrefix,
        ]
    }

    fn push_predicate(&self, qb: &mut QueryBuilder<'_, Postgres>, groups: &[String]) {
        match self {
            GroupMatch::Direct => {
                qb.push(
                    "EXISTS (SELECT 1 FROM occupation_in_group og \
                     WHERE og.occupation_uri = o.uri AND og.group_uri = ANY(",
                );
                qb.push_bind(groups.to_vec());
                qb.push("))");
            }
            GroupMatch::Transitive { .. } => {
                // Closure is materialized once in the query's CTE; depth 0 is
                // the seed (direct) case already covered above.
                qb.push(
                    "EXISTS (SELECT 1 FROM occupation_in_group og \
                     WHERE og.occupation_uri = o.uri AND og.group_uri IN \
                     (SELECT uri FROM filter_group_closure WHERE depth >= 1))",
                );
            }
            GroupMatch::CodePrefix => {
                qb.push(
                    "EXISTS (SELECT 1 FROM occupation_in_group og \
                     JOIN occupation_groups g ON g.uri = og.group_uri \
                     WHERE og.occupation_uri = o.uri AND g.code LIKE ANY(",
                );
                qb.push_bind(code_prefix_patterns(groups));
                qb.push("))");
            }
        }
    }
}

/// Builds the filtered candidate-occupation query.
///
/// One structured query: an optional recursive CTE expanding the requested
/// groups down their narrower closure, the candidate URI membership test,
/// the OR of all group-match strategies, and the scheme membership test.
pub fn candidate_query(
    candidates: &[String],
    filter: &CandidateFilter,
) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new("");

    if !filter.groups.is_empty() {
        qb.push(
            "WITH RECURSIVE filter_group_closure(uri, depth) AS ( \
             SELECT t.uri, 0 FROM unnest(",
        );
        qb.push_bind(filter.groups.clone());
        qb.push(
            "::text[]) AS t(uri) \
             UNION ALL \
             SELECT gb.narrower_uri, c.depth + 1 \
             FROM group_broader gb \
             JOIN filter_group_closure c ON gb.broader_uri = c.uri \
             WHERE c.depth < ",
        );
        qb.push_bind(MAX_BROADER_DEPTH);
        qb.push(") ");
    }

    qb.push(
        "SELECT o.uri, o.label, o.description, o.isco_code \
         FROM occupations o WHERE o.uri = ANY(",
    );
    qb.push_bind(candidates.to_vec());
    qb.push(")");

    if !filter.groups.is_empty() {
        qb.push(" AND (");
        for (i, strategy) in GroupMatch::all().iter().enumerate() {
            if i > 0 {
                qb.push(" OR ");
            }
            strategy.push_predicate(&mut qb, &filter.groups);
        }
        qb.push(")");
    }

    if !filter.schemes.is_empty() {
        qb.push(
            " AND EXISTS (SELECT 1 FROM occupation_in_scheme os \
             WHERE os.occupation_uri = o.uri AND os.scheme_uri = ANY(",
        );
        qb.push_bind(filter.schemes.clone());
        qb.push("))");
    }

    qb.push(" ORDER BY o.label");
    qb
}

/// Extracts the classification code embedded in a group URI — the segment
/// after the last `/C` (e.g. `.../isco/C2512` → `2512`). Groups whose URIs
/// carry no code segment contribute no prefix pattern.
pub fn code_from_uri(uri: &str) -> Option<&str> {
    uri.rfind("/C")
        .map(|pos| &uri[pos + 2..])
        .filter(|code| !code.is_empty())
}

/// `LIKE` patterns matching any code that starts with a filter group's code.
fn code_prefix_patterns(groups: &[String]) -> Vec<String> {
    groups
        .iter()
        .filter_map(|uri| code_from_uri(uri))
        .map(|code| format!("{code}%"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_from_uri_extracts_isco_code() {
        assert_eq!(
            code_from_uri("http://data.europa.eu/esco/isco/C2512"),
            Some("2512")
        );
    }

    #[test]
    fn test_code_from_uri_takes_last_segment() {
        assert_eq!(code_from_uri("http://x/Cabc/C25"), Some("25"));
    }

    #[test]
    fn test_code_from_uri_without_code_segment() {
        assert_eq!(code_from_uri("http://data.europa.eu/esco/group/12"), None);
        assert_eq!(code_from_uri("http://x/C"), None);
    }

    #[test]
    fn test_code_prefix_patterns_skip_codeless_uris() {
        let groups = vec![
            "http://x/isco/C25".to_string(),
            "http://x/group/no-code".to_string(),
        ];
        assert_eq!(code_prefix_patterns(&groups), vec!["25%".to_string()]);
    }

    #[test]
    fn test_unfiltered_query_has_no_predicates() {
        let qb = candidate_query(&["http://x/occ/1".to_string()], &CandidateFilter::default());
        let sql = qb.sql();
        assert!(sql.contains("o.uri = ANY"));
        assert!(!sql.contains("filter_group_closure"));
        assert!(!sql.contains("occupation_in_scheme"));
    }

    #[test]
    fn test_group_filter_emits_all_three_strategies() {
        let filter = CandidateFilter::new(vec!["http://x/isco/C25".to_string()], vec![]);
        let qb = candidate_query(&["http://x/occ/1".to_string()], &filter);
        let sql = qb.sql();
        assert!(sql.starts_with("WITH RECURSIVE filter_group_closure"));
        assert!(sql.contains("og.group_uri = ANY"));
        assert!(sql.contains("depth >= 1"));
        assert!(sql.contains("g.code LIKE ANY"));
        assert_eq!(sql.matches(" OR ").count(), 2);
    }

    #[test]
    fn test_scheme_filter_emits_membership_test() {
        let filter = CandidateFilter::new(vec![], vec!["http://x/scheme/digital".to_string()]);
        let qb = candidate_query(&["http://x/occ/1".to_string()], &filter);
        let sql = qb.sql();
        assert!(sql.contains("occupation_in_scheme"));
        assert!(!sql.contains("filter_group_closure"));
    }

    #[test]
    fn test_filter_is_active() {
        assert!(!CandidateFilter::default().is_active());
        assert!(CandidateFilter::new(vec!["g".into()], vec![]).is_active());
        assert!(CandidateFilter::new(vec![], vec!["s".into()]).is_active());
    }
}
