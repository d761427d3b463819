//! Skill-gap analysis: which of an occupation's required skills the user
//! already has, and which are missing.

use std::collections::HashSet;

use serde::Serialize;

use crate::graph::models::RequiredSkill;

/// Result of reconciling a required-skill set against a user's skills.
/// The essential/optional relation type is preserved on every entry for
/// presentation; the percentage weighs all required skills uniformly.
#[derive(Debug, Clone, Serialize)]
pub struct SkillGap {
    pub matched: Vec<RequiredSkill>,
    pub missing: Vec<RequiredSkill>,
    pub match_percentage: f64,
}

/// Partitions `required` into matched/missing by URI membership in
/// `user_skills`. An empty required set yields 0.0, a defined edge case
/// rather than a division error.
pub fn resolve(required: &[RequiredSkill], user_skills: &HashSet<String>) -> SkillGap {
    let (matched, missing): (Vec<RequiredSkill>, Vec<RequiredSkill>) = required
        .iter()
        .cloned()
        .partition(|skill| user_skills.contains(&skill.uri));

    let match_percentage = if required.is_empty() {
        0.0
    } else {
        matched.len() as f64 / required.len() as f64 * 100.0
    };

    SkillGap {
        matched,
        missing,
        match_percentage,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn skill(uri: &str, relation_type: &str) -> RequiredSkill {
        RequiredSkill {
            uri: uri.to_string(),
            label: uri.rsplit(':').next().unwrap_or(uri).to_string(),
            skill_type: None,
            relation_type: relation_type.to_string(),
        }
    }

    fn user(uris: &[&str]) -> HashSet<String> {
        uris.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_half_coverage_is_fifty_percent() {
        let required = vec![skill("skill:python", "essential"), skill("skill:sql", "essential")];
        let gap = resolve(&required, &user(&["skill:python"]));

        assert_eq!(gap.matched.len(), 1);
        assert_eq!(gap.matched[0].uri, "skill:python");
        assert_eq!(gap.missing.len(), 1);
        assert_eq!(gap.missing[0].uri, "skill:sql");
        assert_eq!(gap.match_percentage, 50.0);
    }

    #[test]
    fn test_empty_required_set_is_zero_percent() {
        let gap = resolve(&[], &user(&["skill:python"]));
        assert!(gap.matched.is_empty());
        assert!(gap.missing.is_empty());
        assert_eq!(gap.match_percentage, 0.0);
    }

    #[test]
    fn test_full_coverage_is_hundred_percent() {
        let required = vec![skill("skill:python", "essential"), skill("skill:sql", "optional")];
        let gap = resolve(&required, &user(&["skill:python", "skill:sql", "skill:extra"]));
        assert_eq!(gap.match_percentage, 100.0);
        assert!(gap.missing.is_empty());
    }

    #[test]
    fn test_matched_and_missing_partition_required() {
        let required = vec![
            skill("skill:a", "essential"),
            skill("skill:b", "optional"),
            skill("skill:c", "essential"),
        ];
        let gap = resolve(&required, &user(&["skill:b"]));

        let mut all: Vec<&str> = gap
            .matched
            .iter()
            .chain(&gap.missing)
            .map(|s| s.uri.as_str())
            .collect();
        all.sort();
        assert_eq!(all, vec!["skill:a", "skill:b", "skill:c"]);
        assert_eq!(gap.matched.len() + gap.missing.len(), required.len());
    }

    #[test]
    fn test_percentage_monotonic_in_user_skills() {
        let required = vec![
            skill("skill:a", "essential"),
            skill("skill:b", "essential"),
            skill("skill:c", "optional"),
        ];

        let mut previous = resolve(&required, &user(&[])).match_percentage;
        for grown in [
            user(&["skill:a"]),
            user(&["skill:a", "skill:b"]),
            user(&["skill:a", "skill:b", "skill:c"]),
        ] {
            let current = resolve(&required, &grown).match_percentage;
            assert!(current >= previous);
            previous = current;
        }
        assert_eq!(previous, 100.0);
    }

    #[test]
    fn test_relation_type_preserved_on_entries() {
        let required = vec![skill("skill:a", "essential"), skill("skill:b", "optional")];
        let gap = resolve(&required, &user(&["skill:a"]));
        assert_eq!(gap.matched[0].relation_type, "essential");
        assert_eq!(gap.missing[0].relation_type, "optional");
    }

    #[test]
    fn test_percentage_bounded() {
        let required = vec![skill("skill:a", "essential")];
        let gap = resolve(&required, &user(&["skill:a", "skill:x", "skill:y"]));
        assert!(gap.match_percentage >= 0.0 && gap.match_percentage <= 100.0);
    }
}
