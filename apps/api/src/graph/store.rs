use std::collections::HashMap;

use sqlx::{FromRow, PgPool, QueryBuilder};
use uuid::Uuid;

use crate::graph::filters::{self, CandidateFilter};
use crate::graph::models::{
    CatalogEntry, CountEntry, GroupEntry, NoteRow, OccupationRecord, OccupationRow, RequiredSkill,
    SkillRow,
};

/// Query service over the taxonomy graph. Construction is cheap; each call
/// draws its own connection from the shared pool, so a single instance may
/// serve concurrent requests.
#[derive(Clone)]
pub struct GraphStore {
    pool: PgPool,
}

/// Search predicates for the occupation listing endpoint.
#[derive(Debug, Clone, Default)]
pub struct OccupationSearch {
    pub q: Option<String>,
    pub groups: Vec<String>,
    pub required_skills: Vec<String>,
    pub schemes: Vec<String>,
    pub limit: i64,
    pub offset: i64,
}

/// Search predicates for the skill listing endpoint.
#[derive(Debug, Clone, Default)]
pub struct SkillSearch {
    pub q: Option<String>,
    pub skill_type: Option<String>,
    pub groups: Vec<String>,
    pub schemes: Vec<String>,
    pub related_to: Option<String>,
    pub limit: i64,
    pub offset: i64,
}

#[derive(FromRow)]
struct RequiresEdgeRow {
    occupation_uri: String,
    uri: String,
    label: String,
    skill_type: Option<String>,
    relation_type: String,
}

#[derive(FromRow)]
struct LabelEdgeRow {
    occupation_uri: String,
    label: String,
}

impl GraphStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Cheap connectivity probe for the health endpoint.
    pub async fn ping(&self) -> Result<(), sqlx::Error> {
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await?;
        Ok(())
    }

    /// Resolves skill URIs to display labels. Unknown URIs are simply absent
    /// from the map; callers fall back to the URI itself.
    pub async fn skill_labels(
        &self,
        uris: &[String],
    ) -> Result<HashMap<String, String>, sqlx::Error> {
        let rows: Vec<CatalogEntry> =
            sqlx::query_as("SELECT uri, label FROM skills WHERE uri = ANY($1)")
                .bind(uris)
                .fetch_all(&self.pool)
                .await?;

        Ok(rows.into_iter().map(|r| (r.uri, r.label)).collect())
    }

    /// Fetches full occupation records for a candidate URI set, applying
    /// group/scheme filters inside the primary query (not post-hoc), then
    /// bulk-enriching the survivors with required skills and group/scheme
    /// labels. Occupations without skills or memberships still come back,
    /// with empty lists.
    pub async fn fetch_candidates(
        &self,
        candidates: &[String],
        filter: &CandidateFilter,
    ) -> Result<Vec<OccupationRecord>, sqlx::Error> {
        if candidates.is_empty() {
            return Ok(vec![]);
        }

        let mut qb = filters::candidate_query(candidates, filter);
        let rows: Vec<OccupationRow> = qb.build_query_as().fetch_all(&self.pool).await?;
        if rows.is_empty() {
            return Ok(vec![]);
        }

        let uris: Vec<String> = rows.iter().map(|r| r.uri.clone()).collect();

        let skill_edges: Vec<RequiresEdgeRow> = sqlx::query_as(
            r#"
            SELECT r.occupation_uri, s.uri, s.label, s.skill_type, r.relation_type
            FROM occupation_requires_skill r
            JOIN skills s ON s.uri = r.skill_uri
            WHERE r.occupation_uri = ANY($1)
            ORDER BY s.label
            "#,
        )
        .bind(&uris)
        .fetch_all(&self.pool)
        .await?;

        let group_edges: Vec<LabelEdgeRow> = sqlx::query_as(
            r#"
            SELECT og.occupation_uri, COALESCE(g.label, g.code, g.uri) AS label
            FROM occupation_in_group og
            JOIN occupation_groups g ON g.uri = og.group_uri
            WHERE og.occupation_uri = ANY($1)
            "#,
        )
        .bind(&uris)
        .fetch_all(&self.pool)
        .await?;

        let scheme_edges: Vec<LabelEdgeRow> = sqlx::query_as(
            r#"
            SELECT os.occupation_uri, COALESCE(cs.label, cs.uri) AS label
            FROM occupation_in_scheme os
            JOIN concept_schemes cs ON cs.uri = os.scheme_uri
            WHERE os.occupation_uri = ANY($1)
            "#,
        )
        .bind(&uris)
        .fetch_all(&self.pool)
        .await?;

        let mut skills_by_occ: HashMap<String, Vec<RequiredSkill>> = HashMap::new();
        for edge in skill_edges {
            skills_by_occ
                .entry(edge.occupation_uri)
                .or_default()
                .push(RequiredSkill {
                    uri: edge.uri,
                    label: edge.label,
                    skill_type: edge.skill_type,
                    relation_type: edge.relation_type,
                });
        }

        let mut groups_by_occ: HashMap<String, Vec<String>> = HashMap::new();
        for edge in group_edges {
            groups_by_occ
                .entry(edge.occupation_uri)
                .or_default()
                .push(edge.label);
        }

        let mut schemes_by_occ: HashMap<String, Vec<String>> = HashMap::new();
        for edge in scheme_edges {
            schemes_by_occ
                .entry(edge.occupation_uri)
                .or_default()
                .push(edge.label);
        }

        Ok(rows
            .into_iter()
            .map(|row| OccupationRecord {
                required_skills: skills_by_occ.remove(&row.uri).unwrap_or_default(),
                groups: groups_by_occ.remove(&row.uri).unwrap_or_default(),
                schemes: schemes_by_occ.remove(&row.uri).unwrap_or_default(),
                uri: row.uri,
                label: row.label,
                description: row.description,
                isco_code: row.isco_code,
            })
            .collect())
    }

    pub async fn search_occupations(
        &self,
        params: &OccupationSearch,
    ) -> Result<Vec<OccupationRow>, sqlx::Error> {
        let mut qb: QueryBuilder<'_, sqlx::Postgres> = QueryBuilder::new(
            "SELECT o.uri, o.label, o.description, o.isco_code FROM occupations o WHERE 1=1",
        );

        if let Some(q) = non_blank(&params.q) {
            qb.push(" AND o.label ILIKE ");
            qb.push_bind(format!("%{q}%"));
        }
        if !params.groups.is_empty() {
            qb.push(
                " AND EXISTS (SELECT 1 FROM occupation_in_group og \
                 WHERE og.occupation_uri = o.uri AND og.group_uri = ANY(",
            );
            qb.push_bind(params.groups.clone());
            qb.push("))");
        }
        if !params.required_skills.is_empty() {
            qb.push(
                " AND EXISTS (SELECT 1 FROM occupation_requires_skill r \
                 WHERE r.occupation_uri = o.uri AND r.skill_uri = ANY(",
            );
            qb.push_bind(params.required_skills.clone());
            qb.push("))");
        }
        if !params.schemes.is_empty() {
            qb.push(
                " AND EXISTS (SELECT 1 FROM occupation_in_scheme os \
                 WHERE os.occupation_uri = o.uri AND os.scheme_uri = ANY(",
            );
            qb.push_bind(params.schemes.clone());
            qb.push("))");
        }

        qb.push(" ORDER BY o.label LIMIT ");
        qb.push_bind(params.limit);
        qb.push(" OFFSET ");
        qb.push_bind(params.offset);

        qb.build_query_as().fetch_all(&self.pool).await
    }

    /// Required-skill profile for one occupation. `None` when the occupation
    /// does not exist (a 404, distinct from an occupation with no skills).
    pub async fn occupation_required_skills(
        &self,
        occupation_uri: &str,
        essential_only: bool,
        skill_type: Option<&str>,
    ) -> Result<Option<(OccupationRow, Vec<RequiredSkill>)>, sqlx::Error> {
        let occupation: Option<OccupationRow> = sqlx::query_as(
            "SELECT uri, label, description, isco_code FROM occupations WHERE uri = $1",
        )
        .bind(occupation_uri)
        .fetch_optional(&self.pool)
        .await?;

        let Some(occupation) = occupation else {
            return Ok(None);
        };

        let skills: Vec<RequiredSkill> = sqlx::query_as(
            r#"
            SELECT s.uri, s.label, s.skill_type, r.relation_type
            FROM occupation_requires_skill r
            JOIN skills s ON s.uri = r.skill_uri
            WHERE r.occupation_uri = $1
              AND ($2 = false OR lower(r.relation_type) LIKE '%essential%')
              AND ($3::text IS NULL OR s.skill_type = $3)
            ORDER BY s.label
            "#,
        )
        .bind(occupation_uri)
        .bind(essential_only)
        .bind(skill_type)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some((occupation, skills)))
    }

    pub async fn search_skills(&self, params: &SkillSearch) -> Result<Vec<SkillRow>, sqlx::Error> {
        let mut qb: QueryBuilder<'_, sqlx::Postgres> = match &params.related_to {
            Some(related) => {
                let mut qb = QueryBuilder::new(
                    "SELECT DISTINCT s.uri, s.label, s.description, s.skill_type \
                     FROM skill_related sr JOIN skills s ON s.uri = sr.related_uri \
                     WHERE sr.skill_uri = ",
                );
                qb.push_bind(related.clone());
                qb
            }
            None => QueryBuilder::new(
                "SELECT s.uri, s.label, s.description, s.skill_type FROM skills s WHERE 1=1",
            ),
        };

        if let Some(q) = non_blank(&params.q) {
            qb.push(" AND s.label ILIKE ");
            qb.push_bind(format!("%{q}%"));
        }
        if let Some(skill_type) = non_blank(&params.skill_type) {
            qb.push(" AND s.skill_type = ");
            qb.push_bind(skill_type.to_string());
        }
        if !params.groups.is_empty() {
            qb.push(
                " AND EXISTS (SELECT 1 FROM skill_in_group sg \
                 WHERE sg.skill_uri = s.uri AND sg.group_uri = ANY(",
            );
            qb.push_bind(params.groups.clone());
            qb.push("))");
        }
        if !params.schemes.is_empty() {
            qb.push(
                " AND EXISTS (SELECT 1 FROM skill_in_scheme ss \
                 WHERE ss.skill_uri = s.uri AND ss.scheme_uri = ANY(",
            );
            qb.push_bind(params.schemes.clone());
            qb.push("))");
        }

        qb.push(" ORDER BY s.label LIMIT ");
        qb.push_bind(params.limit);
        qb.push(" OFFSET ");
        qb.push_bind(params.offset);

        qb.build_query_as().fetch_all(&self.pool).await
    }

    // ── Catalog (autocomplete/dropdown) queries ────────────────────────────

    pub async fn occupations_autocomplete(
        &self,
        q: Option<&str>,
        limit: i64,
    ) -> Result<Vec<CatalogEntry>, sqlx::Error> {
        sqlx::query_as(
            r#"
            SELECT uri, label FROM occupations
            WHERE $1::text IS NULL OR label ILIKE '%' || $1 || '%'
            ORDER BY label LIMIT $2
            "#,
        )
        .bind(q)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
    }

    pub async fn skills_autocomplete(
        &self,
        q: Option<&str>,
        limit: i64,
    ) -> Result<Vec<CatalogEntry>, sqlx::Error> {
        sqlx::query_as(
            r#"
            SELECT uri, label FROM skills
            WHERE $1::text IS NULL OR label ILIKE '%' || $1 || '%'
            ORDER BY label LIMIT $2
            "#,
        )
        .bind(q)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
    }

    pub async fn occupation_groups(
        &self,
        q: Option<&str>,
        limit: i64,
    ) -> Result<Vec<GroupEntry>, sqlx::Error> {
        sqlx::query_as(
            r#"
            SELECT uri, COALESCE(label, code, uri) AS label, code FROM occupation_groups
            WHERE $1::text IS NULL OR label ILIKE '%' || $1 || '%'
            ORDER BY label LIMIT $2
            "#,
        )
        .bind(q)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
    }

    pub async fn skill_groups(
        &self,
        q: Option<&str>,
        limit: i64,
    ) -> Result<Vec<CatalogEntry>, sqlx::Error> {
        sqlx::query_as(
            r#"
            SELECT uri, COALESCE(label, uri) AS label FROM skill_groups
            WHERE $1::text IS NULL OR label ILIKE '%' || $1 || '%'
            ORDER BY label LIMIT $2
            "#,
        )
        .bind(q)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
    }

    pub async fn concept_schemes(&self) -> Result<Vec<CatalogEntry>, sqlx::Error> {
        sqlx::query_as(
            "SELECT uri, COALESCE(label, uri) AS label FROM concept_schemes ORDER BY label",
        )
        .fetch_all(&self.pool)
        .await
    }

    // ── Notes ──────────────────────────────────────────────────────────────

    pub async fn list_notes(
        &self,
        occupation_uri: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> Result<(i64, Vec<NoteRow>), sqlx::Error> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM notes WHERE $1::text IS NULL OR occupation_uri = $1",
        )
        .bind(occupation_uri)
        .fetch_one(&self.pool)
        .await?;

        let notes: Vec<NoteRow> = sqlx::query_as(
            r#"
            SELECT n.id, n.occupation_uri, o.label AS occupation_label,
                   n.text, n.created_at, n.updated_at
            FROM notes n
            JOIN occupations o ON o.uri = n.occupation_uri
            WHERE $1::text IS NULL OR n.occupation_uri = $1
            ORDER BY COALESCE(n.updated_at, n.created_at) DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(occupation_uri)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok((total, notes))
    }

    /// Creates or updates a note. `None` when the occupation does not exist.
    pub async fn upsert_note(
        &self,
        occupation_uri: &str,
        note_id: Option<Uuid>,
        text: &str,
    ) -> Result<Option<NoteRow>, sqlx::Error> {
        let occupation_label: Option<String> =
            sqlx::query_scalar("SELECT label FROM occupations WHERE uri = $1")
                .bind(occupation_uri)
                .fetch_optional(&self.pool)
                .await?;

        let Some(occupation_label) = occupation_label else {
            return Ok(None);
        };

        let id = note_id.unwrap_or_else(Uuid::new_v4);

        #[derive(FromRow)]
        struct UpsertedNote {
            id: Uuid,
            occupation_uri: String,
            text: String,
            created_at: chrono::DateTime<chrono::Utc>,
            updated_at: Option<chrono::DateTime<chrono::Utc>>,
        }

        let row: UpsertedNote = sqlx::query_as(
            r#"
            INSERT INTO notes (id, occupation_uri, text)
            VALUES ($1, $2, $3)
            ON CONFLICT (id) DO UPDATE SET text = EXCLUDED.text, updated_at = now()
            RETURNING id, occupation_uri, text, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(occupation_uri)
        .bind(text)
        .fetch_one(&self.pool)
        .await?;

        Ok(Some(NoteRow {
            id: row.id,
            occupation_uri: row.occupation_uri,
            occupation_label,
            text: row.text,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }))
    }

    pub async fn delete_note(&self, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM notes WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // ── Diagnostics ────────────────────────────────────────────────────────

    pub async fn node_counts(&self) -> Result<Vec<CountEntry>, sqlx::Error> {
        sqlx::query_as(
            r#"
            SELECT 'Occupation' AS name, COUNT(*) AS count FROM occupations
            UNION ALL SELECT 'Skill', COUNT(*) FROM skills
            UNION ALL SELECT 'OccupationGroup', COUNT(*) FROM occupation_groups
            UNION ALL SELECT 'SkillGroup', COUNT(*) FROM skill_groups
            UNION ALL SELECT 'ConceptScheme', COUNT(*) FROM concept_schemes
            UNION ALL SELECT 'Note', COUNT(*) FROM notes
            ORDER BY count DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await
    }

    pub async fn edge_counts(&self) -> Result<Vec<CountEntry>, sqlx::Error> {
        sqlx::query_as(
            r#"
            SELECT 'REQUIRES' AS name, COUNT(*) AS count FROM occupation_requires_skill
            UNION ALL SELECT 'IN_OCC_GROUP', COUNT(*) FROM occupation_in_group
            UNION ALL SELECT 'IN_SKILL_GROUP', COUNT(*) FROM skill_in_group
            UNION ALL SELECT 'IN_SCHEME', COUNT(*) FROM occupation_in_scheme
            UNION ALL SELECT 'SKILL_IN_SCHEME', COUNT(*) FROM skill_in_scheme
            UNION ALL SELECT 'BROADER', COUNT(*) FROM group_broader
            UNION ALL SELECT 'RELATED_SKILL', COUNT(*) FROM skill_related
            ORDER BY count DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await
    }
}

/// Treats `None` and whitespace-only strings as "no filter".
fn non_blank(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_blank_filters_empty_and_whitespace() {
        assert_eq!(non_blank(&None), None);
        assert_eq!(non_blank(&Some("".to_string())), None);
        assert_eq!(non_blank(&Some("   ".to_string())), None);
        assert_eq!(non_blank(&Some(" rust ".to_string())), Some("rust"));
    }
}
