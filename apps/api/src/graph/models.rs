use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SkillRow {
    pub uri: String,
    pub label: String,
    pub description: Option<String>,
    pub skill_type: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct OccupationRow {
    pub uri: String,
    pub label: String,
    pub description: Option<String>,
    pub isco_code: Option<String>,
}

/// One edge of the occupation → skill "requires" relationship.
/// `relation_type` is the essential/optional classification carried on the
/// edge, preserved through skill-gap analysis for presentation.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RequiredSkill {
    pub uri: String,
    pub label: String,
    pub skill_type: Option<String>,
    pub relation_type: String,
}

/// A fully enriched occupation candidate: node attributes plus the
/// relationship data the engine needs for skill-gap analysis and display.
#[derive(Debug, Clone, Serialize)]
pub struct OccupationRecord {
    pub uri: String,
    pub label: String,
    pub description: Option<String>,
    pub isco_code: Option<String>,
    pub required_skills: Vec<RequiredSkill>,
    pub groups: Vec<String>,
    pub schemes: Vec<String>,
}

/// Minimal `{uri, label}` pair for autocomplete listings.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CatalogEntry {
    pub uri: String,
    pub label: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct GroupEntry {
    pub uri: String,
    pub label: String,
    pub code: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct NoteRow {
    pub id: Uuid,
    pub occupation_uri: String,
    pub occupation_label: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// One `(name, count)` diagnostics row for node or edge tallies.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct CountEntry {
    pub name: String,
    pub count: i64,
}
