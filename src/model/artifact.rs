use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Files derived from a student's enrollment: biometric templates and photos.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ArtifactKind {
    FaceTemplate,
    Photo,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct StudentArtifact {
    pub id: i64,
    pub student_id: String,
    pub kind: ArtifactKind,
    /// Relative to `Config::artifact_dir`.
    pub path: String,
}
