use serde::{Deserialize, Serialize};
use sqlx::Type;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "sessionstatus", rename_all = "lowercase")]
pub(crate) enum SessionStatus {
    Created,
    Active,
    Resumed,
    Expired,
    Closed,
}

impl SessionStatus {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Active => "active",
            Self::Resumed => "resumed",
            Self::Expired => "expired",
            Self::Closed => "closed",
        }
    }

    pub(crate) fn is_terminal(self) -> bool {
        matches!(self, Self::Expired | Self::Closed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "problemsource", rename_all = "lowercase")]
pub(crate) enum ProblemSource {
    Text,
    Image,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "problemstatus", rename_all = "lowercase")]
pub(crate) enum ProblemStatus {
    Open,
    Solved,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "difficultylevel", rename_all = "lowercase")]
pub(crate) enum DifficultyLevel {
    Unknown,
    Easy,
    Medium,
    Hard,
}

impl DifficultyLevel {
    /// Lenient parse for model output; anything unrecognized is `Unknown`.
    pub(crate) fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "easy" | "beginner" | "elementary" => Self::Easy,
            "medium" | "intermediate" | "moderate" => Self::Medium,
            "hard" | "advanced" | "difficult" => Self::Hard,
            _ => Self::Unknown,
        }
    }
}
