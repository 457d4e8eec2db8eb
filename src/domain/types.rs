//! Shared domain enumerations aligned with persisted database enums.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "post_status", rename_all = "snake_case")]
pub enum PostStatus {
    Draft,
    Published,
}

impl PostStatus {
    pub fn from_published(published: bool) -> Self {
        if published {
            PostStatus::Published
        } else {
            PostStatus::Draft
        }
    }

    pub fn is_published(self) -> bool {
        matches!(self, PostStatus::Published)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PostStatus::Draft => "DRAFT",
            PostStatus::Published => "PUBLISHED",
        }
    }
}

impl fmt::Display for PostStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_follows_publication_flag() {
        assert_eq!(PostStatus::from_published(true), PostStatus::Published);
        assert_eq!(PostStatus::from_published(false), PostStatus::Draft);
        assert!(!PostStatus::Draft.is_published());
    }

    #[test]
    fn display_matches_wire_form() {
        let wire = serde_json::to_string(&PostStatus::Published).expect("serialize");
        assert_eq!(wire, format!("\"{}\"", PostStatus::Published));
    }
}
