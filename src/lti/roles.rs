// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! LTI membership roles.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Context roles carried in the `roles` launch parameter.
///
/// The parameter is a comma-separated list of either short names
/// (`Instructor`) or LIS URNs (`urn:lti:role:ims/lis/Instructor/TeachingAssistant`).
/// Sub-roles after the first `/` of the role name are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum LtiRole {
    Learner,
    Instructor,
    ContentDeveloper,
    Member,
    Manager,
    Mentor,
    Administrator,
    TeachingAssistant,
}

const URN_PREFIXES: [&str; 3] = [
    "urn:lti:role:ims/lis/",
    "urn:lti:instrole:ims/lis/",
    "urn:lti:sysrole:ims/lis/",
];

impl LtiRole {
    /// Parse a single role entry (case-insensitive).
    pub fn from_str(s: &str) -> Option<LtiRole> {
        let trimmed = s.trim();
        let name = URN_PREFIXES
            .iter()
            .find_map(|prefix| strip_prefix_ignore_case(trimmed, prefix))
            .unwrap_or(trimmed);
        let base = name.split('/').next().unwrap_or(name);

        match base.to_lowercase().as_str() {
            "learner" | "student" => Some(LtiRole::Learner),
            "instructor" | "faculty" | "staff" => Some(LtiRole::Instructor),
            "contentdeveloper" => Some(LtiRole::ContentDeveloper),
            "member" => Some(LtiRole::Member),
            "manager" => Some(LtiRole::Manager),
            "mentor" => Some(LtiRole::Mentor),
            "administrator" => Some(LtiRole::Administrator),
            "teachingassistant" => Some(LtiRole::TeachingAssistant),
            _ => None,
        }
    }

    /// Parse the full `roles` parameter, dropping unknown entries and duplicates.
    pub fn parse_list(roles: &str) -> Vec<LtiRole> {
        let mut parsed = Vec::new();
        for role in roles.split(',').filter_map(LtiRole::from_str) {
            if !parsed.contains(&role) {
                parsed.push(role);
            }
        }
        parsed
    }

    /// Roles that manage course content rather than consume it.
    pub fn is_staff(&self) -> bool {
        matches!(
            self,
            LtiRole::Instructor
                | LtiRole::ContentDeveloper
                | LtiRole::Administrator
                | LtiRole::TeachingAssistant
        )
    }
}

fn strip_prefix_ignore_case<'a>(s: &'a str, prefix: &str) -> Option<&'a str> {
    let head = s.get(..prefix.len())?;
    if head.eq_ignore_ascii_case(prefix) {
        s.get(prefix.len()..)
    } else {
        None
    }
}

impl std::fmt::Display for LtiRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LtiRole::Learner => write!(f, "Learner"),
            LtiRole::Instructor => write!(f, "Instructor"),
            LtiRole::ContentDeveloper => write!(f, "ContentDeveloper"),
            LtiRole::Member => write!(f, "Member"),
            LtiRole::Manager => write!(f, "Manager"),
            LtiRole::Mentor => write!(f, "Mentor"),
            LtiRole::Administrator => write!(f, "Administrator"),
            LtiRole::TeachingAssistant => write!(f, "TeachingAssistant"),
        }
    }
}
