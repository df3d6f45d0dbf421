// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! The launch context handed to page renders.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use utoipa::ToSchema;

use super::{error::LaunchError, roles::LtiRole};

/// A verified launch body, an empty object, or an `{ "error": ... }` envelope.
///
/// No schema is enforced beyond "JSON object". Values are built fresh for every
/// request and never mutated after being handed out.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
#[schema(value_type = Object)]
pub struct LaunchContext(Map<String, Value>);

impl LaunchContext {
    /// The empty context `{}`.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_fields(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    /// Error-shaped context for a rejected launch or unreadable cookie.
    pub fn from_error(error: &LaunchError) -> Self {
        let mut fields = Map::new();
        fields.insert("error".to_string(), error.descriptor());
        Self(fields)
    }

    /// Interpret an arbitrary JSON value as a context.
    ///
    /// `null` maps to `{}`; any other non-object is malformed.
    pub fn from_value(value: Value) -> Result<Self, LaunchError> {
        match value {
            Value::Object(fields) => Ok(Self(fields)),
            Value::Null => Ok(Self::empty()),
            other => Err(LaunchError::MalformedContext(format!(
                "expected a JSON object, found {}",
                json_kind(&other)
            ))),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn is_error(&self) -> bool {
        self.0.contains_key("error")
    }

    /// The error descriptor, if this is an error-shaped context.
    pub fn error(&self) -> Option<&Value> {
        self.0.get("error")
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// String field lookup. Non-string values return `None`.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    pub fn user_id(&self) -> Option<&str> {
        self.get_str("user_id")
    }

    pub fn resource_link_id(&self) -> Option<&str> {
        self.get_str("resource_link_id")
    }

    pub fn context_id(&self) -> Option<&str> {
        self.get_str("context_id")
    }

    /// Roles parsed from the `roles` launch field.
    pub fn roles(&self) -> Vec<LtiRole> {
        self.get_str("roles").map(LtiRole::parse_list).unwrap_or_default()
    }

    pub fn has_role(&self, role: LtiRole) -> bool {
        self.roles().contains(&role)
    }

    pub fn is_instructor(&self) -> bool {
        self.has_role(LtiRole::Instructor)
    }

    pub fn is_learner(&self) -> bool {
        self.has_role(LtiRole::Learner)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }
}

impl From<LaunchError> for LaunchContext {
    fn from(error: LaunchError) -> Self {
        Self::from_error(&error)
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
