//! Catalog record types delivered by the role and client sources.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A role as stored in the role catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleRecord {
    /// Role identifier; may end in `*` to match any `assume:` scope
    /// sharing its stem.
    pub role_id: String,

    /// Scopes granted directly by this role.
    pub scopes: Vec<String>,

    /// Free-form operator description; carried, never interpreted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl RoleRecord {
    pub fn new(role_id: impl Into<String>, scopes: Vec<String>) -> Self {
        Self {
            role_id: role_id.into(),
            scopes,
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// A client as stored in the client catalog.
///
/// Every client implicitly holds the role `client-id:<clientId>`; its
/// effective scopes are its declared scopes expanded together with that
/// identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientRecord {
    pub client_id: String,
    pub access_token: String,
    pub expires: DateTime<Utc>,
    #[serde(default)]
    pub disabled: bool,

    /// Scopes declared on the client, prior to expansion.
    pub scopes: Vec<String>,

    pub last_date_used: DateTime<Utc>,

    /// Free-form operator description; carried, never interpreted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ClientRecord {
    /// The identity scope by which this client assumes its own role.
    pub fn identity_scope(&self) -> String {
        format!("assume:client-id:{}", self.client_id)
    }
}
