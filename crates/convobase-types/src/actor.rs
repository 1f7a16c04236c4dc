use serde::{Deserialize, Serialize};

use crate::role::Role;
use crate::scope::ScopeIds;

/// The authenticated caller every policy decision is phrased against.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Actor {
    pub user_id: String,
    pub role: Role,
    #[serde(flatten)]
    pub scopes: ScopeIds,
}

impl Actor {
    pub fn new(user_id: impl Into<String>, role: Role, scopes: ScopeIds) -> Self {
        Self {
            user_id: user_id.into(),
            role,
            scopes,
        }
    }

    /// Callers that supplied no identity at all. Sees only what is public
    /// to everyone (system-visible files), owns nothing.
    pub fn anonymous() -> Self {
        Self {
            user_id: String::new(),
            role: Role::User,
            scopes: ScopeIds::default(),
        }
    }
}
