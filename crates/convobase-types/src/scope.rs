use serde::{Deserialize, Serialize};

/// Tenancy coordinates attached to users and files. Any component may be
/// absent; a `system_admin` typically carries none.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScopeIds {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department_id: Option<String>,
}

impl ScopeIds {
    pub fn new(
        organization_id: Option<String>,
        company_id: Option<String>,
        department_id: Option<String>,
    ) -> Self {
        Self {
            organization_id,
            company_id,
            department_id,
        }
    }
}
