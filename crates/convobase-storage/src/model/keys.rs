use convobase_types::prelude::{ScopeIds, Timestamp, Visibility};

pub const SK_META: &str = "META";
pub const ATTR_ENTITY: &str = "entityType";

pub const ENTITY_USER: &str = "USER";
pub const ENTITY_FILE: &str = "FILE";
pub const ENTITY_CONVERSATION: &str = "CONVERSATION";
pub const ENTITY_MESSAGE: &str = "MESSAGE";

pub const USER_PREFIX: &str = "USER#";
pub const FILE_PREFIX: &str = "FILE#";
pub const CONV_PREFIX: &str = "CONV#";
pub const MSG_PREFIX: &str = "MSG#";

/// Fixed partition under GSI1 that collects every user record.
pub const USERS_PARTITION: &str = "USERS";
/// GSI2 partition that collects every system-visible file.
pub const VISIBILITY_SYSTEM_PARTITION: &str = "VISIBILITY#system";

pub fn user_pk(user_id: &str) -> String {
    format!("{USER_PREFIX}{user_id}")
}

pub fn file_pk(file_id: &str) -> String {
    format!("{FILE_PREFIX}{file_id}")
}

pub fn conversation_pk(conversation_id: &str) -> String {
    format!("{CONV_PREFIX}{conversation_id}")
}

pub fn user_gsi1_sk(created_at: &Timestamp) -> String {
    format!("{USER_PREFIX}{}", created_at.iso8601())
}

pub fn file_gsi1_sk(uploaded_at: &Timestamp) -> String {
    format!("{FILE_PREFIX}{}", uploaded_at.iso8601())
}

pub fn conversation_gsi1_sk(updated_at: &Timestamp) -> String {
    format!("{CONV_PREFIX}{}", updated_at.iso8601())
}

pub fn message_sk(created_at: &Timestamp, message_id: &str) -> String {
    format!("{MSG_PREFIX}{}#{message_id}", created_at.iso8601())
}

pub fn owner_partition(user_id: &str) -> String {
    format!("{USER_PREFIX}{user_id}")
}

pub fn org_partition(organization_id: &str) -> String {
    format!("ORG#{organization_id}")
}

pub fn company_partition(company_id: &str) -> String {
    format!("COMPANY#{company_id}")
}

/// GSI2 projects a file only for visibilities broad enough to be listed by
/// other tenants in the same scope. Private and department files stay off
/// the index and are reached through the owner path.
pub fn file_gsi2_partition(visibility: Visibility, scopes: &ScopeIds) -> Option<String> {
    match visibility {
        Visibility::System => Some(VISIBILITY_SYSTEM_PARTITION.to_string()),
        Visibility::Organization => scopes.organization_id.as_deref().map(org_partition),
        Visibility::Company => scopes.company_id.as_deref().map(company_partition),
        Visibility::Private | Visibility::Department => None,
    }
}
