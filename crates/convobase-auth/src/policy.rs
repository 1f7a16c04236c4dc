use convobase_storage::prelude::{FileRecord, UserRecord};
use convobase_types::prelude::{Actor, Role, ScopeIds, Visibility};

use crate::errors::AuthError;

/// The role → allowed-visibility matrix. Files may be created or relabeled
/// only to a visibility in the actor's set.
pub fn allowed_visibilities(role: Role) -> &'static [Visibility] {
    match role {
        Role::SystemAdmin => &[
            Visibility::Private,
            Visibility::Department,
            Visibility::Company,
            Visibility::Organization,
            Visibility::System,
        ],
        Role::OrgAdmin => &[
            Visibility::Private,
            Visibility::Department,
            Visibility::Company,
            Visibility::Organization,
        ],
        Role::CompanyAdmin => &[
            Visibility::Private,
            Visibility::Department,
            Visibility::Company,
        ],
        Role::User => &[Visibility::Private],
    }
}

pub fn visibility_allowed(role: Role, visibility: Visibility) -> bool {
    allowed_visibilities(role).contains(&visibility)
}

/// The access predicate consulted by every cross-tenant file read and write.
pub fn can_access_file(file: &FileRecord, actor: &Actor) -> bool {
    if !actor.user_id.is_empty() && file.user_id == actor.user_id {
        return true;
    }
    if actor.role == Role::SystemAdmin {
        return true;
    }
    let same = |a: &Option<String>, b: &Option<String>| -> bool {
        matches!((a, b), (Some(x), Some(y)) if x == y)
    };
    match file.visibility {
        Visibility::System => true,
        Visibility::Organization => same(
            &file.scopes.organization_id,
            &actor.scopes.organization_id,
        ),
        Visibility::Company => same(&file.scopes.company_id, &actor.scopes.company_id),
        Visibility::Department => {
            same(&file.scopes.company_id, &actor.scopes.company_id)
                && same(&file.scopes.department_id, &actor.scopes.department_id)
        }
        Visibility::Private => false,
    }
}

/// Admin user-creation rules. Role violations and scope violations report
/// distinctly so callers can surface the right denial.
pub fn can_create_user(actor: &Actor, new_role: Role, new_scopes: &ScopeIds) -> Result<(), AuthError> {
    require_enclosing_scopes(new_role, new_scopes)?;

    let same = |a: &Option<String>, b: &Option<String>| -> bool {
        matches!((a, b), (Some(x), Some(y)) if x == y)
    };

    match actor.role {
        Role::SystemAdmin => Ok(()),
        Role::OrgAdmin => {
            if !matches!(new_role, Role::CompanyAdmin | Role::User) {
                return Err(AuthError::forbidden_role(&format!(
                    "org_admin cannot create {}",
                    new_role.as_str()
                )));
            }
            if !same(&new_scopes.organization_id, &actor.scopes.organization_id) {
                return Err(AuthError::forbidden_scope(
                    "org_admin may only create users within their organization",
                ));
            }
            Ok(())
        }
        Role::CompanyAdmin => {
            if new_role != Role::User {
                return Err(AuthError::forbidden_role(&format!(
                    "company_admin cannot create {}",
                    new_role.as_str()
                )));
            }
            if !same(&new_scopes.company_id, &actor.scopes.company_id) {
                return Err(AuthError::forbidden_scope(
                    "company_admin may only create users within their company",
                ));
            }
            if new_scopes.organization_id.is_some()
                && !same(&new_scopes.organization_id, &actor.scopes.organization_id)
            {
                return Err(AuthError::forbidden_scope(
                    "company_admin may not assign a foreign organization",
                ));
            }
            Ok(())
        }
        Role::User => Err(AuthError::forbidden_role("users cannot create users")),
    }
}

/// Every non-system user carries the scope identifiers that enclose their
/// role: an org_admin needs an organization, a company_admin both.
fn require_enclosing_scopes(role: Role, scopes: &ScopeIds) -> Result<(), AuthError> {
    let missing = match role {
        Role::SystemAdmin | Role::User => false,
        Role::OrgAdmin => scopes.organization_id.is_none(),
        Role::CompanyAdmin => scopes.organization_id.is_none() || scopes.company_id.is_none(),
    };
    if missing {
        return Err(AuthError::validation(
            "Missing scope identifiers for the requested role.",
        ));
    }
    Ok(())
}

/// Scope filter applied to `/admin/users` listings.
pub fn can_see_user(actor: &Actor, user: &UserRecord) -> bool {
    let same = |a: &Option<String>, b: &Option<String>| -> bool {
        matches!((a, b), (Some(x), Some(y)) if x == y)
    };
    match actor.role {
        Role::SystemAdmin => true,
        Role::OrgAdmin => same(&user.scopes.organization_id, &actor.scopes.organization_id),
        Role::CompanyAdmin => same(&user.scopes.company_id, &actor.scopes.company_id),
        Role::User => false,
    }
}
