//! Permission strings and the set a caller holds.
//!
//! Permissions are `resource.action` strings. A holder may also carry the
//! wildcard `*` (everything) or `resource.*` (every action on one resource).

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Permission string catalogue. Seeded into the `permissions` table.
pub mod permissions {
    pub const ALL: &str = "*";

    pub const ORGANIZATIONS_ALL: &str = "organizations.*";
    pub const ROLES_ALL: &str = "roles.*";
    pub const USERS_ALL: &str = "users.*";
    pub const SYSTEM_VARIABLES_ALL: &str = "system_variables.*";

    pub const ORGANIZATIONS_READ: &str = "organizations.read";
    pub const ORGANIZATIONS_CREATE: &str = "organizations.create";
    pub const ORGANIZATIONS_UPDATE: &str = "organizations.update";
    pub const ORGANIZATIONS_DELETE: &str = "organizations.delete";

    pub const ROLES_READ: &str = "roles.read";
    pub const ROLES_CREATE: &str = "roles.create";
    pub const ROLES_UPDATE: &str = "roles.update";
    pub const ROLES_DELETE: &str = "roles.delete";

    pub const USERS_READ: &str = "users.read";
    pub const USERS_CREATE: &str = "users.create";
    pub const USERS_UPDATE: &str = "users.update";
    pub const USERS_DELETE: &str = "users.delete";

    pub const SYSTEM_VARIABLES_READ: &str = "system_variables.read";
    pub const SYSTEM_VARIABLES_CREATE: &str = "system_variables.create";
    pub const SYSTEM_VARIABLES_UPDATE: &str = "system_variables.update";
    pub const SYSTEM_VARIABLES_DELETE: &str = "system_variables.delete";
    pub const SYSTEM_VARIABLES_SET_VALUE: &str = "system_variables.set_value";
    pub const SYSTEM_VARIABLES_CONFIGURE: &str = "system_variables.configure";
    pub const SYSTEM_VARIABLES_GENERATE: &str = "system_variables.generate";

    /// Every grantable permission with its description.
    pub const CATALOGUE: &[(&str, &str)] = &[
        (ALL, "Full access to every resource"),
        (ORGANIZATIONS_ALL, "Every action on organizations"),
        (ROLES_ALL, "Every action on roles"),
        (USERS_ALL, "Every action on users"),
        (SYSTEM_VARIABLES_ALL, "Every action on system variables"),
        (ORGANIZATIONS_READ, "View organizations"),
        (ORGANIZATIONS_CREATE, "Create organizations"),
        (ORGANIZATIONS_UPDATE, "Update organizations"),
        (ORGANIZATIONS_DELETE, "Delete organizations"),
        (ROLES_READ, "View roles and permissions"),
        (ROLES_CREATE, "Create roles"),
        (ROLES_UPDATE, "Update roles and their permissions"),
        (ROLES_DELETE, "Delete roles"),
        (USERS_READ, "View users"),
        (USERS_CREATE, "Create users"),
        (USERS_UPDATE, "Update users and their roles"),
        (USERS_DELETE, "Delete and restore users"),
        (SYSTEM_VARIABLES_READ, "View system variables"),
        (SYSTEM_VARIABLES_CREATE, "Create system variables and groups"),
        (SYSTEM_VARIABLES_UPDATE, "Update system variables and groups"),
        (SYSTEM_VARIABLES_DELETE, "Delete system variables and groups"),
        (SYSTEM_VARIABLES_SET_VALUE, "Set system variable values"),
        (SYSTEM_VARIABLES_CONFIGURE, "Configure incremental numbering"),
        (SYSTEM_VARIABLES_GENERATE, "Generate incremental codes"),
    ];

    pub fn is_known(code: &str) -> bool {
        CATALOGUE.iter().any(|(known, _)| *known == code)
    }
}

/// A row of the permission catalogue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Permission {
    pub id: Uuid,
    pub code: String,
    pub description: Option<String>,
}

/// The effective permissions of a user, collected from all of their roles.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionSet(HashSet<String>);

impl PermissionSet {
    pub fn new<I, S>(codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(codes.into_iter().map(Into::into).collect())
    }

    pub fn allows(&self, required: &str) -> bool {
        if self.0.contains(permissions::ALL) || self.0.contains(required) {
            return true;
        }
        match required.split_once('.') {
            Some((resource, _)) => self.0.contains(&format!("{}.*", resource)),
            None => false,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Codes in stable order, for responses and cache entries.
    pub fn to_sorted_vec(&self) -> Vec<String> {
        let mut codes: Vec<String> = self.0.iter().cloned().collect();
        codes.sort();
        codes
    }
}

impl FromIterator<String> for PermissionSet {
    fn from_iter<T: IntoIterator<Item = String>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::permissions::*;
    use super::*;

    #[test]
    fn exact_match() {
        let set = PermissionSet::new([USERS_READ]);
        assert!(set.allows(USERS_READ));
        assert!(!set.allows(USERS_CREATE));
    }

    #[test]
    fn global_wildcard_allows_everything() {
        let set = PermissionSet::new([ALL]);
        for (code, _) in CATALOGUE {
            assert!(set.allows(code));
        }
    }

    #[test]
    fn resource_wildcard_is_scoped_to_resource() {
        let set = PermissionSet::new(["system_variables.*"]);
        assert!(set.allows(SYSTEM_VARIABLES_GENERATE));
        assert!(set.allows(SYSTEM_VARIABLES_READ));
        assert!(!set.allows(ROLES_READ));
    }

    #[test]
    fn empty_set_allows_nothing() {
        let set = PermissionSet::default();
        assert!(set.is_empty());
        assert!(!set.allows(ORGANIZATIONS_READ));
    }

    #[test]
    fn catalogue_codes_are_unique_and_known() {
        let unique: HashSet<_> = CATALOGUE.iter().map(|(code, _)| *code).collect();
        assert_eq!(unique.len(), CATALOGUE.len());
        assert!(is_known(USERS_DELETE));
        assert!(!is_known("users.destroy"));
    }

    #[test]
    fn resource_wildcards_are_grantable() {
        for code in [ORGANIZATIONS_ALL, ROLES_ALL, USERS_ALL, SYSTEM_VARIABLES_ALL] {
            assert!(is_known(code), "{code}");
        }
        assert!(!is_known("payroll.*"));
        let set = PermissionSet::new([USERS_ALL]);
        assert!(set.allows(USERS_DELETE));
        assert!(!set.allows(ROLES_DELETE));
    }

    #[test]
    fn serializes_as_plain_list() {
        let set = PermissionSet::new([ROLES_READ]);
        assert_eq!(serde_json::to_string(&set).unwrap(), r#"["roles.read"]"#);
    }
}
