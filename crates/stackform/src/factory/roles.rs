//! Execution roles shared by the functions of one batch.
use crate::{
    aws::iam::{Role, BASIC_EXECUTION_POLICY, LAMBDA_SERVICE_PRINCIPAL, VPC_ACCESS_POLICY},
    stack::Declaration,
    utils::{logical_id_of, sha256_bytes},
    Expr,
};

#[derive(Clone, Debug)]
pub struct RoleCacheEntry {
    pub role_name: String,
    pub logical_id: String,
    pub role: Role,
}

/// Declares one role per distinct role name, in first-reference order.
#[derive(Clone, Debug, Default)]
pub struct RoleCache {
    entries: Vec<RoleCacheEntry>,
}

impl RoleCache {
    /// A logical id for the role name that no other cached role uses.
    fn unique_logical_id(&self, role_name: &str) -> String {
        let sanitized = logical_id_of(role_name);
        let taken = |id: &str| self.entries.iter().any(|e| e.logical_id == id);
        if !sanitized.is_empty() && !taken(&sanitized) {
            return sanitized;
        }
        let base = if sanitized.is_empty() { "Role" } else { sanitized.as_str() };
        let digest = sha256_bytes(role_name);
        format!("{base}{}", &digest[..8])
    }

    fn entry_mut(&mut self, role_name: &str) -> &mut RoleCacheEntry {
        let index = match self.entries.iter().position(|e| e.role_name == role_name) {
            Some(index) => index,
            None => {
                let logical_id = self.unique_logical_id(role_name);
                log::debug!("declaring role {logical_id} for '{role_name}'");
                let mut role = Role::assumable_by(LAMBDA_SERVICE_PRINCIPAL);
                role.attach_managed_policy(BASIC_EXECUTION_POLICY);
                self.entries.push(RoleCacheEntry {
                    role_name: role_name.to_owned(),
                    logical_id,
                    role,
                });
                self.entries.len() - 1
            }
        };
        &mut self.entries[index]
    }

    /// Returns the ARN of the role with the given name, declaring it on
    /// first use. The VPC access policy is attached when `needs_vpc`.
    pub fn resolve(&mut self, role_name: &str, needs_vpc: bool) -> Expr {
        let entry = self.entry_mut(role_name);
        if needs_vpc && entry.role.attach_managed_policy(VPC_ACCESS_POLICY) {
            log::trace!("granted vpc access to role {}", entry.logical_id);
        }
        Expr::get_att(&entry.logical_id, "Arn")
    }

    /// Appends statements to the inline policy of the named role.
    pub fn add_statements(&mut self, role_name: &str, statements: impl IntoIterator<Item = Expr>) {
        let entry = self.entry_mut(role_name);
        let policy_name = format!("{}Policy", entry.logical_id);
        entry.role.add_statements(policy_name, statements);
    }

    pub fn get(&self, role_name: &str) -> Option<&RoleCacheEntry> {
        self.entries.iter().find(|e| e.role_name == role_name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn into_declarations(self) -> Vec<Declaration> {
        self.entries
            .into_iter()
            .map(|e| Declaration::new(e.logical_id, e.role))
            .collect()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn roles_are_shared_by_name() {
        let mut cache = RoleCache::default();
        let a = cache.resolve("shared-role", false);
        let b = cache.resolve("shared-role", true);
        let c = cache.resolve("other-role", false);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(2, cache.len());
        assert_eq!(Expr::get_att("sharedrole", "Arn"), a);
    }

    #[test]
    fn vpc_policy_attached_once_when_needed() {
        let mut cache = RoleCache::default();
        cache.resolve("plain", false);
        cache.resolve("networked", true);
        cache.resolve("networked", true);
        assert!(!cache.get("plain").unwrap().role.has_managed_policy(VPC_ACCESS_POLICY));
        let networked = &cache.get("networked").unwrap().role;
        assert!(networked.has_managed_policy(VPC_ACCESS_POLICY));
        assert_eq!(2, networked.managed_policy_arns.len());
    }

    #[test]
    fn names_differing_in_punctuation_get_distinct_ids() {
        let mut cache = RoleCache::default();
        let dashed = cache.resolve("app-role", false);
        let underscored = cache.resolve("app_role", false);
        assert_eq!(Expr::get_att("approle", "Arn"), dashed);
        let suffix = &sha256_bytes("app_role")[..8];
        assert_eq!(Expr::get_att(format!("approle{suffix}"), "Arn"), underscored);
        assert_eq!(2, cache.len());
    }

    #[test]
    fn names_without_alphanumerics_get_a_prefix() {
        let mut cache = RoleCache::default();
        cache.resolve("---", false);
        let logical_id = &cache.get("---").unwrap().logical_id;
        assert!(logical_id.starts_with("Role"));
        assert_eq!(12, logical_id.len());
    }
}
