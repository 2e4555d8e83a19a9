//! Static role resolution: every user holds the default role, and a fixed table
//! grants extra roles to particular provider subjects.

use std::collections::{BTreeSet, HashMap};

use service::config::Config;

#[derive(Debug, Clone, PartialEq)]
pub struct RoleAssignment {
    default_role: String,
    roles_by_subject: HashMap<String, BTreeSet<String>>,
}

impl RoleAssignment {
    pub fn new<I, R>(default_role: impl Into<String>, roles_by_subject: I) -> Self
    where
        I: IntoIterator<Item = (String, R)>,
        R: IntoIterator<Item = String>,
    {
        let mut table: HashMap<String, BTreeSet<String>> = HashMap::new();
        // Repeated subjects accumulate
        for (subject, roles) in roles_by_subject {
            table.entry(subject).or_default().extend(roles);
        }

        Self {
            default_role: default_role.into(),
            roles_by_subject: table,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.default_role(),
            config
                .subject_roles()
                .iter()
                .map(|entry| (entry.subject.clone(), entry.roles.clone())),
        )
    }

    pub fn default_role(&self) -> &str {
        &self.default_role
    }

    /// Roles for a provider subject id: the default role plus any configured extras.
    pub fn roles_for(&self, subject_id: &str) -> BTreeSet<String> {
        let mut roles = BTreeSet::from([self.default_role.clone()]);
        if let Some(extra) = self.roles_by_subject.get(subject_id) {
            roles.extend(extra.iter().cloned());
        }
        roles
    }
}
