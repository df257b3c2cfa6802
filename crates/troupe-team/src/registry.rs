use std::collections::HashMap;

use troupe_core::config::AgentSpec;
use troupe_core::error::{ConfigError, Result};

/// A team member resolved against the agent registry.
///
/// Immutable once resolved; the builder and executor never perform
/// name-based registry lookups mid-run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub name: String,
    pub needs_review: bool,
}

/// Resolve each member name to its static capability record.
///
/// Pure and O(n) over `names`; fails with `ConfigError::UnknownMember`
/// on the first name without a registry entry.
pub fn resolve(names: &[String], registry: &HashMap<String, AgentSpec>) -> Result<Vec<Member>> {
    names
        .iter()
        .map(|name| {
            let spec = registry
                .get(name)
                .ok_or_else(|| ConfigError::UnknownMember(name.clone()))?;
            Ok(Member {
                name: name.clone(),
                needs_review: spec.needs_review,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use troupe_core::TroupeError;

    fn registry() -> HashMap<String, AgentSpec> {
        let mut map = HashMap::new();
        map.insert(
            "writer".to_string(),
            AgentSpec {
                needs_review: true,
                ..Default::default()
            },
        );
        map.insert("editor".to_string(), AgentSpec::default());
        map
    }

    #[test]
    fn test_resolve_known_members() {
        let names = vec!["writer".to_string(), "editor".to_string()];
        let members = resolve(&names, &registry()).unwrap();
        assert_eq!(members.len(), 2);
        assert!(members[0].needs_review);
        assert!(!members[1].needs_review);
    }

    #[test]
    fn test_resolve_unknown_member() {
        let names = vec!["writer".to_string(), "ghost".to_string()];
        let err = resolve(&names, &registry()).unwrap_err();
        assert!(matches!(
            err,
            TroupeError::Config(ConfigError::UnknownMember(name)) if name == "ghost"
        ));
    }

    #[test]
    fn test_resolve_empty_is_empty() {
        let members = resolve(&[], &registry()).unwrap();
        assert!(members.is_empty());
    }
}
