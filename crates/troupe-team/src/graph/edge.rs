use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::state::ExecutionState;

/// Suffix appended to a member name to form its reviewer node id.
pub const REVIEWER_SUFFIX: &str = "_reviewer";

/// Reviewer node id for a member.
pub fn reviewer_node(member: &str) -> String {
    format!("{member}{REVIEWER_SUFFIX}")
}

/// The member a reviewer node reviews, or `None` if `node` is not a
/// reviewer node.
pub fn reviewed_member(node: &str) -> Option<&str> {
    node.strip_suffix(REVIEWER_SUFFIX)
}

/// Where an edge leads: another node, or the end of the workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Target {
    Node(String),
    Terminal,
}

impl Target {
    pub fn node(id: impl Into<String>) -> Self {
        Self::Node(id.into())
    }
}

impl std::fmt::Display for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Node(id) => write!(f, "{id}"),
            Self::Terminal => write!(f, "__end__"),
        }
    }
}

/// Predicate evaluated at traversal time against `(state, member)`.
///
/// Pure with respect to the state it is given; the executor evaluates it
/// at the moment the edge is crossed, never at build time.
pub type EdgePredicate = Arc<dyn Fn(&ExecutionState, &str) -> bool + Send + Sync>;

/// Outgoing edge of a graph node. Every node except the terminal sink
/// has exactly one.
#[derive(Clone)]
pub enum Edge {
    Unconditional {
        to: Target,
    },
    Conditional {
        predicate: EdgePredicate,
        on_true: Target,
        on_false: Target,
    },
}

impl Edge {
    /// Create an unconditional edge.
    pub fn to(target: Target) -> Self {
        Self::Unconditional { to: target }
    }

    /// Create a conditional edge with a custom predicate.
    pub fn conditional(predicate: EdgePredicate, on_true: Target, on_false: Target) -> Self {
        Self::Conditional {
            predicate,
            on_true,
            on_false,
        }
    }

    /// The review gate: advance to `on_true` once the member is marked
    /// finished, detour to `on_false` (the reviewer) otherwise.
    pub fn review_gate(on_true: Target, on_false: Target) -> Self {
        Self::Conditional {
            predicate: Arc::new(|state, member| state.is_finished(member)),
            on_true,
            on_false,
        }
    }
}

impl std::fmt::Debug for Edge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unconditional { to } => f.debug_struct("Unconditional").field("to", to).finish(),
            Self::Conditional {
                on_true, on_false, ..
            } => f
                .debug_struct("Conditional")
                .field("on_true", on_true)
                .field("on_false", on_false)
                .finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reviewer_node_names() {
        assert_eq!(reviewer_node("writer"), "writer_reviewer");
        assert_eq!(reviewed_member("writer_reviewer"), Some("writer"));
        assert_eq!(reviewed_member("writer"), None);
    }

    #[test]
    fn test_target_display() {
        assert_eq!(Target::node("a").to_string(), "a");
        assert_eq!(Target::Terminal.to_string(), "__end__");
    }

    #[test]
    fn test_review_gate_tracks_finished_set() {
        let edge = Edge::review_gate(Target::node("next"), Target::node("writer_reviewer"));
        let mut state = ExecutionState::new("writer");

        let Edge::Conditional { predicate, .. } = &edge else {
            panic!("expected conditional edge");
        };
        assert!(!predicate(&state, "writer"));

        state.mark_finished("writer");
        assert!(predicate(&state, "writer"));
    }

    #[test]
    fn test_custom_predicate() {
        let edge = Edge::conditional(
            Arc::new(|_, member| member == "always"),
            Target::Terminal,
            Target::node("retry"),
        );
        let state = ExecutionState::new("always");
        let Edge::Conditional { predicate, .. } = &edge else {
            panic!("expected conditional edge");
        };
        assert!(predicate(&state, "always"));
        assert!(!predicate(&state, "other"));
    }
}
