use std::collections::{BTreeMap, HashMap, HashSet};

use tracing::debug;

use troupe_core::config::GraphConfig;
use troupe_core::error::{ConfigError, Result};

use super::edge::{reviewer_node, Edge, Target};
use crate::registry::Member;

/// What a graph node stands for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Member { needs_review: bool },
    Reviewer { of: String },
}

/// Compiled workflow graph: a node table, an entry node, an effective
/// finish node, and one outgoing edge per non-sink node.
///
/// Immutable after construction and safe to share read-only across
/// concurrent runs of the same team configuration.
#[derive(Debug)]
pub struct WorkflowGraph {
    nodes: BTreeMap<String, NodeKind>,
    entry: String,
    finish: String,
    edges: HashMap<String, Edge>,
}

impl WorkflowGraph {
    /// Assemble a graph from parts. Prefer [`build`]; this constructor
    /// exists for callers that wire custom topologies directly.
    pub fn new(
        nodes: BTreeMap<String, NodeKind>,
        entry: impl Into<String>,
        finish: impl Into<String>,
        edges: HashMap<String, Edge>,
    ) -> Self {
        Self {
            nodes,
            entry: entry.into(),
            finish: finish.into(),
            edges,
        }
    }

    /// Entry node id — always a member node, never a reviewer.
    pub fn entry(&self) -> &str {
        &self.entry
    }

    /// Effective finish node id: the finish member's reviewer node when
    /// it needs review, the member node otherwise.
    pub fn finish(&self) -> &str {
        &self.finish
    }

    /// The member underlying the effective finish node.
    pub fn finish_member(&self) -> &str {
        match self.nodes.get(&self.finish) {
            Some(NodeKind::Reviewer { of }) => of,
            _ => &self.finish,
        }
    }

    pub fn node(&self, id: &str) -> Option<&NodeKind> {
        self.nodes.get(id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = (&String, &NodeKind)> {
        self.nodes.iter()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Outgoing edge of a node. `None` only for the terminal sink.
    pub fn edge(&self, id: &str) -> Option<&Edge> {
        self.edges.get(id)
    }

    /// The member a node invokes on behalf of: itself, or the reviewed
    /// member for reviewer nodes.
    pub fn member_of<'a>(&'a self, id: &'a str) -> &'a str {
        match self.nodes.get(id) {
            Some(NodeKind::Reviewer { of }) => of,
            _ => id,
        }
    }
}

/// Compile a team's graph declaration into an executable graph.
///
/// Validates before any node or edge is created; no partial graph is
/// ever returned. Each member without review gets an unconditional edge
/// to its successor. Each member with review gets a conditional edge
/// gated on its finished signal, detouring through a synthesized
/// reviewer node that advances unconditionally — unless the member is
/// the finish point, in which case the reviewer is the terminal sink.
pub fn build(config: &GraphConfig, members: &[Member]) -> Result<WorkflowGraph> {
    let order = &config.edge_order;

    if order.is_empty() {
        return Err(ConfigError::EmptyOrder.into());
    }

    let mut seen = HashSet::new();
    for name in order {
        if !seen.insert(name.as_str()) {
            return Err(ConfigError::DuplicateMember(name.clone()).into());
        }
    }

    if !order.contains(&config.entry) {
        return Err(ConfigError::EntryNotFound(config.entry.clone()).into());
    }
    if !order.contains(&config.finish) {
        return Err(ConfigError::FinishNotFound(config.finish.clone()).into());
    }

    let table: HashMap<&str, &Member> = members.iter().map(|m| (m.name.as_str(), m)).collect();
    for name in order {
        if !table.contains_key(name.as_str()) {
            return Err(ConfigError::UnknownMember(name.clone()).into());
        }
    }

    let mut nodes = BTreeMap::new();
    let mut edges = HashMap::new();

    for (idx, name) in order.iter().enumerate() {
        let member = table[name.as_str()];
        let next = match order.get(idx + 1) {
            Some(successor) => Target::node(successor.clone()),
            None => Target::Terminal,
        };

        nodes.insert(
            name.clone(),
            NodeKind::Member {
                needs_review: member.needs_review,
            },
        );

        if member.needs_review {
            let reviewer = reviewer_node(name);
            nodes.insert(reviewer.clone(), NodeKind::Reviewer { of: name.clone() });
            edges.insert(
                name.clone(),
                Edge::review_gate(next.clone(), Target::node(reviewer.clone())),
            );
            // The finish member's reviewer is the terminal sink and
            // gets no outgoing edge.
            if *name != config.finish {
                edges.insert(reviewer, Edge::to(next));
            }
        } else {
            edges.insert(name.clone(), Edge::to(next));
        }
    }

    let finish = if table[config.finish.as_str()].needs_review {
        reviewer_node(&config.finish)
    } else {
        config.finish.clone()
    };

    debug!(
        entry = %config.entry,
        finish = %finish,
        nodes = nodes.len(),
        "workflow graph built"
    );

    Ok(WorkflowGraph::new(nodes, config.entry.clone(), finish, edges))
}

#[cfg(test)]
mod tests {
    use super::*;
    use troupe_core::error::TroupeError;

    fn member(name: &str, needs_review: bool) -> Member {
        Member {
            name: name.to_string(),
            needs_review,
        }
    }

    fn config(entry: &str, finish: &str, order: &[&str]) -> GraphConfig {
        GraphConfig {
            entry: entry.to_string(),
            finish: finish.to_string(),
            edge_order: order.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn assert_config_err(result: Result<WorkflowGraph>, expected: ConfigError) {
        match result {
            Err(TroupeError::Config(err)) => assert_eq!(err, expected),
            other => panic!("expected config error, got {other:?}"),
        }
    }

    #[test]
    fn test_linear_graph_without_review() {
        let members = vec![member("a", false), member("b", false), member("c", false)];
        let graph = build(&config("a", "c", &["a", "b", "c"]), &members).unwrap();

        assert_eq!(graph.entry(), "a");
        assert_eq!(graph.finish(), "c");
        assert_eq!(graph.node_count(), 3);

        assert!(matches!(
            graph.edge("a"),
            Some(Edge::Unconditional { to: Target::Node(n) }) if n == "b"
        ));
        assert!(matches!(
            graph.edge("b"),
            Some(Edge::Unconditional { to: Target::Node(n) }) if n == "c"
        ));
        assert!(matches!(
            graph.edge("c"),
            Some(Edge::Unconditional { to: Target::Terminal })
        ));
    }

    #[test]
    fn test_reviewed_member_gets_detour_node() {
        let members = vec![member("a", false), member("b", true), member("c", false)];
        let graph = build(&config("a", "c", &["a", "b", "c"]), &members).unwrap();

        // Node set is members plus the one reviewer.
        assert_eq!(graph.node_count(), 4);
        assert!(matches!(
            graph.node("b_reviewer"),
            Some(NodeKind::Reviewer { of }) if of == "b"
        ));

        // b gates on its finished signal: skip to c, or detour.
        match graph.edge("b") {
            Some(Edge::Conditional {
                on_true, on_false, ..
            }) => {
                assert_eq!(*on_true, Target::node("c"));
                assert_eq!(*on_false, Target::node("b_reviewer"));
            }
            other => panic!("expected conditional edge from b, got {other:?}"),
        }

        // The reviewer advances unconditionally.
        assert!(matches!(
            graph.edge("b_reviewer"),
            Some(Edge::Unconditional { to: Target::Node(n) }) if n == "c"
        ));
    }

    #[test]
    fn test_reviewed_finish_becomes_terminal_sink() {
        let members = vec![member("a", false), member("c", true)];
        let graph = build(&config("a", "c", &["a", "c"]), &members).unwrap();

        assert_eq!(graph.finish(), "c_reviewer");
        assert_eq!(graph.finish_member(), "c");
        assert!(graph.edge("c_reviewer").is_none());

        // c itself still gates between terminal and its reviewer.
        match graph.edge("c") {
            Some(Edge::Conditional {
                on_true, on_false, ..
            }) => {
                assert_eq!(*on_true, Target::Terminal);
                assert_eq!(*on_false, Target::node("c_reviewer"));
            }
            other => panic!("expected conditional edge from c, got {other:?}"),
        }
    }

    #[test]
    fn test_entry_is_member_node_even_when_reviewed() {
        let members = vec![member("a", true), member("b", false)];
        let graph = build(&config("a", "b", &["a", "b"]), &members).unwrap();
        assert_eq!(graph.entry(), "a");
    }

    #[test]
    fn test_every_non_sink_node_has_one_edge() {
        let members = vec![member("a", true), member("b", false), member("c", true)];
        let graph = build(&config("a", "c", &["a", "b", "c"]), &members).unwrap();

        for (id, _) in graph.nodes() {
            if id == graph.finish() {
                assert!(graph.edge(id).is_none());
            } else {
                assert!(graph.edge(id).is_some(), "node '{id}' is missing an edge");
            }
        }
    }

    #[test]
    fn test_empty_order() {
        assert_config_err(build(&config("a", "a", &[]), &[]), ConfigError::EmptyOrder);
    }

    #[test]
    fn test_duplicate_member() {
        let members = vec![member("a", false), member("b", false)];
        assert_config_err(
            build(&config("a", "b", &["a", "b", "a"]), &members),
            ConfigError::DuplicateMember("a".to_string()),
        );
    }

    #[test]
    fn test_entry_not_found() {
        let members = vec![member("a", false), member("b", false)];
        assert_config_err(
            build(&config("x", "b", &["a", "b"]), &members),
            ConfigError::EntryNotFound("x".to_string()),
        );
    }

    #[test]
    fn test_finish_not_found() {
        let members = vec![member("a", false), member("b", false)];
        assert_config_err(
            build(&config("a", "x", &["a", "b"]), &members),
            ConfigError::FinishNotFound("x".to_string()),
        );
    }

    #[test]
    fn test_unknown_member_in_order() {
        let members = vec![member("a", false)];
        assert_config_err(
            build(&config("a", "a", &["a", "x"]), &members),
            ConfigError::UnknownMember("x".to_string()),
        );
    }

    #[test]
    fn test_member_of_strips_reviewer_identity() {
        let members = vec![member("a", true), member("b", false)];
        let graph = build(&config("a", "b", &["a", "b"]), &members).unwrap();
        assert_eq!(graph.member_of("a_reviewer"), "a");
        assert_eq!(graph.member_of("a"), "a");
    }
}
