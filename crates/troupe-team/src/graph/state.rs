use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::Serialize;

use troupe_core::error::{Result, TroupeError};
use troupe_core::types::Message;

use super::builder::{NodeKind, WorkflowGraph};
use super::edge::{reviewed_member, Target};

/// One entry in the run's event log.
#[derive(Debug, Clone, Serialize)]
pub struct EventRecord {
    pub target: String,
    pub event: String,
    pub at: DateTime<Utc>,
}

/// Mutable run-time record for one workflow run.
///
/// Exclusively owned by a single executor invocation; outputs are
/// append-only and never reordered after append.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionState {
    outputs: HashMap<String, Vec<Message>>,
    members_finished: HashSet<String>,
    event_log: Vec<EventRecord>,
    current: Target,
}

impl ExecutionState {
    pub fn new(entry: &str) -> Self {
        Self {
            outputs: HashMap::new(),
            members_finished: HashSet::new(),
            event_log: Vec::new(),
            current: Target::node(entry),
        }
    }

    pub fn current(&self) -> &Target {
        &self.current
    }

    pub fn set_current(&mut self, target: Target) {
        self.current = target;
    }

    /// Append a message produced by `node` and record the invocation.
    ///
    /// A message carrying the `finished` signal marks its member
    /// finished; a finished review message marks the reviewed member,
    /// since the verdict is about that member's output.
    pub fn push_output(&mut self, node: &str, message: Message) {
        if message.finished {
            let member = reviewed_member(&message.member).unwrap_or(&message.member);
            self.members_finished.insert(member.to_string());
        }
        self.outputs.entry(node.to_string()).or_default().push(message);
        self.record(node, "invoked");
    }

    pub fn record(&mut self, target: &str, event: &str) {
        self.event_log.push(EventRecord {
            target: target.to_string(),
            event: event.to_string(),
            at: Utc::now(),
        });
    }

    pub fn mark_finished(&mut self, member: &str) {
        self.members_finished.insert(member.to_string());
    }

    pub fn is_finished(&self, member: &str) -> bool {
        self.members_finished.contains(member)
    }

    pub fn outputs(&self) -> &HashMap<String, Vec<Message>> {
        &self.outputs
    }

    pub fn last_output(&self, node: &str) -> Option<&Message> {
        self.outputs.get(node).and_then(|msgs| msgs.last())
    }

    pub fn event_log(&self) -> &[EventRecord] {
        &self.event_log
    }

    /// Number of invocations performed so far.
    pub fn invocations(&self) -> usize {
        self.event_log.iter().filter(|e| e.event == "invoked").count()
    }
}

/// Read-only projection of a completed run.
#[derive(Debug, Clone, Serialize)]
pub struct FinalState {
    /// Last message per invoked node.
    pub outputs_last: HashMap<String, Message>,
    /// Payload of the finish member's last message.
    pub final_answers: serde_json::Value,
}

/// Reduce accumulated state into a `FinalState`.
///
/// Fails with a projection error when the execution record is
/// inconsistent with the graph: an invoked node without output, or a
/// member node that was never invoked. Reviewer nodes the conditional
/// edges bypassed are simply absent from `outputs_last`.
pub fn project(state: &ExecutionState, graph: &WorkflowGraph) -> Result<FinalState> {
    let mut outputs_last = HashMap::new();

    for event in state.event_log() {
        if event.event != "invoked" {
            continue;
        }
        let last = state.last_output(&event.target).ok_or_else(|| {
            TroupeError::Projection(format!(
                "node '{}' was invoked but has no output",
                event.target
            ))
        })?;
        outputs_last.insert(event.target.clone(), last.clone());
    }

    // Reviewer nodes may be legitimately bypassed; member nodes may not.
    for (id, kind) in graph.nodes() {
        if matches!(kind, NodeKind::Member { .. }) && !outputs_last.contains_key(id) {
            return Err(TroupeError::Projection(format!(
                "member '{id}' was never invoked"
            )));
        }
    }

    let finish_member = graph.finish_member();
    let final_answers = outputs_last
        .get(finish_member)
        .map(|msg| msg.payload.clone())
        .ok_or_else(|| {
            TroupeError::Projection(format!("finish member '{finish_member}' was never invoked"))
        })?;

    Ok(FinalState {
        outputs_last,
        final_answers,
    })
}
