use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for one workflow run.
#[derive(Debug, Clone, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct RunId(pub String);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single agent response.
///
/// The executor treats the payload as opaque: it is appended to the run
/// record and handed to downstream turns, never interpreted. The only
/// field the executor acts on is `finished` — the externally supplied
/// signal that the producing member's work is complete.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Name of the member (or reviewer node) that produced this message.
    pub member: String,
    /// Structured response body.
    pub payload: serde_json::Value,
    /// Completion signal for `member`, set by the invoker.
    #[serde(default)]
    pub finished: bool,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    pub fn new(member: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            member: member.into(),
            payload,
            finished: false,
            timestamp: Utc::now(),
        }
    }

    /// Plain-text message, for invokers that do not produce structured
    /// payloads.
    pub fn text(member: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(member, serde_json::Value::String(text.into()))
    }

    pub fn finished(mut self) -> Self {
        self.finished = true;
        self
    }

    /// Extract the payload as display text.
    pub fn payload_text(&self) -> String {
        match &self.payload {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

/// Everything an agent needs to see to produce its next message.
///
/// Built by the executor from the current execution state, so that
/// invokers never reach into run internals: a reviewer receives the
/// output it must inspect, a member receives the feedback addressed to
/// it, and both receive the team goal.
#[derive(Debug, Clone)]
pub struct TurnContext {
    /// Graph node being invoked (member name, or `<member>_reviewer`).
    pub node: String,
    /// The underlying member. Equal to `node` unless this is a review
    /// turn.
    pub member: String,
    /// Whether this turn is a review of `member`'s output.
    pub is_reviewer: bool,
    /// The team goal for this run.
    pub goal: String,
    /// Latest reviewer feedback addressed to this member, if any.
    pub feedback: Option<Message>,
    /// The member output under review (review turns only).
    pub under_review: Option<Message>,
}

impl TurnContext {
    /// Context for an ordinary member turn.
    pub fn member_turn(node: impl Into<String>, goal: impl Into<String>) -> Self {
        let node = node.into();
        Self {
            member: node.clone(),
            node,
            is_reviewer: false,
            goal: goal.into(),
            feedback: None,
            under_review: None,
        }
    }

    /// Context for a review turn over `member`'s output.
    pub fn review_turn(
        node: impl Into<String>,
        member: impl Into<String>,
        goal: impl Into<String>,
    ) -> Self {
        Self {
            node: node.into(),
            member: member.into(),
            is_reviewer: true,
            goal: goal.into(),
            feedback: None,
            under_review: None,
        }
    }

    pub fn with_feedback(mut self, feedback: Message) -> Self {
        self.feedback = Some(feedback);
        self
    }

    pub fn with_under_review(mut self, output: Message) -> Self {
        self.under_review = Some(output);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_text() {
        let msg = Message::text("responder", "hello");
        assert_eq!(msg.member, "responder");
        assert_eq!(msg.payload_text(), "hello");
        assert!(!msg.finished);

        let msg = msg.finished();
        assert!(msg.finished);
    }

    #[test]
    fn test_message_structured_payload() {
        let msg = Message::new(
            "responder",
            serde_json::json!({"solution": "42", "sources": []}),
        );
        assert!(msg.payload_text().contains("solution"));
    }

    #[test]
    fn test_finished_flag_survives_roundtrip() {
        let msg = Message::text("a", "done").finished();
        let json = serde_json::to_string(&msg).unwrap();
        let parsed: Message = serde_json::from_str(&json).unwrap();
        assert!(parsed.finished);
    }

    #[test]
    fn test_turn_context_builders() {
        let ctx = TurnContext::member_turn("writer", "write a poem");
        assert_eq!(ctx.node, "writer");
        assert_eq!(ctx.member, "writer");
        assert!(!ctx.is_reviewer);

        let ctx = TurnContext::review_turn("writer_reviewer", "writer", "write a poem")
            .with_under_review(Message::text("writer", "roses are red"));
        assert!(ctx.is_reviewer);
        assert_eq!(ctx.member, "writer");
        assert_eq!(ctx.under_review.unwrap().payload_text(), "roses are red");
    }
}
