use futures::future::BoxFuture;

use crate::error::Result;
use crate::types::{Message, TurnContext};

/// Agent invocation — the external capability the executor calls once
/// per graph node.
///
/// The call is blocking from the executor's point of view; any timeout
/// or retry policy lives behind this trait, never in the executor.
pub trait AgentInvoker: Send + Sync + 'static {
    /// Produce the next message for the turn described by `ctx`.
    fn invoke(&self, ctx: &TurnContext) -> BoxFuture<'_, Result<Message>>;
}
