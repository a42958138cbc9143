//! Capability-gated protocol extensions.
//!
//! An [`Extension`] is a pluggable unit contributing three things: the list
//! of capability names it takes part in negotiating, an availability
//! predicate consulted once per advertised capability during the CAP phase,
//! and raw-message handlers for the commands it cares about.
//!
//! Extensions compose by layering. The dispatch driver calls each extension
//! in registration order; a handler inspects the capability registry, may
//! mutate the user directory or synthesize a normalized message, and then
//! explicitly either delegates to the next layer via [`Layer::forward`] or
//! terminates the chain by returning. The chain bottoms out at the base
//! client's own handler. Explicit delegation replaces implicit
//! method-resolution chaining: every hop is visible and testable.

pub mod ircv3_1;
pub mod sasl;
pub mod tls;

use crate::error::SessionError;
use crate::message::Message;
use crate::session::SessionState;

/// The remainder of a handler chain.
///
/// Handed to each extension so it can delegate the (possibly transformed)
/// message to the layers below it.
pub trait Layer {
    /// Pass `message` to the next layer.
    fn forward(&mut self, state: &mut SessionState, message: &Message) -> Result<(), SessionError>;
}

/// A pluggable, capability-gated protocol feature.
pub trait Extension {
    /// Short name used in diagnostics.
    fn name(&self) -> &'static str;

    /// Capability names this extension takes part in negotiating.
    fn capabilities(&self) -> &'static [&'static str] {
        &[]
    }

    /// Availability predicate: should `cap` be requested from the server?
    ///
    /// Returning `false` does not opt the extension out entirely; it still
    /// reacts if the server enables the capability unconditionally.
    fn wants_capability(&self, cap: &str) -> bool {
        let _ = cap;
        false
    }

    /// Called once when a capability of interest is acknowledged by the
    /// server, before the registry is sealed.
    fn on_capability_enabled(
        &mut self,
        state: &mut SessionState,
        cap: &str,
    ) -> Result<(), SessionError> {
        let _ = (state, cap);
        Ok(())
    }

    /// Handle one inbound message.
    ///
    /// Call `next.forward` to delegate (with the original or a transformed
    /// message); return without forwarding to terminate the chain.
    fn handle(
        &mut self,
        state: &mut SessionState,
        message: &Message,
        next: &mut dyn Layer,
    ) -> Result<(), SessionError>;
}
