//! Connection session: negotiation driver and layered message dispatch.
//!
//! A [`Session`] owns the per-connection shared state (capability registry,
//! user directory, outbound action queue) and the ordered extension list.
//! It drives the one-shot CAP negotiation phase and dispatches every
//! inbound raw message through the extension chain down to the base client.
//!
//! Like the rest of the crate this is sans-IO: handlers that need to emit a
//! message push it onto the session outbox, and the caller drains the
//! outbox to the wire. Nothing here blocks or suspends, so a handler chain
//! for one message completes atomically with respect to other messages.

use crate::caps::CapabilityRegistry;
use crate::casemap::irc_eq;
use crate::error::SessionError;
use crate::ext::{Extension, Layer};
use crate::message::Message;
use crate::users::{Account, AwayStatus, User, UserDirectory};

/// The base client collaborator at the bottom of the handler chain.
///
/// Channel and membership bookkeeping live behind this trait; the extension
/// layer only requires a handler of last resort for raw messages.
pub trait BaseClient {
    /// Handle a message no extension terminated.
    fn on_message(
        &mut self,
        state: &mut SessionState,
        message: &Message,
    ) -> Result<(), SessionError>;
}

/// Shared per-connection state, owned by the session.
///
/// Mutation only ever happens inside a dispatched handler or the
/// negotiation phase, never concurrently.
#[derive(Debug, Default)]
pub struct SessionState {
    /// Negotiated capabilities for this connection.
    pub capabilities: CapabilityRegistry,
    /// Known users.
    pub users: UserDirectory,
    outbox: Vec<Message>,
}

impl SessionState {
    /// Create empty state for a fresh connection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Ensure a record exists for `nickname`, materializing the
    /// capability-conditioned fields the negotiated feature set calls for.
    pub fn create_user(&mut self, nickname: &str) -> &mut User {
        let track_account = self.capabilities.is_enabled("account-notify")
            || self.capabilities.is_enabled("extended-join");
        let track_away = self.capabilities.is_enabled("away-notify");

        let user = self.users.entry(nickname);
        if track_account && user.account.is_none() {
            user.account = Some(Account::None);
        }
        if track_away && user.away.is_none() {
            user.away = Some(AwayStatus::default());
        }
        user
    }

    /// Idempotently bring a user record's identity fields up to date with
    /// the most recent message source concerning that user.
    pub fn sync_user(&mut self, nick: &str, username: Option<&str>, hostname: Option<&str>) {
        let user = self.create_user(nick);
        if let Some(username) = username {
            user.username = Some(username.to_string());
        }
        if let Some(hostname) = hostname {
            user.hostname = Some(hostname.to_string());
        }
    }

    /// Queue a message for the caller to write to the wire.
    pub fn send(&mut self, message: Message) {
        self.outbox.push(message);
    }

    /// Messages queued so far.
    pub fn outbox(&self) -> &[Message] {
        &self.outbox
    }

    /// Take all queued outbound messages.
    pub fn drain_outbox(&mut self) -> Vec<Message> {
        std::mem::take(&mut self.outbox)
    }
}

/// A per-connection session: state, base client, and extension chain.
pub struct Session<B: BaseClient> {
    /// Shared connection state, readable by the embedding client.
    pub state: SessionState,
    base: B,
    extensions: Vec<Box<dyn Extension>>,
}

impl<B: BaseClient> Session<B> {
    /// Create a session over the given base client, with no extensions.
    pub fn new(base: B) -> Self {
        Self {
            state: SessionState::new(),
            base,
            extensions: Vec::new(),
        }
    }

    /// Register an extension. Extensions handle messages in registration
    /// order, each one layered above those registered after it.
    pub fn register(&mut self, extension: impl Extension + 'static) {
        self.extensions.push(Box::new(extension));
    }

    /// Access the base client.
    pub fn base(&self) -> &B {
        &self.base
    }

    /// Access the base client mutably.
    pub fn base_mut(&mut self) -> &mut B {
        &mut self.base
    }

    /// Negotiation step 1: given the server-advertised capability names,
    /// ask every extension's availability predicate and return the names to
    /// request, deduplicated in extension order.
    pub fn capabilities_to_request(&self, advertised: &[&str]) -> Vec<String> {
        let mut requested: Vec<String> = Vec::new();
        for extension in &self.extensions {
            for cap in extension.capabilities() {
                let advertised_here = advertised.iter().any(|a| irc_eq(a, cap));
                let already = requested.iter().any(|r| irc_eq(r, cap));
                if advertised_here && !already && extension.wants_capability(cap) {
                    requested.push((*cap).to_string());
                }
            }
        }
        requested
    }

    /// Negotiation step 2: record server-acknowledged capabilities as
    /// enabled and notify every interested extension.
    pub fn acknowledge(&mut self, caps: &[&str]) -> Result<(), SessionError> {
        for cap in caps {
            self.state.capabilities.enable(cap)?;
        }
        for cap in caps {
            for extension in &mut self.extensions {
                if extension.capabilities().iter().any(|c| irc_eq(c, cap)) {
                    extension.on_capability_enabled(&mut self.state, cap)?;
                }
            }
        }
        Ok(())
    }

    /// Record capabilities the server refused, for diagnostics.
    pub fn deny(&mut self, caps: &[&str]) -> Result<(), SessionError> {
        for cap in caps {
            self.state.capabilities.deny(cap)?;
        }
        Ok(())
    }

    /// Negotiation step 3: close the phase. The registry is immutable for
    /// the rest of the connection.
    pub fn finish_negotiation(&mut self) {
        self.state.capabilities.seal();
    }

    /// Dispatch one inbound message through the extension chain.
    ///
    /// Handler errors propagate to the caller; the session performs no
    /// catch-and-continue here.
    pub fn dispatch(&mut self, message: &Message) -> Result<(), SessionError> {
        run_chain(
            &mut self.extensions,
            &mut self.base,
            &mut self.state,
            message,
        )
    }
}

fn run_chain<B: BaseClient>(
    extensions: &mut [Box<dyn Extension>],
    base: &mut B,
    state: &mut SessionState,
    message: &Message,
) -> Result<(), SessionError> {
    match extensions.split_first_mut() {
        Some((extension, rest)) => {
            let mut link = ChainLink { rest, base };
            extension.handle(state, message, &mut link)
        }
        None => base.on_message(state, message),
    }
}

struct ChainLink<'a, B: BaseClient> {
    rest: &'a mut [Box<dyn Extension>],
    base: &'a mut B,
}

impl<B: BaseClient> Layer for ChainLink<'_, B> {
    fn forward(&mut self, state: &mut SessionState, message: &Message) -> Result<(), SessionError> {
        run_chain(self.rest, self.base, state, message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Base client that records every message reaching the bottom of the
    /// chain and creates users on JOIN, like real membership bookkeeping.
    #[derive(Default)]
    struct Recorder {
        seen: Vec<Message>,
    }

    impl BaseClient for Recorder {
        fn on_message(
            &mut self,
            state: &mut SessionState,
            message: &Message,
        ) -> Result<(), SessionError> {
            if message.command == "JOIN" {
                if let Some(source) = &message.source {
                    let (nick, _, _) = crate::message::parse_user(source);
                    state.create_user(nick);
                }
            }
            self.seen.push(message.clone());
            Ok(())
        }
    }

    struct Tagger {
        tag: &'static str,
        terminate: bool,
    }

    impl Extension for Tagger {
        fn name(&self) -> &'static str {
            "tagger"
        }

        fn handle(
            &mut self,
            state: &mut SessionState,
            message: &Message,
            next: &mut dyn Layer,
        ) -> Result<(), SessionError> {
            if self.terminate {
                return Ok(());
            }
            let mut tagged = message.clone();
            tagged.params.push(self.tag.to_string());
            next.forward(state, &tagged)
        }
    }

    #[test]
    fn test_chain_runs_in_registration_order() {
        let mut session = Session::new(Recorder::default());
        session.register(Tagger {
            tag: "first",
            terminate: false,
        });
        session.register(Tagger {
            tag: "second",
            terminate: false,
        });

        session.dispatch(&Message::new("PING", ["x"])).unwrap();

        let seen = &session.base().seen;
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].params, vec!["x", "first", "second"]);
    }

    #[test]
    fn test_extension_can_terminate_chain() {
        let mut session = Session::new(Recorder::default());
        session.register(Tagger {
            tag: "",
            terminate: true,
        });

        session.dispatch(&Message::new("PING", ["x"])).unwrap();
        assert!(session.base().seen.is_empty());
    }

    #[test]
    fn test_empty_chain_reaches_base() {
        let mut session = Session::new(Recorder::default());
        session.dispatch(&Message::new("PING", ["x"])).unwrap();
        assert_eq!(session.base().seen.len(), 1);
    }

    #[test]
    fn test_create_user_gates_fields_on_caps() {
        let mut state = SessionState::new();
        state.create_user("plain");
        assert!(state.users.get("plain").unwrap().account.is_none());

        state.capabilities.enable("account-notify").unwrap();
        state.capabilities.enable("away-notify").unwrap();
        state.create_user("gated");
        let user = state.users.get("gated").unwrap();
        assert_eq!(user.account, Some(Account::None));
        assert_eq!(user.away, Some(AwayStatus::default()));
    }

    #[test]
    fn test_sync_user_updates_identity() {
        let mut state = SessionState::new();
        state.sync_user("nick", Some("user"), Some("host"));
        state.sync_user("nick", None, Some("host2"));

        let user = state.users.get("nick").unwrap();
        assert_eq!(user.username.as_deref(), Some("user"));
        assert_eq!(user.hostname.as_deref(), Some("host2"));
    }

    #[test]
    fn test_acknowledge_after_finish_fails() {
        let mut session = Session::new(Recorder::default());
        session.finish_negotiation();
        assert!(session.acknowledge(&["sasl"]).is_err());
    }

    #[test]
    fn test_outbox_drain() {
        let mut state = SessionState::new();
        state.send(Message::new("CAP", ["END"]));
        assert_eq!(state.outbox().len(), 1);
        let drained = state.drain_outbox();
        assert_eq!(drained.len(), 1);
        assert!(state.outbox().is_empty());
    }
}
