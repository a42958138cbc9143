//! End-to-end capability negotiation and dispatch tests.
//!
//! Drives a full session the way a connection would: the server advertises
//! capabilities, extensions decide what to request, acknowledged names land
//! in the registry, and subsequent raw messages flow through the layered
//! handler chain into the user directory.
//!
//! Run with: `cargo test --test capability_flow`

use slirc_client::ext::ircv3_1::Ircv3Support;
use slirc_client::ext::sasl::{Sasl, SaslCredentials};
use slirc_client::ext::tls::TlsSupport;
use slirc_client::{
    parse_user, Account, BaseClient, Message, Session, SessionError, SessionState,
};

/// Base client double: creates users on JOIN like real membership
/// bookkeeping and records everything that reaches the bottom layer.
#[derive(Default)]
struct Client {
    seen: Vec<Message>,
}

impl BaseClient for Client {
    fn on_message(
        &mut self,
        state: &mut SessionState,
        message: &Message,
    ) -> Result<(), SessionError> {
        if message.command == "JOIN" {
            if let Some(source) = &message.source {
                let (nick, _, _) = parse_user(source);
                state.create_user(nick);
            }
        }
        self.seen.push(message.clone());
        Ok(())
    }
}

fn full_stack() -> Session<Client> {
    let mut session = Session::new(Client::default());
    session.register(Sasl::plain(SaslCredentials {
        account: "bot".to_string(),
        password: "hunter2".to_string(),
    }));
    session.register(TlsSupport::new());
    session.register(Ircv3Support::new());
    session
}

mod negotiation {
    use super::*;

    #[test]
    fn test_requests_follow_predicates_and_advertisement() {
        let session = full_stack();
        let requested = session.capabilities_to_request(&[
            "sasl",
            "tls",
            "account-notify",
            "extended-join",
            "batch",
        ]);

        // tls is declined by its predicate, batch has no owner, the
        // unadvertised away-notify is not requested.
        assert_eq!(requested, vec!["sasl", "account-notify", "extended-join"]);
    }

    #[test]
    fn test_sasl_not_requested_without_credentials() {
        let mut session = Session::new(Client::default());
        session.register(Sasl::external());
        // EXTERNAL needs no password, so it still opts in.
        assert_eq!(session.capabilities_to_request(&["sasl"]), vec!["sasl"]);
        session.acknowledge(&["sasl"]).unwrap();
        assert_eq!(
            session.state.drain_outbox(),
            vec![Message::new("AUTHENTICATE", ["EXTERNAL"])]
        );
    }

    #[test]
    fn test_acknowledge_starts_sasl_exchange() {
        let mut session = full_stack();
        session.acknowledge(&["sasl"]).unwrap();
        session.finish_negotiation();

        assert_eq!(
            session.state.drain_outbox(),
            vec![Message::new("AUTHENTICATE", ["PLAIN"])]
        );

        session
            .dispatch(&Message::new("AUTHENTICATE", ["+"]))
            .unwrap();
        let outbox = session.state.drain_outbox();
        assert_eq!(outbox.len(), 1);
        assert_eq!(outbox[0].command, "AUTHENTICATE");
        assert_ne!(outbox[0].params[0], "+");
    }

    #[test]
    fn test_registry_seals_after_negotiation() {
        let mut session = full_stack();
        session.acknowledge(&["account-notify"]).unwrap();
        session.finish_negotiation();

        assert!(session.acknowledge(&["away-notify"]).is_err());
        assert!(session.state.capabilities.is_enabled("account-notify"));
        assert!(!session.state.capabilities.is_enabled("away-notify"));
    }
}

mod dispatch {
    use super::*;

    /// The scenario from the negotiation contract: account-notify acked,
    /// away-notify never acknowledged.
    #[test]
    fn test_partial_negotiation_scenario() {
        let mut session = full_stack();
        session.acknowledge(&["account-notify"]).unwrap();
        session.finish_negotiation();

        session.state.create_user("nick");

        let account = Message::new("ACCOUNT", ["*"]).with_source("nick!user@host");
        session.dispatch(&account).unwrap();
        let user = session.state.users.get("nick").unwrap();
        assert_eq!(user.account, Some(Account::None));

        let away = Message::new("AWAY", ["gone"]).with_source("nick!user@host");
        session.dispatch(&away).unwrap();
        let user = session.state.users.get("nick").unwrap();
        assert!(user.away.is_none(), "away fields must stay absent");
    }

    #[test]
    fn test_extended_join_through_full_stack() {
        let mut session = full_stack();
        session
            .acknowledge(&["account-notify", "away-notify", "extended-join"])
            .unwrap();
        session.finish_negotiation();

        let join = Message::new("JOIN", ["#chan", "myacct", "My Real Name"])
            .with_source("nick!user@host");
        session.dispatch(&join).unwrap();

        // Base layer observed the canonical one-parameter JOIN only.
        assert_eq!(session.base().seen.len(), 1);
        assert_eq!(session.base().seen[0].command, "JOIN");
        assert_eq!(session.base().seen[0].params, vec!["#chan"]);

        let user = session.state.users.get("nick").unwrap();
        assert_eq!(user.account, Some(Account::Named("myacct".to_string())));
        assert_eq!(user.realname.as_deref(), Some("My Real Name"));
        assert_eq!(user.username.as_deref(), Some("user"));
        assert_eq!(user.hostname.as_deref(), Some("host"));
    }

    #[test]
    fn test_unrelated_messages_reach_base_unchanged() {
        let mut session = full_stack();
        session.finish_negotiation();

        let ping = Message::new("PING", ["token"]);
        session.dispatch(&ping).unwrap();
        assert_eq!(session.base().seen, vec![ping]);
    }

    #[test]
    fn test_handler_errors_propagate_to_dispatch_caller() {
        let mut session = full_stack();
        session.acknowledge(&["account-notify"]).unwrap();
        session.finish_negotiation();

        // ACCOUNT without a source is malformed once the capability is on;
        // dispatch surfaces the handler error instead of catching it.
        let err = session
            .dispatch(&Message::new("ACCOUNT", ["acct"]))
            .unwrap_err();
        assert!(matches!(err, SessionError::MalformedMessage { .. }));
        assert!(session.base().seen.is_empty());
    }

    #[test]
    fn test_users_created_after_negotiation_carry_gated_fields() {
        let mut session = full_stack();
        session.acknowledge(&["away-notify"]).unwrap();
        session.finish_negotiation();

        let join = Message::new("JOIN", ["#chan"]).with_source("new!u@h");
        session.dispatch(&join).unwrap();

        let user = session.state.users.get("new").unwrap();
        assert!(user.away.is_some());
        assert!(user.account.is_none());
    }
}
