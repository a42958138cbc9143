//! IRCv3.1 optional-extension bundle.
//!
//! Covers the capability-gated handlers for `account-notify`, `away-notify`
//! and `extended-join`, plus the negotiation-time predicate for
//! `multi-prefix` (which needs no runtime handler: downstream prefix
//! parsing already copes with stacked prefixes).
//!
//! Every handler checks the registry first. With the capability disabled
//! the message is forwarded unchanged to the next layer; with it enabled
//! the handler resyncs the user's identity from the message source, applies
//! the mutation, and either terminates (ACCOUNT, AWAY) or forwards a
//! normalized message (extended JOIN) so downstream membership bookkeeping
//! never sees the extended parameter shape.
//!
//! # Reference
//! - account-notify: <https://ircv3.net/specs/extensions/account-notify>
//! - away-notify: <https://ircv3.net/specs/extensions/away-notify>
//! - extended-join: <https://ircv3.net/specs/extensions/extended-join>

use crate::error::SessionError;
use crate::ext::{Extension, Layer};
use crate::message::{parse_user, Message};
use crate::session::SessionState;
use crate::users::{Account, AwayStatus};

/// The IRCv3.1 extension bundle.
#[derive(Debug, Default)]
pub struct Ircv3Support;

impl Ircv3Support {
    /// Create the bundle.
    pub fn new() -> Self {
        Self
    }

    fn on_account(
        &self,
        state: &mut SessionState,
        message: &Message,
        next: &mut dyn Layer,
    ) -> Result<(), SessionError> {
        if !state.capabilities.is_enabled("account-notify") {
            return next.forward(state, message);
        }
        let source = message
            .source
            .as_deref()
            .ok_or_else(|| SessionError::malformed("ACCOUNT", "missing source"))?;
        let account = message
            .param(0)
            .ok_or_else(|| SessionError::malformed("ACCOUNT", "missing account parameter"))?
            .to_string();

        let (nick, user, host) = parse_user(source);
        if !state.users.contains(nick) {
            return Ok(());
        }
        state.sync_user(nick, user, host);
        if let Some(record) = state.users.get_mut(nick) {
            record.account = Some(Account::parse(&account));
        }
        Ok(())
    }

    fn on_away(
        &self,
        state: &mut SessionState,
        message: &Message,
        next: &mut dyn Layer,
    ) -> Result<(), SessionError> {
        if !state.capabilities.is_enabled("away-notify") {
            return next.forward(state, message);
        }
        let source = message
            .source
            .as_deref()
            .ok_or_else(|| SessionError::malformed("AWAY", "missing source"))?;

        let (nick, user, host) = parse_user(source);
        if !state.users.contains(nick) {
            return Ok(());
        }
        let status = AwayStatus {
            is_away: !message.params.is_empty(),
            message: message.param(0).map(str::to_string),
        };
        state.sync_user(nick, user, host);
        if let Some(record) = state.users.get_mut(nick) {
            record.away = Some(status);
        }
        Ok(())
    }

    fn on_join(
        &self,
        state: &mut SessionState,
        message: &Message,
        next: &mut dyn Layer,
    ) -> Result<(), SessionError> {
        // Extended JOIN carries exactly (channels, account, realname); any
        // other shape goes down the chain untouched.
        if !state.capabilities.is_enabled("extended-join") || message.params.len() != 3 {
            return next.forward(state, message);
        }
        let source = message
            .source
            .as_deref()
            .ok_or_else(|| SessionError::malformed("JOIN", "missing source"))?;

        let (nick, user, host) = parse_user(source);
        state.sync_user(nick, user, host);

        // Hand the base layer a canonical single-parameter JOIN so channel
        // bookkeeping is unaffected by the extension.
        let canonical =
            Message::new("JOIN", [message.params[0].clone()]).with_source(source.to_string());
        next.forward(state, &canonical)?;

        if let Some(record) = state.users.get_mut(nick) {
            record.account = Some(Account::parse(&message.params[1]));
            record.realname = Some(message.params[2].clone());
        }
        Ok(())
    }
}

impl Extension for Ircv3Support {
    fn name(&self) -> &'static str {
        "ircv3.1"
    }

    fn capabilities(&self) -> &'static [&'static str] {
        &[
            "account-notify",
            "away-notify",
            "extended-join",
            "multi-prefix",
        ]
    }

    fn wants_capability(&self, _cap: &str) -> bool {
        true
    }

    fn handle(
        &mut self,
        state: &mut SessionState,
        message: &Message,
        next: &mut dyn Layer,
    ) -> Result<(), SessionError> {
        match message.command.as_str() {
            "ACCOUNT" => self.on_account(state, message, next),
            "AWAY" => self.on_away(state, message, next),
            "JOIN" => self.on_join(state, message, next),
            _ => next.forward(state, message),
        }
    }
}
