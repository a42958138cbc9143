//! User directory: nickname → user record.
//!
//! Records carry a base identity (nick/user/host) plus fields that only
//! materialize when the corresponding capability was negotiated. A server
//! that never acknowledged `away-notify` produces records whose away fields
//! stay `None` forever; code downstream cannot observe data that was never
//! populated. Mirroring that sparsity is a contract, not an accident.

use std::collections::HashMap;

use crate::casemap::irc_to_lower;

/// Sentinel account parameter meaning "no account" / logged out.
pub const NO_ACCOUNT: &str = "*";

/// Account state tracked under `account-notify` / `extended-join`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Account {
    /// Not logged in to any account (the `*` sentinel).
    None,
    /// Logged in under this account name.
    Named(String),
}

impl Account {
    /// Map a raw account parameter, applying the `*` sentinel.
    pub fn parse(raw: &str) -> Self {
        if raw == NO_ACCOUNT {
            Self::None
        } else {
            Self::Named(raw.to_string())
        }
    }
}

/// Away state tracked under `away-notify`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AwayStatus {
    /// Whether the user is currently away.
    pub is_away: bool,
    /// The away message, if one was given.
    pub message: Option<String>,
}

/// A known user.
///
/// The outer `Option` on `account` and `away` encodes capability-conditioned
/// sparsity: `None` means the feature was never negotiated, which is
/// distinct from a present-but-empty value.
#[derive(Clone, Debug)]
pub struct User {
    /// Current nickname.
    pub nickname: String,
    /// Username (ident), once known.
    pub username: Option<String>,
    /// Hostname, once known.
    pub hostname: Option<String>,
    /// Account state; materialized only under `account-notify` or
    /// `extended-join`.
    pub account: Option<Account>,
    /// Away state; materialized only under `away-notify`.
    pub away: Option<AwayStatus>,
    /// Real name; populated only via `extended-join`.
    pub realname: Option<String>,
}

impl User {
    pub(crate) fn new(nickname: &str) -> Self {
        Self {
            nickname: nickname.to_string(),
            username: None,
            hostname: None,
            account: None,
            away: None,
            realname: None,
        }
    }
}

/// Directory of known users, keyed case-insensitively by nickname.
#[derive(Debug, Default)]
pub struct UserDirectory {
    users: HashMap<String, User>,
}

impl UserDirectory {
    /// Create an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a user with this nickname is known.
    pub fn contains(&self, nickname: &str) -> bool {
        self.users.contains_key(&irc_to_lower(nickname))
    }

    /// Look up a user.
    pub fn get(&self, nickname: &str) -> Option<&User> {
        self.users.get(&irc_to_lower(nickname))
    }

    /// Look up a user mutably.
    pub fn get_mut(&mut self, nickname: &str) -> Option<&mut User> {
        self.users.get_mut(&irc_to_lower(nickname))
    }

    /// Insert a fresh record for `nickname` if none exists, returning the
    /// record either way.
    pub fn entry(&mut self, nickname: &str) -> &mut User {
        self.users
            .entry(irc_to_lower(nickname))
            .or_insert_with(|| User::new(nickname))
    }

    /// Remove a user, returning the record if it existed.
    pub fn remove(&mut self, nickname: &str) -> Option<User> {
        self.users.remove(&irc_to_lower(nickname))
    }

    /// Number of known users.
    pub fn len(&self) -> usize {
        self.users.len()
    }

    /// Whether the directory is empty.
    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    /// Iterate over all user records.
    pub fn iter(&self) -> impl Iterator<Item = &User> {
        self.users.values()
    }
}
