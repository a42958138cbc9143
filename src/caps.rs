//! Per-connection capability registry.
//!
//! The registry is the single source of truth for "is feature X active" on a
//! connection. Entries appear only as a result of CAP negotiation; a name
//! that was never acknowledged is simply absent, and absence always reads as
//! disabled. Denied capabilities may be recorded for diagnostics, but they
//! never read as enabled.
//!
//! Negotiation is a one-shot phase: once [`CapabilityRegistry::seal`] is
//! called the enabled set is immutable for the lifetime of the connection.
//! CAP NEW/DEL style re-negotiation is out of scope.
//!
//! # Reference
//! - IRCv3 Capability Negotiation: <https://ircv3.net/specs/extensions/capability-negotiation>

use std::collections::HashSet;

use tracing::debug;

use crate::casemap::irc_to_lower;
use crate::error::ConfigError;

/// Mapping of capability name → negotiated state. Names compare
/// case-insensitively.
#[derive(Debug, Default)]
pub struct CapabilityRegistry {
    enabled: HashSet<String>,
    denied: HashSet<String>,
    sealed: bool,
}

impl CapabilityRegistry {
    /// Create an empty, unsealed registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a server-acknowledged capability as enabled.
    ///
    /// Fails with [`ConfigError::NegotiationClosed`] once the registry has
    /// been sealed.
    pub fn enable(&mut self, name: &str) -> Result<(), ConfigError> {
        if self.sealed {
            return Err(ConfigError::NegotiationClosed);
        }
        self.enabled.insert(irc_to_lower(name));
        Ok(())
    }

    /// Record a denied capability, for diagnostics only.
    pub fn deny(&mut self, name: &str) -> Result<(), ConfigError> {
        if self.sealed {
            return Err(ConfigError::NegotiationClosed);
        }
        debug!(capability = name, "capability denied by server");
        self.denied.insert(irc_to_lower(name));
        Ok(())
    }

    /// Close the negotiation phase; all further mutation fails.
    pub fn seal(&mut self) {
        self.sealed = true;
    }

    /// Whether negotiation has completed.
    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    /// Whether `name` was negotiated and acknowledged. Anything not present
    /// reads as disabled.
    pub fn is_enabled(&self, name: &str) -> bool {
        self.enabled.contains(&irc_to_lower(name))
    }

    /// Whether `name` was requested and explicitly denied.
    pub fn was_denied(&self, name: &str) -> bool {
        self.denied.contains(&irc_to_lower(name))
    }

    /// Iterate over the enabled capability names.
    pub fn enabled(&self) -> impl Iterator<Item = &str> {
        self.enabled.iter().map(String::as_str)
    }
}
