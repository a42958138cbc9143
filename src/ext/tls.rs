//! TLS capability extension.
//!
//! Takes part in negotiation for the `tls` capability but never requests it
//! proactively: in-band upgrade is driven by an explicit STARTTLS command
//! elsewhere, so the predicate always declines. Kept as an extension so a
//! server that advertises the capability unconditionally still finds a
//! registered owner for it.

use crate::error::SessionError;
use crate::ext::{Extension, Layer};
use crate::message::Message;
use crate::session::SessionState;

/// The TLS-in-CAP extension.
#[derive(Debug, Default)]
pub struct TlsSupport;

impl TlsSupport {
    /// Create the extension.
    pub fn new() -> Self {
        Self
    }
}

impl Extension for TlsSupport {
    fn name(&self) -> &'static str {
        "tls"
    }

    fn capabilities(&self) -> &'static [&'static str] {
        &["tls"]
    }

    fn wants_capability(&self, _cap: &str) -> bool {
        false
    }

    fn handle(
        &mut self,
        state: &mut SessionState,
        message: &Message,
        next: &mut dyn Layer,
    ) -> Result<(), SessionError> {
        next.forward(state, message)
    }
}
