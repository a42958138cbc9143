//! SASL authentication extension.
//!
//! Negotiates the `sasl` capability when credentials are configured and
//! drives the AUTHENTICATE exchange as a state machine: mechanism offer,
//! payload (base64, chunked at 400 bytes), then success or failure
//! numerics. Mechanism internals beyond PLAIN and EXTERNAL encoding are out
//! of scope; the state transitions are the contract.
//!
//! # Reference
//! - IRCv3 SASL: <https://ircv3.net/specs/extensions/sasl-3.2>
//! - RFC 4616 (PLAIN): <https://tools.ietf.org/html/rfc4616>

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use tracing::debug;

use crate::error::SessionError;
use crate::ext::{Extension, Layer};
use crate::message::Message;
use crate::session::SessionState;

/// Maximum length of a single AUTHENTICATE payload chunk.
pub const SASL_CHUNK_SIZE: usize = 400;

/// Supported SASL mechanisms.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SaslMechanism {
    /// Username/password (RFC 4616).
    Plain,
    /// TLS client certificate.
    External,
}

impl SaslMechanism {
    /// Canonical mechanism name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Plain => "PLAIN",
            Self::External => "EXTERNAL",
        }
    }
}

impl std::fmt::Display for SaslMechanism {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Account credentials for the PLAIN mechanism.
#[derive(Clone, Debug)]
pub struct SaslCredentials {
    /// Account name.
    pub account: String,
    /// Password.
    pub password: String,
}

/// Authentication progress.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SaslState {
    /// Nothing negotiated yet.
    Idle,
    /// Capability acknowledged, mechanism offered to the server.
    MechanismSent,
    /// Credentials payload sent, awaiting the result numeric.
    PayloadSent,
    /// 903 received.
    Succeeded,
    /// 904/905/906 received, with the server's reason.
    Failed(String),
}

/// The SASL extension.
#[derive(Debug)]
pub struct Sasl {
    mechanism: SaslMechanism,
    credentials: Option<SaslCredentials>,
    state: SaslState,
}

impl Sasl {
    /// PLAIN authentication with the given credentials.
    pub fn plain(credentials: SaslCredentials) -> Self {
        Self {
            mechanism: SaslMechanism::Plain,
            credentials: Some(credentials),
            state: SaslState::Idle,
        }
    }

    /// EXTERNAL authentication (TLS client certificate).
    pub fn external() -> Self {
        Self {
            mechanism: SaslMechanism::External,
            credentials: None,
            state: SaslState::Idle,
        }
    }

    /// Current authentication state.
    pub fn state(&self) -> &SaslState {
        &self.state
    }

    fn enabled(&self) -> bool {
        match self.mechanism {
            SaslMechanism::Plain => self.credentials.is_some(),
            SaslMechanism::External => true,
        }
    }

    fn payload(&self) -> String {
        match (&self.mechanism, &self.credentials) {
            (SaslMechanism::Plain, Some(creds)) => encode_plain(&creds.account, &creds.password),
            _ => String::new(),
        }
    }
}

/// Encode PLAIN credentials per RFC 4616, authzid equal to authcid.
pub fn encode_plain(account: &str, password: &str) -> String {
    BASE64.encode(format!("{account}\0{account}\0{password}"))
}

/// Split an encoded payload into AUTHENTICATE chunk parameters.
///
/// An empty payload is sent as a single `+`; a payload that is an exact
/// multiple of the chunk size needs a trailing `+` terminator.
pub fn chunk_payload(encoded: &str) -> Vec<String> {
    if encoded.is_empty() {
        return vec!["+".to_string()];
    }
    let mut chunks: Vec<String> = encoded
        .as_bytes()
        .chunks(SASL_CHUNK_SIZE)
        .map(|chunk| String::from_utf8_lossy(chunk).into_owned())
        .collect();
    if encoded.len() % SASL_CHUNK_SIZE == 0 {
        chunks.push("+".to_string());
    }
    chunks
}

impl Extension for Sasl {
    fn name(&self) -> &'static str {
        "sasl"
    }

    fn capabilities(&self) -> &'static [&'static str] {
        &["sasl"]
    }

    fn wants_capability(&self, _cap: &str) -> bool {
        self.enabled()
    }

    fn on_capability_enabled(
        &mut self,
        state: &mut SessionState,
        _cap: &str,
    ) -> Result<(), SessionError> {
        if !self.enabled() {
            return Ok(());
        }
        state.send(Message::new("AUTHENTICATE", [self.mechanism.as_str()]));
        self.state = SaslState::MechanismSent;
        Ok(())
    }

    fn handle(
        &mut self,
        state: &mut SessionState,
        message: &Message,
        next: &mut dyn Layer,
    ) -> Result<(), SessionError> {
        match message.command.as_str() {
            "AUTHENTICATE" if message.param(0) == Some("+") => {
                if self.state != SaslState::MechanismSent {
                    return next.forward(state, message);
                }
                for chunk in chunk_payload(&self.payload()) {
                    state.send(Message::new("AUTHENTICATE", [chunk]));
                }
                self.state = SaslState::PayloadSent;
                Ok(())
            }
            // RPL_SASLSUCCESS
            "903" if self.state != SaslState::Idle => {
                debug!("SASL authentication succeeded");
                self.state = SaslState::Succeeded;
                Ok(())
            }
            // ERR_SASLFAIL / ERR_SASLTOOLONG / ERR_SASLABORTED
            "904" | "905" | "906" if self.state != SaslState::Idle => {
                let reason = message
                    .params
                    .last()
                    .cloned()
                    .unwrap_or_else(|| "authentication failed".to_string());
                debug!(reason = %reason, "SASL authentication failed");
                self.state = SaslState::Failed(reason);
                Ok(())
            }
            _ => next.forward(state, message),
        }
    }
}
