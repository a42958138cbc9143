//! Parsed raw message surface consumed by the extension layer.
//!
//! The byte-level line parser lives outside this crate; extensions operate
//! on messages already reduced to `(source, command, params)`. This module
//! provides that type, the constructor used to synthesize normalized
//! messages, and the `nick!user@host` source splitter.

use std::fmt;

/// A parsed inbound or synthesized IRC message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message {
    /// Message source (`nick!user@host` or a server name), if any.
    pub source: Option<String>,
    /// Command name or numeric, as received.
    pub command: String,
    /// Ordered parameter list. The trailing parameter carries no `:` marker
    /// here; serialization re-adds it when needed.
    pub params: Vec<String>,
}

impl Message {
    /// Construct a message with no source.
    pub fn new<C, P, S>(command: C, params: P) -> Self
    where
        C: Into<String>,
        P: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            source: None,
            command: command.into(),
            params: params.into_iter().map(Into::into).collect(),
        }
    }

    /// Attach a source, builder-style.
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Parameter at `index`, if present.
    pub fn param(&self, index: usize) -> Option<&str> {
        self.params.get(index).map(String::as_str)
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(source) = &self.source {
            write!(f, ":{} ", source)?;
        }
        f.write_str(&self.command)?;
        let last = self.params.len().checked_sub(1);
        for (i, param) in self.params.iter().enumerate() {
            let needs_marker = param.is_empty() || param.starts_with(':') || param.contains(' ');
            if Some(i) == last && needs_marker {
                write!(f, " :{}", param)?;
            } else {
                write!(f, " {}", param)?;
            }
        }
        Ok(())
    }
}

/// Split a message source into `(nick, user, host)`.
///
/// Tolerates partial sources: a bare nick yields `(nick, None, None)`, and
/// `nick@host` yields a nick and host without a username.
pub fn parse_user(source: &str) -> (&str, Option<&str>, Option<&str>) {
    let (nick, rest) = match source.split_once('!') {
        Some((nick, rest)) => (nick, Some(rest)),
        None => match source.split_once('@') {
            Some((nick, host)) => return (nick, None, Some(host)),
            None => (source, None),
        },
    };
    match rest {
        Some(rest) => match rest.split_once('@') {
            Some((user, host)) => (nick, Some(user), Some(host)),
            None => (nick, Some(rest), None),
        },
        None => (nick, None, None),
    }
}
