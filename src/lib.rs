//! # slirc-client
//!
//! The client-side concurrency substrate and capability-negotiation layer
//! for IRC clients: a single-threaded cooperative [`Scheduler`] with
//! futures, delayed/periodic callbacks and timeout-guarded waits, plus a
//! [`Session`] that composes optional protocol features (SASL, TLS-in-CAP,
//! the IRCv3.1 bundle) as independently toggleable extensions gated on
//! negotiated capabilities.
//!
//! ## Features
//!
//! - Single-assignment, observable [`Future`] cells with exactly-once
//!   callback semantics
//! - Immediate, delayed and periodic scheduling with monotonic deadlines
//!   and one teardown path for all outstanding tasks
//! - One-shot CAP negotiation driving a sealed per-connection
//!   [`CapabilityRegistry`]
//! - Layered, explicitly-delegating message handlers that mutate a shared
//!   [`UserDirectory`]
//! - Optional Tokio transport establishment (TCP, SOCKS4/5, TLS)

#![deny(clippy::all)]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! ## Quick Start
//!
//! ### Scheduling
//!
//! ```rust
//! use std::time::Duration;
//! use slirc_client::Scheduler;
//!
//! let sched = Scheduler::new();
//! let done = sched.create_future::<&str>();
//!
//! let trigger = done.clone();
//! sched.schedule_in(Duration::from_millis(5), move || {
//!     trigger.resolve("pong").ok();
//!     Ok(())
//! });
//!
//! sched.run_until(&done);
//! assert_eq!(*done.value().unwrap(), "pong");
//! ```
//!
//! ### Capability-gated dispatch
//!
//! ```rust
//! use slirc_client::ext::ircv3_1::Ircv3Support;
//! use slirc_client::{BaseClient, Message, Session, SessionState, SessionError};
//!
//! struct Client;
//! impl BaseClient for Client {
//!     fn on_message(
//!         &mut self,
//!         _state: &mut SessionState,
//!         _message: &Message,
//!     ) -> Result<(), SessionError> {
//!         Ok(())
//!     }
//! }
//!
//! let mut session = Session::new(Client);
//! session.register(Ircv3Support::new());
//!
//! let requested = session.capabilities_to_request(&["account-notify", "batch"]);
//! assert_eq!(requested, vec!["account-notify"]);
//! session.acknowledge(&["account-notify"]).unwrap();
//! session.finish_negotiation();
//! ```

pub mod caps;
pub mod casemap;
pub mod error;
pub mod ext;
pub mod future;
pub mod message;
pub mod scheduler;
pub mod session;
pub mod users;

pub use self::caps::CapabilityRegistry;
pub use self::casemap::{irc_eq, irc_to_lower};
pub use self::error::{ConfigError, InvalidStateError, Result, SessionError, TaskError};
pub use self::ext::{Extension, Layer};
pub use self::future::{Future, FutureState};
pub use self::message::{parse_user, Message};
pub use self::scheduler::{Scheduler, TaskHandle};
pub use self::session::{BaseClient, Session, SessionState};
pub use self::users::{Account, AwayStatus, User, UserDirectory, NO_ACCOUNT};

#[cfg(feature = "tokio")]
pub mod transport;
#[cfg(feature = "tokio")]
pub use self::transport::{connect, IrcStream, ProxyConfig, ProxyVersion, TlsConfig};
