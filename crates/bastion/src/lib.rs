//! # BASTION - The Gate
//!
//! Anti-bot verification engine that sits in front of a game server and
//! lets through only connections that behave like a real client.
//!
//! ## Features
//!
//! - **Admission**: per-address atomic queue, reconnect limiter, blacklist,
//!   verified fast path, bounded session starts per tick
//! - **Stages**: pre-join timing, gravity, vehicle, replay, map CAPTCHA
//! - **Outcomes**: verified cache, blacklist score, transfer or disconnect
//! - **Events**: non-blocking notifications for the embedding host
//!
//! ## Architecture
//!
//! ```text
//!  socket bytes
//!       │
//!       ▼
//! ┌─────────────┐ LoginAttempt ┌─────────────┐  tick  ┌─────────────┐
//! │ LoginReader │─────────────>│ Gatekeeper  │───────>│   Session   │◄── feed / poll
//! └─────────────┘              └─────────────┘        └──────┬──────┘
//!                                    │                       │ verdict
//!                               pass through                 ▼
//!                                    │                ┌─────────────┐
//!                                    ▼                │ Dispatcher  │──► Verifier state
//!                               real server           └─────────────┘    + events
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use bastion::{Admission, BastionConfig, Gatekeeper, LoginReader, Verifier, WireChannel};
//!
//! let verifier = Arc::new(Verifier::builder(BastionConfig::load("bastion.toml")?).build());
//! let gatekeeper = Gatekeeper::new(Arc::clone(&verifier));
//!
//! let mut reader = LoginReader::new(address, false);
//! if let Some(attempt) = reader.feed(&bytes)? {
//!     match gatekeeper.login(attempt, Box::new(WireChannel::new(stream)), Instant::now()) {
//!         Admission::PassThrough(handoff) => forward(handoff),
//!         Admission::Queued(ticket) => remember(ticket),
//!         Admission::Rejected(_) => {}
//!     }
//! }
//!
//! for (ticket, mut session) in gatekeeper.tick(Instant::now()) {
//!     session.feed(&more_bytes, Instant::now());
//! }
//!
//! // once the socket closes
//! gatekeeper.disconnected(ticket);
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]
#![allow(clippy::module_name_repetitions)]

pub mod captcha;
pub mod channel;
pub mod config;
pub mod connection;
mod dispatcher;
pub mod error;
pub mod events;
pub mod gatekeeper;
pub mod session;
mod stage;
pub mod ticker;
pub mod verifier;
pub mod world;

// Re-exports for convenience
pub use captcha::{Captcha, CaptchaProvider, StaticCaptchaProvider};
pub use channel::{ClientChannel, LoopbackChannel, WireChannel};
pub use config::{BastionConfig, Timing};
pub use connection::{LoginAttempt, LoginError, LoginReader};
pub use dispatcher::refuse;
pub use error::{ConfigError, Rejection, VerificationError, VerifyResult};
pub use events::{EventBus, EventReceiver, EventSender, VerificationEvent};
pub use gatekeeper::{Admission, Gatekeeper, Handoff, Ticket};
pub use session::{offline_uuid, Ending, Session, StageKind};
pub use ticker::{Ticker, TickerHandle};
pub use verifier::{Verifier, VerifierBuilder};
pub use world::PreparedWorld;
