//! AT line protocol plumbing.
//!
//! ```text
//!  UART bytes ──▶ LineDecoder ──▶ LINE_CHANNEL ──▶ classify ──▶ sequencer
//!                                                     │
//!                                                     └──▶ urc parsers
//! ```
//!
//! Everything here is stateless apart from the decoder; the session
//! state lives in [`crate::fsm`].

pub mod channels;
pub mod classify;
pub mod codec;
pub mod command;
pub mod transport;
pub mod urc;

pub use classify::{classify, Response, UrcKind};
pub use command::CommandLine;
pub use transport::Transport;
