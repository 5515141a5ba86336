//! Smart HTTP git transport for berth.
//!
//! Implements the v0 wire protocol over caller-provided byte streams:
//! pkt-line framing, ref advertisement, upload-pack (fetch/clone) and
//! receive-pack (push). The transport is stateless; each request carries
//! everything needed to serve it. Policy and review hooks plug into the
//! receive side through [`PreReceive`].

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod advertise;
mod error;
mod pktline;
mod receive;
mod service;
mod upload;

#[cfg(test)]
mod testutil;

pub use advertise::advertise_refs;
pub use error::{GitError, Result};
pub use pktline::{Band, PktLine, PktLineReader, PktLineWriter, MAX_BAND_PAYLOAD, MAX_PKT_PAYLOAD};
pub use receive::{
    receive_pack, AcceptAll, CommandOutcome, PreReceive, ReceiveOutcome, ReceivePolicy, RefUpdate,
    UpdateKind,
};
pub use service::{GitService, AGENT};
pub use upload::{upload_pack, FetchRequest};
