//! Compact binary wire codec for real-time RPC envelope messages.
//!
//! hubwire frames invocation calls, streaming calls, completions,
//! cancellations, handshakes, and keep-alives into self-describing byte
//! sequences carrying type-erased protobuf payloads, identified on the wire
//! by compact registry indices rather than names.
//!
//! # Crate Structure
//!
//! - [`frame`] — Length-delimited framing with streaming-safe decode
//! - [`protocol`] — Envelope model, payload registry, and the codec itself

/// Re-export frame types.
pub mod frame {
    pub use hubwire_frame::*;
}

/// Re-export protocol types.
pub mod protocol {
    pub use hubwire_protocol::*;
}
