//! Classification of incoming datagrams.
//!
//! One UDP port carries two message types, told apart by the first byte:
//!
//! | First byte | Message                                   |
//! |------------|-------------------------------------------|
//! | `0x00`     | state frame (see [`super::frame`])        |
//! | other      | layout negotiation (UTF-8 token list)     |
//!
//! Negotiation text never starts with a NUL byte, so the two cannot be
//! confused.

use super::frame::STATE_FRAME_TAG;

/// A classified datagram, borrowing the received bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Datagram<'a> {
    /// A state frame, tag byte included.
    StateFrame(&'a [u8]),
    /// A layout negotiation payload.
    Negotiation(&'a [u8]),
    /// A zero-length datagram.
    Empty,
}

impl<'a> Datagram<'a> {
    pub fn classify(bytes: &'a [u8]) -> Self {
        match bytes.first() {
            None => Self::Empty,
            Some(&STATE_FRAME_TAG) => Self::StateFrame(bytes),
            Some(_) => Self::Negotiation(bytes),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
