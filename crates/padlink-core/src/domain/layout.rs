//! Negotiated controller layouts.
//!
//! A [`Layout`] is the answer to "which controls does the virtual gamepad
//! have, and in which order do they appear in a state frame?".  It is built
//! from the text a client sends (for example `"j1,b1"`) and is immutable:
//! a new negotiation builds a new `Layout` rather than editing the old one.
//!
//! The layout keeps the exact bytes it was negotiated from.  Clients resend
//! their negotiation until they see state frames being accepted, so the host
//! compares incoming negotiations against these bytes to recognise a
//! duplicate cheaply.

use std::str::Utf8Error;

use thiserror::Error;
use tracing::debug;

use crate::protocol::frame::FrameFormat;
use crate::vocabulary::{resolve, AliasTable, Capability, CapabilityKind, VocabularyError};

/// Error type for layout negotiation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NegotiationError {
    /// The negotiation payload is not valid UTF-8.
    #[error("negotiation is not valid UTF-8: {0}")]
    InvalidEncoding(Utf8Error),

    /// A token did not resolve to a known capability.
    #[error("unknown capability: {0:?}")]
    UnknownCapability(String),
}

impl From<VocabularyError> for NegotiationError {
    fn from(e: VocabularyError) -> Self {
        match e {
            VocabularyError::UnknownCapability(token) => Self::UnknownCapability(token),
        }
    }
}

/// Ordered capabilities plus the raw negotiation bytes that produced them.
///
/// Duplicated capabilities are allowed; order fixes both the state-frame
/// field order and the device registration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Layout {
    capabilities: Vec<Capability>,
    raw: Vec<u8>,
}

impl Layout {
    /// A layout with no controls, negotiated from no bytes.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Builds a layout from a raw negotiation payload.
    ///
    /// # Errors
    ///
    /// Returns [`NegotiationError::InvalidEncoding`] if `raw` is not UTF-8, or
    /// [`NegotiationError::UnknownCapability`] if a token does not resolve.
    pub fn negotiate(raw: &[u8], aliases: &AliasTable) -> Result<Self, NegotiationError> {
        let text = std::str::from_utf8(raw).map_err(NegotiationError::InvalidEncoding)?;
        let capabilities = resolve(text, aliases)?;
        debug!(
            "negotiated {} capabilities from {:?}",
            capabilities.len(),
            text
        );
        Ok(Self {
            capabilities,
            raw: raw.to_vec(),
        })
    }

    pub fn capabilities(&self) -> &[Capability] {
        &self.capabilities
    }

    /// The exact bytes this layout was negotiated from.
    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    /// Returns `true` if `bytes` is exactly this layout's negotiation.
    pub fn is_negotiated_by(&self, bytes: &[u8]) -> bool {
        self.raw == bytes
    }

    pub fn len(&self) -> usize {
        self.capabilities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.capabilities.is_empty()
    }

    /// Number of axis capabilities.
    pub fn axis_count(&self) -> usize {
        self.count(CapabilityKind::Axis)
    }

    /// Number of button capabilities.
    pub fn button_count(&self) -> usize {
        self.count(CapabilityKind::Button)
    }

    /// The state-frame format implied by this layout.
    pub fn frame_format(&self) -> FrameFormat {
        FrameFormat::for_layout(self)
    }

    fn count(&self, kind: CapabilityKind) -> usize {
        self.capabilities.iter().filter(|c| c.kind == kind).count()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_negotiate_j1_b1() {
        // Arrange
        let aliases = AliasTable::builtin();

        // Act
        let layout = Layout::negotiate(b"j1,b1", &aliases).expect("negotiate");

        // Assert
        assert_eq!(
            layout.capabilities(),
            &[
                Capability::axis(0x00),
                Capability::axis(0x01),
                Capability::button(0x130),
            ]
        );
        assert_eq!(layout.raw(), b"j1,b1");
        assert_eq!(layout.axis_count(), 2);
        assert_eq!(layout.button_count(), 1);
        assert_eq!(layout.frame_format().size(), 6);
    }

    #[test]
    fn test_negotiate_unknown_token() {
        let result = Layout::negotiate(b"zz9", &AliasTable::builtin());
        assert_eq!(
            result,
            Err(NegotiationError::UnknownCapability("zz9".to_string()))
        );
    }

    #[test]
    fn test_negotiate_rejects_invalid_utf8() {
        let result = Layout::negotiate(&[b'j', 0xff, 0xfe], &AliasTable::builtin());
        assert!(matches!(result, Err(NegotiationError::InvalidEncoding(_))));
    }

    #[test]
    fn test_negotiate_keeps_duplicates() {
        let layout = Layout::negotiate(b"b1,b1,j1", &AliasTable::builtin()).unwrap();
        assert_eq!(layout.len(), 4);
        assert_eq!(layout.capabilities()[0], layout.capabilities()[1]);
    }

    #[test]
    fn test_is_negotiated_by_matches_exact_bytes_only() {
        // Arrange
        let layout = Layout::negotiate(b"j1,b1", &AliasTable::builtin()).unwrap();

        // Act / Assert
        assert!(layout.is_negotiated_by(b"j1,b1"));
        assert!(!layout.is_negotiated_by(b"j1, b1"));
        assert!(!layout.is_negotiated_by(b"j1"));
    }

    #[test]
    fn test_empty_layout_has_one_byte_frames() {
        let layout = Layout::empty();
        assert!(layout.is_empty());
        assert!(layout.raw().is_empty());
        assert_eq!(layout.frame_format().size(), 1);
    }
}
