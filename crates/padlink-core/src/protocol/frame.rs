//! Binary state frames.
//!
//! Wire format for a layout with capabilities `c1..cn`:
//! ```text
//! [tag:1 = 0x00][field c1][field c2]...[field cn]
//! ```
//! An axis field is a big-endian `u16` in `[0, 0x7FFF]`; a button field is
//! one byte, nonzero meaning pressed.  There is no length prefix: the frame
//! size is a pure function of the layout, and a datagram of any other size
//! is rejected outright.

use thiserror::Error;

use crate::domain::layout::Layout;
use crate::vocabulary::CapabilityKind;

/// Leading byte of every state frame.
pub const STATE_FRAME_TAG: u8 = 0x00;

/// Largest axis value on the wire.
pub const AXIS_MAX: u16 = 0x7FFF;

/// Errors that can occur while decoding or encoding a state frame.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FrameError {
    /// The datagram length differs from the layout's frame size.
    #[error("malformed frame: expected {expected} bytes, got {actual}")]
    MalformedFrame { expected: usize, actual: usize },

    /// The leading byte is not [`STATE_FRAME_TAG`].
    #[error("not a state frame: leading byte 0x{0:02X}")]
    NotAStateFrame(u8),

    /// Values passed to [`FrameFormat::encode`] do not match the layout.
    #[error("value {index} does not match the frame field kind")]
    ValueMismatch { index: usize },
}

/// Field kind of one frame slot.  Same as the capability kind it carries.
pub type FieldKind = CapabilityKind;

/// A decoded control value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlValue {
    /// Analog axis value in `[0, AXIS_MAX]`.
    Axis(u16),
    /// Digital button state.
    Button(bool),
}

impl ControlValue {
    /// The value as the integer an input driver expects: the axis position,
    /// or 0/1 for a button.
    pub fn as_i32(&self) -> i32 {
        match *self {
            Self::Axis(v) => i32::from(v),
            Self::Button(pressed) => i32::from(pressed),
        }
    }
}

/// Fixed-size frame layout derived from a [`Layout`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameFormat {
    fields: Vec<FieldKind>,
    size: usize,
}

impl FrameFormat {
    /// Derives the frame format for `layout`.
    pub fn for_layout(layout: &Layout) -> Self {
        let fields: Vec<FieldKind> = layout.capabilities().iter().map(|c| c.kind).collect();
        let size = 1 + fields.iter().map(|f| field_width(*f)).sum::<usize>();
        Self { fields, size }
    }

    /// Exact byte length of a frame in this format, tag included.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Decodes one state frame into values in field order.
    ///
    /// Axis values above [`AXIS_MAX`] are clamped to it.
    ///
    /// # Errors
    ///
    /// - [`FrameError::MalformedFrame`] if `bytes.len() != self.size()`.
    /// - [`FrameError::NotAStateFrame`] if the leading byte is not
    ///   [`STATE_FRAME_TAG`].
    ///
    /// # Examples
    ///
    /// ```rust
    /// use padlink_core::{AliasTable, ControlValue, Layout};
    ///
    /// let layout = Layout::negotiate(b"j1,b1", &AliasTable::builtin()).unwrap();
    /// let values = layout
    ///     .frame_format()
    ///     .decode(&[0x00, 0x00, 0x00, 0x7F, 0xFF, 0x01])
    ///     .unwrap();
    /// assert_eq!(
    ///     values,
    ///     vec![
    ///         ControlValue::Axis(0),
    ///         ControlValue::Axis(0x7FFF),
    ///         ControlValue::Button(true),
    ///     ]
    /// );
    /// ```
    pub fn decode(&self, bytes: &[u8]) -> Result<Vec<ControlValue>, FrameError> {
        if bytes.len() != self.size {
            return Err(FrameError::MalformedFrame {
                expected: self.size,
                actual: bytes.len(),
            });
        }
        if bytes[0] != STATE_FRAME_TAG {
            return Err(FrameError::NotAStateFrame(bytes[0]));
        }

        let mut values = Vec::with_capacity(self.fields.len());
        let mut offset = 1;
        for field in &self.fields {
            match field {
                CapabilityKind::Axis => {
                    let raw = u16::from_be_bytes([bytes[offset], bytes[offset + 1]]);
                    values.push(ControlValue::Axis(raw.min(AXIS_MAX)));
                }
                CapabilityKind::Button => values.push(ControlValue::Button(bytes[offset] != 0)),
            }
            offset += field_width(*field);
        }
        Ok(values)
    }

    /// Encodes values into a state frame.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::ValueMismatch`] if a value's kind differs from
    /// its field, or [`FrameError::MalformedFrame`] if the value count is
    /// wrong (sizes reported in fields, not bytes).
    pub fn encode(&self, values: &[ControlValue]) -> Result<Vec<u8>, FrameError> {
        if values.len() != self.fields.len() {
            return Err(FrameError::MalformedFrame {
                expected: self.fields.len(),
                actual: values.len(),
            });
        }

        let mut buf = Vec::with_capacity(self.size);
        buf.push(STATE_FRAME_TAG);
        for (index, (field, value)) in self.fields.iter().zip(values).enumerate() {
            match (field, value) {
                (CapabilityKind::Axis, ControlValue::Axis(v)) => {
                    buf.extend_from_slice(&(*v).min(AXIS_MAX).to_be_bytes());
                }
                (CapabilityKind::Button, ControlValue::Button(pressed)) => {
                    buf.push(u8::from(*pressed));
                }
                _ => return Err(FrameError::ValueMismatch { index }),
            }
        }
        Ok(buf)
    }
}

fn field_width(kind: FieldKind) -> usize {
    match kind {
        CapabilityKind::Axis => 2,
        CapabilityKind::Button => 1,
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vocabulary::AliasTable;

    fn j1_b1() -> FrameFormat {
        Layout::negotiate(b"j1,b1", &AliasTable::builtin())
            .unwrap()
            .frame_format()
    }

    #[test]
    fn test_size_counts_tag_axes_and_buttons() {
        // 1 tag + 2 + 2 + 1
        assert_eq!(j1_b1().size(), 6);
    }

    #[test]
    fn test_decode_reads_big_endian_axes() {
        // Arrange
        let format = j1_b1();
        let frame = [0x00, 0x12, 0x34, 0x00, 0x01, 0x00];

        // Act
        let values = format.decode(&frame).expect("decode");

        // Assert
        assert_eq!(
            values,
            vec![
                ControlValue::Axis(0x1234),
                ControlValue::Axis(0x0001),
                ControlValue::Button(false),
            ]
        );
    }

    #[test]
    fn test_decode_treats_any_nonzero_button_byte_as_pressed() {
        let values = j1_b1().decode(&[0, 0, 0, 0, 0, 0x80]).unwrap();
        assert_eq!(values[2], ControlValue::Button(true));
    }

    #[test]
    fn test_decode_clamps_axis_above_domain() {
        let values = j1_b1().decode(&[0, 0xFF, 0xFF, 0x80, 0x00, 0]).unwrap();
        assert_eq!(values[0], ControlValue::Axis(AXIS_MAX));
        assert_eq!(values[1], ControlValue::Axis(AXIS_MAX));
    }

    #[test]
    fn test_decode_rejects_short_frame() {
        let result = j1_b1().decode(&[0, 0, 0, 0, 0]);
        assert_eq!(
            result,
            Err(FrameError::MalformedFrame {
                expected: 6,
                actual: 5
            })
        );
    }

    #[test]
    fn test_decode_rejects_long_frame() {
        let result = j1_b1().decode(&[0; 7]);
        assert!(matches!(
            result,
            Err(FrameError::MalformedFrame { actual: 7, .. })
        ));
    }

    #[test]
    fn test_decode_rejects_wrong_tag() {
        let result = j1_b1().decode(&[b'j', 0, 0, 0, 0, 0]);
        assert_eq!(result, Err(FrameError::NotAStateFrame(b'j')));
    }

    #[test]
    fn test_encode_produces_wire_bytes() {
        // Arrange
        let format = j1_b1();
        let values = [
            ControlValue::Axis(0),
            ControlValue::Axis(0x7FFF),
            ControlValue::Button(true),
        ];

        // Act
        let bytes = format.encode(&values).unwrap();

        // Assert
        assert_eq!(bytes, vec![0x00, 0x00, 0x00, 0x7F, 0xFF, 0x01]);
    }

    #[test]
    fn test_encode_rejects_kind_mismatch() {
        let values = [
            ControlValue::Axis(0),
            ControlValue::Button(true),
            ControlValue::Button(true),
        ];
        assert_eq!(
            j1_b1().encode(&values),
            Err(FrameError::ValueMismatch { index: 1 })
        );
    }

    #[test]
    fn test_encode_rejects_wrong_value_count() {
        assert!(j1_b1().encode(&[ControlValue::Axis(1)]).is_err());
    }

    #[test]
    fn test_as_i32() {
        assert_eq!(ControlValue::Axis(0x7FFF).as_i32(), 0x7FFF);
        assert_eq!(ControlValue::Button(true).as_i32(), 1);
        assert_eq!(ControlValue::Button(false).as_i32(), 0);
    }
}
