//! Protocol module containing datagram classification and the frame codec.

pub mod datagram;
pub mod frame;

pub use datagram::Datagram;
pub use frame::{ControlValue, FieldKind, FrameError, FrameFormat, AXIS_MAX, STATE_FRAME_TAG};
