//! # padlink-core
//!
//! Shared library for padlink containing the event vocabulary, the layout
//! negotiation rules and the binary state-frame codec.
//!
//! It has zero dependencies on OS APIs, virtual input drivers or network
//! sockets; everything here can be tested on any platform.
//!
//! # Architecture overview (for beginners)
//!
//! padlink turns a phone into a game controller.  The phone runs a
//! touchscreen client that streams the position of every stick, slider and
//! button to the host over UDP, many times per second.  The host feeds those
//! values into a *virtual* gamepad that games see as real hardware.
//!
//! Before streaming, the client tells the host which controls it has (the
//! *layout*), e.g. `"j1,b1,b2"`: one two-axis joystick and two buttons.
//! This crate defines:
//!
//! - **`vocabulary`** – The catalogue of controls the host understands,
//!   named after Linux input event codes (`ABS_X`, `BTN_SOUTH`, …), and the
//!   table of short aliases (`j1`, `b1`, …) clients use to name them.
//!
//! - **`domain`** – The [`Layout`]: an ordered list of capabilities
//!   negotiated from the client's text message.
//!
//! - **`protocol`** – How bytes travel over the wire.  A layout fixes the
//!   size and field order of every state frame; the [`FrameFormat`] decodes
//!   those frames into [`ControlValue`]s.

pub mod domain;
pub mod protocol;
pub mod vocabulary;

pub use domain::layout::{Layout, NegotiationError};
pub use protocol::datagram::Datagram;
pub use protocol::frame::{ControlValue, FieldKind, FrameError, FrameFormat, AXIS_MAX};
pub use vocabulary::{AliasTable, Capability, CapabilityKind, VocabularyError};
