//! The event vocabulary: capabilities, their names, and alias resolution.
//!
//! A [`Capability`] is one control the virtual gamepad exposes: an analog
//! axis or a digital button, identified by its Linux event code.  Clients
//! name capabilities in negotiation messages either directly (`ABS_X`) or
//! through a short alias from the [`AliasTable`] (`j1` expands to
//! `ABS_X,ABS_Y`).

pub mod alias;
pub mod linux_codes;

use std::fmt;

use thiserror::Error;

pub use alias::AliasTable;

/// Separator between tokens in a negotiation message and in alias expansions.
pub const TOKEN_SEPARATOR: char = ',';

/// Error type for vocabulary resolution.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum VocabularyError {
    /// A token (after alias expansion) is not a catalogued capability name.
    #[error("unknown capability: {0:?}")]
    UnknownCapability(String),
}

/// Whether a capability carries an analog or a digital value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CapabilityKind {
    /// Analog axis, value in `[0, 0x7FFF]` on the wire.
    Axis,
    /// Digital button, pressed or released.
    Button,
}

/// One control of the virtual gamepad.
///
/// Two capabilities are equal iff kind and event code match, so synonyms
/// such as `BTN_GAMEPAD` and `BTN_SOUTH` compare equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Capability {
    pub kind: CapabilityKind,
    pub code: u16,
}

impl Capability {
    /// Creates an axis capability with the given `ABS_*` code.
    pub const fn axis(code: u16) -> Self {
        Self {
            kind: CapabilityKind::Axis,
            code,
        }
    }

    /// Creates a button capability with the given `BTN_*` code.
    pub const fn button(code: u16) -> Self {
        Self {
            kind: CapabilityKind::Button,
            code,
        }
    }

    /// Looks up a capability by its Linux event name.
    pub fn from_name(name: &str) -> Option<Self> {
        linux_codes::lookup(name).map(|(kind, code)| Self { kind, code })
    }

    pub fn is_axis(&self) -> bool {
        self.kind == CapabilityKind::Axis
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(name) = linux_codes::canonical_name(self.kind, self.code) {
            return f.write_str(name);
        }
        match (self.kind, linux_codes::trigger_happy_index(self.code)) {
            (CapabilityKind::Button, Some(n)) => write!(f, "BTN_TRIGGER_HAPPY{n}"),
            (CapabilityKind::Axis, _) => write!(f, "ABS_0x{:02x}", self.code),
            (CapabilityKind::Button, None) => write!(f, "BTN_0x{:03x}", self.code),
        }
    }
}

/// Resolves a comma-separated token string into an ordered capability list.
///
/// Every whole token that is an alias is replaced by its expansion, the
/// result is split again, and each resulting name is looked up.  Tokens are
/// trimmed of surrounding whitespace.
///
/// # Errors
///
/// Returns [`VocabularyError::UnknownCapability`] naming the first token
/// (after expansion) that is not a catalogued capability.  An empty token,
/// as in `"j1,,b1"`, is unknown.
///
/// # Examples
///
/// ```rust
/// use padlink_core::vocabulary::{resolve, AliasTable, Capability};
///
/// let caps = resolve("j1,b1", &AliasTable::builtin()).unwrap();
/// assert_eq!(
///     caps,
///     vec![
///         Capability::axis(0x00),
///         Capability::axis(0x01),
///         Capability::button(0x130),
///     ]
/// );
/// ```
pub fn resolve(tokens: &str, aliases: &AliasTable) -> Result<Vec<Capability>, VocabularyError> {
    let mut capabilities = Vec::new();
    for token in tokens.split(TOKEN_SEPARATOR).map(str::trim) {
        match aliases.expand(token) {
            Some(expansion) => {
                for name in expansion.split(TOKEN_SEPARATOR).map(str::trim) {
                    capabilities.push(lookup_token(name)?);
                }
            }
            None => capabilities.push(lookup_token(token)?),
        }
    }
    Ok(capabilities)
}

fn lookup_token(name: &str) -> Result<Capability, VocabularyError> {
    Capability::from_name(name).ok_or_else(|| VocabularyError::UnknownCapability(name.to_string()))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
