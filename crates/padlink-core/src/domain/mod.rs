//! Domain entities for padlink.
//!
//! Pure data with no infrastructure dependencies.  The only entity is the
//! [`layout::Layout`]: the ordered capability list a client negotiated.

pub mod layout;
