//! Canonical, host-independent vocabulary.
//!
//! Everything the engine emits is expressed in these types; host adapters
//! translate their own protocol words into them.

pub mod label;
pub mod state;

pub use label::Label;
pub use state::{CheckState, ExternalState, HostKind, ParseEnumError, RawState, ReviewState};
