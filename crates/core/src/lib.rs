//! `warden-core`: shared primitives for the warden auth workspace.
//!
//! Time sources, identifiers, and the identifier error model. Nothing in here
//! performs IO.

pub mod clock;
pub mod error;
pub mod id;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{IdError, IdResult};
pub use id::{SubjectId, TokenId};
