//! Domain model (IDs, envelope, state machine, errors).

pub mod envelope;
pub mod errors;
pub mod ids;
pub mod state;

pub use self::envelope::EventEnvelope;
pub use self::errors::RelayError;
pub use self::ids::{EventId, MessageId};
pub use self::state::EventState;
