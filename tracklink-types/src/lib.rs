//! # tracklink-types
//!
//! Shared type definitions for the tracklink remote-control service.
//! This crate holds the message value model consumed by the dispatcher and the
//! host control surface that handlers and the evaluator call into.

mod host;
mod transport;
mod value;

pub use host::{
    resolve_index, HostControl, BPM_RANGE, EDIT_STEP_RANGE, LPB_RANGE, NOTE_RANGE, OCTAVE_RANGE,
    TRACK_PANNING_RANGE, TRACK_VOLUME_RANGE, VELOCITY_RANGE,
};
pub use transport::Protocol;
pub use value::{IncomingMessage, RuntimeArgument, TypeTag, Value};
