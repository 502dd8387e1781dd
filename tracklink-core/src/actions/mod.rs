//! Built-in action set.
//!
//! Patterns are relative to the transport's address prefix, so
//! `/tracklink/song/bpm` on the wire arrives here as `/song/bpm`.

mod evaluate;
mod song;
mod track;
mod transport;
mod trigger;

use crate::config::DispatchSettings;
use crate::registry::{RegistrationError, RegistryBuilder};

/// Register every built-in action.
pub fn register_builtin(
    builder: &mut RegistryBuilder,
    settings: &DispatchSettings,
) -> Result<(), RegistrationError> {
    if settings.evaluate {
        evaluate::register(builder)?;
    }
    transport::register(builder)?;
    song::register(builder)?;
    track::register(builder)?;
    trigger::register(builder)?;
    Ok(())
}
