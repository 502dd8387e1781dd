use tracklink_types::{TypeTag, NOTE_RANGE, VELOCITY_RANGE};

use crate::action::{ActionContext, HandlerError};
use crate::registry::{ActionSpec, RegistrationError, RegistryBuilder};

pub(super) fn register(builder: &mut RegistryBuilder) -> Result<(), RegistrationError> {
    builder.register(
        ActionSpec::new("/trigger/note_on")
            .description("Play a note (instrument and track -1 = selected)")
            .argument("instrument", TypeTag::Number)
            .argument("track", TypeTag::Number)
            .argument("note", TypeTag::Number)
            .argument("velocity", TypeTag::Number)
            .handler(|ctx| {
                let (instrument, track) = instrument_and_track(ctx)?;
                let note = ctx.clamped_u8(2, *NOTE_RANGE.start(), *NOTE_RANGE.end())?;
                let velocity = ctx.clamped_u8(3, *VELOCITY_RANGE.start(), *VELOCITY_RANGE.end())?;
                ctx.host.note_on(instrument, track, note, velocity);
                Ok(())
            }),
    )?;
    builder.register(
        ActionSpec::new("/trigger/note_off")
            .description("Release a note (instrument and track -1 = selected)")
            .argument("instrument", TypeTag::Number)
            .argument("track", TypeTag::Number)
            .argument("note", TypeTag::Number)
            .handler(|ctx| {
                let (instrument, track) = instrument_and_track(ctx)?;
                let note = ctx.clamped_u8(2, *NOTE_RANGE.start(), *NOTE_RANGE.end())?;
                ctx.host.note_off(instrument, track, note);
                Ok(())
            }),
    )?;
    Ok(())
}

fn instrument_and_track(ctx: &ActionContext<'_>) -> Result<(usize, usize), HandlerError> {
    let instrument = ctx.instrument(ctx.number(0)?.round() as i64)?;
    let track = ctx.track(ctx.number(1)?.round() as i64)?;
    Ok((instrument, track))
}
