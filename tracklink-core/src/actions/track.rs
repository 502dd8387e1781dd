//! Track-scoped actions. The `XXX` segment is the 1-based track index,
//! `-1` for the selected track.

use tracklink_types::{TypeTag, TRACK_PANNING_RANGE, TRACK_VOLUME_RANGE};

use crate::registry::{ActionSpec, RegistrationError, RegistryBuilder};

pub(super) fn register(builder: &mut RegistryBuilder) -> Result<(), RegistrationError> {
    builder.register(
        ActionSpec::new("/song/track/XXX/mute")
            .description("Mute the given track")
            .handler(|ctx| {
                let track = ctx.placeholder_track()?;
                ctx.host.set_track_mute(track, true);
                Ok(())
            }),
    )?;
    builder.register(
        ActionSpec::new("/song/track/XXX/unmute")
            .description("Unmute the given track")
            .handler(|ctx| {
                let track = ctx.placeholder_track()?;
                ctx.host.set_track_mute(track, false);
                Ok(())
            }),
    )?;
    builder.register(
        ActionSpec::new("/song/track/XXX/solo")
            .description("Solo the given track")
            .handler(|ctx| {
                let track = ctx.placeholder_track()?;
                ctx.host.solo_track(track);
                Ok(())
            }),
    )?;
    builder.register(
        ActionSpec::new("/song/track/XXX/postfx_volume")
            .description("Set the track's post-fx volume (0 - 1.4125)")
            .argument("volume", TypeTag::Number)
            .handler(|ctx| {
                let track = ctx.placeholder_track()?;
                let volume = ctx
                    .number(0)?
                    .clamp(*TRACK_VOLUME_RANGE.start(), *TRACK_VOLUME_RANGE.end());
                ctx.host.set_track_volume(track, volume);
                Ok(())
            }),
    )?;
    builder.register(
        ActionSpec::new("/song/track/XXX/postfx_panning")
            .description("Set the track's post-fx panning (-1 - 1)")
            .argument("panning", TypeTag::Number)
            .handler(|ctx| {
                let track = ctx.placeholder_track()?;
                let panning = ctx
                    .number(0)?
                    .clamp(*TRACK_PANNING_RANGE.start(), *TRACK_PANNING_RANGE.end());
                ctx.host.set_track_panning(track, panning);
                Ok(())
            }),
    )?;
    Ok(())
}
