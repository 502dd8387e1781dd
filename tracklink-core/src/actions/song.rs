use tracklink_types::{TypeTag, BPM_RANGE, EDIT_STEP_RANGE, LPB_RANGE, OCTAVE_RANGE};

use crate::registry::{ActionSpec, RegistrationError, RegistryBuilder};

pub(super) fn register(builder: &mut RegistryBuilder) -> Result<(), RegistrationError> {
    builder.register(
        ActionSpec::new("/song/bpm")
            .description("Set the song tempo in beats per minute (32 - 999)")
            .argument("bpm", TypeTag::Number)
            .handler(|ctx| {
                let bpm = ctx.number(0)?.clamp(*BPM_RANGE.start(), *BPM_RANGE.end());
                ctx.host.set_bpm(bpm);
                Ok(())
            }),
    )?;
    builder.register(
        ActionSpec::new("/song/lpb")
            .description("Set the song's lines per beat (1 - 255)")
            .argument("lpb", TypeTag::Number)
            .handler(|ctx| {
                let lpb = ctx
                    .number(0)?
                    .round()
                    .clamp(*LPB_RANGE.start() as f64, *LPB_RANGE.end() as f64);
                ctx.host.set_lpb(lpb as u32);
                Ok(())
            }),
    )?;
    builder.register(
        ActionSpec::new("/song/edit/mode")
            .description("Enable or disable edit mode")
            .argument("enabled", TypeTag::Boolean)
            .handler(|ctx| {
                let enabled = ctx.boolean(0)?;
                ctx.host.set_edit_mode(enabled);
                Ok(())
            }),
    )?;
    builder.register(
        ActionSpec::new("/song/edit/octave")
            .description("Set the edit octave (0 - 8)")
            .argument("octave", TypeTag::Number)
            .handler(|ctx| {
                let octave = ctx.clamped_u8(0, *OCTAVE_RANGE.start(), *OCTAVE_RANGE.end())?;
                ctx.host.set_octave(octave);
                Ok(())
            }),
    )?;
    builder.register(
        ActionSpec::new("/song/edit/step")
            .description("Set the edit step (0 - 64)")
            .argument("step", TypeTag::Number)
            .handler(|ctx| {
                let step = ctx.clamped_u8(0, *EDIT_STEP_RANGE.start(), *EDIT_STEP_RANGE.end())?;
                ctx.host.set_edit_step(step);
                Ok(())
            }),
    )?;
    builder.register(
        ActionSpec::new("/song/record/metronome")
            .description("Enable or disable the metronome")
            .argument("enabled", TypeTag::Boolean)
            .handler(|ctx| {
                let enabled = ctx.boolean(0)?;
                ctx.host.set_metronome(enabled);
                Ok(())
            }),
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use tracklink_types::RuntimeArgument;

    use crate::actions::tests::builtin_dispatcher;
    use crate::dispatch::DispatchOutcome;
    use crate::host::MemoryHost;

    #[test]
    fn bpm_clamped_by_handler() {
        let d = builtin_dispatcher();
        let mut host = MemoryHost::new();

        assert!(d.dispatch(&mut host, "/song/bpm", &[RuntimeArgument::number(1200.0)]));
        assert_eq!(host.bpm, 999.0);
        assert!(d.dispatch(&mut host, "/song/bpm", &[RuntimeArgument::number(10.0)]));
        assert_eq!(host.bpm, 32.0);
        assert!(d.dispatch(&mut host, "/song/bpm", &[RuntimeArgument::number(128.5)]));
        assert_eq!(host.bpm, 128.5);
    }

    #[test]
    fn bpm_rejects_numeric_string() {
        let d = builtin_dispatcher();
        let mut host = MemoryHost::new();

        assert!(!d.dispatch(&mut host, "/song/bpm", &[RuntimeArgument::string("140")]));
        assert_eq!(host.bpm, 120.0);
    }

    #[test]
    fn non_finite_bpm_is_a_handler_failure() {
        let d = builtin_dispatcher();
        let mut host = MemoryHost::new();

        let outcome =
            d.dispatch_detailed(&mut host, "/song/bpm", &[RuntimeArgument::number(f64::NAN)]);
        assert!(matches!(outcome, DispatchOutcome::HandlerFailed(_)));
        assert_eq!(host.bpm, 120.0);
    }

    #[test]
    fn lpb_clamped() {
        let d = builtin_dispatcher();
        let mut host = MemoryHost::new();

        assert!(d.dispatch(&mut host, "/song/lpb", &[RuntimeArgument::number(0.0)]));
        assert_eq!(host.lpb, 1);
        assert!(d.dispatch(&mut host, "/song/lpb", &[RuntimeArgument::number(1000.0)]));
        assert_eq!(host.lpb, 255);
    }

    #[test]
    fn edit_settings() {
        let d = builtin_dispatcher();
        let mut host = MemoryHost::new();

        assert!(d.dispatch(&mut host, "/song/edit/mode", &[RuntimeArgument::boolean(true)]));
        assert!(host.edit_mode);
        assert!(d.dispatch(&mut host, "/song/edit/octave", &[RuntimeArgument::number(12.0)]));
        assert_eq!(host.octave, 8);
        assert!(d.dispatch(&mut host, "/song/edit/step", &[RuntimeArgument::number(3.4)]));
        assert_eq!(host.edit_step, 3);
        assert!(d.dispatch(&mut host, "/song/record/metronome", &[RuntimeArgument::boolean(true)]));
        assert!(host.metronome);
    }
}
