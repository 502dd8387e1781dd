use tracklink_types::TypeTag;

use crate::registry::{ActionSpec, RegistrationError, RegistryBuilder};

pub(super) fn register(builder: &mut RegistryBuilder) -> Result<(), RegistrationError> {
    builder.register(
        ActionSpec::new("/transport/start")
            .description("Start playback")
            .handler(|ctx| {
                ctx.host.start_playing();
                Ok(())
            }),
    )?;
    builder.register(
        ActionSpec::new("/transport/stop")
            .description("Stop playback")
            .handler(|ctx| {
                ctx.host.stop_playing();
                Ok(())
            }),
    )?;
    builder.register(
        ActionSpec::new("/transport/continue")
            .description("Continue playback from the current position")
            .handler(|ctx| {
                ctx.host.continue_playing();
                Ok(())
            }),
    )?;
    builder.register(
        ActionSpec::new("/transport/panic")
            .description("Stop playback and silence all voices")
            .handler(|ctx| {
                ctx.host.panic();
                Ok(())
            }),
    )?;
    builder.register(
        ActionSpec::new("/transport/loop/pattern")
            .description("Enable or disable pattern looping")
            .argument("enabled", TypeTag::Boolean)
            .handler(|ctx| {
                let enabled = ctx.boolean(0)?;
                ctx.host.set_loop_pattern(enabled);
                Ok(())
            }),
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use tracklink_types::RuntimeArgument;

    use crate::actions::tests::builtin_dispatcher;
    use crate::host::MemoryHost;

    #[test]
    fn start_stop_continue() {
        let d = builtin_dispatcher();
        let mut host = MemoryHost::new();

        assert!(d.dispatch(&mut host, "/transport/start", &[]));
        assert!(host.playing);
        assert!(d.dispatch(&mut host, "/transport/stop", &[]));
        assert!(!host.playing);
        assert!(d.dispatch(&mut host, "/transport/continue", &[]));
        assert!(host.playing);
    }

    #[test]
    fn panic_stops_playback() {
        let d = builtin_dispatcher();
        let mut host = MemoryHost::new();
        host.playing = true;

        assert!(d.dispatch(&mut host, "/transport/panic", &[]));
        assert!(!host.playing);
        assert_eq!(host.panic_count, 1);
    }

    #[test]
    fn loop_pattern_takes_boolean() {
        let d = builtin_dispatcher();
        let mut host = MemoryHost::new();

        assert!(d.dispatch(
            &mut host,
            "/transport/loop/pattern",
            &[RuntimeArgument::boolean(true)]
        ));
        assert!(host.loop_pattern);
        assert!(!d.dispatch(
            &mut host,
            "/transport/loop/pattern",
            &[RuntimeArgument::number(0.0)]
        ));
        assert!(host.loop_pattern);
    }
}
