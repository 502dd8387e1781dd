//! Message dispatch.
//!
//! `Dispatcher::dispatch` never fails: unknown patterns and argument
//! mismatches come back as "not handled", and anything a handler raises
//! (error or panic) is logged and contained.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use log::{debug, info, warn};

use tracklink_types::{HostControl, IncomingMessage, RuntimeArgument};

use crate::action::ActionContext;
use crate::introspect::{describe_all, ActionDescription};
use crate::registry::Registry;
use crate::validate::{validate, Mismatch};

/// Detailed result of one dispatch. Only `is_handled` is part of the
/// caller-facing contract; the rest is diagnostic detail.
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    /// Handler ran to completion.
    Handled,
    /// Handler was invoked and failed; the failure was contained.
    HandlerFailed(String),
    UnknownPattern,
    Rejected(Mismatch),
}

impl DispatchOutcome {
    /// True once a handler has been invoked, whatever it did internally.
    pub fn is_handled(&self) -> bool {
        matches!(self, DispatchOutcome::Handled | DispatchOutcome::HandlerFailed(_))
    }
}

/// Routes messages to the actions of a frozen registry.
#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<Registry>,
    log_rejections: bool,
}

impl Dispatcher {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self {
            registry,
            log_rejections: false,
        }
    }

    /// Log unknown patterns and argument mismatches at debug level.
    pub fn with_rejection_log(mut self, enabled: bool) -> Self {
        self.log_rejections = enabled;
        self
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn describe_all(&self) -> Vec<ActionDescription> {
        describe_all(&self.registry)
    }

    /// Dispatch one message. Returns whether a handler was invoked.
    pub fn dispatch(
        &self,
        host: &mut dyn HostControl,
        pattern: &str,
        arguments: &[RuntimeArgument],
    ) -> bool {
        self.dispatch_detailed(host, pattern, arguments).is_handled()
    }

    pub fn dispatch_message(
        &self,
        host: &mut dyn HostControl,
        message: &IncomingMessage,
    ) -> DispatchOutcome {
        self.dispatch_detailed(host, &message.pattern, &message.arguments)
    }

    pub fn dispatch_detailed(
        &self,
        host: &mut dyn HostControl,
        pattern: &str,
        arguments: &[RuntimeArgument],
    ) -> DispatchOutcome {
        let Some((action, indices)) = self.registry.resolve(pattern) else {
            if self.log_rejections {
                debug!(target: "dispatch", "unknown pattern {} ({} args)", pattern, arguments.len());
            }
            return DispatchOutcome::UnknownPattern;
        };

        let values = match validate(action, arguments) {
            Ok(values) => values,
            Err(mismatch) => {
                if self.log_rejections {
                    debug!(target: "dispatch", "rejected {}: {}", pattern, mismatch);
                }
                return DispatchOutcome::Rejected(mismatch);
            }
        };

        let mut ctx = ActionContext {
            host,
            args: &values,
            indices: &indices,
        };
        let handler = &action.handler;
        match panic::catch_unwind(AssertUnwindSafe(|| handler(&mut ctx))) {
            Ok(Ok(())) => DispatchOutcome::Handled,
            Ok(Err(e)) => {
                warn!(target: "dispatch", "action {} failed: {}", action.pattern, e);
                DispatchOutcome::HandlerFailed(e.to_string())
            }
            Err(payload) => {
                let msg = panic_message(payload.as_ref());
                warn!(target: "dispatch", "action {} panicked: {}", action.pattern, msg);
                DispatchOutcome::HandlerFailed(msg)
            }
        }
    }

    /// Dispatch a batch in order, returning how many were handled.
    pub fn dispatch_all<'m>(
        &self,
        host: &mut dyn HostControl,
        messages: impl IntoIterator<Item = &'m IncomingMessage>,
    ) -> usize {
        let mut handled = 0;
        for message in messages {
            if self.dispatch_message(host, message).is_handled() {
                handled += 1;
            }
        }
        if handled > 0 {
            info!(target: "dispatch", "handled {} messages", handled);
        }
        handled
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "handler panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use tracklink_types::{TypeTag, Value, BPM_RANGE};

    use super::*;
    use crate::action::HandlerError;
    use crate::host::MemoryHost;
    use crate::registry::{ActionSpec, RegistryBuilder};

    fn dispatcher(specs: Vec<ActionSpec>) -> Dispatcher {
        let mut builder = RegistryBuilder::new();
        for spec in specs {
            builder.register(spec).unwrap();
        }
        Dispatcher::new(Arc::new(builder.build())).with_rejection_log(true)
    }

    #[test]
    fn number_string_action() {
        let calls = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&calls);
        let d = dispatcher(vec![ActionSpec::new("/pair")
            .argument("n", TypeTag::Number)
            .argument("s", TypeTag::String)
            .handler(move |ctx| {
                assert_eq!(ctx.args, &[Value::Number(42.0), Value::String("x".into())]);
                c.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })]);
        let mut host = MemoryHost::new();

        assert!(d.dispatch(
            &mut host,
            "/pair",
            &[RuntimeArgument::number(42.0), RuntimeArgument::string("x")]
        ));
        assert!(!d.dispatch(
            &mut host,
            "/pair",
            &[RuntimeArgument::string("42"), RuntimeArgument::string("x")]
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn wrong_arity_not_handled() {
        let calls = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&calls);
        let d = dispatcher(vec![ActionSpec::new("/one")
            .argument("n", TypeTag::Number)
            .handler(move |_| {
                c.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })]);
        let mut host = MemoryHost::new();

        assert!(!d.dispatch(&mut host, "/one", &[]));
        assert!(!d.dispatch(
            &mut host,
            "/one",
            &[RuntimeArgument::number(1.0), RuntimeArgument::number(2.0)]
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn unknown_pattern_has_no_side_effect() {
        let d = dispatcher(vec![ActionSpec::new("/known").handler(|ctx| {
            ctx.host.start_playing();
            Ok(())
        })]);
        let mut host = MemoryHost::new();

        let outcome = d.dispatch_detailed(&mut host, "/unknown", &[]);
        assert_eq!(outcome, DispatchOutcome::UnknownPattern);
        assert!(!host.playing);
    }

    #[test]
    fn rejection_detail_distinguishes_mismatch() {
        let d = dispatcher(vec![ActionSpec::new("/b")
            .argument("on", TypeTag::Boolean)
            .handler(|_| Ok(()))]);
        let mut host = MemoryHost::new();

        let outcome = d.dispatch_detailed(&mut host, "/b", &[RuntimeArgument::number(1.0)]);
        assert!(matches!(outcome, DispatchOutcome::Rejected(Mismatch::Type { index: 0, .. })));
        assert!(!outcome.is_handled());
    }

    #[test]
    fn handler_error_is_contained() {
        let d = dispatcher(vec![
            ActionSpec::new("/fail").handler(|_| Err(HandlerError::failed("boom"))),
            ActionSpec::new("/ok").handler(|_| Ok(())),
        ]);
        let mut host = MemoryHost::new();

        let outcome = d.dispatch_detailed(&mut host, "/fail", &[]);
        assert_eq!(outcome, DispatchOutcome::HandlerFailed("boom".into()));
        assert!(outcome.is_handled());
        assert!(d.dispatch(&mut host, "/ok", &[]));
    }

    #[test]
    fn handler_panic_is_contained() {
        let d = dispatcher(vec![
            ActionSpec::new("/panic").handler(|_| panic!("handler blew up")),
            ActionSpec::new("/ok").handler(|_| Ok(())),
        ]);
        let mut host = MemoryHost::new();

        assert!(d.dispatch(&mut host, "/panic", &[]));
        assert_eq!(
            d.dispatch_detailed(&mut host, "/panic", &[]),
            DispatchOutcome::HandlerFailed("handler blew up".into())
        );
        assert!(d.dispatch(&mut host, "/ok", &[]));
    }

    #[test]
    fn validator_ignores_range_handler_clamps() {
        let d = dispatcher(vec![ActionSpec::new("/transport/bpm")
            .argument("bpm", TypeTag::Number)
            .handler(|ctx| {
                let bpm = ctx.number(0)?.clamp(*BPM_RANGE.start(), *BPM_RANGE.end());
                ctx.host.set_bpm(bpm);
                Ok(())
            })]);
        let mut host = MemoryHost::new();

        assert!(d.dispatch(&mut host, "/transport/bpm", &[RuntimeArgument::number(1200.0)]));
        assert_eq!(host.bpm, 999.0);
    }

    #[test]
    fn placeholder_indices_reach_handler() {
        let d = dispatcher(vec![ActionSpec::new("/song/track/XXX/mute").handler(|ctx| {
            let track = ctx.placeholder_track()?;
            ctx.host.set_track_mute(track, true);
            Ok(())
        })]);
        let mut host = MemoryHost::new();

        assert!(d.dispatch(&mut host, "/song/track/2/mute", &[]));
        assert!(host.tracks[1].muted);
        assert!(!host.tracks[0].muted);
    }

    #[test]
    fn dispatch_all_counts_handled() {
        let d = dispatcher(vec![ActionSpec::new("/a").handler(|_| Ok(()))]);
        let mut host = MemoryHost::new();
        let messages = vec![
            IncomingMessage::new("/a", vec![]),
            IncomingMessage::new("/b", vec![]),
            IncomingMessage::new("/a", vec![RuntimeArgument::nil()]),
            IncomingMessage::new("/a", vec![]),
        ];
        assert_eq!(d.dispatch_all(&mut host, &messages), 2);
    }
}
