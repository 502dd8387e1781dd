use log::{info, warn};

use tracklink_types::TypeTag;

use crate::registry::{ActionSpec, RegistrationError, RegistryBuilder};
use crate::sandbox::{Evaluation, Evaluator};

pub(super) fn register(builder: &mut RegistryBuilder) -> Result<(), RegistrationError> {
    let evaluator = Evaluator::new();
    builder.register(
        ActionSpec::new("/evaluate")
            .description("Evaluate a Lua expression against the host's control surface")
            .argument("expression", TypeTag::String)
            .handler(move |ctx| {
                let expression = ctx.string(0)?;
                info!(target: "evaluate", "evaluating: {}", expression);
                match evaluator.evaluate(&mut *ctx.host, expression) {
                    Evaluation::Success(Some(value)) => {
                        info!(target: "evaluate", "result: {}", value)
                    }
                    Evaluation::Success(None) => {}
                    Evaluation::Failure(e) => {
                        warn!(target: "evaluate", "{} failed: {}", expression, e)
                    }
                }
                Ok(())
            }),
    )
}
