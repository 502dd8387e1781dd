//! Argument validation: arity, then positional type, no coercion.

use tracklink_types::{RuntimeArgument, TypeTag, Value};

use crate::registry::ActionDescriptor;

/// Why a message did not match its action's argument list.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Mismatch {
    #[error("expected {expected} arguments, got {found}")]
    Arity { expected: usize, found: usize },
    #[error("argument {index} ('{name}') expected {expected}, got {found}")]
    Type {
        index: usize,
        name: String,
        expected: TypeTag,
        found: &'static str,
    },
}

/// Match runtime arguments against the action's declared list.
///
/// Returns the argument values in original order, or the earliest mismatch.
pub fn validate(
    action: &ActionDescriptor,
    arguments: &[RuntimeArgument],
) -> Result<Vec<Value>, Mismatch> {
    if arguments.len() != action.arity() {
        return Err(Mismatch::Arity {
            expected: action.arity(),
            found: arguments.len(),
        });
    }

    for (index, (spec, arg)) in action.arguments.iter().zip(arguments).enumerate() {
        if arg.value.type_tag() != Some(spec.tag) {
            return Err(Mismatch::Type {
                index,
                name: spec.name.clone(),
                expected: spec.tag,
                found: arg.value.type_name(),
            });
        }
    }

    Ok(arguments.iter().map(|a| a.value.clone()).collect())
}
