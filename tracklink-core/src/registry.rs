//! Action registry.
//!
//! Actions are registered on a [`RegistryBuilder`] during startup. Every
//! registration is validated immediately so a bad action set fails before any
//! traffic is accepted. [`RegistryBuilder::build`] freezes the set into a
//! read-only [`Registry`] that can be shared across dispatch calls.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use log::debug;

use tracklink_types::TypeTag;

use crate::action::{ActionContext, Handler, HandlerResult};

/// Description stored when a registration does not supply one.
pub const DEFAULT_DESCRIPTION: &str = "No description available";

/// Path segment that stands for a numeric index in a pattern.
pub const INDEX_PLACEHOLDER: &str = "XXX";

/// Registration-time configuration error. Always fatal at startup.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistrationError {
    #[error("action pattern must not be empty")]
    EmptyPattern,
    #[error("action pattern '{0}' must start with '/'")]
    InvalidPattern(String),
    #[error("an action with the pattern '{0}' is already registered")]
    DuplicatePattern(String),
    #[error("action '{0}' has no handler")]
    MissingHandler(String),
    #[error("action '{pattern}': argument '{argument}' has unsupported type '{type_name}' (expected number, string or boolean)")]
    UnsupportedType {
        pattern: String,
        argument: String,
        type_name: String,
    },
    #[error("action '{pattern}': argument {position} has an empty name")]
    EmptyArgumentName { pattern: String, position: usize },
    #[error("action '{pattern}': argument '{argument}' is declared twice")]
    DuplicateArgument { pattern: String, argument: String },
}

/// One positional parameter of an action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgumentSpec {
    pub name: String,
    pub tag: TypeTag,
}

#[derive(Debug, Clone)]
enum DeclaredType {
    Tag(TypeTag),
    Named(String),
}

#[derive(Debug, Clone)]
struct DeclaredArgument {
    name: String,
    kind: DeclaredType,
}

/// Registration request, built fluently and passed to [`RegistryBuilder::register`].
#[derive(Clone)]
pub struct ActionSpec {
    pattern: String,
    description: Option<String>,
    arguments: Vec<DeclaredArgument>,
    handler: Option<Handler>,
}

impl ActionSpec {
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            description: None,
            arguments: Vec::new(),
            handler: None,
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn argument(mut self, name: impl Into<String>, tag: TypeTag) -> Self {
        self.arguments.push(DeclaredArgument {
            name: name.into(),
            kind: DeclaredType::Tag(tag),
        });
        self
    }

    /// Declare an argument by type name (`"number"`, `"string"`, `"boolean"`).
    /// Unknown names are rejected when the action is registered.
    pub fn argument_named(mut self, name: impl Into<String>, type_name: impl Into<String>) -> Self {
        self.arguments.push(DeclaredArgument {
            name: name.into(),
            kind: DeclaredType::Named(type_name.into()),
        });
        self
    }

    pub fn handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&mut ActionContext<'_>) -> HandlerResult + Send + Sync + 'static,
    {
        self.handler = Some(Arc::new(handler));
        self
    }
}

/// A registered action: pattern, description, argument list, handler.
#[derive(Clone)]
pub struct ActionDescriptor {
    pub pattern: String,
    pub description: String,
    pub arguments: Vec<ArgumentSpec>,
    pub handler: Handler,
}

impl ActionDescriptor {
    pub fn arity(&self) -> usize {
        self.arguments.len()
    }

    pub fn argument_types(&self) -> Vec<TypeTag> {
        self.arguments.iter().map(|a| a.tag).collect()
    }
}

impl fmt::Debug for ActionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionDescriptor")
            .field("pattern", &self.pattern)
            .field("description", &self.description)
            .field("arguments", &self.arguments)
            .finish_non_exhaustive()
    }
}

/// Mutable registration phase.
#[derive(Default)]
pub struct RegistryBuilder {
    actions: Vec<ActionDescriptor>,
    by_pattern: HashMap<String, usize>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and insert an action. On error nothing is inserted.
    pub fn register(&mut self, spec: ActionSpec) -> Result<(), RegistrationError> {
        let ActionSpec {
            pattern,
            description,
            arguments,
            handler,
        } = spec;

        if pattern.is_empty() {
            return Err(RegistrationError::EmptyPattern);
        }
        if !pattern.starts_with('/') {
            return Err(RegistrationError::InvalidPattern(pattern));
        }
        if self.by_pattern.contains_key(&pattern) {
            return Err(RegistrationError::DuplicatePattern(pattern));
        }
        let Some(handler) = handler else {
            return Err(RegistrationError::MissingHandler(pattern));
        };

        let arguments = resolve_arguments(&pattern, arguments)?;

        debug!(target: "registry", "registered {} ({} args)", pattern, arguments.len());
        self.by_pattern.insert(pattern.clone(), self.actions.len());
        self.actions.push(ActionDescriptor {
            pattern,
            description: description.unwrap_or_else(|| DEFAULT_DESCRIPTION.to_string()),
            arguments,
            handler,
        });
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Close the registration phase.
    pub fn build(self) -> Registry {
        Registry {
            actions: self.actions,
            by_pattern: self.by_pattern,
        }
    }
}

fn resolve_arguments(
    pattern: &str,
    declared: Vec<DeclaredArgument>,
) -> Result<Vec<ArgumentSpec>, RegistrationError> {
    let mut seen = HashSet::new();
    let mut resolved = Vec::with_capacity(declared.len());
    for (position, arg) in declared.into_iter().enumerate() {
        if arg.name.trim().is_empty() {
            return Err(RegistrationError::EmptyArgumentName {
                pattern: pattern.to_string(),
                position,
            });
        }
        if !seen.insert(arg.name.clone()) {
            return Err(RegistrationError::DuplicateArgument {
                pattern: pattern.to_string(),
                argument: arg.name,
            });
        }
        let tag = match arg.kind {
            DeclaredType::Tag(tag) => tag,
            DeclaredType::Named(type_name) => match TypeTag::parse(&type_name) {
                Some(tag) => tag,
                None => {
                    return Err(RegistrationError::UnsupportedType {
                        pattern: pattern.to_string(),
                        argument: arg.name,
                        type_name,
                    })
                }
            },
        };
        resolved.push(ArgumentSpec { name: arg.name, tag });
    }
    Ok(resolved)
}

/// Frozen action set. Read-only; share it behind an `Arc`.
#[derive(Debug, Default)]
pub struct Registry {
    actions: Vec<ActionDescriptor>,
    by_pattern: HashMap<String, usize>,
}

impl Registry {
    /// Exact pattern lookup.
    pub fn lookup(&self, pattern: &str) -> Option<&ActionDescriptor> {
        self.by_pattern.get(pattern).map(|&i| &self.actions[i])
    }

    /// Exact lookup, falling back to placeholder matching: numeric path
    /// segments are replaced with `XXX` and returned as indices.
    pub fn resolve(&self, pattern: &str) -> Option<(&ActionDescriptor, Vec<i64>)> {
        if let Some(action) = self.lookup(pattern) {
            return Some((action, Vec::new()));
        }
        let (normalized, indices) = normalize_indices(pattern)?;
        self.lookup(&normalized).map(|action| (action, indices))
    }

    /// All actions in registration order.
    pub fn list_all(&self) -> &[ActionDescriptor] {
        &self.actions
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

/// Replace integer path segments with the placeholder. `None` when the
/// pattern has no integer segments.
fn normalize_indices(pattern: &str) -> Option<(String, Vec<i64>)> {
    let mut indices = Vec::new();
    let normalized: Vec<&str> = pattern
        .split('/')
        .map(|segment| match segment.parse::<i64>() {
            Ok(index) => {
                indices.push(index);
                INDEX_PLACEHOLDER
            }
            Err(_) => segment,
        })
        .collect();
    if indices.is_empty() {
        None
    } else {
        Some((normalized.join("/"), indices))
    }
}
