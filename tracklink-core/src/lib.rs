//! # tracklink-core
//!
//! Message dispatch for remote control of a host application. Incoming
//! messages (a pattern plus typed arguments, already decoded by a transport)
//! are matched against a registry of actions, validated, and handed to the
//! bound handler. One of those actions evaluates caller-supplied Lua inside a
//! per-call sandbox.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use tracklink_core::{actions, config::Config, Dispatcher, MemoryHost, RegistryBuilder};
//! use tracklink_types::RuntimeArgument;
//!
//! let config = Config::load();
//! let mut builder = RegistryBuilder::new();
//! actions::register_builtin(&mut builder, &config.dispatch)?;
//! let dispatcher = Dispatcher::new(Arc::new(builder.build()))
//!     .with_rejection_log(config.dispatch.log_rejections);
//!
//! let mut host = MemoryHost::new();
//! let handled = dispatcher.dispatch(&mut host, "/song/bpm", &[RuntimeArgument::number(140.0)]);
//! ```
//!
//! ## Module Overview
//!
//! - [`registry`]: `ActionSpec`, `RegistryBuilder` (startup registration), frozen `Registry`
//! - [`validate`]: arity and positional type matching
//! - [`dispatch`]: `Dispatcher`, `DispatchOutcome`, handler failure containment
//! - [`sandbox`]: `Evaluator`: one fresh Lua VM per evaluation
//! - [`introspect`]: read-only listing of registered actions
//! - [`actions`]: built-in action set
//! - [`host`]: `MemoryHost`, an in-memory `HostControl`
//! - [`config`]: TOML configuration (embedded defaults + user override)

pub mod action;
pub mod actions;
pub mod config;
pub mod dispatch;
pub mod host;
pub mod introspect;
pub mod registry;
pub mod sandbox;
pub mod validate;

pub use action::{ActionContext, Handler, HandlerError, HandlerResult};
pub use actions::register_builtin;
pub use config::{Config, ConfigError, DispatchSettings, ServerSettings};
pub use dispatch::{DispatchOutcome, Dispatcher};
pub use host::MemoryHost;
pub use introspect::{describe_all, ActionDescription};
pub use registry::{
    ActionDescriptor, ActionSpec, ArgumentSpec, Registry, RegistrationError, RegistryBuilder,
};
pub use sandbox::{EvalError, Evaluation, Evaluator};
pub use validate::{validate, Mismatch};
