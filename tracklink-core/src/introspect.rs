//! Read-only listing of registered actions for discovery tools.

use serde::Serialize;

use tracklink_types::TypeTag;

use crate::registry::Registry;

/// One entry of the action listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionDescription {
    pub name: String,
    pub description: String,
    pub arguments: Vec<TypeTag>,
}

/// Describe every registered action, in registration order.
pub fn describe_all(registry: &Registry) -> Vec<ActionDescription> {
    registry
        .list_all()
        .iter()
        .map(|action| ActionDescription {
            name: action.pattern.clone(),
            description: action.description.clone(),
            arguments: action.argument_types(),
        })
        .collect()
}

/// The listing as pretty-printed JSON.
pub fn describe_all_json(registry: &Registry) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&describe_all(registry))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tracklink_types::RuntimeArgument;

    use super::*;
    use crate::dispatch::Dispatcher;
    use crate::host::MemoryHost;
    use crate::registry::{ActionSpec, RegistryBuilder};

    fn registry() -> Registry {
        let mut builder = RegistryBuilder::new();
        builder
            .register(
                ActionSpec::new("/song/bpm")
                    .description("Set the song tempo")
                    .argument("bpm", TypeTag::Number)
                    .handler(|_| Ok(())),
            )
            .unwrap();
        builder
            .register(
                ActionSpec::new("/note")
                    .argument("on", TypeTag::Boolean)
                    .argument("name", TypeTag::String)
                    .handler(|_| Ok(())),
            )
            .unwrap();
        builder
            .register(ActionSpec::new("/transport/start").handler(|_| Ok(())))
            .unwrap();
        builder.build()
    }

    #[test]
    fn one_entry_per_action() {
        let listing = describe_all(&registry());
        assert_eq!(listing.len(), 3);
        assert_eq!(
            listing[0],
            ActionDescription {
                name: "/song/bpm".into(),
                description: "Set the song tempo".into(),
                arguments: vec![TypeTag::Number],
            }
        );
        assert_eq!(listing[1].arguments, vec![TypeTag::Boolean, TypeTag::String]);
        assert!(listing[2].arguments.is_empty());
    }

    #[test]
    fn listing_unaffected_by_dispatch() {
        let dispatcher = Dispatcher::new(Arc::new(registry()));
        let before = dispatcher.describe_all();

        let mut host = MemoryHost::new();
        dispatcher.dispatch(&mut host, "/song/bpm", &[RuntimeArgument::number(90.0)]);
        dispatcher.dispatch(&mut host, "/missing", &[]);
        dispatcher.dispatch(&mut host, "/note", &[RuntimeArgument::nil()]);

        assert_eq!(dispatcher.describe_all(), before);
    }

    #[test]
    fn json_uses_type_names() {
        let json = describe_all_json(&registry()).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed[0]["name"], "/song/bpm");
        assert_eq!(parsed[0]["arguments"][0], "number");
        assert_eq!(parsed[1]["arguments"][1], "string");
        assert_eq!(parsed[2]["description"], "No description available");
    }
}
