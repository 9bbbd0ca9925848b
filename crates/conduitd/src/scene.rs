//! In-memory scene host used by the standalone daemon.
//!
//! [`SceneHost`] is a small level of named actors. [`SceneCommands`] exposes
//! the actor manipulation commands a controller expects from an editor
//! session. Domain failures come back as response-shaped objects with the
//! codes `INVALID_PARAMS`, `ACTOR_EXISTS` and `ACTOR_NOT_FOUND`.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{Value, json};
use thiserror::Error;

use crate::dispatch::error_result;
use crate::host::{
    CapabilityRegistry, CommandFault, CommandGroup, HostContext, JsonObject, RegistryError,
};

/// Command types served by [`SceneCommands`].
pub const SCENE_COMMANDS: &[&str] = &[
    "get_actors_in_level",
    "find_actors_by_name",
    "spawn_actor",
    "delete_actor",
    "set_actor_transform",
    "get_actor_properties",
    "set_actor_property",
];

/// One actor in the scene.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Actor {
    pub name: String,
    #[serde(rename = "type")]
    pub actor_type: String,
    pub location: [f64; 3],
    pub rotation: [f64; 3],
    pub scale: [f64; 3],
    pub properties: JsonObject,
}

impl Actor {
    fn new(name: &str, actor_type: &str) -> Self {
        Self {
            name: name.to_string(),
            actor_type: actor_type.to_string(),
            location: [0.0; 3],
            rotation: [0.0; 3],
            scale: [1.0; 3],
            properties: JsonObject::new(),
        }
    }
}

/// Host state: the actors of the current level.
#[derive(Debug, Clone)]
pub struct SceneHost {
    interactive: bool,
    actors: BTreeMap<String, Actor>,
}

impl Default for SceneHost {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneHost {
    /// Creates an empty, interactive scene.
    #[must_use]
    pub fn new() -> Self {
        Self {
            interactive: true,
            actors: BTreeMap::new(),
        }
    }

    /// Marks the scene as editable or not; non-interactive scenes refuse
    /// every bridge command.
    pub fn set_interactive(&mut self, interactive: bool) {
        self.interactive = interactive;
    }

    #[must_use]
    pub fn actor(&self, name: &str) -> Option<&Actor> {
        self.actors.get(name)
    }

    pub fn actors(&self) -> impl Iterator<Item = &Actor> {
        self.actors.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.actors.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.actors.is_empty()
    }
}

impl HostContext for SceneHost {
    fn is_interactive(&self) -> bool {
        self.interactive
    }
}

#[derive(Debug, Error)]
enum SceneError {
    #[error("Missing '{0}' parameter")]
    MissingParam(&'static str),
    #[error("Parameter '{name}' must be {expected}")]
    InvalidParam {
        name: &'static str,
        expected: &'static str,
    },
    #[error("Actor with name '{0}' already exists")]
    ActorExists(String),
    #[error("Actor not found: {0}")]
    ActorNotFound(String),
    #[error(transparent)]
    Fault(#[from] CommandFault),
}

impl SceneError {
    fn code(&self) -> &'static str {
        match self {
            Self::MissingParam(_) | Self::InvalidParam { .. } => "INVALID_PARAMS",
            Self::ActorExists(_) => "ACTOR_EXISTS",
            Self::ActorNotFound(_) => "ACTOR_NOT_FOUND",
            Self::Fault(_) => "EXCEPTION",
        }
    }
}

impl From<serde_json::Error> for SceneError {
    fn from(error: serde_json::Error) -> Self {
        Self::Fault(CommandFault::from(error))
    }
}

/// Actor manipulation commands.
#[derive(Debug, Default, Clone, Copy)]
pub struct SceneCommands;

impl CommandGroup<SceneHost> for SceneCommands {
    fn handle_command(
        &self,
        host: &mut SceneHost,
        command_type: &str,
        params: &JsonObject,
    ) -> Result<JsonObject, CommandFault> {
        let outcome = match command_type {
            "get_actors_in_level" => actors_in_level(host),
            "find_actors_by_name" => find_actors_by_name(host, params),
            "spawn_actor" => spawn_actor(host, params),
            "delete_actor" => delete_actor(host, params),
            "set_actor_transform" => set_actor_transform(host, params),
            "get_actor_properties" => actor_properties(host, params),
            "set_actor_property" => set_actor_property(host, params),
            other => {
                return Err(CommandFault::new(format!(
                    "scene commands cannot serve '{other}'"
                )));
            }
        };
        match outcome {
            Ok(result) => Ok(result),
            Err(SceneError::Fault(fault)) => Err(fault),
            Err(error) => Ok(error_result(error.code(), &error.to_string(), None)),
        }
    }
}

/// Builds the registry served by the standalone daemon.
///
/// # Errors
///
/// Returns [`RegistryError`] if the command table is inconsistent.
pub fn registry() -> Result<CapabilityRegistry<SceneHost>, RegistryError> {
    CapabilityRegistry::builder()
        .group(SCENE_COMMANDS, SceneCommands)
        .build()
}

fn actors_in_level(host: &SceneHost) -> Result<JsonObject, SceneError> {
    let actors = host
        .actors()
        .map(serde_json::to_value)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(object([("actors", Value::Array(actors))]))
}

fn find_actors_by_name(host: &SceneHost, params: &JsonObject) -> Result<JsonObject, SceneError> {
    let pattern = required_str(params, "pattern")?;
    let actors = host
        .actors()
        .filter(|actor| name_matches(pattern, &actor.name))
        .map(serde_json::to_value)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(object([("actors", Value::Array(actors))]))
}

fn spawn_actor(host: &mut SceneHost, params: &JsonObject) -> Result<JsonObject, SceneError> {
    let name = required_str(params, "name")?;
    let actor_type = required_str(params, "type")?;
    if host.actors.contains_key(name) {
        return Err(SceneError::ActorExists(name.to_string()));
    }
    let mut actor = Actor::new(name, actor_type);
    apply_transform(&mut actor, params)?;
    let result = actor_object(&actor)?;
    host.actors.insert(name.to_string(), actor);
    Ok(result)
}

fn delete_actor(host: &mut SceneHost, params: &JsonObject) -> Result<JsonObject, SceneError> {
    let name = required_str(params, "name")?;
    let actor = host
        .actors
        .remove(name)
        .ok_or_else(|| SceneError::ActorNotFound(name.to_string()))?;
    Ok(object([("deleted_actor", serde_json::to_value(&actor)?)]))
}

fn set_actor_transform(host: &mut SceneHost, params: &JsonObject) -> Result<JsonObject, SceneError> {
    let actor = actor_mut(host, params)?;
    apply_transform(actor, params)?;
    actor_object(actor)
}

fn actor_properties(host: &SceneHost, params: &JsonObject) -> Result<JsonObject, SceneError> {
    let name = required_str(params, "name")?;
    let actor = host
        .actor(name)
        .ok_or_else(|| SceneError::ActorNotFound(name.to_string()))?;
    actor_object(actor)
}

fn set_actor_property(host: &mut SceneHost, params: &JsonObject) -> Result<JsonObject, SceneError> {
    let property = required_str(params, "property_name")?.to_string();
    let value = params
        .get("property_value")
        .cloned()
        .ok_or(SceneError::MissingParam("property_value"))?;
    let actor = actor_mut(host, params)?;
    actor.properties.insert(property.clone(), value.clone());
    Ok(object([
        ("actor", json!(actor.name)),
        ("property", json!(property)),
        ("value", value),
    ]))
}

fn actor_mut<'a>(host: &'a mut SceneHost, params: &JsonObject) -> Result<&'a mut Actor, SceneError> {
    let name = required_str(params, "name")?;
    host.actors
        .get_mut(name)
        .ok_or_else(|| SceneError::ActorNotFound(name.to_string()))
}

fn apply_transform(actor: &mut Actor, params: &JsonObject) -> Result<(), SceneError> {
    if let Some(location) = optional_vector(params, "location")? {
        actor.location = location;
    }
    if let Some(rotation) = optional_vector(params, "rotation")? {
        actor.rotation = rotation;
    }
    if let Some(scale) = optional_vector(params, "scale")? {
        actor.scale = scale;
    }
    Ok(())
}

fn required_str<'a>(params: &'a JsonObject, name: &'static str) -> Result<&'a str, SceneError> {
    match params.get(name) {
        None | Some(Value::Null) => Err(SceneError::MissingParam(name)),
        Some(Value::String(value)) => Ok(value),
        Some(_) => Err(SceneError::InvalidParam {
            name,
            expected: "a string",
        }),
    }
}

fn optional_vector(params: &JsonObject, name: &'static str) -> Result<Option<[f64; 3]>, SceneError> {
    let Some(value) = params.get(name) else {
        return Ok(None);
    };
    serde_json::from_value::<[f64; 3]>(value.clone())
        .map(Some)
        .map_err(|_| SceneError::InvalidParam {
            name,
            expected: "an array of three numbers",
        })
}

fn actor_object(actor: &Actor) -> Result<JsonObject, SceneError> {
    match serde_json::to_value(actor)? {
        Value::Object(object) => Ok(object),
        _ => Err(SceneError::Fault(CommandFault::new("actor did not serialize to an object"))),
    }
}

fn object<const N: usize>(entries: [(&str, Value); N]) -> JsonObject {
    entries
        .into_iter()
        .map(|(key, value)| (key.to_string(), value))
        .collect()
}

/// Matches `name` against a pattern with `*` and `?` wildcards. A pattern
/// without wildcards matches any name containing it.
fn name_matches(pattern: &str, name: &str) -> bool {
    if !pattern.contains(['*', '?']) {
        return name.contains(pattern);
    }
    let pattern: Vec<char> = pattern.chars().collect();
    let name: Vec<char> = name.chars().collect();
    let (mut p, mut n) = (0, 0);
    let mut backtrack: Option<(usize, usize)> = None;
    while n < name.len() {
        match pattern.get(p) {
            Some('*') => {
                backtrack = Some((p, n));
                p += 1;
            }
            Some('?') => {
                p += 1;
                n += 1;
            }
            Some(ch) if *ch == name[n] => {
                p += 1;
                n += 1;
            }
            _ => match backtrack {
                Some((star, matched)) => {
                    p = star + 1;
                    n = matched + 1;
                    backtrack = Some((star, matched + 1));
                }
                None => return false,
            },
        }
    }
    pattern[p..].iter().all(|ch| *ch == '*')
}
