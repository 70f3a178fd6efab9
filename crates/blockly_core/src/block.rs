// SPDX-License-Identifier: MIT OR Apache-2.0
//! Block definitions and block instances.

use crate::connection::{ConnectionId, ConnectionType, WorkspacePoint};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockId(pub Uuid);

impl BlockId {
    /// Create a new random block ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for BlockId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kind of input slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InputKind {
    /// Accepts a value block's output
    Value,
    /// Accepts a stack of statement blocks
    Statement,
}

impl InputKind {
    /// Connection type backing this input
    pub fn connection_type(self) -> ConnectionType {
        match self {
            Self::Value => ConnectionType::Input,
            Self::Statement => ConnectionType::Next,
        }
    }
}

/// Placement and checks of one connector in a definition
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConnectorDefinition {
    /// Offset from the block origin
    #[serde(default)]
    pub offset: WorkspacePoint,
    /// Accepted type-check names
    #[serde(default)]
    pub checks: Option<Vec<String>>,
}

impl ConnectorDefinition {
    /// Connector at an offset with no checks
    pub fn at(x: i32, y: i32) -> Self {
        Self {
            offset: WorkspacePoint::new(x, y),
            checks: None,
        }
    }

    /// Restrict to the given checks
    pub fn with_checks<S: Into<String>>(mut self, checks: impl IntoIterator<Item = S>) -> Self {
        self.checks = Some(checks.into_iter().map(Into::into).collect());
        self
    }
}

/// A named input slot in a definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputDefinition {
    /// Input name, unique within the block
    pub name: String,
    /// Value or statement
    pub kind: InputKind,
    /// Connector placement
    #[serde(default)]
    pub connector: ConnectorDefinition,
}

/// Shape of a block type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockDefinition {
    /// Unique type name
    pub name: String,
    /// Previous connector, for statement blocks
    #[serde(default)]
    pub previous: Option<ConnectorDefinition>,
    /// Next connector, for statement blocks
    #[serde(default)]
    pub next: Option<ConnectorDefinition>,
    /// Output connector, for value blocks
    #[serde(default)]
    pub output: Option<ConnectorDefinition>,
    /// Input slots
    #[serde(default)]
    pub inputs: Vec<InputDefinition>,
}

impl BlockDefinition {
    /// A bare definition with no connectors
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            previous: None,
            next: None,
            output: None,
            inputs: Vec::new(),
        }
    }

    /// A statement block with previous and next connectors
    pub fn statement(name: impl Into<String>, height: i32) -> Self {
        Self::new(name)
            .with_previous(ConnectorDefinition::at(0, 0))
            .with_next(ConnectorDefinition::at(0, height))
    }

    /// A value block with an output connector at its origin
    pub fn value(name: impl Into<String>) -> Self {
        Self::new(name).with_output(ConnectorDefinition::at(0, 0))
    }

    /// Set the previous connector
    pub fn with_previous(mut self, connector: ConnectorDefinition) -> Self {
        self.previous = Some(connector);
        self
    }

    /// Set the next connector
    pub fn with_next(mut self, connector: ConnectorDefinition) -> Self {
        self.next = Some(connector);
        self
    }

    /// Set the output connector
    pub fn with_output(mut self, connector: ConnectorDefinition) -> Self {
        self.output = Some(connector);
        self
    }

    /// Add an input slot
    pub fn with_input(
        mut self,
        name: impl Into<String>,
        kind: InputKind,
        connector: ConnectorDefinition,
    ) -> Self {
        self.inputs.push(InputDefinition {
            name: name.into(),
            kind,
            connector,
        });
        self
    }
}

/// A connected input slot on a block instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockInput {
    /// Input name
    pub name: String,
    /// Value or statement
    pub kind: InputKind,
    /// Backing connection
    pub connection: ConnectionId,
}

/// A block instance in the workspace
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Block {
    /// Unique instance ID
    pub id: BlockId,
    /// Name of the definition this block was built from
    pub definition: String,
    /// Origin in workspace coordinates
    pub position: WorkspacePoint,
    /// Whether this is a shadow (placeholder) block
    pub shadow: bool,
    /// Output connection
    pub output: Option<ConnectionId>,
    /// Previous connection
    pub previous: Option<ConnectionId>,
    /// Next connection
    pub next: Option<ConnectionId>,
    /// Input slots
    pub inputs: Vec<BlockInput>,
}

impl Block {
    /// Get an input connection by name
    pub fn input(&self, name: &str) -> Option<ConnectionId> {
        self.inputs
            .iter()
            .find(|input| input.name == name)
            .map(|input| input.connection)
    }

    /// All connections, upstream connectors first and next last
    pub fn connections(&self) -> impl Iterator<Item = ConnectionId> + '_ {
        self.output
            .into_iter()
            .chain(self.previous)
            .chain(self.inputs.iter().map(|input| input.connection))
            .chain(self.next)
    }

    /// The connection that attaches this block to a parent, if any
    pub fn upstream_connection(&self) -> Option<ConnectionId> {
        self.output.or(self.previous)
    }

    /// Connections that may hold child blocks
    pub fn child_connections(&self) -> impl Iterator<Item = ConnectionId> + '_ {
        self.inputs
            .iter()
            .map(|input| input.connection)
            .chain(self.next)
    }
}

/// Registry of available block definitions
#[derive(Debug, Default)]
pub struct BlockRegistry {
    /// Registered definitions by name
    definitions: IndexMap<String, BlockDefinition>,
}

impl BlockRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            definitions: IndexMap::new(),
        }
    }

    /// Register a definition, replacing any previous one of the same name
    pub fn register(&mut self, definition: BlockDefinition) {
        self.definitions.insert(definition.name.clone(), definition);
    }

    /// Get a definition by name
    pub fn get(&self, name: &str) -> Option<&BlockDefinition> {
        self.definitions.get(name)
    }

    /// All registered definitions
    pub fn definitions(&self) -> impl Iterator<Item = &BlockDefinition> {
        self.definitions.values()
    }

    /// Number of registered definitions
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    /// Whether nothing is registered
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_statement_definition() {
        let def = BlockDefinition::statement("repeat", 40).with_input(
            "DO",
            InputKind::Statement,
            ConnectorDefinition::at(16, 20),
        );
        assert_eq!(def.previous, Some(ConnectorDefinition::at(0, 0)));
        assert_eq!(def.next, Some(ConnectorDefinition::at(0, 40)));
        assert!(def.output.is_none());
        assert_eq!(def.inputs[0].kind.connection_type(), ConnectionType::Next);
    }

    #[test]
    fn test_registry() {
        let mut registry = BlockRegistry::new();
        registry.register(BlockDefinition::value("math_number"));
        registry.register(BlockDefinition::statement("print", 30));
        registry.register(BlockDefinition::value("math_number").with_input(
            "A",
            InputKind::Value,
            ConnectorDefinition::at(10, 0),
        ));

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get("math_number").map(|d| d.inputs.len()), Some(1));
        assert!(registry.get("missing").is_none());
        let names: Vec<_> = registry.definitions().map(|d| d.name.as_str()).collect();
        assert_eq!(names, ["math_number", "print"]);
    }

    #[test]
    fn test_definition_from_ron() {
        let def: BlockDefinition = ron::from_str(
            r#"(
                name: "text_print",
                previous: Some((offset: (x: 0, y: 0))),
                next: Some((offset: (x: 0, y: 32))),
                inputs: [
                    (name: "TEXT", kind: Value, connector: (offset: (x: 60, y: 0), checks: Some(["String"]))),
                ],
            )"#,
        )
        .expect("definition parses");
        assert_eq!(def.name, "text_print");
        assert!(def.output.is_none());
        assert_eq!(
            def.inputs[0].connector.checks,
            Some(vec!["String".to_string()])
        );
    }
}
