//! Tool registry: the immutable table of tools, their argument schemas, and
//! their handlers.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::errors::{AdbMcpError, Result};
use crate::process::BoxFuture;

use super::tools::ToolContext;

/// Handler bound to a tool. Receives arguments already checked against the
/// tool's schema.
pub type ToolHandler = for<'a> fn(&'a ToolContext, Value) -> BoxFuture<'a, Result<Value>>;

/// JSON type of a tool argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgType {
    String,
    Boolean,
}

impl ArgType {
    pub fn as_str(self) -> &'static str {
        match self {
            ArgType::String => "string",
            ArgType::Boolean => "boolean",
        }
    }

    fn matches(self, value: &Value) -> bool {
        match self {
            ArgType::String => value.is_string(),
            ArgType::Boolean => value.is_boolean(),
        }
    }
}

/// One declared argument of a tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgSpec {
    pub name: &'static str,
    pub ty: ArgType,
    pub required: bool,
    pub description: &'static str,
}

impl ArgSpec {
    pub const fn required(name: &'static str, ty: ArgType, description: &'static str) -> Self {
        Self {
            name,
            ty,
            required: true,
            description,
        }
    }

    pub const fn optional(name: &'static str, ty: ArgType, description: &'static str) -> Self {
        Self {
            name,
            ty,
            required: false,
            description,
        }
    }
}

/// Name, description and argument schema of a tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolDescriptor {
    pub name: &'static str,
    pub description: &'static str,
    pub args: Vec<ArgSpec>,
}

impl ToolDescriptor {
    /// JSON Schema for the tool's arguments, properties in declaration order.
    pub fn input_schema(&self) -> Value {
        let mut properties = Map::new();
        for arg in &self.args {
            properties.insert(
                arg.name.to_string(),
                json!({ "type": arg.ty.as_str(), "description": arg.description }),
            );
        }
        let required: Vec<&str> = self
            .args
            .iter()
            .filter(|a| a.required)
            .map(|a| a.name)
            .collect();
        json!({
            "type": "object",
            "properties": properties,
            "required": required,
            "additionalProperties": false,
        })
    }

    /// The wire form advertised by `tools/list`.
    pub fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name.to_string(),
            description: self.description.to_string(),
            input_schema: self.input_schema(),
        }
    }

    /// Checks raw call arguments against the schema.
    ///
    /// Absent arguments are an empty object and `null` fields count as
    /// absent. Undeclared fields are kept; typed decoding ignores them.
    pub fn validate_arguments(&self, raw: Option<Value>) -> Result<Value> {
        let mut object = match raw {
            None | Some(Value::Null) => Map::new(),
            Some(Value::Object(map)) => map,
            Some(_) => {
                return Err(AdbMcpError::InvalidArgument {
                    field: "arguments".to_string(),
                    expected: "object".to_string(),
                })
            }
        };
        object.retain(|_, v| !v.is_null());

        for arg in &self.args {
            match object.get(arg.name) {
                None if arg.required => {
                    return Err(AdbMcpError::MissingArgument {
                        field: arg.name.to_string(),
                    })
                }
                Some(value) if !arg.ty.matches(value) => {
                    return Err(AdbMcpError::InvalidArgument {
                        field: arg.name.to_string(),
                        expected: arg.ty.as_str().to_string(),
                    })
                }
                _ => {}
            }
        }
        Ok(Value::Object(object))
    }
}

/// A tool definition as serialized to clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    /// JSON Schema describing the tool's input parameters.
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

struct RegisteredTool {
    descriptor: ToolDescriptor,
    handler: ToolHandler,
}

/// Collects tools before the registry is frozen.
#[derive(Default)]
pub struct ToolRegistryBuilder {
    tools: Vec<RegisteredTool>,
}

impl ToolRegistryBuilder {
    pub fn register(mut self, descriptor: ToolDescriptor, handler: ToolHandler) -> Self {
        self.tools.push(RegisteredTool {
            descriptor,
            handler,
        });
        self
    }

    /// Freezes the table. Fails on duplicate or empty tool names.
    pub fn build(self) -> Result<ToolRegistry> {
        let mut index = HashMap::with_capacity(self.tools.len());
        for (pos, tool) in self.tools.iter().enumerate() {
            let name = tool.descriptor.name;
            if name.is_empty() {
                return Err(AdbMcpError::Config {
                    message: "tool registered with an empty name".to_string(),
                });
            }
            if index.insert(name, pos).is_some() {
                return Err(AdbMcpError::Config {
                    message: format!("tool registered twice: {}", name),
                });
            }
        }
        Ok(ToolRegistry {
            tools: self.tools,
            index,
        })
    }
}

/// Immutable name → (descriptor, handler) table, in registration order.
pub struct ToolRegistry {
    tools: Vec<RegisteredTool>,
    index: HashMap<&'static str, usize>,
}

impl ToolRegistry {
    pub fn builder() -> ToolRegistryBuilder {
        ToolRegistryBuilder::default()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Descriptors in registration order.
    pub fn descriptors(&self) -> impl Iterator<Item = &ToolDescriptor> {
        self.tools.iter().map(|t| &t.descriptor)
    }

    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.descriptors().map(ToolDescriptor::definition).collect()
    }

    /// Exact-match lookup.
    pub fn descriptor(&self, name: &str) -> Option<&ToolDescriptor> {
        self.index.get(name).map(|&pos| &self.tools[pos].descriptor)
    }

    /// Validates `arguments` against the named tool's schema and runs its
    /// handler to completion.
    pub async fn dispatch(
        &self,
        ctx: &ToolContext,
        name: &str,
        arguments: Option<Value>,
    ) -> Result<Value> {
        let tool = self
            .index
            .get(name)
            .map(|&pos| &self.tools[pos])
            .ok_or_else(|| AdbMcpError::UnknownTool(name.to_string()))?;
        let args = tool.descriptor.validate_arguments(arguments)?;
        (tool.handler)(ctx, args).await
    }
}
