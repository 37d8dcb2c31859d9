//! Values-only descriptions of callable tools.
//!
//! A [`ToolDescriptor`] is what the chat backend sees: a name, a human
//! description and a parameter schema. In-process tools declare their
//! parameters explicitly as [`ParameterSpec`]s; remote tools carry the JSON
//! schema reported by their server verbatim.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

/// JSON type of a declared parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterKind {
    String,
    Number,
    Integer,
    Boolean,
    Array,
    Object,
    /// Accepts any JSON value.
    Any,
}

impl ParameterKind {
    /// JSON Schema `type` keyword for this kind, `None` for [`ParameterKind::Any`].
    pub fn json_type(&self) -> Option<&'static str> {
        match self {
            ParameterKind::String => Some("string"),
            ParameterKind::Number => Some("number"),
            ParameterKind::Integer => Some("integer"),
            ParameterKind::Boolean => Some("boolean"),
            ParameterKind::Array => Some("array"),
            ParameterKind::Object => Some("object"),
            ParameterKind::Any => None,
        }
    }

    /// Check whether a supplied argument value fits this kind.
    ///
    /// `null` is accepted for every kind so callers can pass an explicit
    /// "no value" for optional parameters.
    pub fn accepts(&self, value: &Value) -> bool {
        if value.is_null() {
            return true;
        }
        match self {
            ParameterKind::String => value.is_string(),
            ParameterKind::Number => value.is_number(),
            ParameterKind::Integer => {
                value.is_i64()
                    || value.is_u64()
                    || value.as_f64().is_some_and(|f| f.fract() == 0.0)
            }
            ParameterKind::Boolean => value.is_boolean(),
            ParameterKind::Array => value.is_array(),
            ParameterKind::Object => value.is_object(),
            ParameterKind::Any => true,
        }
    }
}

impl std::fmt::Display for ParameterKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.json_type().unwrap_or("any"))
    }
}

/// One declared parameter of an in-process tool.
///
/// A parameter is required exactly when it has no default value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSpec {
    pub name: String,
    pub kind: ParameterKind,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

impl ParameterSpec {
    /// Declare a required parameter.
    pub fn required(name: impl Into<String>, kind: ParameterKind) -> Self {
        Self {
            name: name.into(),
            kind,
            description: String::new(),
            default: None,
        }
    }

    /// Declare an optional parameter that falls back to `default` when omitted.
    pub fn optional(name: impl Into<String>, kind: ParameterKind, default: Value) -> Self {
        Self {
            name: name.into(),
            kind,
            description: String::new(),
            default: Some(default),
        }
    }

    /// Attach a human description to the parameter.
    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn is_required(&self) -> bool {
        self.default.is_none()
    }

    fn to_property(&self) -> Value {
        let mut property = Map::new();
        if let Some(ty) = self.kind.json_type() {
            property.insert("type".to_string(), Value::String(ty.to_string()));
        }
        property.insert(
            "description".to_string(),
            Value::String(self.description.clone()),
        );
        if let Some(default) = &self.default
            && !default.is_null()
        {
            property.insert("default".to_string(), default.clone());
        }
        Value::Object(property)
    }
}

/// Parameter schema of a tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum ParameterSchema {
    /// Parameters declared at registration time.
    Declared { parameters: Vec<ParameterSpec> },
    /// JSON schema copied from a remote listing.
    Json { schema: Value },
}

impl ParameterSchema {
    /// Schema of a tool that takes no arguments.
    pub fn empty() -> Self {
        ParameterSchema::Declared {
            parameters: Vec::new(),
        }
    }

    /// Names of the required parameters, in declaration order.
    pub fn required(&self) -> Vec<String> {
        match self {
            ParameterSchema::Declared { parameters } => parameters
                .iter()
                .filter(|p| p.is_required())
                .map(|p| p.name.clone())
                .collect(),
            ParameterSchema::Json { schema } => schema
                .get("required")
                .and_then(Value::as_array)
                .map(|names| {
                    names
                        .iter()
                        .filter_map(|n| n.as_str().map(str::to_string))
                        .collect()
                })
                .unwrap_or_default(),
        }
    }

    /// Render as a JSON Schema object suitable for a chat backend.
    pub fn to_json_schema(&self) -> Value {
        match self {
            ParameterSchema::Declared { parameters } => {
                let properties: Map<String, Value> = parameters
                    .iter()
                    .map(|p| (p.name.clone(), p.to_property()))
                    .collect();
                json!({
                    "type": "object",
                    "properties": properties,
                    "required": self.required(),
                })
            }
            ParameterSchema::Json { schema } => schema.clone(),
        }
    }
}

impl Default for ParameterSchema {
    fn default() -> Self {
        Self::empty()
    }
}

/// Behaviour hints attached to a tool.
///
/// These are hints only; they never change how a tool is dispatched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolAnnotations {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub read_only_hint: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destructive_hint: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub idempotent_hint: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub open_world_hint: Option<bool>,
}

/// Immutable description of one callable tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub parameters: ParameterSchema,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotations: Option<ToolAnnotations>,
}

impl ToolDescriptor {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: ParameterSchema,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
            annotations: None,
        }
    }

    pub fn with_annotations(mut self, annotations: ToolAnnotations) -> Self {
        self.annotations = Some(annotations);
        self
    }

    /// JSON schema of the tool's input.
    pub fn input_schema(&self) -> Value {
        self.parameters.to_json_schema()
    }

    /// Names of the required parameters.
    pub fn required_parameters(&self) -> Vec<String> {
        self.parameters.required()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn weather_schema() -> ParameterSchema {
        ParameterSchema::Declared {
            parameters: vec![
                ParameterSpec::required("city", ParameterKind::String).describe("The city name"),
                ParameterSpec::optional("country", ParameterKind::String, Value::Null)
                    .describe("The country code (optional)"),
            ],
        }
    }

    #[test]
    fn required_set_excludes_defaulted_parameters() {
        assert_eq!(weather_schema().required(), vec!["city".to_string()]);
    }

    #[test]
    fn declared_schema_renders_properties_and_descriptions() {
        let schema = weather_schema().to_json_schema();

        assert_eq!(schema["type"], "object");
        assert_eq!(schema["properties"]["city"]["type"], "string");
        assert_eq!(schema["properties"]["city"]["description"], "The city name");
        assert_eq!(schema["required"], json!(["city"]));
        assert!(schema["properties"]["country"].get("default").is_none());
    }

    #[test]
    fn empty_schema_has_no_required_parameters() {
        let schema = ParameterSchema::empty();
        assert!(schema.required().is_empty());
        assert_eq!(schema.to_json_schema()["properties"], json!({}));
    }

    #[test]
    fn json_schema_is_kept_verbatim() {
        let raw = json!({
            "type": "object",
            "properties": { "query": { "type": "string" } },
            "required": ["query"]
        });
        let schema = ParameterSchema::Json {
            schema: raw.clone(),
        };

        assert_eq!(schema.to_json_schema(), raw);
        assert_eq!(schema.required(), vec!["query".to_string()]);
    }

    #[test]
    fn kinds_accept_matching_values() {
        assert!(ParameterKind::Number.accepts(&json!(2.5)));
        assert!(ParameterKind::Integer.accepts(&json!(3)));
        assert!(ParameterKind::Integer.accepts(&json!(3.0)));
        assert!(!ParameterKind::Integer.accepts(&json!(3.5)));
        assert!(!ParameterKind::String.accepts(&json!(1)));
        assert!(ParameterKind::String.accepts(&Value::Null));
        assert!(ParameterKind::Any.accepts(&json!({"nested": true})));
    }
}
