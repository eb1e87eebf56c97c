use schemars::JsonSchema;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;

use crate::kind::ArtifactKind;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputSchema {
    pub properties: serde_json::Map<String, Value>,
    pub required: Vec<String>,
    #[serde(rename = "type")]
    pub schema_type: String,
}

impl From<schemars::Schema> for InputSchema {
    fn from(schema: schemars::Schema) -> Self {
        let schema_value =
            serde_json::to_value(&schema).unwrap_or_else(|_| serde_json::Value::Null);
        let summary = SchemaSummary::from_value(&schema_value);
        Self {
            properties: summary.properties,
            required: summary.required,
            schema_type: summary.schema_type,
        }
    }
}

struct SchemaSummary {
    properties: serde_json::Map<String, Value>,
    required: Vec<String>,
    schema_type: String,
}

impl SchemaSummary {
    fn from_value(schema: &Value) -> Self {
        let mut properties = serde_json::Map::new();
        let mut required = std::collections::BTreeSet::new();
        let schema_type = schema
            .as_object()
            .and_then(|obj| obj.get("type"))
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();

        Self::merge_schema(schema, &mut properties, &mut required);

        Self {
            properties,
            required: required.into_iter().collect(),
            schema_type,
        }
    }

    fn merge_schema(
        schema: &Value,
        properties: &mut serde_json::Map<String, Value>,
        required: &mut std::collections::BTreeSet<String>,
    ) {
        let Some(obj) = schema.as_object() else {
            return;
        };

        if let Some(prop_obj) = obj.get("properties").and_then(|v| v.as_object()) {
            for (key, value) in prop_obj {
                properties
                    .entry(key.clone())
                    .or_insert_with(|| value.clone());
            }
        }

        if let Some(req) = obj.get("required").and_then(|v| v.as_array()) {
            required.extend(req.iter().filter_map(|v| v.as_str()).map(str::to_string));
        }

        if let Some(all_of) = obj.get("allOf").and_then(|v| v.as_array()) {
            for sub in all_of {
                Self::merge_schema(sub, properties, required);
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSchema {
    pub name: String,
    #[serde(default)]
    pub display_name: String,
    pub description: String,
    pub input_schema: InputSchema,
    /// Example argument list in call syntax, e.g. `mermaid_code="graph TD; A-->B"`.
    #[serde(default)]
    pub example: String,
}

/// Static description of one tool call the model may emit.
pub trait ToolSpec {
    type Params: DeserializeOwned + JsonSchema + Send;

    const NAME: &'static str;
    const DISPLAY_NAME: &'static str;
    const DESCRIPTION: &'static str;
    const KIND: ArtifactKind;
    const EXAMPLE: &'static str;

    fn schema() -> ToolSchema
    where
        Self: Sized,
    {
        let settings = schemars::generate::SchemaSettings::draft07().with(|s| {
            s.inline_subschemas = true;
        });
        let schema_gen = settings.into_generator();
        let input_schema = schema_gen.into_root_schema_for::<Self::Params>();

        ToolSchema {
            name: Self::NAME.to_string(),
            display_name: Self::DISPLAY_NAME.to_string(),
            description: Self::DESCRIPTION.to_string(),
            input_schema: input_schema.into(),
            example: Self::EXAMPLE.to_string(),
        }
    }
}

/// A tool whose artifact is rendered from a single source string.
pub trait ArtifactSpec: ToolSpec {
    fn source(params: &Self::Params) -> &str;

    /// Display scale applied to the rendered artifact, if the tool takes one.
    fn scale(_params: &Self::Params) -> Option<f64> {
        None
    }
}
