//! Renders the registered handlers into the tool-call instructions given to
//! the model.

use serde_json::Value;
use vellum_tools::ToolSchema;

use super::HandlerRegistry;

fn type_name(property: &Value) -> String {
    match property.get("type") {
        Some(Value::String(name)) => name.clone(),
        Some(Value::Array(names)) => names
            .iter()
            .filter_map(Value::as_str)
            .filter(|name| *name != "null")
            .collect::<Vec<_>>()
            .join("|"),
        _ => match property.get("anyOf").and_then(Value::as_array) {
            Some(variants) => variants
                .iter()
                .map(type_name)
                .collect::<Vec<_>>()
                .join("|"),
            None => "any".to_string(),
        },
    }
}

fn signature(schema: &ToolSchema) -> String {
    schema
        .input_schema
        .properties
        .iter()
        .map(|(name, property)| {
            let optional = if schema.input_schema.required.contains(name) {
                ""
            } else {
                "?"
            };
            format!("{name}{optional}:{}", type_name(property))
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn tool_section(namespace: &str, schema: &ToolSchema) -> String {
    format!(
        "+ use the `tool_code` to *{description}*\n    ```tool_code\n    print({namespace}.{name}({signature}))\n    ```\n> e.g.,\n    ```tool_code\n    print({namespace}.{name}({example}))\n    ```\n",
        description = schema.description,
        name = schema.name,
        signature = signature(schema),
        example = schema.example,
    )
}

pub fn tool_instructions(registry: &HandlerRegistry, namespace: &str) -> String {
    let mut out = String::from("--- [Tool Call Format Start] ---\n");
    out.push_str("Write every special format as a `tool_code` block.\n");
    out.push_str(&format!(
        "Always write calls as `print({namespace}.<function_name>(<name>=<value>, ...))`.\n"
    ));
    out.push_str(&format!(
        "Separate several calls in one block with `;`, e.g. `print({namespace}.a(x=1)); print({namespace}.b(y=2))`.\n"
    ));
    out.push_str("Never call functions that are not listed here.\n\n");
    for schema in registry.schemas() {
        out.push_str(&tool_section(namespace, &schema));
        out.push('\n');
    }
    out.push_str("--- [Tool Call Format End] ---\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_every_handler_with_example() {
        let registry = HandlerRegistry::with_builtin();
        let text = tool_instructions(&registry, "default_api");

        for name in registry.names() {
            assert!(text.contains(&format!("print(default_api.{name}(")), "{name} missing");
        }
        assert!(text.contains("mermaid_code:string"));
        assert!(text.contains("image_only?:boolean"));
        assert!(text.contains("format?:string"));
        assert!(text.contains("katex_code:string"));
        assert!(text.contains("message:string, command:string") || text.contains("command:string, message:string"));
    }
}
