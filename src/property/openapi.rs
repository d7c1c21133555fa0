//! OpenAPI fragments describing keys. Pure functions, no side effects.

use serde_json::{json, Map, Value as Json};

use crate::model::ValueType;

use super::config::{PropertyConfig, PropertyFlags};

/// Schema of a value of the given type.
pub fn describe_type(value_type: &ValueType, format: Option<&str>) -> Json {
    match value_type {
        ValueType::Boolean => json!({ "type": "boolean" }),
        ValueType::Integer => json!({ "type": "integer", "format": "int32" }),
        ValueType::Long => json!({ "type": "integer", "format": "int64" }),
        ValueType::Float => json!({ "type": "number", "format": "float" }),
        ValueType::Double => json!({ "type": "number", "format": "double" }),
        ValueType::String | ValueType::Enum => match format {
            Some(pattern) => json!({ "type": "string", "pattern": pattern }),
            None => json!({ "type": "string" }),
        },
        ValueType::Date | ValueType::ZonedDateTime => {
            let mut schema = json!({ "type": "string", "format": "date-time" });
            if let Some(pattern) = format {
                schema["x-date-pattern"] = Json::from(pattern);
            }
            schema
        }
        ValueType::Bytes => json!({ "type": "string", "format": "byte" }),
        ValueType::Array(inner) => json!({ "type": "array", "items": describe_type(inner, None) }),
        ValueType::Entity(target) => json!({ "$ref": format!("#/components/schemas/{target}") }),
        ValueType::Collection(target) => json!({
            "type": "array",
            "items": { "$ref": format!("#/components/schemas/{target}") },
        }),
        ValueType::Map => json!({ "type": "object" }),
        ValueType::Any => json!({}),
    }
}

/// Input schema: the output schema marked read-only where the key rejects writes.
pub fn describe_input(mut output: Json, flags: PropertyFlags) -> Json {
    if flags.read_only || flags.system_internal {
        if let Json::Object(map) = &mut output {
            map.insert("readOnly".into(), Json::Bool(true));
        }
    }
    output
}

/// Single-property object schema, with description and defaults.
pub fn describe_schema(json_name: &str, mut type_schema: Json, config: &PropertyConfig) -> Json {
    if let Json::Object(map) = &mut type_schema {
        if let Some(description) = &config.description {
            map.insert("description".into(), Json::from(description.as_str()));
        }
        if !config.default_value.is_null() {
            map.insert("default".into(), config.default_value.to_json());
        }
    }
    let mut properties = Map::new();
    properties.insert(json_name.to_owned(), type_schema);

    let mut schema = json!({ "type": "object", "properties": properties });
    if config.flags.not_null {
        schema["required"] = json!([json_name]);
    }
    schema
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::property::{DateProperty, IntegerProperty, PropertyBuilder};

    #[test]
    fn test_describe_scalar_types() {
        assert_eq!(describe_type(&ValueType::Long, None), json!({"type": "integer", "format": "int64"}));
        assert_eq!(
            describe_type(&ValueType::Array(Box::new(ValueType::String)), None),
            json!({"type": "array", "items": {"type": "string"}})
        );
    }

    #[test]
    fn test_schema_carries_default_and_required() {
        let key = IntegerProperty::new("count").with_default(3).not_null().build();
        let schema = key.describe_openapi_output_schema();
        assert_eq!(schema["properties"]["count"]["default"], json!(3));
        assert_eq!(schema["required"], json!(["count"]));
    }

    #[test]
    fn test_read_only_input() {
        let key = DateProperty::new("createdDate").read_only().build();
        assert_eq!(key.describe_openapi_input_type()["readOnly"], json!(true));
        assert_eq!(key.describe_openapi_output_type()["format"], json!("date-time"));
    }
}
