//! Structured output schemas.
//!
//! An agent with an [`OutputSchema`] must answer with a single JSON object
//! containing exactly the declared fields, with matching types.

use crate::error::{RecallError, Result};
use async_openai::types::{ResponseFormat, ResponseFormatJsonSchema};
use serde_json::{json, Map, Value};

/// JSON type of a declared output field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    String,
    Number,
    Integer,
    Boolean,
    Array,
    Object,
}

impl FieldType {
    fn as_str(self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Number => "number",
            FieldType::Integer => "integer",
            FieldType::Boolean => "boolean",
            FieldType::Array => "array",
            FieldType::Object => "object",
        }
    }

    fn matches(self, value: &Value) -> bool {
        match self {
            FieldType::String => value.is_string(),
            FieldType::Number => value.is_number(),
            FieldType::Integer => value.is_i64() || value.is_u64(),
            FieldType::Boolean => value.is_boolean(),
            FieldType::Array => value.is_array(),
            FieldType::Object => value.is_object(),
        }
    }
}

/// One declared field of a structured response.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputField {
    pub name: String,
    pub field_type: FieldType,
    pub description: String,
    pub required: bool,
}

/// Declared shape of a structured agent response.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputSchema {
    pub name: String,
    pub description: Option<String>,
    pub fields: Vec<OutputField>,
}

impl OutputSchema {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            description: None,
            fields: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    /// Declare a required field.
    pub fn field(mut self, name: &str, field_type: FieldType, description: &str) -> Self {
        self.fields.push(OutputField {
            name: name.to_string(),
            field_type,
            description: description.to_string(),
            required: true,
        });
        self
    }

    /// Declare an optional field.
    pub fn optional_field(mut self, name: &str, field_type: FieldType, description: &str) -> Self {
        self.fields.push(OutputField {
            name: name.to_string(),
            field_type,
            description: description.to_string(),
            required: false,
        });
        self
    }

    /// JSON Schema document for the declared fields.
    pub fn json_schema(&self) -> Value {
        let properties: Map<String, Value> = self
            .fields
            .iter()
            .map(|f| {
                (
                    f.name.clone(),
                    json!({
                        "type": f.field_type.as_str(),
                        "description": f.description,
                    }),
                )
            })
            .collect();

        let required: Vec<&str> = self
            .fields
            .iter()
            .filter(|f| f.required)
            .map(|f| f.name.as_str())
            .collect();

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
            "additionalProperties": false,
        })
    }

    /// Response format requesting schema-constrained JSON from the model.
    pub fn response_format(&self) -> ResponseFormat {
        // Strict mode requires every property to be listed as required.
        let strict = self.fields.iter().all(|f| f.required);
        ResponseFormat::JsonSchema {
            json_schema: ResponseFormatJsonSchema {
                description: self.description.clone(),
                name: self.name.clone(),
                schema: Some(self.json_schema()),
                strict: Some(strict),
            },
        }
    }

    /// Parse and validate a model response against the schema.
    pub fn validate(&self, content: &str) -> Result<Value> {
        let value: Value = serde_json::from_str(strip_code_fence(content)).map_err(|e| {
            RecallError::OutputValidation(format!("response is not valid JSON: {}", e))
        })?;

        let obj = value.as_object().ok_or_else(|| {
            RecallError::OutputValidation("response must be a JSON object".to_string())
        })?;

        if let Some(extra) = obj
            .keys()
            .find(|key| !self.fields.iter().any(|f| &f.name == *key))
        {
            return Err(RecallError::OutputValidation(format!(
                "unexpected field '{}'",
                extra
            )));
        }

        for field in &self.fields {
            match obj.get(&field.name) {
                Some(v) if field.field_type.matches(v) => {}
                Some(_) => {
                    return Err(RecallError::OutputValidation(format!(
                        "field '{}' must be of type {}",
                        field.name,
                        field.field_type.as_str()
                    )))
                }
                None if field.required => {
                    return Err(RecallError::OutputValidation(format!(
                        "missing required field '{}'",
                        field.name
                    )))
                }
                None => {}
            }
        }

        Ok(value)
    }
}

/// Accept a response wrapped in a single markdown code fence.
fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    inner.strip_suffix("```").unwrap_or(inner).trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn email_schema() -> OutputSchema {
        OutputSchema::new("email_content")
            .field("subject", FieldType::String, "Subject line")
            .field("body", FieldType::String, "Email body")
    }

    #[test]
    fn test_valid_response() {
        let value = email_schema()
            .validate(r#"{"subject": "Hi", "body": "Hello there"}"#)
            .unwrap();
        assert_eq!(value["subject"], "Hi");
    }

    #[test]
    fn test_rejects_prose_and_extra_fields() {
        let schema = email_schema();
        assert!(schema.validate("Sure! Here is your email.").is_err());
        assert!(schema
            .validate(r#"{"subject": "Hi", "body": "b", "note": "x"}"#)
            .is_err());
        assert!(schema.validate(r#"{"subject": "Hi"}"#).is_err());
        assert!(schema.validate(r#"{"subject": 3, "body": "b"}"#).is_err());
        assert!(schema.validate(r#"["subject"]"#).is_err());
    }

    #[test]
    fn test_code_fence_is_tolerated() {
        let content = "```json\n{\"subject\": \"Hi\", \"body\": \"b\"}\n```";
        assert!(email_schema().validate(content).is_ok());
    }

    #[test]
    fn test_optional_field() {
        let schema = email_schema().optional_field("cc", FieldType::Array, "Copy recipients");
        assert!(schema.validate(r#"{"subject": "s", "body": "b"}"#).is_ok());
        assert!(schema
            .validate(r#"{"subject": "s", "body": "b", "cc": ["a@b.c"]}"#)
            .is_ok());
    }

    #[test]
    fn test_json_schema_shape() {
        let schema = email_schema().json_schema();
        assert_eq!(schema["required"], json!(["subject", "body"]));
        assert_eq!(schema["properties"]["body"]["type"], "string");
        assert_eq!(schema["additionalProperties"], false);
    }
}
