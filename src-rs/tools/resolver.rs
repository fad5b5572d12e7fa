//! Turns model-supplied arguments into a parameter mapping.
//!
//! Three payload shapes are accepted:
//!
//! 1. a structured mapping, used as is;
//! 2. encoded text that decodes to a mapping;
//! 3. anything else (undecodable text, a decoded non-mapping, a bare
//!    scalar), taken as one positional value. Only a tool that declares
//!    exactly one parameter accepts it. `null` or empty text means "no
//!    arguments".
//!
//! The result must name every required parameter. Missing values are never
//! guessed.

use serde_json::Value;

use super::types::{ParameterSchema, RawArguments, ResolvedArguments, ToolDescriptor};
use crate::error::ToolError;

pub fn resolve_arguments(
    descriptor: &ToolDescriptor,
    raw: &RawArguments,
) -> Result<ResolvedArguments, ToolError> {
    let schema = &descriptor.parameters;
    let candidate = match raw {
        RawArguments::Structured(map) => Some(map.clone()),
        RawArguments::Encoded(text) => match decode(text) {
            Value::Object(map) => Some(map),
            other => positional(schema, other),
        },
        RawArguments::Scalar(value) => positional(schema, value.clone()),
    };

    match candidate {
        Some(args) if schema.first_missing(&args).is_none() => Ok(args),
        _ => Err(ToolError::ArgumentResolution {
            tool: descriptor.name.clone(),
            raw: raw.to_value(),
        }),
    }
}

fn decode(text: &str) -> Value {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Value::Null;
    }
    serde_json::from_str(trimmed).unwrap_or_else(|_| Value::String(text.to_string()))
}

fn positional(schema: &ParameterSchema, value: Value) -> Option<ResolvedArguments> {
    if value.is_null() {
        return Some(ResolvedArguments::new());
    }
    let param = schema.single()?;
    let mut args = ResolvedArguments::new();
    args.insert(param.name.clone(), value);
    Some(args)
}
