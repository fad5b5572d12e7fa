use serde_json::Value;

use super::types::{ParamDecl, ParamSpec, ParameterSchema, TypeTag};

/// Builds the parameter schema for a handler's declared signature.
///
/// A parameter without a default is required. The type tag comes from the
/// explicit hint, then from the JSON type of the default, then falls back to
/// `string`. Runs once per registration; descriptors never re-inspect
/// handlers afterwards.
pub fn infer_schema(params: &[ParamDecl]) -> ParameterSchema {
    let specs = params
        .iter()
        .map(|decl| ParamSpec {
            name: decl.name.clone(),
            type_tag: decl
                .type_hint
                .or_else(|| decl.default.as_ref().and_then(tag_of_default))
                .unwrap_or(TypeTag::String),
            required: decl.default.is_none(),
            default: decl.default.clone(),
        })
        .collect();
    ParameterSchema::new(specs)
}

fn tag_of_default(value: &Value) -> Option<TypeTag> {
    match value {
        Value::Null => None,
        Value::Bool(_) => Some(TypeTag::Boolean),
        Value::Number(n) if n.is_i64() || n.is_u64() => Some(TypeTag::Integer),
        Value::Number(_) => Some(TypeTag::Number),
        Value::String(_) => Some(TypeTag::String),
        Value::Array(_) => Some(TypeTag::Array),
        Value::Object(_) => Some(TypeTag::Object),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_no_params_yields_empty_schema() {
        let schema = infer_schema(&[]);
        assert!(schema.is_empty());
        assert_eq!(schema.required().count(), 0);
    }

    #[test]
    fn test_default_marks_optional() {
        let schema = infer_schema(&[
            ParamDecl::required("ticket_id"),
            ParamDecl::optional("status", Value::Null),
            ParamDecl::optional("assignee", Value::Null),
        ]);
        let required: Vec<&str> = schema.required().map(|p| p.name.as_str()).collect();
        assert_eq!(required, vec!["ticket_id"]);
        assert!(schema.iter().all(|p| p.type_tag == TypeTag::String));
        let names: Vec<&str> = schema.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["ticket_id", "status", "assignee"]);
    }

    #[test]
    fn test_type_from_hint_and_default() {
        let schema = infer_schema(&[
            ParamDecl::required("limit").typed(TypeTag::Integer),
            ParamDecl::optional("verbose", json!(false)),
            ParamDecl::optional("ratio", json!(0.5)),
            ParamDecl::optional("filters", json!({})),
        ]);
        assert_eq!(schema.get("limit").map(|p| p.type_tag), Some(TypeTag::Integer));
        assert_eq!(schema.get("verbose").map(|p| p.type_tag), Some(TypeTag::Boolean));
        assert_eq!(schema.get("ratio").map(|p| p.type_tag), Some(TypeTag::Number));
        assert_eq!(schema.get("filters").map(|p| p.type_tag), Some(TypeTag::Object));
    }

    #[test]
    fn test_hint_wins_over_default() {
        let schema = infer_schema(&[ParamDecl::optional("count", json!("1")).typed(TypeTag::Integer)]);
        assert_eq!(schema.get("count").map(|p| p.type_tag), Some(TypeTag::Integer));
        assert!(!schema.get("count").map(|p| p.required).unwrap_or(true));
    }
}
