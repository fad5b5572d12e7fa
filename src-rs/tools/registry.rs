use std::collections::HashMap;

use tracing::debug;

use super::schema::infer_schema;
use super::types::{ToolDescriptor, ToolEntry, ToolHandler, ToolSchema};
use crate::error::ToolError;

/// Tool catalog, filled once at startup and shared read-only afterwards
/// (wrap it in an `Arc`). Registration order is preserved.
#[derive(Default)]
pub struct ToolCatalog {
    entries: Vec<ToolEntry>,
    index: HashMap<String, usize>,
}

impl ToolCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        name: &str,
        handler: ToolHandler,
        description: &str,
    ) -> Result<&ToolDescriptor, ToolError> {
        if self.index.contains_key(name) {
            return Err(ToolError::DuplicateTool(name.to_string()));
        }

        let descriptor = ToolDescriptor {
            name: name.to_string(),
            description: description.to_string(),
            parameters: infer_schema(handler.params()),
        };
        debug!(tool = name, params = descriptor.parameters.len(), "registered tool");

        let slot = self.entries.len();
        self.index.insert(name.to_string(), slot);
        self.entries.push(ToolEntry { descriptor, handler });
        Ok(&self.entries[slot].descriptor)
    }

    pub fn lookup(&self, name: &str) -> Result<&ToolEntry, ToolError> {
        self.index
            .get(name)
            .map(|&slot| &self.entries[slot])
            .ok_or_else(|| ToolError::UnknownTool(name.to_string()))
    }

    /// Descriptors in registration order. Call again (or clone) to restart.
    pub fn list_all(&self) -> impl Iterator<Item = &ToolDescriptor> + Clone + '_ {
        self.entries.iter().map(|entry| &entry.descriptor)
    }

    pub fn get_schemas(&self) -> Vec<ToolSchema> {
        self.list_all().map(ToolDescriptor::schema).collect()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.list_all().map(|d| d.name.as_str())
    }

    pub fn has(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn count(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::types::ParamDecl;
    use serde_json::{json, Value};

    fn echo() -> ToolHandler {
        ToolHandler::new(vec![ParamDecl::required("text")], |args| async move {
            Ok(args.get("text").cloned().unwrap_or(Value::Null))
        })
    }

    #[test]
    fn test_register_and_lookup() {
        let mut catalog = ToolCatalog::new();
        let descriptor = catalog.register("echo", echo(), "Echo text back.").unwrap();
        assert_eq!(descriptor.parameters.len(), 1);

        let entry = catalog.lookup("echo").unwrap();
        assert_eq!(entry.descriptor.description, "Echo text back.");
        assert!(catalog.has("echo"));
        assert_eq!(catalog.count(), 1);
    }

    #[test]
    fn test_duplicate_rejected() {
        let mut catalog = ToolCatalog::new();
        catalog.register("echo", echo(), "first").unwrap();
        let err = catalog.register("echo", echo(), "second").unwrap_err();
        assert!(matches!(err, ToolError::DuplicateTool(ref name) if name == "echo"));
        assert_eq!(catalog.lookup("echo").unwrap().descriptor.description, "first");
    }

    #[test]
    fn test_unknown_lookup() {
        let catalog = ToolCatalog::new();
        assert!(matches!(catalog.lookup("nope"), Err(ToolError::UnknownTool(_))));
    }

    #[test]
    fn test_list_all_keeps_order_and_restarts() {
        let mut catalog = ToolCatalog::new();
        for name in ["zeta", "alpha", "mid"] {
            catalog.register(name, echo(), "").unwrap();
        }
        let listing = catalog.list_all();
        let first: Vec<&str> = listing.clone().map(|d| d.name.as_str()).collect();
        let second: Vec<&str> = listing.map(|d| d.name.as_str()).collect();
        assert_eq!(first, vec!["zeta", "alpha", "mid"]);
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_handler_callable_through_entry() {
        let mut catalog = ToolCatalog::new();
        catalog.register("echo", echo(), "").unwrap();
        let mut args = serde_json::Map::new();
        args.insert("text".into(), json!("hi"));
        let out = catalog.lookup("echo").unwrap().handler.call(args).await.unwrap();
        assert_eq!(out, json!("hi"));
    }
}
