use std::future::Future;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::info;

use super::store::SupportBackend;
use super::types::UpdateTicketRequest;
use crate::error::{HandlerError, ToolError};
use crate::tools::{optional_str, required_str, ParamDecl, ResolvedArguments, ToolCatalog, ToolHandler};

pub const GET_TICKET: &str = "get_ticket";
pub const UPDATE_TICKET: &str = "update_ticket";
pub const SUGGEST_RESPONSE: &str = "suggest_response";
pub const GET_CUSTOMER: &str = "get_customer";
pub const SEARCH_FAQ: &str = "search_faq";

/// Builds the support-assistant catalog over `backend`.
pub fn support_catalog(backend: Arc<dyn SupportBackend>) -> Result<ToolCatalog, ToolError> {
    let mut catalog = ToolCatalog::new();

    catalog.register(
        GET_TICKET,
        bind(&backend, vec![ParamDecl::required("ticket_id")], get_ticket),
        "Fetch a support ticket by ID.",
    )?;
    catalog.register(
        UPDATE_TICKET,
        bind(
            &backend,
            vec![
                ParamDecl::required("ticket_id"),
                ParamDecl::optional("status", Value::Null),
                ParamDecl::optional("assignee", Value::Null),
            ],
            update_ticket,
        ),
        "Update a ticket's status or assignee.",
    )?;
    catalog.register(
        SUGGEST_RESPONSE,
        bind(&backend, vec![ParamDecl::required("ticket_id")], suggest_response),
        "Suggest an automated response for a ticket.",
    )?;
    catalog.register(
        GET_CUSTOMER,
        bind(&backend, vec![ParamDecl::required("customer_id")], get_customer),
        "Retrieve customer information.",
    )?;
    catalog.register(
        SEARCH_FAQ,
        bind(&backend, vec![ParamDecl::required("q")], search_faq),
        "Search the FAQ database for a given query.",
    )?;

    info!(tools = catalog.count(), "support catalog ready");
    Ok(catalog)
}

fn bind<F, Fut>(backend: &Arc<dyn SupportBackend>, params: Vec<ParamDecl>, op: F) -> ToolHandler
where
    F: Fn(Arc<dyn SupportBackend>, ResolvedArguments) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value, HandlerError>> + Send + 'static,
{
    let backend = backend.clone();
    ToolHandler::new(params, move |args| op(backend.clone(), args))
}

async fn get_ticket(backend: Arc<dyn SupportBackend>, args: ResolvedArguments) -> Result<Value, HandlerError> {
    let ticket_id = required_str(&args, "ticket_id")?;
    let ticket = backend
        .get_ticket(&ticket_id)
        .await?
        .ok_or_else(|| HandlerError::not_found("ticket", &ticket_id))?;
    to_json(&ticket)
}

async fn update_ticket(backend: Arc<dyn SupportBackend>, args: ResolvedArguments) -> Result<Value, HandlerError> {
    let ticket_id = required_str(&args, "ticket_id")?;
    let update = UpdateTicketRequest {
        status: optional_str(&args, "status"),
        assignee: optional_str(&args, "assignee"),
    };
    to_json(&backend.update_ticket(&ticket_id, update).await?)
}

async fn suggest_response(backend: Arc<dyn SupportBackend>, args: ResolvedArguments) -> Result<Value, HandlerError> {
    let ticket_id = required_str(&args, "ticket_id")?;
    to_json(&backend.suggest_response(&ticket_id).await?)
}

async fn get_customer(backend: Arc<dyn SupportBackend>, args: ResolvedArguments) -> Result<Value, HandlerError> {
    let customer_id = required_str(&args, "customer_id")?;
    let customer = backend
        .get_customer(&customer_id)
        .await?
        .ok_or_else(|| HandlerError::not_found("customer", &customer_id))?;
    to_json(&customer)
}

async fn search_faq(backend: Arc<dyn SupportBackend>, args: ResolvedArguments) -> Result<Value, HandlerError> {
    let query = required_str(&args, "q")?;
    to_json(&backend.search_faq(&query).await?)
}

fn to_json<T: Serialize>(value: &T) -> Result<Value, HandlerError> {
    serde_json::to_value(value).map_err(|err| HandlerError::Backend(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::support::InMemoryBackend;
    use crate::tools::Dispatcher;
    use serde_json::json;

    fn dispatcher() -> Dispatcher {
        let backend: Arc<dyn SupportBackend> = Arc::new(InMemoryBackend::seeded());
        Dispatcher::new(Arc::new(support_catalog(backend).unwrap()))
    }

    fn args(value: Value) -> ResolvedArguments {
        match value {
            Value::Object(map) => map,
            _ => ResolvedArguments::new(),
        }
    }

    #[test]
    fn test_catalog_order_and_schemas() {
        let backend: Arc<dyn SupportBackend> = Arc::new(InMemoryBackend::seeded());
        let catalog = support_catalog(backend).unwrap();
        let names: Vec<&str> = catalog.names().collect();
        assert_eq!(names, vec![GET_TICKET, UPDATE_TICKET, SUGGEST_RESPONSE, GET_CUSTOMER, SEARCH_FAQ]);

        let update = &catalog.lookup(UPDATE_TICKET).unwrap().descriptor;
        let required: Vec<&str> = update.parameters.required().map(|p| p.name.as_str()).collect();
        assert_eq!(required, vec!["ticket_id"]);
        assert_eq!(update.parameters.len(), 3);
    }

    #[tokio::test]
    async fn test_get_ticket_and_not_found() {
        let dispatcher = dispatcher();
        let ticket = dispatcher.invoke(GET_TICKET, &args(json!({"ticket_id": "T123"}))).await.unwrap();
        assert_eq!(ticket["status"], "open");

        let err = dispatcher
            .invoke(GET_TICKET, &args(json!({"ticket_id": "T404"})))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "EXECUTION_FAILED");
    }

    #[tokio::test]
    async fn test_update_ticket_assignee_only() {
        let dispatcher = dispatcher();
        let resp = dispatcher
            .invoke(UPDATE_TICKET, &args(json!({"ticket_id": "T123", "assignee": "support_agent_2"})))
            .await
            .unwrap();
        assert_eq!(resp["success"], true);
        assert_eq!(resp["ticket"]["assignee"], "support_agent_2");
        assert_eq!(resp["ticket"]["status"], "open");
    }

    #[tokio::test]
    async fn test_search_faq_tool() {
        let dispatcher = dispatcher();
        let hits = dispatcher.invoke(SEARCH_FAQ, &args(json!({"q": "support"}))).await.unwrap();
        assert_eq!(hits.as_array().map(Vec::len), Some(1));
    }
}
