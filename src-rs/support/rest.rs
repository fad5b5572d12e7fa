use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode, Url};
use serde::de::DeserializeOwned;

use super::store::SupportBackend;
use super::types::{Customer, FaqItem, SuggestedResponse, Ticket, UpdateTicketRequest, UpdateTicketResponse};
use crate::error::HandlerError;

/// Backend reached over the REST endpoints served by [`crate::api::server`].
///
/// Ids are sent as single percent-encoded path segments.
pub struct RestBackend {
    base_url: Url,
    client: Client,
}

impl RestBackend {
    pub fn new(base_url: &str) -> Result<Self, HandlerError> {
        let parsed = Url::parse(base_url)
            .map_err(|err| HandlerError::Backend(format!("invalid backend url {}: {}", base_url, err)))?;
        if parsed.cannot_be_a_base() {
            return Err(HandlerError::Backend(format!("invalid backend url {}", base_url)));
        }
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|err| HandlerError::Backend(err.to_string()))?;
        Ok(Self {
            base_url: parsed,
            client,
        })
    }

    fn url(&self, segments: &[&str]) -> Result<Url, HandlerError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| HandlerError::Backend("backend url cannot be a base".to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn fetch<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<Option<T>, HandlerError> {
        let resp = request
            .send()
            .await
            .map_err(|err| HandlerError::Backend(err.to_string()))?;
        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(HandlerError::Backend(format!("http {}: {}", status.as_u16(), body)));
        }
        resp.json::<T>()
            .await
            .map(Some)
            .map_err(|err| HandlerError::Backend(err.to_string()))
    }

    async fn expect<T: DeserializeOwned>(&self, request: RequestBuilder, what: &'static str, id: &str) -> Result<T, HandlerError> {
        self.fetch(request)
            .await?
            .ok_or_else(|| HandlerError::not_found(what, id))
    }
}

#[async_trait]
impl SupportBackend for RestBackend {
    async fn get_ticket(&self, ticket_id: &str) -> Result<Option<Ticket>, HandlerError> {
        let request = self.client.get(self.url(&["tickets", ticket_id])?);
        self.fetch(request).await
    }

    async fn update_ticket(
        &self,
        ticket_id: &str,
        update: UpdateTicketRequest,
    ) -> Result<UpdateTicketResponse, HandlerError> {
        let request = self
            .client
            .post(self.url(&["tickets", ticket_id, "actions", "update"])?)
            .json(&update);
        self.expect(request, "ticket", ticket_id).await
    }

    async fn suggest_response(&self, ticket_id: &str) -> Result<SuggestedResponse, HandlerError> {
        let request = self
            .client
            .post(self.url(&["tickets", ticket_id, "actions", "suggest_response"])?);
        self.expect(request, "ticket", ticket_id).await
    }

    async fn get_customer(&self, customer_id: &str) -> Result<Option<Customer>, HandlerError> {
        let request = self.client.get(self.url(&["customers", customer_id])?);
        self.fetch(request).await
    }

    async fn search_faq(&self, query: &str) -> Result<Vec<FaqItem>, HandlerError> {
        let request = self.client.get(self.url(&["faq", "search"])?).query(&[("q", query)]);
        Ok(self.fetch(request).await?.unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use std::net::TcpListener;
    use std::sync::Arc;

    use super::*;
    use crate::agent::Agent;
    use crate::api::{AgentServer, AppState};
    use crate::config::AgentConfig;
    use crate::llm::LLMRouter;
    use crate::support::{support_catalog, InMemoryBackend};

    /// Serves the full API over a seeded in-memory store; returns its base URL.
    async fn serve() -> String {
        let backend: Arc<dyn SupportBackend> = Arc::new(InMemoryBackend::seeded());
        let catalog = Arc::new(support_catalog(backend.clone()).unwrap());
        let router = Arc::new(LLMRouter::new("openai"));
        let agent = Agent::new("rest-test", AgentConfig::default(), router, catalog).unwrap();
        let app = AgentServer::new(0, AppState::new(Arc::new(agent), backend)).router();

        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.set_nonblocking(true).unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::Server::from_tcp(listener)
                .unwrap()
                .serve(app.into_make_service())
                .await
                .unwrap();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_ticket_lookup_and_missing() {
        let rest = RestBackend::new(&serve().await).unwrap();
        let ticket = rest.get_ticket("T123").await.unwrap().unwrap();
        assert_eq!(ticket.status, "open");
        assert!(rest.get_ticket("T404").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_reserved_characters_stay_in_the_id() {
        let rest = RestBackend::new(&serve().await).unwrap();
        assert!(rest.get_ticket("T123?x").await.unwrap().is_none());
        assert!(rest.get_ticket("T123#frag").await.unwrap().is_none());
        assert!(rest.get_ticket("T123/actions/update").await.unwrap().is_none());
        assert!(rest.get_customer("C001?id=C001").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_and_suggest_over_http() {
        let rest = RestBackend::new(&serve().await).unwrap();
        let resp = rest
            .update_ticket(
                "T123",
                UpdateTicketRequest {
                    status: Some("resolved".to_string()),
                    assignee: None,
                },
            )
            .await
            .unwrap();
        assert!(resp.success);
        assert_eq!(rest.get_ticket("T123").await.unwrap().unwrap().status, "resolved");

        let missing = rest.update_ticket("T404", UpdateTicketRequest::default()).await.unwrap();
        assert!(!missing.success);

        let suggestion = rest.suggest_response("T123").await.unwrap();
        assert!(suggestion.suggested_text.contains("resetting your password"));
        let unknown = rest.suggest_response("T404").await.unwrap();
        assert_eq!(unknown.suggested_text, "Ticket not found.");
    }

    #[tokio::test]
    async fn test_customer_and_faq_over_http() {
        let rest = RestBackend::new(&serve().await).unwrap();
        let customer = rest.get_customer("C001").await.unwrap().unwrap();
        assert_eq!(customer.name, "Alice Johnson");
        assert!(rest.get_customer("C404").await.unwrap().is_none());

        let hits = rest.search_faq("log in?").await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].question, "Why can't I log in?");
        assert!(rest.search_faq("no such topic").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_route_maps_to_not_found() {
        let base = format!("{}/not-the-api", serve().await);
        let rest = RestBackend::new(&base).unwrap();
        assert!(rest.get_ticket("T123").await.unwrap().is_none());
        let err = rest.suggest_response("T123").await.unwrap_err();
        assert!(matches!(err, HandlerError::NotFound { kind: "ticket", .. }));
    }

    #[test]
    fn test_rejects_unusable_base_url() {
        assert!(RestBackend::new("not a url").is_err());
        assert!(RestBackend::new("mailto:support@example.com").is_err());
    }
}
