use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::Utc;

use super::types::{Customer, FaqItem, SeedData, SuggestedResponse, Ticket, UpdateTicketRequest, UpdateTicketResponse};
use crate::error::HandlerError;

/// Ticket / customer / FAQ store the support tools talk to.
///
/// Implementations own their concurrency discipline; concurrent sessions
/// may update the same ticket.
#[async_trait]
pub trait SupportBackend: Send + Sync {
    async fn get_ticket(&self, ticket_id: &str) -> Result<Option<Ticket>, HandlerError>;

    async fn update_ticket(
        &self,
        ticket_id: &str,
        update: UpdateTicketRequest,
    ) -> Result<UpdateTicketResponse, HandlerError>;

    async fn suggest_response(&self, ticket_id: &str) -> Result<SuggestedResponse, HandlerError>;

    async fn get_customer(&self, customer_id: &str) -> Result<Option<Customer>, HandlerError>;

    async fn search_faq(&self, query: &str) -> Result<Vec<FaqItem>, HandlerError>;
}

pub struct InMemoryBackend {
    tickets: RwLock<HashMap<String, Ticket>>,
    customers: RwLock<HashMap<String, Customer>>,
    faq: Vec<FaqItem>,
}

impl InMemoryBackend {
    pub fn new(seed: SeedData) -> Self {
        Self {
            tickets: RwLock::new(seed.tickets.into_iter().map(|t| (t.id.clone(), t)).collect()),
            customers: RwLock::new(seed.customers.into_iter().map(|c| (c.id.clone(), c)).collect()),
            faq: seed.faq,
        }
    }

    /// Demo records: one open login ticket, its customer, three FAQ entries.
    pub fn seeded() -> Self {
        Self::new(demo_seed())
    }

    pub fn load_from_disk(path: &Path) -> Result<Self, String> {
        let data = fs::read_to_string(path).map_err(|err| format!("{}: {}", path.display(), err))?;
        let seed: SeedData = serde_json::from_str(&data).map_err(|err| format!("{}: {}", path.display(), err))?;
        Ok(Self::new(seed))
    }

    fn lock_error() -> HandlerError {
        HandlerError::Backend("lock error".to_string())
    }
}

#[async_trait]
impl SupportBackend for InMemoryBackend {
    async fn get_ticket(&self, ticket_id: &str) -> Result<Option<Ticket>, HandlerError> {
        let map = self.tickets.read().map_err(|_| Self::lock_error())?;
        Ok(map.get(ticket_id).cloned())
    }

    async fn update_ticket(
        &self,
        ticket_id: &str,
        update: UpdateTicketRequest,
    ) -> Result<UpdateTicketResponse, HandlerError> {
        let mut map = self.tickets.write().map_err(|_| Self::lock_error())?;
        let ticket = match map.get_mut(ticket_id) {
            Some(ticket) => ticket,
            None => {
                return Ok(UpdateTicketResponse {
                    success: false,
                    message: "Ticket not found".to_string(),
                    ticket: None,
                })
            }
        };
        if let Some(status) = update.status.filter(|s| !s.is_empty()) {
            ticket.status = status;
        }
        if let Some(assignee) = update.assignee.filter(|a| !a.is_empty()) {
            ticket.assignee = Some(assignee);
        }
        ticket.updated_at = Some(Utc::now());
        Ok(UpdateTicketResponse {
            success: true,
            message: "Updated successfully".to_string(),
            ticket: Some(ticket.clone()),
        })
    }

    async fn suggest_response(&self, ticket_id: &str) -> Result<SuggestedResponse, HandlerError> {
        let map = self.tickets.read().map_err(|_| Self::lock_error())?;
        let suggested_text = match map.get(ticket_id) {
            Some(ticket) => suggestion_for(&ticket.body),
            None => "Ticket not found.",
        };
        Ok(SuggestedResponse {
            ticket_id: ticket_id.to_string(),
            suggested_text: suggested_text.to_string(),
        })
    }

    async fn get_customer(&self, customer_id: &str) -> Result<Option<Customer>, HandlerError> {
        let map = self.customers.read().map_err(|_| Self::lock_error())?;
        Ok(map.get(customer_id).cloned())
    }

    async fn search_faq(&self, query: &str) -> Result<Vec<FaqItem>, HandlerError> {
        let needle = query.to_lowercase();
        Ok(self
            .faq
            .iter()
            .filter(|f| f.question.to_lowercase().contains(&needle) || f.answer.to_lowercase().contains(&needle))
            .cloned()
            .collect())
    }
}

/// Canned reply keyed on the ticket body.
pub fn suggestion_for(body: &str) -> &'static str {
    let body = body.to_lowercase();
    if body.contains("login") || body.contains("log in") {
        "Please try resetting your password or confirm your email address is correct."
    } else if body.contains("refund") {
        "Our team will review your request and issue a refund if applicable."
    } else {
        "Thank you for reaching out! Our support team will respond shortly."
    }
}

pub fn demo_seed() -> SeedData {
    SeedData {
        tickets: vec![Ticket {
            id: "T123".to_string(),
            subject: "Login issue".to_string(),
            body: "I can't login".to_string(),
            status: "open".to_string(),
            priority: "low".to_string(),
            assignee: Some("support_agent_1".to_string()),
            customer_id: Some("C001".to_string()),
            updated_at: None,
        }],
        customers: vec![Customer {
            id: "C001".to_string(),
            name: "Alice Johnson".to_string(),
            email: "alice@example.com".to_string(),
            plan: "Premium".to_string(),
        }],
        faq: vec![
            FaqItem {
                question: "How do I reset my password?".to_string(),
                answer: "Click 'Forgot Password' on the login page.".to_string(),
            },
            FaqItem {
                question: "Why can't I log in?".to_string(),
                answer: "Check if your password is correct or reset it.".to_string(),
            },
            FaqItem {
                question: "How to contact support?".to_string(),
                answer: "You can email us at support@example.com.".to_string(),
            },
        ],
    }
}
