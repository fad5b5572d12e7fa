pub mod rest;
pub mod store;
pub mod tools;
pub mod types;

pub use rest::RestBackend;
pub use store::{demo_seed, InMemoryBackend, SupportBackend};
pub use tools::support_catalog;
pub use types::{Customer, FaqItem, SeedData, SuggestedResponse, Ticket, UpdateTicketRequest, UpdateTicketResponse};
