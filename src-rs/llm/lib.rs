pub mod gemini_adapter;
pub mod openai_adapter;
pub mod rotation;
pub mod router;
pub mod transport;
pub mod types;

pub use gemini_adapter::{GeminiAdapter, GeminiConfig};
pub use openai_adapter::{OpenAIAdapter, OpenAIConfig};
pub use rotation::Rotator;
pub use router::LLMRouter;
pub use types::{CompletionRequest, LLMResponse, Message, ProviderAdapter, ProviderError, Role};
