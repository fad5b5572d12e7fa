use std::env;
use std::path::Path;
use std::sync::Arc;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::{env_opt, split_list, AgentConfig};
use crate::llm::{GeminiAdapter, GeminiConfig, LLMRouter, OpenAIAdapter, OpenAIConfig};
use crate::support::{InMemoryBackend, RestBackend, SupportBackend};

/// `RUST_LOG` wins; otherwise `info`.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

fn load_keys_from_env(primary: &str, prefix: &str) -> Vec<String> {
    let mut keys = env_opt(primary).map(|raw| split_list(&raw)).unwrap_or_default();
    for idx in 2..=10 {
        if let Some(value) = env_opt(&format!("{}_{}", prefix, idx)) {
            keys.push(value.trim().to_string());
        }
    }
    keys
}

pub fn load_openai_keys() -> Vec<String> {
    load_keys_from_env("OPENAI_API_KEY", "OPENAI_API_KEY")
}

pub fn load_gemini_keys() -> Vec<String> {
    load_keys_from_env("GEMINI_API_KEY", "GEMINI_API_KEY")
}

/// Registers every provider that has credentials; fails if the configured
/// default has none.
pub fn build_llm_router(cfg: &AgentConfig) -> Result<LLMRouter, String> {
    let mut router = LLMRouter::new(&cfg.provider);

    let openai_keys = load_openai_keys();
    if !openai_keys.is_empty() {
        let model = if cfg.provider == "openai" {
            cfg.model.clone()
        } else {
            String::new()
        };
        let adapter = OpenAIAdapter::new(OpenAIConfig {
            api_keys: openai_keys,
            base_url: env_opt("OPENAI_BASE_URL").unwrap_or_default(),
            model,
            temperature: cfg.temperature,
        })
        .map_err(|err| err.to_string())?;
        router.register_provider("openai", Arc::new(adapter));
    } else if cfg.provider == "openai" {
        return Err("openai provider selected but no OPENAI_API_KEY found".to_string());
    }

    let gemini_keys = load_gemini_keys();
    if !gemini_keys.is_empty() {
        let model = if cfg.provider == "gemini" {
            cfg.model.clone()
        } else {
            String::new()
        };
        let adapter = GeminiAdapter::new(GeminiConfig {
            api_keys: gemini_keys,
            base_url: env_opt("GEMINI_BASE_URL").unwrap_or_default(),
            model,
            temperature: cfg.temperature,
        })
        .map_err(|err| err.to_string())?;
        router.register_provider("gemini", Arc::new(adapter));
    } else if cfg.provider == "gemini" {
        return Err("gemini provider selected but no GEMINI_API_KEY found".to_string());
    }

    if !router.has_provider(&cfg.provider) {
        return Err(format!("unsupported provider: {}", cfg.provider));
    }
    Ok(router)
}

/// REST backend when `SUPPORT_BACKEND_URL` is set, else the in-memory store
/// (seeded from `SUPPORT_SEED_FILE` if present).
pub fn build_backend() -> Result<Arc<dyn SupportBackend>, String> {
    if let Some(url) = env_opt("SUPPORT_BACKEND_URL") {
        info!(url = %url, "using REST support backend");
        let backend = RestBackend::new(&url).map_err(|err| err.to_string())?;
        return Ok(Arc::new(backend));
    }
    if let Ok(path) = env::var("SUPPORT_SEED_FILE") {
        info!(path = %path, "seeding in-memory support backend");
        return Ok(Arc::new(InMemoryBackend::load_from_disk(Path::new(&path))?));
    }
    warn!("no seed file configured, using demo support data");
    Ok(Arc::new(InMemoryBackend::seeded()))
}
