use std::env;
use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const DEFAULT_MAX_ROUND_TRIPS: usize = 8;

/// Per-session options. Fixed for the lifetime of a session.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// `None` exposes every registered tool.
    pub allowed_tools: Option<Vec<String>>,
    pub max_round_trips: usize,
    pub model_timeout: Option<Duration>,
    pub tool_timeout: Option<Duration>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            allowed_tools: None,
            max_round_trips: DEFAULT_MAX_ROUND_TRIPS,
            model_timeout: Some(Duration::from_secs(60)),
            tool_timeout: Some(Duration::from_secs(30)),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AgentConfig {
    pub provider: String,
    pub model: String,
    pub temperature: f64,
    pub system_prompt: String,
    pub session: SessionConfig,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: "gpt-4o-mini".to_string(),
            temperature: 0.3,
            system_prompt: "You are a support assistant.".to_string(),
            session: SessionConfig::default(),
        }
    }
}

impl AgentConfig {
    /// Defaults overlaid with `SUPPORT_AGENT_*` environment variables.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        if let Some(provider) = env_opt("SUPPORT_AGENT_PROVIDER") {
            cfg.provider = provider;
        }
        cfg.model = env_opt("SUPPORT_AGENT_MODEL").unwrap_or_else(|| default_model(&cfg.provider).to_string());
        if let Some(temp) = env_opt("SUPPORT_AGENT_TEMPERATURE").and_then(|v| v.parse().ok()) {
            cfg.temperature = temp;
        }
        if let Some(prompt) = env_opt("SUPPORT_AGENT_SYSTEM_PROMPT") {
            cfg.system_prompt = prompt;
        }
        if let Some(list) = env_opt("SUPPORT_AGENT_ALLOWED_TOOLS") {
            cfg.session.allowed_tools = Some(split_list(&list));
        }
        if let Some(max) = env_opt("SUPPORT_AGENT_MAX_ROUND_TRIPS").and_then(|v| v.parse().ok()) {
            cfg.session.max_round_trips = max;
        }
        if let Some(secs) = env_opt("SUPPORT_AGENT_MODEL_TIMEOUT_SECS").and_then(|v| v.parse::<u64>().ok()) {
            cfg.session.model_timeout = timeout_from_secs(secs);
        }
        if let Some(secs) = env_opt("SUPPORT_AGENT_TOOL_TIMEOUT_SECS").and_then(|v| v.parse::<u64>().ok()) {
            cfg.session.tool_timeout = timeout_from_secs(secs);
        }
        cfg.normalized()
    }

    /// Replaces empty or zero fields with defaults.
    pub fn normalized(mut self) -> Self {
        let defaults = Self::default();
        if self.provider.is_empty() {
            self.provider = defaults.provider;
        }
        if self.model.is_empty() {
            self.model = default_model(&self.provider).to_string();
        }
        if self.system_prompt.is_empty() {
            self.system_prompt = defaults.system_prompt;
        }
        if self.session.max_round_trips == 0 {
            self.session.max_round_trips = DEFAULT_MAX_ROUND_TRIPS;
        }
        self
    }
}

pub fn default_model(provider: &str) -> &'static str {
    match provider {
        "gemini" => "gemini-2.0-flash",
        _ => "gpt-4o-mini",
    }
}

/// `0` disables the timeout.
fn timeout_from_secs(secs: u64) -> Option<Duration> {
    if secs == 0 {
        None
    } else {
        Some(Duration::from_secs(secs))
    }
}

pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn env_opt(key: &str) -> Option<String> {
    match env::var(key) {
        Ok(value) if !value.trim().is_empty() => Some(value),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalized_fills_defaults() {
        let cfg = AgentConfig {
            provider: String::new(),
            model: String::new(),
            temperature: 0.0,
            system_prompt: String::new(),
            session: SessionConfig {
                max_round_trips: 0,
                ..SessionConfig::default()
            },
        }
        .normalized();
        assert_eq!(cfg.provider, "openai");
        assert_eq!(cfg.model, "gpt-4o-mini");
        assert_eq!(cfg.session.max_round_trips, DEFAULT_MAX_ROUND_TRIPS);
        assert!(!cfg.system_prompt.is_empty());
    }

    #[test]
    fn test_model_default_follows_provider() {
        let cfg = AgentConfig {
            provider: "gemini".to_string(),
            model: String::new(),
            ..AgentConfig::default()
        }
        .normalized();
        assert_eq!(cfg.model, "gemini-2.0-flash");
    }

    #[test]
    fn test_split_list() {
        assert_eq!(split_list(" get_ticket, ,search_faq "), vec!["get_ticket", "search_faq"]);
    }

    #[test]
    fn test_zero_disables_timeout() {
        assert_eq!(timeout_from_secs(0), None);
        assert_eq!(timeout_from_secs(5), Some(Duration::from_secs(5)));
    }
}
