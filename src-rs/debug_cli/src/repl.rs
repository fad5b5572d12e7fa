use std::io;

use crate::client::HTTPClient;
use serde_json::Value;

use crate::models::{ChatMessage, ChatRequest, CLIConfig};
use crate::render;

pub struct REPL {
    pub config: CLIConfig,
    pub client: HTTPClient,
    pub history: Vec<ChatMessage>,
    pub session_id: Option<String>,
}

impl REPL {
    pub fn new(config: CLIConfig, client: HTTPClient) -> Self {
        Self {
            config,
            client,
            history: Vec::new(),
            session_id: None,
        }
    }

    pub fn run(&mut self) {
        render::banner(&self.config);
        loop {
            render::prompt();
            let mut line = String::new();
            if io::stdin().read_line(&mut line).is_err() {
                break;
            }
            let line = line.trim().to_string();
            if line.is_empty() {
                continue;
            }
            if line.starts_with('/') {
                if self.handle_command(&line) {
                    break;
                }
                continue;
            }
            self.send(&line);
        }
    }

    fn handle_command(&mut self, line: &str) -> bool {
        let mut parts = line.splitn(2, ' ');
        let cmd = parts.next().unwrap_or("").trim_start_matches('/');
        let rest = parts.next().unwrap_or("").trim();
        match cmd {
            "exit" | "quit" => return true,
            "help" => render::help(),
            "system" => {
                if rest.is_empty() {
                    render::info(&format!("system prompt: {:?}", self.config.system_prompt));
                } else {
                    self.config.system_prompt = Some(rest.to_string());
                    render::info("system prompt updated");
                }
            }
            "provider" => {
                if rest.is_empty() {
                    render::info(&format!("provider: {}", self.config.provider));
                } else {
                    self.config.provider = rest.to_string();
                    render::info("provider updated");
                }
            }
            "model" => {
                if rest.is_empty() {
                    render::info(&format!("model: {:?}", self.config.model));
                } else {
                    self.config.model = Some(rest.to_string());
                    render::info("model updated");
                }
            }
            "temp" => {
                if rest.is_empty() {
                    render::info(&format!("temperature: {:.2}", self.config.temperature));
                } else if let Ok(val) = rest.parse::<f64>() {
                    self.config.temperature = val;
                    render::info("temperature updated");
                } else {
                    render::error("invalid temperature");
                }
            }
            "debug" => {
                if rest.is_empty() {
                    self.config.debug = !self.config.debug;
                    render::info(&format!("debug: {}", self.config.debug));
                } else if let Some(flag) = parse_on_off(rest) {
                    self.config.debug = flag;
                    render::info(&format!("debug: {}", self.config.debug));
                } else {
                    render::error("invalid debug flag");
                }
            }
            "tools" => self.list_tools(),
            "call" => self.call_tool(rest),
            "history" => render::history(&self.history),
            "reset" => self.reset(),
            "config" => render::config(&self.config, self.session_id.as_deref()),
            "base" => {
                if rest.is_empty() {
                    render::info(&format!("base: {}", self.config.base_url));
                } else {
                    self.config.base_url = rest.to_string();
                    self.rebuild_client("base url updated");
                }
            }
            _ => render::info("unknown command, type /help"),
        }
        false
    }

    fn send(&mut self, line: &str) {
        self.history.push(ChatMessage {
            role: "user".to_string(),
            content: line.to_string(),
        });

        let req = ChatRequest {
            message: line.to_string(),
            session_id: self.session_id.clone(),
            system_prompt: self.config.system_prompt.clone(),
            provider: Some(self.config.provider.clone()),
            model: self.config.model.clone(),
            temperature: Some(self.config.temperature),
            allowed_tools: self.config.allowed_tools.clone(),
            debug: self.config.debug,
        };

        match self.client.chat(&req) {
            Ok(resp) => {
                if resp.session_id.is_some() {
                    self.session_id = resp.session_id.clone();
                }
                if !resp.output.is_empty() {
                    self.history.push(ChatMessage {
                        role: "assistant".to_string(),
                        content: resp.output.clone(),
                    });
                }
                render::response(&resp, self.config.debug);
            }
            Err(err) => render::error(&err),
        }
    }

    fn list_tools(&self) {
        match self.client.list_tools() {
            Ok(tools) => render::tools(&tools),
            Err(err) => render::error(&err),
        }
    }

    /// `/call <tool> <payload>`; a payload that is not JSON is sent as text.
    fn call_tool(&self, rest: &str) {
        let mut parts = rest.splitn(2, ' ');
        let name = parts.next().unwrap_or("").trim();
        if name.is_empty() {
            render::error("usage: /call <tool> <args>");
            return;
        }
        let raw = parts.next().unwrap_or("").trim();
        let payload = if raw.is_empty() {
            Value::Null
        } else {
            serde_json::from_str::<Value>(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
        };
        match self.client.invoke_tool(name, &payload) {
            Ok(outcome) => render::tool_call(&outcome),
            Err(err) => render::error(&err),
        }
    }

    fn reset(&mut self) {
        if let Some(id) = self.session_id.take() {
            if let Err(err) = self.client.delete_session(&id) {
                render::error(&err);
            }
        }
        self.history.clear();
        render::info("session reset");
    }

    fn rebuild_client(&mut self, done: &str) {
        match HTTPClient::new(&self.config.base_url) {
            Ok(client) => {
                self.client = client;
                render::info(done);
            }
            Err(err) => render::error(&err),
        }
    }
}

fn parse_on_off(value: &str) -> Option<bool> {
    match value.to_lowercase().as_str() {
        "on" | "true" | "1" | "yes" => Some(true),
        "off" | "false" | "0" | "no" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_on_off() {
        assert_eq!(parse_on_off("ON"), Some(true));
        assert_eq!(parse_on_off("no"), Some(false));
        assert_eq!(parse_on_off("maybe"), None);
    }
}
