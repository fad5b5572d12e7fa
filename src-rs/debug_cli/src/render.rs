use std::io::{self, Write};

use crate::models::{CLIConfig, ChatMessage, ChatResponse, ToolCallOutcome, ToolInfo};

pub fn banner(cfg: &CLIConfig) {
    println!("Support Agent Debug CLI");
    println!("API: {}", cfg.base_url);
    println!(
        "Provider: {}  Model: {}  Temp: {:.2}",
        cfg.provider,
        cfg.model.clone().unwrap_or_default(),
        cfg.temperature
    );
    println!("Type /help for commands.");
}

pub fn prompt() {
    print!("> ");
    let _ = io::stdout().flush();
}

pub fn help() {
    println!("Commands:");
    println!("  /help                  Show commands");
    println!("  /exit | /quit          Exit");
    println!("  /tools                 List tools the server exposes");
    println!("  /call <tool> <json>    Invoke one tool directly");
    println!("  /system <prompt>       Set system prompt (next session)");
    println!("  /provider <name>       Set provider (next session)");
    println!("  /model <name>          Set model (next session)");
    println!("  /temp <float>          Set temperature (next session)");
    println!("  /debug [on|off]        Toggle debug output");
    println!("  /history               Show chat history");
    println!("  /reset                 Drop the server session and local history");
    println!("  /config                Show current config");
    println!("  /base <url>            Update base URL");
}

pub fn response(resp: &ChatResponse, debug: bool) {
    if let Some(err) = &resp.error {
        println!("error: {}", err);
    } else {
        println!("assistant> {}", resp.output);
    }
    if debug {
        println!("round trips: {}", resp.round_trips);
        if let Some(trace) = &resp.trace {
            println!("trace: {}", serde_json::to_string_pretty(trace).unwrap_or_default());
        }
    }
}

pub fn tools(tools: &[ToolInfo]) {
    if tools.is_empty() {
        println!("no tools");
        return;
    }
    for tool in tools {
        let params: Vec<&str> = tool
            .parameters
            .get("properties")
            .and_then(|p| p.as_object())
            .map(|props| props.keys().map(String::as_str).collect())
            .unwrap_or_default();
        println!("{}({}) - {}", tool.name, params.join(", "), tool.description);
    }
}

pub fn tool_call(outcome: &ToolCallOutcome) {
    println!("{} args={}", outcome.tool_name, outcome.resolved_arguments.clone().unwrap_or_default());
    println!("{}", serde_json::to_string_pretty(&outcome.output).unwrap_or_default());
}

pub fn config(cfg: &CLIConfig, session_id: Option<&str>) {
    println!("config:");
    println!("  base: {}", cfg.base_url);
    println!("  provider: {}", cfg.provider);
    println!("  model: {}", cfg.model.clone().unwrap_or_default());
    println!("  temp: {:.2}", cfg.temperature);
    println!("  debug: {}", cfg.debug);
    if let Some(system) = &cfg.system_prompt {
        println!("  system: {}", system);
    }
    if let Some(tools) = &cfg.allowed_tools {
        println!("  tools: {}", tools.join(","));
    }
    println!("  session: {}", session_id.unwrap_or("-"));
}

pub fn history(items: &[ChatMessage]) {
    if items.is_empty() {
        println!("no history");
        return;
    }
    for msg in items {
        println!("{}> {}", msg.role, msg.content);
    }
}

pub fn info(msg: &str) {
    println!("{}", msg);
}

pub fn error(msg: &str) {
    eprintln!("error: {}", msg);
}
