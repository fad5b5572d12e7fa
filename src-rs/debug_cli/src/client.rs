use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde_json::Value;

use crate::models::{ChatRequest, ChatResponse, ToolCallOutcome, ToolInfo};

pub struct HTTPClient {
    pub base_url: String,
    client: Client,
}

impl HTTPClient {
    pub fn new(base_url: &str) -> Result<Self, String> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .map_err(|err| err.to_string())?;
        Ok(Self {
            base_url: base_url.to_string(),
            client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers
    }

    fn send(&self, request: RequestBuilder) -> Result<Response, String> {
        request
            .headers(self.headers())
            .send()
            .map_err(|err| err.to_string())
    }

    pub fn chat(&self, req: &ChatRequest) -> Result<ChatResponse, String> {
        let resp = self.send(self.client.post(self.url("/chat")).json(req))?;
        if resp.status().is_success() {
            resp.json::<ChatResponse>().map_err(|err| err.to_string())
        } else {
            Err(http_error(resp))
        }
    }

    pub fn list_tools(&self) -> Result<Vec<ToolInfo>, String> {
        let resp = self.send(self.client.get(self.url("/tools")))?;
        if !resp.status().is_success() {
            return Err(http_error(resp));
        }
        let value = resp.json::<Value>().map_err(|err| err.to_string())?;
        let tools = value
            .get("tools")
            .and_then(|v| v.as_array())
            .cloned()
            .unwrap_or_default();
        Ok(tools
            .into_iter()
            .filter_map(|item| serde_json::from_value::<ToolInfo>(item).ok())
            .collect())
    }

    /// Error statuses still carry a call result body.
    pub fn invoke_tool(&self, name: &str, raw: &Value) -> Result<ToolCallOutcome, String> {
        let path = format!("/tools/{}/invoke", name);
        let resp = self.send(self.client.post(self.url(&path)).json(raw))?;
        let status = resp.status();
        let body = resp.text().unwrap_or_default();
        serde_json::from_str::<ToolCallOutcome>(&body)
            .map_err(|_| format!("http {}: {}", status.as_u16(), body))
    }

    pub fn delete_session(&self, session_id: &str) -> Result<(), String> {
        let path = format!("/sessions/{}", session_id);
        let resp = self.send(self.client.delete(self.url(&path)))?;
        if resp.status().is_success() {
            Ok(())
        } else {
            Err(http_error(resp))
        }
    }
}

fn http_error(resp: Response) -> String {
    let status = resp.status();
    let body = resp.text().unwrap_or_default();
    format!("http {}: {}", status.as_u16(), body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::AUTHORIZATION;

    #[test]
    fn test_requests_send_json_without_credentials() {
        let client = HTTPClient::new("http://localhost:8080/").unwrap();
        let headers = client.headers();
        assert_eq!(headers.get(CONTENT_TYPE).unwrap(), "application/json");
        assert!(!headers.contains_key(AUTHORIZATION));
        assert_eq!(client.url("/chat"), "http://localhost:8080/chat");
    }
}
