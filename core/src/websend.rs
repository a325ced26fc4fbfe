//! Websend module: console commands queued on the website for a Minecraft
//! server, and console output sent back.

use std::sync::Arc;

use serde_json::json;

use crate::error::FluxError;
use crate::request::{decode_field, RequestHandler};
use crate::types::WebsendCommand;

#[derive(Debug, Clone)]
pub struct WebsendApi {
    requests: Arc<RequestHandler>,
}

impl WebsendApi {
    pub fn new(requests: Arc<RequestHandler>) -> Self {
        Self { requests }
    }

    /// Commands waiting to be run on the given server.
    pub fn commands(&self, server_id: u64) -> Result<Vec<WebsendCommand>, FluxError> {
        let server_id = server_id.to_string();
        let mut envelope = self
            .requests
            .get("websend/commands", &[("server_id", &server_id)])?;
        decode_field(&mut envelope, "commands")
    }

    pub fn send_console_log<I, S>(&self, server_id: u64, lines: I) -> Result<(), FluxError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let content: Vec<String> = lines.into_iter().map(Into::into).collect();
        self.requests.post(
            "websend/console",
            &json!({ "server_id": server_id, "content": content }),
        )?;
        Ok(())
    }
}
