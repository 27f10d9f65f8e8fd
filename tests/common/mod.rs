#![allow(dead_code)]

use async_trait::async_trait;
use blab_watson_bridge::error::AssistantError;
use blab_watson_bridge::{AssistantService, Settings};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// One call to `FakeAssistant::message`.
#[derive(Debug, Clone, PartialEq)]
pub struct SentMessage {
    pub session_id: String,
    pub text: String,
    pub user_id: String,
}

/// In-process assistant answering from a fixed script.
#[derive(Default)]
pub struct FakeAssistant {
    replies: HashMap<String, Vec<Value>>,
    sessions_created: AtomicUsize,
    sent: Mutex<Vec<SentMessage>>,
}

impl FakeAssistant {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(mut self, text: &str, items: Vec<Value>) -> Self {
        self.replies.insert(text.to_string(), items);
        self
    }

    pub fn sessions_created(&self) -> usize {
        self.sessions_created.load(Ordering::SeqCst)
    }

    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl AssistantService for FakeAssistant {
    async fn create_session(&self) -> Result<String, AssistantError> {
        let n = self.sessions_created.fetch_add(1, Ordering::SeqCst);
        Ok(format!("fake-session-{}", n))
    }

    async fn message(
        &self,
        session_id: &str,
        text: &str,
        user_id: &str,
    ) -> Result<Vec<Value>, AssistantError> {
        self.sent.lock().unwrap().push(SentMessage {
            session_id: session_id.to_string(),
            text: text.to_string(),
            user_id: user_id.to_string(),
        });
        match self.replies.get(text) {
            Some(items) => Ok(items.clone()),
            None => Err(AssistantError::Api {
                status: 500,
                message: format!("no scripted reply for {:?}", text),
            }),
        }
    }
}

/// The assistant used throughout the end-to-end tests.
pub fn scripted_assistant() -> FakeAssistant {
    FakeAssistant::new()
        .reply(" ", vec![json!({ "response_type": "text", "text": "Welcome!" })])
        .reply(
            "hi",
            vec![
                json!({ "response_type": "text", "text": "Hello!" }),
                json!({
                    "response_type": "option",
                    "title": "Pick one",
                    "options": [{ "label": "A" }, { "label": "B" }]
                }),
            ],
        )
}

pub fn test_settings(controller_ws_url: &str) -> Settings {
    Settings::defaults()
        .unwrap()
        .set_override("environment", "test")
        .unwrap()
        .set_override("controller.ws_url", controller_ws_url)
        .unwrap()
        .set_override("watson.service_url", "https://api.test.assistant.watson.cloud.ibm.com/instances/test")
        .unwrap()
        .set_override("watson.api_key", "test_api_key")
        .unwrap()
        .set_override("watson.assistant_id", "test-assistant")
        .unwrap()
        .build()
        .unwrap()
        .try_deserialize()
        .unwrap()
}
