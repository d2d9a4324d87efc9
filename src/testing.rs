//! Test doubles shared across module tests

use crate::backend::{
    BackendAdapter, BackendError, HttpReply, RequestConfig, Transport, text_at,
};
use crate::events::{EventSink, GenerationEvent};
use crate::question::Prompt;
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

#[derive(Clone)]
enum Step {
    Reply(Result<HttpReply, BackendError>),
    Hang,
}

#[derive(Default)]
struct Script {
    queue: VecDeque<Step>,
    sticky: Option<Step>,
}

/// Transport that replays scripted replies per URL
///
/// Queued replies are used first, then the sticky one set by `always`.
/// An unscripted URL fails with a network error.
#[derive(Default)]
pub struct ScriptedTransport {
    scripts: Mutex<HashMap<String, Script>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, url: &str, reply: Result<HttpReply, BackendError>) {
        self.script(url, |s| s.queue.push_back(Step::Reply(reply)));
    }

    pub fn always(&self, url: &str, reply: Result<HttpReply, BackendError>) {
        self.script(url, |s| s.sticky = Some(Step::Reply(reply)));
    }

    /// Never answer requests to `url`
    pub fn hang(&self, url: &str) {
        self.script(url, |s| s.sticky = Some(Step::Hang));
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, url: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| *c == url).count()
    }

    fn script(&self, url: &str, f: impl FnOnce(&mut Script)) {
        let mut scripts = self.scripts.lock().unwrap();
        f(scripts.entry(url.to_string()).or_default());
    }

    fn next_step(&self, url: &str) -> Option<Step> {
        let mut scripts = self.scripts.lock().unwrap();
        let script = scripts.get_mut(url)?;
        script.queue.pop_front().or_else(|| script.sticky.clone())
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: &RequestConfig) -> Result<HttpReply, BackendError> {
        self.calls.lock().unwrap().push(request.url.clone());

        match self.next_step(&request.url) {
            Some(Step::Reply(reply)) => reply,
            Some(Step::Hang) => std::future::pending().await,
            None => Err(BackendError::network(format!(
                "no scripted reply for {}",
                request.url
            ))),
        }
    }
}

/// Minimal adapter speaking `{"text": ...}` envelopes
#[derive(Debug, Clone)]
pub struct FakeBackend {
    name: String,
    max_retries: u32,
}

impl FakeBackend {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            max_retries: 0,
        }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn url(&self) -> String {
        backend_url(&self.name)
    }
}

/// Request URL used by a `FakeBackend` of that name
pub fn backend_url(name: &str) -> String {
    format!("https://{}.test/generate", name)
}

impl BackendAdapter for FakeBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn has_credentials(&self) -> bool {
        true
    }

    fn build_request(&self, prompt: &Prompt) -> Result<RequestConfig, BackendError> {
        Ok(RequestConfig::post(
            self.url(),
            serde_json::json!({"system": prompt.system, "prompt": prompt.user}),
        )
        .with_timeout(Duration::from_secs(10))
        .with_max_retries(self.max_retries))
    }

    fn parse_response(&self, body: &serde_json::Value) -> Result<String, BackendError> {
        text_at(body, "/text", &self.name).map(str::to_string)
    }
}

/// 200 reply wrapping `text` in a `FakeBackend` envelope
pub fn text_reply(text: &str) -> Result<HttpReply, BackendError> {
    Ok(HttpReply::new(
        200,
        serde_json::json!({ "text": text }).to_string(),
    ))
}

/// 200 reply carrying a well-formed question payload
pub fn question_reply(question: &str, correct: &str, wrong: &[&str]) -> Result<HttpReply, BackendError> {
    let mut answers = vec![serde_json::json!({"text": correct, "isCorrect": true})];
    answers.extend(
        wrong
            .iter()
            .map(|w| serde_json::json!({"text": w, "isCorrect": false})),
    );
    let payload = serde_json::json!({
        "question": question,
        "answers": answers,
    });
    text_reply(&payload.to_string())
}

/// Sink that keeps every event for later inspection
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<GenerationEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<GenerationEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn kinds(&self) -> Vec<&'static str> {
        self.events.lock().unwrap().iter().map(|e| e.kind()).collect()
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: GenerationEvent) {
        self.events.lock().unwrap().push(event);
    }
}
