//! Prompt-response exchange
//!
//! Holds the prompt being typed and the last response. A submit spawns the
//! request on the runtime; its completion comes back over a channel and is
//! applied by `poll` (UI tick) or `settle` (one-shot mode).

use anyhow::Result;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::clipboard::ClipboardSink;
use crate::error::ExchangeError;
use crate::fence::{classify, Reply};
use crate::gemini::CompletionClient;

#[derive(Debug)]
struct Completion {
    token: u64,
    result: Result<String, ExchangeError>,
}

pub struct Exchange<C> {
    client: Arc<C>,
    prompt: String,
    response: String,
    is_code: bool,
    language: Option<String>,
    loading: bool,
    /// Last exchange ended in an `ExchangeError`
    failed: bool,

    // Request tokens; a completion is applied only if it matches `in_flight`
    next_token: u64,
    in_flight: Option<u64>,

    tx: mpsc::UnboundedSender<Completion>,
    rx: mpsc::UnboundedReceiver<Completion>,
}

impl<C: CompletionClient> Exchange<C> {
    pub fn new(client: C) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            client: Arc::new(client),
            prompt: String::new(),
            response: String::new(),
            is_code: false,
            language: None,
            loading: false,
            failed: false,
            next_token: 0,
            in_flight: None,
            tx,
            rx,
        }
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn set_prompt(&mut self, prompt: impl Into<String>) {
        self.prompt = prompt.into();
    }

    pub fn push_char(&mut self, c: char) {
        self.prompt.push(c);
    }

    pub fn pop_char(&mut self) {
        self.prompt.pop();
    }

    pub fn response(&self) -> &str {
        &self.response
    }

    pub fn is_code(&self) -> bool {
        self.is_code
    }

    /// Language tag of the extracted block, if the fence had one
    pub fn language(&self) -> Option<&str> {
        self.language.as_deref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// True when the response is an error or fallback message rather than
    /// model output
    pub fn is_failed(&self) -> bool {
        self.failed
    }

    /// Send the current prompt.
    ///
    /// Returns false without doing anything when the prompt is empty or a
    /// request is already in flight.
    pub fn submit(&mut self) -> bool {
        if self.prompt.is_empty() {
            return false;
        }
        if self.loading {
            tracing::debug!("Submit ignored, request already in flight");
            return false;
        }

        self.loading = true;
        self.is_code = false;
        self.next_token += 1;
        let token = self.next_token;
        self.in_flight = Some(token);

        tracing::info!(token, "Submitting prompt");

        let client = Arc::clone(&self.client);
        let prompt = self.prompt.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let result = client.generate(&prompt).await;
            // Receiver only goes away when the exchange is dropped
            let _ = tx.send(Completion { token, result });
        });

        true
    }

    /// Apply any completion that has arrived. Returns true if state changed.
    pub fn poll(&mut self) -> bool {
        let mut changed = false;
        while let Ok(completion) = self.rx.try_recv() {
            changed |= self.apply(completion);
        }
        changed
    }

    /// Wait for the in-flight request, if any, and apply it
    pub async fn settle(&mut self) {
        while self.loading {
            match self.rx.recv().await {
                Some(completion) => {
                    self.apply(completion);
                }
                None => break,
            }
        }
    }

    fn apply(&mut self, completion: Completion) -> bool {
        if self.in_flight != Some(completion.token) {
            tracing::debug!(token = completion.token, "Discarding stale completion");
            return false;
        }
        self.in_flight = None;

        match completion.result.and_then(|text| classify(&text)) {
            Ok(reply) => {
                self.is_code = reply.is_code();
                self.language = match &reply {
                    Reply::Code(block) => block.language.clone(),
                    Reply::Text(_) => None,
                };
                self.response = reply.into_text();
                self.failed = false;
                tracing::info!(token = completion.token, is_code = self.is_code, "Exchange completed");
            }
            Err(e) => {
                self.is_code = false;
                self.language = None;
                self.response = e.user_message();
                self.failed = true;
                tracing::info!(token = completion.token, "Exchange failed: {}", e);
            }
        }

        self.loading = false;
        self.prompt.clear();
        true
    }

    /// Copy the response to `clipboard`. Returns false when there is nothing
    /// to copy.
    pub fn copy(&self, clipboard: &mut dyn ClipboardSink) -> Result<bool> {
        if self.response.is_empty() {
            return Ok(false);
        }
        clipboard.set_text(&self.response)?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Notify;

    struct ScriptedClient {
        reply: Result<String, ExchangeError>,
        calls: AtomicUsize,
        gate: Option<Arc<Notify>>,
    }

    impl ScriptedClient {
        fn replying(reply: Result<&str, ExchangeError>) -> Self {
            Self {
                reply: reply.map(str::to_string),
                calls: AtomicUsize::new(0),
                gate: None,
            }
        }

        fn gated(reply: Result<&str, ExchangeError>, gate: Arc<Notify>) -> Self {
            Self {
                gate: Some(gate),
                ..Self::replying(reply)
            }
        }
    }

    impl CompletionClient for ScriptedClient {
        async fn generate(&self, _prompt: &str) -> Result<String, ExchangeError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            self.reply.clone()
        }
    }

    #[derive(Default)]
    struct RecordingClipboard {
        writes: Vec<String>,
    }

    impl ClipboardSink for RecordingClipboard {
        fn set_text(&mut self, text: &str) -> Result<()> {
            self.writes.push(text.to_string());
            Ok(())
        }
    }

    async fn run(reply: Result<&str, ExchangeError>) -> Exchange<ScriptedClient> {
        let mut exchange = Exchange::new(ScriptedClient::replying(reply));
        exchange.set_prompt("write something");
        assert!(exchange.submit());
        exchange.settle().await;
        exchange
    }

    #[tokio::test]
    async fn test_empty_prompt_is_noop() {
        let mut exchange = Exchange::new(ScriptedClient::replying(Ok("unused")));
        assert!(!exchange.submit());
        tokio::task::yield_now().await;

        assert!(!exchange.is_loading());
        assert!(!exchange.poll());
        assert_eq!(exchange.response(), "");
        assert_eq!(exchange.client.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_code_reply() {
        let exchange = run(Ok("```js\nconsole.log(1)\n```")).await;
        assert_eq!(exchange.response(), "console.log(1)");
        assert!(exchange.is_code());
        assert_eq!(exchange.language(), Some("js"));
        assert!(!exchange.is_loading());
        assert_eq!(exchange.prompt(), "");
    }

    #[tokio::test]
    async fn test_text_reply() {
        let exchange = run(Ok("hello")).await;
        assert_eq!(exchange.response(), "hello");
        assert!(!exchange.is_code());
        assert_eq!(exchange.language(), None);
    }

    #[tokio::test]
    async fn test_malformed_reply() {
        let exchange = run(Err(ExchangeError::MalformedResponse)).await;
        assert_eq!(exchange.response(), "No valid response from the API");
        assert!(!exchange.is_code());
    }

    #[tokio::test]
    async fn test_empty_reply() {
        let exchange = run(Ok("")).await;
        assert_eq!(exchange.response(), "No output returned");
        assert!(!exchange.is_code());
    }

    #[tokio::test]
    async fn test_request_failure() {
        let exchange = run(Err(ExchangeError::RequestFailure("network down".to_string()))).await;
        assert_eq!(exchange.response(), "Error: network down");
        assert!(!exchange.is_code());
        assert!(!exchange.is_loading());
        assert_eq!(exchange.prompt(), "");
    }

    #[tokio::test]
    async fn test_failure_flag_tracks_outcome_not_text() {
        let exchange = run(Ok("Error: this is what the model said")).await;
        assert!(!exchange.is_failed());

        let exchange = run(Err(ExchangeError::RequestFailure("network down".to_string()))).await;
        assert!(exchange.is_failed());

        let exchange = run(Err(ExchangeError::MalformedResponse)).await;
        assert!(exchange.is_failed());
    }

    #[tokio::test]
    async fn test_single_flight() {
        let gate = Arc::new(Notify::new());
        let mut exchange = Exchange::new(ScriptedClient::gated(Ok("done"), Arc::clone(&gate)));

        exchange.set_prompt("first");
        assert!(exchange.submit());
        assert!(exchange.is_loading());

        // Still loading: a second submit does nothing
        exchange.set_prompt("second");
        assert!(!exchange.submit());

        tokio::task::yield_now().await;
        assert!(!exchange.poll());
        assert!(exchange.is_loading());

        gate.notify_one();
        exchange.settle().await;

        assert!(!exchange.is_loading());
        assert_eq!(exchange.response(), "done");
        assert_eq!(exchange.prompt(), "");
        assert_eq!(exchange.client.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_submit_clears_code_flag_but_keeps_response() {
        let gate = Arc::new(Notify::new());
        let mut exchange = Exchange::new(ScriptedClient::gated(Ok("```\nls\n```"), Arc::clone(&gate)));

        exchange.set_prompt("list files");
        exchange.submit();
        gate.notify_one();
        exchange.settle().await;
        assert!(exchange.is_code());

        exchange.set_prompt("again");
        exchange.submit();
        assert!(!exchange.is_code());
        assert_eq!(exchange.response(), "ls");

        gate.notify_one();
        exchange.settle().await;
        assert!(exchange.is_code());
    }

    #[tokio::test]
    async fn test_poll_applies_completion() {
        let mut exchange = Exchange::new(ScriptedClient::replying(Ok("hi")));
        exchange.set_prompt("hello");
        exchange.submit();

        let mut applied = false;
        for _ in 0..100 {
            tokio::task::yield_now().await;
            if exchange.poll() {
                applied = true;
                break;
            }
        }

        assert!(applied);
        assert_eq!(exchange.response(), "hi");
        assert!(!exchange.is_loading());
    }

    #[tokio::test]
    async fn test_stale_completion_is_discarded() {
        let mut exchange = Exchange::new(ScriptedClient::replying(Ok("unused")));
        exchange
            .tx
            .send(Completion {
                token: 42,
                result: Ok("stale".to_string()),
            })
            .unwrap();

        assert!(!exchange.poll());
        assert_eq!(exchange.response(), "");
    }

    #[tokio::test]
    async fn test_copy() {
        let mut clipboard = RecordingClipboard::default();

        let empty = Exchange::new(ScriptedClient::replying(Ok("unused")));
        assert!(!empty.copy(&mut clipboard).unwrap());
        assert!(clipboard.writes.is_empty());

        let exchange = run(Ok("```rust\nfn main() {}\n```")).await;
        assert!(exchange.copy(&mut clipboard).unwrap());
        assert_eq!(clipboard.writes, vec!["fn main() {}".to_string()]);
    }
}
