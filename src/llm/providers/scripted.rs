//! Scripted provider: replays canned replies in order and records every
//! request it receives. Drives the conversation loop in tests and demos.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::llm::{LlmResponse, ProviderError};

/// A request as seen by the scripted provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptedRequest {
    pub content: String,
    pub system: Option<String>,
}

#[derive(Debug)]
enum Reply {
    Text(String),
    Failure(String),
    /// Never completes.
    Hang,
}

#[derive(Debug, Default)]
struct Script {
    replies: VecDeque<Reply>,
    requests: Vec<ScriptedRequest>,
}

/// Clones share one script.
#[derive(Debug, Clone, Default)]
pub struct ScriptedProvider {
    script: Arc<Mutex<Script>>,
}

impl ScriptedProvider {
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let p = Self::default();
        for r in replies {
            p.push_reply(r);
        }
        p
    }

    pub fn push_reply(&self, reply: impl Into<String>) {
        self.lock().replies.push_back(Reply::Text(reply.into()));
    }

    /// Queue a transport-style failure.
    pub fn push_failure(&self, message: impl Into<String>) {
        self.lock().replies.push_back(Reply::Failure(message.into()));
    }

    /// Queue a request that never gets an answer.
    pub fn push_hang(&self) {
        self.lock().replies.push_back(Reply::Hang);
    }

    pub fn requests(&self) -> Vec<ScriptedRequest> {
        self.lock().requests.clone()
    }

    pub fn remaining(&self) -> usize {
        self.lock().replies.len()
    }

    pub async fn complete(
        &self,
        content: &str,
        system: Option<&str>,
    ) -> Result<LlmResponse, ProviderError> {
        let next = {
            let mut script = self.lock();
            script.requests.push(ScriptedRequest {
                content: content.to_string(),
                system: system.map(String::from),
            });
            script.replies.pop_front()
        };
        match next {
            Some(Reply::Text(text)) => Ok(LlmResponse::text(text)),
            Some(Reply::Failure(message)) => Err(ProviderError::Request(message)),
            Some(Reply::Hang) => std::future::pending().await,
            None => Err(ProviderError::Request("script exhausted".into())),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn replays_in_order_and_records() {
        let p = ScriptedProvider::new(["one", "two"]);
        assert_eq!(p.complete("a", None).await.unwrap().text, "one");
        assert_eq!(p.complete("b", Some("sys")).await.unwrap().text, "two");
        let reqs = p.requests();
        assert_eq!(reqs.len(), 2);
        assert_eq!(reqs[1].system.as_deref(), Some("sys"));
        assert_eq!(p.remaining(), 0);
    }

    #[tokio::test]
    async fn failure_and_exhaustion_are_errors() {
        let p = ScriptedProvider::default();
        p.push_failure("rate limited");
        assert!(p.complete("x", None).await.unwrap_err().to_string().contains("rate limited"));
        assert!(p.complete("x", None).await.unwrap_err().to_string().contains("exhausted"));
    }

    #[tokio::test(start_paused = true)]
    async fn hang_never_answers() {
        let p = ScriptedProvider::default();
        p.push_hang();
        let res = tokio::time::timeout(std::time::Duration::from_secs(30), p.complete("x", None)).await;
        assert!(res.is_err());
        assert_eq!(p.requests().len(), 1);
    }

    #[tokio::test]
    async fn clones_share_script() {
        let p = ScriptedProvider::new(["shared"]);
        let q = p.clone();
        assert_eq!(q.complete("x", None).await.unwrap().text, "shared");
        assert_eq!(p.requests().len(), 1);
    }
}
