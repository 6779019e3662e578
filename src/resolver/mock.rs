//! Scripted [`Registry`] for tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::CommandFailure;
use crate::resolver::registry::Registry;

type Reply = Result<String, CommandFailure>;

/// Replays scripted replies; the last scripted reply repeats forever.
#[derive(Default)]
pub(crate) struct MockRegistry {
    lists: Mutex<VecDeque<Reply>>,
    bind_replies: Mutex<VecDeque<Reply>>,
    list_calls: Mutex<u32>,
    binds: Mutex<Vec<(String, String)>>,
}

impl MockRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn list_ok(self, listing: &str) -> Self {
        self.push_list(Ok(listing.to_string()))
    }

    pub(crate) fn list_err(self, output: &str) -> Self {
        self.push_list(Err(CommandFailure::new("aconnect -l", "exit status: 1", output)))
    }

    pub(crate) fn bind_err(self, output: &str) -> Self {
        self.bind_replies
            .lock()
            .unwrap()
            .push_back(Err(CommandFailure::new("aconnect", "exit status: 1", output)));
        self
    }

    pub(crate) fn list_calls(&self) -> u32 {
        *self.list_calls.lock().unwrap()
    }

    pub(crate) fn binds(&self) -> Vec<(String, String)> {
        self.binds.lock().unwrap().clone()
    }

    fn push_list(self, reply: Reply) -> Self {
        self.lists.lock().unwrap().push_back(reply);
        self
    }
}

fn next(script: &Mutex<VecDeque<Reply>>, fallback: Reply) -> Reply {
    let mut script = script.lock().unwrap();
    match script.len() {
        0 => fallback,
        1 => script[0].clone(),
        _ => script.pop_front().unwrap_or(fallback),
    }
}

#[async_trait]
impl Registry for MockRegistry {
    async fn list(&self) -> Result<String, CommandFailure> {
        *self.list_calls.lock().unwrap() += 1;
        next(&self.lists, Ok(String::new()))
    }

    async fn bind(&self, source: &str, target: &str) -> Result<String, CommandFailure> {
        self.binds
            .lock()
            .unwrap()
            .push((source.to_string(), target.to_string()));
        next(&self.bind_replies, Ok(String::new()))
    }
}
