//! Test doubles shared by adapter tests

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::http::{HttpClient, HttpResponse, TransportError};

/// Replays scripted responses and records request parameters
#[derive(Default)]
pub struct ScriptedHttp {
    responses: Mutex<VecDeque<Result<HttpResponse, TransportError>>>,
    pub requests: Mutex<Vec<(String, Vec<(String, String)>)>>,
}

impl ScriptedHttp {
    pub fn new(responses: Vec<Result<HttpResponse, TransportError>>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into()),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn url(&self, call: usize) -> String {
        self.requests.lock()[call].0.clone()
    }

    pub fn param(&self, call: usize, name: &str) -> Option<String> {
        self.requests.lock()[call]
            .1
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.clone())
    }
}

#[async_trait]
impl HttpClient for ScriptedHttp {
    async fn get(
        &self,
        url: &str,
        params: &[(String, String)],
        _timeout: Duration,
    ) -> Result<HttpResponse, TransportError> {
        self.requests.lock().push((url.to_string(), params.to_vec()));
        self.responses
            .lock()
            .pop_front()
            .unwrap_or(Err(TransportError::Other("no scripted response".into())))
    }
}
