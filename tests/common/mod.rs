//! Scripted transport shared by the gateway tests.

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::StatusCode;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use todak_fetch::transport::{OutboundRequest, TransportResponse};
use todak_fetch::{Transport, TransportError};

#[derive(Debug, Clone)]
pub enum Step {
    Respond(u16, &'static str),
    Fail,
}

/// Plays `steps` in order, then repeats `fallback` forever.
pub struct ScriptedTransport {
    steps: Mutex<VecDeque<Step>>,
    fallback: Step,
    latency: Duration,
    calls: AtomicUsize,
    seen: Mutex<Vec<OutboundRequest>>,
}

#[allow(dead_code)]
impl ScriptedTransport {
    pub fn new(steps: Vec<Step>, fallback: Step) -> Arc<Self> {
        Self::with_latency(steps, fallback, Duration::ZERO)
    }

    pub fn always(step: Step) -> Arc<Self> {
        Self::new(Vec::new(), step)
    }

    pub fn with_latency(steps: Vec<Step>, fallback: Step, latency: Duration) -> Arc<Self> {
        Arc::new(Self {
            steps: Mutex::new(steps.into()),
            fallback,
            latency,
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn seen(&self) -> Vec<OutboundRequest> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: &OutboundRequest) -> Result<TransportResponse, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push(request.clone());
        let step = {
            let mut steps = self.steps.lock().unwrap();
            steps.pop_front().unwrap_or_else(|| self.fallback.clone())
        };
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        match step {
            Step::Respond(status, body) => Ok(TransportResponse::buffered(
                StatusCode::from_u16(status).unwrap(),
                HeaderMap::new(),
                body,
            )),
            Step::Fail => Err(TransportError::Other("connection refused".into())),
        }
    }
}
