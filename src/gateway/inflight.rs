//! In-flight request registry.

use super::response::CachedResponse;
use super::signature::RequestSignature;
use crate::transport::TransportError;
use futures::future::{BoxFuture, Shared};
use std::collections::HashMap;
use std::sync::Mutex;

/// Outcome handed to every caller joined on one signature.
pub(crate) type SharedOutcome = Shared<BoxFuture<'static, Result<CachedResponse, TransportError>>>;

pub(crate) enum Slot {
    /// A request for this signature was already pending.
    Joined(SharedOutcome),
    /// This caller installed the entry and must drive it.
    Leader(SharedOutcome),
}

#[derive(Default)]
pub(crate) struct InFlightRegistry {
    pending: Mutex<HashMap<RequestSignature, SharedOutcome>>,
}

impl InFlightRegistry {
    /// Join the pending request for `key`, or install the one built by `start`.
    ///
    /// Lookup and insert happen under one lock with no await in between, so two
    /// callers can never both observe an empty slot.
    pub fn join_or_start<F>(&self, key: &RequestSignature, start: F) -> Slot
    where
        F: FnOnce() -> SharedOutcome,
    {
        let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(existing) = pending.get(key) {
            return Slot::Joined(existing.clone());
        }
        let outcome = start();
        pending.insert(key.clone(), outcome.clone());
        Slot::Leader(outcome)
    }

    pub fn remove(&self, key: &RequestSignature) {
        self.pending
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(key);
    }

    pub fn len(&self) -> usize {
        self.pending.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;
    use reqwest::header::HeaderMap;
    use reqwest::StatusCode;

    fn ready(body: &'static str) -> SharedOutcome {
        async move { Ok(CachedResponse::new(StatusCode::OK, HeaderMap::new(), body)) }
            .boxed()
            .shared()
    }

    #[tokio::test]
    async fn second_caller_joins_the_first() {
        let registry = InFlightRegistry::default();
        let key = RequestSignature::from("/api/user/streak::");

        let first = match registry.join_or_start(&key, || ready("a")) {
            Slot::Leader(o) => o,
            Slot::Joined(_) => panic!("empty registry must start a request"),
        };
        let second = match registry.join_or_start(&key, || ready("b")) {
            Slot::Joined(o) => o,
            Slot::Leader(_) => panic!("pending request must be joined"),
        };
        assert_eq!(registry.len(), 1);

        let (a, b) = futures::join!(first, second);
        let (a, b) = (a.unwrap(), b.unwrap());
        assert_eq!(b.text(), "a");
        assert!(CachedResponse::ptr_eq(&a, &b));

        registry.remove(&key);
        assert_eq!(registry.len(), 0);
    }
}
