use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Barrier;
use tts_relay::domain::cache::{FetchError, FetchRequest, FetchResponse};
use tts_relay::infrastructure::http::HttpTransport;

/// Scripted transport: answers by URL, counts calls, can fail or rendezvous.
#[derive(Default)]
pub struct MockTransport {
    responses: Mutex<HashMap<String, FetchResponse>>,
    calls: AtomicUsize,
    requests: Mutex<Vec<FetchRequest>>,
    fail_with: Mutex<Option<String>>,
    barrier: Mutex<Option<Arc<Barrier>>>,
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn respond(&self, url: &str, status: u16, body: &[u8]) {
        let headers = HashMap::from([
            ("content-type".to_string(), "application/octet-stream".to_string()),
            ("x-served-by".to_string(), "mock".to_string()),
        ]);
        self.responses.lock().unwrap().insert(
            url.to_string(),
            FetchResponse {
                status,
                headers,
                body: body.to_vec(),
            },
        );
    }

    pub fn fail_with(&self, message: &str) {
        *self.fail_with.lock().unwrap() = Some(message.to_string());
    }

    /// Every call waits for `parties` calls to arrive before answering
    pub fn rendezvous(&self, parties: usize) {
        *self.barrier.lock().unwrap() = Some(Arc::new(Barrier::new(parties)));
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<FetchRequest> {
        self.requests.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl HttpTransport for MockTransport {
    async fn send(&self, request: &FetchRequest) -> Result<FetchResponse, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());

        let barrier = self.barrier.lock().unwrap().clone();
        if let Some(barrier) = barrier {
            barrier.wait().await;
        }

        if let Some(message) = self.fail_with.lock().unwrap().clone() {
            return Err(FetchError::Transport(message));
        }

        let response = self.responses.lock().unwrap().get(&request.url).cloned();
        Ok(response.unwrap_or(FetchResponse {
            status: 404,
            headers: HashMap::new(),
            body: b"not found".to_vec(),
        }))
    }
}
