//! Bounded inference gate.
//!
//! A fixed number of slots guard the shared model. A request waits up to a
//! timeout for a slot; if none frees up it is turned away with
//! [`GateOutcome::CapacityExceeded`] instead of queueing indefinitely.
//!
//! Slots are tokio semaphore permits. A permit only exists once acquired and
//! is released when dropped, so the timeout path has nothing to give back.

use std::any::Any;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Semaphore;
use tokio::task::JoinError;

use crate::embedder::Embedder;
use crate::error::EmbedError;

pub const DEFAULT_MAX_CONCURRENT_INFERENCES: usize = 4;
pub const DEFAULT_ACQUIRE_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug)]
pub enum GateOutcome {
    Success(Vec<f32>),
    CapacityExceeded { limit: usize },
    InferenceError(EmbedError),
}

impl GateOutcome {
    pub fn capacity_exceeded_message(limit: usize) -> String {
        format!("Reached maximum concurrent model inferences limit of {limit}")
    }

    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }
}

#[derive(Clone)]
pub struct InferenceGate {
    embedder: Arc<dyn Embedder>,
    permits: Arc<Semaphore>,
    capacity: usize,
    acquire_timeout: Duration,
}

impl InferenceGate {
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn new(embedder: Arc<dyn Embedder>, capacity: usize, acquire_timeout: Duration) -> Self {
        assert!(capacity > 0, "inference gate capacity cannot be zero");
        Self {
            embedder,
            permits: Arc::new(Semaphore::new(capacity)),
            capacity,
            acquire_timeout,
        }
    }

    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn available_slots(&self) -> usize {
        self.permits.available_permits()
    }

    pub fn model_name(&self) -> &str {
        self.embedder.model_name()
    }

    pub fn dimension(&self) -> usize {
        self.embedder.dimension()
    }

    pub async fn embed(&self, text: &str) -> GateOutcome {
        self.embed_with_timeout(text, self.acquire_timeout).await
    }

    /// Embeds `text`, waiting at most `timeout` for a free slot.
    ///
    /// Never fails at the type level: capacity exhaustion and model errors
    /// come back as [`GateOutcome`] variants.
    pub async fn embed_with_timeout(&self, text: &str, timeout: Duration) -> GateOutcome {
        let start = Instant::now();
        let acquire = Arc::clone(&self.permits).acquire_owned();
        let permit = match tokio::time::timeout(timeout, acquire).await {
            Ok(Ok(permit)) => permit,
            Ok(Err(closed)) => {
                let err = EmbedError::TaskFailed(closed.to_string());
                tracing::error!(error = %err, "Inference gate is closed");
                log_elapsed(start, false);
                return GateOutcome::InferenceError(err);
            }
            Err(_) => {
                tracing::warn!(
                    limit = self.capacity,
                    "{}",
                    GateOutcome::capacity_exceeded_message(self.capacity)
                );
                log_elapsed(start, false);
                return GateOutcome::CapacityExceeded {
                    limit: self.capacity,
                };
            }
        };

        // The task owns the permit and does the logging, so a caller that
        // stops waiting neither frees the slot early nor loses the diagnostic.
        let embedder = Arc::clone(&self.embedder);
        let text = text.to_owned();
        let task = tokio::spawn(async move {
            let inference = tokio::spawn(async move { embedder.embed(&text).await });
            let outcome = match inference.await {
                Ok(Ok(vector)) => GateOutcome::Success(vector),
                Ok(Err(err)) => failed(err),
                Err(join_err) => failed(EmbedError::TaskFailed(describe_join_error(join_err))),
            };
            log_elapsed(start, outcome.is_success());
            drop(permit);
            outcome
        });

        match task.await {
            Ok(outcome) => outcome,
            Err(join_err) => failed(EmbedError::TaskFailed(describe_join_error(join_err))),
        }
    }
}

fn failed(err: EmbedError) -> GateOutcome {
    tracing::error!(error = ?err, "Error running inference: {err}");
    GateOutcome::InferenceError(err)
}

fn log_elapsed(start: Instant, success: bool) {
    let elapsed = start.elapsed().as_secs_f64();
    tracing::info!(
        elapsed_secs = elapsed,
        success,
        "Request took {elapsed} seconds."
    );
}

impl std::fmt::Debug for InferenceGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InferenceGate")
            .field("model", &self.embedder.model_name())
            .field("capacity", &self.capacity)
            .field("available", &self.available_slots())
            .field("acquire_timeout", &self.acquire_timeout)
            .finish()
    }
}

fn describe_join_error(err: JoinError) -> String {
    if err.is_panic() {
        let payload = err.into_panic();
        format!("model panicked: {}", panic_message(payload.as_ref()))
    } else {
        err.to_string()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic payload")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use async_trait::async_trait;
    use std::io;
    use std::sync::Mutex;
    use tokio::sync::mpsc;
    use tokio::task::JoinSet;

    /// Deterministic stand-in: one dimension per leading byte.
    struct ByteEmbedder;

    #[async_trait]
    impl Embedder for ByteEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            match text {
                "" => Err(EmbedError::EmptyInput),
                "boom" => Err(EmbedError::Model("synthetic failure".into())),
                "panic" => panic!("synthetic panic"),
                _ => Ok(text.bytes().take(4).map(f32::from).collect()),
            }
        }

        fn dimension(&self) -> usize {
            4
        }

        fn model_name(&self) -> &str {
            "bytes"
        }
    }

    /// Reports when a call starts, then parks until the test hands out a
    /// release permit.
    struct HeldEmbedder {
        started: mpsc::UnboundedSender<()>,
        release: Arc<Semaphore>,
    }

    #[async_trait]
    impl Embedder for HeldEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            let _ = self.started.send(());
            self.release
                .acquire()
                .await
                .map_err(|e| EmbedError::TaskFailed(e.to_string()))?
                .forget();
            Ok(vec![1.0, 2.0])
        }

        fn dimension(&self) -> usize {
            2
        }

        fn model_name(&self) -> &str {
            "held"
        }
    }

    /// Fails after a delay long enough for the caller to give up first.
    struct SlowFailingEmbedder;

    #[async_trait]
    impl Embedder for SlowFailingEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            tokio::time::sleep(Duration::from_millis(50)).await;
            Err(EmbedError::Model("weights file truncated".into()))
        }

        fn dimension(&self) -> usize {
            2
        }

        fn model_name(&self) -> &str {
            "slow"
        }
    }

    #[derive(Clone, Default)]
    struct LogBuffer(Arc<Mutex<Vec<u8>>>);

    impl LogBuffer {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    impl io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn held_gate(
        capacity: usize,
        timeout: Duration,
    ) -> (InferenceGate, mpsc::UnboundedReceiver<()>, Arc<Semaphore>) {
        let (started, rx) = mpsc::unbounded_channel();
        let release = Arc::new(Semaphore::new(0));
        let embedder = HeldEmbedder {
            started,
            release: Arc::clone(&release),
        };
        (
            InferenceGate::new(Arc::new(embedder), capacity, timeout),
            rx,
            release,
        )
    }

    #[tokio::test]
    async fn test_success_returns_vector_and_frees_slot() {
        let gate = InferenceGate::new(Arc::new(ByteEmbedder), 4, DEFAULT_ACQUIRE_TIMEOUT);

        match gate.embed("hi").await {
            GateOutcome::Success(vector) => assert_eq!(vector, vec![104.0, 105.0]),
            other => panic!("Expected Success, got {other:?}"),
        }
        assert_eq!(gate.available_slots(), 4);
        assert_eq!(gate.dimension(), 4);
    }

    #[tokio::test]
    async fn test_identical_requests_return_identical_vectors() {
        let gate = InferenceGate::new(Arc::new(ByteEmbedder), 2, DEFAULT_ACQUIRE_TIMEOUT);

        let GateOutcome::Success(first) = gate.embed("hello").await else {
            panic!("Expected Success");
        };
        let GateOutcome::Success(second) = gate.embed("hello").await else {
            panic!("Expected Success");
        };
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_inference_error_releases_slot() {
        let gate = InferenceGate::new(Arc::new(ByteEmbedder), 1, Duration::from_millis(50));

        match gate.embed("boom").await {
            GateOutcome::InferenceError(EmbedError::Model(msg)) => {
                assert_eq!(msg, "synthetic failure");
            }
            other => panic!("Expected InferenceError, got {other:?}"),
        }
        assert_eq!(gate.available_slots(), 1);

        // The single slot is usable straight away.
        assert!(gate.embed("ok").await.is_success());
    }

    #[tokio::test]
    async fn test_empty_input_is_an_inference_error() {
        let gate = InferenceGate::new(Arc::new(ByteEmbedder), 1, DEFAULT_ACQUIRE_TIMEOUT);

        assert!(matches!(
            gate.embed("").await,
            GateOutcome::InferenceError(EmbedError::EmptyInput)
        ));
        assert_eq!(gate.available_slots(), 1);
    }

    #[tokio::test]
    async fn test_panic_is_caught_and_slot_released() {
        let gate = InferenceGate::new(Arc::new(ByteEmbedder), 1, DEFAULT_ACQUIRE_TIMEOUT);

        match gate.embed("panic").await {
            GateOutcome::InferenceError(EmbedError::TaskFailed(msg)) => {
                assert!(msg.contains("synthetic panic"), "unexpected message: {msg}");
            }
            other => panic!("Expected TaskFailed, got {other:?}"),
        }
        assert_eq!(gate.available_slots(), 1);
    }

    #[tokio::test]
    async fn test_capacity_exceeded_when_all_slots_held() {
        let (gate, mut started, release) = held_gate(1, Duration::from_millis(50));

        let holder = {
            let gate = gate.clone();
            tokio::spawn(async move { gate.embed("first").await })
        };
        started.recv().await.unwrap();
        assert_eq!(gate.available_slots(), 0);

        assert!(matches!(
            gate.embed("second").await,
            GateOutcome::CapacityExceeded { limit: 1 }
        ));

        release.add_permits(1);
        assert!(holder.await.unwrap().is_success());
        assert_eq!(gate.available_slots(), 1);
    }

    #[tokio::test]
    async fn test_timeouts_never_widen_the_gate() {
        let (gate, mut started, release) = held_gate(1, Duration::from_millis(10));

        let holder = {
            let gate = gate.clone();
            tokio::spawn(async move { gate.embed("first").await })
        };
        started.recv().await.unwrap();

        for _ in 0..3 {
            assert!(matches!(
                gate.embed("again").await,
                GateOutcome::CapacityExceeded { .. }
            ));
        }

        release.add_permits(1);
        holder.await.unwrap();
        assert_eq!(gate.available_slots(), gate.capacity());
    }

    #[tokio::test]
    async fn test_caller_timeout_overrides_default() {
        let (gate, mut started, release) = held_gate(1, Duration::from_secs(60));

        let holder = {
            let gate = gate.clone();
            tokio::spawn(async move { gate.embed("first").await })
        };
        started.recv().await.unwrap();

        let outcome = gate
            .embed_with_timeout("second", Duration::from_millis(20))
            .await;
        assert!(matches!(outcome, GateOutcome::CapacityExceeded { limit: 1 }));

        release.add_permits(1);
        holder.await.unwrap();
    }

    #[tokio::test]
    async fn test_requests_up_to_capacity_all_succeed() {
        let (gate, mut started, release) = held_gate(4, Duration::from_millis(50));

        let mut set = JoinSet::new();
        for i in 0..4 {
            let gate = gate.clone();
            set.spawn(async move { gate.embed(&format!("text {i}")).await });
        }
        for _ in 0..4 {
            started.recv().await.unwrap();
        }
        assert_eq!(gate.available_slots(), 0);

        release.add_permits(4);
        while let Some(outcome) = set.join_next().await {
            assert!(outcome.unwrap().is_success());
        }
        assert_eq!(gate.available_slots(), 4);
    }

    #[tokio::test]
    async fn test_one_over_capacity_is_rejected_while_slots_are_held() {
        let (gate, mut started, release) = held_gate(4, Duration::from_millis(50));

        let mut set = JoinSet::new();
        for _ in 0..4 {
            let gate = gate.clone();
            set.spawn(async move { gate.embed("hello").await });
        }
        for _ in 0..4 {
            started.recv().await.unwrap();
        }

        match gate.embed("hello").await {
            GateOutcome::CapacityExceeded { limit } => {
                assert_eq!(
                    GateOutcome::capacity_exceeded_message(limit),
                    "Reached maximum concurrent model inferences limit of 4"
                );
            }
            other => panic!("Expected CapacityExceeded, got {other:?}"),
        }

        release.add_permits(4);
        while let Some(outcome) = set.join_next().await {
            assert!(outcome.unwrap().is_success());
        }
    }

    #[tokio::test]
    async fn test_five_concurrent_hellos_with_fast_model() {
        let gate = InferenceGate::new(Arc::new(ByteEmbedder), 4, DEFAULT_ACQUIRE_TIMEOUT);

        let mut set = JoinSet::new();
        for _ in 0..5 {
            let gate = gate.clone();
            set.spawn(async move { gate.embed("hello").await });
        }

        let mut successes = 0;
        while let Some(outcome) = set.join_next().await {
            match outcome.unwrap() {
                GateOutcome::Success(vector) => {
                    assert_eq!(vector, vec![104.0, 101.0, 108.0, 108.0]);
                    successes += 1;
                }
                GateOutcome::CapacityExceeded { limit } => assert_eq!(limit, 4),
                GateOutcome::InferenceError(e) => panic!("unexpected error: {e}"),
            }
        }
        assert!(successes >= 4);
        assert_eq!(gate.available_slots(), 4);
    }

    #[tokio::test]
    async fn test_abandoned_request_still_logs_outcome() {
        let logs = LogBuffer::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer({
                let logs = logs.clone();
                move || logs.clone()
            })
            .with_ansi(false)
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let gate = InferenceGate::new(Arc::new(SlowFailingEmbedder), 1, DEFAULT_ACQUIRE_TIMEOUT);
        let caller = tokio::time::timeout(Duration::from_millis(10), gate.embed("x")).await;
        assert!(caller.is_err(), "caller should have given up first");

        tokio::time::timeout(Duration::from_secs(5), async {
            while gate.available_slots() < 1 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("slot never came back");

        let output = logs.contents();
        assert!(output.contains("weights file truncated"), "logs: {output}");
        assert!(output.contains("Request took"), "logs: {output}");
    }

    #[test]
    #[should_panic(expected = "capacity cannot be zero")]
    fn test_zero_capacity_rejected() {
        let _ = InferenceGate::new(Arc::new(ByteEmbedder), 0, DEFAULT_ACQUIRE_TIMEOUT);
    }
}
