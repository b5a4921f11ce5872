//! Duplicate request suppression
//!
//! Clients retransmit a request when its response is slow or lost. The
//! [`Deduplicator`] remembers each `(source address, identifier)` pair for a
//! fixed window and answers repeats inside the window with "no action", so
//! the wrapped handler runs at most once per pair per window.
//!
//! Keying on the identifier alone means a genuinely new request that reuses
//! an identifier from the same address inside the window is also suppressed.

use crate::error::HandlerError;
use crate::handler::RequestHandler;
use crate::timer::{Timer, TokioTimer};
use crate::transport::Transport;
use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use radius_codec::Packet;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, trace};

/// How long a request is remembered
pub const DEFAULT_DEDUP_TIMEOUT: Duration = Duration::from_secs(30);

/// Request fingerprint for deduplication
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestKey {
    pub remote: SocketAddr,
    pub identifier: u8,
}

/// How the wrapped handler finished
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Responded,
    NoResponse,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryState {
    /// The handler is still running
    Pending,
    Settled(Outcome),
}

#[derive(Debug)]
struct CacheEntry {
    generation: u64,
    state: EntryState,
}

/// Wraps a [`RequestHandler`], suppressing repeats of in-flight or recent requests
pub struct Deduplicator<H, T = TokioTimer> {
    inner: H,
    timer: T,
    timeout: Duration,
    cache: Arc<DashMap<RequestKey, CacheEntry>>,
    generation: AtomicU64,
}

impl<H: RequestHandler> Deduplicator<H, TokioTimer> {
    pub fn new(inner: H) -> Self {
        Self::with_timeout(inner, DEFAULT_DEDUP_TIMEOUT)
    }

    pub fn with_timeout(inner: H, timeout: Duration) -> Self {
        Self::with_timer(inner, TokioTimer, timeout)
    }
}

impl<H: RequestHandler, T: Timer> Deduplicator<H, T> {
    pub fn with_timer(inner: H, timer: T, timeout: Duration) -> Self {
        Deduplicator {
            inner,
            timer,
            timeout,
            cache: Arc::new(DashMap::new()),
            generation: AtomicU64::new(0),
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// State of the entry for `(remote, identifier)`, if one is cached
    pub fn entry_state(&self, remote: SocketAddr, identifier: u8) -> Option<EntryState> {
        self.cache
            .get(&RequestKey { remote, identifier })
            .map(|entry| entry.state)
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    /// Forget every cached request
    ///
    /// Evictions already scheduled for the removed entries become no-ops.
    pub fn clear(&self) {
        self.cache.clear();
    }

    /// Insert a pending entry unless `key` is already cached
    fn try_claim(&self, key: RequestKey) -> Option<u64> {
        match self.cache.entry(key) {
            Entry::Occupied(_) => None,
            Entry::Vacant(vacant) => {
                let generation = self.generation.fetch_add(1, Ordering::Relaxed);
                vacant.insert(CacheEntry {
                    generation,
                    state: EntryState::Pending,
                });
                Some(generation)
            }
        }
    }

    fn schedule_eviction(&self, key: RequestKey, generation: u64) {
        let cache = Arc::clone(&self.cache);
        self.timer.schedule(
            self.timeout,
            Box::new(move || {
                if cache
                    .remove_if(&key, |_, entry| entry.generation == generation)
                    .is_some()
                {
                    trace!(client_addr = %key.remote, request_id = key.identifier, "Evicted request");
                }
            }),
        );
    }

    fn settle(&self, key: RequestKey, generation: u64, outcome: Outcome) {
        if let Some(mut entry) = self.cache.get_mut(&key) {
            if entry.generation == generation {
                entry.state = EntryState::Settled(outcome);
            }
        }
    }
}

#[async_trait]
impl<H: RequestHandler, T: Timer> RequestHandler for Deduplicator<H, T> {
    async fn handle(
        &self,
        transport: &dyn Transport,
        request: &Packet,
        remote: SocketAddr,
        secret: &[u8],
    ) -> Result<Option<Packet>, HandlerError> {
        let key = RequestKey {
            remote,
            identifier: request.identifier(),
        };

        let Some(generation) = self.try_claim(key) else {
            debug!(
                client_addr = %remote,
                request_id = key.identifier,
                "Suppressing duplicate request"
            );
            return Ok(None);
        };
        self.schedule_eviction(key, generation);

        let result = self.inner.handle(transport, request, remote, secret).await;
        let outcome = match &result {
            Ok(Some(_)) => Outcome::Responded,
            Ok(None) => Outcome::NoResponse,
            Err(_) => Outcome::Failed,
        };
        self.settle(key, generation, outcome);

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timer::TimerTask;
    use radius_codec::{AccessRequest, Code, RadiusPacket, default_dictionary};
    use std::sync::Mutex;
    use std::sync::atomic::AtomicUsize;
    use tokio::net::UdpSocket;
    use tokio::sync::Notify;

    /// Timer whose tasks only run when the test fires them
    #[derive(Default)]
    struct ManualTimer {
        tasks: Mutex<Vec<(Duration, TimerTask)>>,
    }

    impl ManualTimer {
        fn pending(&self) -> usize {
            self.tasks.lock().unwrap().len()
        }

        fn fire_next(&self) {
            let (_, task) = self.tasks.lock().unwrap().remove(0);
            task();
        }
    }

    impl Timer for ManualTimer {
        fn schedule(&self, delay: Duration, task: TimerTask) {
            self.tasks.lock().unwrap().push((delay, task));
        }
    }

    #[derive(Default)]
    struct CountingHandler {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl RequestHandler for CountingHandler {
        async fn handle(
            &self,
            _transport: &dyn Transport,
            request: &Packet,
            _remote: SocketAddr,
            _secret: &[u8],
        ) -> Result<Option<Packet>, HandlerError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let base = request.base();
            Ok(Some(Packet::from(RadiusPacket::new(
                Arc::clone(base.dictionary()),
                Code::AccessAccept,
                base.identifier(),
            ))))
        }
    }

    /// Handler that blocks until released
    #[derive(Default)]
    struct GatedHandler {
        calls: AtomicUsize,
        gate: Notify,
    }

    #[async_trait]
    impl RequestHandler for GatedHandler {
        async fn handle(
            &self,
            _transport: &dyn Transport,
            _request: &Packet,
            _remote: SocketAddr,
            _secret: &[u8],
        ) -> Result<Option<Packet>, HandlerError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.gate.notified().await;
            Ok(None)
        }
    }

    struct FailingHandler;

    #[async_trait]
    impl RequestHandler for FailingHandler {
        async fn handle(
            &self,
            _transport: &dyn Transport,
            _request: &Packet,
            _remote: SocketAddr,
            _secret: &[u8],
        ) -> Result<Option<Packet>, HandlerError> {
            Err(HandlerError::MissingAttribute("User-Name"))
        }
    }

    fn request(identifier: u8, user: &str) -> Packet {
        Packet::from(AccessRequest::new(default_dictionary(), identifier, user, "pw"))
    }

    fn remote() -> SocketAddr {
        "192.168.1.10:40000".parse().unwrap()
    }

    async fn socket() -> UdpSocket {
        UdpSocket::bind("127.0.0.1:0").await.unwrap()
    }

    fn manual_dedup<H: RequestHandler>(inner: H) -> (Deduplicator<H, Arc<ManualTimer>>, Arc<ManualTimer>) {
        let timer = Arc::new(ManualTimer::default());
        let dedup = Deduplicator::with_timer(inner, Arc::clone(&timer), DEFAULT_DEDUP_TIMEOUT);
        (dedup, timer)
    }

    #[tokio::test]
    async fn test_duplicate_is_suppressed_until_eviction() {
        let transport = socket().await;
        let (dedup, timer) = manual_dedup(CountingHandler::default());
        let packet = request(42, "alice");

        let first = dedup.handle(&transport, &packet, remote(), b"s").await.unwrap();
        assert_eq!(first.unwrap().code(), Code::AccessAccept);
        assert_eq!(
            dedup.entry_state(remote(), 42),
            Some(EntryState::Settled(Outcome::Responded))
        );
        assert_eq!(timer.pending(), 1);

        let second = dedup.handle(&transport, &packet, remote(), b"s").await.unwrap();
        assert!(second.is_none());
        assert_eq!(dedup.inner.calls.load(Ordering::SeqCst), 1);
        assert_eq!(timer.pending(), 1);

        timer.fire_next();
        assert!(dedup.is_empty());

        let third = dedup.handle(&transport, &packet, remote(), b"s").await.unwrap();
        assert!(third.is_some());
        assert_eq!(dedup.inner.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_same_identifier_from_same_address_is_a_false_duplicate() {
        let transport = socket().await;
        let (dedup, _timer) = manual_dedup(CountingHandler::default());

        assert!(dedup
            .handle(&transport, &request(7, "alice"), remote(), b"s")
            .await
            .unwrap()
            .is_some());
        // Different user and authenticator, same (address, identifier)
        assert!(dedup
            .handle(&transport, &request(7, "bob"), remote(), b"s")
            .await
            .unwrap()
            .is_none());
        assert_eq!(dedup.inner.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_distinct_keys_are_independent() {
        let transport = socket().await;
        let (dedup, _timer) = manual_dedup(CountingHandler::default());
        let other_port: SocketAddr = "192.168.1.10:40001".parse().unwrap();

        for (id, addr) in [(1, remote()), (2, remote()), (1, other_port)] {
            let response = dedup.handle(&transport, &request(id, "alice"), addr, b"s").await;
            assert!(response.unwrap().is_some());
        }
        assert_eq!(dedup.len(), 3);
        assert_eq!(dedup.inner.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_duplicate_while_pending() {
        let transport = Arc::new(socket().await);
        let timer = Arc::new(ManualTimer::default());
        let dedup = Arc::new(Deduplicator::with_timer(
            GatedHandler::default(),
            Arc::clone(&timer),
            DEFAULT_DEDUP_TIMEOUT,
        ));

        let first = {
            let dedup = Arc::clone(&dedup);
            let transport = Arc::clone(&transport);
            tokio::spawn(async move {
                dedup
                    .handle(&*transport, &request(9, "alice"), remote(), b"s")
                    .await
            })
        };

        while dedup.inner.calls.load(Ordering::SeqCst) == 0 {
            tokio::task::yield_now().await;
        }
        assert_eq!(dedup.entry_state(remote(), 9), Some(EntryState::Pending));

        let second = dedup
            .handle(&*transport, &request(9, "alice"), remote(), b"s")
            .await
            .unwrap();
        assert!(second.is_none());
        assert_eq!(dedup.inner.calls.load(Ordering::SeqCst), 1);

        dedup.inner.gate.notify_one();
        assert!(first.await.unwrap().unwrap().is_none());
        assert_eq!(
            dedup.entry_state(remote(), 9),
            Some(EntryState::Settled(Outcome::NoResponse))
        );
    }

    #[tokio::test]
    async fn test_failures_are_cached_too() {
        let transport = socket().await;
        let (dedup, _timer) = manual_dedup(FailingHandler);

        assert!(dedup.handle(&transport, &request(3, "a"), remote(), b"s").await.is_err());
        assert_eq!(
            dedup.entry_state(remote(), 3),
            Some(EntryState::Settled(Outcome::Failed))
        );
        assert!(dedup
            .handle(&transport, &request(3, "a"), remote(), b"s")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_stale_eviction_leaves_newer_entry() {
        let transport = socket().await;
        let (dedup, timer) = manual_dedup(CountingHandler::default());
        let packet = request(5, "alice");

        dedup.handle(&transport, &packet, remote(), b"s").await.unwrap();
        dedup.clear();
        dedup.handle(&transport, &packet, remote(), b"s").await.unwrap();
        assert_eq!(timer.pending(), 2);

        // First eviction belongs to the cleared entry
        timer.fire_next();
        assert_eq!(dedup.len(), 1);

        timer.fire_next();
        assert!(dedup.is_empty());
    }

    #[tokio::test]
    async fn test_tokio_timer_expiry() {
        let transport = socket().await;
        let dedup = Deduplicator::with_timeout(CountingHandler::default(), Duration::from_millis(50));
        assert_eq!(dedup.timeout(), Duration::from_millis(50));
        let packet = request(11, "alice");

        assert!(dedup.handle(&transport, &packet, remote(), b"s").await.unwrap().is_some());
        assert!(dedup.handle(&transport, &packet, remote(), b"s").await.unwrap().is_none());

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(dedup.is_empty());
        assert!(dedup.handle(&transport, &packet, remote(), b"s").await.unwrap().is_some());
        assert_eq!(dedup.inner.calls.load(Ordering::SeqCst), 2);
    }
}
