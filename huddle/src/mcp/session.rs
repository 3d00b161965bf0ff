//! Session management for MCP Streamable HTTP
//!
//! The server is single-tenant: one session slot per `SessionManager`. Each
//! session owns a queue of pending push events that a single SSE stream drains,
//! removing each event only once it has been handed to the response body.

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;
use uuid::Uuid;

use super::jsonrpc::JsonRpcNotification;
use super::types::Implementation;

/// Header carrying the session id. Lowercase so it can be used with `HeaderName::from_static`.
pub const SESSION_HEADER: &str = "mcp-session-id";

/// Event queued for delivery over SSE
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PushEvent {
    /// Monotonic per session, used as the SSE event id
    pub id: u64,
    /// Serialized JSON-RPC notification
    pub data: String,
}

/// Session error types
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("Session not found: {0}")]
    NotFound(String),

    #[error("No active session")]
    NoActiveSession,

    #[error("Event stream already open for session {0}")]
    StreamBusy(String),
}

/// What the client told us during `initialize`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClientState {
    pub client_info: Option<Implementation>,
    pub protocol_version: Option<String>,
    pub initialized: bool,
}

pub struct Session {
    id: String,
    created_at: DateTime<Utc>,
    alive: AtomicBool,
    queue: Mutex<VecDeque<PushEvent>>,
    notify: Notify,
    next_event_id: AtomicU64,
    streaming: AtomicBool,
    client: RwLock<ClientState>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("created_at", &self.created_at)
            .field("alive", &self.is_alive())
            .field("pending", &self.pending())
            .finish()
    }
}

impl Session {
    fn new() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            created_at: Utc::now(),
            alive: AtomicBool::new(true),
            queue: Mutex::new(VecDeque::new()),
            notify: Notify::new(),
            next_event_id: AtomicU64::new(1),
            streaming: AtomicBool::new(false),
            client: RwLock::new(ClientState::default()),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }

    /// Number of queued, undelivered push events
    pub fn pending(&self) -> usize {
        self.queue.lock().len()
    }

    pub fn client_state(&self) -> ClientState {
        self.client.read().clone()
    }

    pub(crate) fn record_initialize(&self, client_info: Option<Implementation>, version: &str) {
        let mut client = self.client.write();
        client.client_info = client_info;
        client.protocol_version = Some(version.to_string());
    }

    pub(crate) fn mark_initialized(&self) {
        self.client.write().initialized = true;
    }

    /// Enqueue a notification for the event stream, returning its event id.
    ///
    /// Events are kept until a stream drains them, so a push made while no
    /// client is listening is delivered on the next GET.
    pub fn push(&self, notification: &JsonRpcNotification) -> crate::Result<u64> {
        let data = serde_json::to_string(notification)?;

        let mut queue = self.queue.lock();
        if !self.is_alive() {
            return Err(SessionError::NotFound(self.id.clone()).into());
        }
        let id = self.next_event_id.fetch_add(1, Ordering::Relaxed);
        queue.push_back(PushEvent { id, data });
        drop(queue);

        self.notify.notify_one();
        crate::metrics::record_push_event();
        Ok(id)
    }

    /// Claim the session's event stream. Only one stream may be open at a time.
    pub fn open_stream(self: &Arc<Self>) -> Result<EventStream, SessionError> {
        if !self.is_alive() {
            return Err(SessionError::NotFound(self.id.clone()));
        }
        if self
            .streaming
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(SessionError::StreamBusy(self.id.clone()));
        }

        tracing::info!(session_id = %self.id, "Event stream opened");
        Ok(EventStream {
            session: Arc::clone(self),
        })
    }

    /// Mark dead, drop queued events and wake any open stream so it ends.
    fn close(&self) {
        let mut queue = self.queue.lock();
        self.alive.store(false, Ordering::Release);
        queue.clear();
        drop(queue);

        self.notify.notify_one();
    }
}

/// Exclusive handle on a session's push queue, held by one SSE response.
///
/// Dropping it (client disconnect) frees the slot without touching the queue.
pub struct EventStream {
    session: Arc<Session>,
}

impl EventStream {
    pub fn session_id(&self) -> &str {
        &self.session.id
    }

    /// Wait for the oldest queued event. Returns `None` once the session is destroyed.
    ///
    /// The event stays queued until [`EventStream::ack`] removes it, so a stream
    /// dropped before delivery leaves it for the next one.
    pub async fn next_event(&mut self) -> Option<PushEvent> {
        loop {
            {
                let queue = self.session.queue.lock();
                if !self.session.is_alive() {
                    return None;
                }
                if let Some(event) = queue.front() {
                    return Some(event.clone());
                }
            }
            self.session.notify.notified().await;
        }
    }

    /// Remove a delivered event from the head of the queue
    pub fn ack(&mut self, id: u64) {
        let mut queue = self.session.queue.lock();
        if queue.front().is_some_and(|event| event.id == id) {
            queue.pop_front();
        }
    }
}

impl Drop for EventStream {
    fn drop(&mut self) {
        self.session.streaming.store(false, Ordering::Release);
        tracing::info!(session_id = %self.session.id, "Event stream closed");
    }
}

/// Owns the single session slot.
///
/// Created once by the composition root and shared with the transport. The
/// slot mutex is the only serialization point for session lifecycle.
pub struct SessionManager {
    current: Mutex<Option<Arc<Session>>>,
    created: AtomicU64,
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionManager {
    pub fn new() -> Self {
        Self {
            current: Mutex::new(None),
            created: AtomicU64::new(0),
        }
    }

    /// Return the live session, creating it if the slot is empty
    pub fn get_or_create(&self) -> Arc<Session> {
        let mut slot = self.current.lock();
        if let Some(session) = slot.as_ref() {
            return Arc::clone(session);
        }

        let session = Arc::new(Session::new());
        *slot = Some(Arc::clone(&session));
        drop(slot);

        self.created.fetch_add(1, Ordering::Relaxed);
        crate::metrics::record_session_created();
        tracing::info!(session_id = %session.id, "Session created");
        session
    }

    /// Resolve a client-presented id against the live session
    pub fn lookup(&self, id: &str) -> Result<Arc<Session>, SessionError> {
        match self.current.lock().as_ref() {
            Some(session) if session.id == id => Ok(Arc::clone(session)),
            _ => Err(SessionError::NotFound(id.to_string())),
        }
    }

    /// Tear down the session. The slot becomes empty and the id is never valid again.
    pub fn destroy(&self, id: &str) -> Result<(), SessionError> {
        let session = {
            let mut slot = self.current.lock();
            match slot.as_ref() {
                Some(session) if session.id == id => slot.take(),
                _ => None,
            }
        };

        let session = session.ok_or_else(|| SessionError::NotFound(id.to_string()))?;
        session.close();
        crate::metrics::record_session_closed();
        tracing::info!(session_id = %id, "Session destroyed");
        Ok(())
    }

    pub fn current(&self) -> Option<Arc<Session>> {
        self.current.lock().clone()
    }

    /// Enqueue a notification on the live session
    pub fn publish(&self, notification: &JsonRpcNotification) -> crate::Result<u64> {
        let session = self.current().ok_or(SessionError::NoActiveSession)?;
        session.push(notification)
    }

    pub fn active_count(&self) -> usize {
        usize::from(self.current.lock().is_some())
    }

    /// Sessions constructed over the manager's lifetime
    pub fn sessions_created(&self) -> u64 {
        self.created.load(Ordering::Relaxed)
    }

    /// Close whatever session is live. Called on server shutdown.
    pub fn shutdown(&self) {
        if let Some(session) = self.current.lock().take() {
            session.close();
            crate::metrics::record_session_closed();
            tracing::info!(session_id = %session.id, "Session closed on shutdown");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Barrier;
    use std::time::Duration;

    fn note(n: i64) -> JsonRpcNotification {
        JsonRpcNotification::new("notifications/message", Some(json!({ "n": n })))
    }

    #[test]
    fn test_get_or_create_is_idempotent() {
        let manager = SessionManager::new();
        let a = manager.get_or_create();
        let b = manager.get_or_create();

        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(manager.sessions_created(), 1);
        assert_eq!(manager.active_count(), 1);
    }

    #[test]
    fn test_concurrent_first_access_creates_one_session() {
        const CALLERS: usize = 16;
        let manager = Arc::new(SessionManager::new());
        let barrier = Arc::new(Barrier::new(CALLERS));

        let handles: Vec<_> = (0..CALLERS)
            .map(|_| {
                let manager = manager.clone();
                let barrier = barrier.clone();
                std::thread::spawn(move || {
                    barrier.wait();
                    manager.get_or_create().id().to_string()
                })
            })
            .collect();

        let ids: Vec<String> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(ids.iter().all(|id| id == &ids[0]));
        assert_eq!(manager.sessions_created(), 1);
    }

    #[test]
    fn test_lookup_and_destroy() {
        let manager = SessionManager::new();
        let id = manager.get_or_create().id().to_string();

        assert!(manager.lookup(&id).is_ok());
        assert_eq!(
            manager.lookup("bogus").unwrap_err(),
            SessionError::NotFound("bogus".into())
        );

        manager.destroy(&id).unwrap();
        assert!(manager.lookup(&id).is_err());
        assert_eq!(
            manager.destroy(&id).unwrap_err(),
            SessionError::NotFound(id.clone())
        );
        assert_eq!(manager.active_count(), 0);
    }

    #[test]
    fn test_destroyed_id_stays_unknown_after_recreate() {
        let manager = SessionManager::new();
        let old = manager.get_or_create().id().to_string();
        manager.destroy(&old).unwrap();

        let fresh = manager.get_or_create().id().to_string();
        assert_ne!(old, fresh);
        assert!(manager.lookup(&old).is_err());
        assert_eq!(manager.sessions_created(), 2);
    }

    #[test]
    fn test_destroy_never_created() {
        let manager = SessionManager::new();
        assert!(matches!(
            manager.destroy("nope"),
            Err(SessionError::NotFound(_))
        ));
    }

    #[test]
    fn test_publish_without_session() {
        let manager = SessionManager::new();
        let err = manager.publish(&note(1)).unwrap_err();
        assert!(matches!(
            err,
            crate::Error::Session(SessionError::NoActiveSession)
        ));
    }

    #[test]
    fn test_push_ids_increase_and_dead_session_rejects() {
        let manager = SessionManager::new();
        let session = manager.get_or_create();

        assert_eq!(session.push(&note(1)).unwrap(), 1);
        assert_eq!(manager.publish(&note(2)).unwrap(), 2);
        assert_eq!(session.pending(), 2);

        manager.destroy(session.id()).unwrap();
        assert_eq!(session.pending(), 0);
        assert!(session.push(&note(3)).is_err());
    }

    #[test]
    fn test_record_initialize() {
        let session = SessionManager::new().get_or_create();
        session.record_initialize(Some(Implementation::new("client", "1.0")), "2025-03-26");
        session.mark_initialized();

        let state = session.client_state();
        assert_eq!(state.protocol_version.as_deref(), Some("2025-03-26"));
        assert_eq!(state.client_info.unwrap().name, "client");
        assert!(state.initialized);
    }

    async fn deliver(stream: &mut EventStream) -> PushEvent {
        let event = stream.next_event().await.unwrap();
        stream.ack(event.id);
        event
    }

    #[tokio::test]
    async fn test_stream_drains_in_order_and_keeps_queue_across_reconnect() {
        let manager = SessionManager::new();
        let session = manager.get_or_create();

        session.push(&note(1)).unwrap();
        session.push(&note(2)).unwrap();

        let mut stream = session.open_stream().unwrap();
        let first = deliver(&mut stream).await;
        assert_eq!(first.id, 1);
        assert!(first.data.contains("\"n\":1"));
        assert_eq!(deliver(&mut stream).await.id, 2);
        assert_eq!(session.pending(), 0);
        drop(stream);

        // Pushed while nobody is listening
        session.push(&note(3)).unwrap();

        let mut stream = session.open_stream().unwrap();
        assert_eq!(deliver(&mut stream).await.id, 3);
    }

    #[tokio::test]
    async fn test_undelivered_events_survive_disconnect() {
        let session = SessionManager::new().get_or_create();
        for n in 1..=3 {
            session.push(&note(n)).unwrap();
        }

        let mut stream = session.open_stream().unwrap();
        assert_eq!(deliver(&mut stream).await.id, 1);
        // Taken off the queue but never acknowledged
        assert_eq!(stream.next_event().await.unwrap().id, 2);
        drop(stream);

        assert_eq!(session.pending(), 2);
        let mut stream = session.open_stream().unwrap();
        assert_eq!(deliver(&mut stream).await.id, 2);
        assert_eq!(deliver(&mut stream).await.id, 3);
    }

    #[tokio::test]
    async fn test_ack_ignores_stale_id() {
        let session = SessionManager::new().get_or_create();
        session.push(&note(1)).unwrap();

        let mut stream = session.open_stream().unwrap();
        stream.ack(42);
        assert_eq!(session.pending(), 1);
    }

    #[tokio::test]
    async fn test_second_stream_is_busy() {
        let session = SessionManager::new().get_or_create();
        let _stream = session.open_stream().unwrap();

        assert!(matches!(
            session.open_stream(),
            Err(SessionError::StreamBusy(_))
        ));
    }

    #[tokio::test]
    async fn test_stream_wakes_on_push_and_ends_on_destroy() {
        let manager = Arc::new(SessionManager::new());
        let session = manager.get_or_create();
        let mut stream = session.open_stream().unwrap();

        let pusher = {
            let manager = manager.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(20)).await;
                manager.publish(&note(7)).unwrap();
            })
        };

        let event = tokio::time::timeout(Duration::from_secs(2), stream.next_event())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(event.id, 1);
        pusher.await.unwrap();

        manager.destroy(session.id()).unwrap();
        let end = tokio::time::timeout(Duration::from_secs(2), stream.next_event())
            .await
            .unwrap();
        assert!(end.is_none());
    }
}
