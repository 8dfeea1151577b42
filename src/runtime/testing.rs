//! Mock implementations for testing
//!
//! These mocks enable runtime testing without real I/O.

use super::{SessionHandle, SessionRuntime, SseEvent};
use crate::gateway::{FollowUpRequest, GatewayError, InferenceGateway};
use crate::state_machine::{Event, Session, SessionContext, Status};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{Notify, Semaphore};

// ============================================================================
// Mock Gateway
// ============================================================================

/// Mock gateway that returns queued responses
pub struct MockGateway {
    responses: Mutex<VecDeque<Result<Value, GatewayError>>>,
    /// Record of all requests made
    pub requests: Mutex<Vec<FollowUpRequest>>,
}

impl MockGateway {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queue a successful response
    pub fn queue_follow_up(&self, question: &str) {
        self.responses
            .lock()
            .unwrap()
            .push_back(Ok(json!({ "followUpQuestion": question })));
    }

    /// Queue a successful response without a follow-up
    pub fn queue_empty(&self) {
        self.queue_json(json!({}));
    }

    /// Queue an arbitrary reply body
    pub fn queue_json(&self, body: Value) {
        self.responses.lock().unwrap().push_back(Ok(body));
    }

    /// Queue an error response
    pub fn queue_error(&self, error: GatewayError) {
        self.responses.lock().unwrap().push_back(Err(error));
    }

    pub fn recorded_requests(&self) -> Vec<FollowUpRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn next(&self, request: &FollowUpRequest) -> Result<Value, GatewayError> {
        self.requests.lock().unwrap().push(request.clone());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(GatewayError::network("No mock response queued")))
    }
}

impl Default for MockGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl InferenceGateway for MockGateway {
    async fn request_json(&self, request: &FollowUpRequest) -> Result<Value, GatewayError> {
        self.next(request)
    }

    fn endpoint(&self) -> &str {
        "mock://inference"
    }
}

// ============================================================================
// Gated Mock Gateway (for stale-result testing)
// ============================================================================

/// Mock gateway that holds every request until the test releases it
pub struct GatedGateway {
    inner: MockGateway,
    gate: Semaphore,
    /// Notified when a request starts waiting at the gate
    pub request_started: Arc<Notify>,
}

impl GatedGateway {
    pub fn new() -> Self {
        Self {
            inner: MockGateway::new(),
            gate: Semaphore::new(0),
            request_started: Arc::new(Notify::new()),
        }
    }

    pub fn queue_follow_up(&self, question: &str) {
        self.inner.queue_follow_up(question);
    }

    pub fn queue_error(&self, error: GatewayError) {
        self.inner.queue_error(error);
    }

    /// Let one held request complete
    pub fn release_one(&self) {
        self.gate.add_permits(1);
    }

    pub fn recorded_requests(&self) -> Vec<FollowUpRequest> {
        self.inner.recorded_requests()
    }
}

#[async_trait]
impl InferenceGateway for GatedGateway {
    async fn request_json(&self, request: &FollowUpRequest) -> Result<Value, GatewayError> {
        self.request_started.notify_one();
        let permit = self.gate.acquire().await.expect("gate closed");
        permit.forget();
        self.inner.next(request)
    }

    fn endpoint(&self) -> &str {
        "mock://gated"
    }
}

// ============================================================================
// Test Session
// ============================================================================

const WAIT: Duration = Duration::from_secs(2);

/// A running session plus the gateway it talks to
pub struct TestSession<G: InferenceGateway + 'static> {
    pub handle: SessionHandle,
    pub gateway: Arc<G>,
}

impl<G: InferenceGateway + 'static> TestSession<G> {
    pub fn spawn(gateway: G) -> Self {
        let gateway = Arc::new(gateway);
        let handle = SessionRuntime::spawn(
            SessionContext::new("test-session", "What is Java?"),
            gateway.clone(),
        );
        Self { handle, gateway }
    }

    pub async fn send(&self, event: Event) {
        self.handle.send(event).await.expect("runtime should accept events");
    }

    /// Start the session and wait until the seed turn is visible
    pub async fn start(&self) -> Session {
        self.send(Event::start()).await;
        self.wait_for(|s| s.status != Status::NotStarted).await
    }

    /// Set the draft and submit it
    pub async fn answer(&self, text: &str) {
        self.send(Event::update_draft(text)).await;
        self.send(Event::submit()).await;
    }

    /// Wait until the snapshot satisfies `pred`, panicking after a timeout
    pub async fn wait_for(&self, pred: impl FnMut(&Session) -> bool) -> Session {
        let mut rx = self.handle.snapshot_rx.clone();
        let result = tokio::time::timeout(WAIT, rx.wait_for(pred))
            .await
            .map(|r| r.map(|session| session.clone()));
        match result {
            Ok(Ok(session)) => session,
            Ok(Err(_)) => panic!("session runtime stopped"),
            Err(_) => panic!("timed out; last state: {:?}", self.handle.snapshot()),
        }
    }

    pub fn snapshot(&self) -> Session {
        self.handle.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::SessionManager;
    use crate::state_machine::state::{FALLBACK_FOLLOW_UP, REQUEST_FAILED_MESSAGE};
    use crate::state_machine::Role;

    fn awaiting_with_turns(n: usize) -> impl FnMut(&Session) -> bool {
        move |s: &Session| s.status == Status::AwaitingAnswer && s.transcript.len() == n
    }

    #[tokio::test]
    async fn test_mock_gateway() {
        let mock = MockGateway::new();
        mock.queue_follow_up("Next?");

        let request = FollowUpRequest::new("Q", "A");
        let response = mock.follow_up(&request).await.unwrap();
        assert_eq!(response.into_question().as_deref(), Some("Next?"));

        // Second call should fail (no more responses)
        assert!(mock.follow_up(&request).await.is_err());
        assert_eq!(mock.recorded_requests().len(), 2);
    }

    #[tokio::test]
    async fn test_start_seeds_transcript() {
        let rt = TestSession::spawn(MockGateway::new());
        let session = rt.start().await;

        assert_eq!(session.transcript.len(), 1);
        assert_eq!(session.transcript[0].role, Role::System);
        assert_eq!(session.transcript[0].text, "What is Java?");
    }

    #[tokio::test]
    async fn test_success_round_trip() {
        let gateway = MockGateway::new();
        gateway.queue_follow_up("Why is it platform-independent?");
        let rt = TestSession::spawn(gateway);
        rt.start().await;

        rt.answer("A programming language").await;
        let session = rt.wait_for(awaiting_with_turns(3)).await;

        assert_eq!(session.transcript[1].role, Role::User);
        assert_eq!(session.transcript[1].text, "A programming language");
        assert_eq!(session.transcript[2].role, Role::System);
        assert_eq!(session.transcript[2].text, "Why is it platform-independent?");
        assert_eq!(session.current_question, "Why is it platform-independent?");
        assert_eq!(session.pending_answer, "");

        let requests = rt.gateway.recorded_requests();
        assert_eq!(
            requests,
            vec![FollowUpRequest::new("What is Java?", "A programming language")]
        );
    }

    #[tokio::test]
    async fn test_follow_up_uses_previous_answer_question() {
        let gateway = MockGateway::new();
        gateway.queue_follow_up("Why is it platform-independent?");
        gateway.queue_follow_up("What is the JVM?");
        let rt = TestSession::spawn(gateway);
        rt.start().await;

        rt.answer("A programming language").await;
        rt.wait_for(awaiting_with_turns(3)).await;
        rt.answer("Bytecode").await;
        let session = rt.wait_for(awaiting_with_turns(5)).await;

        assert_eq!(session.current_question, "What is the JVM?");
        let requests = rt.gateway.recorded_requests();
        assert_eq!(requests[1].question, "Why is it platform-independent?");
        assert_eq!(requests[1].answer, "Bytecode");
    }

    #[tokio::test]
    async fn test_failure_appends_error_turn() {
        let gateway = MockGateway::new();
        gateway.queue_error(GatewayError::network("connection refused"));
        let rt = TestSession::spawn(gateway);
        rt.start().await;

        rt.answer("A programming language").await;
        let session = rt.wait_for(awaiting_with_turns(3)).await;

        assert_eq!(session.transcript[2].role, Role::Error);
        assert_eq!(session.transcript[2].text, REQUEST_FAILED_MESSAGE);
        assert_eq!(session.current_question, "What is Java?");
        assert_eq!(session.pending_answer, "A programming language");
    }

    #[tokio::test]
    async fn test_resubmit_after_failure() {
        let gateway = MockGateway::new();
        gateway.queue_error(GatewayError::timeout("slow"));
        gateway.queue_follow_up("Who created it?");
        let rt = TestSession::spawn(gateway);
        rt.start().await;

        rt.answer("A language").await;
        rt.wait_for(awaiting_with_turns(3)).await;
        // Draft was preserved, so a bare submit retries it
        rt.send(Event::submit()).await;
        let session = rt.wait_for(awaiting_with_turns(5)).await;

        let roles: Vec<Role> = session.transcript.iter().map(|t| t.role).collect();
        assert_eq!(
            roles,
            vec![Role::System, Role::User, Role::Error, Role::User, Role::System]
        );
        assert_eq!(session.transcript[3].text, "A language");
        assert_eq!(rt.gateway.recorded_requests().len(), 2);
    }

    #[tokio::test]
    async fn test_empty_follow_up_uses_placeholder() {
        let gateway = MockGateway::new();
        gateway.queue_empty();
        let rt = TestSession::spawn(gateway);
        rt.start().await;

        rt.answer("anything").await;
        let session = rt.wait_for(awaiting_with_turns(3)).await;

        assert_eq!(session.transcript[2].role, Role::System);
        assert_eq!(session.transcript[2].text, FALLBACK_FOLLOW_UP);
    }

    #[tokio::test]
    async fn test_non_object_reply_is_a_failure() {
        let gateway = MockGateway::new();
        gateway.queue_json(json!(["Why?"]));
        let rt = TestSession::spawn(gateway);
        rt.start().await;

        rt.answer("anything").await;
        let session = rt.wait_for(awaiting_with_turns(3)).await;

        assert_eq!(session.transcript[2].role, Role::Error);
        assert_eq!(session.transcript[2].text, REQUEST_FAILED_MESSAGE);
        assert_eq!(session.current_question, "What is Java?");
        assert_eq!(session.pending_answer, "anything");
    }

    #[tokio::test]
    async fn test_second_submit_while_in_flight_is_ignored() {
        let gateway = GatedGateway::new();
        gateway.queue_follow_up("Next?");
        let rt = TestSession::spawn(gateway);
        rt.start().await;

        let started = rt.gateway.request_started.clone();
        let notified = started.notified();
        rt.answer("first").await;
        notified.await;

        rt.send(Event::submit()).await;
        rt.send(Event::update_draft("second")).await;
        rt.send(Event::submit()).await;
        rt.wait_for(|s| s.pending_answer == "second").await;

        rt.gateway.release_one();
        let session = rt.wait_for(awaiting_with_turns(3)).await;

        assert_eq!(rt.gateway.recorded_requests().len(), 1);
        assert_eq!(session.transcript[2].text, "Next?");
    }

    #[tokio::test]
    async fn test_stale_response_after_reset_is_discarded() {
        let gateway = GatedGateway::new();
        gateway.queue_follow_up("Stale question?");
        let rt = TestSession::spawn(gateway);
        rt.start().await;

        let started = rt.gateway.request_started.clone();
        let notified = started.notified();
        rt.answer("A programming language").await;
        notified.await;

        rt.send(Event::Reset).await;
        let reset = rt
            .wait_for(|s| s.status == Status::NotStarted && s.generation == 1)
            .await;

        rt.gateway.release_one();
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(rt.snapshot(), reset);
        assert!(reset.transcript.is_empty());
        assert_eq!(reset.current_question, "What is Java?");
    }

    #[tokio::test]
    async fn test_stale_failure_does_not_touch_new_round() {
        let gateway = GatedGateway::new();
        gateway.queue_error(GatewayError::network("late failure"));
        gateway.queue_follow_up("Fresh question?");
        let rt = TestSession::spawn(gateway);
        rt.start().await;

        let started = rt.gateway.request_started.clone();
        let notified = started.notified();
        rt.answer("old answer").await;
        notified.await;

        rt.send(Event::Reset).await;
        rt.start().await;
        let notified = started.notified();
        rt.answer("new answer").await;
        notified.await;

        // The permit goes to the older waiter, which resolves as a stale failure
        rt.gateway.release_one();
        tokio::time::sleep(Duration::from_millis(100)).await;
        let pending = rt.snapshot();
        assert_eq!(pending.status, Status::Submitting);
        assert_eq!(pending.transcript.len(), 2);

        rt.gateway.release_one();
        let session = rt.wait_for(awaiting_with_turns(3)).await;

        let roles: Vec<Role> = session.transcript.iter().map(|t| t.role).collect();
        assert_eq!(roles, vec![Role::System, Role::User, Role::System]);
        assert_eq!(session.transcript[1].text, "new answer");
        assert_eq!(session.transcript[2].text, "Fresh question?");
    }

    #[tokio::test]
    async fn test_subscribers_receive_turns_in_order() {
        let gateway = MockGateway::new();
        gateway.queue_follow_up("Next?");
        let rt = TestSession::spawn(gateway);
        let mut rx = rt.handle.subscribe();

        rt.start().await;
        rt.answer("answer").await;
        rt.wait_for(awaiting_with_turns(3)).await;

        let mut turns = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if let SseEvent::Turn { turn } = event {
                turns.push((turn.role, turn.text));
            }
        }
        assert_eq!(
            turns,
            vec![
                (Role::System, "What is Java?".to_string()),
                (Role::User, "answer".to_string()),
                (Role::System, "Next?".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_draft_before_start_reports_error() {
        let rt = TestSession::spawn(MockGateway::new());
        let mut rx = rt.handle.subscribe();

        rt.send(Event::update_draft("too early")).await;
        let event = tokio::time::timeout(WAIT, rx.recv()).await.unwrap().unwrap();

        assert!(matches!(event, SseEvent::Error { .. }));
        assert_eq!(rt.snapshot().pending_answer, "");
    }

    #[tokio::test]
    async fn test_manager_create_and_close() {
        let manager = SessionManager::new(Arc::new(MockGateway::new()), "Seed?");
        let (id, handle) = manager.create().await;

        assert_eq!(handle.snapshot().current_question, "Seed?");
        assert_eq!(manager.session_count().await, 1);
        manager.send_event(&id, Event::start()).await.unwrap();

        manager.close(&id).await.unwrap();
        assert!(handle.is_closed());
        assert_eq!(manager.session_count().await, 0);
        assert!(manager.get(&id).await.is_err());
        assert!(manager.send_event(&id, Event::start()).await.is_err());
    }

    fn idle_manager(idle: Duration) -> SessionManager {
        SessionManager::new(Arc::new(MockGateway::new()), "Seed?").with_idle_timeout(idle)
    }

    #[tokio::test]
    async fn test_idle_sessions_without_subscribers_are_evicted() {
        let manager = idle_manager(Duration::from_millis(50));
        let (idle_id, idle) = manager.create().await;
        let (watched_id, watched) = manager.create().await;
        let _rx = watched.subscribe();

        assert_eq!(manager.evict_idle().await, 0);
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(manager.evict_idle().await, 1);
        assert!(idle.is_closed());
        assert!(manager.get(&idle_id).await.is_err());
        assert!(!watched.is_closed());
        assert!(manager.get(&watched_id).await.is_ok());
    }

    #[tokio::test]
    async fn test_activity_defers_eviction() {
        let manager = idle_manager(Duration::from_millis(200));
        let (id, _handle) = manager.create().await;

        tokio::time::sleep(Duration::from_millis(120)).await;
        manager.send_event(&id, Event::start()).await.unwrap();
        tokio::time::sleep(Duration::from_millis(120)).await;
        assert_eq!(manager.evict_idle().await, 0);

        tokio::time::sleep(Duration::from_millis(120)).await;
        assert_eq!(manager.evict_idle().await, 1);
        assert_eq!(manager.session_count().await, 0);
    }

    #[tokio::test]
    async fn test_reaper_closes_idle_sessions() {
        let manager = Arc::new(idle_manager(Duration::from_millis(40)));
        let reaper = manager.spawn_reaper();
        let (_id, handle) = manager.create().await;

        tokio::time::timeout(Duration::from_secs(2), async {
            while manager.session_count().await > 0 {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap();
        assert!(handle.is_closed());

        drop(manager);
        tokio::time::timeout(Duration::from_secs(2), reaper)
            .await
            .unwrap()
            .unwrap();
    }
}
