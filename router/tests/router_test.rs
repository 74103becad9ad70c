//! Integration tests for [`router::Router`].
//!
//! Covers: registration order precedence, no-match returns false, event kind gating,
//! required state re-read from the live store, and declared parameter injection.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use fsm::{FsmContext, MemoryStorage, StateGroup};
use router::{Handler, HandlerEntry, Params, Router, StateFilter, TextFilter};
use serde_json::{json, Value};
use vkbot_core::{Event, RequestContext, StateData};

fn message_event(peer_id: i64, text: &str) -> Event {
    Event::from_raw(json!({
        "type": "message_new",
        "object": {"message": {"peer_id": peer_id, "from_id": 99, "text": text}},
        "group_id": 1,
        "event_id": "evt"
    }))
}

fn empty_context() -> RequestContext {
    RequestContext::seeded(None, StateData::new())
}

fn fsm_for(peer_id: i64) -> FsmContext {
    FsmContext::new(Arc::new(MemoryStorage::new()), peer_id)
}

// --- Helpers used by tests ---

struct CountingHandler {
    calls: Arc<AtomicUsize>,
}

impl CountingHandler {
    fn new(calls: Arc<AtomicUsize>) -> Arc<Self> {
        Arc::new(Self { calls })
    }
}

#[async_trait]
impl Handler for CountingHandler {
    async fn handle(
        &self,
        _event: &Event,
        _context: &mut RequestContext,
        _fsm: Option<&FsmContext>,
        _params: Params,
    ) -> vkbot_core::Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

struct ParamCapture {
    seen: Arc<Mutex<Option<Params>>>,
}

#[async_trait]
impl Handler for ParamCapture {
    async fn handle(
        &self,
        _event: &Event,
        _context: &mut RequestContext,
        _fsm: Option<&FsmContext>,
        params: Params,
    ) -> vkbot_core::Result<()> {
        *self.seen.lock().unwrap() = Some(params);
        Ok(())
    }
}

/// **Test: A /start handler fires once; an unmatched text fires nothing.**
///
/// **Setup:** One entry with TextFilter("/start"), no state requirement.
/// **Expected:** "/start" → true, one call; "hello" → false, still one call.
#[tokio::test]
async fn test_start_command_matches_once() {
    let calls = Arc::new(AtomicUsize::new(0));
    let router = Router::new("commands").register(
        HandlerEntry::message(CountingHandler::new(calls.clone())).filter(TextFilter::new("/start")),
    );
    let fsm = fsm_for(1);

    let mut ctx = empty_context();
    let handled = router
        .process_event(&message_event(1, "/start"), &mut ctx, Some(&fsm))
        .await
        .unwrap();
    assert!(handled);
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    let mut ctx = empty_context();
    let handled = router
        .process_event(&message_event(1, "hello"), &mut ctx, Some(&fsm))
        .await
        .unwrap();
    assert!(!handled);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

/// **Test: With two matching entries the earlier-registered one wins.**
#[tokio::test]
async fn test_registration_order_is_precedence() {
    let first = Arc::new(AtomicUsize::new(0));
    let second = Arc::new(AtomicUsize::new(0));
    let router = Router::new("ordered")
        .register(HandlerEntry::message(CountingHandler::new(first.clone())).filter(TextFilter::new("hi")))
        .register(HandlerEntry::message(CountingHandler::new(second.clone())));

    let fsm = fsm_for(1);
    let mut ctx = empty_context();
    assert!(router
        .process_event(&message_event(1, "hi"), &mut ctx, Some(&fsm))
        .await
        .unwrap());

    assert_eq!(first.load(Ordering::SeqCst), 1);
    assert_eq!(second.load(Ordering::SeqCst), 0);
}

/// **Test: Entries only see events of their own kind.**
#[tokio::test]
async fn test_event_kind_gates_entries() {
    let calls = Arc::new(AtomicUsize::new(0));
    let router = Router::new("joins")
        .register(HandlerEntry::new("group_join", CountingHandler::new(calls.clone())));

    let join = Event::from_raw(json!({"type": "group_join", "object": {"user_id": 5}}));
    let mut ctx = empty_context();
    assert!(router.process_event(&join, &mut ctx, None).await.unwrap());

    let mut ctx = empty_context();
    assert!(!router
        .process_event(&message_event(1, "x"), &mut ctx, Some(&fsm_for(1)))
        .await
        .unwrap());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

/// **Test: Required state is checked against the live store, not the context snapshot.**
///
/// **Setup:** Context snapshot says no state; the store already holds Profile:waiting_name.
/// **Expected:** The entry requiring Profile:waiting_name fires.
#[tokio::test]
async fn test_required_state_reads_live_state() {
    let mut profile = StateGroup::new("Profile");
    let waiting_name = profile.add("waiting_name");
    let waiting_age = profile.add("waiting_age");

    let age_calls = Arc::new(AtomicUsize::new(0));
    let name_calls = Arc::new(AtomicUsize::new(0));
    let router = Router::new("profile")
        .register(HandlerEntry::message(CountingHandler::new(age_calls.clone())).state(&waiting_age))
        .register(HandlerEntry::message(CountingHandler::new(name_calls.clone())).state(&waiting_name));

    let fsm = fsm_for(3);
    fsm.set_state(&waiting_name).await.unwrap();

    let mut ctx = empty_context();
    assert!(router
        .process_event(&message_event(3, "Ann"), &mut ctx, Some(&fsm))
        .await
        .unwrap());
    assert_eq!(name_calls.load(Ordering::SeqCst), 1);
    assert_eq!(age_calls.load(Ordering::SeqCst), 0);
}

/// **Test: A state-requiring entry never matches when no FSM context exists.**
#[tokio::test]
async fn test_required_state_without_fsm_never_matches() {
    let calls = Arc::new(AtomicUsize::new(0));
    let router = Router::new("profile").register(
        HandlerEntry::new("wall_post_new", CountingHandler::new(calls.clone())).state("Profile:waiting_name"),
    );
    let post = Event::from_raw(json!({"type": "wall_post_new", "object": {}}));
    let mut ctx = empty_context();
    assert!(!router.process_event(&post, &mut ctx, None).await.unwrap());
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

/// **Test: StateFilter works on the context snapshot together with other filters.**
#[tokio::test]
async fn test_state_filter_and_text_filter_combined() {
    let calls = Arc::new(AtomicUsize::new(0));
    let router = Router::new("cancel").register(
        HandlerEntry::message(CountingHandler::new(calls.clone()))
            .filter(StateFilter::any())
            .filter(TextFilter::new("/cancel")),
    );
    let fsm = fsm_for(1);

    let mut idle = empty_context();
    assert!(!router
        .process_event(&message_event(1, "/cancel"), &mut idle, Some(&fsm))
        .await
        .unwrap());

    let mut busy = RequestContext::seeded(Some("Profile:waiting_age".to_string()), StateData::new());
    assert!(router
        .process_event(&message_event(1, "/CANCEL"), &mut busy, Some(&fsm))
        .await
        .unwrap());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

/// **Test: Only declared keys present in the context are injected.**
///
/// **Setup:** Entry declares ["user_id", "missing"]; context has user_id and an undeclared key.
/// **Expected:** params == {user_id: 99}.
#[tokio::test]
async fn test_declared_params_are_injected() {
    let seen = Arc::new(Mutex::new(None));
    let router = Router::new("params").register(
        HandlerEntry::message(Arc::new(ParamCapture { seen: seen.clone() }))
            .inject(["user_id", "missing"]),
    );

    let mut ctx = empty_context();
    ctx.insert("user_id", 99);
    ctx.insert("secret", "not declared");
    router
        .process_event(&message_event(1, "anything"), &mut ctx, Some(&fsm_for(1)))
        .await
        .unwrap();

    let params = seen.lock().unwrap().clone().unwrap();
    assert_eq!(params.len(), 1);
    assert_eq!(params.get("user_id"), Some(&Value::from(99)));
}
