use super::*;
use crate::conversation::Turn;

fn config(max_sessions: usize, idle_ttl_secs: Option<u64>) -> ConversationConfig {
    ConversationConfig {
        max_sessions,
        idle_ttl_secs,
        ..ConversationConfig::default()
    }
}

#[test]
fn sessions_are_created_on_first_use() {
    let mut store = ConversationStore::default();

    store.session("alice").append(Turn::user("hi"));
    store.session("alice").append(Turn::assistant("hello"));
    store.session("bob").append(Turn::user("yo"));

    assert_eq!(store.len(), 2);
    assert_eq!(store.get("alice").map(ConversationBuffer::len), Some(2));
    assert_eq!(store.get("bob").map(ConversationBuffer::len), Some(1));
    assert!(store.get("carol").is_none());
}

#[test]
fn sessions_are_isolated() {
    let mut store = ConversationStore::default();

    store.session("a").append(Turn::system("pirate voice"));
    store.session("b").append(Turn::user("plain"));

    let a = store.get("a").expect("session a should exist");
    let b = store.get("b").expect("session b should exist");
    assert_eq!(a.turns()[0].content(), "pirate voice");
    assert_eq!(b.turns()[0].content(), "plain");
}

#[test]
fn least_recently_used_session_is_evicted() {
    let mut store = ConversationStore::new(config(2, None));
    let start = Instant::now();

    store.session_at("first", start);
    store.session_at("second", start + Duration::from_secs(1));
    store.session_at("first", start + Duration::from_secs(2));
    store.session_at("third", start + Duration::from_secs(3));

    assert_eq!(store.len(), 2);
    assert!(store.contains("first"));
    assert!(!store.contains("second"));
    assert!(store.contains("third"));
}

#[test]
fn ties_evict_earliest_access() {
    let mut store = ConversationStore::new(config(2, None));
    let now = Instant::now();

    store.session_at("a", now);
    store.session_at("b", now);
    store.session_at("c", now);

    assert!(!store.contains("a"));
    assert!(store.contains("b"));
    assert!(store.contains("c"));
}

#[test]
fn idle_sessions_expire() {
    let mut store = ConversationStore::new(config(10, Some(60)));
    let start = Instant::now();

    store.session_at("stale", start).append(Turn::user("old"));
    store.session_at("fresh", start + Duration::from_secs(50));

    let evicted = store.evict_idle(start + Duration::from_secs(90));

    assert_eq!(evicted, vec!["stale".to_string()]);
    assert!(store.contains("fresh"));
}

#[test]
fn expired_session_restarts_empty() {
    let mut store = ConversationStore::new(config(10, Some(60)));
    let start = Instant::now();

    store.session_at("s", start).append(Turn::user("remember me"));
    let buffer = store.session_at("s", start + Duration::from_secs(120));

    assert!(buffer.is_empty());
}

#[test]
fn sessions_use_configured_budget() {
    let mut store = ConversationStore::new(ConversationConfig {
        max_cost: Some(10),
        ..ConversationConfig::default()
    });

    let buffer = store.session("s");
    buffer.append(Turn::user("one").with_cost(6));
    buffer.append(Turn::user("two").with_cost(6));

    assert_eq!(buffer.len(), 1);
    assert_eq!(buffer.state(), crate::conversation::BufferState::Trimmed);
}

#[test]
fn remove_returns_buffer() {
    let mut store = ConversationStore::default();
    store.session("s").append(Turn::user("bye"));

    let removed = store.remove("s").expect("session should exist");

    assert_eq!(removed.len(), 1);
    assert!(store.is_empty());
    assert!(store.remove("s").is_none());
}
