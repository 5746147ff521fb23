//! End-to-end session lifecycle against the in-memory backend.

use std::sync::Arc;
use std::time::Duration;

use tandem_access::{
    AccessConfig, AuthError, AuthGateway, GuardState, MemoryBackend, MemoryDirectory, NoticeLevel,
    Principal, SessionStore,
};

fn gateway_for(backend: &MemoryBackend) -> AuthGateway {
    let config = AccessConfig::new("a@x.com");
    AuthGateway::new(Arc::new(backend.clone()), config.allow_list())
}

async fn next_guard_state(store: &SessionStore, want: fn(&GuardState) -> bool) -> GuardState {
    let mut guard = store.guard();
    let current = guard.state();
    if want(&current) {
        return current;
    }
    tokio::time::timeout(Duration::from_secs(1), async {
        loop {
            match guard.changed().await {
                Some(state) if want(&state) => return state,
                Some(_) => {}
                None => panic!("store went away"),
            }
        }
    })
    .await
    .expect("timed out waiting for guard state")
}

#[tokio::test]
async fn allowed_principal_unlocks_protected_views() {
    let directory = MemoryDirectory::new();
    let backend = MemoryBackend::connect(&directory);
    backend.restore_principal(Some(Principal::new("uid_a").with_email("a@x.com")));

    let (store, _scope) = SessionStore::attach(gateway_for(&backend));
    assert_eq!(store.guard().state(), GuardState::Unknown);

    let state = next_guard_state(&store, |s| matches!(s, GuardState::Authenticated(_))).await;
    assert_eq!(state.identity().unwrap().email(), Some("a@x.com"));

    let rendered = store.guard().render(|| "loading", |_| "protected", || "login");
    assert_eq!(rendered, "protected");
}

#[tokio::test]
async fn disallowed_principal_ends_at_login_with_warning() {
    let directory = MemoryDirectory::new();
    let backend = MemoryBackend::connect(&directory);
    backend.restore_principal(Some(Principal::new("uid_b").with_email("b@x.com")));

    let (store, _scope) = SessionStore::attach(gateway_for(&backend));
    let mut notices = store.notices();

    let notice = notices.recv().await.unwrap();
    assert_eq!(notice.level, NoticeLevel::Warning);
    assert_eq!(store.guard().state(), GuardState::Unauthenticated);
    assert_eq!(backend.calls().sign_out, 1);
    assert_eq!(backend.calls().sign_in, 0);
}

#[tokio::test]
async fn sign_up_then_sign_out_round_trip() {
    let directory = MemoryDirectory::new();
    let backend = MemoryBackend::connect(&directory);
    let (store, _scope) = SessionStore::attach(gateway_for(&backend));
    store.ready().await;

    let handle = store.gateway().sign_up("A@x.com", "longenough").await.unwrap();
    assert!(!handle.is_expired());
    let state = next_guard_state(&store, |s| matches!(s, GuardState::Authenticated(_))).await;
    assert_eq!(state.identity().unwrap().unique_id(), handle.uid());

    store.gateway().sign_out().await.unwrap();
    next_guard_state(&store, |s| *s == GuardState::Unauthenticated).await;
}

#[tokio::test]
async fn policy_rejection_reaches_caller_and_skips_backend() {
    let directory = MemoryDirectory::new();
    let backend = MemoryBackend::connect(&directory);
    let gateway = gateway_for(&backend);

    let err = gateway.sign_up("b@x.com", "longenough").await.unwrap_err();
    assert!(matches!(err, AuthError::Policy(_)));
    assert_eq!(backend.calls().total(), 0);
    assert!(directory.is_empty());
}

#[tokio::test]
async fn stores_on_separate_connections_are_independent() {
    let directory = MemoryDirectory::new();
    directory.add_account("a@x.com", "secret1");
    let first = MemoryBackend::connect(&directory);
    let second = MemoryBackend::connect(&directory);
    let (first_store, _first_scope) = SessionStore::attach(gateway_for(&first));
    let (second_store, _second_scope) = SessionStore::attach(gateway_for(&second));
    first_store.ready().await;
    second_store.ready().await;

    first_store.gateway().sign_in("a@x.com", "secret1").await.unwrap();
    next_guard_state(&first_store, |s| matches!(s, GuardState::Authenticated(_))).await;

    assert_eq!(second_store.guard().state(), GuardState::Unauthenticated);
}
