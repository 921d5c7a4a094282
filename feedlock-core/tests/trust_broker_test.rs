//! End-to-end behavior of the trust confirmation broker: FIFO
//! presentation, cascade auto-resolution, and cancellation.

mod common;

use common::{fp, request, MemStore, MockPresenter, NullSink};
use feedlock_core::trust::{TrustBroker, TrustStore, TrustSync, Verdict};
use std::sync::Arc;

fn broker_with(presenter: Arc<MockPresenter>) -> (TrustBroker, Arc<MemStore>) {
    let store = Arc::new(MemStore::default());
    let broker = TrustBroker::new(
        presenter,
        store.clone(),
        TrustSync::Notify(Arc::new(NullSink)),
    );
    (broker, store)
}

#[tokio::test]
async fn test_disjoint_requests_present_fifo_exactly_once() {
    let (presenter, verdicts) = MockPresenter::new();
    let (broker, _store) = broker_with(presenter.clone());

    let first = {
        let broker = broker.clone();
        tokio::spawn(async move { broker.confirm(request("http://e/a", &['a'])).await })
    };
    common::wait_until(|| presenter.presented() == vec!["http://e/a"]).await;

    // Enqueued behind the active request; must not be shown yet.
    let second = {
        let broker = broker.clone();
        tokio::spawn(async move { broker.confirm(request("http://e/b", &['b'])).await })
    };
    tokio::time::sleep(std::time::Duration::from_millis(30)).await;
    assert_eq!(presenter.presented(), vec!["http://e/a"]);

    verdicts.send(Verdict::Trust(vec![fp('a')])).unwrap();
    let outcome = first.await.unwrap().unwrap();
    assert_eq!(outcome.newly_trusted, vec![fp('a')]);
    assert!(!outcome.cancelled);

    common::wait_until(|| presenter.presented().len() == 2).await;
    assert_eq!(presenter.presented(), vec!["http://e/a", "http://e/b"]);

    verdicts.send(Verdict::Trust(vec![fp('b')])).unwrap();
    let outcome = second.await.unwrap().unwrap();
    assert_eq!(outcome.newly_trusted, vec![fp('b')]);

    common::wait_until(|| broker.is_drained()).await;
}

#[tokio::test]
async fn test_shared_key_request_is_never_presented() {
    let (presenter, verdicts) = MockPresenter::new();
    let (broker, store) = broker_with(presenter.clone());

    let first = {
        let broker = broker.clone();
        tokio::spawn(async move { broker.confirm(request("http://e/a", &['k'])).await })
    };
    common::wait_until(|| presenter.presented().len() == 1).await;

    let second = {
        let broker = broker.clone();
        tokio::spawn(async move { broker.confirm(request("http://e/b", &['k'])).await })
    };
    tokio::time::sleep(std::time::Duration::from_millis(30)).await;

    // Trusting the shared key from the first prompt satisfies the second
    // request; it resolves without ever reaching the presenter.
    verdicts.send(Verdict::Trust(vec![fp('k')])).unwrap();

    let outcome = first.await.unwrap().unwrap();
    assert_eq!(outcome.newly_trusted, vec![fp('k')]);

    let outcome = second.await.unwrap().unwrap();
    assert!(outcome.newly_trusted.is_empty());
    assert!(!outcome.cancelled);

    assert_eq!(presenter.presented(), vec!["http://e/a"]);
    assert!(store.is_trusted(&fp('k')));
    assert!(broker.is_drained());
}

#[tokio::test]
async fn test_cancellation_unblocks_the_queue() {
    let (presenter, verdicts) = MockPresenter::new();
    let (broker, store) = broker_with(presenter.clone());

    let first = {
        let broker = broker.clone();
        tokio::spawn(async move { broker.confirm(request("http://e/a", &['a'])).await })
    };
    common::wait_until(|| presenter.presented().len() == 1).await;

    let second = {
        let broker = broker.clone();
        tokio::spawn(async move { broker.confirm(request("http://e/b", &['b'])).await })
    };
    tokio::time::sleep(std::time::Duration::from_millis(30)).await;

    verdicts.send(Verdict::Cancelled).unwrap();
    let outcome = first.await.unwrap().unwrap();
    assert!(outcome.cancelled);
    assert!(outcome.newly_trusted.is_empty());
    assert!(!store.is_trusted(&fp('a')));

    // The cancelled request still unblocked its successor.
    common::wait_until(|| presenter.presented().len() == 2).await;
    verdicts.send(Verdict::Trust(vec![fp('b')])).unwrap();
    let outcome = second.await.unwrap().unwrap();
    assert_eq!(outcome.newly_trusted, vec![fp('b')]);

    common::wait_until(|| broker.is_drained()).await;
}

#[tokio::test]
async fn test_chosen_keys_outside_the_request_are_ignored() {
    let (presenter, verdicts) = MockPresenter::new();
    let (broker, store) = broker_with(presenter.clone());

    let task = {
        let broker = broker.clone();
        tokio::spawn(async move { broker.confirm(request("http://e/a", &['a'])).await })
    };
    common::wait_until(|| presenter.presented().len() == 1).await;

    verdicts
        .send(Verdict::Trust(vec![fp('a'), fp('z')]))
        .unwrap();
    let outcome = task.await.unwrap().unwrap();

    assert_eq!(outcome.newly_trusted, vec![fp('a')]);
    assert!(!store.is_trusted(&fp('z')));
}
