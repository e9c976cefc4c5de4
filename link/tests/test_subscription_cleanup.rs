//! Controller + `RoutedQuery` lifecycle against a scripted transport.
//!
//! Verifies that every socket the controller causes to be opened is closed
//! again, whatever the exit path (argument change, pushed failure, unmount),
//! and that transport trouble never surfaces as a subscribe failure.

use std::time::Duration;

use observable_link::{ConnectionOptions, ControllerPhase, ObservableQueryController, ResultOrigin};
use serde_json::json;
use tokio::time::{sleep, timeout};

mod common;
use common::{envelope, scripted_client, text};

async fn wait_until<T>(
    rx: &mut tokio::sync::watch::Receiver<T>,
    predicate: impl FnMut(&T) -> bool,
) {
    timeout(Duration::from_secs(60), rx.wait_for(predicate))
        .await
        .expect("state not reached in time")
        .expect("state channel closed");
}

#[tokio::test(start_paused = true)]
async fn test_three_envelopes_end_at_last() {
    let (client, log) = scripted_client(ConnectionOptions::default());
    let frames = log.push_socket();

    let query = client
        .query::<String>("/api/items/{{id}}", "none".to_string())
        .expect("query")
        .with_arguments(["id"]);
    let (controller, mut rx) =
        ObservableQueryController::observe(query, &json!({ "id": 7 })).expect("mount");
    assert_eq!(rx.borrow().query_result.data, "none");

    wait_until(&mut rx, |s| s.is_subscribed).await;
    for data in ["a", "b", "c"] {
        frames.send(envelope(data)).unwrap();
    }
    wait_until(&mut rx, |s| s.query_result.data == "c").await;

    assert_eq!(log.open_count(), 1);
    assert_eq!(log.urls(), vec!["ws://observable.test/api/items/7".to_string()]);

    controller.unmount();
    sleep(Duration::from_millis(10)).await;
    assert_eq!(log.closes(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_every_opened_socket_is_closed() {
    let (client, log) = scripted_client(ConnectionOptions::default());
    let _senders: Vec<_> = (0..4).map(|_| log.push_socket()).collect();

    let query = client
        .query::<String>("/api/accounts/{{accountId}}", String::new())
        .expect("query")
        .with_arguments(["accountId", "page"]);
    let (mut controller, mut rx) =
        ObservableQueryController::observe(query, &json!({ "accountId": 0, "page": 1 }))
            .expect("mount");
    wait_until(&mut rx, |s| s.is_subscribed).await;
    sleep(Duration::from_millis(10)).await;

    // Same values, different key order: no new socket.
    assert!(!controller
        .update_arguments(&json!({ "page": 1, "accountId": 0 }))
        .expect("update"));

    for id in 1..=3 {
        assert!(controller
            .update_arguments(&json!({ "accountId": id, "page": 1 }))
            .expect("update"));
        sleep(Duration::from_millis(10)).await;
        assert!(rx.borrow().is_subscribed);
    }

    assert_eq!(log.open_count(), 4);
    assert_eq!(log.closes(), 3);
    assert_eq!(
        log.urls()[3],
        "ws://observable.test/api/accounts/3?page=1".to_string()
    );

    drop(controller);
    sleep(Duration::from_millis(10)).await;
    assert_eq!(log.closes(), 4);
}

#[tokio::test(start_paused = true)]
async fn test_pushed_failure_closes_socket() {
    let (client, log) = scripted_client(ConnectionOptions::default());
    let frames = log.push_socket();

    let query = client.query::<String>("/api/orders", String::new()).expect("query");
    let (controller, mut rx) = ObservableQueryController::observe(query, &()).expect("mount");
    wait_until(&mut rx, |s| s.is_subscribed).await;

    frames
        .send(text(
            r#"{"data":"broken","isSuccess":false,"hasExceptions":true,"exceptionMessages":["boom"]}"#,
        ))
        .unwrap();
    wait_until(&mut rx, |s| !s.is_subscribed).await;

    let current = rx.borrow().clone();
    assert_eq!(current.query_result.data, "broken");
    assert_eq!(current.query_result.exception_messages, vec!["boom".to_string()]);
    assert_eq!(controller.phase(), ControllerPhase::Idle);

    sleep(Duration::from_secs(10)).await;
    assert_eq!(log.closes(), 1);
    assert_eq!(log.open_count(), 1, "no reconnect after a pushed failure");
}

#[tokio::test(start_paused = true)]
async fn test_failure_without_data_is_delivered_with_default() {
    let (client, log) = scripted_client(ConnectionOptions::default());
    let frames = log.push_socket();

    let query = client
        .query::<Vec<String>>("/api/orders", vec!["seed".to_string()])
        .expect("query");
    let (controller, mut rx) = ObservableQueryController::observe(query, &()).expect("mount");
    wait_until(&mut rx, |s| s.is_subscribed).await;

    frames
        .send(text(
            r#"{"data":null,"isSuccess":false,"hasExceptions":true,"exceptionMessages":["boom"]}"#,
        ))
        .unwrap();
    wait_until(&mut rx, |s| !s.is_subscribed).await;

    let current = rx.borrow().clone();
    assert_eq!(current.query_result.origin, ResultOrigin::Received);
    assert!(current.query_result.has_exceptions);
    assert_eq!(current.query_result.exception_messages, vec!["boom".to_string()]);
    assert_eq!(current.query_result.data, vec!["seed".to_string()]);
    assert_eq!(controller.phase(), ControllerPhase::Idle);

    sleep(Duration::from_secs(10)).await;
    assert_eq!(log.closes(), 1);
    assert_eq!(log.open_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_unreachable_server_still_subscribes_and_stops_on_unmount() {
    let (client, log) = scripted_client(ConnectionOptions::default());

    let query = client.query::<String>("/api/down", String::new()).expect("query");
    let (controller, mut rx) = ObservableQueryController::observe(query, &()).expect("mount");
    wait_until(&mut rx, |s| s.is_subscribed).await;

    sleep(Duration::from_secs(5)).await;
    let opens_before = log.open_count();
    assert!(opens_before > 1, "connection keeps retrying in the background");
    assert_eq!(controller.phase(), ControllerPhase::Subscribed);

    controller.unmount();
    sleep(Duration::from_secs(600)).await;
    assert_eq!(log.open_count(), opens_before);
}
