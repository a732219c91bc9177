//! Event bus behavior across the item lifecycle.

use std::time::Duration;

use tokio::time::timeout;

use crate::downloader::test_helpers::*;
use crate::types::Event;

async fn next_event(rx: &mut tokio::sync::broadcast::Receiver<Event>) -> Event {
    timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("timed out waiting for event")
        .expect("event channel closed")
}

#[tokio::test]
async fn successful_item_emits_queued_started_complete() {
    let (downloader, _temp) = create_test_downloader().await;
    let mut rx = downloader.subscribe();

    let items = downloader
        .download(
            "showA",
            vec![StaticFetcher::success(b"x")],
            vec!["ep1.mp3".into()],
            None,
        )
        .await
        .unwrap();
    let expected_id = items[0].item_id.clone();

    match next_event(&mut rx).await {
        Event::ItemQueued {
            item_id,
            batch_id,
            path,
        } => {
            assert_eq!(item_id, expected_id);
            assert_eq!(batch_id, items[0].batch_id);
            assert_eq!(path, "showA/ep1.mp3");
        }
        other => panic!("expected ItemQueued, got: {other:?}"),
    }

    match next_event(&mut rx).await {
        Event::ItemStarted { item_id } => assert_eq!(item_id, expected_id),
        other => panic!("expected ItemStarted, got: {other:?}"),
    }

    match next_event(&mut rx).await {
        Event::ItemComplete { item_id, message } => {
            assert_eq!(item_id, expected_id);
            assert!(message.contains(r#""result":"success""#), "got: {message}");
        }
        other => panic!("expected ItemComplete, got: {other:?}"),
    }
}

#[tokio::test]
async fn failed_item_emits_item_failed() {
    let (downloader, _temp) = create_test_downloader().await;
    let mut rx = downloader.subscribe();

    let items = downloader
        .download(
            "showA",
            vec![StaticFetcher::failure(500, "boom")],
            vec!["ep1.mp3".into()],
            None,
        )
        .await
        .unwrap();

    loop {
        match next_event(&mut rx).await {
            Event::ItemFailed { item_id, message } => {
                assert_eq!(item_id, items[0].item_id);
                assert!(message.contains("500"), "got: {message}");
                break;
            }
            Event::ItemQueued { .. } | Event::ItemStarted { .. } => continue,
            other => panic!("unexpected event: {other:?}"),
        }
    }
}

#[tokio::test]
async fn shutdown_emits_shutdown_event() {
    let (downloader, _temp) = create_test_downloader().await;
    let mut rx = downloader.subscribe();

    downloader.shutdown().await.unwrap();

    assert!(matches!(next_event(&mut rx).await, Event::Shutdown));
}

#[tokio::test]
async fn multiple_subscribers_each_receive_all_events() {
    let (downloader, _temp) = create_test_downloader().await;
    let mut rx1 = downloader.subscribe();
    let mut rx2 = downloader.subscribe();

    downloader
        .download(
            "showA",
            vec![StaticFetcher::success(b"x")],
            vec!["ep1.mp3".into()],
            None,
        )
        .await
        .unwrap();

    assert!(matches!(next_event(&mut rx1).await, Event::ItemQueued { .. }));
    assert!(matches!(next_event(&mut rx2).await, Event::ItemQueued { .. }));
}

#[tokio::test]
async fn events_without_subscribers_do_not_block_downloads() {
    let (downloader, _temp) = create_test_downloader().await;

    let items = downloader
        .download(
            "showA",
            vec![StaticFetcher::success(b"x")],
            vec!["ep1.mp3".into()],
            None,
        )
        .await
        .unwrap();

    let done = wait_for_batch(&downloader, &items[0].batch_id, 1).await;
    assert_eq!(done[0].state, crate::types::ItemState::Complete);
}
