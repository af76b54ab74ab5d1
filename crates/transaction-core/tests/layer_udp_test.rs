/// End-to-end tests of the transaction layer with a running timer driver
///
/// Two layers exchange an OPTIONS transaction over loopback UDP, and a
/// request to an unreachable peer times out on the driver's clock.
mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{local_addr, options, MockTransport};
use sigcore_sip_transport::bind_udp;
use sigcore_transaction_core::prelude::*;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::timeout;

async fn next_event(rx: &mut UnboundedReceiver<TransactionEvent>, wait: Duration) -> TransactionEvent {
    timeout(wait, rx.recv())
        .await
        .expect("Timed out waiting for transaction event")
        .expect("Event channel closed")
}

#[tokio::test]
async fn test_options_over_udp() {
    let (alice_transport, alice_events) = bind_udp("127.0.0.1:0".parse().unwrap()).await.unwrap();
    let (bob_transport, bob_events) = bind_udp("127.0.0.1:0".parse().unwrap()).await.unwrap();
    let alice_transport = Arc::new(alice_transport);
    let bob_transport = Arc::new(bob_transport);

    let (alice_user, mut alice_rx) = ChannelUser::new();
    let (bob_user, mut bob_rx) = ChannelUser::new();
    let config = TransactionConfig::default().with_tick(Duration::from_millis(10));
    let (alice, alice_wheel) =
        TransactionLayer::new(config.clone(), alice_transport.clone(), Arc::new(alice_user)).unwrap();
    let (bob, bob_wheel) =
        TransactionLayer::new(config, bob_transport.clone(), Arc::new(bob_user)).unwrap();
    let alice_driver = alice.start(alice_wheel);
    let bob_driver = bob.start(bob_wheel);
    let alice_task = tokio::spawn(alice.clone().process_transport_events(alice_events));
    let bob_task = tokio::spawn(bob.clone().process_transport_events(bob_events));

    let request = RequestBuilder::new(Method::Options, &format!("sip:bob@{}", bob.local_addr()))
        .unwrap()
        .from("Alice", "sip:alice@atlanta.com", Some("udp1"))
        .to("Bob", "sip:bob@biloxi.com", None)
        .call_id("udp-options-1@127.0.0.1")
        .cseq(1);
    let alice_id = alice.send_request(request, None).unwrap();

    let bob_id = match next_event(&mut bob_rx, Duration::from_secs(2)).await {
        TransactionEvent::Request {
            transaction: Some(id),
            request,
        } => {
            assert_eq!(*request.method(), Method::Options);
            assert_eq!(request.source, Some(alice.local_addr()));
            id
        }
        other => panic!("Unexpected event: {:?}", other),
    };
    bob.send_reply(bob_id, ReplyBuilder::new(200, "OK")).unwrap();

    match next_event(&mut alice_rx, Duration::from_secs(2)).await {
        TransactionEvent::Reply {
            transaction,
            reply,
        } => {
            assert_eq!(transaction, Some(alice_id));
            assert_eq!(reply.status(), Some(200));
            assert!(reply.to.tag.is_some());
        }
        other => panic!("Unexpected event: {:?}", other),
    }
    assert_eq!(alice.transaction_state(alice_id), Some(TransactionState::Completed));

    alice_transport.close();
    bob_transport.close();
    alice_task.await.unwrap();
    bob_task.await.unwrap();
    alice_driver.shutdown().await.unwrap();
    bob_driver.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_driver_fires_timer_f() {
    let transport = Arc::new(MockTransport::new(local_addr()));
    let (user, mut rx) = ChannelUser::new();
    let (layer, wheel) =
        TransactionLayer::new(TransactionConfig::default(), transport.clone(), Arc::new(user)).unwrap();
    let driver = layer.start(wheel);

    let id = layer.send_request(options(), None).unwrap();
    match next_event(&mut rx, Duration::from_secs(40)).await {
        TransactionEvent::Timeout {
            transaction,
            kind,
            request,
        } => {
            assert_eq!(transaction, id);
            assert_eq!(kind, TimeoutKind::NoReply);
            assert_eq!(*request.method(), Method::Options);
        }
        other => panic!("Unexpected event: {:?}", other),
    }
    assert_eq!(transport.sent_count(), 11);
    assert_eq!(layer.transaction_count(), 0);

    driver.shutdown().await.unwrap();
}
