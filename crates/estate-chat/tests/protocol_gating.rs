use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use estate_bus::{MemoryConn, MemoryTransport};
use estate_chat::{ChatSession, SessionConfig};
use estate_core::{InquiryStatus, MessageKind, UserQueue, user_queue_subject};

const USER: i64 = 7;
const COUNTERPARTY: i64 = 2;

async fn connected_session() -> (ChatSession, Arc<MemoryConn>) {
    let transport = MemoryTransport::new();
    let session = ChatSession::new(Arc::new(transport.clone()), SessionConfig::default());
    session.connect("token-1", USER).await.unwrap();
    let conn = transport.current().unwrap();
    (session, conn)
}

async fn settle() {
    tokio::time::sleep(Duration::from_millis(50)).await;
}

fn inject_status(conn: &MemoryConn, inquiry_id: i64, status: InquiryStatus) {
    assert!(conn.inject(
        &user_queue_subject(USER, UserQueue::Status),
        &serde_json::json!({ "inquiryId": inquiry_id, "status": status.as_str() }),
    ));
}

fn inject_message(conn: &MemoryConn, inquiry_id: i64, sender_id: i64, content: &str) {
    assert!(conn.inject(
        &user_queue_subject(USER, UserQueue::Messages),
        &serde_json::json!({
            "id": 1, "inquiryId": inquiry_id, "senderId": sender_id,
            "messageType": "TEXT", "content": content,
            "priceAmount": null, "sentAt": "2026-02-01T09:00:00Z"
        }),
    ));
}

#[tokio::test(start_paused = true)]
async fn text_message_round_trip() {
    let (session, conn) = connected_session().await;

    let received = Arc::new(Mutex::new(Vec::new()));
    let sink = received.clone();
    session
        .on_message(move |msg| sink.lock().unwrap().push(msg.clone()))
        .forget();

    assert!(
        session
            .send_message(42, "Is this available?", MessageKind::Text, None)
            .await
    );
    let published = conn.published_json();
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].0, "estate.chat.app.send.42");
    assert_eq!(
        published[0].1,
        serde_json::json!({
            "type": "CHAT_MESSAGE", "inquiryId": 42,
            "content": "Is this available?",
            "messageType": "TEXT", "priceAmount": null
        })
    );

    inject_message(&conn, 42, COUNTERPARTY, "Is this available?");
    settle().await;

    let received = received.lock().unwrap();
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].inquiry_id, 42);
    assert_eq!(received[0].content, "Is this available?");
    assert_eq!(received[0].price_amount, None);
    assert_eq!(session.unread().unread_for(42), 1);
}

#[tokio::test(start_paused = true)]
async fn decode_failure_is_isolated_per_channel() {
    let (session, conn) = connected_session().await;

    let messages = Arc::new(Mutex::new(0u32));
    let others = Arc::new(Mutex::new(Vec::new()));
    let m = messages.clone();
    session.on_message(move |_| *m.lock().unwrap() += 1).forget();
    let o = others.clone();
    session
        .on_typing(move |_| o.lock().unwrap().push("typing"))
        .forget();
    let o = others.clone();
    session
        .on_status(move |_| o.lock().unwrap().push("status"))
        .forget();
    let o = others.clone();
    session
        .on_notification(move |_| o.lock().unwrap().push("notification"))
        .forget();
    let o = others.clone();
    session
        .on_purchase(move |_| o.lock().unwrap().push("purchase"))
        .forget();

    // Garbage on the message queue is dropped without side effects.
    assert!(conn.inject_raw(
        &user_queue_subject(USER, UserQueue::Messages),
        Bytes::from_static(b"not json at all"),
    ));

    // The other four queues keep delivering valid frames.
    assert!(conn.inject(
        &user_queue_subject(USER, UserQueue::Typing),
        &serde_json::json!({ "inquiryId": 7, "senderId": COUNTERPARTY, "isTyping": true }),
    ));
    inject_status(&conn, 7, InquiryStatus::Agreed);
    settle().await;
    assert!(conn.inject(
        &user_queue_subject(USER, UserQueue::Notifications),
        &serde_json::json!({ "type": "INQUIRY", "title": "New offer", "body": "" }),
    ));
    assert!(conn.inject(
        &user_queue_subject(USER, UserQueue::Purchase),
        &serde_json::json!({
            "event": "REQUESTED", "inquiryId": 7,
            "initiatorId": COUNTERPARTY, "finalPrice": 310000.0
        }),
    ));
    settle().await;

    assert_eq!(*messages.lock().unwrap(), 0);
    let seen = others.lock().unwrap().clone();
    for expected in ["typing", "status", "notification", "purchase"] {
        assert!(seen.contains(&expected), "missing {expected}: {seen:?}");
    }

    // The message queue itself survived the bad frame.
    inject_message(&conn, 7, COUNTERPARTY, "still alive");
    settle().await;
    assert_eq!(*messages.lock().unwrap(), 1);
    assert!(session.is_connected());
}

#[tokio::test(start_paused = true)]
async fn mark_read_is_idempotent() {
    let (session, conn) = connected_session().await;

    inject_message(&conn, 11, COUNTERPARTY, "one");
    inject_message(&conn, 11, COUNTERPARTY, "two");
    settle().await;
    assert_eq!(session.unread().unread_for(11), 2);

    assert!(session.mark_messages_read(11).await);
    assert_eq!(session.unread().unread_for(11), 0);

    // Marking again with no new messages changes nothing.
    assert!(session.mark_messages_read(11).await);
    assert_eq!(session.unread().unread_for(11), 0);
    assert_eq!(session.unread().total(), 0);
}

#[tokio::test(start_paused = true)]
async fn stale_purchase_confirmation_is_dropped() {
    let (session, conn) = connected_session().await;

    let purchases = Arc::new(Mutex::new(0u32));
    let p = purchases.clone();
    session.on_purchase(move |_| *p.lock().unwrap() += 1).forget();

    inject_status(&conn, 7, InquiryStatus::Negotiating);
    settle().await;

    assert!(conn.inject(
        &user_queue_subject(USER, UserQueue::Purchase),
        &serde_json::json!({
            "event": "CONFIRMED", "inquiryId": 7, "initiatorId": COUNTERPARTY
        }),
    ));
    settle().await;

    assert_eq!(*purchases.lock().unwrap(), 0);
    assert_eq!(session.board().status(7), Some(InquiryStatus::Negotiating));
}

#[tokio::test(start_paused = true)]
async fn purchase_request_is_gated_on_agreed() {
    let (session, conn) = connected_session().await;

    let purchases = Arc::new(Mutex::new(Vec::new()));
    let p = purchases.clone();
    session
        .on_purchase(move |ev| p.lock().unwrap().push(ev.inquiry_id))
        .forget();

    inject_status(&conn, 7, InquiryStatus::Negotiating);
    settle().await;

    // Precondition not met: nothing reaches the wire.
    assert!(!session.send_purchase_request(7, 310_000.0, None).await);
    assert!(conn.published_json().is_empty());

    inject_status(&conn, 7, InquiryStatus::Agreed);
    settle().await;

    assert!(session.send_purchase_request(7, 310_000.0, None).await);
    let published = conn.published_json();
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].0, "estate.chat.app.purchase.7");
    assert_eq!(published[0].1["finalPrice"], 310_000.0);

    // The counterparty's request is observable once AGREED.
    assert!(conn.inject(
        &user_queue_subject(USER, UserQueue::Purchase),
        &serde_json::json!({
            "event": "REQUESTED", "inquiryId": 7,
            "initiatorId": COUNTERPARTY, "finalPrice": 310000.0
        }),
    ));
    settle().await;
    assert_eq!(*purchases.lock().unwrap(), vec![7]);
}

#[tokio::test(start_paused = true)]
async fn confirmation_requires_counterparty_request() {
    let (session, conn) = connected_session().await;

    inject_status(&conn, 7, InquiryStatus::Agreed);
    settle().await;

    // No outstanding request yet.
    assert!(!session.confirm_purchase(7, None).await);

    // A request initiated by this user cannot be self-confirmed.
    assert!(conn.inject(
        &user_queue_subject(USER, UserQueue::Purchase),
        &serde_json::json!({
            "event": "REQUESTED", "inquiryId": 7,
            "initiatorId": USER, "finalPrice": 310000.0
        }),
    ));
    settle().await;
    assert!(!session.confirm_purchase(7, None).await);

    // The counterparty's request can be confirmed.
    assert!(conn.inject(
        &user_queue_subject(USER, UserQueue::Purchase),
        &serde_json::json!({
            "event": "REQUESTED", "inquiryId": 7,
            "initiatorId": COUNTERPARTY, "finalPrice": 310000.0
        }),
    ));
    settle().await;
    assert!(session.confirm_purchase(7, Some("deal".into())).await);

    let published = conn.published_json();
    let confirm = published
        .iter()
        .find(|(subject, _)| subject == "estate.chat.app.confirm-purchase.7")
        .expect("confirmation published");
    assert_eq!(confirm.1["message"], "deal");
}

#[tokio::test(start_paused = true)]
async fn typing_signals_expire_locally() {
    let (session, conn) = connected_session().await;

    let typing = Arc::new(Mutex::new(0u32));
    let t = typing.clone();
    session.on_typing(move |_| *t.lock().unwrap() += 1).forget();

    assert!(conn.inject(
        &user_queue_subject(USER, UserQueue::Typing),
        &serde_json::json!({ "inquiryId": 9, "senderId": COUNTERPARTY, "isTyping": true }),
    ));
    settle().await;
    assert_eq!(*typing.lock().unwrap(), 1);
    assert_eq!(session.typing().typists(9), vec![COUNTERPARTY]);

    // No stop signal ever arrives; the local TTL clears it.
    tokio::time::sleep(Duration::from_secs(6)).await;
    assert!(session.typing().typists(9).is_empty());
}

#[tokio::test(start_paused = true)]
async fn price_offer_requires_amount_before_the_wire() {
    let (session, conn) = connected_session().await;

    assert!(
        !session
            .send_message(3, "how about this", MessageKind::PriceOffer, None)
            .await
    );
    assert!(
        session
            .send_message(3, "how about this", MessageKind::PriceOffer, Some(280_000.0))
            .await
    );
    let published = conn.published_json();
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].1["priceAmount"], 280_000.0);
}
