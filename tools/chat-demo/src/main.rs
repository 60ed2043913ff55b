use std::sync::Arc;

use anyhow::Result;
use estate_bus::NatsTransport;
use estate_chat::{ChatSession, SessionConfig};
use estate_core::MessageKind;

/// Terminal probe for the negotiation channel: connects as one user, tails
/// all five event queues, and optionally sends a text message.
///
/// Environment: NATS_URL, CHAT_TOKEN, CHAT_USER_ID, and optionally
/// CHAT_INQUIRY_ID + CHAT_TEXT to publish something.
#[tokio::main]
async fn main() -> Result<()> {
    estate_telemetry::install("chat-demo")?;

    let nats_url = std::env::var("NATS_URL").unwrap_or_else(|_| "nats://127.0.0.1:4222".into());
    let token = std::env::var("CHAT_TOKEN").unwrap_or_else(|_| "dev-token".into());
    let user_id: i64 = std::env::var("CHAT_USER_ID")
        .unwrap_or_else(|_| "1".into())
        .parse()?;

    let transport = Arc::new(NatsTransport::new(nats_url));
    let session = ChatSession::new(transport, SessionConfig::from_env());

    session
        .on_connection_change(|connected| println!("CONNECTION: {connected}"))
        .forget();
    session
        .on_message(|msg| {
            println!(
                "MESSAGE inquiry={} from={} [{}]: {}",
                msg.inquiry_id,
                msg.sender_id,
                msg.message_type.as_str(),
                msg.content
            );
        })
        .forget();
    session
        .on_notification(|n| println!("NOTIFICATION [{}] {}: {}", n.kind, n.title, n.body))
        .forget();
    session
        .on_typing(|t| println!("TYPING inquiry={} user={} {}", t.inquiry_id, t.sender_id, t.is_typing))
        .forget();
    session
        .on_status(|s| println!("STATUS inquiry={} -> {}", s.inquiry_id, s.status.as_str()))
        .forget();
    session
        .on_purchase(|p| println!("PURCHASE inquiry={} {:?}", p.inquiry_id, p.event))
        .forget();

    session.connect(&token, user_id).await?;
    println!("connected as user {user_id}");

    if let (Ok(inquiry), Ok(text)) = (std::env::var("CHAT_INQUIRY_ID"), std::env::var("CHAT_TEXT"))
    {
        let inquiry: i64 = inquiry.parse()?;
        let sent = session
            .send_message(inquiry, &text, MessageKind::Text, None)
            .await;
        println!("sent={sent}");
    }

    tokio::signal::ctrl_c().await?;
    session.disconnect().await;
    Ok(())
}
