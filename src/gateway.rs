//! Protocol handler mediating between transport events and chat semantics.
//!
//! The gateway owns the connection registry, the response generator, and the
//! broadcast channel. Transport adapters feed it connect / frame / disconnect
//! events and deliver whatever private events it hands back; everything
//! addressed to all clients goes out through the broadcast channel.

use std::sync::Arc;
use tokio::sync::broadcast;

use crate::assistant::{AssistantError, CannedAssistant, ResponseGenerator, WELCOME_TEXT};
use crate::protocol::{ClientEvent, ErrorKind, ServerEvent};
use crate::registry::ConnectionRegistry;
use crate::types::ChatMessage;

/// Capacity of the fan-out channel; slow receivers miss old events
const BROADCAST_CAPACITY: usize = 100;

/// Errors that can occur while relaying a chat message
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error(transparent)]
    Assistant(#[from] AssistantError),

    #[error("broadcast channel has no receivers but {0} connections are registered")]
    Broadcast(usize),
}

impl GatewayError {
    /// Wire-level error kind reported to the offending client
    pub fn kind(&self) -> ErrorKind {
        match self {
            GatewayError::Assistant(_) | GatewayError::Broadcast(_) => ErrorKind::ServerError,
        }
    }
}

pub struct Gateway {
    pub registry: ConnectionRegistry,
    /// Fan-out channel every connection task subscribes to
    pub events: broadcast::Sender<ServerEvent>,
    generator: Arc<dyn ResponseGenerator>,
}

impl Gateway {
    pub fn new() -> Self {
        Self::with_generator(Arc::new(CannedAssistant::new()))
    }

    pub fn with_generator(generator: Arc<dyn ResponseGenerator>) -> Self {
        let (events, _rx) = broadcast::channel(BROADCAST_CAPACITY);
        Self {
            registry: ConnectionRegistry::new(),
            events,
            generator,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ServerEvent> {
        self.events.subscribe()
    }

    /// Transport-level connect: register the sid and hand back the events to
    /// deliver privately to the new connection (identity ack + welcome).
    /// Other connections are not notified.
    pub async fn handle_connect(&self, sid: &str) -> Vec<ServerEvent> {
        self.registry.register(sid).await;
        tracing::info!("Client connected: {}", sid);

        vec![
            ServerEvent::ServerRegisteredSid {
                sid: sid.to_string(),
            },
            ServerEvent::NewMessage(ChatMessage::from_assistant(WELCOME_TEXT)),
        ]
    }

    /// One raw inbound frame. Returns the private event to send back to this
    /// connection, if any; broadcasts go out through the channel directly.
    pub async fn handle_frame(&self, sid: &str, raw: &str) -> Option<ServerEvent> {
        match serde_json::from_str::<ClientEvent>(raw) {
            Ok(event) => self.handle_event(sid, event).await,
            Err(e) => {
                tracing::warn!("Malformed frame from {}: {}", sid, e);
                Some(ServerEvent::Error {
                    kind: ErrorKind::ValidationError,
                    message: "Invalid message format. Expected {\"t\": \"chat_message\", \"text\": \"your message\"}".to_string(),
                })
            }
        }
    }

    /// One parsed inbound event
    pub async fn handle_event(&self, sid: &str, event: ClientEvent) -> Option<ServerEvent> {
        match event {
            ClientEvent::ChatMessage { text } => {
                let text = match text {
                    Some(t) if !t.is_empty() => t,
                    _ => {
                        tracing::warn!("Invalid chat_message from {}: empty or missing text", sid);
                        return Some(ServerEvent::Error {
                            kind: ErrorKind::ValidationError,
                            message: "Message text must be a non-empty string".to_string(),
                        });
                    }
                };

                match self.relay_chat(sid, text).await {
                    Ok(()) => None,
                    Err(e) => {
                        tracing::error!("Failed to relay chat_message from {}: {}", sid, e);
                        Some(ServerEvent::Error {
                            kind: e.kind(),
                            message: "A server error occurred while processing your message."
                                .to_string(),
                        })
                    }
                }
            }

            ClientEvent::Unknown => {
                tracing::debug!("Ignoring unrecognized event from {}", sid);
                None
            }
        }
    }

    /// Transport-level disconnect: deregister and tell everyone left.
    /// Failures here are swallowed so cleanup always completes.
    pub async fn handle_disconnect(&self, sid: &str) {
        self.registry.deregister(sid).await;
        tracing::info!("Client disconnected: {}", sid);

        let notice = ChatMessage::from_assistant(format!("User {} has left.", sid));
        if let Err(e) = self.broadcast(ServerEvent::NewMessage(notice)).await {
            tracing::warn!("Dropping departure notice for {}: {}", sid, e);
        }
    }

    /// Echo the user message to everyone, then generate and broadcast the
    /// assistant reply. The generator's delay suspends only this caller.
    async fn relay_chat(&self, sid: &str, text: String) -> Result<(), GatewayError> {
        tracing::info!("Broadcasting message from {}: {:?}", sid, text);
        self.broadcast(ServerEvent::NewMessage(ChatMessage::from_user(
            sid,
            text.clone(),
        )))
        .await?;

        let reply = self.generator.generate(&text).await?;
        tracing::info!("Broadcasting {} reply to {}", self.generator.name(), sid);
        self.broadcast(ServerEvent::NewMessage(ChatMessage::from_assistant(reply)))
            .await?;

        Ok(())
    }

    /// Send to every subscribed connection. Zero receivers with an empty
    /// registry is the normal shutdown/idle case and succeeds as a no-op;
    /// zero receivers while connections are registered means the transport
    /// side lost its subscriptions and is reported as an error.
    async fn broadcast(&self, event: ServerEvent) -> Result<usize, GatewayError> {
        match self.events.send(event) {
            Ok(receivers) => Ok(receivers),
            Err(_) => {
                let registered = self.registry.len().await;
                if registered == 0 {
                    tracing::debug!("No open connections, dropping broadcast");
                    Ok(0)
                } else {
                    Err(GatewayError::Broadcast(registered))
                }
            }
        }
    }
}

impl Default for Gateway {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assistant::AssistantResult;
    use crate::types::ASSISTANT_SID;
    use async_trait::async_trait;

    struct EchoGenerator;

    #[async_trait]
    impl ResponseGenerator for EchoGenerator {
        async fn generate(&self, input: &str) -> AssistantResult<String> {
            Ok(format!("echo: {}", input))
        }

        fn name(&self) -> &str {
            "echo"
        }
    }

    struct FailingGenerator;

    #[async_trait]
    impl ResponseGenerator for FailingGenerator {
        async fn generate(&self, _input: &str) -> AssistantResult<String> {
            Err(AssistantError::Generation("model on fire".to_string()))
        }

        fn name(&self) -> &str {
            "failing"
        }
    }

    #[tokio::test]
    async fn test_connect_acks_are_private_and_complete() {
        let gateway = Gateway::with_generator(Arc::new(EchoGenerator));
        let mut rx = gateway.subscribe();

        let acks = gateway.handle_connect("sid-a").await;
        assert_eq!(acks.len(), 2);
        match &acks[0] {
            ServerEvent::ServerRegisteredSid { sid } => assert_eq!(sid, "sid-a"),
            other => panic!("Expected ServerRegisteredSid, got {:?}", other),
        }
        match &acks[1] {
            ServerEvent::NewMessage(msg) => {
                assert!(msg.is_ai);
                assert_eq!(msg.sender_sid, ASSISTANT_SID);
                assert_eq!(msg.text, WELCOME_TEXT);
            }
            other => panic!("Expected welcome NewMessage, got {:?}", other),
        }

        // Nothing reached the broadcast channel
        assert!(rx.try_recv().is_err());
        assert!(gateway.registry.contains("sid-a").await);
    }

    #[tokio::test]
    async fn test_valid_message_broadcasts_echo_then_reply() {
        let gateway = Gateway::with_generator(Arc::new(EchoGenerator));
        gateway.handle_connect("sid-a").await;
        let mut rx = gateway.subscribe();

        let response = gateway
            .handle_event(
                "sid-a",
                ClientEvent::ChatMessage {
                    text: Some("hi".to_string()),
                },
            )
            .await;
        assert!(response.is_none());

        match rx.recv().await.unwrap() {
            ServerEvent::NewMessage(msg) => {
                assert_eq!(msg.sender_sid, "sid-a");
                assert_eq!(msg.text, "hi");
                assert!(!msg.is_ai);
            }
            other => panic!("Expected user NewMessage, got {:?}", other),
        }
        match rx.recv().await.unwrap() {
            ServerEvent::NewMessage(msg) => {
                assert_eq!(msg.sender_sid, ASSISTANT_SID);
                assert_eq!(msg.text, "echo: hi");
                assert!(msg.is_ai);
            }
            other => panic!("Expected assistant NewMessage, got {:?}", other),
        }
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_empty_text_yields_validation_error_and_no_broadcast() {
        let gateway = Gateway::with_generator(Arc::new(EchoGenerator));
        gateway.handle_connect("sid-a").await;
        let mut rx = gateway.subscribe();

        for event in [
            ClientEvent::ChatMessage { text: None },
            ClientEvent::ChatMessage {
                text: Some(String::new()),
            },
        ] {
            let response = gateway.handle_event("sid-a", event).await;
            match response {
                Some(ServerEvent::Error { kind, .. }) => {
                    assert_eq!(kind, ErrorKind::ValidationError)
                }
                other => panic!("Expected validation error, got {:?}", other),
            }
        }
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_malformed_frames_yield_validation_error() {
        let gateway = Gateway::with_generator(Arc::new(EchoGenerator));
        gateway.handle_connect("sid-a").await;
        let mut rx = gateway.subscribe();

        for raw in ["not json", "[1,2,3]", "{}", r#"{"text":"hi"}"#] {
            let response = gateway.handle_frame("sid-a", raw).await;
            match response {
                Some(ServerEvent::Error { kind, .. }) => {
                    assert_eq!(kind, ErrorKind::ValidationError, "for frame {:?}", raw)
                }
                other => panic!("Expected validation error for {:?}, got {:?}", raw, other),
            }
        }
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_unrecognized_event_is_ignored() {
        let gateway = Gateway::with_generator(Arc::new(EchoGenerator));
        gateway.handle_connect("sid-a").await;
        let mut rx = gateway.subscribe();

        let response = gateway
            .handle_frame("sid-a", r#"{"t":"typing_indicator","on":true}"#)
            .await;
        assert!(response.is_none());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_generator_failure_yields_server_error() {
        let gateway = Gateway::with_generator(Arc::new(FailingGenerator));
        gateway.handle_connect("sid-a").await;
        let mut rx = gateway.subscribe();

        let response = gateway
            .handle_event(
                "sid-a",
                ClientEvent::ChatMessage {
                    text: Some("hi".to_string()),
                },
            )
            .await;
        match response {
            Some(ServerEvent::Error { kind, message }) => {
                assert_eq!(kind, ErrorKind::ServerError);
                // No internal detail leaks to the client
                assert!(!message.contains("on fire"));
            }
            other => panic!("Expected server error, got {:?}", other),
        }

        // The user echo still went out before the generator ran
        match rx.recv().await.unwrap() {
            ServerEvent::NewMessage(msg) => assert!(!msg.is_ai),
            other => panic!("Expected user NewMessage, got {:?}", other),
        }
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_broadcast_without_receivers_is_server_error() {
        let gateway = Gateway::with_generator(Arc::new(EchoGenerator));
        gateway.handle_connect("sid-a").await;
        // No subscriber despite a registered connection

        let response = gateway
            .handle_event(
                "sid-a",
                ClientEvent::ChatMessage {
                    text: Some("hi".to_string()),
                },
            )
            .await;
        match response {
            Some(ServerEvent::Error { kind, .. }) => assert_eq!(kind, ErrorKind::ServerError),
            other => panic!("Expected server error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_disconnect_broadcasts_departure_notice() {
        let gateway = Gateway::with_generator(Arc::new(EchoGenerator));
        gateway.handle_connect("sid-a").await;
        gateway.handle_connect("sid-b").await;
        let mut rx = gateway.subscribe();

        gateway.handle_disconnect("sid-a").await;
        assert!(!gateway.registry.contains("sid-a").await);
        assert!(gateway.registry.contains("sid-b").await);

        match rx.recv().await.unwrap() {
            ServerEvent::NewMessage(msg) => {
                assert!(msg.is_ai);
                assert!(msg.text.contains("sid-a"));
                assert!(msg.text.contains("left"));
            }
            other => panic!("Expected departure NewMessage, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_disconnect_with_no_one_left_is_silent() {
        let gateway = Gateway::with_generator(Arc::new(EchoGenerator));
        gateway.handle_connect("sid-a").await;
        // No subscribers at all; must neither error nor panic
        gateway.handle_disconnect("sid-a").await;
        assert!(gateway.registry.is_empty().await);
    }
}
