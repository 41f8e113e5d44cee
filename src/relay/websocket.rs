//! WebSocket relay client.
//!
//! Speaks the NIP-01 client side: sends `["EVENT", <event>]` and waits for
//! the relay's `["OK", <id>, <accepted>, <message>]`.

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use super::{RelayConnection, RelayConnector, RelayError};
use crate::nostr::StatusEvent;

/// Opens real WebSocket connections.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebSocketConnector;

#[async_trait]
impl RelayConnector for WebSocketConnector {
    async fn connect(&self, url: &str) -> Result<Box<dyn RelayConnection>, RelayError> {
        let parsed = url::Url::parse(url).map_err(|e| RelayError::InvalidUrl(e.to_string()))?;
        if !matches!(parsed.scheme(), "ws" | "wss") {
            return Err(RelayError::InvalidUrl(format!(
                "unsupported scheme {:?}",
                parsed.scheme()
            )));
        }

        let (stream, _response) = connect_async(url).await.map_err(RelayError::Connect)?;
        tracing::debug!(relay = url, "Connected");

        Ok(Box::new(WebSocketRelay {
            url: url.to_string(),
            stream,
        }))
    }
}

/// One open relay connection.
struct WebSocketRelay {
    url: String,
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl RelayConnection for WebSocketRelay {
    async fn publish(&mut self, event: &StatusEvent) -> Result<(), RelayError> {
        let frame = serde_json::to_string(&serde_json::json!(["EVENT", event]))
            .map_err(|e| RelayError::Protocol(e.to_string()))?;

        self.stream
            .send(Message::Text(frame))
            .await
            .map_err(RelayError::Send)?;

        while let Some(message) = self.stream.next().await {
            let text = match message.map_err(RelayError::Receive)? {
                Message::Text(text) => text,
                Message::Close(_) => return Err(RelayError::Closed),
                // Pings are answered by tungstenite
                _ => continue,
            };

            match RelayMessage::parse(&text) {
                RelayMessage::Ok {
                    event_id,
                    accepted,
                    message,
                } if event_id == event.id => {
                    return if accepted {
                        Ok(())
                    } else {
                        Err(RelayError::Rejected(message))
                    };
                }
                RelayMessage::Notice(notice) => {
                    tracing::warn!(relay = %self.url, notice = %notice, "Relay notice");
                }
                _ => {}
            }
        }

        Err(RelayError::Closed)
    }

    async fn close(&mut self) {
        if let Err(e) = self.stream.close(None).await {
            tracing::debug!(relay = %self.url, error = %e, "Error while closing connection");
        }
    }
}

/// Relay-to-client messages this client cares about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayMessage {
    Ok {
        event_id: String,
        accepted: bool,
        message: String,
    },
    Notice(String),
    Other,
}

impl RelayMessage {
    pub fn parse(text: &str) -> Self {
        let Ok(serde_json::Value::Array(items)) = serde_json::from_str(text) else {
            return RelayMessage::Other;
        };

        match items.first().and_then(|v| v.as_str()) {
            Some("OK") => {
                let event_id = items.get(1).and_then(|v| v.as_str());
                let accepted = items.get(2).and_then(|v| v.as_bool());
                match (event_id, accepted) {
                    (Some(event_id), Some(accepted)) => RelayMessage::Ok {
                        event_id: event_id.to_string(),
                        accepted,
                        message: items
                            .get(3)
                            .and_then(|v| v.as_str())
                            .unwrap_or_default()
                            .to_string(),
                    },
                    _ => RelayMessage::Other,
                }
            }
            Some("NOTICE") => RelayMessage::Notice(
                items
                    .get(1)
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .to_string(),
            ),
            _ => RelayMessage::Other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[test]
    fn test_parse_ok_accepted() {
        assert_eq!(
            RelayMessage::parse(r#"["OK","abc",true,""]"#),
            RelayMessage::Ok {
                event_id: "abc".to_string(),
                accepted: true,
                message: String::new(),
            }
        );
    }

    #[test]
    fn test_parse_ok_rejected() {
        assert_eq!(
            RelayMessage::parse(r#"["OK","abc",false,"blocked: not allowed"]"#),
            RelayMessage::Ok {
                event_id: "abc".to_string(),
                accepted: false,
                message: "blocked: not allowed".to_string(),
            }
        );
    }

    #[test]
    fn test_parse_notice_and_garbage() {
        assert_eq!(
            RelayMessage::parse(r#"["NOTICE","slow down"]"#),
            RelayMessage::Notice("slow down".to_string())
        );
        assert_eq!(RelayMessage::parse(r#"["EOSE","sub"]"#), RelayMessage::Other);
        assert_eq!(RelayMessage::parse("not json"), RelayMessage::Other);
        assert_eq!(RelayMessage::parse(r#"["OK"]"#), RelayMessage::Other);
    }

    #[tokio::test]
    async fn test_rejects_non_websocket_url() {
        let result = WebSocketConnector.connect("https://relay.example").await;
        assert!(matches!(result, Err(RelayError::InvalidUrl(_))));

        let result = WebSocketConnector.connect("not a url").await;
        assert!(matches!(result, Err(RelayError::InvalidUrl(_))));
    }

    fn sample_event() -> StatusEvent {
        StatusEvent {
            id: "e1".to_string(),
            pubkey: "p".to_string(),
            created_at: 1,
            kind: 30315,
            tags: vec![vec!["d".to_string(), "music".to_string()]],
            content: "A - B".to_string(),
            sig: "s".to_string(),
        }
    }

    /// Minimal relay: answers every EVENT with a NOTICE then an OK.
    async fn spawn_relay(accept: bool) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(tcp).await.unwrap();
            while let Some(Ok(Message::Text(text))) = ws.next().await {
                let value: serde_json::Value = serde_json::from_str(&text).unwrap();
                assert_eq!(value[0], "EVENT");
                let id = value[1]["id"].as_str().unwrap().to_string();
                ws.send(Message::Text(r#"["NOTICE","hello"]"#.to_string()))
                    .await
                    .unwrap();
                let reason = if accept { "" } else { "blocked" };
                let ok = serde_json::json!(["OK", id, accept, reason]);
                ws.send(Message::Text(ok.to_string())).await.unwrap();
            }
        });

        format!("ws://{}", addr)
    }

    #[tokio::test]
    async fn test_publish_accepted() {
        let url = spawn_relay(true).await;
        let mut conn = WebSocketConnector.connect(&url).await.unwrap();
        conn.publish(&sample_event()).await.unwrap();
        conn.close().await;
    }

    #[tokio::test]
    async fn test_publish_rejected() {
        let url = spawn_relay(false).await;
        let mut conn = WebSocketConnector.connect(&url).await.unwrap();
        let result = conn.publish(&sample_event()).await;
        assert!(matches!(result, Err(RelayError::Rejected(m)) if m == "blocked"));
        conn.close().await;
    }
}
