//! WebSocket transport over `tokio-tungstenite`.
//!
//! The socket is split into a writer task draining the outbound channel and a
//! reader task translating frames into [`TransportEvent`]s. The reader always
//! finishes with a `Close` event, synthesizing one with
//! [`ABNORMAL_CLOSURE`] when the stream ends without a close frame.

use async_trait::async_trait;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::http::header::SEC_WEBSOCKET_PROTOCOL;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, instrument, warn};
use url::Url;

use super::{ABNORMAL_CLOSURE, Connector, TransportChannel, TransportError, TransportEvent};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Close code reported when the peer sent a close frame without a status.
const NO_STATUS: u16 = 1005;

/// Connects over WebSocket, optionally requesting a subprotocol.
#[derive(Clone, Debug, Default)]
pub struct WsConnector {
    subprotocol: Option<String>,
}

impl WsConnector {
    /// Request `subprotocol` during the upgrade.
    pub fn new(subprotocol: impl Into<String>) -> Self {
        Self {
            subprotocol: Some(subprotocol.into()),
        }
    }

    /// Connect without requesting a subprotocol.
    pub fn without_subprotocol() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Connector for WsConnector {
    #[instrument(skip_all, fields(url = %url))]
    async fn connect(&self, url: &Url) -> Result<TransportChannel, TransportError> {
        let mut request = url
            .as_str()
            .into_client_request()
            .map_err(|e| TransportError::Request(e.to_string()))?;
        if let Some(protocol) = &self.subprotocol {
            let value = HeaderValue::from_str(protocol)
                .map_err(|e| TransportError::Request(format!("subprotocol {protocol:?}: {e}")))?;
            let _ = request.headers_mut().insert(SEC_WEBSOCKET_PROTOCOL, value);
        }

        let (ws, response) = connect_async(request)
            .await
            .map_err(|e| TransportError::Connect(e.to_string()))?;
        debug!(status = %response.status(), "websocket open");

        let (sink, stream) = ws.split();
        let (out_tx, out_rx) = mpsc::unbounded_channel();
        let (in_tx, in_rx) = mpsc::unbounded_channel();
        let _ = in_tx.send(TransportEvent::Open);

        drop(tokio::spawn(write_loop(sink, out_rx, in_tx.clone())));
        drop(tokio::spawn(read_loop(stream, in_tx)));

        Ok(TransportChannel {
            outbound: out_tx,
            inbound: in_rx,
        })
    }
}

async fn write_loop(
    mut sink: SplitSink<WsStream, Message>,
    mut outbound: mpsc::UnboundedReceiver<String>,
    events: mpsc::UnboundedSender<TransportEvent>,
) {
    while let Some(text) = outbound.recv().await {
        if let Err(e) = sink.send(Message::Text(text.into())).await {
            let _ = events.send(TransportEvent::Error(e.to_string()));
            return;
        }
    }
    // Outbound dropped: the client is closing.
    if let Err(e) = sink.close().await {
        debug!(error = %e, "websocket close handshake failed");
    }
}

async fn read_loop(mut stream: SplitStream<WsStream>, events: mpsc::UnboundedSender<TransportEvent>) {
    while let Some(message) = stream.next().await {
        let event = match message {
            Ok(Message::Text(text)) => TransportEvent::Message(text.as_str().to_owned()),
            Ok(Message::Binary(bytes)) => match String::from_utf8(bytes.to_vec()) {
                Ok(text) => TransportEvent::Message(text),
                Err(_) => {
                    warn!(len = bytes.len(), "dropping non-UTF-8 binary frame");
                    continue;
                }
            },
            Ok(Message::Close(frame)) => {
                let _ = events.send(close_event(frame));
                return;
            }
            Ok(_) => continue,
            Err(e) => {
                let reason = e.to_string();
                let _ = events.send(TransportEvent::Error(reason.clone()));
                let _ = events.send(TransportEvent::Close {
                    code: ABNORMAL_CLOSURE,
                    reason,
                });
                return;
            }
        };
        if events.send(event).is_err() {
            return;
        }
    }
    let _ = events.send(TransportEvent::Close {
        code: ABNORMAL_CLOSURE,
        reason: "stream ended".to_string(),
    });
}

fn close_event(frame: Option<CloseFrame>) -> TransportEvent {
    match frame {
        Some(frame) => TransportEvent::Close {
            code: u16::from(frame.code),
            reason: frame.reason.as_str().to_owned(),
        },
        None => TransportEvent::Close {
            code: NO_STATUS,
            reason: String::new(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;

    #[test]
    fn close_frame_maps_code_and_reason() {
        let event = close_event(Some(CloseFrame {
            code: CloseCode::Away,
            reason: "bye".into(),
        }));
        assert_eq!(
            event,
            TransportEvent::Close {
                code: 1001,
                reason: "bye".into(),
            }
        );
    }

    #[test]
    fn missing_close_frame_reports_no_status() {
        assert_eq!(
            close_event(None),
            TransportEvent::Close {
                code: NO_STATUS,
                reason: String::new(),
            }
        );
    }

    #[tokio::test]
    async fn unreachable_host_fails_to_connect() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let url = Url::parse(&format!("ws://127.0.0.1:{port}/rpc")).unwrap();
        let err = WsConnector::new("json").connect(&url).await.unwrap_err();
        assert!(matches!(err, TransportError::Connect(_)));
    }
}
