//! Browser-automation bridge transport.
//!
//! The bridge process owns the actual chat client (and renders the pairing
//! QR); this adapter speaks to it over a WebSocket for lifecycle events and
//! over HTTP for sends. Session strategy is whatever `SessionStore` it is
//! constructed with: the blob travels base64-encoded in the init frame and
//! comes back in `session` events.

use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use base64::prelude::{Engine as _, BASE64_STANDARD};
use coursecast_core::error::{CastError, Result};
use coursecast_core::traits::{ChatTransport, TransportEvent};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message as WsMsg;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

type BridgeSocket = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub struct BridgeTransport {
    name: &'static str,
    ws_url: String,
    http_url: String,
    client: reqwest::Client,
    store: Arc<dyn super::store::SessionStore>,
    events_tx: mpsc::UnboundedSender<TransportEvent>,
    events_rx: Mutex<Option<mpsc::UnboundedReceiver<TransportEvent>>>,
}

impl BridgeTransport {
    pub fn new(
        bridge_url: &str,
        store: Arc<dyn super::store::SessionStore>,
        name: &'static str,
    ) -> Result<Self> {
        let (tx, rx) = mpsc::unbounded_channel();
        Ok(Self {
            name,
            ws_url: bridge_url.to_string(),
            http_url: http_base(bridge_url)?,
            client: reqwest::Client::new(),
            store,
            events_tx: tx,
            events_rx: Mutex::new(Some(rx)),
        })
    }
}

/// Derive the bridge's HTTP base URL from its WebSocket URL.
fn http_base(ws_url: &str) -> Result<String> {
    let mut url = url::Url::parse(ws_url)
        .map_err(|e| CastError::config(format!("invalid bridge URL '{ws_url}': {e}")))?;
    let scheme = match url.scheme() {
        "ws" => "http",
        "wss" => "https",
        s @ ("http" | "https") => s,
        other => {
            return Err(CastError::config(format!(
                "unsupported bridge URL scheme '{other}'"
            )))
        }
    };
    let scheme = scheme.to_string();
    url.set_scheme(&scheme)
        .map_err(|()| CastError::config("cannot derive bridge HTTP URL"))?;
    Ok(url.to_string().trim_end_matches('/').to_string())
}

/// What a decoded bridge frame means for us.
#[derive(Debug)]
enum BridgeFrame {
    Transport(TransportEvent),
    /// Updated session blob to persist.
    Session(Vec<u8>),
    Ignored,
}

fn decode_frame(text: &str) -> BridgeFrame {
    let Ok(payload) = serde_json::from_str::<serde_json::Value>(text) else {
        return BridgeFrame::Ignored;
    };

    match payload["event"].as_str().unwrap_or("") {
        "qr" => BridgeFrame::Transport(TransportEvent::PairingChallenge {
            code: payload["code"].as_str().unwrap_or("").to_string(),
            image_data_url: payload["image"].as_str().unwrap_or("").to_string(),
        }),
        "ready" => BridgeFrame::Transport(TransportEvent::Ready),
        "disconnected" => BridgeFrame::Transport(TransportEvent::Disconnected {
            reason: payload["reason"].as_str().unwrap_or("unknown").to_string(),
        }),
        "session" => match payload["blob"].as_str().map(|b| BASE64_STANDARD.decode(b)) {
            Some(Ok(blob)) => BridgeFrame::Session(blob),
            Some(Err(e)) => {
                tracing::warn!(error = %e, "bridge sent undecodable session blob");
                BridgeFrame::Ignored
            }
            None => BridgeFrame::Ignored,
        },
        other => {
            tracing::trace!(event = other, "ignoring bridge event");
            BridgeFrame::Ignored
        }
    }
}

async fn pump(
    mut ws: BridgeSocket,
    events_tx: mpsc::UnboundedSender<TransportEvent>,
    store: Arc<dyn super::store::SessionStore>,
) {
    let mut ping = tokio::time::interval(Duration::from_secs(30));
    ping.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            msg = ws.next() => {
                match msg {
                    Some(Ok(WsMsg::Text(text))) => match decode_frame(&text) {
                        BridgeFrame::Transport(event) => {
                            let ends_pump = matches!(event, TransportEvent::Disconnected { .. });
                            if events_tx.send(event).is_err() {
                                tracing::debug!("bridge event receiver dropped");
                                return;
                            }
                            if ends_pump {
                                return;
                            }
                        }
                        BridgeFrame::Session(blob) => {
                            if let Err(e) = store.save(&blob).await {
                                tracing::warn!(error = %e, "failed to persist session blob");
                            }
                        }
                        BridgeFrame::Ignored => {}
                    },
                    Some(Ok(WsMsg::Close(_))) | None => {
                        let _ = events_tx.send(TransportEvent::Disconnected {
                            reason: "bridge socket closed".into(),
                        });
                        return;
                    }
                    Some(Err(e)) => {
                        let _ = events_tx.send(TransportEvent::Disconnected {
                            reason: format!("bridge socket error: {e}"),
                        });
                        return;
                    }
                    _ => {}
                }
            }
            _ = ping.tick() => {
                if ws.send(WsMsg::Ping(Vec::new())).await.is_err() {
                    let _ = events_tx.send(TransportEvent::Disconnected {
                        reason: "bridge keepalive failed".into(),
                    });
                    return;
                }
            }
        }
    }
}

#[async_trait]
impl ChatTransport for BridgeTransport {
    fn name(&self) -> &str {
        self.name
    }

    async fn connect(&self) -> Result<()> {
        let session = self.store.load().await?;
        tracing::info!(
            url = %self.ws_url,
            restoring_session = session.is_some(),
            "connecting to chat bridge"
        );

        let (mut ws, _) = tokio_tungstenite::connect_async(self.ws_url.as_str())
            .await
            .map_err(|e| CastError::connection(format!("bridge connect failed: {e}")))?;

        let init = serde_json::json!({
            "op": "init",
            "session": session.map(|blob| BASE64_STANDARD.encode(blob)),
        });
        ws.send(WsMsg::Text(init.to_string()))
            .await
            .map_err(|e| CastError::connection(format!("bridge init failed: {e}")))?;

        let events_tx = self.events_tx.clone();
        let store = Arc::clone(&self.store);
        tokio::spawn(pump(ws, events_tx, store));
        Ok(())
    }

    fn take_events(&self) -> Option<mpsc::UnboundedReceiver<TransportEvent>> {
        self.events_rx.lock().expect("events lock poisoned").take()
    }

    async fn send_text(&self, target: &str, text: &str) -> Result<()> {
        let body = serde_json::json!({ "target": target, "message": text });
        let response = self
            .client
            .post(format!("{}/send", self.http_url))
            .json(&body)
            .send()
            .await
            .map_err(|e| CastError::send(format!("bridge send failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(CastError::send(format!("bridge {status}: {text}")));
        }
        Ok(())
    }

    async fn send_media(&self, target: &str, caption: &str, media: &Path) -> Result<()> {
        let bytes = tokio::fs::read(media)
            .await
            .map_err(|e| CastError::send(format!("cannot read staged media: {e}")))?;
        let file_name = media
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("media")
            .to_string();

        let form = reqwest::multipart::Form::new()
            .text("target", target.to_string())
            .text("caption", caption.to_string())
            .part("file", reqwest::multipart::Part::bytes(bytes).file_name(file_name));

        let response = self
            .client
            .post(format!("{}/send-media", self.http_url))
            .multipart(form)
            .send()
            .await
            .map_err(|e| CastError::send(format!("bridge media send failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(CastError::send(format!("bridge {status}: {text}")));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_base_derivation() {
        assert_eq!(http_base("ws://bridge:8799").unwrap(), "http://bridge:8799");
        assert_eq!(
            http_base("wss://bridge.example/chat").unwrap(),
            "https://bridge.example/chat"
        );
        assert!(http_base("ftp://nope").is_err());
        assert!(http_base("not a url").is_err());
    }

    #[test]
    fn test_decode_qr_frame() {
        let frame =
            decode_frame(r#"{"event":"qr","code":"abc","image":"data:image/png;base64,xyz"}"#);
        match frame {
            BridgeFrame::Transport(TransportEvent::PairingChallenge {
                code,
                image_data_url,
            }) => {
                assert_eq!(code, "abc");
                assert_eq!(image_data_url, "data:image/png;base64,xyz");
            }
            other => panic!("unexpected frame: {other:?}"),
        }
    }

    #[test]
    fn test_decode_session_frame() {
        let frame = decode_frame(r#"{"event":"session","blob":"aGVsbG8="}"#);
        match frame {
            BridgeFrame::Session(blob) => assert_eq!(blob, b"hello"),
            other => panic!("unexpected frame: {other:?}"),
        }
    }

    #[test]
    fn test_decode_disconnect_and_junk() {
        assert!(matches!(
            decode_frame(r#"{"event":"disconnected","reason":"logout"}"#),
            BridgeFrame::Transport(TransportEvent::Disconnected { .. })
        ));
        assert!(matches!(decode_frame("not json"), BridgeFrame::Ignored));
        assert!(matches!(
            decode_frame(r#"{"event":"typing"}"#),
            BridgeFrame::Ignored
        ));
    }
}
