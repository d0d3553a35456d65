//! Chat WebSocket Client
//!
//! [`TwitchChatSession`] logs in over a WebSocket, keeps the connection alive
//! and writes one `PRIVMSG` per command. A background reader answers server
//! pings and resolves the readiness latch.

use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use std::sync::{Arc, Mutex as StdMutex, MutexGuard};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use super::line::{self, ChatLine};
use crate::dispatch::{ChatSession, ReadySignal, SessionError};

/// Default chat endpoint
pub const DEFAULT_CHAT_URL: &str = "wss://irc-ws.chat.twitch.tv:443";

/// Default keep-alive interval
pub const DEFAULT_PING_INTERVAL: Duration = Duration::from_secs(240);

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type Writer = Arc<Mutex<SplitSink<WsStream, Message>>>;

/// Chat connection settings
#[derive(Debug, Clone)]
pub struct ChatConfig {
    pub url: String,
    pub login: String,
    pub token: String,
    pub ping_interval: Duration,
}

impl ChatConfig {
    pub fn new(login: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            url: DEFAULT_CHAT_URL.to_string(),
            login: login.into(),
            token: token.into(),
            ping_interval: DEFAULT_PING_INTERVAL,
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn with_ping_interval(mut self, interval: Duration) -> Self {
        self.ping_interval = interval;
        self
    }
}

struct Connection {
    writer: Writer,
    tasks: Vec<JoinHandle<()>>,
}

enum Link {
    Idle,
    Open(Connection),
    Closed,
}

/// Single-use chat session
///
/// Once disconnected, a session cannot be reconnected; create a new one.
pub struct TwitchChatSession {
    config: ChatConfig,
    ready: ReadySignal,
    link: StdMutex<Link>,
}

impl TwitchChatSession {
    pub fn new(config: ChatConfig) -> Self {
        Self {
            config,
            ready: ReadySignal::new(),
            link: StdMutex::new(Link::Idle),
        }
    }

    pub fn config(&self) -> &ChatConfig {
        &self.config
    }

    /// Readiness latch, resolved by the reader task
    pub fn ready_signal(&self) -> &ReadySignal {
        &self.ready
    }

    fn link(&self) -> MutexGuard<'_, Link> {
        self.link.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn writer(&self) -> Result<Writer, SessionError> {
        match &*self.link() {
            Link::Open(conn) => Ok(Arc::clone(&conn.writer)),
            Link::Idle | Link::Closed => Err(SessionError::NotConnected),
        }
    }
}

#[async_trait]
impl ChatSession for TwitchChatSession {
    async fn connect(&self) -> Result<(), SessionError> {
        let idle = matches!(*self.link(), Link::Idle);
        if !idle {
            return Err(SessionError::Connect(
                "session was already connected".to_string(),
            ));
        }

        tracing::info!("Connecting to {}", self.config.url);
        let (stream, _response) = connect_async(self.config.url.as_str())
            .await
            .map_err(|e| SessionError::Connect(e.to_string()))?;
        let (sink, source) = stream.split();
        let writer: Writer = Arc::new(Mutex::new(sink));

        write_line(&writer, &line::pass(&self.config.token))
            .await
            .map_err(|e| SessionError::Login(e.to_string()))?;
        write_line(&writer, &line::nick(&self.config.login))
            .await
            .map_err(|e| SessionError::Login(e.to_string()))?;

        let reader = tokio::spawn(read_loop(source, Arc::clone(&writer), self.ready.clone()));
        let keepalive = tokio::spawn(keepalive_loop(
            Arc::clone(&writer),
            self.config.ping_interval,
        ));

        let mut link = self.link();
        if matches!(*link, Link::Idle) {
            *link = Link::Open(Connection {
                writer,
                tasks: vec![reader, keepalive],
            });
            Ok(())
        } else {
            // Disconnected while the handshake was in flight
            reader.abort();
            keepalive.abort();
            Err(SessionError::Cancelled)
        }
    }

    async fn wait_ready(&self) -> Result<(), SessionError> {
        let idle = matches!(*self.link(), Link::Idle);
        if idle && !self.ready.is_resolved() {
            return Err(SessionError::NotConnected);
        }
        self.ready.wait().await
    }

    async fn send(&self, channel: &str, command: &str) -> Result<(), SessionError> {
        let writer = self.writer()?;
        write_line(&writer, &line::privmsg(channel, command))
            .await
            .map_err(|e| SessionError::Send(e.to_string()))
    }

    async fn disconnect(&self) -> Result<(), SessionError> {
        let previous = std::mem::replace(&mut *self.link(), Link::Closed);
        let conn = match previous {
            Link::Open(conn) => conn,
            Link::Idle | Link::Closed => return Ok(()),
        };

        for task in &conn.tasks {
            task.abort();
        }

        let mut sink = conn.writer.lock().await;
        if let Err(e) = sink.send(Message::Close(None)).await {
            tracing::debug!("Close frame not sent: {}", e);
        }
        if let Err(e) = sink.close().await {
            tracing::debug!("Socket close failed: {}", e);
        }
        tracing::info!("Disconnected from chat");
        Ok(())
    }
}

async fn write_line(writer: &Writer, text: &str) -> Result<(), tungstenite::Error> {
    if line::is_sensitive(text) {
        tracing::trace!("send: PASS ***");
    } else {
        tracing::trace!("send: {}", text);
    }
    writer.lock().await.send(Message::text(text.to_string())).await
}

async fn read_loop(mut source: SplitStream<WsStream>, writer: Writer, ready: ReadySignal) {
    let reason = loop {
        match source.next().await {
            Some(Ok(Message::Text(text))) => {
                for raw in text.as_str().lines() {
                    handle_line(raw, &writer, &ready).await;
                }
            }
            Some(Ok(Message::Close(frame))) => {
                break frame
                    .map(|f| f.reason.as_str().to_string())
                    .unwrap_or_else(|| "closed by server".to_string());
            }
            Some(Ok(_)) => {}
            Some(Err(e)) => break e.to_string(),
            None => break "stream ended".to_string(),
        }
    };

    if ready.fail(SessionError::Closed(reason.clone())) {
        tracing::error!("Chat connection closed before login completed: {}", reason);
    } else {
        tracing::debug!("Chat reader stopped: {}", reason);
    }
}

async fn handle_line(raw: &str, writer: &Writer, ready: &ReadySignal) {
    tracing::trace!("recv: {}", raw);
    let Some(msg) = ChatLine::parse(raw) else {
        return;
    };

    match msg.command.as_str() {
        "PING" => {
            let token = msg.trailing().unwrap_or("tmi.twitch.tv");
            if let Err(e) = write_line(writer, &line::pong(token)).await {
                tracing::warn!("Failed to answer PING: {}", e);
            }
        }
        "001" => {
            if ready.fire() {
                tracing::info!("Logged in to chat");
            }
        }
        "NOTICE" if msg.is_login_failure() => {
            let reason = msg.trailing().unwrap_or("login rejected").to_string();
            ready.fail(SessionError::Login(reason));
        }
        "NOTICE" => {
            tracing::info!("{}", msg.trailing().unwrap_or_default());
        }
        "RECONNECT" => {
            tracing::warn!("Server requested a reconnect; pending commands may be lost");
        }
        _ => {}
    }
}

async fn keepalive_loop(writer: Writer, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    // First tick completes immediately
    ticker.tick().await;
    loop {
        ticker.tick().await;
        if let Err(e) = write_line(&writer, &line::ping("tmi.twitch.tv")).await {
            tracing::debug!("Keep-alive stopped: {}", e);
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> TwitchChatSession {
        TwitchChatSession::new(ChatConfig::new("bot", "oauth:token").with_url("ws://127.0.0.1:1"))
    }

    #[test]
    fn test_config_defaults() {
        let config = ChatConfig::new("bot", "token");
        assert_eq!(config.url, DEFAULT_CHAT_URL);
        assert_eq!(config.ping_interval, Duration::from_secs(240));
    }

    #[tokio::test]
    async fn test_send_before_connect() {
        let session = session();
        assert_eq!(
            session.send("chan", "/ban x").await,
            Err(SessionError::NotConnected)
        );
        assert_eq!(session.wait_ready().await, Err(SessionError::NotConnected));
    }

    #[tokio::test]
    async fn test_disconnect_is_idempotent() {
        let session = session();
        assert!(session.disconnect().await.is_ok());
        assert!(session.disconnect().await.is_ok());
        assert_eq!(
            session.send("chan", "/ban x").await,
            Err(SessionError::NotConnected)
        );
    }

    #[tokio::test]
    async fn test_connect_after_disconnect_is_rejected() {
        let session = session();
        session.disconnect().await.unwrap();
        assert!(matches!(
            session.connect().await,
            Err(SessionError::Connect(_))
        ));
    }
}
