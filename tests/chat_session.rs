//! Chat session against a local WebSocket server

use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;
use twitch_tools::chat::{ChatConfig, TwitchChatSession};
use twitch_tools::dispatch::{
    BatchDispatcher, BatchJob, ChatSession, CommandTemplate, SessionError,
};
use twitch_tools::rate_limit::RateLimitConfig;

#[derive(Debug, Clone, Copy)]
enum Server {
    /// Ping, then welcome
    Welcome,
    /// Reject the credentials
    RejectLogin,
    /// Close the socket right after NICK
    HangUp,
}

/// Accept one client and return every line it sent
async fn spawn_server(mode: Server) -> (String, JoinHandle<Vec<String>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}", listener.local_addr().unwrap());

    let handle = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = accept_async(stream).await.unwrap();
        let mut received = Vec::new();

        while let Some(Ok(msg)) = ws.next().await {
            let text = match msg {
                Message::Text(text) => text.as_str().to_string(),
                Message::Close(_) => break,
                _ => continue,
            };

            for line in text.lines() {
                received.push(line.to_string());
                if !line.starts_with("NICK") {
                    continue;
                }
                match mode {
                    Server::Welcome => {
                        ws.send(Message::text("PING :tmi.twitch.tv".to_string()))
                            .await
                            .unwrap();
                        ws.send(Message::text(
                            ":tmi.twitch.tv 001 modbot :Welcome, GLHF!".to_string(),
                        ))
                        .await
                        .unwrap();
                    }
                    Server::RejectLogin => {
                        ws.send(Message::text(
                            ":tmi.twitch.tv NOTICE * :Login authentication failed".to_string(),
                        ))
                        .await
                        .unwrap();
                    }
                    Server::HangUp => {
                        let _ = ws.close(None).await;
                    }
                }
            }
        }
        received
    });

    (url, handle)
}

fn session(url: &str) -> TwitchChatSession {
    TwitchChatSession::new(ChatConfig::new("ModBot", "oauth:secret").with_url(url))
}

#[tokio::test]
async fn test_login_ping_and_send() {
    let (url, server) = spawn_server(Server::Welcome).await;
    let session = session(&url);

    session.connect().await.unwrap();
    tokio::time::timeout(Duration::from_secs(5), session.wait_ready())
        .await
        .unwrap()
        .unwrap();
    assert!(session.ready_signal().is_ready());

    session.send("somechannel", "/ban spammer").await.unwrap();
    session.send("#somechannel", "/ban other").await.unwrap();
    session.disconnect().await.unwrap();
    session.disconnect().await.unwrap();

    let received = server.await.unwrap();
    assert_eq!(received[0], "PASS oauth:secret");
    assert_eq!(received[1], "NICK modbot");
    assert!(received.contains(&"PONG :tmi.twitch.tv".to_string()));
    assert!(received.contains(&"PRIVMSG #somechannel :/ban spammer".to_string()));
    assert!(received.contains(&"PRIVMSG #somechannel :/ban other".to_string()));
}

#[tokio::test]
async fn test_rejected_login_fails_readiness() {
    let (url, server) = spawn_server(Server::RejectLogin).await;
    let session = session(&url);

    session.connect().await.unwrap();
    let result = tokio::time::timeout(Duration::from_secs(5), session.wait_ready())
        .await
        .unwrap();
    assert_eq!(
        result,
        Err(SessionError::Login("Login authentication failed".to_string()))
    );

    session.disconnect().await.unwrap();
    server.await.unwrap();
}

#[tokio::test]
async fn test_close_before_welcome_fails_readiness() {
    let (url, server) = spawn_server(Server::HangUp).await;
    let session = session(&url);

    session.connect().await.unwrap();
    let result = tokio::time::timeout(Duration::from_secs(5), session.wait_ready())
        .await
        .unwrap();
    assert!(matches!(result, Err(SessionError::Closed(_))));

    session.disconnect().await.unwrap();
    server.await.unwrap();
}

#[tokio::test]
async fn test_connect_refused() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}", listener.local_addr().unwrap());
    drop(listener);

    let session = session(&url);
    assert!(matches!(
        session.connect().await,
        Err(SessionError::Connect(_))
    ));
    assert!(session.disconnect().await.is_ok());
}

#[tokio::test]
async fn test_dispatch_over_websocket() {
    let (url, server) = spawn_server(Server::Welcome).await;
    let session = Arc::new(session(&url));
    let job = BatchJob::from_input(
        "alpha\nBeta, gamma alpha",
        CommandTemplate::new("#SomeChannel", "/timeout", "600 spam"),
        RateLimitConfig::new(95, 30),
    );

    let report = BatchDispatcher::for_job(&job)
        .unwrap()
        .with_ready_timeout(Duration::from_secs(5))
        .run(Arc::clone(&session), &job, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(report.succeeded(), 3);

    let received = server.await.unwrap();
    let mut commands: Vec<_> = received
        .iter()
        .filter(|l| l.starts_with("PRIVMSG"))
        .cloned()
        .collect();
    commands.sort();
    assert_eq!(
        commands,
        vec![
            "PRIVMSG #somechannel :/timeout alpha 600 spam",
            "PRIVMSG #somechannel :/timeout beta 600 spam",
            "PRIVMSG #somechannel :/timeout gamma 600 spam",
        ]
    );
}
