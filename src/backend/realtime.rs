//! Realtime posts channel over a Phoenix websocket.
//!
//! The socket lives in its own task. The task joins the channel, forwards
//! decoded changes in delivery order, heartbeats, and reconnects with
//! exponential backoff plus jitter until the subscription handle leaves or is
//! dropped. After a reconnect it emits one `Unrecognized` change so the feed
//! refetches whatever it missed while the socket was down.
//!
//! ERROR HANDLING
//! ==============
//! Transport failures never reach the subscriber; they are logged and end
//! the current socket, and the reconnect loop takes over.

#[cfg(test)]
#[path = "realtime_test.rs"]
mod realtime_test;

use std::time::Duration;

use domain::realtime::{
    RealtimeSignal, access_token_message, classify, heartbeat_message, join_message, leave_message, posts_topic,
};
use domain::{ChangeEvent, PhoenixMessage, Session};
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use rand::Rng;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use uuid::Uuid;

use super::{ChangeSubscription, ChannelControl};
use crate::error::BackendError;

const EVENT_BUFFER: usize = 256;
const INITIAL_BACKOFF_MS: u64 = 1_000;
const MAX_BACKOFF_MS: u64 = 10_000;

type SocketSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;

/// Spawn the socket task for `session`'s own posts and return its handle.
#[must_use]
pub fn spawn_posts_channel(url: String, session: &Session, heartbeat: Duration) -> ChangeSubscription {
    let topic = posts_topic(&session.user.id);
    let (events_tx, events_rx) = mpsc::channel(EVENT_BUFFER);
    let (control_tx, control_rx) = mpsc::unbounded_channel();
    let channel = PostsChannel {
        url,
        topic: topic.clone(),
        user_id: session.user.id,
        access_token: session.access_token.clone(),
        heartbeat,
        next_ref: 0,
        backoff_ms: INITIAL_BACKOFF_MS,
    };
    let task = tokio::spawn(channel.run(events_tx, control_rx));
    ChangeSubscription::new(topic, events_rx, control_tx, task)
}

enum SocketEnd {
    /// The subscriber left; stop for good.
    Left,
    /// The socket went away; reconnect.
    Disconnected(String),
}

struct PostsChannel {
    url: String,
    topic: String,
    user_id: Uuid,
    access_token: String,
    heartbeat: Duration,
    next_ref: u64,
    backoff_ms: u64,
}

impl PostsChannel {
    async fn run(
        mut self,
        events: mpsc::Sender<ChangeEvent>,
        mut control: mpsc::UnboundedReceiver<ChannelControl>,
    ) {
        let mut resumed = false;
        loop {
            match self.connect_and_pump(&events, &mut control, resumed).await {
                Ok(SocketEnd::Left) => {
                    tracing::debug!(topic = %self.topic, "realtime channel left");
                    return;
                }
                Ok(SocketEnd::Disconnected(reason)) => {
                    tracing::warn!(topic = %self.topic, %reason, "realtime channel disconnected");
                }
                Err(e) => {
                    tracing::warn!(topic = %self.topic, error = %e, "realtime socket failed");
                }
            }
            if events.is_closed() {
                return;
            }
            resumed = true;

            let jitter = rand::rng().random_range(0..=self.backoff_ms / 4);
            let delay = Duration::from_millis(self.backoff_ms + jitter);
            tokio::select! {
                () = tokio::time::sleep(delay) => {}
                command = control.recv() => match command {
                    Some(ChannelControl::AccessToken(token)) => self.access_token = token,
                    Some(ChannelControl::Leave) | None => return,
                },
            }
            self.backoff_ms = (self.backoff_ms * 2).min(MAX_BACKOFF_MS);
        }
    }

    async fn connect_and_pump(
        &mut self,
        events: &mpsc::Sender<ChangeEvent>,
        control: &mut mpsc::UnboundedReceiver<ChannelControl>,
        resumed: bool,
    ) -> Result<SocketEnd, BackendError> {
        let (socket, _) = connect_async(self.url.as_str())
            .await
            .map_err(|e| BackendError::Realtime(e.to_string()))?;
        let (mut sink, mut stream) = socket.split();

        let join_ref = self.take_ref();
        send(&mut sink, &join_message(&self.topic, &self.user_id, &self.access_token, join_ref)).await?;
        let join_ref = join_ref.to_string();

        let mut heartbeat = tokio::time::interval(self.heartbeat);
        heartbeat.tick().await;

        loop {
            tokio::select! {
                _ = heartbeat.tick() => {
                    let reference = self.take_ref();
                    send(&mut sink, &heartbeat_message(reference)).await?;
                }
                command = control.recv() => match command {
                    Some(ChannelControl::AccessToken(token)) => {
                        let reference = self.take_ref();
                        send(&mut sink, &access_token_message(&self.topic, &token, reference)).await?;
                        self.access_token = token;
                    }
                    Some(ChannelControl::Leave) | None => {
                        self.leave(&mut sink).await;
                        return Ok(SocketEnd::Left);
                    }
                },
                frame = stream.next() => {
                    let Some(frame) = frame else {
                        return Ok(SocketEnd::Disconnected("socket closed".to_owned()));
                    };
                    let text = match frame.map_err(|e| BackendError::Realtime(e.to_string()))? {
                        Message::Text(text) => text,
                        Message::Close(_) => return Ok(SocketEnd::Disconnected("closed by server".to_owned())),
                        _ => continue,
                    };
                    let message = match PhoenixMessage::from_text(text.as_str()) {
                        Ok(message) => message,
                        Err(e) => {
                            tracing::debug!(error = %e, "ignoring undecodable realtime frame");
                            continue;
                        }
                    };
                    match classify(&message, &self.topic, &join_ref) {
                        RealtimeSignal::Change(change) => {
                            if events.send(change).await.is_err() {
                                self.leave(&mut sink).await;
                                return Ok(SocketEnd::Left);
                            }
                        }
                        RealtimeSignal::Joined => {
                            tracing::info!(topic = %self.topic, "realtime channel joined");
                            self.backoff_ms = INITIAL_BACKOFF_MS;
                            if resumed
                                && events
                                    .send(ChangeEvent::Unrecognized("resubscribed".to_owned()))
                                    .await
                                    .is_err()
                            {
                                self.leave(&mut sink).await;
                                return Ok(SocketEnd::Left);
                            }
                        }
                        RealtimeSignal::JoinRejected(reason) | RealtimeSignal::Closed(reason) => {
                            return Ok(SocketEnd::Disconnected(reason));
                        }
                        RealtimeSignal::Ignored => {}
                    }
                }
            }
        }
    }

    async fn leave(&mut self, sink: &mut SocketSink) {
        let reference = self.take_ref();
        if let Err(e) = send(sink, &leave_message(&self.topic, reference)).await {
            tracing::debug!(error = %e, "phx_leave not delivered");
        }
        let _ = sink.close().await;
    }

    fn take_ref(&mut self) -> u64 {
        self.next_ref += 1;
        self.next_ref
    }
}

async fn send(sink: &mut SocketSink, message: &PhoenixMessage) -> Result<(), BackendError> {
    sink.send(Message::text(message.to_text()))
        .await
        .map_err(|e| BackendError::Realtime(e.to_string()))
}
