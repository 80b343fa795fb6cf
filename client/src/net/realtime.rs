//! Realtime posts channel over the browser's WebSocket.
//!
//! Mirrors the native engine's channel task: join the user's posts topic,
//! heartbeat, hand each change to the page in delivery order, and reconnect
//! with exponential backoff. After a reconnect the page gets one
//! `Unrecognized` change so it refetches what it missed.
//!
//! All WebSocket logic is gated behind `#[cfg(feature = "hydrate")]` since it
//! requires a browser environment.

#[cfg(test)]
#[path = "realtime_test.rs"]
mod realtime_test;

pub const INITIAL_BACKOFF_MS: u32 = 1_000;
pub const MAX_BACKOFF_MS: u32 = 10_000;

/// Delay after `current` for the next reconnect attempt.
#[must_use]
pub fn next_backoff_ms(current: u32) -> u32 {
    current.saturating_mul(2).min(MAX_BACKOFF_MS)
}

/// Heartbeat period in milliseconds.
#[must_use]
pub fn heartbeat_ms() -> u32 {
    u32::try_from(domain::realtime::HEARTBEAT_INTERVAL_SECS.saturating_mul(1_000)).unwrap_or(u32::MAX)
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChannelControl {
    AccessToken(String),
    Leave,
}

/// Page-side handle to the channel task.
#[cfg(feature = "hydrate")]
pub struct RealtimeHandle {
    control: futures::channel::mpsc::UnboundedSender<ChannelControl>,
}

#[cfg(feature = "hydrate")]
impl RealtimeHandle {
    pub fn update_access_token(&self, access_token: &str) {
        let _ = self.control.unbounded_send(ChannelControl::AccessToken(access_token.to_owned()));
    }

    /// `removeChannel`: leave and stop reconnecting.
    pub fn leave(&self) {
        let _ = self.control.unbounded_send(ChannelControl::Leave);
    }
}

/// Spawn the channel task for `session`'s posts.
#[cfg(feature = "hydrate")]
pub fn spawn_posts_channel(
    url: String,
    session: &domain::Session,
    on_change: impl Fn(domain::ChangeEvent) + 'static,
) -> RealtimeHandle {
    let (tx, rx) = futures::channel::mpsc::unbounded();
    let channel = imp::PostsChannel {
        url,
        topic: domain::realtime::posts_topic(&session.user.id),
        user_id: session.user.id,
        access_token: session.access_token.clone(),
        next_ref: 0,
        backoff_ms: INITIAL_BACKOFF_MS,
        on_change: Box::new(on_change),
    };
    leptos::task::spawn_local(channel.run(rx));
    RealtimeHandle { control: tx }
}

#[cfg(feature = "hydrate")]
mod imp {
    use futures::channel::mpsc::UnboundedReceiver;
    use futures::future::{self, Either};
    use futures::{SinkExt, StreamExt, stream};
    use gloo_net::websocket::futures::WebSocket;
    use gloo_net::websocket::{Message, WebSocketError};
    use gloo_timers::future::{IntervalStream, sleep};

    use domain::realtime::{
        RealtimeSignal, access_token_message, classify, heartbeat_message, join_message, leave_message,
    };
    use domain::{ChangeEvent, PhoenixMessage};
    use uuid::Uuid;

    use super::{ChannelControl, INITIAL_BACKOFF_MS, heartbeat_ms, next_backoff_ms};

    enum SocketEnd {
        Left,
        Disconnected(String),
    }

    enum Input {
        Frame(Result<Message, WebSocketError>),
        Closed,
        Control(ChannelControl),
        Tick,
    }

    pub(super) struct PostsChannel {
        pub url: String,
        pub topic: String,
        pub user_id: Uuid,
        pub access_token: String,
        pub next_ref: u64,
        pub backoff_ms: u32,
        pub on_change: Box<dyn Fn(ChangeEvent)>,
    }

    impl PostsChannel {
        pub async fn run(mut self, mut control: UnboundedReceiver<ChannelControl>) {
            let mut resumed = false;
            loop {
                match self.connect_and_run(&mut control, resumed).await {
                    Ok(SocketEnd::Left) => return,
                    Ok(SocketEnd::Disconnected(reason)) => {
                        leptos::logging::warn!("realtime disconnected: {reason}");
                    }
                    Err(e) => leptos::logging::warn!("realtime error: {e}"),
                }
                resumed = true;

                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                let jitter = (js_sys::Math::random() * f64::from(self.backoff_ms / 4)) as u32;
                match future::select(sleep(std::time::Duration::from_millis(u64::from(self.backoff_ms + jitter))), control.next()).await {
                    Either::Left(_) => {}
                    Either::Right((Some(ChannelControl::AccessToken(token)), _)) => self.access_token = token,
                    Either::Right((Some(ChannelControl::Leave) | None, _)) => return,
                }
                self.backoff_ms = next_backoff_ms(self.backoff_ms);
            }
        }

        async fn connect_and_run(
            &mut self,
            control: &mut UnboundedReceiver<ChannelControl>,
            resumed: bool,
        ) -> Result<SocketEnd, String> {
            let socket = WebSocket::open(&self.url).map_err(|e| e.to_string())?;
            let (mut write, read) = socket.split();

            let join_ref = self.take_ref();
            let join = join_message(&self.topic, &self.user_id, &self.access_token, join_ref);
            write.send(Message::Text(join.to_text())).await.map_err(|e| e.to_string())?;
            let join_ref = join_ref.to_string();

            let frames = read.map(Input::Frame).chain(stream::once(async { Input::Closed }));
            let controls = control
                .by_ref()
                .map(Input::Control)
                .chain(stream::once(async { Input::Control(ChannelControl::Leave) }));
            let ticks = IntervalStream::new(heartbeat_ms()).map(|()| Input::Tick);
            let mut inputs = stream::select(frames, stream::select(controls, ticks));

            while let Some(input) = inputs.next().await {
                let outbound = match input {
                    Input::Tick => heartbeat_message(self.take_ref()),
                    Input::Control(ChannelControl::AccessToken(token)) => {
                        let message = access_token_message(&self.topic, &token, self.take_ref());
                        self.access_token = token;
                        message
                    }
                    Input::Control(ChannelControl::Leave) => {
                        let leave = leave_message(&self.topic, self.take_ref());
                        let _ = write.send(Message::Text(leave.to_text())).await;
                        let _ = write.close().await;
                        return Ok(SocketEnd::Left);
                    }
                    Input::Closed => return Ok(SocketEnd::Disconnected("socket closed".to_owned())),
                    Input::Frame(Err(e)) => return Err(e.to_string()),
                    Input::Frame(Ok(Message::Bytes(_))) => continue,
                    Input::Frame(Ok(Message::Text(text))) => {
                        let Ok(message) = PhoenixMessage::from_text(&text) else {
                            continue;
                        };
                        match classify(&message, &self.topic, &join_ref) {
                            RealtimeSignal::Change(change) => (self.on_change)(change),
                            RealtimeSignal::Joined => {
                                self.backoff_ms = INITIAL_BACKOFF_MS;
                                if resumed {
                                    (self.on_change)(ChangeEvent::Unrecognized("resubscribed".to_owned()));
                                }
                            }
                            RealtimeSignal::JoinRejected(reason) | RealtimeSignal::Closed(reason) => {
                                return Ok(SocketEnd::Disconnected(reason));
                            }
                            RealtimeSignal::Ignored => {}
                        }
                        continue;
                    }
                };
                write.send(Message::Text(outbound.to_text())).await.map_err(|e| e.to_string())?;
            }
            Ok(SocketEnd::Disconnected("socket closed".to_owned()))
        }

        fn take_ref(&mut self) -> u64 {
            self.next_ref += 1;
            self.next_ref
        }
    }
}
