//! Live update channel
//!
//! Keeps one WebSocket open to the backend's push endpoint and turns its
//! frames into [`ChannelEvent`]s. The decisions (when to connect, when to
//! schedule a reconnect, when to close) live in [`ChannelCore`], a plain
//! state machine that only returns [`ChannelAction`]s. [`LiveChannel`] runs
//! that machine inside a single tokio task which owns the socket and the
//! reconnect timer, so neither can outlive the session.

use crate::store::Message;
use crate::{Error, Result};
use futures::StreamExt;
use serde::Deserialize;
use std::future::{pending, Future};
use std::pin::Pin;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Sleep;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

/// WebSocket close code sent when the owner stops the channel
pub const NORMAL_CLOSURE: u16 = 1000;

/// Connectivity of the live channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// No socket open
    #[default]
    Disconnected,
    /// Connect attempt in progress
    Connecting,
    /// Socket open and receiving
    Connected,
}

impl ConnectionState {
    /// Whether the channel is online
    pub fn is_online(&self) -> bool {
        matches!(self, Self::Connected)
    }
}

/// Event delivered to the owner of the channel
#[derive(Debug, Clone)]
pub enum ChannelEvent {
    /// The connection state changed
    Connectivity(ConnectionState),
    /// A message was appended to a conversation
    MessageAppended {
        /// Conversation the message belongs to
        client_id: String,
        /// The new message
        message: Message,
    },
}

/// Inbound frame as sent by the backend
///
/// Two protocol versions use different tags for the same event.
#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum InboundFrame {
    #[serde(rename = "chatUpdated", alias = "new_message")]
    MessageAppended {
        #[serde(rename = "clientId")]
        client_id: String,
        message: Message,
    },
    #[serde(other)]
    Unknown,
}

/// Decode one text frame
///
/// Returns `Ok(None)` for well-formed frames of a type this channel does not
/// react to, and `Error::Channel` for anything malformed.
pub fn decode_frame(text: &str) -> Result<Option<ChannelEvent>> {
    let frame: InboundFrame = serde_json::from_str(text)
        .map_err(|e| Error::Channel(format!("Malformed frame: {}", e)))?;

    Ok(match frame {
        InboundFrame::MessageAppended { client_id, message } => {
            Some(ChannelEvent::MessageAppended { client_id, message })
        }
        InboundFrame::Unknown => None,
    })
}

/// Input to the channel state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelInput {
    /// Owner asked for a connection
    Start,
    /// Owner asked to disconnect
    Stop,
    /// Connect attempt succeeded
    Opened,
    /// Connect attempt failed
    ConnectFailed,
    /// Socket closed; `code` is `None` when the stream just ended
    Closed {
        /// Close code sent by the peer
        code: Option<u16>,
    },
    /// Reconnect delay elapsed
    ReconnectDue,
}

/// Side effect requested by the state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelAction {
    /// Open a new socket
    Connect,
    /// Drop any connect attempt and close the open socket with a normal closure code
    CloseGracefully,
    /// Arm the reconnect timer
    ScheduleReconnect(Duration),
    /// Disarm the reconnect timer
    CancelReconnect,
    /// Tell the owner about a state change
    Notify(ConnectionState),
}

/// Connection lifecycle decisions, free of any I/O
///
/// Invariants: at most one connect attempt or socket at a time, and at most
/// one reconnect timer armed at a time.
#[derive(Debug, Clone)]
pub struct ChannelCore {
    state: ConnectionState,
    reconnect_pending: bool,
    wanted: bool,
    reconnect_delay: Duration,
}

impl ChannelCore {
    /// Create a disconnected machine with the given reconnect delay
    pub fn new(reconnect_delay: Duration) -> Self {
        Self {
            state: ConnectionState::Disconnected,
            reconnect_pending: false,
            wanted: false,
            reconnect_delay,
        }
    }

    /// Current connection state
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Whether a reconnect timer is armed
    pub fn reconnect_pending(&self) -> bool {
        self.reconnect_pending
    }

    /// Advance the machine and return the side effects to perform, in order
    pub fn handle(&mut self, input: ChannelInput) -> Vec<ChannelAction> {
        let mut actions = Vec::new();

        match input {
            ChannelInput::Start => {
                if matches!(self.state, ConnectionState::Connecting | ConnectionState::Connected) {
                    return actions;
                }
                self.wanted = true;
                self.cancel_reconnect(&mut actions);
                self.begin_connect(&mut actions);
            }
            ChannelInput::Stop => {
                self.wanted = false;
                self.cancel_reconnect(&mut actions);
                if self.state != ConnectionState::Disconnected {
                    actions.push(ChannelAction::CloseGracefully);
                    self.transition(ConnectionState::Disconnected, &mut actions);
                }
            }
            ChannelInput::Opened => {
                if !self.wanted {
                    actions.push(ChannelAction::CloseGracefully);
                    self.transition(ConnectionState::Disconnected, &mut actions);
                    return actions;
                }
                self.cancel_reconnect(&mut actions);
                self.transition(ConnectionState::Connected, &mut actions);
            }
            ChannelInput::ConnectFailed => {
                self.on_lost(None, &mut actions);
            }
            ChannelInput::Closed { code } => {
                self.on_lost(code, &mut actions);
            }
            ChannelInput::ReconnectDue => {
                self.reconnect_pending = false;
                if self.wanted && self.state == ConnectionState::Disconnected {
                    self.begin_connect(&mut actions);
                }
            }
        }

        actions
    }

    fn on_lost(&mut self, code: Option<u16>, actions: &mut Vec<ChannelAction>) {
        if self.state != ConnectionState::Disconnected {
            self.transition(ConnectionState::Disconnected, actions);
        }

        if !self.wanted || self.reconnect_pending {
            return;
        }

        debug!("Live channel lost (code={:?}), scheduling reconnect", code);

        self.reconnect_pending = true;
        actions.push(ChannelAction::ScheduleReconnect(self.reconnect_delay));
    }

    fn begin_connect(&mut self, actions: &mut Vec<ChannelAction>) {
        self.transition(ConnectionState::Connecting, actions);
        actions.push(ChannelAction::Connect);
    }

    fn cancel_reconnect(&mut self, actions: &mut Vec<ChannelAction>) {
        if self.reconnect_pending {
            self.reconnect_pending = false;
            actions.push(ChannelAction::CancelReconnect);
        }
    }

    fn transition(&mut self, next: ConnectionState, actions: &mut Vec<ChannelAction>) {
        if self.state != next {
            self.state = next;
            actions.push(ChannelAction::Notify(next));
        }
    }
}

/// Settings of a live channel
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    /// WebSocket URL to connect to
    pub url: String,
    /// Fixed delay before reconnecting after an unexpected close
    pub reconnect_delay: Duration,
    /// Upper bound for one connect attempt
    pub connect_timeout: Duration,
}

impl From<&crate::config::Settings> for ChannelConfig {
    fn from(settings: &crate::config::Settings) -> Self {
        Self {
            url: settings.live_channel_url.clone(),
            reconnect_delay: settings.reconnect_delay(),
            connect_timeout: settings.connect_timeout(),
        }
    }
}

#[derive(Debug)]
enum Command {
    Start,
    Stop,
    Shutdown,
}

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

type PendingConnect = Pin<Box<dyn Future<Output = Result<Socket>> + Send>>;

/// Handle to the live channel task
///
/// Dropping the handle shuts the task down, which closes the socket and
/// disarms any reconnect timer.
#[derive(Debug)]
pub struct LiveChannel {
    commands: mpsc::UnboundedSender<Command>,
    state: watch::Receiver<ConnectionState>,
    task: Option<JoinHandle<()>>,
}

impl LiveChannel {
    /// Spawn the channel task; it stays disconnected until [`start`](Self::start)
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(config: ChannelConfig, events: mpsc::UnboundedSender<ChannelEvent>) -> Self {
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(ConnectionState::Disconnected);

        let worker = ChannelWorker {
            core: ChannelCore::new(config.reconnect_delay),
            config,
            commands: commands_rx,
            events,
            state: state_tx,
            socket: None,
            connecting: None,
            reconnect_timer: None,
        };
        let task = tokio::spawn(worker.run());

        Self {
            commands: commands_tx,
            state: state_rx,
            task: Some(task),
        }
    }

    /// Begin connecting; no-op while connecting or connected
    pub fn start(&self) {
        let _ = self.commands.send(Command::Start);
    }

    /// Disconnect gracefully without scheduling a reconnect
    pub fn stop(&self) {
        let _ = self.commands.send(Command::Stop);
    }

    /// Current connection state
    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Stop and wait for the channel task to finish
    pub async fn shutdown(mut self) {
        let _ = self.commands.send(Command::Shutdown);
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for LiveChannel {
    fn drop(&mut self) {
        let _ = self.commands.send(Command::Shutdown);
    }
}

struct ChannelWorker {
    core: ChannelCore,
    config: ChannelConfig,
    commands: mpsc::UnboundedReceiver<Command>,
    events: mpsc::UnboundedSender<ChannelEvent>,
    state: watch::Sender<ConnectionState>,
    socket: Option<Socket>,
    connecting: Option<PendingConnect>,
    reconnect_timer: Option<Pin<Box<Sleep>>>,
}

impl ChannelWorker {
    async fn run(mut self) {
        debug!("Live channel task started for {}", self.config.url);

        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(Command::Start) => self.dispatch(ChannelInput::Start).await,
                    Some(Command::Stop) => self.dispatch(ChannelInput::Stop).await,
                    Some(Command::Shutdown) | None => {
                        self.dispatch(ChannelInput::Stop).await;
                        break;
                    }
                },
                result = connect_finished(&mut self.connecting) => {
                    self.connecting = None;
                    self.on_connect_result(result).await;
                }
                frame = next_frame(&mut self.socket) => self.on_frame(frame).await,
                _ = timer_elapsed(&mut self.reconnect_timer) => {
                    self.reconnect_timer = None;
                    self.dispatch(ChannelInput::ReconnectDue).await;
                }
            }
        }

        debug!("Live channel task finished");
    }

    async fn dispatch(&mut self, input: ChannelInput) {
        for action in self.core.handle(input) {
            self.perform(action).await;
        }
    }

    async fn perform(&mut self, action: ChannelAction) {
        match action {
            ChannelAction::Connect => self.begin_connect(),
            ChannelAction::CloseGracefully => self.close_gracefully().await,
            ChannelAction::ScheduleReconnect(delay) => {
                info!("Reconnecting live channel in {}ms", delay.as_millis());
                self.reconnect_timer = Some(Box::pin(tokio::time::sleep(delay)));
            }
            ChannelAction::CancelReconnect => {
                self.reconnect_timer = None;
            }
            ChannelAction::Notify(state) => {
                let _ = self.state.send(state);
                let _ = self.events.send(ChannelEvent::Connectivity(state));
            }
        }
    }

    /// Arm a connect attempt; the run loop polls it next to commands
    fn begin_connect(&mut self) {
        info!("Connecting live channel to {}", self.config.url);

        let url = self.config.url.clone();
        let limit = self.config.connect_timeout;
        self.connecting = Some(Box::pin(async move {
            match tokio::time::timeout(limit, connect_async(url.as_str())).await {
                Ok(Ok((socket, _response))) => Ok(socket),
                Ok(Err(e)) => Err(Error::Channel(format!("Connect failed: {}", e))),
                Err(_) => Err(Error::Channel("Connect timed out".to_string())),
            }
        }));
    }

    async fn on_connect_result(&mut self, result: Result<Socket>) {
        let input = match result {
            Ok(socket) => {
                info!("Live channel connected");
                self.socket = Some(socket);
                ChannelInput::Opened
            }
            Err(e) => {
                warn!("{}", e);
                ChannelInput::ConnectFailed
            }
        };
        self.dispatch(input).await;
    }

    async fn close_gracefully(&mut self) {
        if self.connecting.take().is_some() {
            info!("Abandoned live channel connect attempt");
        }
        if let Some(mut socket) = self.socket.take() {
            let frame = CloseFrame {
                code: CloseCode::from(NORMAL_CLOSURE),
                reason: "client stop".into(),
            };
            if let Err(e) = socket.close(Some(frame)).await {
                debug!("Error while closing live channel: {}", e);
            }
            info!("Live channel closed");
        }
    }

    async fn on_frame(
        &mut self,
        frame: Option<std::result::Result<WsMessage, tokio_tungstenite::tungstenite::Error>>,
    ) {
        match frame {
            Some(Ok(WsMessage::Text(text))) => self.on_text(&text),
            Some(Ok(WsMessage::Binary(bytes))) => match String::from_utf8(bytes) {
                Ok(text) => self.on_text(&text),
                Err(_) => warn!("{}", Error::Channel("Dropping non UTF-8 binary frame".to_string())),
            },
            Some(Ok(WsMessage::Close(frame))) => {
                let code = frame.map(|f| u16::from(f.code));
                info!("Live channel closed by peer (code={:?})", code);
                self.socket = None;
                self.dispatch(ChannelInput::Closed { code }).await;
            }
            Some(Ok(_)) => {}
            Some(Err(e)) => {
                warn!("{}", Error::Channel(format!("Read failed: {}", e)));
                self.socket = None;
                self.dispatch(ChannelInput::Closed { code: None }).await;
            }
            None => {
                warn!("Live channel stream ended without close frame");
                self.socket = None;
                self.dispatch(ChannelInput::Closed { code: None }).await;
            }
        }
    }

    fn on_text(&self, text: &str) {
        match decode_frame(text) {
            Ok(Some(event)) => {
                let _ = self.events.send(event);
            }
            Ok(None) => debug!("Ignoring unrecognized frame"),
            Err(e) => warn!("{}", e),
        }
    }
}

async fn next_frame(
    socket: &mut Option<Socket>,
) -> Option<std::result::Result<WsMessage, tokio_tungstenite::tungstenite::Error>> {
    match socket {
        Some(socket) => socket.next().await,
        None => pending().await,
    }
}

async fn connect_finished(attempt: &mut Option<PendingConnect>) -> Result<Socket> {
    match attempt {
        Some(connect) => connect.as_mut().await,
        None => pending().await,
    }
}

async fn timer_elapsed(timer: &mut Option<Pin<Box<Sleep>>>) {
    match timer {
        Some(sleep) => sleep.as_mut().await,
        None => pending().await,
    }
}
