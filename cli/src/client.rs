//! Depth server websocket client.
//!
//! DESIGN
//! ======
//! One connection, one outstanding request. Every wait is bounded by a
//! timeout and nothing is retried: a timeout or refused connection is
//! reported to the caller as-is so the CLI can exit non-zero.
//!
//! Request/response calls (`ping`, `get_frame`) treat anything but the
//! expected reply as a failure. `stream` is more forgiving: stray or
//! malformed messages are counted in the summary and the loop carries on.

use std::time::{Duration, Instant};

use frames::{FrameData, Message};
use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::{self, Message as TungMessage};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

pub type WsStream = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("connection refused at {url}: is the depth server running?")]
    ConnectionRefused { url: String },
    #[error("websocket connect failed: {0}")]
    WsConnect(Box<tungstenite::Error>),
    #[error("websocket closed")]
    WsClosed,
    #[error("timed out after {} ms waiting for {waiting_for}", after.as_millis())]
    Timeout { waiting_for: &'static str, after: Duration },
    #[error("message decode failed: {0}")]
    Decode(#[from] frames::CodecError),
    #[error("server error: {0}")]
    Server(String),
    #[error("expected {expected}, got {actual}")]
    Unexpected { expected: &'static str, actual: String },
}

/// Wait limits for each kind of exchange.
#[derive(Debug, Clone, Copy)]
pub struct Timeouts {
    pub connect: Duration,
    pub ping: Duration,
    pub frame: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            connect: Duration::from_secs(3),
            ping: Duration::from_secs(5),
            frame: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Clone)]
pub struct StreamOptions {
    /// Stop after this many frames.
    pub frames: usize,
    /// Stop after this long, even if fewer frames arrived.
    pub duration: Duration,
    /// Longest acceptable gap between two stream messages.
    pub frame_timeout: Duration,
    pub fps: Option<u32>,
    pub include_topography: bool,
}

impl Default for StreamOptions {
    fn default() -> Self {
        Self {
            frames: 5,
            duration: Duration::from_secs(5),
            frame_timeout: Duration::from_secs(1),
            fps: None,
            include_topography: false,
        }
    }
}

/// What happened during one `stream` run.
#[derive(Debug, Clone, Default)]
pub struct StreamSummary {
    pub acknowledged: bool,
    pub frames_received: usize,
    pub last_frame_id: Option<u64>,
    pub elapsed: Duration,
    /// Kinds of any non-frame messages seen while streaming.
    pub unexpected: Vec<String>,
    pub malformed: usize,
    /// Frames that arrived after `stop_stream` was sent.
    pub drained: usize,
    pub stopped: bool,
}

impl StreamSummary {
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn fps(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 { self.frames_received as f64 / secs } else { 0.0 }
    }

    /// Nothing but frames arrived while streaming.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.unexpected.is_empty() && self.malformed == 0
    }
}

pub struct DepthClient {
    stream: WsStream,
    timeouts: Timeouts,
}

impl DepthClient {
    /// Open a websocket to the depth server.
    ///
    /// # Errors
    ///
    /// `ConnectionRefused` when nothing listens at `url`, `Timeout` when the
    /// handshake exceeds the connect timeout, `WsConnect` otherwise.
    pub async fn connect(url: &str, timeouts: Timeouts) -> Result<Self, ClientError> {
        let handshake = tokio::time::timeout(timeouts.connect, connect_async(url))
            .await
            .map_err(|_| ClientError::Timeout { waiting_for: "connection", after: timeouts.connect })?;
        match handshake {
            Ok((stream, _)) => Ok(Self { stream, timeouts }),
            Err(e) if is_refused(&e) => Err(ClientError::ConnectionRefused { url: url.to_owned() }),
            Err(e) => Err(ClientError::WsConnect(Box::new(e))),
        }
    }

    /// Round-trip a `ping`.
    ///
    /// # Errors
    ///
    /// Fails on timeout, a closed socket, or any reply other than `pong`.
    pub async fn ping(&mut self) -> Result<Duration, ClientError> {
        let started = Instant::now();
        self.send(&Message::Ping).await?;
        match self.recv(self.timeouts.ping, "pong").await? {
            Message::Pong { .. } => Ok(started.elapsed()),
            other => Err(unexpected("pong", other)),
        }
    }

    /// Request a single frame.
    ///
    /// # Errors
    ///
    /// An `error` reply becomes `ClientError::Server`; other replies, timeouts,
    /// and closed sockets fail as usual.
    pub async fn get_frame(&mut self, include_topography: bool) -> Result<FrameData, ClientError> {
        self.send(&Message::GetFrame { include_topography }).await?;
        match self.recv(self.timeouts.frame, "frame_data").await? {
            Message::FrameData(frame) => Ok(frame),
            other => Err(unexpected("frame_data", other)),
        }
    }

    /// Stream frames until the frame target or duration is reached, then stop
    /// the stream and drain anything still in flight.
    ///
    /// # Errors
    ///
    /// Fails when no message arrives within the per-frame timeout or the
    /// socket closes. Stray and malformed messages are only counted.
    pub async fn stream(&mut self, options: &StreamOptions) -> Result<StreamSummary, ClientError> {
        let mut summary = StreamSummary::default();
        let started = Instant::now();
        self.send(&Message::StartStream { include_topography: options.include_topography, fps: options.fps })
            .await?;

        while summary.frames_received < options.frames && started.elapsed() < options.duration {
            let text = self.next_text(options.frame_timeout, "frame_data").await?;
            match frames::decode_message(&text) {
                Ok(Message::FrameData(frame)) => {
                    summary.frames_received += 1;
                    summary.last_frame_id = Some(frame.frame_id);
                }
                Ok(Message::StreamStarted { .. }) if !summary.acknowledged => summary.acknowledged = true,
                Ok(other) => summary.unexpected.push(other.kind().to_owned()),
                Err(_) => summary.malformed += 1,
            }
        }
        summary.elapsed = started.elapsed();

        self.send(&Message::StopStream).await?;
        loop {
            let text = match self.next_text(options.frame_timeout, "stream_stopped").await {
                Ok(text) => text,
                Err(ClientError::Timeout { .. }) => break,
                Err(e) => return Err(e),
            };
            match frames::decode_message(&text) {
                Ok(Message::StreamStopped { .. }) => {
                    summary.stopped = true;
                    break;
                }
                Ok(Message::FrameData(_)) => summary.drained += 1,
                Ok(other) => summary.unexpected.push(other.kind().to_owned()),
                Err(_) => summary.malformed += 1,
            }
        }
        Ok(summary)
    }

    /// Send a close frame. Errors are ignored; the server may already be gone.
    pub async fn close(mut self) {
        let _ = self.stream.close(None).await;
    }

    async fn send(&mut self, message: &Message) -> Result<(), ClientError> {
        self.stream
            .send(TungMessage::text(frames::encode_message(message)))
            .await
            .map_err(|e| ClientError::WsConnect(Box::new(e)))
    }

    /// Next decoded message. Server `error` replies surface as `ClientError::Server`.
    async fn recv(&mut self, timeout: Duration, waiting_for: &'static str) -> Result<Message, ClientError> {
        let text = self.next_text(timeout, waiting_for).await?;
        match frames::decode_message(&text)? {
            Message::Error { message } => Err(ClientError::Server(message)),
            message => Ok(message),
        }
    }

    /// Next text frame, skipping pings and other control traffic.
    async fn next_text(&mut self, timeout: Duration, waiting_for: &'static str) -> Result<String, ClientError> {
        let fut = async {
            loop {
                let Some(message) = self.stream.next().await else {
                    return Err(ClientError::WsClosed);
                };
                match message.map_err(|e| ClientError::WsConnect(Box::new(e)))? {
                    TungMessage::Text(text) => return Ok(text.as_str().to_owned()),
                    TungMessage::Close(_) => return Err(ClientError::WsClosed),
                    _ => {}
                }
            }
        };
        tokio::time::timeout(timeout, fut)
            .await
            .map_err(|_| ClientError::Timeout { waiting_for, after: timeout })?
    }
}

fn unexpected(expected: &'static str, got: Message) -> ClientError {
    ClientError::Unexpected { expected, actual: got.kind().to_owned() }
}

fn is_refused(error: &tungstenite::Error) -> bool {
    matches!(error, tungstenite::Error::Io(io) if io.kind() == std::io::ErrorKind::ConnectionRefused)
}

#[cfg(test)]
pub mod test_helpers {
    //! Scripted single-connection websocket server for client tests.

    use std::future::Future;

    use frames::{DepthData, FrameData, Message, RgbData};
    use futures_util::{SinkExt, StreamExt};
    use tokio::net::{TcpListener, TcpStream};
    use tokio_tungstenite::tungstenite::Message as TungMessage;
    use tokio_tungstenite::{WebSocketStream, accept_async};

    pub type ServerWs = WebSocketStream<TcpStream>;

    /// Accept one connection on a random port and run `script` against it.
    pub async fn spawn_mock<F, Fut>(script: F) -> String
    where
        F: FnOnce(ServerWs) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");
        tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.expect("accept");
            let ws = accept_async(tcp).await.expect("handshake");
            script(ws).await;
        });
        format!("ws://{addr}")
    }

    pub async fn read_msg(ws: &mut ServerWs) -> Message {
        loop {
            let next = ws.next().await.expect("client message").expect("ws error");
            if let TungMessage::Text(text) = next {
                return frames::decode_message(text.as_str()).expect("valid message");
            }
        }
    }

    pub async fn write(ws: &mut ServerWs, message: &Message) {
        write_raw(ws, &frames::encode_message(message)).await;
    }

    pub async fn write_raw(ws: &mut ServerWs, text: &str) {
        ws.send(TungMessage::text(text)).await.expect("server send");
    }

    pub fn frame(frame_id: u64) -> Message {
        Message::FrameData(FrameData {
            timestamp: frames::now_secs(),
            frame_id,
            depth_data: Some(DepthData { width: 4, height: 3, min_depth: 900.0, max_depth: 1200.0, mean_depth: 1100.0 }),
            rgb_data: Some(RgbData { width: 4, height: 3 }),
            mesh_data: None,
            topography: None,
            interaction: None,
        })
    }
}

#[cfg(test)]
#[path = "client_test.rs"]
mod tests;
