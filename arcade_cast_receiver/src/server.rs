// TCP channel gateway and the receiver's event loop.
//
// Architecture: thread-per-reader with a central `mpsc` channel.
//
// - **Listener thread**: non-blocking `accept()` loop that sends
//   `InternalEvent::NewConnection` to the main thread.
// - **Reader threads** (one per sender): read frames, parse each as a JSON
//   value, and send `InternalEvent::MessageFrom`. On EOF, a bad frame, or
//   invalid JSON they send `InternalEvent::Disconnected` and exit.
// - **Main thread**: owns the `Session<TcpGateway>` and handles one event at
//   a time. It is the only writer to sender streams. Game-side calls from
//   `ReceiverHandle` (`game_ready`, `end_game`) go through the same queue,
//   so they are ordered with controller traffic.
//
// Writes carry a timeout. A sender whose write fails or times out (for
// example one that never reads) has its stream shut down; its reader thread
// then reports the disconnect through the normal path.
//
// The loop ends when `stop()` clears `keep_running`, when a disconnect
// leaves no senders connected, or when the listener gives up after repeated
// accept failures. On exit every remaining stream is shut down so blocked
// reader threads wake up and exit.

use std::collections::BTreeMap;
use std::io::{self, BufReader, BufWriter};
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;

use arcade_cast_protocol::framing::{read_frame, write_frame};
use arcade_cast_protocol::{SenderId, ServerMessage};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::ReceiverConfig;
use crate::dispatch::dispatch;
use crate::engine::Engine;
use crate::gateway::ChannelGateway;
use crate::session::Session;

/// How long the main loop waits for an event before re-checking
/// `keep_running`.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Write timeout used by `TcpGateway::new`.
pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(2);

/// Consecutive accept errors after which the listener gives up.
const MAX_ACCEPT_FAILURES: u32 = 20;

/// Events sent to the main thread.
enum InternalEvent {
    NewConnection { stream: TcpStream },
    MessageFrom { sender: SenderId, payload: Value },
    Disconnected { sender: SenderId },
    GameReady,
    EndGame { end_state: Value },
    ListenerFailed,
}

/// Why the event loop exited.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShutdownReason {
    /// The last connected sender went away.
    AllSendersLeft,
    /// `ReceiverHandle::stop` was called.
    Stopped,
    /// The listener kept failing to accept connections.
    ListenerFailed,
}

/// Handle returned by `start_receiver` to drive and stop the running loop.
pub struct ReceiverHandle {
    keep_running: Arc<AtomicBool>,
    events: Sender<InternalEvent>,
    connected: Arc<AtomicUsize>,
    thread: Option<thread::JoinHandle<ShutdownReason>>,
}

impl ReceiverHandle {
    /// Tell every connected controller the game is ready.
    pub fn game_ready(&self) {
        let _ = self.events.send(InternalEvent::GameReady);
    }

    /// End the play-through: free both slots and broadcast `end_state`.
    pub fn end_game(&self, end_state: Value) {
        let _ = self.events.send(InternalEvent::EndGame { end_state });
    }

    /// Senders the loop has registered and not yet seen disconnect.
    pub fn connected_senders(&self) -> usize {
        self.connected.load(Ordering::SeqCst)
    }

    pub fn is_finished(&self) -> bool {
        self.thread.as_ref().is_none_or(|t| t.is_finished())
    }

    /// Block until the loop exits on its own. `None` if it panicked.
    pub fn wait(mut self) -> Option<ShutdownReason> {
        self.thread.take().and_then(|t| t.join().ok())
    }

    /// Signal the loop to stop and wait for it.
    pub fn stop(self) -> Option<ShutdownReason> {
        self.keep_running.store(false, Ordering::SeqCst);
        self.wait()
    }
}

/// Write half of one sender's connection.
struct Outbound {
    writer: BufWriter<TcpStream>,
    /// Set once a write failed and the stream was shut down. The sender stays
    /// registered until its reader thread reports the disconnect.
    closed: bool,
}

impl Outbound {
    fn deliver(&mut self, sender: &SenderId, message: &ServerMessage) {
        if self.closed {
            return;
        }
        if let Err(e) = send_message(&mut self.writer, message) {
            warn!(%sender, error = %e, "send failed; closing connection");
            self.closed = true;
            if let Err(e) = self.writer.get_ref().shutdown(Shutdown::Both) {
                debug!(%sender, error = %e, "shutdown failed");
            }
        }
    }
}

/// Gateway over framed TCP connections. Holds the write half of each
/// sender's stream; the read half belongs to that sender's reader thread.
pub struct TcpGateway {
    senders: BTreeMap<SenderId, Outbound>,
    next_sender: u64,
    write_timeout: Duration,
}

impl Default for TcpGateway {
    fn default() -> Self {
        Self::with_write_timeout(DEFAULT_WRITE_TIMEOUT)
    }
}

impl TcpGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// A zero timeout is raised to one millisecond.
    pub fn with_write_timeout(write_timeout: Duration) -> Self {
        Self {
            senders: BTreeMap::new(),
            next_sender: 0,
            write_timeout: write_timeout.max(Duration::from_millis(1)),
        }
    }

    /// Start tracking a connection and assign it a fresh sender ID.
    pub fn register(&mut self, stream: TcpStream) -> SenderId {
        let sender = SenderId(format!("sender-{}", self.next_sender));
        self.next_sender += 1;
        if let Err(e) = stream.set_write_timeout(Some(self.write_timeout)) {
            warn!(%sender, error = %e, "could not set write timeout");
        }
        self.senders.insert(
            sender.clone(),
            Outbound {
                writer: BufWriter::new(stream),
                closed: false,
            },
        );
        sender
    }

    /// Stop tracking a connection. Returns false if it was already gone.
    pub fn unregister(&mut self, sender: &SenderId) -> bool {
        self.senders.remove(sender).is_some()
    }

    /// True once a write to `sender` failed and its stream was shut down.
    pub fn is_closed(&self, sender: &SenderId) -> bool {
        self.senders.get(sender).is_some_and(|out| out.closed)
    }

    /// Shut down every tracked stream.
    pub fn close_all(&mut self) {
        for (sender, out) in std::mem::take(&mut self.senders) {
            if out.closed {
                continue;
            }
            if let Err(e) = out.writer.get_ref().shutdown(Shutdown::Both) {
                debug!(%sender, error = %e, "shutdown failed");
            }
        }
    }
}

impl ChannelGateway for TcpGateway {
    fn send(&mut self, sender: &SenderId, message: &ServerMessage) {
        if let Some(out) = self.senders.get_mut(sender) {
            out.deliver(sender, message);
        }
    }

    fn broadcast(&mut self, message: &ServerMessage) {
        for (sender, out) in &mut self.senders {
            out.deliver(sender, message);
        }
    }

    fn sender_count(&self) -> usize {
        self.senders.len()
    }
}

/// Serialize a `ServerMessage` to JSON and write it as one frame.
fn send_message(
    writer: &mut BufWriter<TcpStream>,
    msg: &ServerMessage,
) -> Result<(), Box<dyn std::error::Error>> {
    let json = serde_json::to_vec(msg)?;
    write_frame(writer, &json)?;
    Ok(())
}

/// Bind the listener and start the event loop on a background thread.
/// Returns the handle and the bound address (useful with port 0).
pub fn start_receiver(
    config: &ReceiverConfig,
    engine: Engine,
) -> io::Result<(ReceiverHandle, SocketAddr)> {
    let listener = TcpListener::bind((config.bind.as_str(), config.port))?;
    let addr = listener.local_addr()?;
    let gateway = TcpGateway::with_write_timeout(Duration::from_millis(config.write_timeout_ms));
    let session = Session::new(gateway, engine).with_end_game_on_leave(config.end_game_on_leave);

    let keep_running = Arc::new(AtomicBool::new(true));
    let connected = Arc::new(AtomicUsize::new(0));
    let (tx, rx) = mpsc::channel();

    let thread = {
        let keep_running = keep_running.clone();
        let connected = connected.clone();
        let tx = tx.clone();
        thread::spawn(move || run_receiver(listener, session, rx, tx, keep_running, connected))
    };

    Ok((
        ReceiverHandle {
            keep_running,
            events: tx,
            connected,
            thread: Some(thread),
        },
        addr,
    ))
}

/// Main loop. Runs until stopped or until the last sender disconnects.
fn run_receiver(
    listener: TcpListener,
    mut session: Session<TcpGateway>,
    rx: Receiver<InternalEvent>,
    tx: Sender<InternalEvent>,
    keep_running: Arc<AtomicBool>,
    connected: Arc<AtomicUsize>,
) -> ShutdownReason {
    // Non-blocking so the accept thread can notice `keep_running` going false.
    listener.set_nonblocking(true).ok();

    let keep_running_listener = keep_running.clone();
    let tx_listener = tx.clone();
    thread::spawn(move || accept_loop(listener, tx_listener, keep_running_listener));

    let mut reason = ShutdownReason::Stopped;
    while keep_running.load(Ordering::SeqCst) {
        match rx.recv_timeout(POLL_INTERVAL) {
            Ok(event) => {
                let exit = handle_event(&mut session, event, &tx, &keep_running);
                connected.store(session.gateway().sender_count(), Ordering::SeqCst);
                if let Some(exit) = exit {
                    reason = exit;
                    break;
                }
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {}
            Err(mpsc::RecvTimeoutError::Disconnected) => break,
        }
    }

    keep_running.store(false, Ordering::SeqCst);
    session.gateway_mut().close_all();
    connected.store(0, Ordering::SeqCst);
    info!(?reason, "receiver loop exited");
    reason
}

/// Counts consecutive accept errors. Transient errors (fd exhaustion, aborted
/// handshakes) are retried; a listener that keeps failing is given up on.
#[derive(Debug, Default)]
struct AcceptFailures {
    consecutive: u32,
}

impl AcceptFailures {
    /// Record one failure. Returns true when the listener should give up.
    fn record(&mut self) -> bool {
        self.consecutive += 1;
        self.consecutive >= MAX_ACCEPT_FAILURES
    }

    fn reset(&mut self) {
        self.consecutive = 0;
    }
}

/// Listener thread: accept connections and hand them to the main loop.
fn accept_loop(listener: TcpListener, tx: Sender<InternalEvent>, keep_running: Arc<AtomicBool>) {
    let mut failures = AcceptFailures::default();
    while keep_running.load(Ordering::SeqCst) {
        match listener.accept() {
            Ok((stream, peer)) => {
                failures.reset();
                debug!(%peer, "accepted connection");
                stream.set_nonblocking(false).ok();
                let _ = tx.send(InternalEvent::NewConnection { stream });
            }
            Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => {
                thread::sleep(POLL_INTERVAL);
            }
            Err(e) => {
                if failures.record() {
                    warn!(error = %e, "listener failed repeatedly; giving up");
                    let _ = tx.send(InternalEvent::ListenerFailed);
                    return;
                }
                warn!(error = %e, "accept failed; retrying");
                thread::sleep(POLL_INTERVAL);
            }
        }
    }
}

/// Apply one event to the session. Returns a reason when the loop should end.
fn handle_event(
    session: &mut Session<TcpGateway>,
    event: InternalEvent,
    tx: &Sender<InternalEvent>,
    keep_running: &Arc<AtomicBool>,
) -> Option<ShutdownReason> {
    match event {
        InternalEvent::NewConnection { stream } => {
            handle_new_connection(session, stream, tx, keep_running);
        }
        InternalEvent::MessageFrom { sender, payload } => {
            dispatch(session, &sender, &payload);
        }
        InternalEvent::Disconnected { sender } => {
            if !session.gateway_mut().unregister(&sender) {
                return None;
            }
            session.sender_disconnected(&sender);
            let remaining = session.gateway().sender_count();
            info!(%sender, senders = remaining, "sender disconnected");
            if remaining == 0 {
                info!("all senders disconnected; shutting down");
                return Some(ShutdownReason::AllSendersLeft);
            }
        }
        InternalEvent::GameReady => session.broadcast_game_ready(),
        InternalEvent::EndGame { end_state } => session.broadcast_end_game(end_state),
        InternalEvent::ListenerFailed => return Some(ShutdownReason::ListenerFailed),
    }
    None
}

/// Register the write half with the gateway and spawn a reader thread for
/// the read half. There is no handshake: the first frame may be a command.
fn handle_new_connection(
    session: &mut Session<TcpGateway>,
    stream: TcpStream,
    tx: &Sender<InternalEvent>,
    keep_running: &Arc<AtomicBool>,
) {
    let write_half = match stream.try_clone() {
        Ok(s) => s,
        Err(e) => {
            warn!(error = %e, "could not clone connection; dropping it");
            return;
        }
    };
    stream.set_nodelay(true).ok();

    let sender = session.gateway_mut().register(write_half);
    info!(
        %sender,
        senders = session.gateway().sender_count(),
        "sender connected"
    );

    let tx_reader = tx.clone();
    let keep_running_reader = keep_running.clone();
    thread::spawn(move || {
        reader_loop(
            BufReader::new(stream),
            sender,
            tx_reader,
            keep_running_reader,
        );
    });
}

/// Reader loop for one sender. Runs in its own thread.
fn reader_loop(
    mut reader: BufReader<TcpStream>,
    sender: SenderId,
    tx: Sender<InternalEvent>,
    keep_running: Arc<AtomicBool>,
) {
    while keep_running.load(Ordering::SeqCst) {
        let bytes = match read_frame(&mut reader) {
            Ok(bytes) => bytes,
            Err(e) => {
                debug!(%sender, error = %e, "connection closed");
                break;
            }
        };
        let payload = match serde_json::from_slice::<Value>(&bytes) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(%sender, error = %e, "payload is not JSON; disconnecting");
                break;
            }
        };
        let message = InternalEvent::MessageFrom {
            sender: sender.clone(),
            payload,
        };
        if tx.send(message).is_err() {
            // Main loop is gone.
            return;
        }
    }
    let _ = tx.send(InternalEvent::Disconnected { sender });
}
