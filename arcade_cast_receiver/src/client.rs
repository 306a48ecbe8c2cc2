// TCP client for the controller side of the channel.
//
// Gives a controller (or a test) a non-blocking way to talk to a running
// receiver:
// - `connect()` opens the TCP stream and spawns a background reader thread.
//   No handshake is needed; the receiver assigns the sender ID itself.
// - The reader thread decodes framed `ServerMessage`s into an `mpsc` inbox.
// - The caller holds a `BufWriter<TcpStream>` and sends commands on its own
//   thread; `poll()` drains the inbox without blocking.
//
// Lives in the receiver crate so the integration tests can drive the real
// gateway with real framing.

use std::io::{BufReader, BufWriter};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::sync::mpsc::{self, Receiver};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use arcade_cast_protocol::framing::{read_frame, write_frame};
use arcade_cast_protocol::{ClientMessage, ServerMessage};
use serde::Serialize;
use serde_json::Value;

use crate::error::ClientError;

pub struct ControllerClient {
    writer: BufWriter<TcpStream>,
    inbox: Receiver<ServerMessage>,
    _reader_thread: Option<JoinHandle<()>>,
}

impl ControllerClient {
    pub fn connect<A: ToSocketAddrs>(addr: A) -> Result<Self, ClientError> {
        let stream = TcpStream::connect(addr).map_err(ClientError::Connect)?;
        stream.set_nodelay(true).ok();
        let reader_stream = stream.try_clone().map_err(ClientError::Connect)?;

        let (tx, rx) = mpsc::channel();
        let reader_thread = thread::spawn(move || {
            reader_loop(BufReader::new(reader_stream), tx);
        });

        Ok(Self {
            writer: BufWriter::new(stream),
            inbox: rx,
            _reader_thread: Some(reader_thread),
        })
    }

    pub fn join(&mut self, name: &str) -> Result<(), ClientError> {
        self.send(&ClientMessage::Join { name: name.into() })
    }

    pub fn leave(&mut self) -> Result<(), ClientError> {
        self.send(&ClientMessage::Leave)
    }

    pub fn move_direction(&mut self, direct: &str) -> Result<(), ClientError> {
        self.send(&ClientMessage::Move {
            direct: direct.into(),
        })
    }

    /// Send an arbitrary JSON payload, e.g. a command the receiver doesn't
    /// know.
    pub fn send_payload(&mut self, payload: &Value) -> Result<(), ClientError> {
        self.send(payload)
    }

    fn send<T: Serialize>(&mut self, msg: &T) -> Result<(), ClientError> {
        let json = serde_json::to_vec(msg)?;
        write_frame(&mut self.writer, &json).map_err(ClientError::Send)
    }

    /// Drain all queued receiver messages (non-blocking).
    pub fn poll(&self) -> Vec<ServerMessage> {
        self.inbox.try_iter().collect()
    }

    /// Wait up to `timeout` for the next receiver message.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<ServerMessage> {
        self.inbox.recv_timeout(timeout).ok()
    }

    /// Close the connection. The receiver sees this as a disconnect.
    pub fn disconnect(self) {
        let _ = self.writer.get_ref().shutdown(Shutdown::Both);
    }
}

/// Reader thread: decode frames in a loop and push them to the inbox.
fn reader_loop(mut reader: BufReader<TcpStream>, tx: mpsc::Sender<ServerMessage>) {
    while let Ok(bytes) = read_frame(&mut reader) {
        match serde_json::from_slice::<ServerMessage>(&bytes) {
            Ok(msg) => {
                if tx.send(msg).is_err() {
                    break; // Client dropped
                }
            }
            Err(_) => break,
        }
    }
}
