//! # Client Channels
//!
//! The seam between the gate and whatever transport the host server uses.
//!
//! The gate never touches sockets. A session encodes clientbound packets
//! into complete frames and hands them to a [`ClientChannel`]; the host
//! decides how they reach the peer. Inbound bytes travel the other way
//! through [`crate::Session::feed`].

use std::io::Write;

use crossbeam_channel::{unbounded, Receiver, Sender};

/// Outbound half of one client connection.
pub trait ClientChannel: Send {
    /// Queues one length-prefixed frame.
    fn write_frame(&mut self, frame: &[u8]);

    /// Pushes queued frames to the peer.
    fn flush(&mut self) {}

    /// Closes the connection after flushing.
    fn close(&mut self);

    /// Whether the peer is still reachable.
    fn is_active(&self) -> bool;
}

impl<C: ClientChannel + ?Sized> ClientChannel for Box<C> {
    fn write_frame(&mut self, frame: &[u8]) {
        (**self).write_frame(frame);
    }

    fn flush(&mut self) {
        (**self).flush();
    }

    fn close(&mut self) {
        (**self).close();
    }

    fn is_active(&self) -> bool {
        (**self).is_active()
    }
}

/// Channel over any blocking writer, e.g. a `TcpStream`.
///
/// The first I/O error deactivates the channel; later writes are ignored.
#[derive(Debug)]
pub struct WireChannel<W: Write + Send> {
    writer: W,
    active: bool,
}

impl<W: Write + Send> WireChannel<W> {
    /// Wraps `writer`.
    pub const fn new(writer: W) -> Self {
        Self { writer, active: true }
    }

    /// Returns the writer.
    pub fn into_inner(self) -> W {
        self.writer
    }

    fn check(&mut self, result: std::io::Result<()>) {
        if let Err(error) = result {
            tracing::debug!("client channel write failed: {}", error);
            self.active = false;
        }
    }
}

impl<W: Write + Send> ClientChannel for WireChannel<W> {
    fn write_frame(&mut self, frame: &[u8]) {
        if self.active {
            let result = self.writer.write_all(frame);
            self.check(result);
        }
    }

    fn flush(&mut self) {
        if self.active {
            let result = self.writer.flush();
            self.check(result);
        }
    }

    fn close(&mut self) {
        self.flush();
        self.active = false;
    }

    fn is_active(&self) -> bool {
        self.active
    }
}

/// In-process channel delivering frames to a crossbeam receiver.
///
/// Used by embedders that run their own writer task and by tests.
#[derive(Debug)]
pub struct LoopbackChannel {
    frames: Sender<Vec<u8>>,
    active: bool,
}

impl LoopbackChannel {
    /// Creates a channel and the receiver that sees its frames.
    #[must_use]
    pub fn pair() -> (Self, Receiver<Vec<u8>>) {
        let (frames, receiver) = unbounded();
        (Self { frames, active: true }, receiver)
    }
}

impl ClientChannel for LoopbackChannel {
    fn write_frame(&mut self, frame: &[u8]) {
        if self.active && self.frames.send(frame.to_vec()).is_err() {
            self.active = false;
        }
    }

    fn close(&mut self) {
        self.active = false;
    }

    fn is_active(&self) -> bool {
        self.active
    }
}
