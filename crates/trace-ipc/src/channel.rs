//! # Framed Channels
//!
//! A channel is one direction of a connected `UnixStream` pair. Both ends are
//! plain file descriptors, so they survive `fork()` and can be handed to a
//! child process as ordinary values.
//!
//! ## Wire Format
//!
//! ```text
//! ┌──────────────┬──────────────────────────┐
//! │ len: u32 BE  │ body: len bytes of JSON  │
//! └──────────────┴──────────────────────────┘
//! ```
//!
//! Receives are bounded: a receive that sees no complete frame before its
//! timeout returns `Ok(None)`. Partially read frames are kept and completed by
//! the next receive. A length prefix above [`MAX_FRAME_LEN`] leaves the
//! stream without a frame boundary; the receiving end is unusable after it.
//!
//! Writes block while the peer is not reading. [`ChannelSender::close`]
//! fails a blocked write from another thread.

use std::io::{self, Read, Write};
use std::net::Shutdown;
use std::os::fd::{AsRawFd, RawFd};
use std::os::unix::net::UnixStream;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

/// Largest accepted frame body.
pub const MAX_FRAME_LEN: usize = 64 * 1024 * 1024;

const LEN_PREFIX: usize = 4;
const READ_CHUNK: usize = 64 * 1024;

/// Transport failures.
#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("channel I/O error: {0}")]
    Io(#[from] io::Error),

    /// Every writer of the channel has gone away.
    #[error("channel closed")]
    Closed,

    #[error("frame of {len} bytes exceeds maximum of {max} bytes")]
    FrameTooLarge { len: usize, max: usize },

    #[error("failed to encode message: {0}")]
    Encode(serde_json::Error),

    /// A complete frame arrived but its body was not the expected message.
    /// The frame has been consumed.
    #[error("failed to decode message: {0}")]
    Decode(serde_json::Error),
}

/// Create a connected channel.
pub fn channel() -> Result<(ChannelSender, ChannelReceiver), ChannelError> {
    let (tx, rx) = UnixStream::pair()?;
    tx.shutdown(Shutdown::Read)?;
    rx.shutdown(Shutdown::Write)?;
    let control = tx.try_clone()?;
    let tx_fd = tx.as_raw_fd();
    let rx_fd = rx.as_raw_fd();
    Ok((
        ChannelSender {
            stream: Mutex::new(tx),
            control,
            fd: tx_fd,
        },
        ChannelReceiver {
            inner: Mutex::new(RxState {
                stream: rx,
                buf: Vec::new(),
            }),
            fd: rx_fd,
        },
    ))
}

// =============================================================================
// SENDING HALF
// =============================================================================

/// Writing end. Frames from concurrent senders never interleave.
#[derive(Debug)]
pub struct ChannelSender {
    stream: Mutex<UnixStream>,
    /// Second handle on the same socket, usable while `stream` is locked.
    control: UnixStream,
    fd: RawFd,
}

impl ChannelSender {
    pub fn send<T: Serialize>(&self, msg: &T) -> Result<(), ChannelError> {
        let body = serde_json::to_vec(msg).map_err(ChannelError::Encode)?;
        if body.len() > MAX_FRAME_LEN {
            return Err(ChannelError::FrameTooLarge {
                len: body.len(),
                max: MAX_FRAME_LEN,
            });
        }
        // Bounded by MAX_FRAME_LEN above.
        let len = body.len() as u32;

        let mut stream = self.stream.lock();
        let result = stream
            .write_all(&len.to_be_bytes())
            .and_then(|()| stream.write_all(&body))
            .and_then(|()| stream.flush());
        match result {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::BrokenPipe => Err(ChannelError::Closed),
            Err(e) => Err(ChannelError::Io(e)),
        }
    }

    /// Shut the channel down for writing. A send blocked in another thread
    /// fails with `Closed`, as does every later send.
    pub fn close(&self) -> io::Result<()> {
        match self.control.shutdown(Shutdown::Write) {
            Err(e) if e.kind() != io::ErrorKind::NotConnected => Err(e),
            _ => Ok(()),
        }
    }

    /// File descriptors backing this end.
    pub fn fds(&self) -> Vec<RawFd> {
        vec![self.fd, self.control.as_raw_fd()]
    }

    #[cfg(test)]
    pub(crate) fn send_raw(&self, bytes: &[u8]) -> io::Result<()> {
        self.stream.lock().write_all(bytes)
    }
}

// =============================================================================
// RECEIVING HALF
// =============================================================================

#[derive(Debug)]
struct RxState {
    stream: UnixStream,
    /// Bytes read but not yet returned as a frame.
    buf: Vec<u8>,
}

impl RxState {
    fn take_frame(&mut self) -> Result<Option<Vec<u8>>, ChannelError> {
        if self.buf.len() < LEN_PREFIX {
            return Ok(None);
        }
        let mut prefix = [0u8; LEN_PREFIX];
        prefix.copy_from_slice(&self.buf[..LEN_PREFIX]);
        let len = u32::from_be_bytes(prefix) as usize;
        if len > MAX_FRAME_LEN {
            return Err(ChannelError::FrameTooLarge {
                len,
                max: MAX_FRAME_LEN,
            });
        }
        if self.buf.len() < LEN_PREFIX + len {
            return Ok(None);
        }
        let frame = self.buf[LEN_PREFIX..LEN_PREFIX + len].to_vec();
        self.buf.drain(..LEN_PREFIX + len);
        Ok(Some(frame))
    }
}

/// Reading end. One receive runs at a time.
#[derive(Debug)]
pub struct ChannelReceiver {
    inner: Mutex<RxState>,
    fd: RawFd,
}

impl ChannelReceiver {
    /// File descriptors backing this end.
    pub fn fds(&self) -> Vec<RawFd> {
        vec![self.fd]
    }

    /// Receive one message, waiting at most `timeout`.
    pub fn recv_timeout<T: DeserializeOwned>(
        &self,
        timeout: Duration,
    ) -> Result<Option<T>, ChannelError> {
        let deadline = Instant::now() + timeout;
        let mut inner = self.inner.lock();
        let mut chunk = vec![0u8; READ_CHUNK];
        loop {
            if let Some(frame) = inner.take_frame()? {
                return serde_json::from_slice(&frame)
                    .map(Some)
                    .map_err(ChannelError::Decode);
            }

            let now = Instant::now();
            if now >= deadline {
                return Ok(None);
            }
            inner.stream.set_read_timeout(Some(deadline - now))?;
            match inner.stream.read(&mut chunk) {
                Ok(0) => return Err(ChannelError::Closed),
                Ok(n) => inner.buf.extend_from_slice(&chunk[..n]),
                Err(e)
                    if matches!(
                        e.kind(),
                        io::ErrorKind::WouldBlock
                            | io::ErrorKind::TimedOut
                            | io::ErrorKind::Interrupted
                    ) => {}
                Err(e) => return Err(ChannelError::Io(e)),
            }
        }
    }
}
