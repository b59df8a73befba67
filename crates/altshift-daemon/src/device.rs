//! Raw input event source
//!
//! Events are read as native `struct input_event` records, either from an
//! event device file such as `/dev/input/event3` or from stdin (a device
//! piped through `cat`, or a recorded event log). The device is not grabbed,
//! so other consumers keep seeing every key.

use std::mem::size_of;

use altshift_config::InputSource;
use evdev::{EventType, InputEvent};
use nix::libc;
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::error::DaemonError;

/// Size of one kernel `input_event` record on this platform
pub const EVENT_SIZE: usize = size_of::<libc::input_event>();

/// Boxed reader for whichever input source was configured
pub type InputStream = Box<dyn AsyncRead + Unpin + Send>;

/// Open the configured input source.
pub async fn open_input(source: &InputSource) -> Result<InputStream, DaemonError> {
    match source {
        InputSource::Stdin => Ok(Box::new(tokio::io::stdin())),
        InputSource::Path(path) => {
            let file = tokio::fs::File::open(path)
                .await
                .map_err(|source| DaemonError::OpenInput {
                    path: path.clone(),
                    source,
                })?;
            Ok(Box::new(file))
        }
    }
}

/// Decodes a byte stream into [`InputEvent`]s.
pub struct EventReader<R> {
    reader: R,
    buf: [u8; EVENT_SIZE],
}

impl<R: AsyncRead + Unpin> EventReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: [0; EVENT_SIZE],
        }
    }

    /// Read the next event with a single read.
    ///
    /// A read that does not return exactly one record is fatal, whether it
    /// is end of input or a short read. Partial records are never joined.
    pub async fn next_event(&mut self) -> Result<InputEvent, DaemonError> {
        let n = self
            .reader
            .read(&mut self.buf)
            .await
            .map_err(|source| DaemonError::ReadEvent {
                expected: EVENT_SIZE,
                source,
            })?;

        if n != EVENT_SIZE {
            return Err(DaemonError::ReadEvent {
                expected: EVENT_SIZE,
                source: std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    format!("short read of {} bytes", n),
                ),
            });
        }

        Ok(decode_event(&self.buf))
    }
}

/// Decode one record. The timestamp occupies everything before the
/// trailing `type: u16, code: u16, value: i32` fields.
fn decode_event(buf: &[u8; EVENT_SIZE]) -> InputEvent {
    let tail = EVENT_SIZE - 8;
    let type_ = u16::from_ne_bytes([buf[tail], buf[tail + 1]]);
    let code = u16::from_ne_bytes([buf[tail + 2], buf[tail + 3]]);
    let value = i32::from_ne_bytes([buf[tail + 4], buf[tail + 5], buf[tail + 6], buf[tail + 7]]);

    InputEvent::new(EventType(type_), code, value)
}

/// Encode an event the way the kernel would, with a zero timestamp.
#[cfg(test)]
pub fn encode_event(type_: EventType, code: u16, value: i32) -> [u8; EVENT_SIZE] {
    let mut buf = [0u8; EVENT_SIZE];
    let tail = EVENT_SIZE - 8;
    buf[tail..tail + 2].copy_from_slice(&type_.0.to_ne_bytes());
    buf[tail + 2..tail + 4].copy_from_slice(&code.to_ne_bytes());
    buf[tail + 4..].copy_from_slice(&value.to_ne_bytes());
    buf
}
