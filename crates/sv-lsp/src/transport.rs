//! Content-Length framed transport with inbox/outbox worker threads.
//!
//! One thread reads frames from the peer into an inbox queue, one drains
//! an outbox to the peer; the LSP worker thread blocks on the inbox
//! condvar. Malformed frames are logged and skipped; the transport stays
//! open until EOF or an explicit abort (client process exit).

use crate::protocol::JsonRpcMessage;
use parking_lot::{Condvar, Mutex};
use serde_json::Value;
use std::collections::VecDeque;
use std::io::{self, BufRead, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

/// Reads one framed message. `Ok(None)` covers both EOF and a malformed
/// frame (recoverable); `Err` is a transport-level I/O failure.
pub fn read_message<R: BufRead>(reader: &mut R) -> io::Result<Option<JsonRpcMessage>> {
    let mut content_length: Option<usize> = None;

    loop {
        let mut line = String::new();
        if reader.read_line(&mut line)? == 0 {
            return Ok(None); // EOF
        }
        let line = line.trim_end();
        if line.is_empty() {
            break;
        }
        if let Some((key, value)) = line.split_once(": ") {
            if key.eq_ignore_ascii_case("Content-Length") {
                content_length = value.parse().ok();
            }
        }
    }

    let Some(length) = content_length else {
        tracing::warn!("frame without Content-Length header, discarded");
        return Ok(None);
    };

    let mut content = vec![0u8; length];
    let mut read = 0usize;
    while read < length {
        let n = reader.read(&mut content[read..])?;
        if n == 0 {
            return Ok(None); // EOF mid-frame
        }
        read += n;
    }

    match serde_json::from_slice(&content) {
        Ok(message) => Ok(Some(message)),
        Err(err) => {
            tracing::warn!(error = %err, "malformed frame, discarded");
            Ok(None)
        }
    }
}

/// Writes one framed message.
pub fn write_message<W: Write>(writer: &mut W, payload: &Value) -> io::Result<()> {
    let content = payload.to_string();
    write!(
        writer,
        "Content-Length: {}\r\nContent-Type: application/vscode-jsonrpc; charset=utf-8\r\n\r\n{}",
        content.len(),
        content
    )?;
    writer.flush()
}

struct Queue<T> {
    items: Mutex<VecDeque<T>>,
    available: Condvar,
}

impl<T> Queue<T> {
    fn new() -> Self {
        Self { items: Mutex::new(VecDeque::new()), available: Condvar::new() }
    }

    fn push(&self, item: T) {
        self.items.lock().push_back(item);
        self.available.notify_all();
    }

    fn notify(&self) {
        self.available.notify_all();
    }
}

/// The pipe transport: queues plus the two worker threads.
pub struct RpcTransport {
    inbox: Arc<Queue<JsonRpcMessage>>,
    outbox: Arc<Queue<Value>>,
    aborted: Arc<AtomicBool>,
    closed: Arc<AtomicBool>,
    inbox_thread: Option<JoinHandle<()>>,
    outbox_thread: Option<JoinHandle<()>>,
}

impl RpcTransport {
    pub fn new<R, W>(mut reader: R, mut writer: W) -> Self
    where
        R: BufRead + Send + 'static,
        W: Write + Send + 'static,
    {
        let inbox = Arc::new(Queue::new());
        let outbox = Arc::new(Queue::<Value>::new());
        let aborted = Arc::new(AtomicBool::new(false));
        let closed = Arc::new(AtomicBool::new(false));

        let inbox_thread = {
            let inbox = inbox.clone();
            let aborted = aborted.clone();
            let closed = closed.clone();
            std::thread::spawn(move || {
                while !aborted.load(Ordering::Relaxed) {
                    match read_message(&mut reader) {
                        Ok(Some(message)) => inbox.push(message),
                        Ok(None) => {
                            // Malformed frames recover; EOF does not. A
                            // fresh read distinguishes them poorly, so
                            // probe the stream state via fill_buf.
                            match reader.fill_buf() {
                                Ok(buf) if buf.is_empty() => break,
                                Ok(_) => continue,
                                Err(_) => break,
                            }
                        }
                        Err(err) => {
                            tracing::error!(error = %err, "transport read failed");
                            break;
                        }
                    }
                }
                closed.store(true, Ordering::Relaxed);
                inbox.notify();
            })
        };

        let outbox_thread = {
            let outbox = outbox.clone();
            let aborted = aborted.clone();
            std::thread::spawn(move || loop {
                let next = {
                    let mut items = outbox.items.lock();
                    loop {
                        if let Some(item) = items.pop_front() {
                            break Some(item);
                        }
                        if aborted.load(Ordering::Relaxed) {
                            break None;
                        }
                        // Short polling period so aborts are noticed.
                        let _ = outbox
                            .available
                            .wait_for(&mut items, Duration::from_millis(50));
                    }
                };
                match next {
                    Some(payload) => {
                        if let Err(err) = write_message(&mut writer, &payload) {
                            tracing::error!(error = %err, "transport write failed");
                            return;
                        }
                    }
                    None => return,
                }
            })
        };

        Self {
            inbox,
            outbox,
            aborted,
            closed,
            inbox_thread: Some(inbox_thread),
            outbox_thread: Some(outbox_thread),
        }
    }

    /// Queues an outgoing payload.
    pub fn send(&self, payload: Value) {
        self.outbox.push(payload);
    }

    /// Blocks for the next incoming message; `None` once the transport
    /// is closed or aborted and the inbox is drained.
    pub fn receive(&self) -> Option<JsonRpcMessage> {
        let mut items = self.inbox.items.lock();
        loop {
            if let Some(message) = items.pop_front() {
                return Some(message);
            }
            if self.aborted.load(Ordering::Relaxed) || self.closed.load(Ordering::Relaxed) {
                return None;
            }
            let _ = self
                .inbox
                .available
                .wait_for(&mut items, Duration::from_millis(100));
        }
    }

    /// Requests an orderly stop of both worker threads.
    pub fn abort(&self) {
        self.aborted.store(true, Ordering::Relaxed);
        self.inbox.notify();
        self.outbox.notify();
    }

    pub fn is_closed(&self) -> bool {
        self.aborted.load(Ordering::Relaxed) || self.closed.load(Ordering::Relaxed)
    }
}

impl Drop for RpcTransport {
    fn drop(&mut self) {
        self.abort();
        if let Some(handle) = self.outbox_thread.take() {
            let _ = handle.join();
        }
        // The inbox thread may be parked in a blocking read; joining it
        // would hang on a quiet pipe, so it is left to exit with the
        // process once the stream closes.
        if let Some(handle) = self.inbox_thread.take() {
            if self.closed.load(Ordering::Relaxed) {
                let _ = handle.join();
            }
        }
    }
}
