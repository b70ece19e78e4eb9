//! Language server for SystemVerilog.
//!
//! Ties the front end, the cross-reference index, and the alignment
//! formatter to a JSON-RPC transport: go-to-definition, references,
//! rename, whole-document formatting, and the `diplomat-server.*`
//! custom methods (black boxes, hierarchy, index dump).
//!
//! # Architecture
//!
//! - [`protocol`] - JSON-RPC message types and error codes
//! - [`transport`] - Content-Length framing, inbox/outbox threads
//! - [`server`] - the [`DiplomatLsp`](server::DiplomatLsp) worker
//! - [`settings`] - `workspace/configuration` payload
//! - [`blackbox`] / [`hierarchy`] - leaf features over the front end
//!
//! Tests drive the server over in-memory streams; the binary wires it
//! to stdio or a TCP socket.

pub mod blackbox;
pub mod hierarchy;
pub mod protocol;
pub mod server;
pub mod settings;
pub mod transport;
pub mod uri;

pub use protocol::{JsonRpcError, JsonRpcMessage, JsonRpcResponse};
pub use server::DiplomatLsp;
pub use transport::RpcTransport;
