//! # Trace IPC
//!
//! Lets code in an isolated process use the trace server that lives in the
//! trusted parent, without the server ever leaving the parent.
//!
//! ## Architecture
//!
//! ```text
//!   child process                          parent process
//!  ┌───────────────┐   request channel   ┌──────────────────────────────┐
//!  │ Sender        │ ──────────────────→ │ Receiver worker thread       │
//!  │ (TraceServer) │                     │   └→ IdentityEnforcingServer │
//!  │               │ ←────────────────── │        └→ real TraceServer   │
//!  └───────────────┘   response channel  └──────────────────────────────┘
//! ```
//!
//! - `protocol` - wire envelopes, the closed `RpcMethod` set and sentinels
//! - `channel` - length-prefixed JSON frames over a Unix socket pair
//! - `identity` - tenant enforcement and id translation around the backend
//! - `receiver` - the parent-side worker loop
//! - `sender` - the child-side proxy with response correlation
//!
//! ## Failure Model
//!
//! Backend and protocol errors are answered with an error response for the
//! originating correlation id. The worker loop itself only exits on a stop
//! request, the stop flag, or a closed request channel.

pub mod channel;
pub mod config;
pub mod identity;
pub mod protocol;
pub mod receiver;
pub mod sender;


pub use channel::{channel, ChannelError, ChannelReceiver, ChannelSender};
pub use config::IpcConfig;
pub use identity::{
    IdConverter, IdentityContext, IdentityEnforcingServer, PassthroughIdConverter,
    PlaceholderEntityIdConverter,
};
pub use protocol::{RpcMethod, RpcRequest, RpcResponse, STOP_METHOD, STREAM_END};
pub use receiver::{ChannelHandles, Receiver};
pub use sender::Sender;
