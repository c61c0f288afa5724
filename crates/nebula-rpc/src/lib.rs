//! # nebula-rpc
//!
//! Wire protocol and command dispatch for NebulaLink.
//!
//! - [`types`]: inbound [`Command`] decoding and the outbound
//!   [`ResponseEnvelope`]
//! - [`errors`]: the six-kind error taxonomy
//! - [`params`]: typed, range-checked payload access
//! - [`action`]: the static table of supported actions
//! - [`registry`] / [`handlers`]: one handler per action, validated at startup
//! - [`router`]: [`CommandRouter::dispatch`], which never fails and never panics

#![deny(unsafe_code)]

pub mod action;
pub mod context;
pub mod errors;
pub mod gate;
pub mod handlers;
pub mod params;
pub mod registry;
pub mod router;
pub mod types;

pub use action::Action;
pub use context::RpcContext;
pub use errors::{RegistryError, RpcError};
pub use params::Payload;
pub use registry::{ActionHandler, ActionRegistry};
pub use router::CommandRouter;
pub use types::{Command, ErrorKind, ResponseEnvelope, SuccessBody};
