//! Slashbot Gateway - the authenticated local HTTP front end.
//!
//! Routes:
//! - `GET /health` — unauthenticated, the kernel's health payload.
//! - `POST /rpc` — bearer-authenticated dispatch into the gateway method
//!   registry. Dispatched calls always answer 200; the inner
//!   `{ok, result | error}` envelope carries the outcome.
//! - Any `(method, path)` registered through the HTTP route registry,
//!   authenticated unless the route opts out.
//!
//! Unrecognized paths answer 404 after route resolution; `/rpc` itself
//! answers 401 before reading the body when the bearer token is missing
//! or wrong.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

mod auth;
mod server;

pub use server::{Gateway, RpcRequest, RpcResponse};
