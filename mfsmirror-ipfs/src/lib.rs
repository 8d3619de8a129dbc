//! # mfsmirror-ipfs
//!
//! Blocking client for the IPFS RPC API (`/api/v0`), implementing
//! [`mfsmirror_core::MfsApi`] over `add` and the `files/*` commands.

mod client;
mod multipart;
mod response;

pub use client::IpfsClient;
