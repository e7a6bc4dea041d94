//! # Retouch
//!
//! An image-editing backend: take an encoded image, apply a named operation
//! with optional parameters, return the encoded result.
//!
//! # Architecture: One Dispatch Pipeline
//!
//! Every edit passes through the same fixed sequence of stages:
//!
//! ```text
//! bytes ─decode→ ImageBuffer ─resolve→ Capability ─decode params→ Plan
//!       ─apply steps→ ImageBuffer ─normalize to BGR→ ─encode→ bytes
//! ```
//!
//! Each stage has exactly one failure kind, so a caller can always tell a bad
//! upload (400) from a broken transform (500).
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`pipeline`] | Stage orchestration, error kinds and status codes, blank layers |
//! | [`imaging`] | Buffers, codec, parameter decoding, color transforms, registry, plugins |
//! | [`batch`] | Filesystem open / save / export with content-addressed file names |
//! | [`config`] | `retouch.toml` loading, validation and merging |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Explicit Registry
//!
//! Operations are looked up in a [`imaging::CapabilityRegistry`] built once
//! at startup. Reserved names (`adjustments`, `auto_color`,
//! `background_removal`) never contain a dot; everything else is a
//! `category.function` pair registered by its plugin module. Adding an
//! operation means adding one `register` call, never a reflective lookup.
//!
//! ## Parameters Are Typed at the Boundary
//!
//! The caller's JSON blob is decoded into the operation's own parameter struct
//! before any pixel is touched. Unknown keys and mistyped values are rejected
//! there as `InvalidParameters`.
//!
//! ## Black-Box Providers
//!
//! Background removal, super-resolution and auto color sit behind traits in
//! [`imaging::providers`]. The shipped implementations are model-free and
//! pure Rust; a model-backed provider plugs in without touching dispatch.
//!
//! ## No Shared Mutable State
//!
//! The registry and codec are immutable after startup and borrowed by each
//! pipeline run, so the CLI can fan inputs out across a `rayon` pool.

pub mod batch;
pub mod config;
pub mod imaging;
pub mod output;
pub mod pipeline;

#[cfg(test)]
pub(crate) mod test_helpers;
