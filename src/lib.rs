//! `Medalkeeper` - a Discord bot running a per-guild virtual economy
//!
//! This crate provides a persistent, server-scoped economy ("Medals") with
//! work/crime/rob activities, gambling mini-games, and a prison/injury status
//! system, backed by atomic per-guild JSON documents.

// Deny the most critical lints that could lead to bugs or security issues
#![deny(
    // Security and correctness
    unsafe_code,
    unsafe_op_in_unsafe_fn,

    // Code quality - things that are almost always bugs
    unreachable_code,
    unreachable_patterns,
    unused_must_use,

    // Documentation - broken links are bugs
    rustdoc::broken_intra_doc_links,
    rustdoc::private_intra_doc_links,
)]
// Warn on things that should be fixed but aren't necessarily bugs
#![warn(
    missing_docs,

    // Clippy categories for overall code quality
    clippy::all,
    clippy::pedantic,

    // Correctness
    clippy::clone_on_ref_ptr,
    clippy::dbg_macro,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::unwrap_used,

    // Future compatibility
    future_incompatible,
    rust_2018_idioms,
)]
// Allow some pedantic lints that are too noisy or not applicable
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::cast_sign_loss,
)]

/// Work, crime, rob, and roulette resolvers
pub mod activities;
/// Discord interface - commands, framework wiring, and bot context
pub mod bot;
/// Application config and admin-mutable bot settings
pub mod config;
/// Unified error types and result handling
pub mod errors;
/// Multi-turn game coordinators and the session registry
pub mod games;
/// Account CRUD and every balance/cooldown/prison mutation
pub mod ledger;
/// Data model for guild economy documents
pub mod models;
/// Guild-scoped command category allow-list
pub mod permissions;
/// Flavor-text catalog
pub mod responses;
/// Injury tiers and the modifiers they impose
pub mod status;
/// File-backed persistence with TTL caching and per-guild locks
pub mod store;

#[cfg(test)]
pub mod test_utils;
