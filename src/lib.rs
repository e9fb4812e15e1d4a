//! # Doc Distill
//!
//! A resilient documentation acquisition-and-summarization service.
//!
//! Given a URL, Doc Distill scrapes the page through an upstream provider
//! whose request and response contracts are unreliable, falls back to a
//! direct fetch when the provider is out of reach, extracts the text,
//! summarizes it through a tiered summarizer (remote inference with a
//! coherence gate, then a deterministic local renderer), and persists the
//! result to SQLite alongside a Markdown artifact on disk.
//!
//! ## Pipeline
//!
//! ```text
//! submit ──> resolve ──> extract ──> summarize ──> persist
//!    │           │
//!    └───────────┴──(provider unreachable / poll timeout)──> direct fetch
//! ```
//!
//! Jobs move `queued -> processing -> completed | failed`; terminal states
//! are absorbing. The summarizer cannot fail (its local tier is total), so
//! once extraction yields text the job is guaranteed to complete unless
//! persistence itself breaks.
//!
//! ## Modules
//!
//! - [`acquire`] — provider client: request-shape negotiation and polling
//! - [`fetch`] — direct-fetch fallback with HTML-to-text reduction
//! - [`extract`] — payload-shape search and text flattening
//! - [`summarize`] — tiered summarization with the coherence gate
//! - [`pipeline`] — the job lifecycle controller
//! - [`store`] — SQLite job and summary persistence
//! - [`artifact`] — Markdown artifact rendering and writing
//! - [`server`] — the JSON HTTP API

pub mod acquire;
pub mod artifact;
pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod migrate;
pub mod models;
pub mod pipeline;
pub mod server;
pub mod store;
pub mod summarize;
