//! Domain layer containing chat types and history rules.
//!
//! # Module Organization
//!
//! - `chat` - Messages, wire envelope, identifiers and room history

pub mod chat;
