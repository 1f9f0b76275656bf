//! Companion chat engine with mood-aware replies and optional speech.
//!
//! Hearth keeps a single running conversation with an affectionate companion
//! persona. Each user message is sent, with recent history and the user's
//! preferences, to a hosted generative-language API; the reply is classified
//! into a [`mood::Mood`] for presentation and can be voiced through a
//! text-to-speech call. Every remote failure degrades to a canned reply.
//!
//! | Mood | Triggered by (first match wins) |
//! |------|---------------------------------|
//! | **Flirty** | love, kiss, babe, desire, ... |
//! | **Happy** | haha, great, fun, smile, ... |
//! | **Sad** | sorry, hurt, miss, lonely, ... |
//! | **Surprised** | wow, oh, really, wait, ... |
//! | **Neutral** | anything else |
//!
//! # Modules
//!
//! - [`config`]: Configuration loading from TOML files and environment variables
//! - [`conversation`]: Transcript turns, write-through store, and erasure
//! - [`settings`]: User preferences and their store
//! - [`storage`]: Keyed JSON blob persistence
//! - [`mood`]: Ordered keyword mood classifier
//! - [`prompt`]: System instruction and completion request assembly
//! - [`remote`]: Completion and speech service traits, Gemini client
//! - [`audio`]: PCM16 speech decoding and playback sinks
//! - [`orchestrator`]: Single-flight send / erase state machine

pub mod audio;
pub mod config;
pub mod conversation;
pub mod mood;
pub mod orchestrator;
pub mod prompt;
pub mod remote;
pub mod settings;
pub mod storage;
