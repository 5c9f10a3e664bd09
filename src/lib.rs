//! dexpoll - Dexcom Share polling client
//!
//! A stateful client for the Dexcom Share cloud API, built for smart-mirror
//! dashboard widgets: it caches the account and session credentials across
//! polls, degrades gracefully when either is rejected, and wraps each fetch in
//! bounded retry-with-backoff plus an independent watchdog so a hung network
//! call never stalls the polling loop.
//!
//! Rendering is someone else's job: the library emits normalized readings (or
//! structured errors) over a channel, and the bundled binary prints them as
//! JSON lines.

#![forbid(unsafe_code)]
#![warn(clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod cli;
pub mod core;
pub mod error;
pub mod poll;
pub mod share;

pub use error::{DexpollError, ExitCode, Result};
