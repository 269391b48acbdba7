//! # Audio Module
//!
//! Per-guild playback state for Open Music sessions.
//!
//! ## Architecture
//!
//! ### [`player`] - Session
//! - One state machine per guild (`Disconnected` / `Connected`)
//! - Serializes commands and transport notifications
//! - Starts, advances and repeats playback through the transport
//!
//! ### [`queue`] - Queue Management
//! - Ordered tracks with a cursor, history and upcoming views
//! - Repeat modes `none`, `1` and `all`
//! - Shuffle of upcoming tracks only
//!
//! ### [`equalizer`] - Equalization
//! - 15 bands addressed by index or center frequency
//! - `flat`, `boost`, `metal` and `piano` presets
//!
//! ### [`transport`] / [`voice`] - Streaming
//! - Narrow [`transport::Transport`] interface used by the session
//! - Songbird implementation for Discord voice

pub mod equalizer;
pub mod player;
pub mod queue;
pub mod track;
pub mod transport;
pub mod voice;
