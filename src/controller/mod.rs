//! Controller side of the bridge
//!
//! 1. [`transport`] - USB bring-up handshake and raw HID report reads
//! 2. [`report`] - Decoding of the 64-byte input report into an [`report::InputFrame`]
//! 3. [`device_session`] - Connection lifecycle and the background read loop
//!
//! # Architecture
//!
//! ```text
//! USB bring-up ──► HID reads ──► decode ──► FrameSink
//!                  (reader thread, bounded timeout per read)
//! ```

pub mod device_session;
pub mod report;
pub mod transport;
