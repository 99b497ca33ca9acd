//! Integration test driver for `tests/integration/`.
//!
//! Each `mod` below exercises one part of the engine against the
//! scripted modem in `mock_modem`. Everything runs on the host.

mod demux_tests;
mod mock_modem;
mod publish_tests;
mod recovery_tests;
