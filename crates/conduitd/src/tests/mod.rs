//! Test suites for the conduit bridge daemon.

mod process_behaviour;
mod support;
