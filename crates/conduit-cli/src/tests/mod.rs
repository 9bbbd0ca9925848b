//! Test suites for the conduit CLI.

mod support;
