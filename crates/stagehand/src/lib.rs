//! Stagehand keeps a suite's Mountebank imposters honest between tests.
//!
//! A suite configuration names each imposter by a stable alias and points it
//! at a contract document on disk. At suite start stagehand wipes the mock
//! server, provisions every configured imposter, and pins each alias to the
//! port the server assigned. Before every test it recreates any imposter that
//! was replaced during the previous test (or is flagged volatile) from its
//! original contract, so each test begins from a known state. At suite end it
//! can persist the final imposter configurations back to disk.
//!
//! The entry point is [`Harness`], driven by the host runner through three
//! hooks: [`Harness::on_suite_start`], [`Harness::on_test_start`], and
//! [`Harness::on_suite_end`]. Inside a test, imposters are addressed by alias
//! for mutation ([`Harness::replace_imposter`]) and for assertions over their
//! recorded interactions ([`Harness::find_requests`] and friends).

pub mod client;
pub mod config;
pub mod harness;
pub mod imposter;

pub use client::{HttpTransport, InMemoryTransport, Transport, TransportError};
pub use config::{ConfigError, ImposterSpec, SuiteConfig, DEFAULT_PORT};
pub use harness::{Harness, HarnessError, Registry, ReplaceSource};
pub use imposter::{matches_criteria, Imposter, RecordedRequest};
