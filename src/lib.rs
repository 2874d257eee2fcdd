#![doc(test(attr(deny(warnings))))]

//! Dues Core turns an append-only stream of payment and expense records into
//! trustworthy per-funding-source balances, approval state transitions with
//! waiver semantics, pre-approval risk advisories, deadline urgency tiers,
//! and streak/achievement derivations.

pub mod config;
pub mod core;
pub mod domain;
pub mod errors;
pub mod events;
pub mod store;
pub mod utils;

use std::sync::Once;

static INIT_TRACING: Once = Once::new();

/// Initializes global tracing and emits a startup info log.
pub fn init() {
    INIT_TRACING.call_once(|| {
        utils::init_tracing();
        tracing::info!("Dues Core tracing initialized.");
    });
}
