//! Key event log storage engine: a generic keyspace layer over an embedded
//! ordered key/value store, with a thin schema layer binding it to the ten
//! sub-stores a key event log needs.

mod env;
mod errors;
mod keys;
mod keyspace;
mod store;

pub use crate::env::{KelEnv, MAX_NAMED_SUB_STORES};
pub use crate::errors::{Result, StoreError};
pub use crate::keys::{dg_key, sn_key};
pub use crate::store::KelStore;

/// Test-only diagnostics: every `#[cfg(test)]` module calls
/// [`test_support::init_tracing`] before exercising an environment, so a
/// failing test's `debug!`/`warn!` trail (fallback paths, capacity errors)
/// shows up under `cargo test -- --nocapture`.
#[cfg(test)]
pub(crate) mod test_support {
    pub fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_test_writer()
            .try_init();
    }
}
