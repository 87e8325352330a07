/*! Integration tests for Vertebra.
 *
 * This test suite is organized as a single integration test binary
 * following the pattern described by matklad in
 * https://matklad.github.io/2021/02/27/delete-cargo-integration-tests.html
 *
 * The module structure mirrors the main library structure:
 * - events: Tests for Notifier subscription, dispatch order and inverse listening
 * - record: Tests for the Record set algorithm and change tracking
 * - record_set: Tests for reconciliation, indexing and member event forwarding
 * - sync: Tests for fetch/save/destroy through the MemoryTransport
 * - router: Tests for History and Router dispatch
 * - view: Tests for View event delegation
 */

use tracing_subscriber::EnvFilter;

#[ctor::ctor]
fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("vertebra=info".parse().unwrap()),
        )
        .with_test_writer()
        .try_init();
}

mod record;
mod record_set;
mod router;
mod sync;
mod view;
