//! Installs a global `tracing` subscriber wired through `tracing-fluent-assertions`, so tests can
//! assert that a specific event or span fired rather than only checking return values.

use std::str::FromStr;
use std::sync::OnceLock;

use tracing_fluent_assertions::{AssertionRegistry, AssertionsLayer};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{Layer, Registry};

pub fn install_tracing_helpers() -> AssertionRegistry {
    static ASSERTION_REGISTRY: OnceLock<AssertionRegistry> = OnceLock::new();

    ASSERTION_REGISTRY
        .get_or_init(|| {
            let assertion_registry = AssertionRegistry::default();
            let assertions_layer = AssertionsLayer::new(&assertion_registry);

            let fmt_filter = std::env::var("RUST_LOG")
                .map_err(|_| ())
                .and_then(|s| LevelFilter::from_str(s.as_str()).map_err(|_| ()))
                .unwrap_or(LevelFilter::OFF);
            let fmt_layer = tracing_subscriber::fmt::layer()
                .with_test_writer()
                .with_filter(fmt_filter);

            let subscriber = Registry::default().with(assertions_layer).with(fmt_layer);
            tracing::subscriber::set_global_default(subscriber).ok();
            assertion_registry
        })
        .clone()
}
