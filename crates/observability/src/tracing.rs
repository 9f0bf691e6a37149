//! JSON logs with timestamps, filtered through `RUST_LOG`.
//!
//! Targets are kept in the output: partial-failure reports are emitted under
//! their own target so they can be routed or alerted on separately.

use tracing_subscriber::EnvFilter;

pub(crate) fn init(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .json()
        .with_timer(tracing_subscriber::fmt::time::SystemTime)
        .with_target(true)
        .try_init();
}

#[cfg(test)]
mod tests {
    #[test]
    fn init_is_idempotent() {
        super::init(crate::DEFAULT_FILTER);
        super::init("debug");
        ::tracing::info!("still logging after a second init");
    }
}
