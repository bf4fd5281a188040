//! Tracing setup shared by the sitewatch binaries.

mod subscriber;

pub use subscriber::{LogFormat, init, init_with_level};

/// Install the default subscriber (INFO unless `RUST_LOG` says otherwise).
pub fn init_tracing() {
    init();
}
