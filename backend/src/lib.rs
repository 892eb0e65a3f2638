//! Listening-status core: who is playing what, resolved on behalf of the
//! account owner and cached for everyone else.

pub mod domain;
pub mod outbound;
pub mod settings;
pub mod telemetry;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
pub mod wiring;
