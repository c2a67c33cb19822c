//! Android device clock synchronization over `adb`.
//!
//! The crate keeps a strict separation:
//!
//! - **[`core`]**: Pure, deterministic logic (device listing parsing, privileged
//!   command wrapping, `date` formatting). No I/O, fully testable in isolation.
//! - **[`io`]**: Side-effecting adapters (child processes, the `adb` bridge, SNTP,
//!   config files). Hidden behind traits so tests can script them.
//!
//! Stage modules ([`device`], [`detect`], [`resolve`], [`set_time`], [`verify`],
//! [`check`]) combine the two, and [`sync`] runs the stages in order.

pub mod check;
pub mod core;
pub mod detect;
pub mod device;
pub mod error;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod resolve;
pub mod set_time;
pub mod sync;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
pub mod verify;
