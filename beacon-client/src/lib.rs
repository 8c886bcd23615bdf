//! Monitoring client adapter for Beacon.
//!
//! This crate owns everything between a user action and the monitoring service:
//!
//!  - [`store`]: the local key-value storage that persists the access token and the recording
//!    preference.
//!  - [`CredentialResolver`]: determines the active access token, preferring the stored value
//!    over the configured fallback.
//!  - [`ClientSlot`]: lazily constructs and memoizes the single [`MonitoringClient`] of a
//!    session and exposes normalized send and recording operations.
//!  - [`Transport`]: the seam to the monitoring service's item API, implemented over HTTP by
//!    [`HttpTransport`].
//!
//! # Normalization
//!
//! The item API does not answer in one uniform shape. The identifier of an accepted item may be
//! nested in a `result` object or sit at the top level, and the status may be expressed through an
//! internal error counter or carried explicitly. [`ItemResponse`] captures all of these fields and
//! [`SendOutcome`] folds them into a remote identifier and a numeric status:
//!
//!  - The remote identifier is `result.uuid`, else the top-level `uuid`, else none.
//!  - The status is `200` if the error counter is zero, else the carried `status` or
//!    `statusCode`, else `202`.
//!  - Transport failures never surface as errors. They resolve with no remote identifier and the
//!    failure's status, defaulting to `500`.

#![warn(missing_docs)]

mod client;
mod credentials;
mod protocol;
pub mod store;
mod transport;

#[cfg(feature = "test")]
pub mod testutils;

pub use self::client::*;
pub use self::credentials::*;
pub use self::protocol::*;
pub use self::transport::*;
