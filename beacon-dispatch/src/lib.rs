//! Event dispatch and local state coordination for Beacon sessions.
//!
//! A [`Session`] bundles everything a user interacts with:
//!
//!  - The [`Dispatcher`] sends sample log events and exceptions and keeps the in-memory
//!    [`EventHistory`], newest first.
//!  - The [`RecordingToggle`] turns session recording on and off, reinitializing the monitoring
//!    client where the transport cannot apply the change in place.
//!  - The [`TokenSettings`] save and clear the access token.
//!
//! Every action that reaches the monitoring service is guarded by the [`TokenGuard`]. Without a
//! resolvable access token, the action is blocked and a transient [`Notice`] is posted instead.
//!
//! # Dispatch states
//!
//! A dispatch moves through `Idle -> Guarding -> (Blocked | Sending) -> Idle`. Only one dispatch
//! may be sending at a time. Triggers arriving while another dispatch is in flight are dropped,
//! so records are appended in trigger order.

#![warn(missing_docs)]

mod dispatcher;
mod guard;
mod history;
mod notice;
mod record;
mod session;
mod settings;
mod toggle;

pub use self::dispatcher::*;
pub use self::guard::*;
pub use self::history::*;
pub use self::notice::*;
pub use self::record::*;
pub use self::session::*;
pub use self::settings::*;
pub use self::toggle::*;
