//! Domain layer: pure billing types and logic, no I/O.
//!
//! - `foundation` - Shared primitives (ids, errors)
//! - `billing` - Webhook verification, event decoding, subscriptions, plans

pub mod billing;
pub mod foundation;
