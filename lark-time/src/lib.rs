//! Time values for a small embedded scripting language.
//!
//! Scripts get two builtins, `now()` and `timedelta(**units)`, which produce [`Instant`]s and
//! [`Span`]s. Both value kinds plug into the interpreter through [`ValueProtocol`] and support
//! comparison, hashing, truthiness and `+`/`-` arithmetic with each other.
//!
//! [`Instant`]: runtime_value::Instant
//! [`Span`]: runtime_value::Span
//! [`ValueProtocol`]: runtime_value::ValueProtocol

pub mod builtins;
pub mod compiler;
pub mod error;
pub mod runtime;
pub mod runtime_value;
