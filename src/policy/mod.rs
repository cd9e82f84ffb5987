//! Validation policy: the rule chain applied to a resolved license and the
//! same-signing-key trust bypass.

pub mod trust;
pub mod validate;

pub use trust::{same_key_caller, CallContext};
pub use validate::{evaluate, ItemValidator, KindValidator, ValidationContext};
