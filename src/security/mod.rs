//! Security mode policy.
//!
//! - `mode`: modes, operation kinds, and the per-mode rule tables
//! - `policy`: the shared [`AccessPolicy`] consulted before every data store call

pub mod mode;
pub mod policy;

pub use mode::{OperationClass, OperationKind, SecurityMode};
pub use policy::AccessPolicy;
