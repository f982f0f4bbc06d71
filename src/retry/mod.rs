//! Retry module
//! - policy.rs: backoff policy and the executors that apply it

pub mod policy;

pub use policy::*;
