//! Small helpers that don't belong to the verifier proper

mod ref_id;

pub use ref_id::*;
