//! Managed bytecode method bodies and their verification
//!
//! Method bodies are described by [`MethodBody`] and friends (in [`code`]), and refer to types,
//! methods, and fields living in a [`type_graph::TypeGraph`]. The [`verifier`] checks them.

mod errors;
mod names;
mod signature;

pub mod code;
pub mod type_graph;
pub mod verifier;

pub use code::*;
pub use errors::*;
pub use names::*;
pub use signature::*;
pub use verifier::{is_verifiable, verify_method, VerifiableType, VerifiedBody, VerifierSettings};
