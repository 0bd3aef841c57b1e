//! Method bodies, as handed to the verifier
//!
//! Building these from an actual bytecode stream (resolving tokens, computing instruction indices
//! from byte offsets) happens upstream.

mod exception_region;
mod instructions;

pub use exception_region::*;
pub use instructions::*;

use super::type_graph::TypeId;
use super::MethodSignature;

/// Everything needed to verify one method
#[derive(Clone, Debug)]
pub struct MethodBody<'g> {
    /// Name of the method (used only in diagnostics)
    pub name: String,

    /// Signature of the method itself
    ///
    /// The receiver of an instance method on a value type is a managed pointer, so this should
    /// use [`crate::cil::CallKind::Direct`].
    pub signature: MethodSignature<'g>,

    /// Declared types of local variables
    pub locals: Vec<TypeId<'g>>,

    pub instructions: Vec<Instruction<'g>>,

    pub exception_regions: Vec<ExceptionRegion<'g>>,
}
