//! Verification of method bodies
//!
//! For any instruction inside a method body, the operand stack must have the same shape no matter
//! which control flow path reached that instruction. The values on the stack obviously differ from
//! one execution to the next, but the number of values and their types (represented using
//! [`VerifiableType`]) cannot. Knowing the stack at a point in the code makes it possible to check
//! that the next instruction makes sense (eg. `add` only makes sense if the top two values are
//! numbers of compatible categories); see [`Frame::verify_instruction`].
//!
//! Where control flow joins, stacks from different predecessors get unified using the type
//! lattice ([`VerifiableType::merge`]). Rather than iterating to a fix point, the driver
//! ([`verify_method`]) makes a single pass in instruction order and relies on the body having a
//! structured layout: the target of any backward branch must already have a suitable stack by
//! the time the branch is seen.
//!
//! Independently of types, exception regions constrain how control moves around. The
//! [`RegionAnalyzer`] classifies instructions into the structured blocks (try intervals, handlers,
//! filters) that contain them and checks that blocks are only entered and exited legally.

mod driver;
mod frame;
mod regions;
mod settings;
mod types;

pub use driver::*;
pub use frame::*;
pub use regions::*;
pub use settings::*;
pub use types::*;
