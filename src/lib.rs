//! Static verifier for method bodies of stack-based managed bytecode
//!
//! The verifier is handed a fully resolved [`cil::MethodBody`] (instructions with resolved
//! operands, locals, signature, exception regions) along with the [`cil::type_graph::TypeGraph`]
//! describing every type that body mentions. It then proves, in a single abstract interpretation
//! pass, that the operand stack is used in a type-safe way and that exception regions are only
//! entered and exited through legal transitions.
//!
//! ```ignore
//! let arenas = TypeGraphArenas::new();
//! let graph = TypeGraph::new(&arenas);
//! let body: MethodBody = build_body(&graph);
//! let verified = verify_method(&graph, &body, &VerifierSettings::default())?;
//! println!("{:?}", verified.entry_stack(0));
//! ```

pub mod cil;
pub mod util;
