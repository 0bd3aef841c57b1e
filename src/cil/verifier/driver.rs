use super::{
    is_stack_more_general, merge_stacks, Frame, MethodContext, RegionAnalyzer, VerifierSettings,
};
use crate::cil::type_graph::TypeGraph;
use crate::cil::{Instruction, MethodBody, VerifiableType, VerifierError, VerifierErrorKind};
use std::collections::hash_map::Entry;
use std::collections::HashMap;

/// Result of successfully verifying a method body
///
/// Downstream consumers (eg. code emission) can query the operand stack at any instruction
/// without re-running the analysis.
#[derive(Clone, Debug)]
pub struct VerifiedBody<'g> {
    entry_stacks: Vec<Vec<VerifiableType<'g>>>,
}

impl<'g> VerifiedBody<'g> {
    /// Operand stack on entry to the instruction (bottom first)
    pub fn entry_stack(&self, index: usize) -> Option<&[VerifiableType<'g>]> {
        self.entry_stacks.get(index).map(|stack| stack.as_slice())
    }

    /// Tallest operand stack at the start of any instruction
    pub fn max_entry_stack(&self) -> usize {
        self.entry_stacks.iter().map(Vec::len).max().unwrap_or(0)
    }
}

/// Verify a method body
///
/// The instructions are visited once, in order. Forward edges merge their stacks into the
/// target's entry stack, while backward edges only check that the (already fixed) entry stack at
/// the target is general enough. An instruction that no earlier instruction flows into starts
/// with an empty stack, so a loop body placed after the jump to its condition must leave the
/// stack empty on its way back.
pub fn verify_method<'g>(
    graph: &TypeGraph<'g>,
    body: &MethodBody<'g>,
    settings: &VerifierSettings,
) -> Result<VerifiedBody<'g>, VerifierError> {
    log::debug!(
        "Verifying '{}' ({} instructions, {} exception regions)",
        body.name,
        body.instructions.len(),
        body.exception_regions.len()
    );
    let result = VerificationPass::new(graph, body, settings).and_then(VerificationPass::run);
    if let Err(err) = &result {
        log::debug!("Rejected '{}': {}", body.name, err);
    }
    result
}

/// Verify a method body, only reporting whether it passed
pub fn is_verifiable<'g>(
    graph: &TypeGraph<'g>,
    body: &MethodBody<'g>,
    settings: &VerifierSettings,
) -> bool {
    verify_method(graph, body, settings).is_ok()
}

/// State of one verification pass, dropped once the pass is over
struct VerificationPass<'a, 'g> {
    ctx: MethodContext<'a, 'g>,
    regions: RegionAnalyzer<'a, 'g>,

    /// Stacks merged so far for instructions not yet visited
    pending: HashMap<usize, Vec<VerifiableType<'g>>>,

    /// Entry stacks of instructions already visited
    entry_stacks: Vec<Vec<VerifiableType<'g>>>,
}

impl<'a, 'g> VerificationPass<'a, 'g> {
    fn new(
        graph: &'a TypeGraph<'g>,
        body: &'a MethodBody<'g>,
        settings: &'a VerifierSettings,
    ) -> Result<Self, VerifierError> {
        let instruction_count = body.instructions.len();
        if instruction_count == 0 {
            return Err(VerifierErrorKind::EmptyBody.into());
        }

        let regions = RegionAnalyzer::new(&body.exception_regions, instruction_count)?;
        regions.check_block_ends(&body.instructions)?;

        Ok(VerificationPass {
            ctx: MethodContext::new(graph, body, settings),
            regions,
            pending: HashMap::new(),
            entry_stacks: Vec::with_capacity(instruction_count),
        })
    }

    fn run(mut self) -> Result<VerifiedBody<'g>, VerifierError> {
        let body = self.ctx.body;
        for (index, instruction) in body.instructions.iter().enumerate() {
            self.visit(index, instruction)
                .map_err(|kind| VerifierError {
                    instruction: Some(index),
                    kind,
                })?;
        }
        Ok(VerifiedBody {
            entry_stacks: self.entry_stacks,
        })
    }

    fn visit(
        &mut self,
        index: usize,
        instruction: &Instruction<'g>,
    ) -> Result<(), VerifierErrorKind> {
        let settings = self.ctx.settings;
        let core = self.ctx.graph.core();

        let incoming = self.pending.remove(&index).unwrap_or_default();
        let stack = match self.regions.handler_entry_type(index, core) {
            Some(exception) => {
                if !incoming.is_empty() {
                    return Err(VerifierErrorKind::NonEmptyStackAtBlockEntry(incoming.len()));
                }
                vec![exception]
            }
            None => incoming,
        };
        if settings.require_empty_stack_at_try_entry
            && self.regions.is_try_start(index)
            && !stack.is_empty()
        {
            return Err(VerifierErrorKind::NonEmptyStackAtBlockEntry(stack.len()));
        }
        self.check_max_stack(&stack)?;

        log::trace!("{:>4}: {:<10} {:?}", index, instruction.mnemonic(), stack);
        self.entry_stacks.push(stack.clone());

        self.regions.check_instruction(index, instruction, settings)?;
        let mut frame = Frame::new(stack);
        frame.verify_instruction(index, &self.ctx)?;
        self.check_max_stack(&frame.stack)?;

        if let Instruction::Leave(target) = instruction {
            self.propagate(index, *target, vec![])?;
        } else {
            for target in instruction.jump_targets() {
                self.regions.check_edge(index, *target)?;
                self.propagate(index, *target, frame.stack.clone())?;
            }
        }

        if instruction.falls_through() {
            let next = index + 1;
            if next >= self.ctx.body.instructions.len() {
                return Err(VerifierErrorKind::FallsOffEnd);
            }
            self.regions.check_edge(index, next)?;
            self.propagate(index, next, frame.stack)?;
        }

        Ok(())
    }

    /// Flow a stack from the instruction at `source` into the one at `target`
    fn propagate(
        &mut self,
        source: usize,
        target: usize,
        stack: Vec<VerifiableType<'g>>,
    ) -> Result<(), VerifierErrorKind> {
        if target > source {
            match self.pending.entry(target) {
                Entry::Occupied(mut occupied) => {
                    let merged = merge_stacks(occupied.get(), &stack, self.ctx.graph)?;
                    occupied.insert(merged);
                }
                Entry::Vacant(vacant) => {
                    vacant.insert(stack);
                }
            }
            return Ok(());
        }

        let fixed = &self.entry_stacks[target];
        if fixed.len() != stack.len() {
            Err(VerifierErrorKind::StackHeightMismatch(fixed.len(), stack.len()))
        } else if !is_stack_more_general(fixed, &stack, self.ctx.graph.core()) {
            log::debug!(
                "Stack {:?} at {} does not accept {:?} from {}",
                fixed,
                target,
                stack,
                source
            );
            Err(VerifierErrorKind::IncompatibleBackwardBranch(target))
        } else {
            Ok(())
        }
    }

    fn check_max_stack(&self, stack: &[VerifiableType<'g>]) -> Result<(), VerifierErrorKind> {
        match self.ctx.settings.max_stack {
            Some(max_stack) if stack.len() > max_stack => {
                Err(VerifierErrorKind::StackOverflow(max_stack))
            }
            _ => Ok(()),
        }
    }
}
