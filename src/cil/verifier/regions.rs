use super::VerifierSettings;
use crate::cil::type_graph::CoreTypes;
use crate::cil::{ExceptionRegion, Instruction, RegionKind, VerifiableType, VerifierErrorKind};
use std::ops::Range;

/// Classification of a structured block
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum BlockKind {
    /// Not protected, and not in any handler
    Global,

    /// Protected interval
    Try,

    /// Handler of a typed or filtered catch
    Catch,

    /// Handler of a finally or fault
    Finally,

    /// Filter deciding whether a filtered catch handles an exception
    Filter,
}

/// Structured block: a half-open interval of instruction indices and what it is for
///
/// Several typed catches on one try interval all share one `Try` block.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct Block {
    pub kind: BlockKind,
    pub start: usize,
    pub end: usize,
}

impl Block {
    fn new(kind: BlockKind, range: Range<usize>) -> Block {
        Block {
            kind,
            start: range.start,
            end: range.end,
        }
    }

    fn contains(&self, index: usize) -> bool {
        self.start <= index && index < self.end
    }

    fn encloses(&self, other: &Block) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    fn len(&self) -> usize {
        self.end - self.start
    }

    fn overlaps(&self, other: &Block) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Order blocks from innermost to outermost, assuming they all contain some common point
    ///
    /// A try interval exactly covering a handler is nested inside that handler.
    fn nesting_key(&self) -> (usize, bool) {
        (self.len(), self.kind != BlockKind::Try)
    }
}

/// Answers questions about which structured block an instruction is in, and whether control
/// transfers respect block boundaries
///
/// Construction checks that the regions are well formed: every interval is in bounds, and any
/// two intervals are either disjoint or nested.
pub struct RegionAnalyzer<'a, 'g> {
    regions: &'a [ExceptionRegion<'g>],
    blocks: Vec<Block>,
    instruction_count: usize,
}

impl<'a, 'g> RegionAnalyzer<'a, 'g> {
    pub fn new(
        regions: &'a [ExceptionRegion<'g>],
        instruction_count: usize,
    ) -> Result<Self, VerifierErrorKind> {
        let mut blocks: Vec<Block> = vec![];
        for region in regions {
            check_region_bounds(region, instruction_count)?;

            let try_block = Block::new(BlockKind::Try, region.try_range());
            let handler_kind = if region.is_finally_like() {
                BlockKind::Finally
            } else {
                BlockKind::Catch
            };
            let handler_block = Block::new(handler_kind, region.handler_range());
            let filter_block = region
                .filter_range()
                .map(|range| Block::new(BlockKind::Filter, range));

            let own_blocks = std::iter::once(handler_block).chain(filter_block);
            for block in own_blocks.clone() {
                if block.overlaps(&try_block) {
                    return Err(VerifierErrorKind::MalformedRegions(format!(
                        "handler or filter {:?} overlaps its own try {:?}",
                        block, try_block
                    )));
                }
            }

            if !blocks.contains(&try_block) {
                blocks.push(try_block);
            }
            for block in own_blocks {
                if blocks.contains(&block) {
                    return Err(VerifierErrorKind::MalformedRegions(format!(
                        "{:?} is used by more than one region",
                        block
                    )));
                }
                blocks.push(block);
            }
        }

        for (idx, block1) in blocks.iter().enumerate() {
            for block2 in &blocks[idx + 1..] {
                let nested = block1.encloses(block2) || block2.encloses(block1);
                if block1.overlaps(block2) && !nested {
                    return Err(VerifierErrorKind::MalformedRegions(format!(
                        "{:?} and {:?} overlap without nesting",
                        block1, block2
                    )));
                }
            }
        }

        Ok(RegionAnalyzer {
            regions,
            blocks,
            instruction_count,
        })
    }

    /// The block covering the whole body
    pub fn global(&self) -> Block {
        Block {
            kind: BlockKind::Global,
            start: 0,
            end: self.instruction_count,
        }
    }

    /// Innermost block containing the instruction
    pub fn innermost(&self, index: usize) -> Block {
        self.blocks
            .iter()
            .filter(|block| block.contains(index))
            .min_by_key(|block| block.nesting_key())
            .copied()
            .unwrap_or_else(|| self.global())
    }

    /// Innermost block that encloses the given block (other than the block itself)
    pub fn parent(&self, block: &Block) -> Block {
        self.blocks
            .iter()
            .filter(|other| *other != block && other.encloses(block))
            .filter(|other| !(other.kind == BlockKind::Try && other.len() == block.len()))
            .min_by_key(|other| other.nesting_key())
            .copied()
            .unwrap_or_else(|| self.global())
    }

    /// Is the instruction the first one in a try interval?
    pub fn is_try_start(&self, index: usize) -> bool {
        self.regions.iter().any(|region| region.try_start == index)
    }

    /// If a handler or filter starts at this instruction, get the type of the exception object it
    /// is entered with
    pub fn handler_entry_type(
        &self,
        index: usize,
        core: &CoreTypes<'g>,
    ) -> Option<VerifiableType<'g>> {
        self.regions.iter().find_map(|region| {
            if region.handler_start == index {
                Some(match region.kind {
                    RegionKind::TypedCatch(class) => VerifiableType::boxed(class),
                    _ => VerifiableType::declared(core.object),
                })
            } else if region.filter_start == Some(index) {
                Some(VerifiableType::declared(core.object))
            } else {
                None
            }
        })
    }

    /// Can control flow from `source` to `target` by a branch, switch, or fall through?
    ///
    /// Both have to be in the same block, except that any try interval may be entered through
    /// its first instruction.
    pub fn check_edge(&self, source: usize, target: usize) -> Result<(), VerifierErrorKind> {
        if target >= self.instruction_count {
            return Err(VerifierErrorKind::IllegalBranchTarget(target));
        }
        let source_block = self.innermost(source);
        if self.reachable_from_block(target, &source_block) {
            Ok(())
        } else {
            Err(VerifierErrorKind::IllegalBranchTarget(target))
        }
    }

    /// Can a `leave` at `source` transfer control to `target`?
    ///
    /// `leave` can exit at most the one try interval or catch handler it is in.
    pub fn check_leave(&self, source: usize, target: usize) -> Result<(), VerifierErrorKind> {
        if target >= self.instruction_count {
            return Err(VerifierErrorKind::IllegalLeave(target));
        }
        let source_block = self.innermost(source);
        if !matches!(source_block.kind, BlockKind::Try | BlockKind::Catch) {
            return Err(VerifierErrorKind::IllegalLeave(target));
        }
        let parent_block = self.parent(&source_block);
        if self.reachable_from_block(target, &source_block)
            || self.reachable_from_block(target, &parent_block)
        {
            Ok(())
        } else {
            Err(VerifierErrorKind::IllegalLeave(target))
        }
    }

    /// Is the target either in the block, or the start of a try interval (or several nested ones)
    /// that is directly in the block?
    fn reachable_from_block(&self, target: usize, block: &Block) -> bool {
        let mut target_block = self.innermost(target);
        loop {
            if &target_block == block {
                return true;
            }
            if target_block.kind != BlockKind::Try || target_block.start != target {
                return false;
            }
            target_block = self.parent(&target_block);
        }
    }

    /// Check that every try interval, handler, and filter ends with an instruction that exits it
    ///
    /// When a nested block shares the last instruction, that nested block's rule applies instead.
    pub fn check_block_ends(
        &self,
        instructions: &[Instruction<'g>],
    ) -> Result<(), VerifierErrorKind> {
        for block in &self.blocks {
            let last = block.end - 1;
            if block.kind != BlockKind::Filter && self.innermost(last) != *block {
                continue;
            }
            let legal = match (block.kind, &instructions[last]) {
                (BlockKind::Try, Instruction::Leave(_) | Instruction::Throw) => true,
                (BlockKind::Finally, Instruction::EndFinally) => true,
                (BlockKind::Filter, Instruction::EndFilter) => true,
                (
                    BlockKind::Catch,
                    Instruction::Leave(_) | Instruction::Throw | Instruction::Rethrow,
                ) => true,
                _ => false,
            };
            if !legal {
                log::debug!(
                    "{:?} ends with illegal {}",
                    block,
                    instructions[last].mnemonic()
                );
                return Err(VerifierErrorKind::IllegalBlockExit(last));
            }
        }
        Ok(())
    }

    /// Check that an instruction is allowed in the block it appears in
    pub fn check_instruction(
        &self,
        index: usize,
        instruction: &Instruction<'g>,
        settings: &VerifierSettings,
    ) -> Result<(), VerifierErrorKind> {
        let kind = self.innermost(index).kind;
        let legal = match instruction {
            Instruction::EndFinally => kind == BlockKind::Finally,
            Instruction::EndFilter => kind == BlockKind::Filter,
            Instruction::Rethrow => kind == BlockKind::Catch,
            Instruction::Ret => {
                kind == BlockKind::Global || settings.allow_return_in_protected_regions
            }
            Instruction::Leave(target) => return self.check_leave(index, *target),
            _ => true,
        };
        if legal {
            Ok(())
        } else {
            Err(VerifierErrorKind::IllegalInstruction(instruction.mnemonic()))
        }
    }
}

fn check_region_bounds(
    region: &ExceptionRegion<'_>,
    instruction_count: usize,
) -> Result<(), VerifierErrorKind> {
    let malformed = |msg: &str| {
        Err(VerifierErrorKind::MalformedRegions(format!(
            "{} in {:?}",
            msg, region
        )))
    };

    if region.try_length == 0 || region.handler_length == 0 {
        return malformed("empty interval");
    }
    let in_bounds = |start: usize, length: usize| {
        start
            .checked_add(length)
            .map_or(false, |end| end <= instruction_count)
    };
    if !in_bounds(region.try_start, region.try_length)
        || !in_bounds(region.handler_start, region.handler_length)
    {
        return malformed("interval out of bounds");
    }
    match (region.kind, region.filter_start) {
        (RegionKind::FilteredCatch, Some(filter_start)) if filter_start < region.handler_start => {
            Ok(())
        }
        (RegionKind::FilteredCatch, _) => malformed("filter must start before its handler"),
        (_, Some(_)) => malformed("filter on a region that isn't a filtered catch"),
        (_, None) => Ok(()),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::cil::type_graph::{TypeGraph, TypeGraphArenas};

    fn region<'g>(
        kind: RegionKind<'g>,
        try_range: (usize, usize),
        handler_range: (usize, usize),
    ) -> ExceptionRegion<'g> {
        ExceptionRegion {
            kind,
            try_start: try_range.0,
            try_length: try_range.1 - try_range.0,
            handler_start: handler_range.0,
            handler_length: handler_range.1 - handler_range.0,
            filter_start: None,
        }
    }

    #[test]
    fn classification() {
        let arenas = TypeGraphArenas::new();
        let graph = TypeGraph::new(&arenas);
        let exception = graph.core().exception;

        // 0..2 outer try { 1..2 inner try } 2..4 catch, 4..6 finally
        let regions = vec![
            region(RegionKind::TypedCatch(exception), (0, 2), (2, 4)),
            region(RegionKind::Finally, (0, 4), (4, 6)),
            region(RegionKind::Fault, (1, 2), (6, 7)),
        ];
        let analyzer = RegionAnalyzer::new(&regions, 8).unwrap();

        assert_eq!(analyzer.innermost(0).kind, BlockKind::Try);
        assert_eq!(analyzer.innermost(0).end, 2);
        assert_eq!(analyzer.innermost(1).end, 2, "innermost try");
        assert_eq!(analyzer.innermost(1).start, 1, "innermost try");
        assert_eq!(analyzer.innermost(3).kind, BlockKind::Catch);
        assert_eq!(analyzer.innermost(5).kind, BlockKind::Finally);
        assert_eq!(analyzer.innermost(6).kind, BlockKind::Finally, "fault");
        assert_eq!(analyzer.innermost(7).kind, BlockKind::Global);

        let catch = analyzer.innermost(3);
        assert_eq!(
            analyzer.parent(&catch),
            Block {
                kind: BlockKind::Try,
                start: 0,
                end: 4
            }
        );
        assert!(analyzer.is_try_start(1));
        assert!(!analyzer.is_try_start(2));
        assert_eq!(
            analyzer.handler_entry_type(2, graph.core()),
            Some(VerifiableType::declared(exception))
        );
        assert_eq!(
            analyzer.handler_entry_type(4, graph.core()),
            Some(VerifiableType::declared(graph.core().object))
        );
    }

    #[test]
    fn nesting() {
        let arenas = TypeGraphArenas::new();
        let graph = TypeGraph::new(&arenas);
        let exception = graph.core().exception;

        let partial_overlap = vec![
            region(RegionKind::Finally, (0, 4), (4, 6)),
            region(RegionKind::Finally, (2, 5), (6, 8)),
        ];
        assert!(matches!(
            RegionAnalyzer::new(&partial_overlap, 8),
            Err(VerifierErrorKind::MalformedRegions(_))
        ));

        let shared_try = vec![
            region(RegionKind::TypedCatch(exception), (0, 2), (2, 4)),
            region(RegionKind::TypedCatch(graph.core().object), (0, 2), (4, 6)),
        ];
        assert!(RegionAnalyzer::new(&shared_try, 6).is_ok());

        let shared_handler = vec![
            region(RegionKind::Finally, (0, 2), (4, 6)),
            region(RegionKind::Finally, (2, 4), (4, 6)),
        ];
        assert!(RegionAnalyzer::new(&shared_handler, 6).is_err());

        let out_of_bounds = vec![region(RegionKind::Finally, (0, 2), (2, 9))];
        assert!(RegionAnalyzer::new(&out_of_bounds, 6).is_err());

        let mut filter = region(RegionKind::FilteredCatch, (0, 2), (4, 6));
        filter.filter_start = Some(4);
        assert!(RegionAnalyzer::new(&[filter], 6).is_err());
        filter.filter_start = Some(2);
        let filters = [filter];
        let analyzer = RegionAnalyzer::new(&filters, 6).unwrap();
        assert_eq!(analyzer.innermost(3).kind, BlockKind::Filter);
        assert_eq!(analyzer.innermost(4).kind, BlockKind::Catch);
    }

    #[test]
    fn bounds() {
        let past_end = vec![region(RegionKind::Finally, (0, 2), (2, 9))];
        assert!(matches!(
            RegionAnalyzer::new(&past_end, 8),
            Err(VerifierErrorKind::MalformedRegions(_))
        ));

        let empty = vec![region(RegionKind::Finally, (0, 0), (2, 4))];
        assert!(matches!(
            RegionAnalyzer::new(&empty, 8),
            Err(VerifierErrorKind::MalformedRegions(_))
        ));

        // end of the try interval is not representable
        let wrapping = vec![ExceptionRegion {
            kind: RegionKind::Finally,
            try_start: usize::MAX,
            try_length: 2,
            handler_start: 0,
            handler_length: 1,
            filter_start: None,
        }];
        assert!(matches!(
            RegionAnalyzer::new(&wrapping, 8),
            Err(VerifierErrorKind::MalformedRegions(_))
        ));

        let wrapping_handler = vec![ExceptionRegion {
            kind: RegionKind::Fault,
            try_start: 0,
            try_length: 1,
            handler_start: 1,
            handler_length: usize::MAX,
            filter_start: None,
        }];
        assert!(matches!(
            RegionAnalyzer::new(&wrapping_handler, 8),
            Err(VerifierErrorKind::MalformedRegions(_))
        ));
    }

    #[test]
    fn edges() {
        let arenas = TypeGraphArenas::new();
        let graph = TypeGraph::new(&arenas);
        let exception = graph.core().exception;

        // 1..3 try, 3..5 catch, 5..7 catch
        let regions = vec![
            region(RegionKind::TypedCatch(exception), (1, 3), (3, 5)),
            region(RegionKind::TypedCatch(graph.core().object), (1, 3), (5, 7)),
        ];
        let analyzer = RegionAnalyzer::new(&regions, 8).unwrap();

        assert!(analyzer.check_edge(0, 1).is_ok(), "enter try at its start");
        assert!(analyzer.check_edge(0, 2).is_err(), "enter try in the middle");
        assert!(analyzer.check_edge(0, 3).is_err(), "jump into a handler");
        assert!(analyzer.check_edge(2, 1).is_ok(), "loop inside try");
        assert!(analyzer.check_edge(2, 7).is_err(), "branch out of try");
        assert!(analyzer.check_edge(7, 8).is_err(), "out of bounds");

        assert!(analyzer.check_leave(2, 7).is_ok(), "leave try");
        assert!(analyzer.check_leave(4, 7).is_ok(), "leave catch");
        assert!(analyzer.check_leave(4, 1).is_ok(), "leave catch to retry");
        assert!(analyzer.check_leave(4, 6).is_err(), "leave into sibling catch");
        assert!(analyzer.check_leave(0, 7).is_err(), "leave from global");
    }

    #[test]
    fn block_ends() {
        let arenas = TypeGraphArenas::new();
        let graph = TypeGraph::new(&arenas);
        let exception = graph.core().exception;
        let regions = vec![
            region(RegionKind::TypedCatch(exception), (0, 2), (2, 4)),
            region(RegionKind::Finally, (0, 4), (4, 6)),
        ];
        let analyzer = RegionAnalyzer::new(&regions, 7).unwrap();

        let mut instructions = vec![
            Instruction::Nop,
            Instruction::Leave(6),
            Instruction::Pop,
            Instruction::Leave(6),
            Instruction::Nop,
            Instruction::EndFinally,
            Instruction::Ret,
        ];
        assert!(analyzer.check_block_ends(&instructions).is_ok());

        instructions[5] = Instruction::Ret;
        assert_eq!(
            analyzer.check_block_ends(&instructions),
            Err(VerifierErrorKind::IllegalBlockExit(5))
        );

        instructions[5] = Instruction::EndFinally;
        instructions[1] = Instruction::Br(6);
        assert_eq!(
            analyzer.check_block_ends(&instructions),
            Err(VerifierErrorKind::IllegalBlockExit(1))
        );

        let settings = VerifierSettings::default();
        assert!(analyzer
            .check_instruction(5, &Instruction::EndFinally, &settings)
            .is_ok());
        assert!(analyzer
            .check_instruction(3, &Instruction::EndFinally, &settings)
            .is_err());
        assert!(analyzer
            .check_instruction(3, &Instruction::Rethrow, &settings)
            .is_ok());
        assert!(analyzer.check_instruction(1, &Instruction::Ret, &settings).is_err());
        assert!(analyzer.check_instruction(6, &Instruction::Ret, &settings).is_ok());
    }
}
