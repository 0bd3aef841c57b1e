use crate::cil::type_graph::TypeId;
use std::ops::Range;

/// What sort of handler protects the try interval
#[derive(Copy, Clone, PartialEq, Debug)]
pub enum RegionKind<'g> {
    /// Runs only when the try interval is exited by an exception
    Fault,

    /// Runs whenever the try interval is exited
    Finally,

    /// Catches exceptions assignable to the class
    TypedCatch(TypeId<'g>),

    /// Catches exceptions that the filter accepts
    FilteredCatch,
}

/// Entry in the exception region table
///
/// Offsets and lengths are counted in instructions.
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct ExceptionRegion<'g> {
    pub kind: RegionKind<'g>,
    pub try_start: usize,
    pub try_length: usize,
    pub handler_start: usize,
    pub handler_length: usize,

    /// Only for `FilteredCatch`: the filter runs from here up to `handler_start`
    pub filter_start: Option<usize>,
}

impl<'g> ExceptionRegion<'g> {
    pub fn try_range(&self) -> Range<usize> {
        self.try_start..self.try_start + self.try_length
    }

    pub fn handler_range(&self) -> Range<usize> {
        self.handler_start..self.handler_start + self.handler_length
    }

    pub fn filter_range(&self) -> Option<Range<usize>> {
        self.filter_start.map(|start| start..self.handler_start)
    }

    pub fn is_finally_like(&self) -> bool {
        matches!(self.kind, RegionKind::Finally | RegionKind::Fault)
    }
}
