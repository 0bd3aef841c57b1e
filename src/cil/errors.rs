use std::fmt;

/// Reason a method body was rejected
///
/// When the failure is attributable to one instruction, `instruction` is its index.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct VerifierError {
    pub instruction: Option<usize>,
    pub kind: VerifierErrorKind,
}

/// Rule that a method body violated
///
/// This is diagnostic only: callers are only ever expected to care whether verification passed.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum VerifierErrorKind {
    /// Tried to pop from an empty operand stack
    EmptyStack,

    /// Operand had the wrong type (expected, found)
    InvalidType(String, String),

    /// Stacks flowing into the same instruction have different heights
    StackHeightMismatch(usize, usize),

    /// No common supertype exists for types meeting at a join point
    IncompatibleMerge(String, String),

    /// A stack already fixed at a backward branch target can't accept the incoming stack
    IncompatibleBackwardBranch(usize),

    /// Operand types of an arithmetic, shift, or comparison instruction don't combine
    ArithmeticMismatch(String, String),

    /// Exception regions overlap without nesting, or are out of bounds
    MalformedRegions(String),

    /// A protected region or handler ends with an instruction that isn't allowed to end it
    IllegalBlockExit(usize),

    /// A branch or switch target crosses a region boundary (or is out of bounds)
    IllegalBranchTarget(usize),

    /// A `leave` appears outside of a try or catch, or its target is out of reach
    IllegalLeave(usize),

    /// Instruction is not allowed in the block where it appears
    IllegalInstruction(&'static str),

    /// Operand stack isn't empty where a block is entered
    NonEmptyStackAtBlockEntry(usize),

    /// Operand stack exceeds the declared maximum
    StackOverflow(usize),

    /// Stack isn't empty after `ret` or `endfilter`
    NonEmptyStackAtExit(usize),

    /// Argument or local index is out of range
    InvalidIndex(usize),

    /// A tail call isn't immediately followed by `ret`
    MissingTailCallReturn,

    /// `newobj` on a delegate doesn't follow the function pointer pattern, or the signatures
    /// don't line up
    BadDelegateConstruction(String),

    /// Member is used in a way its declaration doesn't allow (eg. `ldsfld` on an instance field)
    InvalidMember(String),

    /// The last instruction can fall through past the end of the body
    FallsOffEnd,

    /// The body has no instructions
    EmptyBody,
}

impl fmt::Display for VerifierErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VerifierErrorKind::EmptyStack => f.write_str("pop from empty stack"),
            VerifierErrorKind::InvalidType(expected, found) => {
                write!(f, "expected {}, found {}", expected, found)
            }
            VerifierErrorKind::StackHeightMismatch(height1, height2) => {
                write!(f, "stack heights {} and {} don't match", height1, height2)
            }
            VerifierErrorKind::IncompatibleMerge(type1, type2) => {
                write!(f, "{} and {} have no common type", type1, type2)
            }
            VerifierErrorKind::IncompatibleBackwardBranch(target) => write!(
                f,
                "stack at backward branch target {} is not general enough",
                target
            ),
            VerifierErrorKind::ArithmeticMismatch(type1, type2) => {
                write!(f, "{} and {} can't be combined", type1, type2)
            }
            VerifierErrorKind::MalformedRegions(msg) => {
                write!(f, "malformed exception regions: {}", msg)
            }
            VerifierErrorKind::IllegalBlockExit(end) => {
                write!(f, "block ending at {} ends with an illegal instruction", end)
            }
            VerifierErrorKind::IllegalBranchTarget(target) => {
                write!(f, "illegal branch target {}", target)
            }
            VerifierErrorKind::IllegalLeave(target) => write!(f, "illegal leave to {}", target),
            VerifierErrorKind::IllegalInstruction(name) => {
                write!(f, "{} is not allowed here", name)
            }
            VerifierErrorKind::NonEmptyStackAtBlockEntry(height) => {
                write!(f, "block entered with {} values on the stack", height)
            }
            VerifierErrorKind::StackOverflow(max) => {
                write!(f, "stack grows past its maximum of {}", max)
            }
            VerifierErrorKind::NonEmptyStackAtExit(height) => {
                write!(f, "{} values left on the stack", height)
            }
            VerifierErrorKind::InvalidIndex(idx) => write!(f, "index {} is out of range", idx),
            VerifierErrorKind::MissingTailCallReturn => {
                f.write_str("tail call is not followed by ret")
            }
            VerifierErrorKind::BadDelegateConstruction(msg) => {
                write!(f, "bad delegate construction: {}", msg)
            }
            VerifierErrorKind::InvalidMember(msg) => write!(f, "invalid member: {}", msg),
            VerifierErrorKind::FallsOffEnd => f.write_str("control falls off the end of the body"),
            VerifierErrorKind::EmptyBody => f.write_str("method body is empty"),
        }
    }
}

impl fmt::Display for VerifierError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.instruction {
            Some(instruction) => write!(f, "instruction {}: {}", instruction, self.kind),
            None => write!(f, "{}", self.kind),
        }
    }
}

impl std::error::Error for VerifierError {}

impl From<VerifierErrorKind> for VerifierError {
    fn from(kind: VerifierErrorKind) -> VerifierError {
        VerifierError {
            instruction: None,
            kind,
        }
    }
}
