use crate::cil::type_graph::{FieldId, MethodId, Primitive, TypeId};
use bitflags::bitflags;

bitflags! {
    /// Modifiers on arithmetic, comparison, conversion, and call instructions
    pub struct InstructionFlags: u8 {
        /// Overflow-checked variant (eg. `add.ovf`, `conv.ovf.i4`)
        const OVERFLOW = 0b001;

        /// Unsigned (or unordered, for floating point) variant (eg. `div.un`, `bge.un`)
        const UNSIGNED = 0b010;

        /// `tail.` prefix on a call
        const TAIL = 0b100;
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    And,
    Or,
    Xor,
}

impl BinaryOp {
    /// Can this operator (with these flags) operate on floating point values?
    pub fn is_float_valid(self, flags: InstructionFlags) -> bool {
        match self {
            BinaryOp::Add | BinaryOp::Sub => !flags.contains(InstructionFlags::OVERFLOW),
            BinaryOp::Mul | BinaryOp::Div | BinaryOp::Rem => {
                !flags.intersects(InstructionFlags::OVERFLOW | InstructionFlags::UNSIGNED)
            }
            BinaryOp::And | BinaryOp::Or | BinaryOp::Xor => false,
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum ShiftOp {
    Shl,
    Shr,
    ShrUn,
}

#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum UnaryOp {
    Neg,
    Not,
}

#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum CompareOp {
    Ceq,
    Cgt,
    Clt,
}

#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum BranchCondition {
    Eq,
    Ne,
    Ge,
    Gt,
    Le,
    Lt,
}

/// Instruction in a method body, with all operands resolved
///
/// Branch targets are indices into the body's instruction list. Argument indices include the
/// receiver for instance methods (so `ldarg 0` is `this`).
#[derive(Clone, Debug)]
pub enum Instruction<'g> {
    Nop,

    LdArg(u16),
    LdArgA(u16),
    StArg(u16),
    LdLoc(u16),
    LdLocA(u16),
    StLoc(u16),

    LdNull,
    LdcI4(i32),
    LdcI8(i64),
    LdcR4(f32),
    LdcR8(f64),
    LdStr(String),

    Dup,
    Pop,

    Call(MethodId<'g>, InstructionFlags), // only `TAIL` is meaningful
    CallVirt(MethodId<'g>, InstructionFlags),
    NewObj(MethodId<'g>),
    LdFtn(MethodId<'g>),
    LdVirtFtn(MethodId<'g>),
    Ret,

    Br(usize),
    BrTrue(usize),
    BrFalse(usize),
    BranchCompare(BranchCondition, usize, InstructionFlags), // covers `beq`, `bge.un`, ...
    Switch(Vec<usize>),
    Leave(usize),
    Throw,
    Rethrow,
    EndFinally,
    EndFilter,

    Binary(BinaryOp, InstructionFlags), // covers `add`, `add.ovf`, `add.ovf.un`, ...
    Shift(ShiftOp),
    Unary(UnaryOp),
    Compare(CompareOp, InstructionFlags), // covers `ceq`, `cgt`, `cgt.un`, ...
    Conv(Primitive, InstructionFlags),    // covers `conv.*`, `conv.ovf.*`, `conv.ovf.*.un`
    CkFinite,

    LdFld(FieldId<'g>),
    LdFldA(FieldId<'g>),
    StFld(FieldId<'g>),
    LdSFld(FieldId<'g>),
    LdSFldA(FieldId<'g>),
    StSFld(FieldId<'g>),

    NewArr(TypeId<'g>),
    LdLen,
    LdElem(TypeId<'g>), // covers `ldelem.*`, `ldelem.ref`, and `ldelem <type>`
    LdElemA(TypeId<'g>),
    StElem(TypeId<'g>),

    LdInd(TypeId<'g>), // covers `ldind.*`
    StInd(TypeId<'g>),
    LdObj(TypeId<'g>),
    StObj(TypeId<'g>),
    InitObj(TypeId<'g>),
    SizeOf(TypeId<'g>),

    CastClass(TypeId<'g>),
    IsInst(TypeId<'g>),
    Box(TypeId<'g>),
    Unbox(TypeId<'g>),
    UnboxAny(TypeId<'g>),
}

impl<'g> Instruction<'g> {
    /// Explicit branch targets (not including fall through)
    pub fn jump_targets(&self) -> &[usize] {
        match self {
            Instruction::Br(target)
            | Instruction::BrTrue(target)
            | Instruction::BrFalse(target)
            | Instruction::BranchCompare(_, target, _)
            | Instruction::Leave(target) => std::slice::from_ref(target),
            Instruction::Switch(targets) => targets,
            _ => &[],
        }
    }

    /// Can control continue on to the next instruction?
    pub fn falls_through(&self) -> bool {
        !matches!(
            self,
            Instruction::Br(_)
                | Instruction::Leave(_)
                | Instruction::Ret
                | Instruction::Throw
                | Instruction::Rethrow
                | Instruction::EndFinally
                | Instruction::EndFilter
        )
    }

    /// Mnemonic, for diagnostics
    pub fn mnemonic(&self) -> &'static str {
        match self {
            Instruction::Nop => "nop",
            Instruction::LdArg(_) => "ldarg",
            Instruction::LdArgA(_) => "ldarga",
            Instruction::StArg(_) => "starg",
            Instruction::LdLoc(_) => "ldloc",
            Instruction::LdLocA(_) => "ldloca",
            Instruction::StLoc(_) => "stloc",
            Instruction::LdNull => "ldnull",
            Instruction::LdcI4(_) => "ldc.i4",
            Instruction::LdcI8(_) => "ldc.i8",
            Instruction::LdcR4(_) => "ldc.r4",
            Instruction::LdcR8(_) => "ldc.r8",
            Instruction::LdStr(_) => "ldstr",
            Instruction::Dup => "dup",
            Instruction::Pop => "pop",
            Instruction::Call(_, _) => "call",
            Instruction::CallVirt(_, _) => "callvirt",
            Instruction::NewObj(_) => "newobj",
            Instruction::LdFtn(_) => "ldftn",
            Instruction::LdVirtFtn(_) => "ldvirtftn",
            Instruction::Ret => "ret",
            Instruction::Br(_) => "br",
            Instruction::BrTrue(_) => "brtrue",
            Instruction::BrFalse(_) => "brfalse",
            Instruction::BranchCompare(_, _, _) => "b<cond>",
            Instruction::Switch(_) => "switch",
            Instruction::Leave(_) => "leave",
            Instruction::Throw => "throw",
            Instruction::Rethrow => "rethrow",
            Instruction::EndFinally => "endfinally",
            Instruction::EndFilter => "endfilter",
            Instruction::Binary(_, _) => "<binop>",
            Instruction::Shift(_) => "<shift>",
            Instruction::Unary(_) => "<unop>",
            Instruction::Compare(_, _) => "c<cond>",
            Instruction::Conv(_, _) => "conv",
            Instruction::CkFinite => "ckfinite",
            Instruction::LdFld(_) => "ldfld",
            Instruction::LdFldA(_) => "ldflda",
            Instruction::StFld(_) => "stfld",
            Instruction::LdSFld(_) => "ldsfld",
            Instruction::LdSFldA(_) => "ldsflda",
            Instruction::StSFld(_) => "stsfld",
            Instruction::NewArr(_) => "newarr",
            Instruction::LdLen => "ldlen",
            Instruction::LdElem(_) => "ldelem",
            Instruction::LdElemA(_) => "ldelema",
            Instruction::StElem(_) => "stelem",
            Instruction::LdInd(_) => "ldind",
            Instruction::StInd(_) => "stind",
            Instruction::LdObj(_) => "ldobj",
            Instruction::StObj(_) => "stobj",
            Instruction::InitObj(_) => "initobj",
            Instruction::SizeOf(_) => "sizeof",
            Instruction::CastClass(_) => "castclass",
            Instruction::IsInst(_) => "isinst",
            Instruction::Box(_) => "box",
            Instruction::Unbox(_) => "unbox",
            Instruction::UnboxAny(_) => "unbox.any",
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn float_validity() {
        use BinaryOp::*;
        let none = InstructionFlags::empty();
        let ovf = InstructionFlags::OVERFLOW;
        let un = InstructionFlags::UNSIGNED;

        assert!(Add.is_float_valid(none));
        assert!(!Add.is_float_valid(ovf));
        assert!(Sub.is_float_valid(un), "unsigned alone doesn't matter for sub");
        assert!(Div.is_float_valid(none));
        assert!(!Div.is_float_valid(un));
        assert!(!Mul.is_float_valid(ovf | un));
        for op in [And, Or, Xor] {
            assert!(!op.is_float_valid(none), "{:?} is bitwise", op);
        }
    }

    #[test]
    fn control_flow() {
        let switch = Instruction::Switch(vec![3, 5, 7]);
        assert_eq!(switch.jump_targets(), &[3, 5, 7]);
        assert!(switch.falls_through());

        let leave = Instruction::Leave(4);
        assert_eq!(leave.jump_targets(), &[4]);
        assert!(!leave.falls_through());

        assert!(Instruction::BrFalse(2).falls_through());
        assert!(Instruction::Nop.jump_targets().is_empty());
        assert!(!Instruction::EndFinally.falls_through());
    }
}
