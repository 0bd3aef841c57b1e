use super::{NumericCategory, VerifierSettings};
use crate::cil::type_graph::{Assignable, FieldId, MethodId, TypeGraph, TypeHierarchy, TypeId};
use crate::cil::{
    CallKind, Instruction, InstructionFlags, MemberName, MethodBody, ShiftOp, UnaryOp,
    VerifiableType, VerifierErrorKind,
};
use std::collections::HashSet;
use std::fmt::Debug;

/// Everything about the method being verified that instructions may need to look up
pub struct MethodContext<'a, 'g> {
    pub graph: &'a TypeGraph<'g>,
    pub body: &'a MethodBody<'g>,
    pub settings: &'a VerifierSettings,

    /// Types of arguments, including the receiver for instance methods
    pub arguments: Vec<VerifiableType<'g>>,

    /// Instructions that can be reached other than by falling through from the one before
    pub jump_targets: HashSet<usize>,
}

impl<'a, 'g> MethodContext<'a, 'g> {
    pub fn new(
        graph: &'a TypeGraph<'g>,
        body: &'a MethodBody<'g>,
        settings: &'a VerifierSettings,
    ) -> Self {
        MethodContext {
            graph,
            body,
            settings,
            arguments: body.signature.argument_types(graph),
            jump_targets: jump_targets(body),
        }
    }

    fn local(&self, idx: u16) -> Result<VerifiableType<'g>, VerifierErrorKind> {
        self.body
            .locals
            .get(idx as usize)
            .map(|local| VerifiableType::declared(*local))
            .ok_or(VerifierErrorKind::InvalidIndex(idx as usize))
    }

    fn argument(&self, idx: u16) -> Result<VerifiableType<'g>, VerifierErrorKind> {
        self.arguments
            .get(idx as usize)
            .copied()
            .ok_or(VerifierErrorKind::InvalidIndex(idx as usize))
    }

    fn by_ref(&self, vtype: VerifiableType<'g>) -> Result<VerifiableType<'g>, VerifierErrorKind> {
        match vtype.type_id {
            Some(ty) if !vtype.boxed => Ok(VerifiableType::declared(self.graph.by_ref_of(ty))),
            _ => Err(invalid_type("a location type", &vtype)),
        }
    }
}

fn jump_targets(body: &MethodBody<'_>) -> HashSet<usize> {
    let branches = body
        .instructions
        .iter()
        .flat_map(|instruction| instruction.jump_targets().iter().copied());
    let handlers = body.exception_regions.iter().flat_map(|region| {
        std::iter::once(region.handler_start).chain(region.filter_start)
    });
    branches.chain(handlers).collect()
}

/// Abstract operand stack at a point in the method body
///
/// The top of the stack is at the end.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Frame<'g> {
    pub stack: Vec<VerifiableType<'g>>,
}

impl<'g> Frame<'g> {
    pub fn new(stack: Vec<VerifiableType<'g>>) -> Frame<'g> {
        Frame { stack }
    }

    /// Update the frame to reflect the effects of the instruction at the given index
    ///
    /// This doesn't check anything about exception regions or where control goes next.
    pub fn verify_instruction(
        &mut self,
        index: usize,
        ctx: &MethodContext<'_, 'g>,
    ) -> Result<(), VerifierErrorKind> {
        let instruction = ctx
            .body
            .instructions
            .get(index)
            .ok_or(VerifierErrorKind::InvalidIndex(index))?;
        verify_instruction(&mut self.stack, ctx, index, instruction)
    }
}

fn verify_instruction<'g>(
    stack: &mut Vec<VerifiableType<'g>>,
    ctx: &MethodContext<'_, 'g>,
    index: usize,
    instruction: &Instruction<'g>,
) -> Result<(), VerifierErrorKind> {
    use Instruction::*;

    let graph = ctx.graph;
    let core = graph.core();
    let declared = VerifiableType::declared;

    match instruction {
        Nop => (),

        LdArg(idx) => stack.push(ctx.argument(*idx)?),
        LdArgA(idx) => stack.push(ctx.by_ref(ctx.argument(*idx)?)?),
        StArg(idx) => pop_expecting_type(stack, &ctx.argument(*idx)?, ctx)?,
        LdLoc(idx) => stack.push(ctx.local(*idx)?),
        LdLocA(idx) => stack.push(ctx.by_ref(ctx.local(*idx)?)?),
        StLoc(idx) => pop_expecting_type(stack, &ctx.local(*idx)?, ctx)?,

        LdNull => stack.push(VerifiableType::null()),
        LdcI4(_) => stack.push(declared(core.int32)),
        LdcI8(_) => stack.push(declared(core.int64)),
        LdcR4(_) | LdcR8(_) => stack.push(declared(core.double)),
        LdStr(_) => stack.push(declared(core.string)),

        Dup => {
            let top = pop(stack)?;
            stack.push(top);
            stack.push(top);
        }
        Pop => {
            pop(stack)?;
        }

        Call(method, flags) => {
            verify_call(stack, ctx, *method, CallKind::Direct)?;
            check_tail_call(ctx, index, *flags)?;
        }
        CallVirt(method, flags) => {
            if method.is_static {
                return Err(VerifierErrorKind::InvalidMember(format!(
                    "callvirt on static {:?}",
                    method
                )));
            }
            verify_call(stack, ctx, *method, CallKind::Virtual)?;
            check_tail_call(ctx, index, *flags)?;
        }
        NewObj(method) => verify_new_object(stack, ctx, index, *method)?,
        LdFtn(_) => stack.push(declared(core.intptr)),
        LdVirtFtn(method) => {
            if method.is_static {
                return Err(VerifierErrorKind::InvalidMember(format!(
                    "ldvirtftn on static {:?}",
                    method
                )));
            }
            let receiver = VerifiableType::boxed(method.declaring_type);
            pop_expecting_type(stack, &receiver, ctx)?;
            stack.push(declared(core.intptr));
        }

        Ret => {
            let signature = &ctx.body.signature;
            if signature.returns_value() {
                pop_expecting_type(stack, &signature.return_type, ctx)?;
            }
            expect_empty(stack)?;
        }

        Br(_) => (),
        Leave(_) | EndFinally => stack.clear(),
        BrTrue(_) | BrFalse(_) => {
            let value = pop(stack)?;
            let is_integer = matches!(
                NumericCategory::of(&value),
                Some(NumericCategory::Int32 | NumericCategory::Int64 | NumericCategory::NativeInt)
            );
            if !is_integer && !value.is_object_reference() {
                return Err(invalid_type("an integer or object reference", &value));
            }
        }
        BranchCompare(_, _, _) => {
            let right = pop(stack)?;
            let left = pop(stack)?;
            check_comparison(&left, &right)?;
        }
        Switch(_) => pop_expecting_category(stack, &[NumericCategory::Int32])?,
        Throw => {
            let exception = pop(stack)?;
            if !declared(core.object).is_assignable_from(&exception, core) {
                return Err(invalid_type("an object reference", &exception));
            }
        }
        Rethrow => (),
        EndFilter => {
            pop_expecting_category(stack, &[NumericCategory::Int32])?;
            expect_empty(stack)?;
        }

        Binary(op, flags) => {
            let right = pop(stack)?;
            let left = pop(stack)?;
            let result = arithmetic_result(&left, &right, op.is_float_valid(*flags))?;
            stack.push(result.stack_type(core));
        }
        Shift(op) => {
            let amount = pop(stack)?;
            let value = pop(stack)?;
            let value_category = match NumericCategory::of(&value) {
                Some(category) if category != NumericCategory::Float => category,
                _ => return Err(shift_mismatch(*op, &value, &amount)),
            };
            match NumericCategory::of(&amount) {
                Some(NumericCategory::Int32 | NumericCategory::NativeInt) => (),
                _ => return Err(shift_mismatch(*op, &value, &amount)),
            }
            stack.push(value_category.stack_type(core));
        }
        Unary(op) => {
            let value = pop(stack)?;
            let category = match (op, NumericCategory::of(&value)) {
                (UnaryOp::Neg, Some(category)) => category,
                (UnaryOp::Not, Some(category)) if category != NumericCategory::Float => category,
                _ => return Err(invalid_type("a numeric value", &value)),
            };
            stack.push(category.stack_type(core));
        }
        Compare(op, _) => {
            let right = pop(stack)?;
            let left = pop(stack)?;
            check_comparison(&left, &right).map_err(|err| {
                log::debug!("{:?} on {:?} and {:?}", op, left, right);
                err
            })?;
            stack.push(declared(core.int32));
        }
        Conv(target, _) => {
            let value = pop(stack)?;
            if NumericCategory::of(&value).is_none() {
                return Err(invalid_type("a numeric value", &value));
            }
            let target = declared(core.primitive(*target));
            match NumericCategory::of(&target) {
                Some(category) => stack.push(category.stack_type(core)),
                None => return Err(invalid_type("a numeric type", &target)),
            }
        }
        CkFinite => {
            pop_expecting_category(stack, &[NumericCategory::Float])?;
            stack.push(declared(core.double));
        }

        LdFld(field) => {
            expect_instance_field(*field)?;
            pop_field_receiver(stack, ctx, *field, true)?;
            stack.push(declared(field.field_type));
        }
        LdFldA(field) => {
            expect_instance_field(*field)?;
            pop_field_receiver(stack, ctx, *field, false)?;
            stack.push(declared(graph.by_ref_of(field.field_type)));
        }
        StFld(field) => {
            expect_instance_field(*field)?;
            pop_storable(stack, &declared(field.field_type), ctx)?;
            pop_field_receiver(stack, ctx, *field, false)?;
        }
        LdSFld(field) => {
            expect_static_field(*field)?;
            stack.push(declared(field.field_type));
        }
        LdSFldA(field) => {
            expect_static_field(*field)?;
            stack.push(declared(graph.by_ref_of(field.field_type)));
        }
        StSFld(field) => {
            expect_static_field(*field)?;
            pop_storable(stack, &declared(field.field_type), ctx)?;
        }

        NewArr(element) => {
            pop_expecting_category(stack, &[NumericCategory::Int32, NumericCategory::NativeInt])?;
            stack.push(declared(graph.array_of(*element)));
        }
        LdLen => {
            pop_array(stack)?;
            stack.push(declared(core.intptr));
        }
        LdElem(element) => {
            pop_expecting_category(stack, &[NumericCategory::Int32, NumericCategory::NativeInt])?;
            let loaded = match pop_array(stack)? {
                Some(actual) => load_from_location(actual, *element, ctx)?,
                None => declared(*element),
            };
            stack.push(loaded);
        }
        LdElemA(element) => {
            pop_expecting_category(stack, &[NumericCategory::Int32, NumericCategory::NativeInt])?;
            if let Some(actual) = pop_array(stack)? {
                expect_same_location(actual, *element, ctx)?;
            }
            stack.push(declared(graph.by_ref_of(*element)));
        }
        StElem(element) => {
            pop_storable(stack, &declared(*element), ctx)?;
            pop_expecting_category(stack, &[NumericCategory::Int32, NumericCategory::NativeInt])?;
            if let Some(actual) = pop_array(stack)? {
                store_to_location(actual, *element, ctx)?;
            }
        }

        LdInd(element) => {
            let actual = pop_by_ref(stack)?;
            stack.push(load_from_location(actual, *element, ctx)?);
        }
        StInd(element) => {
            pop_storable(stack, &declared(*element), ctx)?;
            let actual = pop_by_ref(stack)?;
            store_to_location(actual, *element, ctx)?;
        }
        LdObj(ty) => {
            let actual = pop_by_ref(stack)?;
            expect_same_location(actual, *ty, ctx)?;
            stack.push(declared(*ty));
        }
        StObj(ty) => {
            pop_storable(stack, &declared(*ty), ctx)?;
            let actual = pop_by_ref(stack)?;
            expect_same_location(actual, *ty, ctx)?;
        }
        InitObj(ty) => {
            let actual = pop_by_ref(stack)?;
            expect_same_location(actual, *ty, ctx)?;
        }
        SizeOf(_) => stack.push(declared(core.int32)),

        CastClass(ty) | IsInst(ty) => {
            pop_object_reference(stack)?;
            stack.push(VerifiableType::boxed(*ty));
        }
        Box(ty) => {
            if !ty.is_boxable() {
                return Err(invalid_type("a value type", &declared(*ty)));
            }
            let value = pop(stack)?;
            if !value.is_unboxed_value() || !declared(*ty).is_assignable_from(&value, core) {
                return Err(invalid_type(declared(*ty), &value));
            }
            stack.push(VerifiableType::boxed(*ty));
        }
        Unbox(ty) => {
            if !ty.is_boxable() {
                return Err(invalid_type("a value type", &declared(*ty)));
            }
            pop_object_reference(stack)?;
            stack.push(declared(graph.by_ref_of(*ty)));
        }
        UnboxAny(ty) => {
            pop_object_reference(stack)?;
            stack.push(if ty.is_boxable() {
                declared(*ty)
            } else {
                VerifiableType::boxed(*ty)
            });
        }
    }

    Ok(())
}

/// Pop the arguments (including any receiver) of a call and push its result
fn verify_call<'g>(
    stack: &mut Vec<VerifiableType<'g>>,
    ctx: &MethodContext<'_, 'g>,
    method: MethodId<'g>,
    call_kind: CallKind,
) -> Result<(), VerifierErrorKind> {
    let signature = method.signature(call_kind);
    for argument in signature.argument_types(ctx.graph).iter().rev() {
        pop_expecting_type(stack, argument, ctx)?;
    }
    if signature.returns_value() {
        stack.push(signature.return_type);
    }
    Ok(())
}

fn check_tail_call(
    ctx: &MethodContext<'_, '_>,
    index: usize,
    flags: InstructionFlags,
) -> Result<(), VerifierErrorKind> {
    if flags.contains(InstructionFlags::TAIL)
        && ctx.settings.check_tail_calls
        && !matches!(ctx.body.instructions.get(index + 1), Some(Instruction::Ret))
    {
        Err(VerifierErrorKind::MissingTailCallReturn)
    } else {
        Ok(())
    }
}

/// Constructing an object pops the constructor's parameters (but no receiver) and pushes the new
/// object, unboxed even for value types
fn verify_new_object<'g>(
    stack: &mut Vec<VerifiableType<'g>>,
    ctx: &MethodContext<'_, 'g>,
    index: usize,
    constructor: MethodId<'g>,
) -> Result<(), VerifierErrorKind> {
    if !constructor.is_constructor() {
        return Err(VerifierErrorKind::InvalidMember(format!(
            "newobj on non-constructor {:?}",
            constructor
        )));
    }

    let constructed = constructor.declaring_type;
    if is_delegate(constructed, ctx) {
        verify_new_delegate(stack, ctx, index, constructed)?;
    } else {
        for parameter in constructor.signature(CallKind::Direct).parameters.iter().rev() {
            pop_expecting_type(stack, parameter, ctx)?;
        }
    }

    stack.push(VerifiableType::declared(constructed));
    Ok(())
}

fn is_delegate<'g>(ty: TypeId<'g>, ctx: &MethodContext<'_, 'g>) -> bool {
    let core = ctx.graph.core();
    !ty.is_equivalent(core.delegate)
        && !ty.is_equivalent(core.multicast_delegate)
        && ty.is_assignable(&core.delegate)
}

/// Delegates are only ever constructed from the stack left by `ldftn` or `dup; ldvirtftn`, and
/// the function pointer must be to a method that has exactly the delegate's signature
fn verify_new_delegate<'g>(
    stack: &mut Vec<VerifiableType<'g>>,
    ctx: &MethodContext<'_, 'g>,
    index: usize,
    delegate: TypeId<'g>,
) -> Result<(), VerifierErrorKind> {
    let core = ctx.graph.core();
    let bad = |msg: String| VerifierErrorKind::BadDelegateConstruction(msg);

    pop_expecting_category(stack, &[NumericCategory::NativeInt])?;
    let receiver = pop(stack)?;

    let previous = |offset: usize| {
        index
            .checked_sub(offset)
            .and_then(|idx| ctx.body.instructions.get(idx))
    };
    let target = match (previous(2), previous(1)) {
        (_, Some(Instruction::LdFtn(target))) => *target,
        (Some(Instruction::Dup), Some(Instruction::LdVirtFtn(target))) => *target,
        _ => {
            return Err(bad(String::from(
                "constructor must follow `ldftn` or `dup; ldvirtftn`",
            )))
        }
    };

    // The function pointer must come straight from the load, not from a merge
    if ctx.jump_targets.contains(&index) || ctx.jump_targets.contains(&(index - 1)) {
        return Err(bad(String::from(
            "delegate construction pattern is the target of a jump",
        )));
    }

    let invoke = delegate
        .get()
        .find_method(&MemberName::INVOKE)
        .ok_or_else(|| bad(format!("{:?} has no Invoke method", delegate)))?;
    if !signatures_match(invoke, target) {
        return Err(bad(format!(
            "{:?} does not match {:?}",
            target, invoke
        )));
    }

    if target.is_static {
        if !receiver.is_null() {
            return Err(bad(format!(
                "static {:?} bound to {:?} instead of null",
                target, receiver
            )));
        }
    } else if !VerifiableType::boxed(target.declaring_type).is_assignable_from(&receiver, core) {
        return Err(bad(format!(
            "{:?} can't be bound to {:?}",
            receiver, target
        )));
    }

    Ok(())
}

/// Do two methods have exactly the same return and parameter types?
fn signatures_match<'g>(method1: MethodId<'g>, method2: MethodId<'g>) -> bool {
    method1.return_type.is_equivalent(method2.return_type)
        && method1.parameters.len() == method2.parameters.len()
        && method1
            .parameters
            .iter()
            .zip(method2.parameters.iter())
            .all(|(param1, param2)| param1.is_equivalent(*param2))
}

fn expect_instance_field(field: FieldId<'_>) -> Result<(), VerifierErrorKind> {
    if field.is_static {
        Err(VerifierErrorKind::InvalidMember(format!(
            "instance access to static {:?}",
            field
        )))
    } else {
        Ok(())
    }
}

fn expect_static_field(field: FieldId<'_>) -> Result<(), VerifierErrorKind> {
    if field.is_static {
        Ok(())
    } else {
        Err(VerifierErrorKind::InvalidMember(format!(
            "static access to instance {:?}",
            field
        )))
    }
}

/// Pop the object whose field is accessed
///
/// Fields of value types are accessed through a managed pointer, or (only for loads) directly on
/// the unboxed value. Fields of reference types are accessed through an object reference.
fn pop_field_receiver<'g>(
    stack: &mut Vec<VerifiableType<'g>>,
    ctx: &MethodContext<'_, 'g>,
    field: FieldId<'g>,
    allow_unboxed_value: bool,
) -> Result<(), VerifierErrorKind> {
    let core = ctx.graph.core();
    let receiver = pop(stack)?;
    let declaring = field.declaring_type;
    let expected = VerifiableType::declared(declaring);

    let valid = if declaring.is_boxable() {
        (allow_unboxed_value && receiver == expected)
            || receiver
                .element_type()
                .filter(|_| receiver.is_by_ref())
                .map_or(false, |element| element.is_equivalent(declaring))
    } else {
        !receiver.is_by_ref() && expected.is_assignable_from(&receiver, core)
    };

    if valid {
        Ok(())
    } else {
        Err(invalid_type(expected, &receiver))
    }
}

/// Load from an array element or managed pointer whose actual location type is `actual`, using an
/// instruction that expects location type `expected`
fn load_from_location<'g>(
    actual: TypeId<'g>,
    expected: TypeId<'g>,
    ctx: &MethodContext<'_, 'g>,
) -> Result<VerifiableType<'g>, VerifierErrorKind> {
    let core = ctx.graph.core();
    let actual = VerifiableType::declared(actual);
    let expected = VerifiableType::declared(expected);
    if actual.is_boxable() || expected.is_boxable() {
        if expected.is_storable_from(&actual, core) && actual.is_storable_from(&expected, core) {
            Ok(expected)
        } else {
            Err(invalid_type(expected, &actual))
        }
    } else if expected.is_assignable_from(&actual, core) {
        Ok(actual)
    } else {
        Err(invalid_type(expected, &actual))
    }
}

/// Store into an array element or managed pointer whose actual location type is `actual`, using
/// an instruction that expects location type `expected`
///
/// Reference arrays are covariant, so storing a reference is checked at runtime.
fn store_to_location<'g>(
    actual: TypeId<'g>,
    expected: TypeId<'g>,
    ctx: &MethodContext<'_, 'g>,
) -> Result<(), VerifierErrorKind> {
    let actual_type = VerifiableType::declared(actual);
    let expected_type = VerifiableType::declared(expected);
    if actual_type.is_boxable() || expected_type.is_boxable() {
        expect_same_location(actual, expected, ctx)
    } else if actual_type.is_object_reference() && expected_type.is_object_reference() {
        Ok(())
    } else {
        Err(invalid_type(expected_type, &actual_type))
    }
}

/// Location types must match exactly, up to signedness of primitives
fn expect_same_location<'g>(
    actual: TypeId<'g>,
    expected: TypeId<'g>,
    ctx: &MethodContext<'_, 'g>,
) -> Result<(), VerifierErrorKind> {
    let core = ctx.graph.core();
    let actual = VerifiableType::declared(actual);
    let expected = VerifiableType::declared(expected);
    if actual.weak_normalize(core) == expected.weak_normalize(core) {
        Ok(())
    } else {
        Err(invalid_type(expected, &actual))
    }
}

fn arithmetic_result(
    left: &VerifiableType<'_>,
    right: &VerifiableType<'_>,
    float_valid: bool,
) -> Result<NumericCategory, VerifierErrorKind> {
    NumericCategory::of(left)
        .zip(NumericCategory::of(right))
        .and_then(|(left, right)| NumericCategory::binary_result(left, right, float_valid))
        .ok_or_else(|| {
            VerifierErrorKind::ArithmeticMismatch(format!("{:?}", left), format!("{:?}", right))
        })
}

/// Comparisons work on pairs of object references, pairs of managed pointers, or numbers that
/// could be combined arithmetically
fn check_comparison(
    left: &VerifiableType<'_>,
    right: &VerifiableType<'_>,
) -> Result<(), VerifierErrorKind> {
    if (left.is_object_reference() && right.is_object_reference())
        || (left.is_by_ref() && right.is_by_ref())
    {
        Ok(())
    } else {
        arithmetic_result(left, right, true).map(|_| ())
    }
}

fn shift_mismatch(
    op: ShiftOp,
    value: &VerifiableType<'_>,
    amount: &VerifiableType<'_>,
) -> VerifierErrorKind {
    log::debug!("{:?} of {:?} by {:?}", op, value, amount);
    VerifierErrorKind::ArithmeticMismatch(format!("{:?}", value), format!("{:?}", amount))
}

fn invalid_type(expected: impl Debug, found: &VerifiableType<'_>) -> VerifierErrorKind {
    log::debug!("Expected {:?} but found {:?}", expected, found);
    VerifierErrorKind::InvalidType(format!("{:?}", expected), format!("{:?}", found))
}

fn pop<'g>(stack: &mut Vec<VerifiableType<'g>>) -> Result<VerifiableType<'g>, VerifierErrorKind> {
    stack.pop().ok_or(VerifierErrorKind::EmptyStack)
}

fn expect_empty(stack: &[VerifiableType<'_>]) -> Result<(), VerifierErrorKind> {
    if stack.is_empty() {
        Ok(())
    } else {
        Err(VerifierErrorKind::NonEmptyStackAtExit(stack.len()))
    }
}

/// Pop a value that must be assignable to the expected type
fn pop_expecting_type<'g>(
    stack: &mut Vec<VerifiableType<'g>>,
    expected: &VerifiableType<'g>,
    ctx: &MethodContext<'_, 'g>,
) -> Result<(), VerifierErrorKind> {
    let actual = pop(stack)?;
    if expected.is_assignable_from(&actual, ctx.graph.core()) {
        Ok(())
    } else {
        Err(invalid_type(expected, &actual))
    }
}

/// Pop a value being stored through memory into a location of the expected type
fn pop_storable<'g>(
    stack: &mut Vec<VerifiableType<'g>>,
    expected: &VerifiableType<'g>,
    ctx: &MethodContext<'_, 'g>,
) -> Result<(), VerifierErrorKind> {
    let actual = pop(stack)?;
    if expected.is_storable_from(&actual, ctx.graph.core()) {
        Ok(())
    } else {
        Err(invalid_type(expected, &actual))
    }
}

fn pop_expecting_category(
    stack: &mut Vec<VerifiableType<'_>>,
    categories: &[NumericCategory],
) -> Result<(), VerifierErrorKind> {
    let actual = pop(stack)?;
    match NumericCategory::of(&actual) {
        Some(category) if categories.contains(&category) => Ok(()),
        _ => Err(invalid_type(categories, &actual)),
    }
}

fn pop_object_reference(stack: &mut Vec<VerifiableType<'_>>) -> Result<(), VerifierErrorKind> {
    let actual = pop(stack)?;
    if actual.is_object_reference() {
        Ok(())
    } else {
        Err(invalid_type("an object reference", &actual))
    }
}

/// Pop an array, returning its element type (or nothing if it is `null`)
fn pop_array<'g>(
    stack: &mut Vec<VerifiableType<'g>>,
) -> Result<Option<TypeId<'g>>, VerifierErrorKind> {
    let actual = pop(stack)?;
    if actual.is_null() {
        Ok(None)
    } else if actual.is_array() {
        Ok(actual.element_type())
    } else {
        Err(invalid_type("an array", &actual))
    }
}

/// Pop a managed pointer, returning the type of the location it points to
fn pop_by_ref<'g>(stack: &mut Vec<VerifiableType<'g>>) -> Result<TypeId<'g>, VerifierErrorKind> {
    let actual = pop(stack)?;
    match actual.element_type() {
        Some(element) if actual.is_by_ref() => Ok(element),
        _ => Err(invalid_type("a managed pointer", &actual)),
    }
}
