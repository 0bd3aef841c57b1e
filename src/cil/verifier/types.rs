use crate::cil::type_graph::{
    is_root, Assignable, CoreTypes, Primitive, TypeGraph, TypeHierarchy, TypeId, TypeKind,
};
use crate::cil::{Name, VerifierErrorKind};
use std::fmt;

/// Type of a value on the operand stack (or in a local, argument, or field)
///
/// A missing `type_id` is the type of `null`, which fits into any reference type. The `boxed` flag
/// only ever gets set for value types and enums (see [`TypeHierarchy::is_boxable`]), where it
/// distinguishes a heap reference to the value from the inline value itself.
#[derive(Copy, Clone)]
pub struct VerifiableType<'g> {
    pub type_id: Option<TypeId<'g>>,
    pub boxed: bool,
}

impl<'g> VerifiableType<'g> {
    /// Type of a value of the declared type (value types are inline)
    pub fn declared(type_id: TypeId<'g>) -> Self {
        VerifiableType {
            type_id: Some(type_id),
            boxed: false,
        }
    }

    /// Type of a heap reference to the type (only value types and enums actually get boxed)
    pub fn boxed(type_id: TypeId<'g>) -> Self {
        VerifiableType {
            type_id: Some(type_id),
            boxed: type_id.is_boxable(),
        }
    }

    pub fn null() -> Self {
        VerifiableType {
            type_id: None,
            boxed: false,
        }
    }

    pub fn is_null(&self) -> bool {
        self.type_id.is_none()
    }

    /// Is the underlying type a value type or enum (regardless of whether it is boxed)?
    pub fn is_boxable(&self) -> bool {
        self.type_id.map_or(false, |ty| ty.is_boxable())
    }

    /// Inline value type or enum
    pub fn is_unboxed_value(&self) -> bool {
        self.is_boxable() && !self.boxed
    }

    pub fn is_by_ref(&self) -> bool {
        self.type_id.map_or(false, |ty| ty.is_by_ref())
    }

    pub fn is_array(&self) -> bool {
        self.type_id.map_or(false, |ty| ty.is_array())
    }

    /// Object reference: `null`, a boxed value, or an instance of a reference type
    pub fn is_object_reference(&self) -> bool {
        match self.type_id {
            None => true,
            Some(ty) => self.boxed || !(ty.is_boxable() || ty.is_by_ref() || ty.is_void()),
        }
    }

    /// The "no value" type
    pub fn is_void(&self) -> bool {
        self.type_id.map_or(false, |ty| ty.is_void())
    }

    /// Inline primitive
    pub fn primitive(&self) -> Option<Primitive> {
        if self.boxed {
            None
        } else {
            self.type_id.and_then(|ty| ty.primitive())
        }
    }

    /// Element type of an array or managed pointer
    pub fn element_type(&self) -> Option<TypeId<'g>> {
        self.type_id.and_then(|ty| ty.element_type())
    }

    /// Replace an inline primitive with its strong representative (see
    /// [`Primitive::strong_normalize`])
    pub fn strong_normalize(self, core: &CoreTypes<'g>) -> Self {
        match self.primitive() {
            Some(primitive) => Self::declared(core.primitive(primitive.strong_normalize())),
            None => self,
        }
    }

    /// Replace an inline primitive with its weak representative (see
    /// [`Primitive::weak_normalize`])
    pub fn weak_normalize(self, core: &CoreTypes<'g>) -> Self {
        match self.primitive() {
            Some(primitive) => Self::declared(core.primitive(primitive.weak_normalize())),
            None => self,
        }
    }

    /// Can a value of type `source` be stored where `self` is expected?
    pub fn is_assignable_from(&self, source: &Self, core: &CoreTypes<'g>) -> bool {
        let target = self.strong_normalize(core);
        let source = source.strong_normalize(core);
        if target == source {
            return true;
        }

        let source_type = match source.type_id {
            None => return !target.is_unboxed_value() && !target.is_null(),
            Some(source_type) => source_type,
        };
        let target_type = match target.type_id {
            None => return false,
            Some(target_type) => target_type,
        };

        // Inline values never widen polymorphically
        if target.is_unboxed_value() || source.is_unboxed_value() {
            return false;
        }

        source_type.is_assignable(&target_type)
    }

    /// Can a value being stored to a location of this (primitive) type be stored without any
    /// implicit narrowing or widening?
    ///
    /// Locations that are not primitives fall back to regular assignability.
    pub fn is_storable_from(&self, source: &Self, core: &CoreTypes<'g>) -> bool {
        if self.primitive().is_some() {
            self.weak_normalize(core) == source.weak_normalize(core)
        } else {
            self.is_assignable_from(source, core)
        }
    }

    /// Least upper bound of two types, for use where control flow merges
    ///
    /// Unlike the other lattice operations, this may need to construct a new (array) type, so it
    /// needs the whole type graph.
    ///
    /// When an interface is involved and the two types share no interface, the result is
    /// `System.Object`.
    pub fn merge(&self, other: &Self, graph: &TypeGraph<'g>) -> Result<Self, VerifierErrorKind> {
        let core = graph.core();

        // `null` imposes no constraint, except that it can't become an inline value
        if self.is_null() || other.is_null() {
            let non_null = if self.is_null() { other } else { self };
            return if non_null.is_unboxed_value() {
                Err(incompatible(self, other))
            } else {
                Ok(*non_null)
            };
        }

        let type1 = self.weak_normalize(core);
        let type2 = other.weak_normalize(core);
        if type1 == type2 {
            return Ok(type1);
        }

        // Inline values, managed pointers, and void only merge with themselves
        let exact_only = |vtype: &Self| vtype.is_unboxed_value() || vtype.is_by_ref() || vtype.is_void();
        if exact_only(&type1) || exact_only(&type2) {
            return Err(incompatible(self, other));
        }

        let (ty1, ty2) = match (type1.type_id, type2.type_id) {
            (Some(ty1), Some(ty2)) => (ty1, ty2),
            _ => return Err(incompatible(self, other)),
        };

        // Arrays merge element-wise, as long as the elements are references
        if let (TypeKind::Array(elem1), TypeKind::Array(elem2)) = (ty1.kind, ty2.kind) {
            let elem1 = VerifiableType::declared(elem1);
            let elem2 = VerifiableType::declared(elem2);
            if elem1.is_unboxed_value() || elem2.is_unboxed_value() {
                return Ok(VerifiableType::declared(core.array));
            }
            let elem = elem1.merge(&elem2, graph)?;
            return match elem.type_id {
                Some(elem) => Ok(VerifiableType::declared(graph.array_of(elem))),
                None => Err(incompatible(self, other)),
            };
        }

        if ty1.is_interface() || ty2.is_interface() {
            return Ok(VerifiableType::declared(common_interface(ty1, ty2, core)));
        }

        common_ancestor(ty1, ty2)
            .map(VerifiableType::boxed)
            .ok_or_else(|| incompatible(self, other))
    }
}

/// First interface shared by both types, or `System.Object` if there is none
///
/// The search runs through the interfaces of whichever type has the smaller name first, so the
/// result doesn't depend on argument order.
fn common_interface<'g>(ty1: TypeId<'g>, ty2: TypeId<'g>, core: &CoreTypes<'g>) -> TypeId<'g> {
    let (first, second) = if ty2.name.as_str() < ty1.name.as_str() {
        (ty2, ty1)
    } else {
        (ty1, ty2)
    };
    let second_interfaces = second.all_interfaces();
    first
        .all_interfaces()
        .into_iter()
        .find(|iface1| {
            second_interfaces
                .iter()
                .any(|iface2| iface1.is_equivalent(*iface2))
        })
        .unwrap_or(core.object)
}

/// Last type on which the ancestor chains (read from the root down) still agree
fn common_ancestor<'g>(ty1: TypeId<'g>, ty2: TypeId<'g>) -> Option<TypeId<'g>> {
    let chain1 = ty1.ancestors();
    let chain2 = ty2.ancestors();
    if !chain1.first().map_or(false, |root| is_root(*root)) {
        return None;
    }
    chain1
        .iter()
        .zip(chain2.iter())
        .take_while(|(anc1, anc2)| anc1.is_equivalent(**anc2))
        .last()
        .map(|(anc1, _)| *anc1)
}

fn incompatible<'g>(type1: &VerifiableType<'g>, type2: &VerifiableType<'g>) -> VerifierErrorKind {
    VerifierErrorKind::IncompatibleMerge(format!("{:?}", type1), format!("{:?}", type2))
}

/// Types are equal when their boxing agrees and their handles are structurally equivalent
impl<'g> PartialEq for VerifiableType<'g> {
    fn eq(&self, other: &Self) -> bool {
        self.boxed == other.boxed
            && match (self.type_id, other.type_id) {
                (None, None) => true,
                (Some(ty1), Some(ty2)) => ty1.is_equivalent(ty2),
                _ => false,
            }
    }
}

impl<'g> Eq for VerifiableType<'g> {}

impl<'g> fmt::Debug for VerifiableType<'g> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.type_id {
            None => f.write_str("null"),
            Some(ty) if self.boxed => write!(f, "boxed {}", ty.name.as_str()),
            Some(ty) => f.write_str(ty.name.as_str()),
        }
    }
}

/// Category of a value as far as arithmetic is concerned
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum NumericCategory {
    /// 32-bit integers (and everything narrower)
    Int32,

    /// 64-bit integers
    Int64,

    /// Pointer-sized integers
    NativeInt,

    /// Floating point
    Float,
}

impl NumericCategory {
    pub fn of(vtype: &VerifiableType<'_>) -> Option<NumericCategory> {
        let category = match vtype.primitive()? {
            Primitive::Boolean
            | Primitive::Char
            | Primitive::SByte
            | Primitive::Byte
            | Primitive::Int16
            | Primitive::UInt16
            | Primitive::Int32
            | Primitive::UInt32 => NumericCategory::Int32,
            Primitive::Int64 | Primitive::UInt64 => NumericCategory::Int64,
            Primitive::IntPtr | Primitive::UIntPtr => NumericCategory::NativeInt,
            Primitive::Single | Primitive::Double => NumericCategory::Float,
        };
        Some(category)
    }

    /// Result of combining two operands of a binary operator
    ///
    /// `float_valid` says whether the operator is allowed to operate on floating point values.
    pub fn binary_result(
        left: NumericCategory,
        right: NumericCategory,
        float_valid: bool,
    ) -> Option<NumericCategory> {
        use NumericCategory::*;
        match (left, right) {
            (Int32, Int32) => Some(Int32),
            (Int64, Int64) => Some(Int64),
            (NativeInt, NativeInt) | (NativeInt, Int32) | (Int32, NativeInt) => Some(NativeInt),
            (Float, Float) if float_valid => Some(Float),
            _ => None,
        }
    }

    /// Stack type that represents this category
    pub fn stack_type<'g>(self, core: &CoreTypes<'g>) -> VerifiableType<'g> {
        VerifiableType::declared(match self {
            NumericCategory::Int32 => core.int32,
            NumericCategory::Int64 => core.int64,
            NumericCategory::NativeInt => core.intptr,
            NumericCategory::Float => core.double,
        })
    }
}

/// Merge two stacks element-wise (they must have the same height)
pub fn merge_stacks<'g>(
    stack1: &[VerifiableType<'g>],
    stack2: &[VerifiableType<'g>],
    graph: &TypeGraph<'g>,
) -> Result<Vec<VerifiableType<'g>>, VerifierErrorKind> {
    if stack1.len() != stack2.len() {
        return Err(VerifierErrorKind::StackHeightMismatch(
            stack1.len(),
            stack2.len(),
        ));
    }
    stack1
        .iter()
        .zip(stack2)
        .map(|(type1, type2)| type1.merge(type2, graph))
        .collect()
}

/// Is every slot of `general` assignable from the matching slot of `specific`?
pub fn is_stack_more_general<'g>(
    general: &[VerifiableType<'g>],
    specific: &[VerifiableType<'g>],
    core: &CoreTypes<'g>,
) -> bool {
    general.len() == specific.len()
        && general
            .iter()
            .zip(specific)
            .all(|(general, specific)| general.is_assignable_from(specific, core))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::cil::type_graph::{TypeGraphArenas, TypeId};
    use crate::cil::TypeName;

    struct Fixture<'g> {
        shape: TypeId<'g>,
        circle: TypeId<'g>,
        square: TypeId<'g>,
        drawable: TypeId<'g>,
        sizable: TypeId<'g>,
        point: TypeId<'g>,
        color: TypeId<'g>,
    }

    fn fixture<'g>(graph: &TypeGraph<'g>) -> Fixture<'g> {
        let core = graph.core();
        let drawable = graph.add_interface(TypeName::from_str("Shapes.IDrawable").unwrap());
        let sizable = graph.add_interface(TypeName::from_str("Shapes.ISizable").unwrap());
        let shape = graph.add_class(TypeName::from_str("Shapes.Shape").unwrap(), core.object);
        let circle = graph.add_class(TypeName::from_str("Shapes.Circle").unwrap(), shape);
        let square = graph.add_class(TypeName::from_str("Shapes.Square").unwrap(), shape);
        graph.add_interface_impl(circle, sizable);
        graph.add_interface_impl(circle, drawable);
        graph.add_interface_impl(square, drawable);
        graph.add_interface_impl(square, sizable);
        let point = graph.add_value_type(TypeName::from_str("Geometry.Point").unwrap());
        let color = graph.add_enum(TypeName::from_str("Colors.Color").unwrap());
        Fixture {
            shape,
            circle,
            square,
            drawable,
            sizable,
            point,
            color,
        }
    }

    fn sample_types<'g>(graph: &TypeGraph<'g>, fix: &Fixture<'g>) -> Vec<VerifiableType<'g>> {
        let core = graph.core();
        let mut types = vec![VerifiableType::null()];
        for primitive in Primitive::ALL {
            types.push(VerifiableType::declared(core.primitive(primitive)));
            types.push(VerifiableType::boxed(core.primitive(primitive)));
        }
        for ty in [
            core.object,
            core.string,
            core.array,
            core.enum_base,
            core.value_type,
            fix.shape,
            fix.circle,
            fix.square,
            fix.drawable,
            fix.sizable,
        ] {
            types.push(VerifiableType::declared(ty));
        }
        for ty in [fix.point, fix.color] {
            types.push(VerifiableType::declared(ty));
            types.push(VerifiableType::boxed(ty));
        }
        for elem in [core.int32, core.string, fix.circle, fix.square, fix.point] {
            types.push(VerifiableType::declared(graph.array_of(elem)));
        }
        types.push(VerifiableType::declared(graph.by_ref_of(core.int32)));
        types.push(VerifiableType::declared(graph.by_ref_of(fix.point)));
        types
    }

    #[test]
    fn assignability_is_reflexive() {
        let arenas = TypeGraphArenas::new();
        let graph = TypeGraph::new(&arenas);
        let fix = fixture(&graph);
        for ty in sample_types(&graph, &fix) {
            assert!(
                ty.is_assignable_from(&ty, graph.core()),
                "{:?} should be assignable from itself",
                ty
            );
        }
    }

    #[test]
    fn merge_is_commutative_and_sound() {
        let arenas = TypeGraphArenas::new();
        let graph = TypeGraph::new(&arenas);
        let core = graph.core();
        let fix = fixture(&graph);
        let types = sample_types(&graph, &fix);

        for type1 in &types {
            for type2 in &types {
                let forward = type1.merge(type2, &graph);
                let backward = type2.merge(type1, &graph);
                match (forward, backward) {
                    (Ok(forward), Ok(backward)) => {
                        assert_eq!(forward, backward, "merge of {:?} and {:?}", type1, type2);
                        assert!(
                            forward.is_assignable_from(type1, core),
                            "merge {:?} of {:?} and {:?} must accept the first",
                            forward,
                            type1,
                            type2
                        );
                        assert!(
                            forward.is_assignable_from(type2, core),
                            "merge {:?} of {:?} and {:?} must accept the second",
                            forward,
                            type1,
                            type2
                        );
                    }
                    (Err(_), Err(_)) => (),
                    (forward, backward) => panic!(
                        "merge of {:?} and {:?} disagrees: {:?} vs {:?}",
                        type1, type2, forward, backward
                    ),
                }
            }
        }
    }

    #[test]
    fn merges() {
        let arenas = TypeGraphArenas::new();
        let graph = TypeGraph::new(&arenas);
        let core = graph.core();
        let fix = fixture(&graph);
        let declared = VerifiableType::declared;

        let circle = declared(fix.circle);
        let square = declared(fix.square);
        assert_eq!(circle.merge(&square, &graph), Ok(declared(fix.shape)));
        assert_eq!(
            circle.merge(&VerifiableType::null(), &graph),
            Ok(circle),
            "null merges into anything"
        );

        let circles = declared(graph.array_of(fix.circle));
        let squares = declared(graph.array_of(fix.square));
        assert_eq!(
            circles.merge(&squares, &graph),
            Ok(declared(graph.array_of(fix.shape))),
            "reference arrays merge element-wise"
        );
        let ints = declared(graph.array_of(core.int32));
        assert_eq!(
            ints.merge(&circles, &graph),
            Ok(declared(core.array)),
            "value arrays degrade to System.Array"
        );

        // Circle declares ISizable first, Square declares IDrawable first
        let drawable = declared(fix.drawable);
        assert_eq!(circle.merge(&drawable, &graph), Ok(drawable));
        assert_eq!(
            declared(fix.sizable).merge(&drawable, &graph),
            Ok(declared(core.object)),
            "unrelated interfaces meet at System.Object"
        );

        assert_eq!(
            declared(core.byte).merge(&declared(core.sbyte), &graph),
            Ok(declared(core.sbyte)),
            "same-width integers merge"
        );
        assert!(declared(core.int32)
            .merge(&declared(core.double), &graph)
            .is_err());
        assert!(declared(core.int32)
            .merge(&declared(core.int64), &graph)
            .is_err());
        assert!(declared(fix.point)
            .merge(&VerifiableType::boxed(fix.point), &graph)
            .is_err());
        assert_eq!(
            VerifiableType::boxed(fix.point).merge(&VerifiableType::boxed(fix.color), &graph),
            Ok(declared(core.value_type)),
        );
    }

    #[test]
    fn assignability() {
        let arenas = TypeGraphArenas::new();
        let graph = TypeGraph::new(&arenas);
        let core = graph.core();
        let fix = fixture(&graph);
        let declared = VerifiableType::declared;

        let object = declared(core.object);
        assert!(object.is_assignable_from(&VerifiableType::null(), core));
        assert!(object.is_assignable_from(&VerifiableType::boxed(fix.point), core));
        assert!(!object.is_assignable_from(&declared(fix.point), core));
        assert!(!declared(fix.point).is_assignable_from(&VerifiableType::null(), core));

        assert!(declared(core.int32).is_assignable_from(&declared(core.byte), core));
        assert!(declared(core.intptr).is_assignable_from(&declared(core.int32), core));
        assert!(declared(core.single).is_assignable_from(&declared(core.double), core));
        assert!(!declared(core.int32).is_assignable_from(&declared(core.int64), core));

        assert!(declared(core.enum_base).is_assignable_from(&VerifiableType::boxed(fix.color), core));
        assert!(declared(core.array).is_assignable_from(&declared(graph.array_of(fix.point)), core));

        // Storing through memory is stricter
        assert!(!declared(core.byte).is_storable_from(&declared(core.int32), core));
        assert!(declared(core.byte).is_storable_from(&declared(core.boolean), core));
        assert!(declared(core.uint32).is_storable_from(&declared(core.int32), core));
    }

    #[test]
    fn stacks() {
        let arenas = TypeGraphArenas::new();
        let graph = TypeGraph::new(&arenas);
        let core = graph.core();
        let fix = fixture(&graph);
        let declared = VerifiableType::declared;

        let stack1 = vec![declared(core.int32), declared(fix.circle)];
        let stack2 = vec![declared(core.int32), declared(fix.square)];
        assert_eq!(
            merge_stacks(&stack1, &stack2, &graph),
            Ok(vec![declared(core.int32), declared(fix.shape)])
        );
        assert_eq!(
            merge_stacks(&stack1, &stack1[..1], &graph),
            Err(VerifierErrorKind::StackHeightMismatch(2, 1))
        );

        let general = vec![declared(core.int32), declared(fix.shape)];
        assert!(is_stack_more_general(&general, &stack1, core));
        assert!(!is_stack_more_general(&stack1, &general, core));
        assert!(!is_stack_more_general(&general, &stack1[..1], core));
    }
}
