use super::{Primitive, TypeId, TypeKind};
use crate::cil::TypeName;
use crate::util::RefId;
use std::collections::HashSet;

/// Capabilities the verifier needs from a type catalog
///
/// The type lattice only ever inspects types through these queries, so it doesn't care how the
/// catalog represents or deduplicates its types.
pub trait TypeHierarchy: Copy + Sized {
    /// Same type, treating separately constructed arrays and managed pointers with equivalent
    /// element types as the same
    fn is_equivalent(self, other: Self) -> bool;

    /// Chain of base types, starting at the root and ending with the type itself
    fn ancestors(self) -> Vec<Self>;

    /// The type itself (if it is an interface) followed by every interface it implements,
    /// directly or through a base type or another interface, in declaration order
    fn all_interfaces(self) -> Vec<Self>;

    /// Value types and enums can exist either inline or boxed
    fn is_boxable(self) -> bool;

    fn is_enum(self) -> bool;

    fn is_interface(self) -> bool;

    fn is_array(self) -> bool;

    fn is_by_ref(self) -> bool;

    fn is_void(self) -> bool;

    /// Element type of an array or managed pointer
    fn element_type(self) -> Option<Self>;

    /// Primitive numeric type, if this is one
    fn primitive(self) -> Option<Primitive>;

    fn has_name(self, name: &TypeName) -> bool;
}

impl<'g> TypeHierarchy for TypeId<'g> {
    fn is_equivalent(self, other: Self) -> bool {
        if self == other {
            return true;
        }
        match (self.kind, other.kind) {
            (TypeKind::Array(elem1), TypeKind::Array(elem2))
            | (TypeKind::ByRef(elem1), TypeKind::ByRef(elem2)) => elem1.is_equivalent(elem2),
            _ => false,
        }
    }

    fn ancestors(self) -> Vec<Self> {
        let mut chain = vec![self];
        let mut next = self.get().base;
        while let Some(base) = next {
            chain.push(base);
            next = base.get().base;
        }
        chain.reverse();
        chain
    }

    fn all_interfaces(self) -> Vec<Self> {
        let mut found = vec![];
        if self.is_interface() {
            found.push(self);
        }
        for ty in self.ancestors().into_iter().rev() {
            collect_interfaces(ty, &mut found);
        }
        found
    }

    fn is_boxable(self) -> bool {
        matches!(self.kind, TypeKind::ValueType(_) | TypeKind::Enum)
    }

    fn is_enum(self) -> bool {
        matches!(self.kind, TypeKind::Enum)
    }

    fn is_interface(self) -> bool {
        matches!(self.kind, TypeKind::Interface)
    }

    fn is_array(self) -> bool {
        matches!(self.kind, TypeKind::Array(_))
    }

    fn is_by_ref(self) -> bool {
        matches!(self.kind, TypeKind::ByRef(_))
    }

    fn is_void(self) -> bool {
        matches!(self.kind, TypeKind::Void)
    }

    fn element_type(self) -> Option<Self> {
        match self.kind {
            TypeKind::Array(elem) | TypeKind::ByRef(elem) => Some(elem),
            _ => None,
        }
    }

    fn primitive(self) -> Option<Primitive> {
        match self.kind {
            TypeKind::ValueType(primitive) => primitive,
            _ => None,
        }
    }

    fn has_name(self, name: &TypeName) -> bool {
        &self.name == name
    }
}

fn collect_interfaces<'g>(ty: TypeId<'g>, found: &mut Vec<TypeId<'g>>) {
    for interface in &ty.get().interfaces {
        let interface = RefId(interface);
        if !found.contains(&interface) {
            found.push(interface);
            collect_interfaces(interface, found);
        }
    }
}

/// Subtyping relationship between types
pub trait Assignable {
    /// Is the first type assignable to the second?
    fn is_assignable(&self, super_type: &Self) -> bool;
}

/// Nominal subtyping: a traversal of base types (and, if needed, interfaces) in the graph
///
/// This is only about type handles. Whether a value is boxed or not is the lattice's business.
impl<'g> Assignable for TypeId<'g> {
    fn is_assignable(&self, super_type: &TypeId<'g>) -> bool {
        let sub_type = *self;
        let super_type = *super_type;
        if sub_type.is_equivalent(super_type) {
            return true;
        }

        match (sub_type.kind, super_type.kind) {
            // Covariance of arrays, but only over reference elements
            (TypeKind::Array(elem1), TypeKind::Array(elem2)) => {
                return is_reference_element(elem1)
                    && is_reference_element(elem2)
                    && elem1.is_assignable(&elem2);
            }

            // Managed pointers only match exactly
            (TypeKind::ByRef(_), _) | (_, TypeKind::ByRef(_)) => return false,
            (TypeKind::Void, _) | (_, TypeKind::Void) => return false,

            _ => (),
        }

        // `System.Enum` and `System.Array` stand in for every enum and every array
        if super_type.has_name(&TypeName::ENUM) && sub_type.is_enum() {
            return true;
        }
        if super_type.has_name(&TypeName::ARRAY) && sub_type.is_array() {
            return true;
        }

        // Interfaces don't have a base type, yet they are still objects
        if is_root(super_type) {
            return true;
        }

        let mut supertypes_to_visit: Vec<TypeId<'g>> = vec![sub_type];
        let mut dont_revisit: HashSet<TypeId<'g>> = HashSet::new();
        dont_revisit.insert(sub_type);

        // Optimization: if the super type is a class, then skip visiting interfaces
        let super_is_class = !super_type.is_interface();

        while let Some(ty) = supertypes_to_visit.pop() {
            if ty.is_equivalent(super_type) {
                return true;
            }
            let data = ty.get();
            if let Some(base) = data.base {
                if dont_revisit.insert(base) {
                    supertypes_to_visit.push(base);
                }
            }
            if !super_is_class {
                for interface in &data.interfaces {
                    let interface = RefId(interface);
                    if dont_revisit.insert(interface) {
                        supertypes_to_visit.push(interface);
                    }
                }
            }
        }

        false
    }
}

/// Root of the class hierarchy (`System.Object`)
pub fn is_root<'g>(ty: TypeId<'g>) -> bool {
    ty.kind == TypeKind::Class && ty.base.is_none()
}

/// Array elements that are stored as references (and so allow covariance)
fn is_reference_element<'g>(ty: TypeId<'g>) -> bool {
    !ty.is_boxable() && !ty.is_by_ref() && !ty.is_void()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::cil::type_graph::{TypeGraph, TypeGraphArenas};
    use crate::cil::Name;

    #[test]
    fn simple_classes() {
        let arenas = TypeGraphArenas::new();
        let graph = TypeGraph::new(&arenas);
        let core = graph.core();

        let object = &core.object;
        let string = &core.string;

        assert!(object.is_assignable(object), "System.Object <: System.Object");
        assert!(string.is_assignable(string), "System.String <: System.String");
        assert!(string.is_assignable(object), "System.String <: System.Object");
        assert!(!object.is_assignable(string), "System.Object </: System.String");
    }

    #[test]
    fn transitive_classes_and_interfaces() {
        let arenas = TypeGraphArenas::new();
        let graph = TypeGraph::new(&arenas);
        let core = graph.core();

        let enumerable = graph.add_interface(TypeName::from_str("System.IEnumerable").unwrap());
        let list = graph.add_interface(TypeName::from_str("System.IList").unwrap());
        graph.add_interface_impl(list, enumerable);

        let base = graph.add_class(TypeName::from_str("Shapes.Shape").unwrap(), core.object);
        graph.add_interface_impl(base, list);
        let derived = graph.add_class(TypeName::from_str("Shapes.Circle").unwrap(), base);

        assert!(derived.is_assignable(&base), "Circle <: Shape");
        assert!(derived.is_assignable(&enumerable), "Circle <: IEnumerable");
        assert!(list.is_assignable(&core.object), "IList <: Object");
        assert!(!base.is_assignable(&derived), "Shape </: Circle");
        assert!(!enumerable.is_assignable(&list), "IEnumerable </: IList");

        assert_eq!(
            derived.all_interfaces(),
            vec![list, enumerable],
            "interfaces inherited through the base type"
        );
        assert_eq!(
            derived.ancestors(),
            vec![core.object, base, derived],
            "ancestors start at the root"
        );
    }

    #[test]
    fn constructed_types() {
        let arenas = TypeGraphArenas::new();
        let graph = TypeGraph::new(&arenas);
        let core = graph.core();

        let ints1 = graph.array_of(core.int32);
        let ints2 = graph.array_of(core.int32);
        let longs = graph.array_of(core.int64);
        let strings = graph.array_of(core.string);
        let objects = graph.array_of(core.object);

        assert_ne!(ints1, ints2, "constructed types are not interned");
        assert!(ints1.is_equivalent(ints2), "int[] ~ int[]");
        assert!(!ints1.is_equivalent(longs), "int[] !~ long[]");
        assert!(
            graph.by_ref_of(core.int32).is_equivalent(graph.by_ref_of(core.int32)),
            "int& ~ int&"
        );

        assert!(strings.is_assignable(&objects), "string[] <: object[]");
        assert!(!ints1.is_assignable(&objects), "int[] </: object[]");
        assert!(ints1.is_assignable(&core.array), "int[] <: System.Array");
        assert!(ints1.is_assignable(&core.object), "int[] <: System.Object");
    }

    #[test]
    fn enums_and_value_types() {
        let arenas = TypeGraphArenas::new();
        let graph = TypeGraph::new(&arenas);
        let core = graph.core();

        let color = graph.add_enum(TypeName::from_str("Colors.Color").unwrap());
        let point = graph.add_value_type(TypeName::from_str("Geometry.Point").unwrap());

        assert!(color.is_boxable() && point.is_boxable() && core.int32.is_boxable());
        assert!(!core.object.is_boxable() && !core.value_type.is_boxable());
        assert!(color.is_assignable(&core.enum_base), "Color <: System.Enum");
        assert!(point.is_assignable(&core.value_type), "Point <: System.ValueType");
        assert!(!point.is_assignable(&core.enum_base), "Point </: System.Enum");
    }
}
