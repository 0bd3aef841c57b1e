//! Catalog of the types, methods and fields a method body may refer to
//!
//! The verifier never looks at metadata tables directly. Instead, whoever builds the method body
//! also populates a [`TypeGraph`] with the types it mentions, and the verifier only queries that
//! graph through the capabilities in [`TypeHierarchy`] (ancestor chains, interface lists,
//! value-type predicates, element types, and structural equivalence).
//!
//! Data lives in arenas owned by [`TypeGraphArenas`], so handles ([`TypeId`], [`MethodId`],
//! [`FieldId`]) are plain references that can be copied around freely for the lifetime `'g` of
//! those arenas.

use super::{CallKind, MemberName, MethodSignature, Name, TypeName, VerifiableType};
use crate::util::RefId;
use elsa::map::FrozenMap;
use elsa::FrozenVec;
use std::fmt;
use std::fmt::Debug;
use typed_arena::Arena;

mod core_types;
mod hierarchy;

pub use core_types::*;
pub use hierarchy::*;

pub type TypeId<'g> = RefId<'g, TypeData<'g>>;
pub type MethodId<'g> = RefId<'g, MethodData<'g>>;
pub type FieldId<'g> = RefId<'g, FieldData<'g>>;

pub struct TypeGraphArenas<'g> {
    type_arena: Arena<TypeData<'g>>,
    method_arena: Arena<MethodData<'g>>,
    field_arena: Arena<FieldData<'g>>,
}

impl<'g> TypeGraphArenas<'g> {
    pub fn new() -> Self {
        TypeGraphArenas {
            type_arena: Arena::new(),
            method_arena: Arena::new(),
            field_arena: Arena::new(),
        }
    }
}

impl<'g> Default for TypeGraphArenas<'g> {
    fn default() -> Self {
        Self::new()
    }
}

/// Named types, plus the core library types every method body implicitly depends on
///
/// Constructed types (arrays and managed pointers) are deliberately not interned: asking for
/// `System.Int32[]` twice gives two distinct handles. Anything comparing types must therefore go
/// through [`TypeHierarchy::is_equivalent`] rather than handle identity.
pub struct TypeGraph<'g> {
    arenas: &'g TypeGraphArenas<'g>,
    types: FrozenMap<&'g TypeName, Box<TypeId<'g>>>,
    core: CoreTypes<'g>,
}

impl<'g> TypeGraph<'g> {
    /// New graph containing only the core library types
    pub fn new(arenas: &'g TypeGraphArenas<'g>) -> Self {
        let types = FrozenMap::new();
        let core = CoreTypes::add_to_graph(|data| Self::insert_named(arenas, &types, data));
        TypeGraph {
            arenas,
            types,
            core,
        }
    }

    fn insert_named(
        arenas: &'g TypeGraphArenas<'g>,
        types: &FrozenMap<&'g TypeName, Box<TypeId<'g>>>,
        data: TypeData<'g>,
    ) -> TypeId<'g> {
        let data: &'g TypeData<'g> = arenas.type_arena.alloc(data);
        let type_id = RefId(data);
        types.insert(&data.name, Box::new(type_id));
        type_id
    }

    /// Core library types
    pub fn core(&self) -> &CoreTypes<'g> {
        &self.core
    }

    /// Find a named type
    pub fn lookup_type(&self, name: &TypeName) -> Option<TypeId<'g>> {
        self.types.get(name).copied()
    }

    /// Add a new named type to the graph
    ///
    /// Names are unique: adding a type whose name is already taken returns the existing type.
    pub fn add_type(&self, data: TypeData<'g>) -> TypeId<'g> {
        if let Some(existing) = self.lookup_type(&data.name) {
            return existing;
        }
        Self::insert_named(self.arenas, &self.types, data)
    }

    /// Add a reference type deriving from `base`
    pub fn add_class(&self, name: TypeName, base: TypeId<'g>) -> TypeId<'g> {
        self.add_type(TypeData::new(name, TypeKind::Class, Some(base)))
    }

    /// Add an interface
    pub fn add_interface(&self, name: TypeName) -> TypeId<'g> {
        self.add_type(TypeData::new(name, TypeKind::Interface, None))
    }

    /// Add a (non-primitive) value type deriving from `System.ValueType`
    pub fn add_value_type(&self, name: TypeName) -> TypeId<'g> {
        let base = self.core.value_type;
        self.add_type(TypeData::new(name, TypeKind::ValueType(None), Some(base)))
    }

    /// Add an enum deriving from `System.Enum`
    pub fn add_enum(&self, name: TypeName) -> TypeId<'g> {
        let base = self.core.enum_base;
        self.add_type(TypeData::new(name, TypeKind::Enum, Some(base)))
    }

    /// Record that a type implements (or an interface extends) another interface
    pub fn add_interface_impl(&self, implementor: TypeId<'g>, interface: TypeId<'g>) {
        implementor.get().interfaces.push(interface);
    }

    /// Add a method to the graph and to its declaring type
    pub fn add_method(&self, method: MethodData<'g>) -> MethodId<'g> {
        let data: &'g MethodData<'g> = self.arenas.method_arena.alloc(method);
        let method_id = RefId(data);
        data.declaring_type.get().methods.push(method_id);
        method_id
    }

    /// Add a field to the graph and to its declaring type
    pub fn add_field(&self, field: FieldData<'g>) -> FieldId<'g> {
        let data: &'g FieldData<'g> = self.arenas.field_arena.alloc(field);
        let field_id = RefId(data);
        data.declaring_type.get().fields.push(field_id);
        field_id
    }

    /// Single-dimensional, zero-based array of `element`
    pub fn array_of(&self, element: TypeId<'g>) -> TypeId<'g> {
        let data = TypeData::new(
            element.name.array_of(),
            TypeKind::Array(element),
            Some(self.core.array),
        );
        RefId(self.arenas.type_arena.alloc(data))
    }

    /// Managed pointer to a location of type `element`
    pub fn by_ref_of(&self, element: TypeId<'g>) -> TypeId<'g> {
        let data = TypeData::new(element.name.by_ref_of(), TypeKind::ByRef(element), None);
        RefId(self.arenas.type_arena.alloc(data))
    }
}

/// Numeric (and boolean/character) types that have dedicated stack semantics
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum Primitive {
    Boolean,
    Char,
    SByte,
    Byte,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Int64,
    UInt64,
    IntPtr,
    UIntPtr,
    Single,
    Double,
}

impl Primitive {
    pub const ALL: [Primitive; 14] = [
        Primitive::Boolean,
        Primitive::Char,
        Primitive::SByte,
        Primitive::Byte,
        Primitive::Int16,
        Primitive::UInt16,
        Primitive::Int32,
        Primitive::UInt32,
        Primitive::Int64,
        Primitive::UInt64,
        Primitive::IntPtr,
        Primitive::UIntPtr,
        Primitive::Single,
        Primitive::Double,
    ];

    pub fn type_name(self) -> TypeName {
        match self {
            Primitive::Boolean => TypeName::BOOLEAN,
            Primitive::Char => TypeName::CHAR,
            Primitive::SByte => TypeName::SBYTE,
            Primitive::Byte => TypeName::BYTE,
            Primitive::Int16 => TypeName::INT16,
            Primitive::UInt16 => TypeName::UINT16,
            Primitive::Int32 => TypeName::INT32,
            Primitive::UInt32 => TypeName::UINT32,
            Primitive::Int64 => TypeName::INT64,
            Primitive::UInt64 => TypeName::UINT64,
            Primitive::IntPtr => TypeName::INTPTR,
            Primitive::UIntPtr => TypeName::UINTPTR,
            Primitive::Single => TypeName::SINGLE,
            Primitive::Double => TypeName::DOUBLE,
        }
    }

    /// Collapse onto one representative per stack category
    ///
    /// All 32-bit integers _and_ native integers become `Int32`, 64-bit integers become `Int64`,
    /// and both floating point types become `Double`. This is the normalization used when
    /// checking assignability.
    pub fn strong_normalize(self) -> Primitive {
        match self {
            Primitive::Boolean
            | Primitive::Char
            | Primitive::SByte
            | Primitive::Byte
            | Primitive::Int16
            | Primitive::UInt16
            | Primitive::Int32
            | Primitive::UInt32
            | Primitive::IntPtr
            | Primitive::UIntPtr => Primitive::Int32,
            Primitive::Int64 | Primitive::UInt64 => Primitive::Int64,
            Primitive::Single | Primitive::Double => Primitive::Double,
        }
    }

    /// Collapse unsigned, character, and boolean variants onto the signed type of the same width
    ///
    /// This is the normalization used when merging and when storing through memory.
    pub fn weak_normalize(self) -> Primitive {
        match self {
            Primitive::Boolean | Primitive::Byte | Primitive::SByte => Primitive::SByte,
            Primitive::Char | Primitive::UInt16 | Primitive::Int16 => Primitive::Int16,
            Primitive::UInt32 | Primitive::Int32 => Primitive::Int32,
            Primitive::UInt64 | Primitive::Int64 => Primitive::Int64,
            Primitive::UIntPtr | Primitive::IntPtr => Primitive::IntPtr,
            Primitive::Single => Primitive::Single,
            Primitive::Double => Primitive::Double,
        }
    }
}

/// What sort of type is this?
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum TypeKind<'g> {
    /// Reference type (including `System.Object`, `System.ValueType`, and `System.Enum`)
    Class,

    Interface,

    /// Value type, which may be one of the primitives
    ValueType(Option<Primitive>),

    Enum,

    /// The "no value" return type
    Void,

    /// Array of the element type
    Array(TypeId<'g>),

    /// Managed pointer to a location of the element type
    ByRef(TypeId<'g>),
}

pub struct TypeData<'g> {
    /// Name of the type
    pub name: TypeName,

    pub kind: TypeKind<'g>,

    /// Base type is missing for `System.Object`, interfaces, and managed pointers
    pub base: Option<TypeId<'g>>,

    /// Interfaces implemented (or extended, for an interface), in declaration order
    pub interfaces: FrozenVec<TypeId<'g>>,

    /// Methods
    pub methods: FrozenVec<MethodId<'g>>,

    /// Fields
    pub fields: FrozenVec<FieldId<'g>>,
}

impl<'g> TypeData<'g> {
    pub fn new(name: TypeName, kind: TypeKind<'g>, base: Option<TypeId<'g>>) -> TypeData<'g> {
        TypeData {
            name,
            kind,
            base,
            interfaces: FrozenVec::new(),
            methods: FrozenVec::new(),
            fields: FrozenVec::new(),
        }
    }

    /// Find a method declared directly on this type
    pub fn find_method(&'g self, name: &MemberName) -> Option<MethodId<'g>> {
        (0..self.methods.len())
            .filter_map(|idx| self.methods.get(idx))
            .find(|method| &method.name == name)
            .map(RefId)
    }
}

impl<'g> Debug for TypeData<'g> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name.as_str())
    }
}

pub struct MethodData<'g> {
    /// Type on which the method is declared
    pub declaring_type: TypeId<'g>,

    /// Name of the method
    pub name: MemberName,

    /// Declared parameter types, excluding any receiver
    pub parameters: Vec<TypeId<'g>>,

    /// Declared return type (`System.Void` when nothing is returned)
    pub return_type: TypeId<'g>,

    /// Is this a static method?
    pub is_static: bool,

    /// Is this a virtual method?
    pub is_virtual: bool,
}

impl<'g> MethodData<'g> {
    /// Instance constructors are invoked via `newobj` (or `call` from a derived constructor)
    pub fn is_constructor(&self) -> bool {
        !self.is_static && self.name == MemberName::CTOR
    }

    /// View of the method's signature when invoked with the given call kind
    pub fn signature(&self, call_kind: CallKind) -> MethodSignature<'g> {
        MethodSignature {
            declaring_type: self.declaring_type,
            parameters: self
                .parameters
                .iter()
                .map(|param| VerifiableType::declared(*param))
                .collect(),
            return_type: VerifiableType::declared(self.return_type),
            is_static: self.is_static,
            call_kind,
        }
    }
}

impl<'g> Debug for MethodData<'g> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}::{}(",
            self.declaring_type.name.as_str(),
            self.name.as_str()
        )?;
        for (idx, param) in self.parameters.iter().enumerate() {
            if idx > 0 {
                f.write_str(", ")?;
            }
            f.write_str(param.name.as_str())?;
        }
        write!(f, "): {}", self.return_type.name.as_str())
    }
}

pub struct FieldData<'g> {
    /// Type on which the field is declared
    pub declaring_type: TypeId<'g>,

    /// Name of the field
    pub name: MemberName,

    /// Type of the field
    pub field_type: TypeId<'g>,

    /// Is this a static field?
    pub is_static: bool,
}

impl<'g> Debug for FieldData<'g> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}::{}: {}",
            self.declaring_type.name.as_str(),
            self.name.as_str(),
            self.field_type.name.as_str(),
        )
    }
}
