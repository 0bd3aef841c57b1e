use super::{Primitive, TypeData, TypeId, TypeKind};
use crate::cil::TypeName;

/// Types from the core library that the verification rules refer to directly
pub struct CoreTypes<'g> {
    pub object: TypeId<'g>,
    pub value_type: TypeId<'g>,
    pub enum_base: TypeId<'g>,
    pub array: TypeId<'g>,
    pub delegate: TypeId<'g>,
    pub multicast_delegate: TypeId<'g>,
    pub string: TypeId<'g>,
    pub exception: TypeId<'g>,
    pub void: TypeId<'g>,

    pub boolean: TypeId<'g>,
    pub char: TypeId<'g>,
    pub sbyte: TypeId<'g>,
    pub byte: TypeId<'g>,
    pub int16: TypeId<'g>,
    pub uint16: TypeId<'g>,
    pub int32: TypeId<'g>,
    pub uint32: TypeId<'g>,
    pub int64: TypeId<'g>,
    pub uint64: TypeId<'g>,
    pub intptr: TypeId<'g>,
    pub uintptr: TypeId<'g>,
    pub single: TypeId<'g>,
    pub double: TypeId<'g>,
}

impl<'g> CoreTypes<'g> {
    pub(super) fn add_to_graph(add_type: impl Fn(TypeData<'g>) -> TypeId<'g>) -> CoreTypes<'g> {
        let object = add_type(TypeData::new(TypeName::OBJECT, TypeKind::Class, None));
        let class = |name: TypeName, base: TypeId<'g>| {
            add_type(TypeData::new(name, TypeKind::Class, Some(base)))
        };

        let value_type = class(TypeName::VALUE_TYPE, object);
        let enum_base = class(TypeName::ENUM, value_type);
        let array = class(TypeName::ARRAY, object);
        let delegate = class(TypeName::DELEGATE, object);
        let multicast_delegate = class(TypeName::MULTICAST_DELEGATE, delegate);
        let string = class(TypeName::STRING, object);
        let exception = class(TypeName::EXCEPTION, object);
        let void = add_type(TypeData::new(TypeName::VOID, TypeKind::Void, Some(value_type)));

        let primitive = |primitive: Primitive| {
            add_type(TypeData::new(
                primitive.type_name(),
                TypeKind::ValueType(Some(primitive)),
                Some(value_type),
            ))
        };

        CoreTypes {
            object,
            value_type,
            enum_base,
            array,
            delegate,
            multicast_delegate,
            string,
            exception,
            void,
            boolean: primitive(Primitive::Boolean),
            char: primitive(Primitive::Char),
            sbyte: primitive(Primitive::SByte),
            byte: primitive(Primitive::Byte),
            int16: primitive(Primitive::Int16),
            uint16: primitive(Primitive::UInt16),
            int32: primitive(Primitive::Int32),
            uint32: primitive(Primitive::UInt32),
            int64: primitive(Primitive::Int64),
            uint64: primitive(Primitive::UInt64),
            intptr: primitive(Primitive::IntPtr),
            uintptr: primitive(Primitive::UIntPtr),
            single: primitive(Primitive::Single),
            double: primitive(Primitive::Double),
        }
    }

    /// Handle for a primitive type
    pub fn primitive(&self, primitive: Primitive) -> TypeId<'g> {
        match primitive {
            Primitive::Boolean => self.boolean,
            Primitive::Char => self.char,
            Primitive::SByte => self.sbyte,
            Primitive::Byte => self.byte,
            Primitive::Int16 => self.int16,
            Primitive::UInt16 => self.uint16,
            Primitive::Int32 => self.int32,
            Primitive::UInt32 => self.uint32,
            Primitive::Int64 => self.int64,
            Primitive::UInt64 => self.uint64,
            Primitive::IntPtr => self.intptr,
            Primitive::UIntPtr => self.uintptr,
            Primitive::Single => self.single,
            Primitive::Double => self.double,
        }
    }
}
