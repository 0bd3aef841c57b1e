use std::borrow::Cow;
use std::fmt::{Debug, Display, Error as FmtError, Formatter};

/// Names of methods and fields (eg. `Invoke`, `.ctor`, `m_value`)
#[derive(Clone, Hash, Eq, PartialEq)]
pub struct MemberName(Cow<'static, str>);

/// Namespace-qualified names of types (eg. `System.Collections.IList`)
///
/// Constructed types (arrays and managed pointers) get names like `System.Int32[]` or
/// `System.Int32&`, derived from their element type.
#[derive(Clone, Hash, Eq, PartialEq)]
pub struct TypeName(Cow<'static, str>);

pub trait Name: Sized {
    /// Check if a string would be a valid name
    fn check_valid(name: impl AsRef<str>) -> Result<(), String>;

    /// Extract the raw underlying string data
    fn as_cow(&self) -> &Cow<'static, str>;

    /// Extract the raw underlying string name
    fn as_str(&self) -> &str {
        self.as_cow().as_ref()
    }

    /// Try to construct a name from a string
    fn from_string(name: String) -> Result<Self, String>;

    /// Try to construct a name from a string slice
    fn from_str(name: &str) -> Result<Self, String> {
        Self::from_string(name.to_owned())
    }
}

impl Name for MemberName {
    fn check_valid(name: impl AsRef<str>) -> Result<(), String> {
        let name = name.as_ref();
        if name.is_empty() {
            Err(String::from("Member name is empty"))
        } else if name.contains(&['/', ';', '[', ']', '&'][..]) {
            Err(format!("Member name '{}' contains an illegal character", name))
        } else {
            Ok(())
        }
    }

    fn as_cow(&self) -> &Cow<'static, str> {
        &self.0
    }

    fn from_string(name: String) -> Result<Self, String> {
        Self::check_valid(&name)?;
        Ok(MemberName(Cow::Owned(name)))
    }
}

impl Name for TypeName {
    fn check_valid(name: impl AsRef<str>) -> Result<(), String> {
        let name = name.as_ref();
        if name.is_empty() {
            return Err(String::from("Type name is empty"));
        }
        for segment in name.split('.') {
            if segment.is_empty() {
                return Err(format!("Type name '{}' has an empty namespace segment", name));
            }
            if segment.contains(&['/', ';', '[', ']', '&', '*'][..]) {
                return Err(format!("Type name '{}' contains an illegal character", name));
            }
        }
        Ok(())
    }

    fn as_cow(&self) -> &Cow<'static, str> {
        &self.0
    }

    fn from_string(name: String) -> Result<Self, String> {
        Self::check_valid(&name)?;
        Ok(TypeName(Cow::Owned(name)))
    }
}

impl Debug for MemberName {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), FmtError> {
        f.write_str(self.0.as_ref())
    }
}

impl Debug for TypeName {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), FmtError> {
        f.write_str(self.0.as_ref())
    }
}

impl Display for TypeName {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), FmtError> {
        f.write_str(self.0.as_ref())
    }
}

impl MemberName {
    const fn name(value: &'static str) -> MemberName {
        MemberName(Cow::Borrowed(value))
    }

    /// Instance constructor
    pub const CTOR: Self = Self::name(".ctor");

    /// Method through which delegates are called
    pub const INVOKE: Self = Self::name("Invoke");
}

impl TypeName {
    const fn name(value: &'static str) -> TypeName {
        TypeName(Cow::Borrowed(value))
    }

    /// Name of an array whose elements have this name
    pub fn array_of(&self) -> TypeName {
        TypeName(Cow::Owned(format!("{}[]", self.as_str())))
    }

    /// Name of a managed pointer to a location with this name
    pub fn by_ref_of(&self) -> TypeName {
        TypeName(Cow::Owned(format!("{}&", self.as_str())))
    }

    pub const OBJECT: Self = Self::name("System.Object");
    pub const VALUE_TYPE: Self = Self::name("System.ValueType");
    pub const ENUM: Self = Self::name("System.Enum");
    pub const ARRAY: Self = Self::name("System.Array");
    pub const DELEGATE: Self = Self::name("System.Delegate");
    pub const MULTICAST_DELEGATE: Self = Self::name("System.MulticastDelegate");
    pub const STRING: Self = Self::name("System.String");
    pub const EXCEPTION: Self = Self::name("System.Exception");
    pub const VOID: Self = Self::name("System.Void");

    pub const BOOLEAN: Self = Self::name("System.Boolean");
    pub const CHAR: Self = Self::name("System.Char");
    pub const SBYTE: Self = Self::name("System.SByte");
    pub const BYTE: Self = Self::name("System.Byte");
    pub const INT16: Self = Self::name("System.Int16");
    pub const UINT16: Self = Self::name("System.UInt16");
    pub const INT32: Self = Self::name("System.Int32");
    pub const UINT32: Self = Self::name("System.UInt32");
    pub const INT64: Self = Self::name("System.Int64");
    pub const UINT64: Self = Self::name("System.UInt64");
    pub const INTPTR: Self = Self::name("System.IntPtr");
    pub const UINTPTR: Self = Self::name("System.UIntPtr");
    pub const SINGLE: Self = Self::name("System.Single");
    pub const DOUBLE: Self = Self::name("System.Double");
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn type_names() {
        assert!(TypeName::from_str("System.Collections.IList").is_ok());
        assert!(TypeName::from_str("Point").is_ok());
        assert!(TypeName::from_str("").is_err(), "empty name");
        assert!(TypeName::from_str("System..Object").is_err(), "empty segment");
        assert!(TypeName::from_str("System.Int32[]").is_err(), "constructed name");
        assert_eq!(TypeName::INT32.array_of().as_str(), "System.Int32[]");
        assert_eq!(TypeName::INT32.by_ref_of().as_str(), "System.Int32&");
    }

    #[test]
    fn member_names() {
        assert!(MemberName::from_str("get_Item").is_ok());
        assert!(MemberName::from_str(".ctor").is_ok());
        assert!(MemberName::from_str("a&b").is_err());
        assert_eq!(MemberName::CTOR.as_str(), ".ctor");
    }
}
