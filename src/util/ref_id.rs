use stable_deref_trait::StableDeref;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Deref;

/// Handle to arena-allocated data, compared and hashed by address
///
/// Two handles are equal only if they point at the very same allocation. Data that happens to look
/// the same (eg. two separately constructed `T[]` types) is _not_ equal under this identity, which
/// is why the type lattice has its own notion of structural equivalence.
pub struct RefId<'a, T: ?Sized>(pub &'a T);

impl<'a, T: ?Sized> RefId<'a, T> {
    /// Underlying reference, with the full arena lifetime
    pub fn get(self) -> &'a T {
        self.0
    }
}

impl<'a, T: ?Sized> Clone for RefId<'a, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<'a, T: ?Sized> Copy for RefId<'a, T> {}

impl<'a, T: ?Sized> Hash for RefId<'a, T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (self.0 as *const T as *const u8).hash(state)
    }
}

impl<'a, 'b, T: ?Sized> PartialEq<RefId<'b, T>> for RefId<'a, T> {
    fn eq(&self, other: &RefId<'b, T>) -> bool {
        std::ptr::eq(
            self.0 as *const T as *const u8,
            other.0 as *const T as *const u8,
        )
    }
}

impl<'a, T: ?Sized> Eq for RefId<'a, T> {}

impl<'a, T: ?Sized> Deref for RefId<'a, T> {
    type Target = T;

    fn deref(&self) -> &T {
        self.0
    }
}

/// Identity handles render as whatever they point to
impl<'a, T: ?Sized + fmt::Debug> fmt::Debug for RefId<'a, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

unsafe impl<'a, T: ?Sized> StableDeref for RefId<'a, T> {}

#[cfg(test)]
mod test {
    use super::RefId;

    #[test]
    fn identity_not_contents() {
        let first = String::from("System.Int32[]");
        let second = String::from("System.Int32[]");

        assert_eq!(RefId(&first), RefId(&first), "same allocation");
        assert_ne!(
            RefId(&first),
            RefId(&second),
            "equal contents in different allocations"
        );
    }
}
