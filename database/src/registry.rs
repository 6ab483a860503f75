use enum_primitive_derive::Primitive;

/// We use `u8::MAX` as a separator. Through the [`DatabaseStorePrefixes`] enum we make sure
/// it is not used as a prefix as well
pub const SEPARATOR: u8 = u8::MAX;

#[derive(Primitive, Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum DatabaseStorePrefixes {
    // ---- Forest ----
    /// Node rows keyed by node id
    Nodes = 1,
    /// Tree membership sets bucketed by root id
    TreeMembers = 2,

    // ---- Separator ----
    /// Reserved as a separator
    Separator = SEPARATOR,
}

impl From<DatabaseStorePrefixes> for Vec<u8> {
    fn from(value: DatabaseStorePrefixes) -> Self {
        [value as u8].to_vec()
    }
}

impl From<DatabaseStorePrefixes> for u8 {
    fn from(value: DatabaseStorePrefixes) -> Self {
        value as u8
    }
}

impl AsRef<[u8]> for DatabaseStorePrefixes {
    fn as_ref(&self) -> &[u8] {
        // SAFETY: enum has repr(u8)
        std::slice::from_ref(unsafe { &*(self as *const Self as *const u8) })
    }
}

impl IntoIterator for DatabaseStorePrefixes {
    type Item = u8;
    type IntoIter = <[u8; 1] as IntoIterator>::IntoIter;
    fn into_iter(self) -> Self::IntoIter {
        [self as u8].into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_traits::FromPrimitive;

    #[test]
    fn test_as_ref() {
        let prefix = DatabaseStorePrefixes::TreeMembers;
        assert_eq!(&[prefix as u8], prefix.as_ref());
        assert_eq!(
            size_of::<u8>(),
            size_of::<DatabaseStorePrefixes>(),
            "DatabaseStorePrefixes is expected to have the same memory layout of u8"
        );
    }

    #[test]
    fn test_from_primitive() {
        assert_eq!(DatabaseStorePrefixes::from_u8(1), Some(DatabaseStorePrefixes::Nodes));
        assert_eq!(DatabaseStorePrefixes::from_u8(SEPARATOR), Some(DatabaseStorePrefixes::Separator));
        assert_eq!(DatabaseStorePrefixes::from_u8(3), None);
    }
}
