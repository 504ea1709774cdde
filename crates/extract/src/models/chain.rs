use std::ops::Deref;

/// Collection names a video belongs to, nearest folder first.
///
/// Never empty; the first entry is the primary collection.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CollectionChain(Vec<String>);
impl CollectionChain {
    /// Returns `None` when there are no names to build a chain from.
    pub fn new(names: Vec<String>) -> Option<Self> {
        (!names.is_empty()).then_some(Self(names))
    }

    pub fn primary(&self) -> &str {
        // Non-empty by construction.
        &self.0[0]
    }
}
impl Deref for CollectionChain {
    type Target = [String];
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
impl<'a> IntoIterator for &'a CollectionChain {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;
    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
