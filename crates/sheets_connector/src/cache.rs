/// Locally cached copy of some piece of remote state.
///
/// `Invalidated` is distinct from `Unfetched` only so that logs can tell a
/// first fetch apart from a re-fetch after a structural change.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Cached<T> {
    #[default]
    Unfetched,
    Fetched(T),
    Invalidated,
}

impl<T> Cached<T> {
    pub fn get(&self) -> Option<&T> {
        match self {
            Self::Fetched(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_fetched(&self) -> bool {
        matches!(self, Self::Fetched(_))
    }

    pub fn is_invalidated(&self) -> bool {
        matches!(self, Self::Invalidated)
    }

    /// Store a freshly fetched value, returning a reference to it.
    pub fn insert(&mut self, value: T) -> &mut T {
        *self = Self::Fetched(value);
        match self {
            Self::Fetched(v) => v,
            _ => unreachable!("programming error: cache value was just inserted"),
        }
    }

    /// Take the cached value, leaving the cache unfetched.
    pub fn take(&mut self) -> Option<T> {
        match std::mem::take(self) {
            Self::Fetched(v) => Some(v),
            _ => None,
        }
    }

    /// Drop the cached value so the next access goes back to the remote
    /// service.
    pub fn invalidate(&mut self) {
        *self = Self::Invalidated;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifecycle() {
        let mut cache: Cached<Vec<u32>> = Cached::default();
        assert_eq!(None, cache.get());
        assert!(!cache.is_fetched());

        cache.insert(vec![1, 2]).push(3);
        assert_eq!(Some(&vec![1, 2, 3]), cache.get());

        cache.invalidate();
        assert!(cache.is_invalidated());
        assert_eq!(None, cache.take());
        assert_eq!(Cached::Unfetched, cache);
    }

    #[test]
    fn take_leaves_unfetched() {
        let mut cache = Cached::Fetched("sheet");
        assert_eq!(Some("sheet"), cache.take());
        assert_eq!(Cached::Unfetched, cache);
    }
}
