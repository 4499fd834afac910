use fxhash::FxBuildHasher;

/// Hash map keyed by one of the crate ids. Iteration order is not
/// meaningful; anything reported in a stable order is sorted by id first.
pub type Map<K, V> = hashbrown::HashMap<K, V, FxBuildHasher>;

pub type Set<T> = hashbrown::HashSet<T, FxBuildHasher>;
