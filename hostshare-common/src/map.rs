/// Fast hash map type for small, trusted keys.
pub type FastHashMap<K, V> = rustc_hash::FxHashMap<K, V>;

/// A string with small string optimizations up to 23 bytes.
pub type ShortString = smartstring::SmartString<smartstring::LazyCompact>;

/// The name of a struct field.
pub type FieldName = ShortString;
