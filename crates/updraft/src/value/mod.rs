mod json;


use std::{collections::BTreeMap, fmt, sync::Arc};

///
/// ValueKind
///
/// Shape classification for diagnostics and dispatch.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ValueKind {
    Null,
    Bool,
    Int,
    Float,
    Text,
    Seq,
    Map,
}

impl ValueKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool => "a boolean",
            Self::Int => "an integer",
            Self::Float => "a float",
            Self::Text => "text",
            Self::Seq => "a sequence",
            Self::Map => "a mapping",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

///
/// Value
///
/// Immutable JSON-like value with structurally shared containers.
///
/// - Scalars are stored inline.
/// - `Seq` and `Map` keep their contents behind an `Arc`, so `Clone` is a
///   reference bump and untouched subtrees retain their allocation across
///   patch application.
/// - `Map` keys are unique and held in sorted order; mappings are
///   semantically unordered.
///
/// Values are owned trees with no interior mutability, so reference cycles
/// cannot be constructed and recursive descent always terminates.
///

#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Seq(Arc<Vec<Value>>),
    Map(Arc<BTreeMap<String, Value>>),
}

impl Value {
    ///
    /// CONSTRUCTION
    ///

    /// Build a `Value::Seq` from owned items.
    pub fn seq<T>(items: Vec<T>) -> Self
    where
        T: Into<Self>,
    {
        Self::Seq(Arc::new(items.into_iter().map(Into::into).collect()))
    }

    /// Build a `Value::Seq` from a slice literal.
    ///
    /// Intended for tests and inline construction.
    /// Requires `Clone` because items are borrowed.
    pub fn from_slice<T>(items: &[T]) -> Self
    where
        T: Into<Self> + Clone,
    {
        Self::Seq(Arc::new(items.iter().cloned().map(Into::into).collect()))
    }

    /// Build a `Value::Map` from key/value entries.
    ///
    /// Later entries win on duplicate keys.
    pub fn map<K, V, I>(entries: I) -> Self
    where
        K: Into<String>,
        V: Into<Self>,
        I: IntoIterator<Item = (K, V)>,
    {
        Self::Map(Arc::new(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        ))
    }

    /// An empty mapping, the `Auto` synthesis default.
    #[must_use]
    pub fn empty_map() -> Self {
        Self::Map(Arc::new(BTreeMap::new()))
    }

    /// An empty sequence, the `AutoSeq` synthesis default.
    #[must_use]
    pub fn empty_seq() -> Self {
        Self::Seq(Arc::new(Vec::new()))
    }

    ///
    /// TYPES
    ///

    #[must_use]
    pub const fn kind(&self) -> ValueKind {
        match self {
            Self::Null => ValueKind::Null,
            Self::Bool(_) => ValueKind::Bool,
            Self::Int(_) => ValueKind::Int,
            Self::Float(_) => ValueKind::Float,
            Self::Text(_) => ValueKind::Text,
            Self::Seq(_) => ValueKind::Seq,
            Self::Map(_) => ValueKind::Map,
        }
    }

    #[must_use]
    pub const fn is_scalar(&self) -> bool {
        !matches!(self, Self::Seq(_) | Self::Map(_))
    }

    #[must_use]
    pub const fn is_seq(&self) -> bool {
        matches!(self, Self::Seq(_))
    }

    #[must_use]
    pub const fn is_map(&self) -> bool {
        matches!(self, Self::Map(_))
    }

    ///
    /// ACCESS
    ///

    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        if let Self::Bool(b) = self { Some(*b) } else { None }
    }

    #[must_use]
    pub const fn as_int(&self) -> Option<i64> {
        if let Self::Int(i) = self { Some(*i) } else { None }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        if let Self::Text(s) = self {
            Some(s.as_str())
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_seq(&self) -> Option<&[Self]> {
        if let Self::Seq(items) = self {
            Some(items.as_slice())
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_map(&self) -> Option<&BTreeMap<String, Self>> {
        if let Self::Map(entries) = self {
            Some(entries)
        } else {
            None
        }
    }

    /// Field lookup on a mapping; `None` for other shapes or missing keys.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Self> {
        self.as_map().and_then(|entries| entries.get(key))
    }

    /// Positional lookup on a sequence; `None` for other shapes or
    /// out-of-bounds indices.
    #[must_use]
    pub fn at(&self, index: usize) -> Option<&Self> {
        self.as_seq().and_then(|items| items.get(index))
    }

    ///
    /// EMPTY / TRUTHINESS
    ///

    #[must_use]
    pub fn is_empty(&self) -> Option<bool> {
        match self {
            Self::Seq(items) => Some(items.is_empty()),
            Self::Map(entries) => Some(entries.is_empty()),
            Self::Text(s) => Some(s.is_empty()),
            Self::Null => Some(true),
            _ => None,
        }
    }

    /// True for `Null`, `Bool(false)`, and NaN floats.
    ///
    /// Empty text/containers and zero are NOT falsy; absence and falsehood
    /// are the only falsy states.
    #[must_use]
    pub fn is_falsy(&self) -> bool {
        match self {
            Self::Null | Self::Bool(false) => true,
            Self::Float(f) => f.is_nan(),
            _ => false,
        }
    }

    /// Logical negation of [`is_falsy`](Self::is_falsy).
    #[must_use]
    pub fn is_truthy(&self) -> bool {
        !self.is_falsy()
    }

    ///
    /// SHARING
    ///

    /// Allocation-identity check: true when both sides are containers
    /// backed by the same `Arc`, or equal scalars.
    ///
    /// This is the change-detection shortcut [`apply`](crate::apply)
    /// guarantees: untouched containers come back with their allocation
    /// intact, so `shares` answers "did this subtree change" without a
    /// deep comparison. Structurally equal but separately built containers
    /// report `false`.
    #[must_use]
    pub fn shares(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Seq(a), Self::Seq(b)) => Arc::ptr_eq(a, b),
            (Self::Map(a), Self::Map(b)) => Arc::ptr_eq(a, b),
            _ => self == other,
        }
    }
}

impl Default for Value {
    fn default() -> Self {
        Self::Null
    }
}

macro_rules! impl_value_from {
    ( $( $type:ty => $variant:ident ),* $(,)? ) => {
        $(
            impl From<$type> for Value {
                fn from(v: $type) -> Self {
                    Self::$variant(v.into())
                }
            }
        )*
    };
}

impl_value_from! {
    bool   => Bool,
    i8     => Int,
    i16    => Int,
    i32    => Int,
    i64    => Int,
    u8     => Int,
    u16    => Int,
    u32    => Int,
    f32    => Float,
    f64    => Float,
    &str   => Text,
    String => Text,
}

impl From<Vec<Self>> for Value {
    fn from(items: Vec<Self>) -> Self {
        Self::Seq(Arc::new(items))
    }
}

impl From<BTreeMap<String, Self>> for Value {
    fn from(entries: BTreeMap<String, Self>) -> Self {
        Self::Map(Arc::new(entries))
    }
}

impl From<()> for Value {
    fn from((): ()) -> Self {
        Self::Null
    }
}
