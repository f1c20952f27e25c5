//! Types dealing with entity identity.

macro_rules! imp_deref {
    ($i:ty, $t:ty) => {
        impl std::ops::Deref for $i {
            type Target = $t;

            fn deref(&self) -> &Self::Target {
                &self.0
            }
        }
    };
}

macro_rules! imp_from {
    ($a:ty, $b:ty, $i:ident => $e:expr) => {
        impl From<$b> for $a {
            fn from($i: $b) -> Self {
                $e
            }
        }
    };
}

/// Identifies one remote entity.
///
/// Keys are ordered for display purposes only. No orchestrator relies on
/// the ordering for correctness, except that the sequential strategy
/// delivers in the order the keys were supplied.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    serde::Serialize,
    serde::Deserialize,
)]
#[serde(transparent)]
pub struct Key(pub i64);

imp_deref!(Key, i64);
imp_from!(Key, i64, k => Key(k));

impl std::fmt::Display for Key {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// An immutable value fetched for a [Key].
///
/// The orchestration layer never looks inside `data`. It is whatever
/// payload the [crate::fetch::Fetcher] produced, typically a serialized
/// record the caller decodes when rendering.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct Entity {
    /// The key this entity was fetched for.
    pub key: Key,

    /// The opaque entity payload.
    pub data: bytes::Bytes,
}

impl Entity {
    /// Construct a new entity.
    pub fn new(key: Key, data: impl Into<bytes::Bytes>) -> Self {
        Self {
            key,
            data: data.into(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn key_serializes_as_plain_integer() {
        assert_eq!("7", serde_json::to_string(&Key(7)).unwrap());
        assert_eq!(Key(-3), serde_json::from_str::<Key>("-3").unwrap());
    }

    #[test]
    fn key_display_and_deref() {
        let k = Key::from(12);
        assert_eq!("12", k.to_string());
        assert_eq!(12, *k);
    }
}
