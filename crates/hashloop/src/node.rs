//! Node identity normalization.
//!
//! Every node placed on the ring is identified by a stable string, its
//! *node key*. The key decides where the node's replicas land, deduplicates
//! re-adds, and tells nodes apart during multi-node lookups.
//!
//! Scalars and strings have a canonical textual form out of the box. Other
//! types either implement [`NodeKey`] themselves or are wrapped in
//! [`ByDisplay`] (explicit stable identity) or [`ByDebug`] (structural dump).
//!
//! Two different values with the same textual form, e.g. `1u8` and `"1"`,
//! map to the same key and are treated as the same node. Keep node types
//! homogeneous within one ring.

use std::borrow::Cow;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::rc::Rc;
use std::sync::Arc;

/// Conversion of a node value to its stable identity string.
///
/// Implementations must be deterministic: logically equal nodes must return
/// equal keys on every call, for the whole lifetime of the ring.
pub trait NodeKey {
    /// Return the node's identity string.
    fn node_key(&self) -> String;
}

impl NodeKey for str {
    fn node_key(&self) -> String {
        self.to_string()
    }
}

impl NodeKey for String {
    fn node_key(&self) -> String {
        self.clone()
    }
}

impl NodeKey for Cow<'_, str> {
    fn node_key(&self) -> String {
        self.to_string()
    }
}

impl NodeKey for [u8] {
    fn node_key(&self) -> String {
        String::from_utf8_lossy(self).into_owned()
    }
}

impl NodeKey for Vec<u8> {
    fn node_key(&self) -> String {
        self.as_slice().node_key()
    }
}

/// `None` is the empty key.
impl<T: NodeKey> NodeKey for Option<T> {
    fn node_key(&self) -> String {
        match self {
            Some(inner) => inner.node_key(),
            None => String::new(),
        }
    }
}

impl<T: NodeKey + ?Sized> NodeKey for &T {
    fn node_key(&self) -> String {
        (**self).node_key()
    }
}

impl<T: NodeKey + ?Sized> NodeKey for Box<T> {
    fn node_key(&self) -> String {
        (**self).node_key()
    }
}

impl<T: NodeKey + ?Sized> NodeKey for Rc<T> {
    fn node_key(&self) -> String {
        (**self).node_key()
    }
}

impl<T: NodeKey + ?Sized> NodeKey for Arc<T> {
    fn node_key(&self) -> String {
        (**self).node_key()
    }
}

macro_rules! display_node_key {
    ($($ty:ty),* $(,)?) => {
        $(
            impl NodeKey for $ty {
                fn node_key(&self) -> String {
                    self.to_string()
                }
            }
        )*
    };
}

display_node_key!(
    bool, char, i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64,
    IpAddr, SocketAddr,
);

/// Identify a node by its [`Display`](fmt::Display) output.
///
/// Use this for types that already render a stable identifier, such as
/// host names or endpoint URLs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ByDisplay<T>(pub T);

impl<T: fmt::Display> NodeKey for ByDisplay<T> {
    fn node_key(&self) -> String {
        self.0.to_string()
    }
}

impl<T: fmt::Display> fmt::Display for ByDisplay<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Identify a node by its [`Debug`](fmt::Debug) output.
///
/// Fallback for structured values without a natural identifier. The key
/// changes whenever the type's `Debug` output changes, so prefer
/// [`ByDisplay`] or a hand-written [`NodeKey`] for anything long-lived.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ByDebug<T>(pub T);

impl<T: fmt::Debug> NodeKey for ByDebug<T> {
    fn node_key(&self) -> String {
        format!("{:?}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strings_are_their_own_key() {
        assert_eq!("cache-1".node_key(), "cache-1");
        assert_eq!(String::from("cache-1").node_key(), "cache-1");
        assert_eq!(Cow::Borrowed("cache-1").node_key(), "cache-1");
        assert_eq!(Arc::<str>::from("cache-1").node_key(), "cache-1");
    }

    #[test]
    fn test_scalars_use_canonical_text() {
        assert_eq!(true.node_key(), "true");
        assert_eq!((-7i8).node_key(), "-7");
        assert_eq!(u64::MAX.node_key(), "18446744073709551615");
        assert_eq!(1.5f64.node_key(), "1.5");
        assert_eq!('x'.node_key(), "x");
    }

    #[test]
    fn test_bytes_are_text() {
        assert_eq!(b"shard-a".to_vec().node_key(), "shard-a");
        assert_eq!(b"shard-a"[..].node_key(), "shard-a");
    }

    #[test]
    fn test_none_is_empty() {
        assert_eq!(None::<String>.node_key(), "");
        assert_eq!(Some(5u16).node_key(), "5");
    }

    #[test]
    fn test_addresses() {
        let addr: SocketAddr = "10.0.0.1:11211".parse().unwrap();
        assert_eq!(addr.node_key(), "10.0.0.1:11211");
        assert_eq!(addr.ip().node_key(), "10.0.0.1");
    }

    #[test]
    fn test_wrappers() {
        #[derive(Debug)]
        struct Backend {
            host: &'static str,
            port: u16,
        }

        impl fmt::Display for Backend {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}:{}", self.host, self.port)
            }
        }

        let b = Backend {
            host: "db",
            port: 5432,
        };
        assert_eq!(ByDisplay(&b).node_key(), "db:5432");
        assert_eq!(
            ByDebug(&b).node_key(),
            "Backend { host: \"db\", port: 5432 }"
        );
    }

    #[test]
    fn test_same_text_collides_across_types() {
        // Caller responsibility: mixed node types can share a key.
        assert_eq!(1u8.node_key(), "1".node_key());
    }

    #[test]
    fn test_keys_are_stable() {
        let node = ByDebug((1, "a"));
        assert_eq!(node.node_key(), node.node_key());
    }
}
