//! SensorId - identity of a sensor within a producer

use std::borrow::Borrow;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Sensor identity.
///
/// Backed by `Arc<str>`: packets carry the id of the sensor that produced
/// them on every tick, so clones must stay cheap.
///
/// ```
/// use contracts::SensorId;
///
/// let id: SensorId = "imada".into();
/// assert_eq!(id, "imada");
/// assert_eq!(id.clone().as_str(), "imada");
/// ```
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct SensorId(Arc<str>);

impl SensorId {
    pub fn new(s: &str) -> Self {
        Self(Arc::from(s))
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for SensorId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for SensorId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SensorId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for SensorId {
    fn from(s: String) -> Self {
        Self(Arc::from(s))
    }
}

impl From<SensorId> for String {
    fn from(id: SensorId) -> Self {
        id.0.to_string()
    }
}

impl PartialEq<str> for SensorId {
    fn eq(&self, other: &str) -> bool {
        &*self.0 == other
    }
}

impl PartialEq<&str> for SensorId {
    fn eq(&self, other: &&str) -> bool {
        &*self.0 == *other
    }
}

impl fmt::Display for SensorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for SensorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SensorId({:?})", &*self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_clone_shares_storage() {
        let a: SensorId = "load_cell".into();
        let b = a.clone();
        assert_eq!(a.as_str().as_ptr(), b.as_str().as_ptr());
    }

    #[test]
    fn test_set_lookup_by_str() {
        let mut ids: HashSet<SensorId> = HashSet::new();
        ids.insert("imada".into());
        assert!(ids.contains("imada"));
        assert!(!ids.contains("dummy"));
    }

    #[test]
    fn test_serde_as_plain_string() {
        let id: SensorId = "imada".into();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"imada\"");
        let back: SensorId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
