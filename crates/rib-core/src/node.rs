//! Design nodes and their identifiers.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::value::PropertyValue;

static NEXT_UID: AtomicU64 = AtomicU64::new(1);

/// Process-unique node identifier. Never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Uid(u64);

impl Uid {
    pub(crate) fn next() -> Self {
        Uid(NEXT_UID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }

    /// Parse the textual form used in `data-uid` attributes.
    pub fn parse(s: &str) -> Option<Self> {
        s.trim().parse().ok().map(Uid)
    }
}

impl fmt::Display for Uid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where a node is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeState {
    /// Created or copied but not reachable from the root.
    Unattached,
    /// Reachable from the root.
    Attached,
    /// Detached by a removal, or never existed. Terminal.
    Removed,
}

/// Children of one zone, in order.
#[derive(Debug, Clone, PartialEq)]
pub struct ZoneSlot {
    pub name: SmolStr,
    pub children: Vec<Uid>,
}

/// One element of the design tree.
///
/// Structure is only changed by [`DesignTree`](crate::tree::DesignTree);
/// the parent link is a uid into the tree's arena, not an owning reference.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub(crate) uid: Uid,
    pub(crate) widget_type: SmolStr,
    pub(crate) parent: Option<Uid>,
    pub(crate) zone: Option<SmolStr>,
    pub(crate) zones: Vec<ZoneSlot>,
    pub(crate) properties: IndexMap<SmolStr, PropertyValue>,
}

impl Node {
    pub fn uid(&self) -> Uid {
        self.uid
    }

    pub fn widget_type(&self) -> &SmolStr {
        &self.widget_type
    }

    pub fn parent(&self) -> Option<Uid> {
        self.parent
    }

    /// Zone of the parent this node occupies.
    pub fn zone(&self) -> Option<&SmolStr> {
        self.zone.as_ref()
    }

    pub fn zones(&self) -> &[ZoneSlot] {
        &self.zones
    }

    /// Children of `zone`; empty when the zone is unknown.
    pub fn children_in(&self, zone: &str) -> &[Uid] {
        self.zones
            .iter()
            .find(|z| z.name == zone)
            .map(|z| z.children.as_slice())
            .unwrap_or_default()
    }

    /// All children, zone by zone.
    pub fn children(&self) -> impl Iterator<Item = Uid> + '_ {
        self.zones.iter().flat_map(|z| z.children.iter().copied())
    }

    pub fn has_children(&self) -> bool {
        self.zones.iter().any(|z| !z.children.is_empty())
    }

    /// Explicitly set properties. Unset properties read as the registry default.
    pub fn explicit_properties(&self) -> &IndexMap<SmolStr, PropertyValue> {
        &self.properties
    }

    pub(crate) fn slot_mut(&mut self, zone: &str) -> Option<&mut Vec<Uid>> {
        self.zones
            .iter_mut()
            .find(|z| z.name == zone)
            .map(|z| &mut z.children)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uids_increase() {
        let a = Uid::next();
        let b = Uid::next();
        assert!(b > a);
        assert_ne!(a, b);
    }

    #[test]
    fn test_uid_parse() {
        assert_eq!(Uid::parse("42"), Some(Uid(42)));
        assert_eq!(Uid::parse(" 7 "), Some(Uid(7)));
        assert_eq!(Uid::parse("page1"), None);
        assert_eq!(Uid(9).to_string(), "9");
    }
}
