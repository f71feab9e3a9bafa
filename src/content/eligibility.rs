use std::collections::BTreeSet;

use super::node::{Entity, Node};

/// Content categories allowed to reach the appliance.
///
/// Blank entries are dropped. An empty whitelist admits nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Whitelist(BTreeSet<String>);

impl Whitelist {
    pub fn new<I, S>(categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self(
            categories
                .into_iter()
                .map(|c| c.as_ref().trim().to_owned())
                .filter(|c| !c.is_empty())
                .collect(),
        )
    }

    pub fn contains(&self, category: &str) -> bool {
        self.0.contains(category)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Categories in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

/// Returns the node behind `entity` if it may be pushed.
///
/// The entity must be a node and its category must be whitelisted.
pub fn eligible_node<'a>(entity: &'a Entity, whitelist: &Whitelist) -> Option<&'a Node> {
    match entity {
        Entity::Node(node) if whitelist.contains(&node.category) => Some(node),
        _ => None,
    }
}
