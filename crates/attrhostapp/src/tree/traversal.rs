//! Display-order scans over the whole tree, used by Tab/Shift+Tab and by the
//! "next unviewed" / "next invalid" commands.
//!
//! Candidates are ordered by `(display_order, document position)`. A scan starts
//! strictly after (or before) the target of `after`; with `wrap_around` it continues
//! from the other end of the document.

use super::{AttributeTree, Genealogy};
use crate::model::{AttributeId, AttributeNode};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Forward,
    Backward,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FindOptions {
    pub direction: Direction,
    pub wrap_around: bool,
    /// Return only the first match instead of every match in scan order.
    pub stop_at_first: bool,
}

impl Default for FindOptions {
    fn default() -> Self {
        Self {
            direction: Direction::Forward,
            wrap_around: true,
            stop_at_first: true,
        }
    }
}

impl FindOptions {
    pub fn backward(mut self) -> Self {
        self.direction = Direction::Backward;
        self
    }

    pub fn without_wrap(mut self) -> Self {
        self.wrap_around = false;
        self
    }
}

/// All matches of `predicate` in scan order relative to `after`, as genealogies.
pub fn find_in_display_order<P>(
    tree: &AttributeTree,
    after: Option<&Genealogy>,
    options: FindOptions,
    predicate: P,
) -> Vec<Genealogy>
where
    P: Fn(&AttributeNode) -> bool,
{
    let walk = tree.walk();
    let position_of = |id: &AttributeId| walk.iter().position(|w| w == id).unwrap_or(usize::MAX);

    let mut candidates: Vec<(&str, usize, AttributeId)> = walk
        .iter()
        .enumerate()
        .filter_map(|(pos, id)| {
            let node = tree.get(id)?;
            predicate(node).then_some((node.display_order.as_str(), pos, *id))
        })
        .collect();
    candidates.sort();

    if options.direction == Direction::Backward {
        candidates.reverse();
    }

    let current = after
        .and_then(|g| g.target())
        .and_then(|id| tree.get(&id).map(|n| (n.display_order.as_str(), position_of(&id))));

    let (following, preceding): (Vec<_>, Vec<_>) = match current {
        None => (candidates, Vec::new()),
        Some(key) => candidates.into_iter().partition(|(order, pos, _)| {
            let candidate = (*order, *pos);
            match options.direction {
                Direction::Forward => candidate > key,
                Direction::Backward => candidate < key,
            }
        }),
    };

    let mut ordered: Vec<AttributeId> = following.into_iter().map(|(_, _, id)| id).collect();
    if options.wrap_around {
        ordered.extend(preceding.into_iter().map(|(_, _, id)| id));
    }
    if options.stop_at_first {
        ordered.truncate(1);
    }

    ordered
        .into_iter()
        .filter_map(|id| tree.path_to(&id))
        .collect()
}

/// First match of `predicate` after `after` in display order.
pub fn find_next_in_display_order<P>(
    tree: &AttributeTree,
    after: Option<&Genealogy>,
    direction: Direction,
    wrap_around: bool,
    predicate: P,
) -> Option<Genealogy>
where
    P: Fn(&AttributeNode) -> bool,
{
    let options = FindOptions {
        direction,
        wrap_around,
        stop_at_first: true,
    };
    find_in_display_order(tree, after, options, predicate)
        .into_iter()
        .next()
}
