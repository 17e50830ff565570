//! Depth and cycle rules for the task forest.
//!
//! All checks are pure functions over an [`Ancestry`]: a task code plus the
//! codes of its ancestors, nearest first. Walks never need more than
//! [`MAX_HIERARCHY_LEVEL`] hops because no stored chain may be deeper.

use super::TaskCode;

/// Deepest permitted level; roots are level 1.
pub const MAX_HIERARCHY_LEVEL: usize = 5;

/// A task code together with its ancestor chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ancestry {
    code: TaskCode,
    ancestors: Vec<TaskCode>,
}

impl Ancestry {
    /// Creates an ancestry from a code and its ancestors, nearest first.
    #[must_use]
    pub const fn new(code: TaskCode, ancestors: Vec<TaskCode>) -> Self {
        Self { code, ancestors }
    }

    /// Creates the ancestry of a root task.
    #[must_use]
    pub const fn root(code: TaskCode) -> Self {
        Self::new(code, Vec::new())
    }

    /// Returns the code the chain starts from.
    #[must_use]
    pub const fn code(&self) -> &TaskCode {
        &self.code
    }

    /// Returns the ancestors, nearest first.
    #[must_use]
    pub fn ancestors(&self) -> &[TaskCode] {
        &self.ancestors
    }

    /// Iterates the chain from the task itself up to the furthest ancestor.
    pub fn chain(&self) -> impl Iterator<Item = &TaskCode> {
        std::iter::once(&self.code).chain(self.ancestors.iter())
    }
}

/// Returns the 1-based hierarchy level of the chain's task.
///
/// The walk stops at the cap: a task whose true depth exceeds
/// [`MAX_HIERARCHY_LEVEL`] reports exactly [`MAX_HIERARCHY_LEVEL`].
#[must_use]
pub fn depth_of(ancestry: &Ancestry) -> usize {
    ancestry
        .chain()
        .take(MAX_HIERARCHY_LEVEL)
        .count()
}

/// Returns `true` when a child attached under `candidate_parent` would sit
/// below [`MAX_HIERARCHY_LEVEL`].
#[must_use]
pub fn would_exceed_max_depth(candidate_parent: &Ancestry) -> bool {
    depth_of(candidate_parent) >= MAX_HIERARCHY_LEVEL
}

/// Returns `true` when adopting `candidate_parent` would make `task` its own
/// ancestor, including the case where the candidate is the task itself.
#[must_use]
pub fn detects_cycle(task: &TaskCode, candidate_parent: &Ancestry) -> bool {
    candidate_parent
        .chain()
        .take(MAX_HIERARCHY_LEVEL)
        .any(|code| code == task)
}

/// Returns `true` when a subtree of `subtree_height` levels (1 for a leaf)
/// fits below a parent at `parent_depth`.
#[must_use]
pub const fn subtree_fits(parent_depth: usize, subtree_height: usize) -> bool {
    parent_depth + subtree_height <= MAX_HIERARCHY_LEVEL
}
