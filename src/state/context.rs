//! Recording categories and the fixed cycle between them
//!
//! Cycling order comes from the explicit `CYCLE` array, not from the
//! declaration order of the enum.

use serde::{Deserialize, Serialize};

/// Semantic category of a recording
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    General,
    Work,
    Personal,
    Ideas,
}

impl Category {
    /// Label spoken when the category becomes active
    pub fn label(self) -> &'static str {
        match self {
            Category::General => "General",
            Category::Work => "Work",
            Category::Personal => "Personal",
            Category::Ideas => "Ideas",
        }
    }
}

impl Default for Category {
    fn default() -> Self {
        CYCLE[0]
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Cycle order. Changing it changes adjacency for every caller.
pub const CYCLE: [Category; 4] = [
    Category::General,
    Category::Work,
    Category::Personal,
    Category::Ideas,
];

/// Direction of a category selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Forward,
    Backward,
    /// Anything a caller sent that is not a known direction
    #[serde(other)]
    Unknown,
}

/// Pure navigation over `CYCLE`
pub struct ContextCycle;

impl ContextCycle {
    /// Category after `category`, wrapping to the start
    pub fn next(category: Category) -> Category {
        let idx = Self::index_of(category);
        CYCLE[(idx + 1) % CYCLE.len()]
    }

    /// Category before `category`, wrapping to the end
    pub fn previous(category: Category) -> Category {
        let idx = Self::index_of(category);
        CYCLE[(idx + CYCLE.len() - 1) % CYCLE.len()]
    }

    /// Step in `direction`, or `None` for an unknown direction
    pub fn step(category: Category, direction: Direction) -> Option<Category> {
        match direction {
            Direction::Forward => Some(Self::next(category)),
            Direction::Backward => Some(Self::previous(category)),
            Direction::Unknown => None,
        }
    }

    fn index_of(category: Category) -> usize {
        // Every variant is listed in CYCLE
        CYCLE.iter().position(|c| *c == category).unwrap_or(0)
    }
}
