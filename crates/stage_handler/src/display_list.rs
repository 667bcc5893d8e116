//! Retained display list primitives and a minimal diffing API.
//!
//! The stage rebuilds a linear paint list from the layout snapshot, diffs
//! it against the previous frame's list, and only swaps (and bumps the
//! generation) when something actually changed. Presenters can use the
//! generation tag to skip identical frames.

use image_pipeline::TextureHandle;

/// A single paint command in device-independent pixels, drawn in order.
#[derive(Debug, Clone, PartialEq)]
pub enum DisplayItem {
    /// Solid color quad. RGBA with straight alpha, components in [0, 1].
    Rect {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        color: [f32; 4],
    },
    /// Textured quad sampling a texture-store slot.
    Image {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        texture: TextureHandle,
    },
}

/// A retained display list with a monotonically increasing generation tag.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayList {
    /// Linear sequence of items in paint order.
    pub items: Vec<DisplayItem>,
    /// Bumped each time the items are replaced with different content.
    pub generation: u64,
}

impl Default for DisplayList {
    fn default() -> Self {
        Self::new()
    }
}

impl DisplayList {
    /// Create an empty display list.
    #[must_use]
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            generation: 0,
        }
    }

    /// Create a display list from a collection of items.
    pub fn from_items<I: IntoIterator<Item = DisplayItem>>(items: I) -> Self {
        let mut list = Self::new();
        list.items.extend(items);
        list
    }

    /// Bump the generation counter and return the new value.
    pub fn bump_generation(&mut self) -> u64 {
        self.generation = self.generation.wrapping_add(1);
        self.generation
    }

    /// Append an item to the end of the list.
    pub fn push(&mut self, item: DisplayItem) {
        self.items.push(item);
    }

    /// Coarse diff: identical item sequences report `NoChange`, anything
    /// else replaces the whole list. Fine-grained diffs can slot in later
    /// without changing the API.
    #[must_use]
    pub fn diff(&self, other: &[DisplayItem]) -> DisplayListDiff {
        if self.items == other {
            DisplayListDiff::NoChange
        } else {
            DisplayListDiff::ReplaceAll(other.to_vec())
        }
    }
}

/// How to turn the previous frame's list into the next one.
#[derive(Debug, Clone, PartialEq)]
pub enum DisplayListDiff {
    /// The lists are identical; keep the retained one.
    NoChange,
    /// Replace the entire list with the provided items.
    ReplaceAll(Vec<DisplayItem>),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn red_rect() -> DisplayItem {
        DisplayItem::Rect {
            x: 0.0,
            y: 0.0,
            width: 10.0,
            height: 10.0,
            color: [1.0, 0.0, 0.0, 1.0],
        }
    }

    #[test]
    fn diff_reports_no_change_for_identical_items() {
        let list = DisplayList::from_items([red_rect()]);
        assert_eq!(list.diff(&[red_rect()]), DisplayListDiff::NoChange);
    }

    #[test]
    fn diff_replaces_on_any_difference() {
        let list = DisplayList::from_items([red_rect()]);
        let next = [
            red_rect(),
            DisplayItem::Rect {
                x: 5.0,
                y: 5.0,
                width: 1.0,
                height: 1.0,
                color: [0.0, 0.0, 0.0, 1.0],
            },
        ];
        match list.diff(&next) {
            DisplayListDiff::ReplaceAll(items) => assert_eq!(items.len(), 2),
            DisplayListDiff::NoChange => panic!("expected a replacement"),
        }
    }

    #[test]
    fn generation_wraps_without_panicking() {
        let mut list = DisplayList::new();
        list.generation = u64::MAX;
        assert_eq!(list.bump_generation(), 0);
    }
}
