use crate::coords::Rect;
use crate::paint::Color;

use super::{DrawCmd, RectCmd, SortKey, ZIndex};

/// A single draw item: sort key + command.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawItem {
    pub key: SortKey,
    pub cmd: DrawCmd,
}

/// Recorded draw stream for one frame.
///
/// Paint-order iteration reuses an internal index buffer, so once warmed a
/// list that is cleared and refilled every frame does not allocate.
#[derive(Debug, Default, Clone)]
pub struct DrawList {
    items: Vec<DrawItem>,
    next_order: u32,

    sorted_indices: Vec<usize>,
    sorted_dirty: bool,
}

impl DrawList {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Clears recorded items, keeping capacity.
    #[inline]
    pub fn clear(&mut self) {
        self.items.clear();
        self.next_order = 0;
        self.sorted_indices.clear();
        self.sorted_dirty = true;
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Items in insertion order.
    #[inline]
    pub fn items(&self) -> &[DrawItem] {
        &self.items
    }

    pub fn push(&mut self, z: ZIndex, cmd: DrawCmd) {
        let order = self.next_order;
        self.next_order = self.next_order.wrapping_add(1);
        self.items.push(DrawItem { key: SortKey::new(z, order), cmd });
        self.sorted_dirty = true;
    }

    #[inline]
    pub fn push_rect(&mut self, z: ZIndex, rect: Rect, color: Color) {
        self.push(z, DrawCmd::Rect(RectCmd { rect, color }));
    }

    /// Replaces the contents with `other`'s items, reusing this list's buffers.
    pub fn copy_from(&mut self, other: &DrawList) {
        self.items.clear();
        self.items.extend_from_slice(&other.items);
        self.next_order = other.next_order;
        self.sorted_dirty = true;
    }

    /// Iterates items back-to-front.
    pub fn iter_in_paint_order(&mut self) -> impl Iterator<Item = &DrawItem> {
        if self.sorted_dirty {
            self.rebuild_sorted_indices();
        }
        self.sorted_indices.iter().map(|&i| &self.items[i])
    }

    fn rebuild_sorted_indices(&mut self) {
        self.sorted_indices.clear();
        self.sorted_indices.extend(0..self.items.len());
        self.sorted_indices
            .sort_by(|&a, &b| self.items[a].key.cmp(&self.items[b].key));
        self.sorted_dirty = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect(x: f32) -> Rect { Rect::new(x, 0.0, 1.0, 1.0) }

    fn xs(list: &mut DrawList) -> Vec<f32> {
        list.iter_in_paint_order()
            .map(|item| match &item.cmd { DrawCmd::Rect(r) => r.rect.origin.x })
            .collect()
    }

    #[test]
    fn equal_z_keeps_insertion_order() {
        let mut list = DrawList::new();
        for x in [3.0, 1.0, 2.0] {
            list.push_rect(ZIndex(0), rect(x), Color::BLACK);
        }
        assert_eq!(xs(&mut list), [3.0, 1.0, 2.0]);
    }

    #[test]
    fn higher_z_paints_last() {
        let mut list = DrawList::new();
        list.push_rect(ZIndex(5), rect(0.0), Color::BLACK);
        list.push_rect(ZIndex(-1), rect(1.0), Color::BLACK);
        list.push_rect(ZIndex(0), rect(2.0), Color::BLACK);
        assert_eq!(xs(&mut list), [1.0, 2.0, 0.0]);
    }

    #[test]
    fn clear_resets_order() {
        let mut list = DrawList::new();
        list.push_rect(ZIndex(0), rect(0.0), Color::BLACK);
        list.clear();
        assert!(list.is_empty());
        list.push_rect(ZIndex(0), rect(9.0), Color::BLACK);
        assert_eq!(list.items()[0].key.order, 0);
        assert_eq!(xs(&mut list), [9.0]);
    }

    #[test]
    fn copy_from_resorts() {
        let mut src = DrawList::new();
        src.push_rect(ZIndex(1), rect(1.0), Color::BLACK);
        src.push_rect(ZIndex(0), rect(0.0), Color::BLACK);

        let mut dst = DrawList::new();
        dst.push_rect(ZIndex(0), rect(7.0), Color::BLACK);
        let _ = xs(&mut dst);
        dst.copy_from(&src);
        assert_eq!(xs(&mut dst), [0.0, 1.0]);
    }
}
