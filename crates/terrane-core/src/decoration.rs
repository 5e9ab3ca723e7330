use crate::constants::MAX_DECORATIONS;
use glam::Vec3;

/// What a decoration marks. Consumers decide what to spawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum DecorationKind {
    MonsterSpawn = 0,
    Merchant = 1,
    Horse = 2,
    Chest = 3,
    MapReveal = 4,
    Tower = 5,
    TradingPost = 6,
}

/// A point of interest recorded during generation, in world space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Decoration {
    pub position: Vec3,
    pub kind: DecorationKind,
}

/// Per-chunk decoration list, capped at [`MAX_DECORATIONS`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DecorationList {
    items: Vec<Decoration>,
}

impl DecorationList {
    pub fn new() -> Self {
        Self {
            items: Vec::with_capacity(MAX_DECORATIONS),
        }
    }

    /// Append a decoration. Returns false (and drops it) when the list is full.
    pub fn push(&mut self, decoration: Decoration) -> bool {
        if self.items.len() >= MAX_DECORATIONS {
            return false;
        }
        self.items.push(decoration);
        true
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.items.len() >= MAX_DECORATIONS
    }

    pub fn as_slice(&self) -> &[Decoration] {
        &self.items
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Decoration> {
        self.items.iter()
    }
}

impl<'a> IntoIterator for &'a DecorationList {
    type Item = &'a Decoration;
    type IntoIter = std::slice::Iter<'a, Decoration>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_drops_past_cap() {
        let mut list = DecorationList::new();
        for i in 0..MAX_DECORATIONS + 5 {
            let accepted = list.push(Decoration {
                position: Vec3::splat(i as f32),
                kind: DecorationKind::Chest,
            });
            assert_eq!(accepted, i < MAX_DECORATIONS);
        }
        assert_eq!(list.len(), MAX_DECORATIONS);
        assert!(list.is_full());
        assert_eq!(list.as_slice()[0].position, Vec3::ZERO);

        list.clear();
        assert!(list.is_empty());
    }
}
