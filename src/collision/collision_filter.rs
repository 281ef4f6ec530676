use bitflags::bitflags;

bitflags! {
    /// Collision category bits carried by every fixture
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Category: u16 {
        /// Static and passive actors
        const PASSIVE = 0b01;

        /// Dynamic and kinematic actors
        const DYNAMIC_OR_KINEMATIC = 0b10;

        /// Every category
        const ALL = 0xFFFF;
    }
}

/// Category and mask of a fixture.
///
/// Two fixtures may touch iff each one's category overlaps the other's mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Filter {
    /// The categories this fixture belongs to
    pub category: Category,

    /// The categories this fixture collides with
    pub mask: Category,
}

impl Filter {
    /// Creates a new filter
    pub fn new(category: Category, mask: Category) -> Self {
        Self { category, mask }
    }

    /// Returns whether fixtures with these filters may collide
    pub fn should_collide(&self, other: &Filter) -> bool {
        self.category.intersects(other.mask) && other.category.intersects(self.mask)
    }
}

impl Default for Filter {
    fn default() -> Self {
        Self {
            category: Category::PASSIVE,
            mask: Category::ALL,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_mask_never_collides() {
        let passive = Filter::new(Category::PASSIVE, Category::empty());
        let dynamic = Filter::new(Category::DYNAMIC_OR_KINEMATIC, Category::ALL);

        assert!(!passive.should_collide(&dynamic));
        assert!(!dynamic.should_collide(&passive));
        assert!(dynamic.should_collide(&dynamic));
    }
}
