use crate::core::BodyHandle;
use std::collections::HashMap;

/// A group of dynamic bodies connected through touching contacts.
///
/// Islands fall asleep together, so a resting stack never wakes itself up
/// one body at a time.
#[derive(Debug, Default, Clone)]
pub struct Island {
    /// The bodies in the island
    pub bodies: Vec<BodyHandle>,
}

impl Island {
    /// Returns the number of bodies in the island
    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }
}

/// Union-find over body handles
#[derive(Debug, Default)]
pub struct IslandBuilder {
    parent: HashMap<BodyHandle, BodyHandle>,
}

impl IslandBuilder {
    /// Creates a new empty island builder
    pub fn new() -> Self {
        Self {
            parent: HashMap::new(),
        }
    }

    /// Adds a body with no connections yet
    pub fn add_body(&mut self, body: BodyHandle) {
        self.parent.entry(body).or_insert(body);
    }

    /// Connects two bodies touching each other
    pub fn add_connection(&mut self, body_a: BodyHandle, body_b: BodyHandle) {
        self.add_body(body_a);
        self.add_body(body_b);

        let root_a = self.find(body_a);
        let root_b = self.find(body_b);

        // Merge the higher root into the lower one
        if root_a < root_b {
            self.parent.insert(root_b, root_a);
        } else if root_b < root_a {
            self.parent.insert(root_a, root_b);
        }
    }

    fn find(&mut self, body: BodyHandle) -> BodyHandle {
        let mut root = body;
        while let Some(&parent) = self.parent.get(&root) {
            if parent == root {
                break;
            }
            root = parent;
        }

        // Path compression
        let mut current = body;
        while current != root {
            let next = self.parent.get(&current).copied().unwrap_or(root);
            self.parent.insert(current, root);
            current = next;
        }

        root
    }

    /// Builds and returns the islands
    pub fn build(mut self) -> Vec<Island> {
        let mut bodies: Vec<BodyHandle> = self.parent.keys().copied().collect();
        bodies.sort();

        let mut groups: HashMap<BodyHandle, Island> = HashMap::new();
        for body in bodies {
            let root = self.find(body);
            groups.entry(root).or_default().bodies.push(body);
        }

        let mut islands: Vec<Island> = groups.into_values().collect();
        islands.sort_by_key(|island| island.bodies.first().copied());
        islands
    }
}
