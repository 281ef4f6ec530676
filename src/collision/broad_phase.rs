use crate::bodies::FixtureRef;
use crate::collision::collision_pair::CollisionPair;
use crate::math::Aabb;

/// Trait for broad-phase collision detection algorithms
pub trait BroadPhase {
    /// Replaces the tracked fixtures with their current world AABBs
    fn update(&mut self, proxies: Vec<(FixtureRef, Aabb)>);

    /// Gets all pairs of fixtures on different bodies whose AABBs overlap
    fn get_collision_pairs(&self) -> Vec<CollisionPair>;

    /// Gets all fixtures whose AABB overlaps `aabb`
    fn query(&self, aabb: &Aabb) -> Vec<FixtureRef>;
}

/// Simple brute-force broad-phase algorithm
#[derive(Debug, Default)]
pub struct BruteForceBroadPhase {
    proxies: Vec<(FixtureRef, Aabb)>,
}

impl BruteForceBroadPhase {
    /// Creates a new brute-force broad-phase
    pub fn new() -> Self {
        Self {
            proxies: Vec::new(),
        }
    }
}

impl BroadPhase for BruteForceBroadPhase {
    fn update(&mut self, proxies: Vec<(FixtureRef, Aabb)>) {
        self.proxies = proxies;
    }

    fn get_collision_pairs(&self) -> Vec<CollisionPair> {
        let mut pairs = Vec::new();

        for (i, (fixture_a, aabb_a)) in self.proxies.iter().enumerate() {
            for (fixture_b, aabb_b) in &self.proxies[i + 1..] {
                if fixture_a.body == fixture_b.body {
                    continue;
                }

                if aabb_a.intersects(aabb_b) {
                    pairs.push(CollisionPair::new(*fixture_a, *fixture_b));
                }
            }
        }

        pairs
    }

    fn query(&self, aabb: &Aabb) -> Vec<FixtureRef> {
        self.proxies
            .iter()
            .filter(|(_, proxy)| proxy.intersects(aabb))
            .map(|(fixture, _)| *fixture)
            .collect()
    }
}
