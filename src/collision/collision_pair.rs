use crate::bodies::FixtureRef;
use crate::core::BodyHandle;
use crate::collision::contact_manifold::ContactManifold;

/// A pair of fixtures that could potentially collide
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CollisionPair {
    /// The first fixture in the pair
    pub fixture_a: FixtureRef,

    /// The second fixture in the pair
    pub fixture_b: FixtureRef,
}

impl CollisionPair {
    /// Creates a new collision pair
    pub fn new(fixture_a: FixtureRef, fixture_b: FixtureRef) -> Self {
        // Always sort the fixtures to ensure consistent ordering
        if fixture_a <= fixture_b {
            Self { fixture_a, fixture_b }
        } else {
            Self { fixture_a: fixture_b, fixture_b: fixture_a }
        }
    }

    /// Checks if either fixture belongs to the specified body
    pub fn involves_body(&self, body: BodyHandle) -> bool {
        self.fixture_a.body == body || self.fixture_b.body == body
    }
}

/// A touching pair found during a step
#[derive(Debug, Clone)]
pub struct Contact {
    /// The fixtures in contact
    pub pair: CollisionPair,

    /// Contact geometry; `None` for sensor overlaps
    pub manifold: Option<ContactManifold>,

    /// Mixed friction of both fixtures
    pub friction: f32,

    /// Mixed restitution of both fixtures
    pub restitution: f32,

    /// Whether either fixture is a sensor
    pub is_sensor: bool,
}
