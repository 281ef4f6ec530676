mod collision_pair;
mod broad_phase;
mod narrow_phase;
mod contact_solver;
mod collision_filter;
mod contact_manifold;

pub use self::collision_pair::{CollisionPair, Contact};
pub use self::broad_phase::{BroadPhase, BruteForceBroadPhase};
pub use self::narrow_phase::collide;
pub use self::contact_solver::{ContactSolver, SequentialImpulseSolver, SolverBody};
pub use self::collision_filter::{Category, Filter};
pub use self::contact_manifold::{ContactManifold, ManifoldPoint, ManifoldType, WorldManifold, WorldPoint};
