#![warn(missing_docs)]
//! Physics primitives and the terrain collision world.
//!
//! Terrain chunks register static triangle-mesh colliders built from their
//! world-space vertex buffers. The world answers vertical ground queries so
//! walkers can stay on the surface.

use glam::{Vec2, Vec3};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;
use tracing::debug;

/// Axis-aligned bounding box used for collisions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    /// Minimum corner (x, y, z).
    pub min: [f32; 3],
    /// Maximum corner (x, y, z).
    pub max: [f32; 3],
}

impl Aabb {
    /// Create a new AABB ensuring min <= max per axis.
    pub fn new(min: [f32; 3], max: [f32; 3]) -> Self {
        debug_assert!(min[0] <= max[0] && min[1] <= max[1] && min[2] <= max[2]);
        Self { min, max }
    }

    /// Smallest box containing every point, or `None` for no points.
    pub fn from_points(points: impl IntoIterator<Item = Vec3>) -> Option<Self> {
        let mut points = points.into_iter();
        let first = points.next()?;
        let (min, max) = points.fold((first, first), |(lo, hi), p| (lo.min(p), hi.max(p)));
        Some(Self::new(min.to_array(), max.to_array()))
    }

    /// Tests intersection with another AABB.
    pub fn intersects(&self, other: &Self) -> bool {
        self.min[0] <= other.max[0]
            && self.max[0] >= other.min[0]
            && self.min[1] <= other.max[1]
            && self.max[1] >= other.min[1]
            && self.min[2] <= other.max[2]
            && self.max[2] >= other.min[2]
    }

    /// Whether the vertical line through `(x, z)` passes through the box.
    pub fn contains_xz(&self, x: f32, z: f32) -> bool {
        x >= self.min[0] && x <= self.max[0] && z >= self.min[2] && z <= self.max[2]
    }
}

/// Opaque handle to a collider registered with a [`PhysicsWorld`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ColliderHandle(pub u64);

impl fmt::Display for ColliderHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "collider#{}", self.0)
    }
}

/// Reasons a collider cannot be created or removed.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PhysicsError {
    /// Mesh had no triangles.
    #[error("trimesh has no triangles")]
    EmptyMesh,
    /// Vertex buffer length is not a multiple of three.
    #[error("vertex buffer length {0} is not a multiple of 3")]
    VertexBufferLength(usize),
    /// Index buffer length is not a multiple of three.
    #[error("index buffer length {0} is not a multiple of 3")]
    IndexBufferLength(usize),
    /// An index points past the vertex buffer.
    #[error("index {index} out of bounds for {vertex_count} vertices")]
    IndexOutOfBounds {
        /// Offending index value.
        index: u32,
        /// Number of vertices supplied.
        vertex_count: usize,
    },
    /// A vertex coordinate is NaN or infinite.
    #[error("vertex {0} has a non-finite coordinate")]
    NonFiniteVertex(usize),
    /// The handle does not name a live collider.
    #[error("unknown {0}")]
    UnknownCollider(ColliderHandle),
}

/// Physics world the terrain streams colliders into.
pub trait PhysicsWorld {
    /// Register a static triangle mesh collider from world-space `(x, y, z)`
    /// triples and a triangle-list index buffer.
    fn insert_trimesh(
        &mut self,
        vertices: &[f32],
        indices: &[u32],
    ) -> Result<ColliderHandle, PhysicsError>;

    /// Remove a collider. Queries stop seeing it immediately.
    fn remove_collider(&mut self, handle: ColliderHandle) -> Result<(), PhysicsError>;

    /// Number of live colliders.
    fn collider_count(&self) -> usize;

    /// Height of the highest collider surface under `(x, z)`, if any.
    fn ground_height(&self, x: f32, z: f32) -> Option<f32>;
}

/// Static triangle mesh collider.
#[derive(Debug, Clone)]
pub struct TrimeshCollider {
    vertices: Vec<Vec3>,
    triangles: Vec<[u32; 3]>,
    bounds: Aabb,
}

impl TrimeshCollider {
    /// Validate buffers and build a collider.
    pub fn new(vertices: &[f32], indices: &[u32]) -> Result<Self, PhysicsError> {
        if vertices.len() % 3 != 0 {
            return Err(PhysicsError::VertexBufferLength(vertices.len()));
        }
        if indices.len() % 3 != 0 {
            return Err(PhysicsError::IndexBufferLength(indices.len()));
        }
        if indices.is_empty() {
            return Err(PhysicsError::EmptyMesh);
        }

        let mut points = Vec::with_capacity(vertices.len() / 3);
        for (i, v) in vertices.chunks_exact(3).enumerate() {
            let p = Vec3::new(v[0], v[1], v[2]);
            if !p.is_finite() {
                return Err(PhysicsError::NonFiniteVertex(i));
            }
            points.push(p);
        }

        let vertex_count = points.len();
        let mut triangles = Vec::with_capacity(indices.len() / 3);
        for tri in indices.chunks_exact(3) {
            if let Some(&index) = tri.iter().find(|&&i| i as usize >= vertex_count) {
                return Err(PhysicsError::IndexOutOfBounds {
                    index,
                    vertex_count,
                });
            }
            triangles.push([tri[0], tri[1], tri[2]]);
        }

        let bounds = Aabb::from_points(points.iter().copied()).ok_or(PhysicsError::EmptyMesh)?;
        Ok(Self {
            vertices: points,
            triangles,
            bounds,
        })
    }

    /// Bounding box of every vertex.
    pub fn bounds(&self) -> Aabb {
        self.bounds
    }

    /// Number of triangles.
    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    /// Highest surface point on the vertical line through `(x, z)`.
    pub fn height_at(&self, x: f32, z: f32) -> Option<f32> {
        if !self.bounds.contains_xz(x, z) {
            return None;
        }
        let p = Vec2::new(x, z);
        self.triangles
            .iter()
            .filter_map(|&[a, b, c]| {
                vertical_hit(
                    p,
                    self.vertices[a as usize],
                    self.vertices[b as usize],
                    self.vertices[c as usize],
                )
            })
            .reduce(f32::max)
    }
}

/// Height where a vertical line through `p` crosses triangle `abc`.
fn vertical_hit(p: Vec2, a: Vec3, b: Vec3, c: Vec3) -> Option<f32> {
    const EPS: f32 = 1e-5;
    let det = (b.z - c.z) * (a.x - c.x) + (c.x - b.x) * (a.z - c.z);
    if det.abs() < f32::EPSILON {
        return None;
    }
    let l1 = ((b.z - c.z) * (p.x - c.x) + (c.x - b.x) * (p.y - c.z)) / det;
    let l2 = ((c.z - a.z) * (p.x - c.x) + (a.x - c.x) * (p.y - c.z)) / det;
    let l3 = 1.0 - l1 - l2;
    if l1 < -EPS || l2 < -EPS || l3 < -EPS {
        return None;
    }
    Some(l1 * a.y + l2 * b.y + l3 * c.y)
}

/// In-memory collision world holding terrain trimeshes.
#[derive(Debug, Default)]
pub struct TerrainPhysics {
    colliders: HashMap<ColliderHandle, TrimeshCollider>,
    next_handle: u64,
}

impl TerrainPhysics {
    /// Empty world.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a live collider.
    pub fn collider(&self, handle: ColliderHandle) -> Option<&TrimeshCollider> {
        self.colliders.get(&handle)
    }
}

impl PhysicsWorld for TerrainPhysics {
    fn insert_trimesh(
        &mut self,
        vertices: &[f32],
        indices: &[u32],
    ) -> Result<ColliderHandle, PhysicsError> {
        let collider = TrimeshCollider::new(vertices, indices)?;
        let handle = ColliderHandle(self.next_handle);
        self.next_handle += 1;
        debug!(%handle, triangles = collider.triangle_count(), "Trimesh collider added");
        self.colliders.insert(handle, collider);
        Ok(handle)
    }

    fn remove_collider(&mut self, handle: ColliderHandle) -> Result<(), PhysicsError> {
        self.colliders
            .remove(&handle)
            .map(|_| ())
            .ok_or(PhysicsError::UnknownCollider(handle))
    }

    fn collider_count(&self) -> usize {
        self.colliders.len()
    }

    fn ground_height(&self, x: f32, z: f32) -> Option<f32> {
        self.colliders
            .values()
            .filter_map(|collider| collider.height_at(x, z))
            .reduce(f32::max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Unit quad at height 2 over [0,1]x[0,1].
    const QUAD: [f32; 12] = [
        0.0, 2.0, 0.0, 1.0, 2.0, 0.0, 0.0, 2.0, 1.0, 1.0, 2.0, 1.0,
    ];
    const QUAD_INDICES: [u32; 6] = [0, 2, 1, 2, 3, 1];

    #[test]
    fn aabb_intersection() {
        let a = Aabb::new([0.0; 3], [1.0; 3]);
        let b = Aabb::new([0.5; 3], [2.0; 3]);
        let c = Aabb::new([1.5; 3], [2.0; 3]);
        assert!(a.intersects(&b));
        assert!(!a.intersects(&c));
    }

    #[test]
    fn aabb_from_points() {
        let bounds = Aabb::from_points([Vec3::new(1.0, -2.0, 3.0), Vec3::new(-1.0, 4.0, 0.0)])
            .unwrap();
        assert_eq!(bounds.min, [-1.0, -2.0, 0.0]);
        assert_eq!(bounds.max, [1.0, 4.0, 3.0]);
        assert!(Aabb::from_points(std::iter::empty()).is_none());
    }

    #[test]
    fn ground_height_hits_flat_quad() {
        let mut world = TerrainPhysics::new();
        world.insert_trimesh(&QUAD, &QUAD_INDICES).unwrap();
        let h = world.ground_height(0.25, 0.75).unwrap();
        assert!((h - 2.0).abs() < 1e-6);
        assert!(world.ground_height(3.0, 3.0).is_none());
    }

    #[test]
    fn ground_height_interpolates_slope() {
        let sloped = [0.0, 0.0, 0.0, 1.0, 1.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0];
        let mut world = TerrainPhysics::new();
        world.insert_trimesh(&sloped, &QUAD_INDICES).unwrap();
        let h = world.ground_height(0.5, 0.5).unwrap();
        assert!((h - 0.5).abs() < 1e-5);
    }

    #[test]
    fn removed_colliders_stop_answering() {
        let mut world = TerrainPhysics::new();
        let handle = world.insert_trimesh(&QUAD, &QUAD_INDICES).unwrap();
        assert_eq!(world.collider_count(), 1);
        world.remove_collider(handle).unwrap();
        assert_eq!(world.collider_count(), 0);
        assert!(world.ground_height(0.5, 0.5).is_none());
        assert_eq!(
            world.remove_collider(handle),
            Err(PhysicsError::UnknownCollider(handle))
        );
    }

    #[test]
    fn invalid_buffers_are_rejected() {
        let mut world = TerrainPhysics::new();
        assert_eq!(
            world.insert_trimesh(&QUAD[..11], &QUAD_INDICES),
            Err(PhysicsError::VertexBufferLength(11))
        );
        assert_eq!(
            world.insert_trimesh(&QUAD, &QUAD_INDICES[..4]),
            Err(PhysicsError::IndexBufferLength(4))
        );
        assert_eq!(world.insert_trimesh(&QUAD, &[]), Err(PhysicsError::EmptyMesh));
        assert_eq!(
            world.insert_trimesh(&QUAD, &[0, 1, 9]),
            Err(PhysicsError::IndexOutOfBounds {
                index: 9,
                vertex_count: 4
            })
        );
        let mut poisoned = QUAD;
        poisoned[4] = f32::NAN;
        assert_eq!(
            world.insert_trimesh(&poisoned, &QUAD_INDICES),
            Err(PhysicsError::NonFiniteVertex(1))
        );
        assert_eq!(world.collider_count(), 0);
    }
}
