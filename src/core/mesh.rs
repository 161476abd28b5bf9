//! Triangle mesh input for grid construction.
//!
//! The scanning pipeline lives outside this crate; callers hand over
//! plain vertex and triangle-index buffers. Constructors for simple
//! synthetic geometry (floor slabs, box obstacles) are provided for
//! tests and host-side demos.

use crate::core::WorldPoint;

/// A reconstructed room mesh as flat vertex/index buffers.
#[derive(Clone, Debug, Default)]
pub struct RoomMesh {
    vertices: Vec<WorldPoint>,
    triangles: Vec<[u32; 3]>,
}

impl RoomMesh {
    /// Create a mesh from raw buffers. Indices referencing past the end
    /// of the vertex buffer are dropped rather than kept as landmines.
    pub fn new(vertices: Vec<WorldPoint>, triangles: Vec<[u32; 3]>) -> Self {
        let count = vertices.len() as u32;
        let triangles = triangles
            .into_iter()
            .filter(|t| t.iter().all(|&i| i < count))
            .collect();
        Self {
            vertices,
            triangles,
        }
    }

    /// Vertex buffer
    pub fn vertices(&self) -> &[WorldPoint] {
        &self.vertices
    }

    /// Triangle index buffer
    pub fn triangles(&self) -> &[[u32; 3]] {
        &self.triangles
    }

    /// Number of triangles
    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    /// Resolve a triangle to its three vertices
    pub fn triangle(&self, index: usize) -> Option<[WorldPoint; 3]> {
        self.triangles.get(index).map(|t| {
            [
                self.vertices[t[0] as usize],
                self.vertices[t[1] as usize],
                self.vertices[t[2] as usize],
            ]
        })
    }

    /// Iterate over resolved triangles in buffer order
    pub fn iter_triangles(&self) -> impl Iterator<Item = [WorldPoint; 3]> + '_ {
        self.triangles.iter().map(move |t| {
            [
                self.vertices[t[0] as usize],
                self.vertices[t[1] as usize],
                self.vertices[t[2] as usize],
            ]
        })
    }

    /// Axis-aligned bounds of the mesh, or None when empty
    pub fn bounds(&self) -> Option<(WorldPoint, WorldPoint)> {
        let first = self.vertices.first()?;
        let mut min = *first;
        let mut max = *first;
        for v in &self.vertices {
            min.x = min.x.min(v.x);
            min.y = min.y.min(v.y);
            min.z = min.z.min(v.z);
            max.x = max.x.max(v.x);
            max.y = max.y.max(v.y);
            max.z = max.z.max(v.z);
        }
        Some((min, max))
    }

    /// Append a single triangle
    pub fn push_triangle(&mut self, a: WorldPoint, b: WorldPoint, c: WorldPoint) {
        let base = self.vertices.len() as u32;
        self.vertices.extend_from_slice(&[a, b, c]);
        self.triangles.push([base, base + 1, base + 2]);
    }

    /// A flat rectangular floor slab at height `y`, spanning
    /// `[min_x, max_x] x [min_z, max_z]` as two triangles.
    pub fn floor_rect(min_x: f32, min_z: f32, max_x: f32, max_z: f32, y: f32) -> Self {
        let mut mesh = Self::default();
        let a = WorldPoint::new(min_x, y, min_z);
        let b = WorldPoint::new(max_x, y, min_z);
        let c = WorldPoint::new(max_x, y, max_z);
        let d = WorldPoint::new(min_x, y, max_z);
        mesh.push_triangle(a, b, c);
        mesh.push_triangle(a, c, d);
        mesh
    }

    /// Append an axis-aligned box (12 triangles) spanning `min`..`max`.
    /// Used to model furniture-like obstacles in tests and demos.
    pub fn add_box(&mut self, min: WorldPoint, max: WorldPoint) {
        let p = |x: f32, y: f32, z: f32| WorldPoint::new(x, y, z);
        // Corners: 0..3 bottom, 4..7 top
        let corners = [
            p(min.x, min.y, min.z),
            p(max.x, min.y, min.z),
            p(max.x, min.y, max.z),
            p(min.x, min.y, max.z),
            p(min.x, max.y, min.z),
            p(max.x, max.y, min.z),
            p(max.x, max.y, max.z),
            p(min.x, max.y, max.z),
        ];
        let faces: [[usize; 4]; 6] = [
            [0, 1, 2, 3], // bottom
            [4, 5, 6, 7], // top
            [0, 1, 5, 4], // -Z side
            [2, 3, 7, 6], // +Z side
            [1, 2, 6, 5], // +X side
            [3, 0, 4, 7], // -X side
        ];
        for f in faces {
            self.push_triangle(corners[f[0]], corners[f[1]], corners[f[2]]);
            self.push_triangle(corners[f[0]], corners[f[2]], corners[f[3]]);
        }
    }
}
