use serde::{Deserialize, Serialize};

/// Opaque handle to a solid (or shell) in the geometry kernel.
/// NEVER persisted. Valid only for the current kernel session.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KernelSolidHandle(pub(crate) u64);

impl KernelSolidHandle {
    pub fn id(&self) -> u64 {
        self.0
    }
}

/// Transient kernel-internal entity identifier (faces, edges, vertices).
/// Stable within a single kernel session only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KernelId(pub u64);

/// The boundary entity that owns the nearest point of a distance query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Support {
    Face(KernelId),
    Edge(KernelId),
    Vertex(KernelId),
}

impl Support {
    pub fn face(self) -> Option<KernelId> {
        match self {
            Support::Face(id) => Some(id),
            _ => None,
        }
    }
}

/// Result of a point-to-shape distance query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DistanceQuery {
    pub distance: f64,
    pub nearest_point: [f64; 3],
    pub support: Support,
}

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min: [f64; 3],
    pub max: [f64; 3],
}

impl BoundingBox {
    /// Smallest box containing every point. `None` for an empty slice.
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a [f64; 3]>) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = *iter.next()?;
        let mut bbox = BoundingBox {
            min: first,
            max: first,
        };
        for p in iter {
            for i in 0..3 {
                bbox.min[i] = bbox.min[i].min(p[i]);
                bbox.max[i] = bbox.max[i].max(p[i]);
            }
        }
        Some(bbox)
    }

    pub fn extent(&self, axis: usize) -> f64 {
        self.max[axis] - self.min[axis]
    }

    pub fn overlaps(&self, other: &BoundingBox) -> bool {
        (0..3).all(|i| self.min[i] <= other.max[i] && other.min[i] <= self.max[i])
    }

    /// Distance between the two boxes; zero when they touch or overlap.
    pub fn separation(&self, other: &BoundingBox) -> f64 {
        let mut sq = 0.0;
        for i in 0..3 {
            let gap = (other.min[i] - self.max[i]).max(self.min[i] - other.max[i]).max(0.0);
            sq += gap * gap;
        }
        sq.sqrt()
    }
}

/// Errors from kernel operations.
#[derive(Debug, Clone, thiserror::Error)]
pub enum KernelError {
    /// The kernel ran the operation but did not report completion.
    #[error("{operation} did not complete: {reason}")]
    Incomplete { operation: String, reason: String },

    #[error("could not read '{path}': {reason}")]
    ImportFailed { path: String, reason: String },

    #[error("could not write '{path}': {reason}")]
    ExportFailed { path: String, reason: String },

    #[error("tessellation failed: {reason}")]
    TessellationFailed { reason: String },

    #[error("entity not found: {id:?}")]
    EntityNotFound { id: KernelId },

    #[error("operation not supported: {operation}")]
    NotSupported { operation: String },

    #[error("kernel error: {message}")]
    Other { message: String },
}

impl KernelError {
    pub fn incomplete(operation: &str, reason: impl Into<String>) -> Self {
        KernelError::Incomplete {
            operation: operation.to_string(),
            reason: reason.into(),
        }
    }

    pub fn is_incomplete(&self) -> bool {
        matches!(self, KernelError::Incomplete { .. })
    }
}

/// Tessellated triangle mesh.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderMesh {
    /// Flat array of vertex positions [x0, y0, z0, x1, y1, z1, ...].
    pub vertices: Vec<f32>,
    /// Flat array of vertex normals [nx0, ny0, nz0, nx1, ny1, nz1, ...].
    pub normals: Vec<f32>,
    /// Triangle indices into the vertex array.
    pub indices: Vec<u32>,
    /// Mapping from triangle ranges to logical faces.
    pub face_ranges: Vec<FaceRange>,
}

/// Maps a contiguous range of triangles to a logical face.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaceRange {
    pub face_id: KernelId,
    /// Start index in the indices array (inclusive).
    pub start_index: u32,
    /// End index in the indices array (exclusive).
    pub end_index: u32,
}
