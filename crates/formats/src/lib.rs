//! Model ingestion: binary glTF containers in, renderer-ready triangles out.
//!
//! A decoded [`MeshData`] is flat: every primitive of every node collapses
//! into one triangle soup with per-vertex color baked from the primitive's
//! base color. Surface response is not taken from the file at all; the
//! showcase applies one fixed material touch-up to every mesh
//! ([`METALLIC_OVERRIDE`] / [`ROUGHNESS_OVERRIDE`]).

/// Metalness applied to every loaded mesh.
pub const METALLIC_OVERRIDE: f32 = 0.5;

/// Roughness applied to every loaded mesh.
pub const ROUGHNESS_OVERRIDE: f32 = 0.2;

/// Body color of the placeholder phone.
pub const DEFAULT_PLACEHOLDER_COLOR: [f32; 3] = [0.0, 0.0, 0.0];

/// Screen color of the placeholder phone (near-black glass).
const PLACEHOLDER_SCREEN_COLOR: [f32; 3] = [0.07, 0.07, 0.07];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeshVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub color: [f32; 4],
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct MeshData {
    pub vertices: Vec<MeshVertex>,
    pub indices: Vec<u32>,
}

impl MeshData {
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MeshError {
    Parse(String),
    Empty,
}

impl std::fmt::Display for MeshError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MeshError::Parse(msg) => write!(f, "model container unreadable: {msg}"),
            MeshError::Empty => write!(f, "model contains no triangles"),
        }
    }
}

impl std::error::Error for MeshError {}

/// Decode a GLB (or embedded glTF) byte buffer into one flat mesh.
///
/// Node transforms are applied; normals are taken from the file or rebuilt
/// flat per face when a primitive omits them. Only triangle primitives are
/// ingested.
pub fn decode_glb(bytes: &[u8]) -> Result<MeshData, MeshError> {
    let (document, buffers, _images) =
        gltf::import_slice(bytes).map_err(|e| MeshError::Parse(e.to_string()))?;

    let mut mesh = MeshData::default();

    let scene = document.default_scene().or_else(|| document.scenes().next());
    match scene {
        Some(scene) => {
            for node in scene.nodes() {
                ingest_node(&node, IDENTITY, &buffers, &mut mesh);
            }
        }
        None => {
            // Sceneless asset: take every mesh at its node's local transform.
            // document.nodes() already yields children, so no recursion here.
            for node in document.nodes() {
                if let Some(node_mesh) = node.mesh() {
                    ingest_mesh(&node_mesh, node.transform().matrix(), &buffers, &mut mesh);
                }
            }
        }
    }

    if mesh.is_empty() {
        return Err(MeshError::Empty);
    }
    Ok(mesh)
}

const IDENTITY: [[f32; 4]; 4] = [
    [1.0, 0.0, 0.0, 0.0],
    [0.0, 1.0, 0.0, 0.0],
    [0.0, 0.0, 1.0, 0.0],
    [0.0, 0.0, 0.0, 1.0],
];

fn ingest_node(
    node: &gltf::Node,
    parent: [[f32; 4]; 4],
    buffers: &[gltf::buffer::Data],
    out: &mut MeshData,
) {
    let local = node.transform().matrix();
    let world = mat4_mul(parent, local);

    if let Some(mesh) = node.mesh() {
        ingest_mesh(&mesh, world, buffers, out);
    }

    for child in node.children() {
        ingest_node(&child, world, buffers, out);
    }
}

fn ingest_mesh(
    mesh: &gltf::Mesh,
    world: [[f32; 4]; 4],
    buffers: &[gltf::buffer::Data],
    out: &mut MeshData,
) {
    for primitive in mesh.primitives() {
        if primitive.mode() != gltf::mesh::Mode::Triangles {
            continue;
        }
        ingest_primitive(&primitive, world, buffers, out);
    }
}

fn ingest_primitive(
    primitive: &gltf::Primitive,
    world: [[f32; 4]; 4],
    buffers: &[gltf::buffer::Data],
    out: &mut MeshData,
) {
    let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(|d| &d.0[..]));

    let Some(positions) = reader.read_positions() else {
        return;
    };
    let positions: Vec<[f32; 3]> = positions.map(|p| transform_point(world, p)).collect();

    let indices: Vec<u32> = match reader.read_indices() {
        Some(indices) => indices.into_u32().collect(),
        None => (0..positions.len() as u32).collect(),
    };

    let color = primitive.material().pbr_metallic_roughness().base_color_factor();

    match reader.read_normals() {
        Some(normals) => {
            let base = out.vertices.len() as u32;
            let normals: Vec<[f32; 3]> = normals.map(|n| transform_normal(world, n)).collect();
            for (i, position) in positions.iter().enumerate() {
                out.vertices.push(MeshVertex {
                    position: *position,
                    normal: normals.get(i).copied().unwrap_or([0.0, 0.0, 1.0]),
                    color,
                });
            }
            out.indices.extend(indices.iter().map(|i| base + i));
        }
        None => {
            // No normals in the file: rebuild flat ones, one triangle at a time.
            for tri in indices.chunks_exact(3) {
                let (Some(a), Some(b), Some(c)) = (
                    positions.get(tri[0] as usize),
                    positions.get(tri[1] as usize),
                    positions.get(tri[2] as usize),
                ) else {
                    continue;
                };
                let normal = face_normal(*a, *b, *c);
                let base = out.vertices.len() as u32;
                for position in [*a, *b, *c] {
                    out.vertices.push(MeshVertex {
                        position,
                        normal,
                        color,
                    });
                }
                out.indices.extend([base, base + 1, base + 2]);
            }
        }
    }
}

/// Box-and-screen stand-in shown when a real model cannot be loaded.
///
/// Body is a 1 x 2 x 0.1 slab in `body_color`; the screen is a slightly
/// inset dark plane floating just off the front face.
pub fn placeholder(body_color: [f32; 3]) -> MeshData {
    let mut mesh = MeshData::default();
    push_box(
        &mut mesh,
        [1.0, 2.0, 0.1],
        [body_color[0], body_color[1], body_color[2], 1.0],
    );
    push_front_plane(
        &mut mesh,
        0.9,
        1.8,
        0.051,
        [
            PLACEHOLDER_SCREEN_COLOR[0],
            PLACEHOLDER_SCREEN_COLOR[1],
            PLACEHOLDER_SCREEN_COLOR[2],
            1.0,
        ],
    );
    mesh
}

fn push_box(out: &mut MeshData, size: [f32; 3], color: [f32; 4]) {
    let [hx, hy, hz] = [size[0] * 0.5, size[1] * 0.5, size[2] * 0.5];

    // One quad per face, flat normals.
    let faces: [([f32; 3], [[f32; 3]; 4]); 6] = [
        (
            [0.0, 0.0, 1.0],
            [
                [-hx, -hy, hz],
                [hx, -hy, hz],
                [hx, hy, hz],
                [-hx, hy, hz],
            ],
        ),
        (
            [0.0, 0.0, -1.0],
            [
                [hx, -hy, -hz],
                [-hx, -hy, -hz],
                [-hx, hy, -hz],
                [hx, hy, -hz],
            ],
        ),
        (
            [1.0, 0.0, 0.0],
            [
                [hx, -hy, hz],
                [hx, -hy, -hz],
                [hx, hy, -hz],
                [hx, hy, hz],
            ],
        ),
        (
            [-1.0, 0.0, 0.0],
            [
                [-hx, -hy, -hz],
                [-hx, -hy, hz],
                [-hx, hy, hz],
                [-hx, hy, -hz],
            ],
        ),
        (
            [0.0, 1.0, 0.0],
            [
                [-hx, hy, hz],
                [hx, hy, hz],
                [hx, hy, -hz],
                [-hx, hy, -hz],
            ],
        ),
        (
            [0.0, -1.0, 0.0],
            [
                [-hx, -hy, -hz],
                [hx, -hy, -hz],
                [hx, -hy, hz],
                [-hx, -hy, hz],
            ],
        ),
    ];

    for (normal, corners) in faces {
        push_quad(out, corners, normal, color);
    }
}

fn push_front_plane(out: &mut MeshData, width: f32, height: f32, z: f32, color: [f32; 4]) {
    let (hx, hy) = (width * 0.5, height * 0.5);
    push_quad(
        out,
        [[-hx, -hy, z], [hx, -hy, z], [hx, hy, z], [-hx, hy, z]],
        [0.0, 0.0, 1.0],
        color,
    );
}

fn push_quad(out: &mut MeshData, corners: [[f32; 3]; 4], normal: [f32; 3], color: [f32; 4]) {
    let base = out.vertices.len() as u32;
    for position in corners {
        out.vertices.push(MeshVertex {
            position,
            normal,
            color,
        });
    }
    out.indices
        .extend([base, base + 1, base + 2, base, base + 2, base + 3]);
}

fn transform_point(m: [[f32; 4]; 4], p: [f32; 3]) -> [f32; 3] {
    [
        m[0][0] * p[0] + m[1][0] * p[1] + m[2][0] * p[2] + m[3][0],
        m[0][1] * p[0] + m[1][1] * p[1] + m[2][1] * p[2] + m[3][1],
        m[0][2] * p[0] + m[1][2] * p[1] + m[2][2] * p[2] + m[3][2],
    ]
}

// Rotation-and-scale part only, renormalized. Placement scales here are
// uniform, which keeps this exact.
fn transform_normal(m: [[f32; 4]; 4], n: [f32; 3]) -> [f32; 3] {
    normalize([
        m[0][0] * n[0] + m[1][0] * n[1] + m[2][0] * n[2],
        m[0][1] * n[0] + m[1][1] * n[1] + m[2][1] * n[2],
        m[0][2] * n[0] + m[1][2] * n[1] + m[2][2] * n[2],
    ])
}

fn face_normal(a: [f32; 3], b: [f32; 3], c: [f32; 3]) -> [f32; 3] {
    let u = [b[0] - a[0], b[1] - a[1], b[2] - a[2]];
    let v = [c[0] - a[0], c[1] - a[1], c[2] - a[2]];
    normalize([
        u[1] * v[2] - u[2] * v[1],
        u[2] * v[0] - u[0] * v[2],
        u[0] * v[1] - u[1] * v[0],
    ])
}

fn normalize(v: [f32; 3]) -> [f32; 3] {
    let n = (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt();
    if n > 1e-10 {
        [v[0] / n, v[1] / n, v[2] / n]
    } else {
        [0.0, 0.0, 1.0]
    }
}

fn mat4_mul(a: [[f32; 4]; 4], b: [[f32; 4]; 4]) -> [[f32; 4]; 4] {
    let mut c = [[0.0f32; 4]; 4];
    for col in 0..4 {
        for row in 0..4 {
            c[col][row] = a[0][row] * b[col][0]
                + a[1][row] * b[col][1]
                + a[2][row] * b[col][2]
                + a[3][row] * b[col][3];
        }
    }
    c
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Assemble a minimal valid GLB: one triangle, indexed, no normals.
    fn tiny_glb() -> Vec<u8> {
        let positions: [f32; 9] = [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0];
        let indices: [u16; 3] = [0, 1, 2];

        let mut bin: Vec<u8> = Vec::new();
        for v in positions {
            bin.extend_from_slice(&v.to_le_bytes());
        }
        for i in indices {
            bin.extend_from_slice(&i.to_le_bytes());
        }
        let bin_unpadded = bin.len();
        while bin.len() % 4 != 0 {
            bin.push(0);
        }

        let json = serde_json::json!({
            "asset": {"version": "2.0"},
            "scene": 0,
            "scenes": [{"nodes": [0]}],
            "nodes": [{"mesh": 0}],
            "meshes": [{"primitives": [{"attributes": {"POSITION": 0}, "indices": 1}]}],
            "buffers": [{"byteLength": bin_unpadded}],
            "bufferViews": [
                {"buffer": 0, "byteOffset": 0, "byteLength": 36},
                {"buffer": 0, "byteOffset": 36, "byteLength": 6}
            ],
            "accessors": [
                {"bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3",
                 "min": [0.0, 0.0, 0.0], "max": [1.0, 1.0, 0.0]},
                {"bufferView": 1, "componentType": 5123, "count": 3, "type": "SCALAR"}
            ]
        });
        let mut json_bytes = serde_json::to_vec(&json).unwrap();
        while json_bytes.len() % 4 != 0 {
            json_bytes.push(b' ');
        }

        let total = 12 + 8 + json_bytes.len() + 8 + bin.len();
        let mut glb: Vec<u8> = Vec::with_capacity(total);
        glb.extend_from_slice(b"glTF");
        glb.extend_from_slice(&2u32.to_le_bytes());
        glb.extend_from_slice(&(total as u32).to_le_bytes());
        glb.extend_from_slice(&(json_bytes.len() as u32).to_le_bytes());
        glb.extend_from_slice(b"JSON");
        glb.extend_from_slice(&json_bytes);
        glb.extend_from_slice(&(bin.len() as u32).to_le_bytes());
        glb.extend_from_slice(b"BIN\0");
        glb.extend_from_slice(&bin);
        glb
    }

    #[test]
    fn decodes_a_minimal_glb() {
        let mesh = decode_glb(&tiny_glb()).unwrap();
        assert_eq!(mesh.triangle_count(), 1);
        assert_eq!(mesh.vertices.len(), 3);
        // No normals in the file -> flat ones rebuilt, here facing +Z.
        for v in &mesh.vertices {
            assert!((v.normal[2] - 1.0).abs() < 1e-6);
        }
        // Default material bakes to opaque white.
        assert_eq!(mesh.vertices[0].color, [1.0, 1.0, 1.0, 1.0]);
    }

    #[test]
    fn garbage_bytes_are_a_parse_error() {
        let err = decode_glb(b"definitely not a model").unwrap_err();
        assert!(matches!(err, MeshError::Parse(_)));
    }

    #[test]
    fn truncated_glb_is_a_parse_error() {
        let mut bytes = tiny_glb();
        bytes.truncate(20);
        let err = decode_glb(&bytes).unwrap_err();
        assert!(matches!(err, MeshError::Parse(_)));
    }

    #[test]
    fn placeholder_is_a_phone_shaped_slab() {
        let mesh = placeholder(DEFAULT_PLACEHOLDER_COLOR);
        // 6 box faces + 1 screen quad, 2 triangles each.
        assert_eq!(mesh.triangle_count(), 14);
        assert_eq!(mesh.vertices.len(), 28);

        // Body spans the slab, screen floats just past the front face.
        let max_y = mesh
            .vertices
            .iter()
            .map(|v| v.position[1])
            .fold(f32::MIN, f32::max);
        assert_eq!(max_y, 1.0);
        let max_z = mesh
            .vertices
            .iter()
            .map(|v| v.position[2])
            .fold(f32::MIN, f32::max);
        assert!((max_z - 0.051).abs() < 1e-6);

        // Screen quad is darker than opaque black would make visible, but
        // distinct from the body color.
        let screen_vertices = mesh
            .vertices
            .iter()
            .filter(|v| (v.position[2] - 0.051).abs() < 1e-6)
            .count();
        assert_eq!(screen_vertices, 4);
    }

    #[test]
    fn placeholder_normals_are_unit_length() {
        let mesh = placeholder([0.2, 0.2, 0.2]);
        for v in &mesh.vertices {
            let n = v.normal;
            let len = (n[0] * n[0] + n[1] * n[1] + n[2] * n[2]).sqrt();
            assert!((len - 1.0).abs() < 1e-6);
        }
    }
}
