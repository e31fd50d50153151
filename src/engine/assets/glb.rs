//! Reader for binary glTF (.glb) model containers.
//!
//! Only the scene structure is decoded: node names, hierarchy, local
//! transforms, skin joint membership and mesh bounding boxes. Vertex and
//! material data stay opaque to us and are left to whatever consumes the
//! binary chunk.

use ahash::{HashMap, HashSet, HashSetExt};
use byteorder::{LittleEndian, ReadBytesExt};
use glam::{Mat4, Quat, Vec3};
use serde::Deserialize;

use crate::engine::{bounds::Aabb, transform::Transform};

const GLB_MAGIC: u32 = 0x4654_6C67; // "glTF"
const GLB_VERSION: u32 = 2;
const CHUNK_JSON: u32 = 0x4E4F_534A; // "JSON"

#[derive(Debug, thiserror::Error)]
pub enum GlbError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Not a glb container")]
    BadMagic,

    #[error("Unsupported container version: {0}")]
    UnsupportedVersion(u32),

    #[error("Container has no JSON chunk")]
    MissingJson,

    #[error("Malformed document: {0}")]
    Document(#[from] serde_json::Error),

    #[error("Node index out of range: {0}")]
    NodeIndex(usize),

    #[error("Mesh index out of range: {0}")]
    MeshIndex(usize),

    #[error("Accessor index out of range: {0}")]
    AccessorIndex(usize),
}

/// A single named, transformable entity in the imported model.
#[derive(Clone, Debug, PartialEq)]
pub struct ModelNode {
    pub name: String,
    pub parent: Option<usize>,
    pub transform: Transform,
    /// Bounding box of the node's mesh in node-local space, if it has one.
    pub bounds: Option<Aabb>,
    /// Whether the node is referenced as a skin joint.
    pub is_joint: bool,
}

/// The imported model: a flat list of nodes in document order, with parent
/// links resolved. Parsing the same bytes always yields the same nodes.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ModelAsset {
    pub nodes: Vec<ModelNode>,
}

impl ModelAsset {
    pub fn read<R>(r: &mut R) -> Result<Self, GlbError>
    where
        R: std::io::Read,
    {
        let magic = r.read_u32::<LittleEndian>()?;
        if magic != GLB_MAGIC {
            return Err(GlbError::BadMagic);
        }

        let version = r.read_u32::<LittleEndian>()?;
        if version != GLB_VERSION {
            return Err(GlbError::UnsupportedVersion(version));
        }

        let _total_length = r.read_u32::<LittleEndian>()?;

        let mut json = None;
        while let Some((chunk_type, data)) = read_chunk(r)? {
            if chunk_type == CHUNK_JSON && json.is_none() {
                json = Some(data);
            }
            // The BIN chunk holds vertex data we never decode.
        }

        let json = json.ok_or(GlbError::MissingJson)?;
        let document: Document = serde_json::from_slice(&json)?;

        Self::from_document(document)
    }

    fn from_document(document: Document) -> Result<Self, GlbError> {
        let node_count = document.nodes.len();

        let mut parents: Vec<Option<usize>> = vec![None; node_count];
        for (index, node) in document.nodes.iter().enumerate() {
            for &child in node.children.iter() {
                if child >= node_count {
                    return Err(GlbError::NodeIndex(child));
                }
                // First parent wins; a well-formed document only has one.
                if parents[child].is_none() {
                    parents[child] = Some(index);
                }
            }
        }

        let mut joints = HashSet::new();
        for skin in document.skins.iter() {
            for &joint in skin.joints.iter() {
                if joint >= node_count {
                    return Err(GlbError::NodeIndex(joint));
                }
                joints.insert(joint);
            }
        }

        let mut nodes = Vec::with_capacity(node_count);
        for (index, node) in document.nodes.iter().enumerate() {
            let bounds = match node.mesh {
                Some(mesh_index) => mesh_bounds(&document, mesh_index)?,
                None => None,
            };

            nodes.push(ModelNode {
                name: node
                    .name
                    .clone()
                    .unwrap_or_else(|| format!("node_{index}")),
                parent: parents[index],
                transform: node.local_transform(),
                bounds,
                is_joint: joints.contains(&index),
            });
        }

        Ok(Self { nodes })
    }
}

fn read_chunk<R>(r: &mut R) -> Result<Option<(u32, Vec<u8>)>, GlbError>
where
    R: std::io::Read,
{
    let length = match r.read_u32::<LittleEndian>() {
        Ok(length) => length,
        Err(err) if err.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(err) => return Err(err.into()),
    };
    let chunk_type = r.read_u32::<LittleEndian>()?;

    let mut data = vec![0_u8; length as usize];
    r.read_exact(&mut data)?;

    Ok(Some((chunk_type, data)))
}

fn mesh_bounds(document: &Document, mesh_index: usize) -> Result<Option<Aabb>, GlbError> {
    let mesh = document
        .meshes
        .get(mesh_index)
        .ok_or(GlbError::MeshIndex(mesh_index))?;

    let mut bounds: Option<Aabb> = None;
    for primitive in mesh.primitives.iter() {
        let Some(&accessor_index) = primitive.attributes.get("POSITION") else {
            continue;
        };
        let accessor = document
            .accessors
            .get(accessor_index)
            .ok_or(GlbError::AccessorIndex(accessor_index))?;

        let (Some(min), Some(max)) = (vec3_from(&accessor.min), vec3_from(&accessor.max)) else {
            continue;
        };

        let aabb = Aabb::new(min, max);
        bounds = Some(match bounds {
            Some(existing) => existing.union(&aabb),
            None => aabb,
        });
    }

    Ok(bounds)
}

fn vec3_from(values: &Option<Vec<f32>>) -> Option<Vec3> {
    let values = values.as_ref()?;
    if values.len() < 3 {
        return None;
    }
    Some(Vec3::new(values[0], values[1], values[2]))
}

#[derive(Deserialize)]
struct Document {
    #[serde(default)]
    nodes: Vec<DocumentNode>,
    #[serde(default)]
    meshes: Vec<DocumentMesh>,
    #[serde(default)]
    accessors: Vec<DocumentAccessor>,
    #[serde(default)]
    skins: Vec<DocumentSkin>,
}

#[derive(Deserialize)]
struct DocumentNode {
    name: Option<String>,
    #[serde(default)]
    children: Vec<usize>,
    translation: Option<[f32; 3]>,
    rotation: Option<[f32; 4]>,
    scale: Option<[f32; 3]>,
    matrix: Option<[f32; 16]>,
    mesh: Option<usize>,
}

impl DocumentNode {
    /// A node carries either a whole matrix or separate TRS properties.
    fn local_transform(&self) -> Transform {
        if let Some(matrix) = self.matrix {
            return Transform::from_mat4(Mat4::from_cols_array(&matrix));
        }

        let translation = self.translation.map(Vec3::from).unwrap_or(Vec3::ZERO);
        let rotation = self
            .rotation
            .map(|[x, y, z, w]| Quat::from_xyzw(x, y, z, w))
            .unwrap_or(Quat::IDENTITY);
        let scale = self.scale.map(Vec3::from).unwrap_or(Vec3::ONE);

        Transform::new(translation, rotation, scale)
    }
}

#[derive(Deserialize)]
struct DocumentMesh {
    #[serde(default)]
    primitives: Vec<DocumentPrimitive>,
}

#[derive(Deserialize)]
struct DocumentPrimitive {
    #[serde(default)]
    attributes: HashMap<String, usize>,
}

#[derive(Deserialize)]
struct DocumentAccessor {
    min: Option<Vec<f32>>,
    max: Option<Vec<f32>>,
}

#[derive(Deserialize)]
struct DocumentSkin {
    #[serde(default)]
    joints: Vec<usize>,
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use byteorder::{LittleEndian, WriteBytesExt};

    /// Wrap a glTF JSON document into a glb container.
    pub(crate) fn container(json: &str) -> Vec<u8> {
        let mut payload = json.as_bytes().to_vec();
        while payload.len() % 4 != 0 {
            payload.push(b' ');
        }

        let mut out = Vec::new();
        out.write_u32::<LittleEndian>(GLB_MAGIC).unwrap();
        out.write_u32::<LittleEndian>(GLB_VERSION).unwrap();
        out.write_u32::<LittleEndian>(12 + 8 + payload.len() as u32)
            .unwrap();
        out.write_u32::<LittleEndian>(payload.len() as u32).unwrap();
        out.write_u32::<LittleEndian>(CHUNK_JSON).unwrap();
        out.extend_from_slice(&payload);
        out
    }

    pub(crate) const RIG: &str = r#"{
        "scene": 0,
        "scenes": [{"nodes": [0]}],
        "nodes": [
            {"name": "Armature", "children": [1, 3]},
            {"name": "mixamorig:RightArm", "children": [2],
             "translation": [0.2, 1.4, 0.0],
             "rotation": [0.0, 0.0, 0.0, 1.0]},
            {"name": "mixamorig:RightForeArm", "translation": [0.0, -0.3, 0.0]},
            {"name": "Body", "mesh": 0}
        ],
        "meshes": [{"primitives": [{"attributes": {"POSITION": 0}}]}],
        "accessors": [{"min": [-0.5, 0.0, -0.5], "max": [0.5, 1.8, 0.5]}],
        "skins": [{"joints": [1, 2]}]
    }"#;

    fn read(bytes: &[u8]) -> Result<ModelAsset, GlbError> {
        ModelAsset::read(&mut std::io::Cursor::new(bytes))
    }

    #[test]
    fn reads_named_entities() {
        let asset = read(&container(RIG)).unwrap();

        let names: Vec<&str> = asset.nodes.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "Armature",
                "mixamorig:RightArm",
                "mixamorig:RightForeArm",
                "Body"
            ]
        );
    }

    #[test]
    fn resolves_parents_and_joints() {
        let asset = read(&container(RIG)).unwrap();

        assert_eq!(asset.nodes[0].parent, None);
        assert_eq!(asset.nodes[1].parent, Some(0));
        assert_eq!(asset.nodes[2].parent, Some(1));
        assert_eq!(asset.nodes[3].parent, Some(0));

        assert!(!asset.nodes[0].is_joint);
        assert!(asset.nodes[1].is_joint);
        assert!(asset.nodes[2].is_joint);
        assert!(!asset.nodes[3].is_joint);
    }

    #[test]
    fn reads_transforms_and_bounds() {
        let asset = read(&container(RIG)).unwrap();

        assert_eq!(
            asset.nodes[1].transform.translation,
            Vec3::new(0.2, 1.4, 0.0)
        );
        let bounds = asset.nodes[3].bounds.unwrap();
        assert_eq!(bounds.min, Vec3::new(-0.5, 0.0, -0.5));
        assert_eq!(bounds.max, Vec3::new(0.5, 1.8, 0.5));
    }

    #[test]
    fn matrix_nodes_are_decomposed() {
        let json = r#"{
            "nodes": [{"name": "a",
                "matrix": [1,0,0,0, 0,1,0,0, 0,0,1,0, 3,4,5,1]}]
        }"#;
        let asset = read(&container(json)).unwrap();
        assert_eq!(
            asset.nodes[0].transform.translation,
            Vec3::new(3.0, 4.0, 5.0)
        );
    }

    #[test]
    fn unnamed_nodes_get_stable_names() {
        let json = r#"{"nodes": [{}, {"name": "named"}, {}]}"#;
        let asset = read(&container(json)).unwrap();
        let names: Vec<&str> = asset.nodes.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, vec!["node_0", "named", "node_2"]);
    }

    #[test]
    fn parsing_is_deterministic() {
        let bytes = container(RIG);
        let first = read(&bytes).unwrap();
        let second = read(&bytes).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn rejects_bad_magic() {
        let mut bytes = container(RIG);
        bytes[0] = b'x';
        assert!(matches!(read(&bytes), Err(GlbError::BadMagic)));
    }

    #[test]
    fn rejects_unsupported_version() {
        let mut bytes = container(RIG);
        bytes[4] = 1;
        assert!(matches!(
            read(&bytes),
            Err(GlbError::UnsupportedVersion(1))
        ));
    }

    #[test]
    fn rejects_container_without_a_json_chunk() {
        let mut out = Vec::new();
        out.write_u32::<LittleEndian>(GLB_MAGIC).unwrap();
        out.write_u32::<LittleEndian>(GLB_VERSION).unwrap();
        out.write_u32::<LittleEndian>(12 + 8 + 4).unwrap();
        out.write_u32::<LittleEndian>(4).unwrap();
        out.write_u32::<LittleEndian>(0x004E_4942).unwrap(); // "BIN\0"
        out.extend_from_slice(&[0, 0, 0, 0]);

        assert!(matches!(read(&out), Err(GlbError::MissingJson)));
    }

    #[test]
    fn rejects_out_of_range_child() {
        let json = r#"{"nodes": [{"children": [7]}]}"#;
        assert!(matches!(
            read(&container(json)),
            Err(GlbError::NodeIndex(7))
        ));
    }

    #[test]
    fn rejects_truncated_container() {
        let mut bytes = container(RIG);
        bytes.truncate(bytes.len() - 10);
        assert!(matches!(read(&bytes), Err(GlbError::Io(_))));
    }
}
