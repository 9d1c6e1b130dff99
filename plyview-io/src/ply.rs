//! PLY format support

use crate::{MeshReader, MeshWriter};
use plyview_core::{color_channel_from_f32, Color3, Error, Point3f, Result, TriangleMesh, Vector3f};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use ply_rs::{
    parser::Parser,
    writer::Writer,
    ply::{Addable, DefaultElement, ElementDef, Encoding, Ply, Property, PropertyDef, PropertyType, ScalarType},
};

/// Alternative names under which PLY exporters store vertex colors
const COLOR_PROPERTY_SETS: [[&str; 3]; 3] = [
    ["red", "green", "blue"],
    ["r", "g", "b"],
    ["diffuse_red", "diffuse_green", "diffuse_blue"],
];

pub struct PlyReader;
pub struct PlyWriter;

/// Encoding used when writing PLY files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlyFormat {
    #[default]
    Ascii,
    BinaryLittleEndian,
    BinaryBigEndian,
}

impl From<PlyFormat> for Encoding {
    fn from(format: PlyFormat) -> Self {
        match format {
            PlyFormat::Ascii => Encoding::Ascii,
            PlyFormat::BinaryLittleEndian => Encoding::BinaryLittleEndian,
            PlyFormat::BinaryBigEndian => Encoding::BinaryBigEndian,
        }
    }
}

impl PlyReader {
    /// Parse a mesh from any buffered PLY source (ASCII or binary)
    pub fn read_mesh_from_reader<R: BufRead>(reader: &mut R) -> Result<TriangleMesh> {
        let parser = Parser::<DefaultElement>::new();
        let ply = parser.read_ply(reader)?;

        let empty = Vec::new();
        let vertex_elements = ply.payload.get("vertex").unwrap_or(&empty);

        // Extract vertices
        let mut vertices = Vec::with_capacity(vertex_elements.len());
        for vertex in vertex_elements {
            let x = extract_property_value(vertex, "x")?;
            let y = extract_property_value(vertex, "y")?;
            let z = extract_property_value(vertex, "z")?;

            vertices.push(Point3f::new(x, y, z));
        }

        // Extract faces, fan-triangulating polygons
        let mut faces = Vec::new();
        if let Some(face_elements) = ply.payload.get("face") {
            for face in face_elements {
                let indices = extract_face_indices(face)?;
                for i in 1..indices.len().saturating_sub(1) {
                    faces.push([indices[0], indices[i], indices[i + 1]]);
                }
            }
        }

        let normals = extract_normals(vertex_elements);
        let colors = extract_colors(vertex_elements);

        let mut mesh = TriangleMesh::from_vertices_and_faces(vertices, faces);
        if let Some(normals) = normals {
            mesh.set_normals(normals);
        }
        if let Some(colors) = colors {
            mesh.set_colors(colors);
        }
        mesh.validate()?;

        Ok(mesh)
    }

    /// Parse a mesh from an in-memory PLY document
    pub fn read_mesh_from_bytes(bytes: &[u8]) -> Result<TriangleMesh> {
        let mut reader = BufReader::new(bytes);
        Self::read_mesh_from_reader(&mut reader)
    }
}

impl MeshReader for PlyReader {
    fn read_mesh<P: AsRef<Path>>(path: P) -> Result<TriangleMesh> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);
        Self::read_mesh_from_reader(&mut reader)
    }
}

impl PlyWriter {
    /// Write a mesh with the given encoding to any sink
    pub fn write_mesh_to<W: Write>(mesh: &TriangleMesh, out: &mut W, format: PlyFormat) -> Result<()> {
        mesh.validate()?;

        let mut ply = Ply::<DefaultElement>::new();
        ply.header.encoding = format.into();

        // Define vertex element
        let mut vertex_element = ElementDef::new("vertex".to_string());
        vertex_element.count = mesh.vertices.len();
        for name in ["x", "y", "z"] {
            vertex_element.properties.add(PropertyDef::new(
                name.to_string(),
                PropertyType::Scalar(ScalarType::Float),
            ));
        }
        if mesh.normals.is_some() {
            for name in ["nx", "ny", "nz"] {
                vertex_element.properties.add(PropertyDef::new(
                    name.to_string(),
                    PropertyType::Scalar(ScalarType::Float),
                ));
            }
        }
        if mesh.colors.is_some() {
            for name in COLOR_PROPERTY_SETS[0] {
                vertex_element.properties.add(PropertyDef::new(
                    name.to_string(),
                    PropertyType::Scalar(ScalarType::UChar),
                ));
            }
        }
        ply.header.elements.add(vertex_element);

        // Point clouds carry no face element at all
        if mesh.has_faces() {
            let mut face_element = ElementDef::new("face".to_string());
            face_element.count = mesh.faces.len();
            face_element.properties.add(PropertyDef::new(
                "vertex_indices".to_string(),
                PropertyType::List(ScalarType::UChar, ScalarType::Int),
            ));
            ply.header.elements.add(face_element);
        }

        let mut vertices = Vec::with_capacity(mesh.vertices.len());
        for (i, vertex) in mesh.vertices.iter().enumerate() {
            let mut element = DefaultElement::new();
            element.insert("x".to_string(), Property::Float(vertex.x));
            element.insert("y".to_string(), Property::Float(vertex.y));
            element.insert("z".to_string(), Property::Float(vertex.z));

            if let Some(normals) = &mesh.normals {
                element.insert("nx".to_string(), Property::Float(normals[i].x));
                element.insert("ny".to_string(), Property::Float(normals[i].y));
                element.insert("nz".to_string(), Property::Float(normals[i].z));
            }
            if let Some(colors) = &mesh.colors {
                for (channel, name) in COLOR_PROPERTY_SETS[0].iter().enumerate() {
                    element.insert(name.to_string(), Property::UChar(colors[i][channel]));
                }
            }

            vertices.push(element);
        }
        ply.payload.insert("vertex".to_string(), vertices);

        if mesh.has_faces() {
            let faces = mesh
                .faces
                .iter()
                .map(|face| {
                    let mut element = DefaultElement::new();
                    let indices = face.iter().map(|&i| i as i32).collect();
                    element.insert("vertex_indices".to_string(), Property::ListInt(indices));
                    element
                })
                .collect();
            ply.payload.insert("face".to_string(), faces);
        }

        let writer = Writer::new();
        writer.write_ply(out, &mut ply)?;
        out.flush()?;

        Ok(())
    }

    /// Write a mesh to a file with the given encoding
    pub fn write_mesh_with_format<P: AsRef<Path>>(mesh: &TriangleMesh, path: P, format: PlyFormat) -> Result<()> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        Self::write_mesh_to(mesh, &mut writer, format)
    }
}

impl MeshWriter for PlyWriter {
    fn write_mesh<P: AsRef<Path>>(mesh: &TriangleMesh, path: P) -> Result<()> {
        Self::write_mesh_with_format(mesh, path, PlyFormat::Ascii)
    }
}

/// Extract a property value as f32 from a PLY element
fn extract_property_value(element: &DefaultElement, name: &str) -> Result<f32> {
    match element.get(name) {
        Some(Property::Float(val)) => Ok(*val),
        Some(Property::Double(val)) => Ok(*val as f32),
        Some(Property::Char(val)) => Ok(*val as f32),
        Some(Property::UChar(val)) => Ok(*val as f32),
        Some(Property::Short(val)) => Ok(*val as f32),
        Some(Property::UShort(val)) => Ok(*val as f32),
        Some(Property::Int(val)) => Ok(*val as f32),
        Some(Property::UInt(val)) => Ok(*val as f32),
        _ => Err(Error::InvalidData(
            format!("Property '{}' not found or invalid type", name)
        )),
    }
}

/// Extract a color channel, scaling float channels from `[0, 1]`
fn extract_color_channel(element: &DefaultElement, name: &str) -> Option<u8> {
    match element.get(name)? {
        Property::UChar(val) => Some(*val),
        Property::Float(val) => Some(color_channel_from_f32(*val)),
        Property::Double(val) => Some(color_channel_from_f32(*val as f32)),
        Property::UShort(val) => Some((*val).min(255) as u8),
        Property::Int(val) => Some((*val).clamp(0, 255) as u8),
        Property::UInt(val) => Some((*val).min(255) as u8),
        _ => None,
    }
}

/// Per-vertex normals, only when every vertex carries all three components
fn extract_normals(vertices: &[DefaultElement]) -> Option<Vec<Vector3f>> {
    if vertices.is_empty() {
        return None;
    }
    vertices
        .iter()
        .map(|vertex| {
            let nx = extract_property_value(vertex, "nx").ok()?;
            let ny = extract_property_value(vertex, "ny").ok()?;
            let nz = extract_property_value(vertex, "nz").ok()?;
            Some(Vector3f::new(nx, ny, nz))
        })
        .collect()
}

/// Per-vertex colors from the first property naming scheme the file uses
fn extract_colors(vertices: &[DefaultElement]) -> Option<Vec<Color3>> {
    let first = vertices.first()?;
    let names = COLOR_PROPERTY_SETS
        .iter()
        .find(|names| names.iter().all(|name| first.contains_key(*name)))?;

    vertices
        .iter()
        .map(|vertex| {
            Some([
                extract_color_channel(vertex, names[0])?,
                extract_color_channel(vertex, names[1])?,
                extract_color_channel(vertex, names[2])?,
            ])
        })
        .collect()
}

/// Extract face indices from a PLY face element
fn extract_face_indices(element: &DefaultElement) -> Result<Vec<usize>> {
    fn non_negative<T: Copy + TryInto<usize>>(indices: &[T]) -> Result<Vec<usize>> {
        indices
            .iter()
            .map(|&idx| {
                idx.try_into()
                    .map_err(|_| Error::InvalidData("Negative face index".to_string()))
            })
            .collect()
    }

    match element.get("vertex_indices").or_else(|| element.get("vertex_index")) {
        Some(Property::ListInt(indices)) => non_negative(indices),
        Some(Property::ListUInt(indices)) => non_negative(indices),
        Some(Property::ListShort(indices)) => non_negative(indices),
        Some(Property::ListUShort(indices)) => non_negative(indices),
        Some(Property::ListChar(indices)) => non_negative(indices),
        Some(Property::ListUChar(indices)) => non_negative(indices),
        _ => Err(Error::InvalidData(
            "Face indices not found".to_string()
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use byteorder::{BigEndian, LittleEndian, WriteBytesExt};

    const COLORED_QUAD: &str = "ply
format ascii 1.0
comment quad split into two triangles
element vertex 4
property float x
property float y
property float z
property float nx
property float ny
property float nz
property uchar red
property uchar green
property uchar blue
element face 2
property list uchar int vertex_indices
end_header
0.0 0.0 0.0 0.0 0.0 1.0 255 0 0
1.0 0.0 0.0 0.0 0.0 1.0 0 255 0
1.0 1.0 0.0 0.0 0.0 1.0 0 0 255
0.0 1.0 0.0 0.0 0.0 1.0 255 255 255
3 0 1 2
3 0 2 3
";

    #[test]
    fn test_ascii_mesh_with_attributes() {
        let mesh = PlyReader::read_mesh_from_bytes(COLORED_QUAD.as_bytes()).unwrap();

        assert_eq!(mesh.vertex_count(), 4);
        assert_eq!(mesh.face_count(), 2);
        assert_eq!(mesh.faces[1], [0, 2, 3]);
        assert_eq!(mesh.vertices[2], Point3f::new(1.0, 1.0, 0.0));

        let normals = mesh.normals.as_ref().unwrap();
        assert_relative_eq!(normals[0], Vector3f::z());

        let colors = mesh.colors.as_ref().unwrap();
        assert_eq!(colors[0], [255, 0, 0]);
        assert_eq!(colors[3], [255, 255, 255]);
    }

    #[test]
    fn test_point_cloud_without_faces() {
        let ply = "ply
format ascii 1.0
element vertex 3
property double x
property double y
property double z
property float r
property float g
property float b
end_header
0 0 0 1.0 0.0 0.5
1 2 3 0.0 1.0 0.0
-1 -2 -3 0.25 0.25 0.25
";
        let mesh = PlyReader::read_mesh_from_bytes(ply.as_bytes()).unwrap();
        assert_eq!(mesh.vertex_count(), 3);
        assert!(!mesh.has_faces());
        assert!(mesh.normals.is_none());
        assert_eq!(mesh.colors.as_ref().unwrap()[0], [255, 0, 128]);
        assert_eq!(mesh.vertices[2], Point3f::new(-1.0, -2.0, -3.0));
    }

    #[test]
    fn test_polygon_fan_triangulation() {
        let ply = "ply
format ascii 1.0
element vertex 5
property float x
property float y
property float z
element face 1
property list uchar uint vertex_indices
end_header
0 0 0
1 0 0
1 1 0
0.5 1.5 0
0 1 0
5 0 1 2 3 4
";
        let mesh = PlyReader::read_mesh_from_bytes(ply.as_bytes()).unwrap();
        assert_eq!(mesh.faces, vec![[0, 1, 2], [0, 2, 3], [0, 3, 4]]);
    }

    #[test]
    fn test_out_of_range_face_index_is_rejected() {
        let ply = "ply
format ascii 1.0
element vertex 3
property float x
property float y
property float z
element face 1
property list uchar int vertex_indices
end_header
0 0 0
1 0 0
0 1 0
3 0 1 7
";
        let result = PlyReader::read_mesh_from_bytes(ply.as_bytes());
        assert!(matches!(result, Err(Error::InvalidData(_))));
    }

    #[test]
    fn test_negative_face_index_is_rejected() {
        let ply = "ply
format ascii 1.0
element vertex 3
property float x
property float y
property float z
element face 1
property list uchar int vertex_indices
end_header
0 0 0
1 0 0
0 1 0
3 0 1 -1
";
        assert!(PlyReader::read_mesh_from_bytes(ply.as_bytes()).is_err());
    }

    #[test]
    fn test_invalid_header_is_rejected() {
        assert!(PlyReader::read_mesh_from_bytes(b"not_ply\n").is_err());
        assert!(PlyReader::read_mesh_from_bytes(b"ply\nformat unknown_format 1.0\nend_header\n").is_err());
    }

    #[test]
    fn test_binary_little_endian() {
        let header = "ply\nformat binary_little_endian 1.0\nelement vertex 3\nproperty float x\nproperty float y\nproperty float z\nproperty uchar red\nproperty uchar green\nproperty uchar blue\nelement face 1\nproperty list uchar int vertex_indices\nend_header\n";
        let mut bytes = header.as_bytes().to_vec();
        for (p, c) in [([0.0f32, 0.0, 0.0], 10u8), ([2.0, 0.0, 0.0], 20), ([0.0, 4.0, 0.0], 30)] {
            for v in p {
                bytes.write_f32::<LittleEndian>(v).unwrap();
            }
            bytes.extend_from_slice(&[c, c, c]);
        }
        bytes.write_u8(3).unwrap();
        for i in [0i32, 1, 2] {
            bytes.write_i32::<LittleEndian>(i).unwrap();
        }

        let mesh = PlyReader::read_mesh_from_bytes(&bytes).unwrap();
        assert_eq!(mesh.vertex_count(), 3);
        assert_eq!(mesh.faces, vec![[0, 1, 2]]);
        assert_eq!(mesh.vertices[2], Point3f::new(0.0, 4.0, 0.0));
        assert_eq!(mesh.colors.as_ref().unwrap()[1], [20, 20, 20]);
    }

    #[test]
    fn test_binary_big_endian() {
        let header = "ply\nformat binary_big_endian 1.0\nelement vertex 1\nproperty float x\nproperty float y\nproperty float z\nend_header\n";
        let mut bytes = header.as_bytes().to_vec();
        for v in [10.0f32, 20.0, 30.0] {
            bytes.write_f32::<BigEndian>(v).unwrap();
        }

        let mesh = PlyReader::read_mesh_from_bytes(&bytes).unwrap();
        assert_eq!(mesh.vertices, vec![Point3f::new(10.0, 20.0, 30.0)]);
    }

    #[test]
    fn test_writer_binary_preserves_colors_and_faces() {
        let original = PlyReader::read_mesh_from_bytes(COLORED_QUAD.as_bytes()).unwrap();

        let mut buffer = Vec::new();
        PlyWriter::write_mesh_to(&original, &mut buffer, PlyFormat::BinaryLittleEndian).unwrap();
        assert!(buffer.starts_with(b"ply\nformat binary_little_endian"));

        let loaded = PlyReader::read_mesh_from_bytes(&buffer).unwrap();
        assert_eq!(loaded.faces, original.faces);
        assert_eq!(loaded.colors, original.colors);
        assert_eq!(loaded.vertices, original.vertices);
    }

    #[test]
    fn test_writer_point_cloud_has_no_face_element() {
        let cloud = TriangleMesh::from_points(vec![Point3f::new(1.0, 2.0, 3.0)]);
        let mut buffer = Vec::new();
        PlyWriter::write_mesh_to(&cloud, &mut buffer, PlyFormat::Ascii).unwrap();

        let text = String::from_utf8(buffer).unwrap();
        assert!(!text.contains("element face"));
    }
}
