//! BXDA binary mesh container
//!
//! One file per rigid node. Everything is little-endian and length-prefixed
//! so a reader can preallocate without scanning ahead:
//!
//! ```text
//! header:    version (u32 length + utf8), mesh GUID (16 bytes),
//!            sub-mesh count (u32)
//! sub-mesh:  vertex count (u32), vertices (3 f32 position + 3 f32 normal),
//!            surface count (u32)
//! surface:   triangle count (u32), indices (3 u32 per triangle),
//!            RGB color (3 bytes)
//! ```
//!
//! There is no error recovery: a failed write aborts the file, and a partial
//! file is not valid input. Callers needing atomic replacement write to a
//! temporary path and rename on completion.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use glam::Vec3;
use uuid::Uuid;

use bxd_core::{Mesh, SubMesh, Surface, Triangle, Vertex};

use crate::{ExportError, FormatError, major_version};

/// Mesh container format version written by this crate
pub const BXDA_VERSION: &str = "1.0.0";

/// Encode one mesh to one output stream
pub fn write_mesh<W: Write>(out: &mut W, mesh: &Mesh, version: &str) -> Result<(), ExportError> {
    write_string(out, version)?;
    out.write_all(mesh.guid.as_bytes())?;
    out.write_u32::<LittleEndian>(mesh.sub_meshes.len() as u32)?;
    for sub in &mesh.sub_meshes {
        write_sub_mesh(out, sub)?;
    }
    Ok(())
}

fn write_sub_mesh<W: Write>(out: &mut W, sub: &SubMesh) -> Result<(), ExportError> {
    out.write_u32::<LittleEndian>(sub.vertices.len() as u32)?;
    for vertex in &sub.vertices {
        write_vec3(out, vertex.position)?;
        write_vec3(out, vertex.normal)?;
    }
    out.write_u32::<LittleEndian>(sub.surfaces.len() as u32)?;
    for surface in &sub.surfaces {
        out.write_u32::<LittleEndian>(surface.triangles.len() as u32)?;
        for triangle in &surface.triangles {
            for index in triangle.indices {
                out.write_u32::<LittleEndian>(index)?;
            }
        }
        out.write_all(&surface.color)?;
    }
    Ok(())
}

fn write_vec3<W: Write>(out: &mut W, v: Vec3) -> Result<(), ExportError> {
    out.write_f32::<LittleEndian>(v.x)?;
    out.write_f32::<LittleEndian>(v.y)?;
    out.write_f32::<LittleEndian>(v.z)?;
    Ok(())
}

fn write_string<W: Write>(out: &mut W, s: &str) -> Result<(), ExportError> {
    out.write_u32::<LittleEndian>(s.len() as u32)?;
    out.write_all(s.as_bytes())?;
    Ok(())
}

/// Decode one mesh from one input stream
///
/// Rejects a different major version and any triangle index outside its
/// sub-mesh's vertex count.
pub fn read_mesh<R: Read>(input: &mut R) -> Result<Mesh, ExportError> {
    let version = read_string(input)?;
    if major_version(&version) != major_version(BXDA_VERSION) {
        return Err(FormatError::UnsupportedVersion(version).into());
    }

    let mut guid_bytes = [0u8; 16];
    input.read_exact(&mut guid_bytes)?;
    let mut mesh = Mesh::new(Uuid::from_bytes(guid_bytes));

    let sub_count = input.read_u32::<LittleEndian>()?;
    for _ in 0..sub_count {
        mesh.add_sub_mesh(read_sub_mesh(input)?);
    }
    Ok(mesh)
}

fn read_sub_mesh<R: Read>(input: &mut R) -> Result<SubMesh, ExportError> {
    let mut sub = SubMesh::new();

    let vertex_count = input.read_u32::<LittleEndian>()?;
    sub.vertices.reserve(vertex_count as usize);
    for _ in 0..vertex_count {
        let position = read_vec3(input)?;
        let normal = read_vec3(input)?;
        sub.vertices.push(Vertex::new(position, normal));
    }

    let surface_count = input.read_u32::<LittleEndian>()?;
    for _ in 0..surface_count {
        let triangle_count = input.read_u32::<LittleEndian>()?;
        let mut surface = Surface::default();
        surface.triangles.reserve(triangle_count as usize);
        for _ in 0..triangle_count {
            let a = input.read_u32::<LittleEndian>()?;
            let b = input.read_u32::<LittleEndian>()?;
            let c = input.read_u32::<LittleEndian>()?;
            for index in [a, b, c] {
                if index >= vertex_count {
                    return Err(FormatError::Malformed(format!(
                        "triangle index {index} out of bounds ({vertex_count} vertices)"
                    ))
                    .into());
                }
            }
            surface.triangles.push(Triangle::new(a, b, c));
        }
        input.read_exact(&mut surface.color)?;
        sub.surfaces.push(surface);
    }
    Ok(sub)
}

fn read_vec3<R: Read>(input: &mut R) -> Result<Vec3, ExportError> {
    let x = input.read_f32::<LittleEndian>()?;
    let y = input.read_f32::<LittleEndian>()?;
    let z = input.read_f32::<LittleEndian>()?;
    Ok(Vec3::new(x, y, z))
}

fn read_string<R: Read>(input: &mut R) -> Result<String, ExportError> {
    let len = input.read_u32::<LittleEndian>()?;
    let mut bytes = vec![0u8; len as usize];
    input.read_exact(&mut bytes)?;
    String::from_utf8(bytes)
        .map_err(|_| FormatError::Malformed("version string is not UTF-8".into()).into())
}

/// Encode one mesh to one file
pub fn write_mesh_file(path: impl AsRef<Path>, mesh: &Mesh, version: &str) -> Result<(), ExportError> {
    let mut writer = BufWriter::new(File::create(path.as_ref())?);
    write_mesh(&mut writer, mesh, version)?;
    writer.flush()?;
    Ok(())
}

/// Decode one mesh from one file
pub fn read_mesh_file(path: impl AsRef<Path>) -> Result<Mesh, ExportError> {
    let mut reader = BufReader::new(File::open(path.as_ref())?);
    read_mesh(&mut reader)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_mesh() -> Mesh {
        let mut mesh = Mesh::new(Uuid::from_u128(0x0ba8_e1ce_1004_4523_b844_9bfa_69ef_ada9));
        let mut sub = SubMesh::new();
        sub.add_vertices([
            Vertex::new(Vec3::new(1.0, 2.0, 3.0), Vec3::new(1.0, 0.0, 0.0)),
            Vertex::new(Vec3::new(4.0, 5.0, 6.0), Vec3::new(1.0, 0.0, 0.0)),
            Vertex::new(Vec3::new(7.0, 8.0, 9.0), Vec3::new(1.0, 0.0, 0.0)),
        ]);
        let mut surface = Surface::new([255, 16, 0]);
        surface.add_triangles([Triangle::new(0, 1, 2)]);
        sub.add_surface(surface);
        mesh.add_sub_mesh(sub);
        mesh
    }

    fn encode(mesh: &Mesh) -> Vec<u8> {
        let mut buf = Vec::new();
        write_mesh(&mut buf, mesh, BXDA_VERSION).unwrap();
        buf
    }

    #[test]
    fn test_round_trip_bit_identical() {
        // Exotic bit patterns must survive untouched
        let mut mesh = sample_mesh();
        mesh.sub_meshes[0].vertices[0].position =
            Vec3::new(f32::from_bits(0x7F80_0001 - 1), -0.0, f32::MIN_POSITIVE);

        let decoded = read_mesh(&mut encode(&mesh).as_slice()).unwrap();
        assert_eq!(decoded.guid, mesh.guid);
        assert_eq!(decoded.sub_meshes.len(), 1);
        let (a, b) = (&decoded.sub_meshes[0], &mesh.sub_meshes[0]);
        assert_eq!(a.vertices.len(), b.vertices.len());
        for (va, vb) in a.vertices.iter().zip(&b.vertices) {
            assert_eq!(va.position.to_array().map(f32::to_bits),
                vb.position.to_array().map(f32::to_bits));
            assert_eq!(va.normal, vb.normal);
        }
        assert_eq!(a.surfaces, b.surfaces);
    }

    #[test]
    fn test_round_trip_multi_sub_mesh() {
        let mut mesh = sample_mesh();
        let mut second = SubMesh::new();
        second.add_vertices([
            Vertex::new(Vec3::ZERO, Vec3::Z),
            Vertex::new(Vec3::X, Vec3::Z),
            Vertex::new(Vec3::Y, Vec3::Z),
            Vertex::new(Vec3::ONE, Vec3::Z),
        ]);
        let mut surface = Surface::new([0, 200, 40]);
        surface.add_triangles([Triangle::new(0, 1, 2), Triangle::new(1, 2, 3)]);
        second.add_surface(surface);
        second.add_surface(Surface::new([9, 9, 9]));
        mesh.add_sub_mesh(second);

        let decoded = read_mesh(&mut encode(&mesh).as_slice()).unwrap();
        assert_eq!(decoded, mesh);
    }

    #[test]
    fn test_empty_mesh_round_trips() {
        let mesh = Mesh::new(Uuid::nil());
        let decoded = read_mesh(&mut encode(&mesh).as_slice()).unwrap();
        assert_eq!(decoded, mesh);
    }

    #[test]
    fn test_truncated_file_fails() {
        let bytes = encode(&sample_mesh());
        let err = read_mesh(&mut bytes[..bytes.len() - 2].as_ref()).unwrap_err();
        assert!(matches!(err, ExportError::Io(_)));
    }

    #[test]
    fn test_unsupported_major_version_rejected() {
        let mut buf = Vec::new();
        write_mesh(&mut buf, &sample_mesh(), "9.0.0").unwrap();
        let err = read_mesh(&mut buf.as_slice()).unwrap_err();
        assert!(matches!(
            err,
            ExportError::Format(FormatError::UnsupportedVersion(_))
        ));
    }

    #[test]
    fn test_out_of_bounds_index_rejected() {
        let mut mesh = sample_mesh();
        mesh.sub_meshes[0].surfaces[0]
            .triangles
            .push(Triangle::new(0, 1, 7));
        let err = read_mesh(&mut encode(&mesh).as_slice()).unwrap_err();
        assert!(matches!(err, ExportError::Format(FormatError::Malformed(_))));
    }
}
