// Asset loading
//
// Meshes come from Wavefront OBJ, textures from PNG. Both are decoded into
// plain CPU-side data that the backend uploads.

use anyhow::{Context, Result};
use bytemuck::{Pod, Zeroable};
use std::collections::HashMap;
use std::io::BufRead;
use std::path::Path;

use crate::error::RendererError;

/// Interleaved vertex as consumed by the model pipeline.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub pos: [f32; 3],
    pub color: [f32; 3],
    pub tex_coord: [f32; 2],
}

impl Vertex {
    /// Bit pattern used to merge identical vertices.
    fn key(&self) -> [u32; 8] {
        let p = self.pos;
        let c = self.color;
        let t = self.tex_coord;
        [p[0], p[1], p[2], c[0], c[1], c[2], t[0], t[1]].map(f32::to_bits)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Mesh {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

impl Mesh {
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(RendererError::AssetMissing(path.to_path_buf()).into());
        }

        let file = std::fs::File::open(path)
            .with_context(|| format!("Failed to open model {:?}", path))?;
        let mesh = Self::from_obj(&mut std::io::BufReader::new(file))
            .with_context(|| format!("Failed to load model {:?}", path))?;

        if mesh.indices.is_empty() {
            return Err(RendererError::EmptyMesh(path.to_path_buf()).into());
        }

        log::info!(
            "Loaded model {:?}: {} vertices, {} triangles",
            path,
            mesh.vertices.len(),
            mesh.indices.len() / 3
        );

        Ok(mesh)
    }

    /// Parse OBJ text. Every model in the file is merged into one mesh;
    /// vertices are white and texture V is flipped to top-left origin.
    pub fn from_obj(reader: &mut impl BufRead) -> Result<Self> {
        let options = tobj::LoadOptions {
            single_index: true,
            triangulate: true,
            ..Default::default()
        };

        let (models, _materials) =
            tobj::load_obj_buf(reader, &options, |_| Ok(Default::default()))
                .context("Invalid OBJ data")?;

        let mut mesh = Mesh::default();
        let mut unique: HashMap<[u32; 8], u32> = HashMap::new();

        for model in &models {
            let positions = &model.mesh.positions;
            let texcoords = &model.mesh.texcoords;

            for &index in &model.mesh.indices {
                let i = index as usize;
                let tex_coord = if texcoords.len() >= 2 * i + 2 {
                    [texcoords[2 * i], 1.0 - texcoords[2 * i + 1]]
                } else {
                    [0.0, 0.0]
                };

                let vertex = Vertex {
                    pos: [positions[3 * i], positions[3 * i + 1], positions[3 * i + 2]],
                    color: [1.0, 1.0, 1.0],
                    tex_coord,
                };

                let next = mesh.vertices.len() as u32;
                let slot = *unique.entry(vertex.key()).or_insert_with(|| {
                    mesh.vertices.push(vertex);
                    next
                });
                mesh.indices.push(slot);
            }
        }

        Ok(mesh)
    }

    /// Unit cube, 4 vertices per face, counter-clockwise winding.
    #[cfg(test)]
    pub fn cube() -> Self {
        const FACES: [([f32; 3], [f32; 3], [f32; 3]); 6] = [
            // normal, u axis, v axis
            ([1.0, 0.0, 0.0], [0.0, 0.0, -1.0], [0.0, 1.0, 0.0]),
            ([-1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0, 0.0]),
            ([0.0, 1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, -1.0]),
            ([0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]),
            ([0.0, 0.0, 1.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
            ([0.0, 0.0, -1.0], [-1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
        ];
        const CORNERS: [(f32, f32); 4] = [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)];

        let mut mesh = Mesh::default();
        for (n, u, v) in FACES {
            let base = mesh.vertices.len() as u32;
            for (cu, cv) in CORNERS {
                let pos = [0, 1, 2].map(|k| 0.5 * (n[k] + cu * u[k] + cv * v[k]));
                mesh.vertices.push(Vertex {
                    pos,
                    color: [1.0, 1.0, 1.0],
                    tex_coord: [(cu + 1.0) * 0.5, (1.0 - cv) * 0.5],
                });
            }
            mesh.indices
                .extend_from_slice(&[base, base + 1, base + 2, base + 2, base + 3, base]);
        }
        mesh
    }
}

/// Decoded RGBA8 pixels.
#[derive(Debug, Clone)]
pub struct TextureData {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl TextureData {
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(RendererError::AssetMissing(path.to_path_buf()).into());
        }

        let image = image::open(path)
            .with_context(|| format!("Failed to decode texture {:?}", path))?
            .to_rgba8();
        let (width, height) = image.dimensions();

        log::info!("Loaded texture {:?}: {}x{}", path, width, height);

        Ok(Self {
            width,
            height,
            pixels: image.into_raw(),
        })
    }

    /// Black and white 8x8-cell checkerboard.
    #[cfg(test)]
    pub fn checkerboard(width: u32, height: u32) -> Self {
        let pixels = (0..height)
            .flat_map(|y| (0..width).map(move |x| (x, y)))
            .flat_map(|(x, y)| {
                let value = if ((x / 8) + (y / 8)) % 2 == 0 { 255 } else { 0 };
                [value, value, value, 255]
            })
            .collect();

        Self {
            width,
            height,
            pixels,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const QUAD: &str = "\
v 0 0 0
v 1 0 0
v 1 1 0
v 0 1 0
vt 0 0
vt 1 0
vt 1 1
vt 0 1
f 1/1 2/2 3/3 4/4
";

    #[test]
    fn obj_quad_is_triangulated_and_deduplicated() {
        let mesh = Mesh::from_obj(&mut Cursor::new(QUAD)).unwrap();

        assert_eq!(mesh.vertices.len(), 4);
        assert_eq!(mesh.indices.len(), 6);
        assert!(mesh.indices.iter().all(|&i| (i as usize) < mesh.vertices.len()));
        assert!(mesh.vertices.iter().all(|v| v.color == [1.0, 1.0, 1.0]));
    }

    #[test]
    fn texture_v_is_flipped() {
        let mesh = Mesh::from_obj(&mut Cursor::new(QUAD)).unwrap();
        let origin = mesh
            .vertices
            .iter()
            .find(|v| v.pos == [0.0, 0.0, 0.0])
            .unwrap();
        assert_eq!(origin.tex_coord, [0.0, 1.0]);
    }

    #[test]
    fn missing_files_are_typed_errors() {
        for err in [
            Mesh::load(Path::new("nope/model.obj")).unwrap_err(),
            TextureData::load(Path::new("nope/texture.png")).unwrap_err(),
        ] {
            assert!(matches!(
                err.downcast_ref::<RendererError>(),
                Some(RendererError::AssetMissing(_))
            ));
        }
    }

    #[test]
    fn cube_has_six_quads_inside_unit_bounds() {
        let cube = Mesh::cube();
        assert_eq!(cube.vertices.len(), 24);
        assert_eq!(cube.indices.len(), 36);
        assert!(cube
            .vertices
            .iter()
            .all(|v| v.pos.iter().all(|c| c.abs() == 0.5)));
    }

    #[test]
    fn checkerboard_is_rgba() {
        let texture = TextureData::checkerboard(16, 8);
        assert_eq!(texture.pixels.len(), 16 * 8 * 4);
        assert_eq!(&texture.pixels[..4], &[255, 255, 255, 255]);
        assert_eq!(&texture.pixels[8 * 4..8 * 4 + 4], &[0, 0, 0, 255]);
    }
}
