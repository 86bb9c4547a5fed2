//! Six-face environment texture kept on the CPU until the renderer uploads it.

use crate::resources::AssetLoadError;

/// Faces in upload order. The discriminant is the texture array layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CubeFace {
    PositiveX = 0,
    NegativeX = 1,
    PositiveY = 2,
    NegativeY = 3,
    PositiveZ = 4,
    NegativeZ = 5,
}

impl CubeFace {
    pub const ALL: [CubeFace; 6] = [
        CubeFace::PositiveX,
        CubeFace::NegativeX,
        CubeFace::PositiveY,
        CubeFace::NegativeY,
        CubeFace::PositiveZ,
        CubeFace::NegativeZ,
    ];

    pub fn layer(self) -> u32 {
        self as u32
    }
}

#[derive(Debug)]
pub struct CubeMap {
    faces: Vec<image::RgbaImage>,
    size: u32,
}

impl CubeMap {
    /// Builds a cube map from six decoded faces given in [`CubeFace::ALL`] order.
    ///
    /// All faces must be square and share the same edge length.
    pub fn from_faces(faces: Vec<image::DynamicImage>) -> Result<Self, AssetLoadError> {
        if faces.len() != CubeFace::ALL.len() {
            return Err(AssetLoadError::Malformed(format!(
                "a cube map needs 6 faces, got {}",
                faces.len()
            )));
        }
        let faces: Vec<image::RgbaImage> = faces.into_iter().map(|f| f.to_rgba8()).collect();
        let size = faces[0].width();
        for (face, image) in CubeFace::ALL.iter().zip(&faces) {
            if image.width() != size || image.height() != size {
                return Err(AssetLoadError::Malformed(format!(
                    "cube face {:?} is {}x{}, expected {}x{}",
                    face,
                    image.width(),
                    image.height(),
                    size,
                    size
                )));
            }
        }
        if size == 0 {
            return Err(AssetLoadError::Malformed("cube faces are empty".to_string()));
        }
        Ok(Self { faces, size })
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn face(&self, face: CubeFace) -> &image::RgbaImage {
        &self.faces[face.layer() as usize]
    }
}
