//! Asset loading: raw bytes, the environment cube map and glTF models.
//!
//! Everything in here is `async` and independent of the GPU so it can run on a
//! background task. Results are handed back to the render loop through an
//! [`loader::AssetSlot`].

use std::sync::Arc;

use crate::data_structures::cube_map::CubeMap;

pub mod animation;
pub mod gltf_model;
pub mod loader;

pub use gltf_model::{LoadedModel, load_model_gltf, model_from_bytes};
pub use loader::{AssetSlot, Completer, SlotStatus, Spawner};

/// Terminal failure of one asset load. Never fatal to the viewer.
#[derive(Debug, thiserror::Error)]
pub enum AssetLoadError {
    #[error("could not read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("could not fetch {path}: {message}")]
    Fetch { path: String, message: String },
    #[error("could not decode {path}: {reason}")]
    Decode { path: String, reason: String },
    #[error("invalid glTF: {0}")]
    Gltf(#[from] gltf::Error),
    #[error("malformed asset: {0}")]
    Malformed(String),
    #[error("the loader finished without a result")]
    Canceled,
}

/// Bytes received so far. `total` is unknown when the source does not tell.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Progress {
    pub loaded: u64,
    pub total: Option<u64>,
}

impl Progress {
    /// Share of the asset received, in `[0, 1]`. Unknown totals report 0 until done.
    pub fn fraction(&self) -> f32 {
        match self.total {
            Some(0) => 1.0,
            Some(total) => (self.loaded as f64 / total as f64).clamp(0.0, 1.0) as f32,
            None => 0.0,
        }
    }
}

const CHUNK_SIZE: usize = 64 * 1024;

/// Where asset paths are resolved: a directory on native, `<origin>/<root>` on the web.
#[derive(Clone, Debug)]
pub struct AssetSource {
    root: String,
}

impl AssetSource {
    pub fn new(root: impl Into<String>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    pub async fn load_binary(&self, file_name: &str) -> Result<Vec<u8>, AssetLoadError> {
        self.load_binary_with_progress(file_name, |_| {}).await
    }

    #[cfg(not(target_arch = "wasm32"))]
    pub async fn load_binary_with_progress(
        &self,
        file_name: &str,
        mut on_progress: impl FnMut(Progress) + Send,
    ) -> Result<Vec<u8>, AssetLoadError> {
        use tokio::io::AsyncReadExt;

        let path = std::path::Path::new(&self.root).join(file_name);
        let io_err = |source| AssetLoadError::Io {
            path: path.display().to_string(),
            source,
        };
        let mut file = tokio::fs::File::open(&path).await.map_err(io_err)?;
        let total = file.metadata().await.map_err(io_err)?.len();

        let mut data = Vec::with_capacity(total as usize);
        let mut chunk = vec![0u8; CHUNK_SIZE];
        loop {
            let read = file.read(&mut chunk).await.map_err(io_err)?;
            if read == 0 {
                break;
            }
            data.extend_from_slice(&chunk[..read]);
            on_progress(Progress {
                loaded: data.len() as u64,
                total: Some(total),
            });
        }
        Ok(data)
    }

    #[cfg(target_arch = "wasm32")]
    pub async fn load_binary_with_progress(
        &self,
        file_name: &str,
        mut on_progress: impl FnMut(Progress) + Send,
    ) -> Result<Vec<u8>, AssetLoadError> {
        let fetch_err = |message: String| AssetLoadError::Fetch {
            path: file_name.to_string(),
            message,
        };
        let url = self.format_url(file_name)?;
        let response = reqwest::get(url)
            .await
            .map_err(|e| fetch_err(e.to_string()))?;
        if !response.status().is_success() {
            return Err(fetch_err(format!("HTTP {}", response.status())));
        }
        let total = response.content_length();
        let data = response
            .bytes()
            .await
            .map_err(|e| fetch_err(e.to_string()))?
            .to_vec();
        on_progress(Progress {
            loaded: data.len() as u64,
            total,
        });
        Ok(data)
    }

    #[cfg(target_arch = "wasm32")]
    fn format_url(&self, file_name: &str) -> Result<reqwest::Url, AssetLoadError> {
        let fetch_err = |message: String| AssetLoadError::Fetch {
            path: file_name.to_string(),
            message,
        };
        let window = web_sys::window().ok_or_else(|| fetch_err("no window".to_string()))?;
        let origin = window
            .location()
            .origin()
            .map_err(|_| fetch_err("page has no origin".to_string()))?;
        let base = reqwest::Url::parse(&format!("{}/{}/", origin, self.root))
            .map_err(|e| fetch_err(e.to_string()))?;
        base.join(file_name).map_err(|e| fetch_err(e.to_string()))
    }

    /// Fetches and decodes the six faces concurrently, in the given order.
    pub async fn load_cube_map(&self, faces: &[String]) -> Result<Arc<CubeMap>, AssetLoadError> {
        let downloads = faces.iter().map(|face| async move {
            let bytes = self.load_binary(face).await?;
            image::load_from_memory(&bytes).map_err(|e| AssetLoadError::Decode {
                path: face.clone(),
                reason: e.to_string(),
            })
        });
        let images = futures::future::try_join_all(downloads).await?;
        Ok(Arc::new(CubeMap::from_faces(images)?))
    }
}
