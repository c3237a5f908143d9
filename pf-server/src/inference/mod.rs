//! Inference collaborators behind tagged model handles.
//!
//! Every externally-resident model is either `Loaded` or `Unavailable`;
//! call sites match exhaustively instead of comparing against sentinel
//! values. Handles are lazily initialized on first use and only ever
//! invoked from the GPU queue, whose concurrency of 1 replaces any
//! locking around the models themselves.

mod matting;
mod preview;
mod reconstruction;

pub use matting::ChromaMatte;
pub use preview::PreviewRenderer;
pub use reconstruction::ReliefReconstructor;

use image::RgbaImage;
use once_cell::sync::OnceCell;
use pf_common::Result;
use std::sync::Arc;
use tracing::{info, warn};

/// A model that is either resident or known-absent.
#[derive(Debug)]
pub enum ModelHandle<M> {
    Loaded(M),
    Unavailable,
}

impl<M> ModelHandle<M> {
    pub fn as_loaded(&self) -> Option<&M> {
        match self {
            Self::Loaded(model) => Some(model),
            Self::Unavailable => None,
        }
    }
}

/// Multi-view synthesis model interface.
///
/// No in-process implementation ships with the server; a deployment can
/// register one, and stages fall back explicitly when it is absent.
pub trait MultiAngleModel: Send + Sync {
    /// Produce one view per azimuth, in degrees.
    fn synthesize(&self, image: &RgbaImage, azimuths: &[u32]) -> Result<Vec<RgbaImage>>;
}

/// Owner of all model handles, injected into pipeline stages.
pub struct ModelRegistry {
    mesh_resolution: u32,
    preview_size: u32,
    reconstruction_enabled: bool,
    matting_enabled: bool,
    multi_angle_model: Option<Arc<dyn MultiAngleModel>>,
    reconstruction: OnceCell<ModelHandle<ReliefReconstructor>>,
    matting: OnceCell<ModelHandle<ChromaMatte>>,
    preview: PreviewRenderer,
}

impl ModelRegistry {
    pub fn new(mesh_resolution: u32, preview_size: u32) -> Self {
        Self {
            mesh_resolution,
            preview_size,
            reconstruction_enabled: true,
            matting_enabled: true,
            multi_angle_model: None,
            reconstruction: OnceCell::new(),
            matting: OnceCell::new(),
            preview: PreviewRenderer::new(preview_size),
        }
    }

    /// Registry whose reconstruction model is absent; the stage that
    /// needs it fails. Used to exercise failure paths.
    pub fn without_reconstruction(mesh_resolution: u32, preview_size: u32) -> Self {
        Self {
            reconstruction_enabled: false,
            ..Self::new(mesh_resolution, preview_size)
        }
    }

    /// Registry whose background matting model is absent; preprocessing
    /// passes images through unchanged.
    pub fn without_matting(mesh_resolution: u32, preview_size: u32) -> Self {
        Self {
            matting_enabled: false,
            ..Self::new(mesh_resolution, preview_size)
        }
    }

    /// Lazily loaded reconstruction model.
    pub fn reconstruction(&self) -> &ModelHandle<ReliefReconstructor> {
        self.reconstruction.get_or_init(|| {
            if self.reconstruction_enabled {
                info!(
                    resolution = self.mesh_resolution,
                    "loading relief reconstruction model"
                );
                ModelHandle::Loaded(ReliefReconstructor::new(self.mesh_resolution))
            } else {
                warn!("reconstruction model unavailable");
                ModelHandle::Unavailable
            }
        })
    }

    /// Lazily loaded background matting model.
    pub fn matting(&self) -> &ModelHandle<ChromaMatte> {
        self.matting.get_or_init(|| {
            if self.matting_enabled {
                info!("loading background matting model");
                ModelHandle::Loaded(ChromaMatte::default())
            } else {
                warn!("background matting model unavailable");
                ModelHandle::Unavailable
            }
        })
    }

    /// Multi-view synthesis model, absent unless a deployment registers
    /// one.
    pub fn multi_angle(&self) -> ModelHandle<Arc<dyn MultiAngleModel>> {
        match &self.multi_angle_model {
            Some(model) => ModelHandle::Loaded(Arc::clone(model)),
            None => ModelHandle::Unavailable,
        }
    }

    pub fn preview(&self) -> &PreviewRenderer {
        &self.preview
    }

    pub fn preview_size(&self) -> u32 {
        self.preview_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_registry_has_reconstruction() {
        let registry = ModelRegistry::new(32, 64);
        assert!(registry.reconstruction().as_loaded().is_some());
        assert!(registry.matting().as_loaded().is_some());
    }

    #[test]
    fn disabled_models_are_unavailable() {
        let registry = ModelRegistry::without_reconstruction(32, 64);
        assert!(registry.reconstruction().as_loaded().is_none());

        let registry = ModelRegistry::without_matting(32, 64);
        assert!(registry.matting().as_loaded().is_none());
    }

    #[test]
    fn multi_angle_is_unavailable_by_default() {
        let registry = ModelRegistry::new(32, 64);
        assert!(matches!(registry.multi_angle(), ModelHandle::Unavailable));
    }
}
