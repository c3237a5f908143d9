//! Dimension and scale service.
//!
//! Converts target physical dimensions into per-axis scale factors
//! (factors rounded to 4 decimals, millimeters to 2) and produces
//! scaled exports alongside the canonical one, never replacing it.

use crate::jobs::{Dimensions, JobStore, JobUpdate};
use crate::storage::StorageDirs;
use nalgebra::Vector3;
use pf_common::{Error, Result};
use pf_mesh::{load_mesh, save_mesh, MeshFormat};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

/// Per-axis scale factors.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScaleFactors {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// Round to 2 decimals (millimeter values).
pub fn round_mm(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Round to 4 decimals (scale factors).
pub fn round_factor(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

impl ScaleFactors {
    /// Factors taking `original` to `target`, axis by axis.
    pub fn for_target(original: &Dimensions, target: &Dimensions) -> Result<Self> {
        if original.x <= 0.0 || original.y <= 0.0 || original.z <= 0.0 {
            return Err(Error::Validation(
                "original dimensions must be positive".to_string(),
            ));
        }
        let factors = Self {
            x: round_factor(target.x / original.x),
            y: round_factor(target.y / original.y),
            z: round_factor(target.z / original.z),
        };
        factors.validate()?;
        Ok(factors)
    }

    /// Reject non-finite or non-positive factors.
    pub fn validate(&self) -> Result<()> {
        for (axis, value) in [("x", self.x), ("y", self.y), ("z", self.z)] {
            if !value.is_finite() || value <= 0.0 {
                return Err(Error::Validation(format!(
                    "scale factor {axis}={value} must be a positive number"
                )));
            }
        }
        Ok(())
    }

    /// The dimensions that applying these factors produces.
    pub fn apply_to(&self, original: &Dimensions) -> Dimensions {
        Dimensions {
            x: round_mm(original.x * self.x),
            y: round_mm(original.y * self.y),
            z: round_mm(original.z * self.z),
        }
    }

    /// Unique artifact name encoding the factors to 2 decimals.
    pub fn export_name(&self) -> String {
        format!(
            "scaled_mesh_{:.2}x_{:.2}x_{:.2}x.stl",
            self.x, self.y, self.z
        )
    }

    fn as_vector(&self) -> Vector3<f64> {
        Vector3::new(self.x, self.y, self.z)
    }
}

/// Rescale the repaired mesh and export it as a new STL.
///
/// Returns the produced filename. The canonical export stays untouched.
pub async fn export_scaled(
    store: &JobStore,
    storage: &StorageDirs,
    job_id: Uuid,
    factors: &ScaleFactors,
) -> Result<String> {
    factors.validate()?;

    let job = store
        .get(job_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("job {job_id}")))?;
    let Some(repaired) = job.repaired_mesh_path.as_deref() else {
        return Err(Error::NotFound(format!(
            "job {job_id} has no repaired mesh yet"
        )));
    };

    let mut mesh = load_mesh(storage.job_path(job_id, repaired)?)
        .map_err(|e| Error::Internal(format!("cannot load repaired mesh: {e}")))?;
    mesh.apply_scale(factors.as_vector());

    let name = factors.export_name();
    let path = storage.export_path(job_id, &name)?;
    save_mesh(&mesh, &path, MeshFormat::Stl)
        .map_err(|e| Error::Internal(format!("scaled export failed: {e}")))?;

    store
        .update(
            job_id,
            JobUpdate {
                push_scaled_export: Some(name.clone()),
                ..Default::default()
            },
        )
        .await?;

    info!(job_id = %job_id, artifact = %name, "scaled export complete");
    Ok(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn factors_follow_the_scale_law() {
        let original = Dimensions {
            x: 45.2,
            y: 30.0,
            z: 12.5,
        };
        let target = Dimensions {
            x: 50.0,
            y: 30.0,
            z: 12.5,
        };
        let factors = ScaleFactors::for_target(&original, &target).unwrap();
        assert!((factors.x - 1.1062).abs() < 1e-9);
        assert!((factors.y - 1.0).abs() < 1e-9);
        assert!((factors.z - 1.0).abs() < 1e-9);

        // Re-applying the factors recovers the target within rounding
        let result = factors.apply_to(&original);
        assert!((result.x - target.x).abs() <= 0.01);
        assert!((result.y - target.y).abs() <= 0.01);
        assert!((result.z - target.z).abs() <= 0.01);
    }

    #[test]
    fn zero_original_dimension_is_rejected() {
        let original = Dimensions {
            x: 0.0,
            y: 1.0,
            z: 1.0,
        };
        let target = Dimensions {
            x: 10.0,
            y: 10.0,
            z: 10.0,
        };
        assert!(matches!(
            ScaleFactors::for_target(&original, &target),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn non_positive_factors_are_rejected() {
        let factors = ScaleFactors {
            x: 1.0,
            y: -2.0,
            z: 1.0,
        };
        assert!(matches!(factors.validate(), Err(Error::Validation(_))));
    }

    #[test]
    fn export_name_encodes_factors() {
        let factors = ScaleFactors {
            x: 1.1062,
            y: 1.0,
            z: 2.5,
        };
        assert_eq!(factors.export_name(), "scaled_mesh_1.11x_1.00x_2.50x.stl");
    }

    #[test]
    fn rounding_rules() {
        assert_eq!(round_mm(1.005), 1.0); // f64 representation of 1.005
        assert_eq!(round_mm(59.999), 60.0);
        assert_eq!(round_factor(1.23456), 1.2346);
    }
}
