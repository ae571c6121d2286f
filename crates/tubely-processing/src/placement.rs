//! Object placement: where an ingested video lands and how it is addressed.

use rand::RngCore;

use crate::video::AspectClass;

const NAME_BYTES: usize = 32;
const VIDEO_EXTENSION: &str = ".mp4";

#[derive(Debug, thiserror::Error)]
pub enum PlacementError {
    #[error("CDN distribution base address (S3_CF_DISTRO) is not configured")]
    MissingDistribution,
}

/// Destination of one ingested video: `<folder>/<64 hex chars>.mp4`.
///
/// The name is 32 random bytes; two keys only collide if the random source
/// does. Identical uploads get different keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacementKey {
    pub class: AspectClass,
    pub name: String,
}

impl PlacementKey {
    pub fn object_key(&self) -> String {
        format!("{}/{}{}", self.class.folder(), self.name, VIDEO_EXTENSION)
    }
}

impl std::fmt::Display for PlacementKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.object_key())
    }
}

/// Normalise a configured distribution base: trimmed, `https://` when no
/// scheme is given, no trailing slash. Blank input means "not configured".
pub fn normalize_distribution_base(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let with_scheme = if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    };
    Some(with_scheme.trim_end_matches('/').to_string())
}

#[derive(Debug, Clone)]
pub struct PlacementPolicy {
    distribution_base: Option<String>,
}

impl PlacementPolicy {
    pub fn new(distribution_base: Option<&str>) -> Self {
        Self {
            distribution_base: distribution_base.and_then(normalize_distribution_base),
        }
    }

    /// Fresh random key under the folder for `class`.
    pub fn compute_key(&self, class: AspectClass) -> PlacementKey {
        let mut bytes = [0u8; NAME_BYTES];
        rand::rng().fill_bytes(&mut bytes);
        PlacementKey {
            class,
            name: hex::encode(bytes),
        }
    }

    pub fn distribution_base(&self) -> Result<&str, PlacementError> {
        self.distribution_base
            .as_deref()
            .ok_or(PlacementError::MissingDistribution)
    }

    /// Public CDN address of `key`.
    pub fn public_url(&self, key: &PlacementKey) -> Result<String, PlacementError> {
        Ok(format!("{}/{}", self.distribution_base()?, key.object_key()))
    }
}
