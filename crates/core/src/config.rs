//! Renderer configuration.
//!
//! Settings are read from a JSON file. Missing fields take their defaults,
//! a missing file yields [`RendererConfig::default`], and out-of-range values
//! are clamped by [`RendererConfig::validate`] with a warning.
//!
//! ```json
//! {
//!     "frames_in_flight": 3,
//!     "max_mesh_groups": 128,
//!     "log_filter": "info,renderer_instancing=trace"
//! }
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{Error, Result};

/// Upper bound on frame slots the renderer will cycle through.
pub const MAX_FRAMES_IN_FLIGHT: usize = 3;

/// Frame slots used when the configuration does not say otherwise.
pub const DEFAULT_FRAMES_IN_FLIGHT: usize = 2;

/// Settings consumed when the renderer and its Vulkan backend are created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RendererConfig {
    /// Number of resource generations cycled round-robin.
    #[serde(default = "RendererConfig::default_frames_in_flight")]
    pub frames_in_flight: usize,

    /// Mesh groups a single frame slot may hold; sizes the descriptor pool.
    #[serde(default = "RendererConfig::default_max_mesh_groups")]
    pub max_mesh_groups: u32,

    /// Group size from which instance records are computed in parallel.
    #[serde(default = "RendererConfig::default_parallel_instance_threshold")]
    pub parallel_instance_threshold: usize,

    /// Pipeline variant active before anyone selects one.
    #[serde(default)]
    pub default_pipeline_variant: usize,

    /// Requested sampler anisotropy. Values <= 1 disable it.
    #[serde(default = "RendererConfig::default_max_anisotropy")]
    pub max_anisotropy: f32,

    /// `tracing` filter directive used when `RUST_LOG` is unset.
    #[serde(default = "RendererConfig::default_log_filter")]
    pub log_filter: String,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            frames_in_flight: Self::default_frames_in_flight(),
            max_mesh_groups: Self::default_max_mesh_groups(),
            parallel_instance_threshold: Self::default_parallel_instance_threshold(),
            default_pipeline_variant: 0,
            max_anisotropy: Self::default_max_anisotropy(),
            log_filter: Self::default_log_filter(),
        }
    }
}

impl RendererConfig {
    /// Loads and validates the configuration stored at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Parse`] for malformed JSON and [`Error::Io`] for read
    /// failures other than a missing file.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(contents) => {
                let config = Self::from_json(&contents)?;
                info!("Loaded renderer config from {:?}", path);
                Ok(config)
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                info!("Renderer config {:?} not found. Using defaults.", path);
                Ok(Self::default())
            }
            Err(err) => Err(Error::Io(err)),
        }
    }

    /// Parses and validates a JSON document.
    pub fn from_json(contents: &str) -> Result<Self> {
        let config: RendererConfig = serde_json::from_str(contents)?;
        Ok(config.validate())
    }

    /// Clamps every field into its usable range.
    pub fn validate(mut self) -> Self {
        if self.frames_in_flight == 0 || self.frames_in_flight > MAX_FRAMES_IN_FLIGHT {
            let clamped = self.frames_in_flight.clamp(1, MAX_FRAMES_IN_FLIGHT);
            warn!(
                "frames_in_flight must be in 1..={}, got {}. Using {}.",
                MAX_FRAMES_IN_FLIGHT, self.frames_in_flight, clamped
            );
            self.frames_in_flight = clamped;
        }

        if self.max_mesh_groups == 0 {
            warn!("max_mesh_groups must be greater than zero. Using default value.");
            self.max_mesh_groups = Self::default_max_mesh_groups();
        }

        if self.parallel_instance_threshold == 0 {
            warn!("parallel_instance_threshold must be greater than zero. Using 1.");
            self.parallel_instance_threshold = 1;
        }

        if !self.max_anisotropy.is_finite() {
            warn!("max_anisotropy must be finite. Disabling anisotropic filtering.");
            self.max_anisotropy = 1.0;
        }

        self
    }

    /// Installs the global subscriber with [`log_filter`](Self::log_filter),
    /// or with `RUST_LOG` when that is set.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Logging`] for an unparsable filter or when a
    /// subscriber is already installed.
    pub fn init_logging(&self) -> Result<()> {
        crate::try_init_logging(&self.log_filter)
    }

    const fn default_frames_in_flight() -> usize {
        DEFAULT_FRAMES_IN_FLIGHT
    }

    const fn default_max_mesh_groups() -> u32 {
        64
    }

    const fn default_parallel_instance_threshold() -> usize {
        64
    }

    const fn default_max_anisotropy() -> f32 {
        16.0
    }

    fn default_log_filter() -> String {
        crate::DEFAULT_LOG_FILTER.to_owned()
    }
}
