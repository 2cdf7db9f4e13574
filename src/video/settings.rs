use crate::errors::*;

/// The setup parameters of the graphics layer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphicsParams {
    /// The number of texture units programs could sample from. Unit 0 is
    /// reserved for resource manipulations.
    pub max_texture_slots: usize,
    /// Fails the device shutdown if there are resources still alive.
    pub strict_leak_check: bool,
    /// Pooled render textures not reused within this many frames are destroyed.
    pub pool_eviction_frames: u64,
    /// The maximum number of dispatched tasks executed per frame.
    pub max_dispatch_per_frame: usize,
}

impl Default for GraphicsParams {
    fn default() -> Self {
        GraphicsParams {
            max_texture_slots: super::MAX_TEXTURE_SLOTS,
            strict_leak_check: cfg!(debug_assertions),
            pool_eviction_frames: super::DEFAULT_POOL_EVICTION_FRAMES,
            max_dispatch_per_frame: 256,
        }
    }
}

impl GraphicsParams {
    /// Parses the parameters from JSON, missing fields fall back to defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let params: GraphicsParams = serde_json::from_str(json)?;
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_texture_slots < 2 || self.max_texture_slots > super::MAX_TEXTURE_SLOTS {
            bail!(
                "max_texture_slots must be within [2, {}], got {}.",
                super::MAX_TEXTURE_SLOTS,
                self.max_texture_slots
            );
        }

        if self.max_dispatch_per_frame == 0 {
            bail!("max_dispatch_per_frame must be positive.");
        }

        Ok(())
    }
}
