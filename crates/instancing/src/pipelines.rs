//! Selectable shading variants.

use tracing::{debug, info};

/// Pre-built pipelines, one of which is active.
///
/// Variants are never rebuilt here; switching only changes which one the
/// next recorded frame binds.
#[derive(Debug)]
pub struct PipelineSet<P> {
    variants: Vec<(String, P)>,
    active: usize,
}

impl<P> Default for PipelineSet<P> {
    fn default() -> Self {
        Self {
            variants: Vec::new(),
            active: 0,
        }
    }
}

impl<P> PipelineSet<P> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a variant and returns its index.
    pub fn push(&mut self, name: impl Into<String>, pipeline: P) -> usize {
        let name = name.into();
        info!("Registered pipeline variant {}: {}", self.variants.len(), name);
        self.variants.push((name, pipeline));
        self.variants.len() - 1
    }

    /// Makes `index` active. Out-of-range indices are ignored.
    ///
    /// Returns whether the index was accepted.
    pub fn set_active(&mut self, index: usize) -> bool {
        match self.variants.get(index) {
            Some((name, _)) => {
                if index != self.active {
                    debug!("Switched pipeline variant to {}", name);
                }
                self.active = index;
                true
            }
            None => {
                debug!(
                    "Ignoring pipeline variant {} ({} registered)",
                    index,
                    self.variants.len()
                );
                false
            }
        }
    }

    pub fn active(&self) -> Option<&P> {
        self.variants.get(self.active).map(|(_, pipeline)| pipeline)
    }

    pub fn active_name(&self) -> Option<&str> {
        self.variants.get(self.active).map(|(name, _)| name.as_str())
    }

    #[inline]
    pub fn active_index(&self) -> usize {
        self.active
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.variants.iter().map(|(name, _)| name.as_str())
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.variants.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }
}
