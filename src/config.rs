// Copyright (C) 2023 Dheatly23
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

use sha2::{Digest, Sha256};

use crate::error::{Result, ScrambleError};
use crate::stage::{Stage, StageMask};

/// Default block edge.
pub const BLOCK_SIZE: usize = 8;
/// Default seed.
pub const DEFAULT_SEED: u64 = 765;
/// Variance below which a block only gets a 2-bit mask.
pub const VARIANCE_THRESHOLD: f64 = 50.0;

/// Pipeline configuration.
///
/// Encode and decode sides share it; only encode actually reads the seed,
/// mask and order, since decode replays what the key recorded.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    block_size: usize,
    seed: [u8; 32],
    stages: StageMask,
    order: Vec<Stage>,
    variance_threshold: f64,
}

impl Config {
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Digest every stage stream is derived from.
    pub fn seed(&self) -> &[u8; 32] {
        &self.seed
    }

    pub fn stages(&self) -> StageMask {
        self.stages
    }

    /// Full stage order, enabled or not.
    pub fn order(&self) -> &[Stage] {
        &self.order
    }

    /// Enabled stages in encode order.
    pub fn enabled(&self) -> impl Iterator<Item = Stage> + '_ {
        self.order.iter().copied().filter(|s| self.stages.contains(*s))
    }

    pub fn variance_threshold(&self) -> f64 {
        self.variance_threshold
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            block_size: BLOCK_SIZE,
            seed: seed_from_u64(DEFAULT_SEED),
            stages: StageMask::ALL,
            order: Stage::CANONICAL.to_vec(),
            variance_threshold: VARIANCE_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    config: Config,
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn block_size(mut self, block_size: usize) -> Self {
        self.config.block_size = block_size;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.config.seed = seed_from_u64(seed);
        self
    }

    /// Seed from arbitrary text, hashed with SHA-256.
    pub fn seed_phrase(mut self, phrase: impl AsRef<[u8]>) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(phrase);
        self.config.seed = hasher.finalize().into();
        self
    }

    pub fn stages(mut self, stages: StageMask) -> Self {
        self.config.stages = stages;
        self
    }

    /// Encode order. Stages left out of the list are never applied.
    pub fn order(mut self, order: impl IntoIterator<Item = Stage>) -> Self {
        self.config.order = order.into_iter().collect();
        self
    }

    pub fn variance_threshold(mut self, threshold: f64) -> Self {
        self.config.variance_threshold = threshold;
        self
    }

    pub fn build(self) -> Result<Config> {
        let c = self.config;
        if c.block_size == 0 || c.block_size > u16::MAX as usize {
            return Err(ScrambleError::Config(format!(
                "block size {} out of range 1..={}",
                c.block_size,
                u16::MAX
            )));
        }
        let distinct: StageMask = c.order.iter().copied().collect();
        if distinct.stages().count() != c.order.len() {
            return Err(ScrambleError::Config(format!(
                "stage order repeats a stage: {:?}",
                c.order
            )));
        }
        if !c.variance_threshold.is_finite() {
            return Err(ScrambleError::Config(format!(
                "variance threshold must be finite, got {}",
                c.variance_threshold
            )));
        }
        Ok(c)
    }
}

fn seed_from_u64(seed: u64) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(seed.to_le_bytes());
    hasher.finalize().into()
}
