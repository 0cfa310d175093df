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

//! Key record produced by an encode call and consumed by its decode.
//!
//! # Wire format (version 1, little-endian)
//!
//! ```text
//! magic        b"BSK"
//! version      u8
//! height       u32      logical (unpadded) grid height
//! width        u32      logical (unpadded) grid width
//! block_size   u16
//! presence     u8       StageMask bits of the fields that follow
//! stage_count  u8
//! stages       u8 * stage_count   stage bits in encode order
//! [mask]       len: u32, u8 * len
//! [permute]    len: u32, u32 * len
//! [geometric]  len: u32, u8 * len  (rotation | flip << 2)
//! [sign]       len: u32, u8 * len  (0 or 1)
//! ```
//!
//! Optional sections appear in the fixed order above, only when present.
//! The exported string form is standard base64 of these bytes.

use std::fmt;
use std::str::FromStr;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::error::{Result, ScrambleError};
use crate::grid::block_count;
use crate::stage::geometric::Orientation;
use crate::stage::{permute, Stage, StageMask};

const MAGIC: &[u8; 3] = b"BSK";
const VERSION: u8 = 1;

/// Every per-stage key of one encode call.
///
/// A field is `Some` exactly when its stage appears in `stages`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformKey {
    pub height: usize,
    pub width: usize,
    pub block_size: usize,
    /// Stages applied, in encode order.
    pub stages: Vec<Stage>,
    pub xor: Option<Vec<u8>>,
    pub permutation: Option<Vec<u32>>,
    pub orientations: Option<Vec<Orientation>>,
    pub negate: Option<Vec<bool>>,
}

impl TransformKey {
    /// An identity key: no stage recorded.
    pub fn new(shape: (usize, usize), block_size: usize) -> Self {
        Self {
            height: shape.0,
            width: shape.1,
            block_size,
            stages: Vec::new(),
            xor: None,
            permutation: None,
            orientations: None,
            negate: None,
        }
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.height, self.width)
    }

    /// Number of blocks the key was recorded for.
    pub fn block_count(&self) -> usize {
        if self.block_size == 0 {
            return 0;
        }
        block_count(self.shape(), self.block_size)
    }

    /// Stages whose fields are present.
    pub fn stage_mask(&self) -> StageMask {
        let present = [
            (Stage::Mask, self.xor.is_some()),
            (Stage::Permute, self.permutation.is_some()),
            (Stage::Geometric, self.orientations.is_some()),
            (Stage::Sign, self.negate.is_some()),
        ];
        present
            .into_iter()
            .filter_map(|(s, p)| p.then_some(s))
            .collect()
    }

    fn field_len(&self, stage: Stage) -> Option<usize> {
        match stage {
            Stage::Mask => self.xor.as_ref().map(Vec::len),
            Stage::Permute => self.permutation.as_ref().map(Vec::len),
            Stage::Geometric => self.orientations.as_ref().map(Vec::len),
            Stage::Sign => self.negate.as_ref().map(Vec::len),
        }
    }

    /// Check internal consistency before the key is used to decode.
    pub fn validate(&self) -> Result<()> {
        if self.block_size == 0 {
            return Err(ScrambleError::InvalidKey("block size is zero".into()));
        }

        let listed: StageMask = self.stages.iter().copied().collect();
        if listed.stages().count() != self.stages.len() {
            return Err(ScrambleError::InvalidKey(format!(
                "stage list repeats a stage: {:?}",
                self.stages
            )));
        }
        if listed != self.stage_mask() {
            return Err(ScrambleError::InvalidKey(format!(
                "stage list {:#06b} disagrees with present fields {:#06b}",
                listed.bits(),
                self.stage_mask().bits()
            )));
        }

        let n = self.block_count();
        for &stage in &self.stages {
            if let Some(len) = self.field_len(stage).filter(|&len| len != n) {
                return Err(ScrambleError::InvalidKey(format!(
                    "{stage} key has {len} entries, expected {n}"
                )));
            }
        }

        if let Some(p) = &self.permutation {
            permute::validate(p, n)?;
        }
        if let Some(o) = &self.orientations {
            if let Some(bad) = o.iter().find(|o| o.rotation > 3) {
                return Err(ScrambleError::InvalidKey(format!(
                    "rotation {} out of range 0..4",
                    bad.rotation
                )));
            }
        }
        Ok(())
    }

    /// Serialize a valid key. Invalid keys are refused rather than written.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        self.validate()?;

        let mut out = Vec::with_capacity(16 + self.block_count() * 7);
        out.extend_from_slice(MAGIC);
        out.push(VERSION);
        out.extend_from_slice(&to_u32(self.height, "height")?.to_le_bytes());
        out.extend_from_slice(&to_u32(self.width, "width")?.to_le_bytes());
        let block_size = u16::try_from(self.block_size).map_err(|_| {
            ScrambleError::InvalidKey(format!("block size {} too large", self.block_size))
        })?;
        out.extend_from_slice(&block_size.to_le_bytes());
        out.push(self.stage_mask().bits());

        let stage_count = u8::try_from(self.stages.len())
            .map_err(|_| ScrambleError::InvalidKey("too many stages".into()))?;
        out.push(stage_count);
        out.extend(self.stages.iter().map(|s| s.bit()));

        if let Some(xor) = &self.xor {
            put_len(&mut out, xor.len())?;
            out.extend_from_slice(xor);
        }
        if let Some(p) = &self.permutation {
            put_len(&mut out, p.len())?;
            for i in p {
                out.extend_from_slice(&i.to_le_bytes());
            }
        }
        if let Some(o) = &self.orientations {
            put_len(&mut out, o.len())?;
            out.extend(o.iter().map(|o| o.pack()));
        }
        if let Some(n) = &self.negate {
            put_len(&mut out, n.len())?;
            out.extend(n.iter().map(|&f| u8::from(f)));
        }
        Ok(out)
    }

    /// Parse the binary form and validate the result.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let mut r = Reader { data };

        if r.take(MAGIC.len())? != MAGIC {
            return Err(format_error("bad magic"));
        }
        let version = r.u8()?;
        if version != VERSION {
            return Err(format_error(format!("unsupported version {version}")));
        }

        let height = r.u32()? as usize;
        let width = r.u32()? as usize;
        let block_size = r.u16()? as usize;
        let presence = StageMask::from_bits(r.u8()?)
            .map_err(|_| format_error("unknown bits in presence byte"))?;

        let stage_count = r.u8()? as usize;
        let stages = r
            .take(stage_count)?
            .iter()
            .map(|&b| {
                Stage::from_bit(b).ok_or_else(|| format_error(format!("bad stage tag {b:#04x}")))
            })
            .collect::<Result<Vec<_>>>()?;

        let listed: StageMask = stages.iter().copied().collect();
        if listed != presence {
            return Err(format_error(format!(
                "stage list {:#06b} disagrees with presence byte {:#06b}",
                listed.bits(),
                presence.bits()
            )));
        }

        let mut key = Self {
            stages,
            ..Self::new((height, width), block_size)
        };

        if presence.contains(Stage::Mask) {
            let len = r.length()?;
            key.xor = Some(r.take(len)?.to_vec());
        }
        if presence.contains(Stage::Permute) {
            let len = r.length()?;
            key.permutation = Some((0..len).map(|_| r.u32()).collect::<Result<_>>()?);
        }
        if presence.contains(Stage::Geometric) {
            let len = r.length()?;
            key.orientations = Some(
                r.take(len)?
                    .iter()
                    .map(|&b| {
                        Orientation::unpack(b)
                            .ok_or_else(|| format_error(format!("bad orientation {b:#04x}")))
                    })
                    .collect::<Result<_>>()?,
            );
        }
        if presence.contains(Stage::Sign) {
            let len = r.length()?;
            key.negate = Some(
                r.take(len)?
                    .iter()
                    .map(|&b| match b {
                        0 => Ok(false),
                        1 => Ok(true),
                        _ => Err(format_error(format!("bad negate flag {b:#04x}"))),
                    })
                    .collect::<Result<_>>()?,
            );
        }

        if !r.data.is_empty() {
            return Err(format_error(format!("{} trailing bytes", r.data.len())));
        }

        key.validate()?;
        Ok(key)
    }

    /// Printable form, suitable for a separate file or channel.
    pub fn export(&self) -> Result<String> {
        Ok(STANDARD.encode(self.to_bytes()?))
    }

    pub fn import(s: &str) -> Result<Self> {
        let data = STANDARD
            .decode(s.trim())
            .map_err(|e| format_error(format!("base64: {e}")))?;
        Self::from_bytes(&data)
    }
}

impl fmt::Display for TransformKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = self.export().map_err(|_| fmt::Error)?;
        f.write_str(&s)
    }
}

impl FromStr for TransformKey {
    type Err = ScrambleError;

    fn from_str(s: &str) -> Result<Self> {
        Self::import(s)
    }
}

fn format_error(msg: impl Into<String>) -> ScrambleError {
    ScrambleError::KeyFormat(msg.into())
}

fn to_u32(v: usize, what: &str) -> Result<u32> {
    u32::try_from(v).map_err(|_| ScrambleError::InvalidKey(format!("{what} {v} too large")))
}

fn put_len(out: &mut Vec<u8>, len: usize) -> Result<()> {
    out.extend_from_slice(&to_u32(len, "field length")?.to_le_bytes());
    Ok(())
}

struct Reader<'a> {
    data: &'a [u8],
}

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.data.len() < n {
            return Err(format_error(format!(
                "truncated: wanted {n} bytes, {} left",
                self.data.len()
            )));
        }
        let (head, tail) = self.data.split_at(n);
        self.data = tail;
        Ok(head)
    }

    fn u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    fn u16(&mut self) -> Result<u16> {
        let mut b = [0; 2];
        b.copy_from_slice(self.take(2)?);
        Ok(u16::from_le_bytes(b))
    }

    fn u32(&mut self) -> Result<u32> {
        let mut b = [0; 4];
        b.copy_from_slice(self.take(4)?);
        Ok(u32::from_le_bytes(b))
    }

    // Field lengths larger than what is left are rejected before allocating.
    fn length(&mut self) -> Result<usize> {
        let len = self.u32()? as usize;
        if len > self.data.len() {
            return Err(format_error(format!(
                "field length {len} exceeds remaining {} bytes",
                self.data.len()
            )));
        }
        Ok(len)
    }
}
