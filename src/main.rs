//! Main Program for Blockscramble
//! Run with `--help` for more instruction

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

use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};

use anyhow::{Context, Error};
use blockscramble::{Config, Pipeline, StageMask, TransformKey, BLOCK_SIZE, VARIANCE_THRESHOLD};
use clap::{Parser, Subcommand};
use image::io::Reader as ImageReader;
use image::{save_buffer, ColorType};
use ndarray::prelude::*;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser, Debug)]
#[command(author, version)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Scramble an image and write its key
    Encode {
        /// Input file
        input: PathBuf,

        /// Output file (use a lossless format to decode exactly)
        #[arg(short = 'o', long)]
        output: PathBuf,

        /// Key file
        #[arg(short = 'k', long)]
        key: PathBuf,

        /// Enabled stages: bitmask (0b0001 mask, 0b0010 permute,
        /// 0b0100 geometric, 0b1000 sign) or comma separated names
        #[arg(short = 's', long, default_value = "0b1111")]
        stages: StageMask,

        /// Random seed
        #[arg(long)]
        seed: Option<String>,

        /// Block size
        #[arg(short = 'b', long, default_value_t = BLOCK_SIZE)]
        block_size: usize,

        /// Variance under which blocks get a narrow mask
        #[arg(long, default_value_t = VARIANCE_THRESHOLD)]
        threshold: f64,
    },

    /// Restore an image from its scrambled form and key
    Decode {
        /// Input file
        input: PathBuf,

        /// Key file
        #[arg(short = 'k', long)]
        key: PathBuf,

        /// Output file
        #[arg(short = 'o', long)]
        output: PathBuf,
    },
}

fn main() -> Result<(), Error> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    match Args::parse().command {
        Command::Encode {
            input,
            output,
            key,
            stages,
            seed,
            block_size,
            threshold,
        } => {
            let mut builder = Config::builder()
                .block_size(block_size)
                .stages(stages)
                .variance_threshold(threshold);
            if let Some(seed) = seed {
                builder = builder.seed_phrase(seed);
            }
            let pipeline = Pipeline::new(builder.build()?);

            let grid = load_luma(&input)?;
            let (out, transform_key) = pipeline.encode_unpadded(grid.view())?;

            if is_lossy(&output) {
                warn!(path = %output.display(), "lossy output format, decoding will not be exact");
            }
            save_luma(&output, out.view())?;
            fs::write(&key, transform_key.export()? + "\n")
                .with_context(|| format!("writing key to {}", key.display()))?;
            info!(
                output = %output.display(),
                key = %key.display(),
                stages = ?transform_key.stages,
                "encoded"
            );
        }
        Command::Decode { input, key, output } => {
            let text = fs::read_to_string(&key)
                .with_context(|| format!("reading key from {}", key.display()))?;
            let transform_key: TransformKey = text.parse().context("parsing key")?;

            let grid = load_luma(&input)?;
            let out = blockscramble::decode(grid.view(), &transform_key)?;
            save_luma(&output, out.view())?;
            info!(output = %output.display(), "decoded");
        }
    }

    Ok(())
}

fn load_luma(path: &Path) -> Result<Array2<u8>, Error> {
    let im = ImageReader::new(BufReader::new(
        File::open(path).with_context(|| format!("opening {}", path.display()))?,
    ))
    .with_guessed_format()?
    .decode()?
    .into_luma8();

    info!(path = %path.display(), width = im.width(), height = im.height(), "loaded image");
    Ok(Array2::from_shape_vec(
        (im.height() as usize, im.width() as usize),
        im.into_raw(),
    )?)
}

fn save_luma(path: &Path, grid: ArrayView2<'_, u8>) -> Result<(), Error> {
    let (h, w) = grid.dim();
    let grid = grid.as_standard_layout();
    let data = grid.as_slice().context("grid is not contiguous")?;

    save_buffer(path, data, w.try_into()?, h.try_into()?, ColorType::L8)
        .with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

fn is_lossy(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| matches!(e.to_ascii_lowercase().as_str(), "jpg" | "jpeg" | "webp"))
        .unwrap_or(false)
}
