// src/config.rs

use std::path::{Path, PathBuf};

use clap::ValueEnum;

/// Inner verifying key, raw arkworks encoding.
pub const INNER_VK_FILE: &str = "groth16_vk.bin";
/// Inner public inputs, JSON array of decimal or `0x`-hex strings.
pub const INNER_PUBLIC_INPUTS_FILE: &str = "public_inputs.json";

/// How the inner verifying key enters the outer circuit.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, ValueEnum)]
pub enum VkModeKind {
    /// Compiled into the circuit as constants.
    #[default]
    Fixed,
    /// Supplied per proof as part of the witness.
    Dynamic,
}

/// Encoding of persisted outer public inputs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum PublicInputsFormat {
    /// JSON array of decimal strings (canonical).
    #[default]
    Json,
    /// One decimal string per line (legacy, read-compatible).
    Lines,
}

#[derive(Clone, Debug)]
pub struct PipelineConfig {
    pub data_dir: PathBuf,
    pub vk_mode: VkModeKind,
    pub public_inputs_format: PublicInputsFormat,
    /// Also write `.bin` copies of the outer proof and key.
    pub write_binary: bool,
}

impl PipelineConfig {
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        Self {
            data_dir: data_dir.as_ref().to_path_buf(),
            ..Self::default()
        }
    }

    pub fn with_vk_mode(mut self, mode: VkModeKind) -> Self {
        self.vk_mode = mode;
        self
    }

    pub fn with_public_inputs_format(mut self, format: PublicInputsFormat) -> Self {
        self.public_inputs_format = format;
        self
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("."),
            vk_mode: VkModeKind::Fixed,
            public_inputs_format: PublicInputsFormat::Json,
            write_binary: true,
        }
    }
}
