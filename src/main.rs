// src/main.rs
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;

use groth16_recursion::persistence::{ArtifactPaths, verify_persisted};
use groth16_recursion::{
    CompositionPipeline, PipelineConfig, PublicInputsFormat, VkModeKind, fixtures, logging,
};

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Compose a Groth16 proof into a recursive one",
    long_about = None
)]
struct Cli {
    /// Directory holding the inner statement and receiving the outer artifact
    #[arg(long, value_name = "DIRECTORY", env = "GROTH16_RECURSION_DATA_DIR", default_value = ".")]
    data_dir: PathBuf,
    /// tracing filter, e.g. `debug` or `groth16_recursion=trace`; falls back to RUST_LOG
    #[arg(long, value_name = "FILTER")]
    log_level: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Verify the inner proof in-circuit and write the outer proof
    Compose {
        /// Inner proof, hex of the compressed arkworks encoding
        #[arg(
            long,
            value_name = "HEX",
            required_unless_present = "proof_file",
            conflicts_with = "proof_file"
        )]
        proof: Option<String>,
        /// File containing the hex proof
        #[arg(long, value_name = "PATH")]
        proof_file: Option<PathBuf>,
        #[arg(long, value_enum, default_value_t = VkModeKind::Fixed)]
        vk_mode: VkModeKind,
        #[arg(long, value_enum, default_value_t = PublicInputsFormat::Json)]
        public_inputs_format: PublicInputsFormat,
        /// Skip the `.bin` copies of the outer proof and key
        #[arg(long, default_value_t = false)]
        no_binary: bool,
    },
    /// Re-verify a persisted outer proof
    Verify,
    /// Write a `p * q == n` inner statement and print its proof as hex
    Fixture {
        #[arg(long, default_value_t = 3)]
        p: u64,
        #[arg(long, default_value_t = 5)]
        q: u64,
        /// Write the hex proof here instead of stdout
        #[arg(long, value_name = "PATH")]
        proof_out: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init_with_level(cli.log_level.as_deref());

    match cli.command {
        Commands::Compose { proof, proof_file, vk_mode, public_inputs_format, no_binary } => {
            let proof_hex = match (proof, proof_file) {
                (Some(hex), _) => hex,
                (None, Some(path)) => std::fs::read_to_string(&path)
                    .with_context(|| format!("reading {}", path.display()))?,
                (None, None) => anyhow::bail!("either --proof or --proof-file is required"),
            };
            let mut config = PipelineConfig::new(&cli.data_dir)
                .with_vk_mode(vk_mode)
                .with_public_inputs_format(public_inputs_format);
            config.write_binary = !no_binary;

            let artifact = CompositionPipeline::new(config).run(proof_hex.trim())?;
            let paths = ArtifactPaths::outer(&cli.data_dir);
            info!(
                proof = %paths.proof_json.display(),
                n_public = artifact.public_inputs.len(),
                "composition finished"
            );
        }
        Commands::Verify => {
            let artifact = verify_persisted(&cli.data_dir)
                .with_context(|| format!("verifying artifact in {}", cli.data_dir.display()))?;
            info!(n_public = artifact.public_inputs.len(), "outer proof OK");
        }
        Commands::Fixture { p, q, proof_out } => {
            let mut rng = rand::thread_rng();
            let proof_hex = fixtures::write_inner_fixture(&cli.data_dir, p, q, &mut rng)?;
            match proof_out {
                Some(path) => std::fs::write(&path, &proof_hex)
                    .with_context(|| format!("writing {}", path.display()))?,
                None => println!("{proof_hex}"),
            }
        }
    }
    Ok(())
}
