// src/persistence.rs
//! Reading the inner statement from a data directory and writing the outer
//! artifact back to it.

use std::fs;
use std::path::{Path, PathBuf};

use ark_ec::pairing::Pairing;
use ark_ff::PrimeField;
use ark_groth16::{Proof, VerifyingKey};
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};
use tracing::{debug, error, info, warn};

use crate::codec::bigint::parse_field;
use crate::codec::{
    ProofBundle, decode_bundle, decode_proof, decode_public_inputs, decode_verifying_key,
    encode_bundle, encode_proof, encode_public_inputs, encode_verifying_key,
};
use crate::config::{
    INNER_PUBLIC_INPUTS_FILE, INNER_VK_FILE, PipelineConfig, PublicInputsFormat,
};
use crate::curves::{InnerCurve, InnerFr, InterchangeCurve, Outer};
use crate::error::{Error, ParseErrorKind, Result};
use crate::recursion::{OuterArtifact, verify_outer};

/// Where one outer artifact lives.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub proof_json: PathBuf,
    pub proof_bin: PathBuf,
    pub vk_json: PathBuf,
    pub vk_bin: PathBuf,
    pub public_inputs_json: PathBuf,
    /// Legacy newline-delimited form.
    pub public_inputs_lines: PathBuf,
}

impl ArtifactPaths {
    pub fn new(dir: impl AsRef<Path>, curve: &str) -> Self {
        let dir = dir.as_ref();
        Self {
            proof_json: dir.join(format!("proof_{curve}.json")),
            proof_bin: dir.join(format!("proof_{curve}.bin")),
            vk_json: dir.join(format!("groth16_vk_{curve}.json")),
            vk_bin: dir.join(format!("groth16_vk_{curve}.bin")),
            public_inputs_json: dir.join(format!("public_inputs_{curve}.json")),
            public_inputs_lines: dir.join(format!("public_inputs_{curve}.txt")),
        }
    }

    pub fn outer(dir: impl AsRef<Path>) -> Self {
        Self::new(dir, Outer::NAME)
    }

    pub fn all(&self) -> [&Path; 6] {
        [
            &self.proof_json,
            &self.proof_bin,
            &self.vk_json,
            &self.vk_bin,
            &self.public_inputs_json,
            &self.public_inputs_lines,
        ]
    }
}

fn read_file(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).map_err(|e| Error::io(path, e))
}

fn read_text(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|e| Error::io(path, e))
}

/// Deserialize exactly one value from `bytes`.
fn deserialize_exact<T: CanonicalDeserialize>(bytes: &[u8], what: &str) -> Result<T> {
    let mut reader = bytes;
    let value = T::deserialize_compressed(&mut reader)?;
    if !reader.is_empty() {
        return Err(Error::CorruptBundle(format!(
            "{} trailing bytes after {what}",
            reader.len()
        )));
    }
    Ok(value)
}

fn serialize<T: CanonicalSerialize>(value: &T) -> Result<Vec<u8>> {
    let mut bytes = Vec::with_capacity(value.compressed_size());
    value.serialize_compressed(&mut bytes)?;
    Ok(bytes)
}

// ---------------------------------------------------------------------------
// public inputs text

/// Parse public inputs written either as a JSON array or one per line.
pub fn parse_public_inputs<F: PrimeField>(text: &str) -> Result<Vec<F>> {
    if text.trim_start().starts_with('[') {
        return decode_public_inputs(text);
    }
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(parse_field)
        .collect()
}

pub fn format_public_inputs<F: PrimeField>(
    inputs: &[F],
    format: PublicInputsFormat,
) -> Result<Vec<u8>> {
    let values = encode_public_inputs(inputs);
    match format {
        PublicInputsFormat::Json => Ok(serde_json::to_vec_pretty(&values)?),
        PublicInputsFormat::Lines => {
            let mut out = values.join("\n");
            out.push('\n');
            Ok(out.into_bytes())
        }
    }
}

// ---------------------------------------------------------------------------
// inner inputs

/// Decode a hex-encoded compressed inner proof; a `0x` prefix is optional.
pub fn decode_proof_hex(proof_hex: &str) -> Result<Proof<InnerCurve>> {
    let trimmed = proof_hex.trim();
    let digits = trimmed.strip_prefix("0x").unwrap_or(trimmed);
    let bytes = hex::decode(digits).map_err(|_| Error::Parse {
        kind: ParseErrorKind::InvalidHex,
        input: proof_hex.to_string(),
    })?;
    deserialize_exact(&bytes, "inner proof")
}

pub fn encode_proof_hex(proof: &Proof<InnerCurve>) -> Result<String> {
    Ok(hex::encode(serialize(proof)?))
}

/// Read the inner key and public inputs from `dir` and pair them with the
/// proof given as hex.
pub fn read_inner_inputs(
    dir: impl AsRef<Path>,
    proof_hex: &str,
) -> Result<ProofBundle<InnerCurve>> {
    let dir = dir.as_ref();
    let vk_path = dir.join(INNER_VK_FILE);
    let verifying_key: VerifyingKey<InnerCurve> =
        deserialize_exact(&read_file(&vk_path)?, INNER_VK_FILE)?;

    let inputs_path = dir.join(INNER_PUBLIC_INPUTS_FILE);
    let public_inputs: Vec<InnerFr> = parse_public_inputs(&read_text(&inputs_path)?)?;

    let proof = decode_proof_hex(proof_hex)?;
    debug!(
        n_public = public_inputs.len(),
        ic = verifying_key.gamma_abc_g1.len(),
        "read inner statement"
    );
    Ok(ProofBundle { proof, verifying_key, public_inputs })
}

// ---------------------------------------------------------------------------
// outer artifact

fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

fn tmp_path(path: &Path) -> PathBuf {
    sibling(path, ".tmp")
}

fn backup_path(path: &Path) -> PathBuf {
    sibling(path, ".bak")
}

fn remove_quietly<P: AsRef<Path>>(paths: &[P]) {
    for p in paths {
        let p = p.as_ref();
        if let Err(e) = fs::remove_file(p) {
            warn!(path = %p.display(), error = %e, "could not remove temporary file");
        }
    }
}

/// Undo a partial commit: drop what was placed, put the backups back.
fn roll_back(placed: &[&PathBuf], backups: &[(PathBuf, PathBuf)], staged: &[PathBuf]) {
    remove_quietly(placed);
    for (path, backup) in backups.iter().rev() {
        if let Err(e) = fs::rename(backup, path) {
            error!(path = %path.display(), error = %e, "could not restore backup");
        }
    }
    remove_quietly(staged);
}

/// Move an existing `path` aside to its `.bak` sibling.
fn back_up(path: &Path) -> std::io::Result<Option<PathBuf>> {
    match fs::symlink_metadata(path) {
        Ok(meta) if meta.is_dir() => Err(std::io::Error::other("target is a directory")),
        Ok(_) => {
            let backup = backup_path(path);
            fs::rename(path, &backup)?;
            Ok(Some(backup))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

/// Write every file or none. See [`replace_files`].
pub fn write_files_atomically(files: &[(PathBuf, Vec<u8>)]) -> Result<()> {
    replace_files(files, &[])
}

/// Write `files` and delete `stale`, all or nothing.
///
/// Contents go to `*.tmp` siblings first. Every existing target, and every
/// stale file, is then moved to a `*.bak` sibling before the new files are
/// renamed into place. Any failure restores the backups; success deletes them.
pub fn replace_files(files: &[(PathBuf, Vec<u8>)], stale: &[PathBuf]) -> Result<()> {
    let mut staged: Vec<PathBuf> = Vec::with_capacity(files.len());
    for (path, bytes) in files {
        let tmp = tmp_path(path);
        if let Err(e) = fs::write(&tmp, bytes) {
            // a partially written tmp may exist
            let _ = fs::remove_file(&tmp);
            remove_quietly(&staged);
            return Err(Error::io(tmp, e));
        }
        staged.push(tmp);
    }

    let mut backups: Vec<(PathBuf, PathBuf)> = Vec::new();
    for path in files.iter().map(|(p, _)| p).chain(stale) {
        match back_up(path) {
            Ok(Some(backup)) => backups.push((path.clone(), backup)),
            Ok(None) => {}
            Err(e) => {
                roll_back(&[], &backups, &staged);
                return Err(Error::io(path, e));
            }
        }
    }

    for (i, (path, _)) in files.iter().enumerate() {
        if let Err(e) = fs::rename(&staged[i], path) {
            let placed: Vec<&PathBuf> = files[..i].iter().map(|(p, _)| p).collect();
            roll_back(&placed, &backups, &staged[i..]);
            return Err(Error::io(path, e));
        }
    }

    for (_, backup) in &backups {
        remove_quietly(&[backup]);
    }
    debug!(written = files.len(), replaced = backups.len(), "committed files");
    Ok(())
}

/// Persist the outer proof, key and public inputs.
pub fn write_artifact(config: &PipelineConfig, artifact: &OuterArtifact) -> Result<ArtifactPaths> {
    let paths = ArtifactPaths::outer(&config.data_dir);
    let n_public = artifact.public_inputs.len();

    let mut files = vec![
        (
            paths.proof_json.clone(),
            serde_json::to_vec_pretty(&encode_proof::<Outer>(&artifact.proof)?)?,
        ),
        (
            paths.vk_json.clone(),
            serde_json::to_vec_pretty(&encode_verifying_key::<Outer>(
                &artifact.verifying_key,
                n_public,
            )?)?,
        ),
    ];
    let inputs_path = match config.public_inputs_format {
        PublicInputsFormat::Json => &paths.public_inputs_json,
        PublicInputsFormat::Lines => &paths.public_inputs_lines,
    };
    files.push((
        inputs_path.clone(),
        format_public_inputs(&artifact.public_inputs, config.public_inputs_format)?,
    ));
    if config.write_binary {
        files.push((paths.proof_bin.clone(), serialize(&artifact.proof)?));
        files.push((paths.vk_bin.clone(), serialize(&artifact.verifying_key)?));
    }

    // siblings from earlier runs in another format must not outlive this one
    let stale: Vec<PathBuf> = paths
        .all()
        .into_iter()
        .filter(|p| files.iter().all(|(written, _)| written != p))
        .map(Path::to_path_buf)
        .collect();

    replace_files(&files, &stale)?;
    info!(dir = %config.data_dir.display(), files = files.len(), "wrote outer artifact");
    Ok(paths)
}

/// Load a persisted outer artifact from its JSON files.
pub fn read_outer_artifact(dir: impl AsRef<Path>) -> Result<OuterArtifact> {
    let paths = ArtifactPaths::outer(dir);
    let proof = decode_proof::<Outer>(&read_text(&paths.proof_json)?)?;
    let (verifying_key, _) = decode_verifying_key::<Outer>(&read_text(&paths.vk_json)?)?;
    let inputs_path = if paths.public_inputs_json.exists() {
        &paths.public_inputs_json
    } else {
        &paths.public_inputs_lines
    };
    let public_inputs = parse_public_inputs(&read_text(inputs_path)?)?;
    Ok(ProofBundle { proof, verifying_key, public_inputs })
}

/// Re-verify the outer proof persisted in `dir`.
pub fn verify_persisted(dir: impl AsRef<Path>) -> Result<OuterArtifact> {
    let artifact = read_outer_artifact(dir)?;
    verify_outer(&artifact)?;
    info!(n_public = artifact.public_inputs.len(), "persisted outer proof verifies");
    Ok(artifact)
}

// ---------------------------------------------------------------------------
// bundles

/// Compact binary form: compressed proof, key, then inputs.
pub fn save_bundle<E: Pairing>(path: impl AsRef<Path>, bundle: &ProofBundle<E>) -> Result<()> {
    let path = path.as_ref();
    let mut bytes = serialize(&bundle.proof)?;
    bytes.extend(serialize(&bundle.verifying_key)?);
    bytes.extend(serialize(&bundle.public_inputs)?);
    write_files_atomically(&[(path.to_path_buf(), bytes)])
}

pub fn load_bundle<E: Pairing>(path: impl AsRef<Path>) -> Result<ProofBundle<E>> {
    let bytes = read_file(path.as_ref())?;
    let mut reader = &bytes[..];
    let proof = Proof::<E>::deserialize_compressed(&mut reader)?;
    let verifying_key = VerifyingKey::<E>::deserialize_compressed(&mut reader)?;
    let public_inputs = Vec::<E::ScalarField>::deserialize_compressed(&mut reader)?;
    if !reader.is_empty() {
        return Err(Error::CorruptBundle(format!("{} trailing bytes", reader.len())));
    }
    Ok(ProofBundle { proof, verifying_key, public_inputs })
}

pub fn save_bundle_json<C: InterchangeCurve>(
    path: impl AsRef<Path>,
    bundle: &ProofBundle<C::Engine>,
) -> Result<()> {
    let bytes = serde_json::to_vec_pretty(&encode_bundle::<C>(bundle)?)?;
    write_files_atomically(&[(path.as_ref().to_path_buf(), bytes)])
}

pub fn load_bundle_json<C: InterchangeCurve>(
    path: impl AsRef<Path>,
) -> Result<ProofBundle<C::Engine>> {
    decode_bundle::<C>(&read_text(path.as_ref())?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curves::Inner;
    use ark_bls12_377::{Fr, G1Affine, G2Affine};
    use ark_ec::{AffineRepr, CurveGroup};
    use ark_std::UniformRand;

    fn outer_artifact(inputs: &[u64]) -> OuterArtifact {
        use ark_bw6_761::{Fr as OuterFr, G1Affine as OuterG1, G2Affine as OuterG2};
        let mut rng = ark_std::test_rng();
        let g1 = |rng: &mut _| (OuterG1::generator() * OuterFr::rand(rng)).into_affine();
        let g2 = |rng: &mut _| (OuterG2::generator() * OuterFr::rand(rng)).into_affine();
        ProofBundle {
            proof: Proof { a: g1(&mut rng), b: g2(&mut rng), c: g1(&mut rng) },
            verifying_key: VerifyingKey {
                alpha_g1: g1(&mut rng),
                beta_g2: g2(&mut rng),
                gamma_g2: g2(&mut rng),
                delta_g2: g2(&mut rng),
                gamma_abc_g1: (0..=inputs.len()).map(|_| g1(&mut rng)).collect(),
            },
            public_inputs: inputs.iter().map(|&x| OuterFr::from(x)).collect(),
        }
    }

    fn bundle(n: usize) -> ProofBundle<InnerCurve> {
        let mut rng = ark_std::test_rng();
        let g1 = |rng: &mut _| (G1Affine::generator() * Fr::rand(rng)).into_affine();
        let g2 = |rng: &mut _| (G2Affine::generator() * Fr::rand(rng)).into_affine();
        ProofBundle {
            proof: Proof { a: g1(&mut rng), b: g2(&mut rng), c: g1(&mut rng) },
            verifying_key: VerifyingKey {
                alpha_g1: g1(&mut rng),
                beta_g2: g2(&mut rng),
                gamma_g2: g2(&mut rng),
                delta_g2: g2(&mut rng),
                gamma_abc_g1: (0..=n).map(|_| g1(&mut rng)).collect(),
            },
            public_inputs: (0..n).map(|_| Fr::rand(&mut rng)).collect(),
        }
    }

    #[test]
    fn public_inputs_both_formats() {
        let inputs = vec![Fr::from(15u64), Fr::from(7u64)];
        let json = format_public_inputs(&inputs, PublicInputsFormat::Json).unwrap();
        let lines = format_public_inputs(&inputs, PublicInputsFormat::Lines).unwrap();
        assert_eq!(String::from_utf8(lines.clone()).unwrap(), "15\n7\n");
        for text in [&json, &lines] {
            let text = std::str::from_utf8(text).unwrap();
            assert_eq!(parse_public_inputs::<Fr>(text).unwrap(), inputs);
        }
        assert_eq!(parse_public_inputs::<Fr>("[\"0xf\"]").unwrap(), vec![Fr::from(15u64)]);
    }

    #[test]
    fn binary_bundle_rejects_trailing_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bundle.bin");
        let b = bundle(2);
        save_bundle(&path, &b).unwrap();
        assert_eq!(load_bundle::<InnerCurve>(&path).unwrap(), b);

        let mut bytes = fs::read(&path).unwrap();
        bytes.push(0);
        fs::write(&path, &bytes).unwrap();
        assert!(matches!(load_bundle::<InnerCurve>(&path), Err(Error::CorruptBundle(_))));

        bytes.truncate(10);
        fs::write(&path, &bytes).unwrap();
        assert!(matches!(load_bundle::<InnerCurve>(&path), Err(Error::CorruptBundle(_))));
    }

    #[test]
    fn json_bundle_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bundle.json");
        let b = bundle(1);
        save_bundle_json::<Inner>(&path, &b).unwrap();
        assert_eq!(load_bundle_json::<Inner>(&path).unwrap(), b);
        assert!(!tmp_path(&path).exists());
    }

    #[test]
    fn proof_hex_accepts_prefix() {
        let b = bundle(0);
        let hex = encode_proof_hex(&b.proof).unwrap();
        assert_eq!(decode_proof_hex(&hex).unwrap(), b.proof);
        assert_eq!(decode_proof_hex(&format!("0x{hex}")).unwrap(), b.proof);
        assert!(matches!(
            decode_proof_hex("zz"),
            Err(Error::Parse { kind: ParseErrorKind::InvalidHex, .. })
        ));
        assert!(matches!(decode_proof_hex("00"), Err(Error::CorruptBundle(_))));
    }

    #[test]
    fn missing_inner_files_are_io_errors() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(read_inner_inputs(dir.path(), "00"), Err(Error::Io { .. })));
    }

    #[test]
    fn failed_write_leaves_nothing_behind() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("a.json");
        let bad = dir.path().join("missing").join("b.json");
        let res = write_files_atomically(&[(good.clone(), b"{}".to_vec()), (bad, b"{}".to_vec())]);
        assert!(matches!(res, Err(Error::Io { .. })));
        assert!(!good.exists());
        assert!(!tmp_path(&good).exists());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn format_switch_removes_stale_siblings() {
        let dir = tempfile::tempdir().unwrap();
        let paths = ArtifactPaths::outer(dir.path());

        let json = PipelineConfig::new(dir.path());
        write_artifact(&json, &outer_artifact(&[15])).unwrap();
        assert!(paths.public_inputs_json.exists());
        assert!(paths.proof_bin.exists());

        let lines = PipelineConfig {
            write_binary: false,
            ..PipelineConfig::new(dir.path()).with_public_inputs_format(PublicInputsFormat::Lines)
        };
        let second = outer_artifact(&[18]);
        write_artifact(&lines, &second).unwrap();

        assert!(!paths.public_inputs_json.exists());
        assert!(!paths.proof_bin.exists());
        assert!(!paths.vk_bin.exists());
        let read = read_outer_artifact(dir.path()).unwrap();
        assert_eq!(read.public_inputs, second.public_inputs);
        assert_eq!(read.proof, second.proof);
        assert!(!backup_path(&paths.public_inputs_json).exists());
    }

    #[test]
    fn failed_rename_restores_previous_files() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("a.json");
        let second = dir.path().join("b.json");
        let stale = dir.path().join("c.txt");
        fs::write(&first, b"old a").unwrap();
        fs::write(&second, b"old b").unwrap();
        fs::write(&stale, b"old c").unwrap();
        // a non-empty directory where the second backup should go
        fs::create_dir(backup_path(&second)).unwrap();
        fs::write(backup_path(&second).join("keep"), b"").unwrap();

        let res = replace_files(
            &[(first.clone(), b"new a".to_vec()), (second.clone(), b"new b".to_vec())],
            &[stale.clone()],
        );
        assert!(matches!(res, Err(Error::Io { .. })));
        assert_eq!(fs::read(&first).unwrap(), b"old a");
        assert_eq!(fs::read(&second).unwrap(), b"old b");
        assert_eq!(fs::read(&stale).unwrap(), b"old c");
        assert!(!backup_path(&first).exists());
        assert!(!tmp_path(&first).exists());
        assert!(!tmp_path(&second).exists());
    }

    #[test]
    fn directory_target_is_rejected_without_changes() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("a.json");
        let second = dir.path().join("b.json");
        fs::write(&first, b"old a").unwrap();
        fs::create_dir(&second).unwrap();

        let res = write_files_atomically(&[
            (first.clone(), b"new a".to_vec()),
            (second.clone(), b"new b".to_vec()),
        ]);
        assert!(matches!(res, Err(Error::Io { .. })));
        assert_eq!(fs::read(&first).unwrap(), b"old a");
        assert!(second.is_dir());
        assert!(!backup_path(&first).exists());
        assert!(!tmp_path(&first).exists());
        assert!(!tmp_path(&second).exists());
    }

    #[test]
    fn successful_replace_cleans_up_backups() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("a.json");
        let stale = dir.path().join("a.txt");
        fs::write(&target, b"old").unwrap();
        fs::write(&stale, b"old").unwrap();

        replace_files(&[(target.clone(), b"new".to_vec())], &[stale.clone()]).unwrap();
        assert_eq!(fs::read(&target).unwrap(), b"new");
        assert!(!stale.exists());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }
}
