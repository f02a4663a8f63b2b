use std::env;
use std::fs;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use depcheck_core::model::PackageMetadata;
use sha2::{Digest, Sha256};

pub mod commands;

/// Canonicalize a path if possible, falling back to the given string
/// relative to the current working directory.
pub fn canonicalize_or_current(path: &str) -> Result<PathBuf> {
    let p = Path::new(path);
    if p == Path::new(".") {
        Ok(env::current_dir().context("Failed to get current directory")?)
    } else {
        // the catalog file may not exist yet
        match p.canonicalize() {
            Ok(p) => Ok(p),
            Err(_) => {
                let cwd = env::current_dir().context("Failed to get current directory")?;
                Ok(cwd.join(p))
            }
        }
    }
}

/// Compute the SHA-256 hash of a file and return it as a hex string.
pub fn sha256_file(path: &Path) -> Result<String> {
    let file = fs::File::open(path)
        .with_context(|| format!("Failed to open file for hashing: {}", path.display()))?;
    let mut reader = BufReader::new(file);
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 8192];

    loop {
        let n = reader
            .read(&mut buf)
            .with_context(|| format!("Failed to read file for hashing: {}", path.display()))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}

/// Fingerprint of a set of metadata files: SHA-256 over the sorted
/// per-file hashes, so argument order does not matter.
pub fn metadata_fingerprint(paths: &[PathBuf]) -> Result<String> {
    let mut digests = paths.iter().map(|p| sha256_file(p)).collect::<Result<Vec<_>>>()?;
    digests.sort();
    let mut hasher = Sha256::new();
    for digest in &digests {
        hasher.update(digest.as_bytes());
        hasher.update(b"\n");
    }
    Ok(format!("{:x}", hasher.finalize()))
}

/// Load one package metadata document; JSON or YAML by extension.
pub fn load_package_metadata(path: &Path) -> Result<PackageMetadata> {
    let body = fs::read_to_string(path)
        .with_context(|| format!("Failed to read package metadata at {}", path.display()))?;
    match path.extension().and_then(|e| e.to_str()) {
        Some("json") => serde_json::from_str(&body).with_context(|| {
            format!("Failed to parse package metadata JSON at {}", path.display())
        }),
        Some("yaml") | Some("yml") => serde_yaml::from_str(&body).with_context(|| {
            format!("Failed to parse package metadata YAML at {}", path.display())
        }),
        _ => Err(anyhow!(
            "Unsupported metadata format for {}; expected .json, .yaml or .yml",
            path.display()
        )),
    }
}
