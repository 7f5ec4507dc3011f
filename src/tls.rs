//! CA certificate loading for the HTTP client

use reqwest::Certificate;
use std::path::{Path, PathBuf};

use crate::api::ClientError;

const PEM_BEGIN: &str = "-----BEGIN CERTIFICATE-----";
const PEM_END: &str = "-----END CERTIFICATE-----";

/// Where trusted roots come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaSource {
    /// A single PEM file, possibly holding a bundle
    File(PathBuf),
    /// Every file in a directory
    Directory(PathBuf),
}

/// Read all PEM certificates from the given source
pub fn load_root_certificates(source: &CaSource) -> Result<Vec<Certificate>, ClientError> {
    let (origin, pems) = match source {
        CaSource::File(path) => (path, read_pem_file(path)?),
        CaSource::Directory(path) => (path, read_pem_dir(path)?),
    };

    if pems.is_empty() {
        return Err(ClientError::NoCertificates {
            path: origin.clone(),
        });
    }

    pems.iter()
        .map(|pem| {
            Certificate::from_pem(pem.as_bytes()).map_err(|source| {
                ClientError::InvalidCertificate {
                    path: origin.clone(),
                    source,
                }
            })
        })
        .collect()
}

fn read_pem_file(path: &Path) -> Result<Vec<String>, ClientError> {
    let bytes = std::fs::read(path).map_err(|source| ClientError::ReadCertificate {
        path: path.to_path_buf(),
        source,
    })?;

    let text = String::from_utf8_lossy(&bytes);
    Ok(pem_blocks(&text).into_iter().map(str::to_string).collect())
}

fn read_pem_dir(path: &Path) -> Result<Vec<String>, ClientError> {
    let read_err = |source: std::io::Error| ClientError::ReadCertificate {
        path: path.to_path_buf(),
        source,
    };

    let mut files = Vec::new();
    for entry in std::fs::read_dir(path).map_err(read_err)? {
        let entry = entry.map_err(read_err)?;
        if entry.file_type().map_err(read_err)?.is_file() {
            files.push(entry.path());
        }
    }
    files.sort();

    let mut pems = Vec::new();
    for file in &files {
        tracing::debug!(file = %file.display(), "loading CA certificates");
        pems.extend(read_pem_file(file)?);
    }

    Ok(pems)
}

/// Split text into its PEM certificate blocks, markers included
fn pem_blocks(text: &str) -> Vec<&str> {
    let mut blocks = Vec::new();
    let mut rest = text;

    while let Some(start) = rest.find(PEM_BEGIN) {
        let Some(len) = rest[start..].find(PEM_END) else {
            break;
        };
        let end = start + len + PEM_END.len();
        blocks.push(&rest[start..end]);
        rest = &rest[end..];
    }

    blocks
}
