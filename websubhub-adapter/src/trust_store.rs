//! TLS trust material for hub and key endpoints
//!
//! A PEM bundle of CA certificates. The same certificates feed the hub
//! client, the resource retriever, and any rustls configuration a
//! downstream component builds.

use rustls::{Certificate, RootCertStore};
use rustls_pemfile::certs;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::{Error, Result};

/// CA certificates trusted for outbound TLS
#[derive(Debug, Clone)]
pub struct TrustStore {
    /// Where the certificates came from
    source: PathBuf,
    /// DER-encoded certificates
    certificates: Vec<Vec<u8>>,
}

impl TrustStore {
    /// Load a PEM bundle from disk
    pub fn from_pem_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            Error::TrustStore(format!("Failed to open {}: {}", path.display(), e))
        })?;
        let mut reader = BufReader::new(file);

        let store = Self::read_pem(&mut reader, path)?;
        info!(
            "Loaded {} trusted certificates from {}",
            store.len(),
            path.display()
        );
        Ok(store)
    }

    /// Parse a PEM bundle held in memory
    pub fn from_pem(pem: &[u8], source: impl Into<PathBuf>) -> Result<Self> {
        let source = source.into();
        let mut reader = BufReader::new(pem);
        Self::read_pem(&mut reader, &source)
    }

    /// Wrap already decoded DER certificates
    pub fn from_certificates(source: impl Into<PathBuf>, certificates: Vec<Vec<u8>>) -> Self {
        Self {
            source: source.into(),
            certificates,
        }
    }

    fn read_pem(reader: &mut dyn std::io::BufRead, source: &Path) -> Result<Self> {
        let certificates = certs(reader).map_err(|e| {
            Error::TrustStore(format!("Invalid certificate in {}: {}", source.display(), e))
        })?;

        if certificates.is_empty() {
            return Err(Error::TrustStore(format!(
                "No certificates found in {}",
                source.display()
            )));
        }

        Ok(Self {
            source: source.to_path_buf(),
            certificates,
        })
    }

    /// DER-encoded certificates
    pub fn certificates(&self) -> &[Vec<u8>] {
        &self.certificates
    }

    /// Bundle location
    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Number of certificates
    pub fn len(&self) -> usize {
        self.certificates.len()
    }

    /// Whether the store holds no certificates
    pub fn is_empty(&self) -> bool {
        self.certificates.is_empty()
    }

    /// Root store for rustls client configurations
    pub fn root_store(&self) -> Result<RootCertStore> {
        let mut root_store = RootCertStore::empty();
        for der in &self.certificates {
            root_store
                .add(&Certificate(der.clone()))
                .map_err(|e| Error::TrustStore(format!("Failed to add CA cert: {}", e)))?;
        }
        Ok(root_store)
    }

    /// Certificates in the form the HTTP client accepts
    pub fn reqwest_certificates(&self) -> Result<Vec<reqwest::Certificate>> {
        self.certificates
            .iter()
            .map(|der| reqwest::Certificate::from_der(der).map_err(Error::from))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn ca_pem(name: &str) -> String {
        rcgen::generate_simple_self_signed(vec![name.to_string()])
            .unwrap()
            .serialize_pem()
            .unwrap()
    }

    #[test]
    fn test_load_bundle() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("bundle.pem");
        let bundle = format!("{}{}", ca_pem("hub.example.org"), ca_pem("keys.example.org"));
        std::fs::write(&path, bundle).unwrap();

        let store = TrustStore::from_pem_file(&path).unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store.source(), path.as_path());

        let roots = store.root_store().unwrap();
        assert_eq!(roots.len(), 2);
        assert_eq!(store.reqwest_certificates().unwrap().len(), 2);
    }

    #[test]
    fn test_empty_bundle_rejected() {
        let err = TrustStore::from_pem(b"# nothing here\n", "inline").unwrap_err();
        assert!(matches!(err, Error::TrustStore(_)));
    }

    #[test]
    fn test_missing_file() {
        let temp_dir = tempdir().unwrap();
        let err = TrustStore::from_pem_file(temp_dir.path().join("absent.pem")).unwrap_err();
        assert!(err.to_string().contains("absent.pem"));
    }
}
