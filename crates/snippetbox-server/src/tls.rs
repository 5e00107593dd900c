//! TLS acceptor setup from PEM files.

use std::path::Path;
use std::sync::Arc;

use rustls::crypto::{ring, CryptoProvider};
use rustls::pki_types::pem::PemObject;
use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use tokio_rustls::TlsAcceptor;

use crate::error::ServerError;

fn tls_error(path: &Path, reason: impl ToString) -> ServerError {
    ServerError::Tls {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}

/// Builds an acceptor from a PEM certificate chain and a PEM private key.
///
/// Only X25519 and P-256 are offered for key exchange, and ALPN advertises
/// `http/1.1` since the server speaks nothing else.
pub fn acceptor(cert: &Path, key: &Path) -> Result<TlsAcceptor, ServerError> {
    let chain = CertificateDer::pem_file_iter(cert)
        .map_err(|err| tls_error(cert, err))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|err| tls_error(cert, err))?;
    if chain.is_empty() {
        return Err(tls_error(cert, "no certificates found"));
    }
    let private_key = PrivateKeyDer::from_pem_file(key).map_err(|err| tls_error(key, err))?;

    let provider = CryptoProvider {
        kx_groups: vec![ring::kx_group::X25519, ring::kx_group::SECP256R1],
        ..ring::default_provider()
    };
    let mut config = rustls::ServerConfig::builder_with_provider(Arc::new(provider))
        .with_safe_default_protocol_versions()
        .map_err(|err| tls_error(cert, err))?
        .with_no_client_auth()
        .with_single_cert(chain, private_key)
        .map_err(|err| tls_error(key, err))?;
    config.alpn_protocols = vec![b"http/1.1".to_vec()];

    tracing::debug!(cert = %cert.display(), "TLS configured");
    Ok(TlsAcceptor::from(Arc::new(config)))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::path::PathBuf;

    /// Writes a self-signed `localhost` pair into `dir` and returns the
    /// certificate PEM alongside both paths.
    pub(crate) fn self_signed(dir: &Path) -> (String, PathBuf, PathBuf) {
        let rcgen::CertifiedKey { cert, key_pair } =
            rcgen::generate_simple_self_signed(vec!["localhost".to_string()]).unwrap();
        let cert_pem = cert.pem();
        let cert_path = dir.join("cert.pem");
        let key_path = dir.join("key.pem");
        std::fs::write(&cert_path, &cert_pem).unwrap();
        std::fs::write(&key_path, key_pair.serialize_pem()).unwrap();
        (cert_pem, cert_path, key_path)
    }

    #[test]
    fn test_loads_valid_pair() {
        let dir = tempfile::tempdir().unwrap();
        let (_, cert, key) = self_signed(dir.path());
        assert!(acceptor(&cert, &key).is_ok());
    }

    #[test]
    fn test_missing_certificate() {
        let dir = tempfile::tempdir().unwrap();
        let (_, _, key) = self_signed(dir.path());
        let missing = dir.path().join("nope.pem");
        match acceptor(&missing, &key) {
            Err(ServerError::Tls { path, .. }) => assert_eq!(path, missing),
            other => panic!("expected TLS error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_garbage_files() {
        let dir = tempfile::tempdir().unwrap();
        let (_, cert, key) = self_signed(dir.path());
        let junk = dir.path().join("junk.pem");
        std::fs::write(&junk, "not a pem file\n").unwrap();

        let err = acceptor(&junk, &key).map(|_| ()).unwrap_err();
        assert!(err.to_string().contains("no certificates found"), "{err}");
        assert!(matches!(
            acceptor(&cert, &junk),
            Err(ServerError::Tls { path, .. }) if path == junk
        ));
    }
}
