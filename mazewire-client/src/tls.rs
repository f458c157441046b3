//! TLS connector for https base URLs.

use crate::config::TlsConfig;
use crate::error::TransportError;
use rustls::pki_types::{CertificateDer, PrivateKeyDer, ServerName};
use rustls::RootCertStore;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;
use tokio_rustls::TlsConnector;

/// Builds the connector described by `config`, honouring `insecure`.
pub fn connector_for(config: &TlsConfig) -> Result<TlsConnector, TransportError> {
    if config.insecure {
        tracing::warn!("TLS certificate verification disabled");
        Ok(insecure_connector())
    } else {
        verifying_connector(config)
    }
}

/// Resolves the SNI name: the configured override, else the URL host.
pub fn server_name(config: &TlsConfig, host: &str) -> Result<ServerName<'static>, TransportError> {
    let name = config.server_name.as_deref().unwrap_or(host);
    ServerName::try_from(name.to_string())
        .map_err(|_| TransportError::TlsConfig(format!("invalid server name: {}", name)))
}

fn verifying_connector(config: &TlsConfig) -> Result<TlsConnector, TransportError> {
    let mut roots = RootCertStore::empty();
    match config.ca_cert_path {
        Some(ref ca_path) => {
            for cert in load_certs(ca_path)? {
                roots
                    .add(cert)
                    .map_err(|e| TransportError::TlsConfig(format!("invalid CA cert: {}", e)))?;
            }
        }
        None => roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned()),
    }

    let builder = rustls::ClientConfig::builder().with_root_certificates(roots);

    let client_config = match (&config.client_cert_path, &config.client_key_path) {
        (Some(cert_path), Some(key_path)) => builder
            .with_client_auth_cert(load_certs(cert_path)?, load_private_key(key_path)?)
            .map_err(|e| TransportError::TlsConfig(format!("invalid client cert/key: {}", e)))?,
        (None, None) => builder.with_no_client_auth(),
        _ => {
            return Err(TransportError::TlsConfig(
                "client_cert_path and client_key_path must be set together".to_string(),
            ))
        }
    };

    Ok(TlsConnector::from(Arc::new(client_config)))
}

fn insecure_connector() -> TlsConnector {
    use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
    use rustls::pki_types::UnixTime;
    use rustls::{DigitallySignedStruct, SignatureScheme};

    #[derive(Debug)]
    struct AcceptAnyCert;

    impl ServerCertVerifier for AcceptAnyCert {
        fn verify_server_cert(
            &self,
            _: &CertificateDer<'_>,
            _: &[CertificateDer<'_>],
            _: &ServerName<'_>,
            _: &[u8],
            _: UnixTime,
        ) -> Result<ServerCertVerified, rustls::Error> {
            Ok(ServerCertVerified::assertion())
        }

        fn verify_tls12_signature(
            &self,
            _: &[u8],
            _: &CertificateDer<'_>,
            _: &DigitallySignedStruct,
        ) -> Result<HandshakeSignatureValid, rustls::Error> {
            Ok(HandshakeSignatureValid::assertion())
        }

        fn verify_tls13_signature(
            &self,
            _: &[u8],
            _: &CertificateDer<'_>,
            _: &DigitallySignedStruct,
        ) -> Result<HandshakeSignatureValid, rustls::Error> {
            Ok(HandshakeSignatureValid::assertion())
        }

        fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
            vec![
                SignatureScheme::RSA_PKCS1_SHA256,
                SignatureScheme::RSA_PKCS1_SHA384,
                SignatureScheme::RSA_PSS_SHA256,
                SignatureScheme::RSA_PSS_SHA384,
                SignatureScheme::ECDSA_NISTP256_SHA256,
                SignatureScheme::ECDSA_NISTP384_SHA384,
                SignatureScheme::ED25519,
            ]
        }
    }

    let client_config = rustls::ClientConfig::builder()
        .dangerous()
        .with_custom_certificate_verifier(Arc::new(AcceptAnyCert))
        .with_no_client_auth();

    TlsConnector::from(Arc::new(client_config))
}

fn load_certs(path: &Path) -> Result<Vec<CertificateDer<'static>>, TransportError> {
    let file = File::open(path).map_err(|e| {
        TransportError::TlsConfig(format!("cannot open cert file {:?}: {}", path, e))
    })?;
    let certs = rustls_pemfile::certs(&mut BufReader::new(file))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| TransportError::TlsConfig(format!("invalid cert file {:?}: {}", path, e)))?;
    if certs.is_empty() {
        return Err(TransportError::TlsConfig(format!(
            "no certificates found in {:?}",
            path
        )));
    }
    Ok(certs)
}

fn load_private_key(path: &Path) -> Result<PrivateKeyDer<'static>, TransportError> {
    let file = File::open(path)
        .map_err(|e| TransportError::TlsConfig(format!("cannot open key file {:?}: {}", path, e)))?;
    rustls_pemfile::private_key(&mut BufReader::new(file))
        .map_err(|e| TransportError::TlsConfig(format!("invalid key file {:?}: {}", path, e)))?
        .ok_or_else(|| TransportError::TlsConfig(format!("no private key found in {:?}", path)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_missing_ca_file() {
        let config = TlsConfig {
            ca_cert_path: Some(PathBuf::from("/nonexistent/ca.pem")),
            ..TlsConfig::default()
        };
        let err = connector_for(&config).err().expect("connector should fail");
        assert!(err.to_string().contains("cannot open cert file"));
    }

    #[test]
    fn test_empty_pem_has_no_certs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.pem");
        std::fs::write(&path, "").unwrap();
        let err = load_certs(&path).unwrap_err();
        assert!(err.to_string().contains("no certificates"));
    }

    #[test]
    fn test_half_configured_mtls_rejected() {
        let config = TlsConfig {
            client_cert_path: Some(PathBuf::from("/tmp/cert.pem")),
            ..TlsConfig::default()
        };
        let err = connector_for(&config).err().expect("connector should fail");
        assert!(err.to_string().contains("must be set together"));
    }

    #[test]
    fn test_server_name_override() {
        let mut config = TlsConfig::default();
        assert!(server_name(&config, "admin.example.com").is_ok());
        config.server_name = Some("internal.example".into());
        let name = server_name(&config, "10.0.0.1").unwrap();
        assert!(matches!(name, ServerName::DnsName(ref d) if d.as_ref() == "internal.example"));
    }
}
