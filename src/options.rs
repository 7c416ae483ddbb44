//! Command-line options and the server-wide configuration derived from them.

use std::path::PathBuf;

use bitflags::bitflags;
use clap::Parser;

bitflags! {
    /// Which pieces of host information are disclosed in the `Server` response
    /// header.
    ///
    /// The secure default is [`ServerInfoLevel::NONE`]: the header carries no
    /// information beyond the product name. Each additional bit trades a bit
    /// of operational convenience (e.g. spotting which host answered a
    /// request) for fingerprinting surface, so operators opt in explicitly.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ServerInfoLevel: u32 {
        /// Disclose nothing beyond the product name.
        const NONE = 0;
        /// Disclose the kernel name (e.g. `Linux`).
        const KERNEL_NAME = 1;
        /// Disclose the host name.
        const HOST_NAME = 2;
        /// Disclose the kernel release (e.g. `5.4.0-28-generic`).
        const KERNEL_RELEASE = 4;
        /// Disclose the machine architecture (e.g. `x86_64`).
        const MACHINE = 8;
        /// Disclose a human readable distribution description.
        const DIST_DESCRIPTION = 128;
    }
}

impl Default for ServerInfoLevel {
    fn default() -> Self {
        Self::NONE
    }
}

impl std::str::FromStr for ServerInfoLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut level = Self::NONE;
        for part in s.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            level |= match part {
                "none" => Self::NONE,
                "kernel-name" => Self::KERNEL_NAME,
                "host-name" => Self::HOST_NAME,
                "kernel-release" => Self::KERNEL_RELEASE,
                "machine" => Self::MACHINE,
                "dist-description" => Self::DIST_DESCRIPTION,
                other => return Err(format!("unknown server info level '{other}'")),
            };
        }
        Ok(level)
    }
}

/// Default cipher suite list for TLS 1.2: a hand-picked ECDHE/DHE
/// preference order.
pub const DEFAULT_CIPHER_LIST: &str = "ECDHE-ECDSA-AES128-GCM-SHA256:\
ECDHE-RSA-AES128-GCM-SHA256:ECDHE-ECDSA-AES256-GCM-SHA384:\
ECDHE-RSA-AES256-GCM-SHA384:ECDHE-ECDSA-CHACHA20-POLY1305:\
ECDHE-RSA-CHACHA20-POLY1305:DHE-RSA-AES128-GCM-SHA256:\
DHE-RSA-AES256-GCM-SHA384:TLS_ECDHE_ECDSA_WITH_AES_256_GCM_SHA384";

/// Default TLS 1.3 ciphersuite list.
pub const DEFAULT_CIPHER_SUITES: &str = "TLS_AES_128_GCM_SHA256:TLS_AES_256_GCM_SHA384:\
TLS_CHACHA20_POLY1305_SHA256:TLS_AES_128_CCM_SHA256:TLS_AES_128_CCM_8_SHA256";

/// `rampart` serves a content root over HTTPS with HTTP/1.1 and HTTP/2, from a
/// precompressed in-memory file cache, and redirects plain HTTP to HTTPS.
#[derive(Debug, Parser)]
#[command(name = "rampart", version, about)]
pub struct Cli {
    /// Directory whose contents are served, walked and cached at startup.
    #[arg(long, env = "RAMPART_CONTENT_ROOT", default_value = "/var/www/html")]
    pub content_root: PathBuf,

    /// Directory used to persist precompressed artifacts across restarts.
    #[arg(long, env = "RAMPART_CACHE_ROOT", default_value = "/var/www/cache")]
    pub cache_root: PathBuf,

    /// TCP port the HTTPS listener binds to.
    #[arg(long, env = "RAMPART_HTTPS_PORT", default_value_t = 443)]
    pub https_port: u16,

    /// TCP port the plaintext-to-HTTPS redirector binds to.
    #[arg(long, env = "RAMPART_HTTP_PORT", default_value_t = 80)]
    pub http_port: u16,

    /// Maximum number of simultaneously served connections.
    #[arg(long, env = "RAMPART_MAX_CONNECTIONS", default_value_t = 512)]
    pub max_connections: usize,

    /// PEM-encoded leaf certificate.
    #[arg(long, env = "RAMPART_TLS_CERT")]
    pub tls_cert: PathBuf,

    /// PEM-encoded certificate chain.
    #[arg(long, env = "RAMPART_TLS_CHAIN")]
    pub tls_chain: PathBuf,

    /// PEM-encoded private key matching `tls_cert`.
    #[arg(long, env = "RAMPART_TLS_KEY")]
    pub tls_key: PathBuf,

    /// OpenSSL-style TLS 1.2 cipher list.
    #[arg(long, env = "RAMPART_TLS_CIPHER_LIST", default_value_t = DEFAULT_CIPHER_LIST.to_string())]
    pub tls_cipher_list: String,

    /// OpenSSL-style TLS 1.3 ciphersuite list.
    #[arg(long, env = "RAMPART_TLS_CIPHER_SUITES", default_value_t = DEFAULT_CIPHER_SUITES.to_string())]
    pub tls_cipher_suites: String,

    /// Host name used in `Location` headers issued by the redirector.
    ///
    /// Falls back to the machine's own host name when unset.
    #[arg(long, env = "RAMPART_HOSTNAME")]
    pub hostname: Option<String>,

    /// Comma-separated list of system-information fields disclosed in the
    /// `Server` response header. Defaults to disclosing nothing.
    #[arg(long, env = "RAMPART_SERVER_INFO_LEVEL", default_value = "none")]
    pub server_info_level: ServerInfoLevel,
}

/// Resolved, immutable server configuration built once at startup from
/// [`Cli`]. Kept separate from `Cli` so the rest of the crate does not depend
/// on `clap`.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub content_root: PathBuf,
    pub cache_root: PathBuf,
    pub https_port: u16,
    pub http_port: u16,
    pub max_connections: usize,
    pub tls_cert: PathBuf,
    pub tls_chain: PathBuf,
    pub tls_key: PathBuf,
    pub tls_cipher_list: String,
    pub tls_cipher_suites: String,
    pub hostname: String,
    pub server_info_level: ServerInfoLevel,
    pub product_name: String,
}

impl ServerConfig {
    /// Resolve a [`Cli`] into a [`ServerConfig`], falling back to the local
    /// host name when none was supplied.
    pub fn from_cli(cli: Cli) -> Result<Self, rama_error::BoxError> {
        let hostname = match cli.hostname {
            Some(name) => name,
            None => hostname::get()
                .map_err(|err| -> rama_error::BoxError { Box::new(err) })?
                .into_string()
                .map_err(|_| -> rama_error::BoxError { "host name is not valid UTF-8".into() })?,
        };

        let product_name = crate::product::build(cli.server_info_level);

        Ok(Self {
            content_root: cli.content_root,
            cache_root: cli.cache_root,
            https_port: cli.https_port,
            http_port: cli.http_port,
            max_connections: cli.max_connections,
            tls_cert: cli.tls_cert,
            tls_chain: cli.tls_chain,
            tls_key: cli.tls_key,
            tls_cipher_list: cli.tls_cipher_list,
            tls_cipher_suites: cli.tls_cipher_suites,
            hostname,
            server_info_level: cli.server_info_level,
            product_name,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_info_level_parses_combinations() {
        let level: ServerInfoLevel = "host-name,machine".parse().unwrap();
        assert!(level.contains(ServerInfoLevel::HOST_NAME));
        assert!(level.contains(ServerInfoLevel::MACHINE));
        assert!(!level.contains(ServerInfoLevel::KERNEL_RELEASE));
    }

    #[test]
    fn server_info_level_rejects_unknown() {
        let result: Result<ServerInfoLevel, _> = "bogus".parse();
        assert!(result.is_err());
    }

    #[test]
    fn cli_parses_required_tls_paths() {
        let cli = Cli::try_parse_from([
            "rampart",
            "--tls-cert",
            "cert.pem",
            "--tls-chain",
            "chain.pem",
            "--tls-key",
            "key.pem",
        ])
        .unwrap();
        assert_eq!(cli.https_port, 443);
        assert_eq!(cli.http_port, 80);
        assert_eq!(cli.content_root, PathBuf::from("/var/www/html"));
    }
}
