use std::path::PathBuf;

use clap::Parser;

/// Trim any trailing slash so paths can be appended with `format!("{base}/...")`.
fn trimmed_url(value: &str) -> Result<String, String> {
    Ok(value.trim_end_matches('/').to_string())
}

/// Server configuration, from flags or the environment (`.env` is honored).
#[derive(Parser, Clone, Debug)]
#[command(name = "platify-web", version, about = "Platify recipe and product pages")]
pub struct Config {
    /// Base URL of the catalog API
    #[arg(long, env = "API_BASE_URL", default_value = "https://platify.aukespot.com", value_parser = trimmed_url)]
    pub api_base_url: String,

    /// Address to bind to
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on
    #[arg(long, env = "PORT", default_value_t = 8080)]
    pub port: u16,

    /// Where uploaded editor images are written
    #[arg(long, env = "UPLOAD_DIR", default_value = "static/uploads")]
    pub upload_dir: PathBuf,

    /// Public URL prefix under which `upload_dir` is served
    #[arg(long, env = "UPLOAD_URL_PREFIX", default_value = "/static/uploads", value_parser = trimmed_url)]
    pub upload_url_prefix: String,

    /// Directory served under `/static`
    #[arg(long, env = "STATIC_DIR", default_value = "static")]
    pub static_dir: PathBuf,

    /// Directory tree of `*.html.jinja` templates
    #[arg(long, env = "TEMPLATES_DIR", default_value = "templates")]
    pub templates_dir: PathBuf,

    /// Example payloads for the preview routes
    #[arg(long, env = "FIXTURES_DIR", default_value = "testdata")]
    pub fixtures_dir: PathBuf,

    /// The privacy policy page, served as-is
    #[arg(long = "privacy-policy", env = "PRIVACY_POLICY_PATH", default_value = "prev-website/privacy-policy/index.html")]
    pub privacy_policy_path: PathBuf,

    /// Release mode: disables the preview routes
    #[arg(long = "release", env = "RELEASE_MODE")]
    pub release_mode: bool,

    /// TLS certificate chain (PEM). HTTPS is used when both cert and key are set.
    #[arg(long, env = "TLS_CERT_PATH", requires = "tls_key")]
    pub tls_cert: Option<PathBuf>,

    /// TLS private key (PEM)
    #[arg(long, env = "TLS_KEY_PATH", requires = "tls_cert")]
    pub tls_key: Option<PathBuf>,

    /// Write JSON logs to a daily-rotated `access.log` here instead of stdout
    #[arg(long, env = "LOG_DIR")]
    pub log_dir: Option<PathBuf>,
}

impl Config {
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Both halves of the TLS material, if configured.
    pub fn tls_paths(&self) -> Option<(&PathBuf, &PathBuf)> {
        self.tls_cert.as_ref().zip(self.tls_key.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_defaults() {
        let config = Config::try_parse_from([
            "platify-web",
            "--api-base-url",
            "http://catalog.local:9000/",
            "--port",
            "9090",
            "--host",
            "127.0.0.1",
            "--upload-dir",
            "/srv/uploads",
            "--upload-url-prefix",
            "/media/",
            "--release",
        ])
        .unwrap();
        assert_eq!(config.api_base_url, "http://catalog.local:9000");
        assert_eq!(config.listen_addr(), "127.0.0.1:9090");
        assert_eq!(config.upload_dir, PathBuf::from("/srv/uploads"));
        assert_eq!(config.upload_url_prefix, "/media");
        assert!(config.release_mode);
    }

    #[test]
    fn tls_requires_both_halves() {
        assert!(Config::try_parse_from(["platify-web", "--tls-cert", "cert.pem"]).is_err());
        let config = Config::try_parse_from([
            "platify-web",
            "--tls-cert",
            "cert.pem",
            "--tls-key",
            "key.pem",
        ])
        .unwrap();
        assert!(config.tls_paths().is_some());
    }

    #[test]
    fn invalid_port_is_rejected() {
        assert!(Config::try_parse_from(["platify-web", "--port", "not-a-port"]).is_err());
    }
}
