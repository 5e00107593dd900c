//! Snippetbox - Entry point

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use snippetbox_config::{ConfigLoader, SnippetboxConfig};
use snippetbox_server::{routes, Application, Server};

const DEFAULT_CONFIG_PATH: &str = "snippetbox.toml";

/// Command-line arguments. Anything set here wins over the config file
/// and the environment.
#[derive(Debug, Default)]
struct Args {
    config: Option<PathBuf>,
    addr: Option<String>,
    static_dir: Option<PathBuf>,
    dsn: Option<String>,
    secret: Option<String>,
    tls_cert: Option<PathBuf>,
    tls_key: Option<PathBuf>,
}

impl Args {
    fn parse() -> anyhow::Result<Self> {
        let mut args = std::env::args().skip(1);
        let mut parsed = Self::default();

        while let Some(arg) = args.next() {
            let mut value = |flag: &str| {
                args.next()
                    .with_context(|| format!("{flag} requires a value"))
            };
            match arg.as_str() {
                "-c" | "--config" => parsed.config = Some(PathBuf::from(value(&arg)?)),
                "--addr" => parsed.addr = Some(value(&arg)?),
                "--static-dir" => parsed.static_dir = Some(PathBuf::from(value(&arg)?)),
                "--dsn" => parsed.dsn = Some(value(&arg)?),
                "--secret" => parsed.secret = Some(value(&arg)?),
                "--tls-cert" => parsed.tls_cert = Some(PathBuf::from(value(&arg)?)),
                "--tls-key" => parsed.tls_key = Some(PathBuf::from(value(&arg)?)),
                "-h" | "--help" => {
                    print_help();
                    std::process::exit(0);
                }
                "-V" | "--version" => {
                    println!("snippetbox {}", env!("CARGO_PKG_VERSION"));
                    std::process::exit(0);
                }
                other => bail!("unknown argument: {other} (use --help for usage)"),
            }
        }

        Ok(parsed)
    }

    fn apply(self, config: &mut SnippetboxConfig) {
        if let Some(addr) = self.addr {
            config.server.addr = addr;
        }
        if let Some(dir) = self.static_dir {
            config.server.static_dir = dir;
        }
        if let Some(dsn) = self.dsn {
            config.storage.dsn = dsn;
        }
        if let Some(secret) = self.secret {
            config.session.secret = secret;
        }
        if let Some(cert) = self.tls_cert {
            config.server.tls_cert = Some(cert);
        }
        if let Some(key) = self.tls_key {
            config.server.tls_key = Some(key);
        }
    }
}

fn print_help() {
    println!(
        r"Snippetbox - share text snippets over HTTP

USAGE:
    snippetbox [OPTIONS]

OPTIONS:
    -c, --config <PATH>     Configuration file, TOML or JSON (default: ./snippetbox.toml if present)
        --addr <ADDR>       HTTP network address (default: 127.0.0.1:4000)
        --static-dir <DIR>  Path to static assets (default: ./ui/static)
        --dsn <DSN>         Storage data source name (default: memory://)
        --secret <KEY>      Session signing key, at least 32 bytes
        --tls-cert <PATH>   PEM certificate chain; serves HTTPS together with --tls-key
        --tls-key <PATH>    PEM private key
    -h, --help              Print help information
    -V, --version           Print version information

ENVIRONMENT VARIABLES:
    SNIPPETBOX__SERVER__ADDR        Overrides server.addr
    SNIPPETBOX__SESSION__SECRET     Overrides session.secret
    SNIPPETBOX__STORAGE__DSN        Overrides storage.dsn
    SNIPPETBOX__SERVER__TLS_CERT    Overrides server.tls_cert
    SNIPPETBOX__SERVER__TLS_KEY     Overrides server.tls_key
    SNIPPETBOX__LOGGING__LEVEL      Log filter, e.g. info or snippetbox_server=debug
    SNIPPETBOX__LOGGING__FORMAT     json or pretty
"
    );
}

fn load_config(args: Args) -> anyhow::Result<SnippetboxConfig> {
    let loader = ConfigLoader::new().with_defaults();
    let loader = match &args.config {
        Some(path) => loader.with_file(path)?,
        None => loader.with_optional_file(DEFAULT_CONFIG_PATH)?,
    };
    let mut config = loader
        .with_dotenv()?
        .with_env_prefix("SNIPPETBOX")
        .load_unvalidated()?;

    args.apply(&mut config);
    config.validate().context("invalid configuration")?;
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse()?;
    let config = load_config(args)?;

    snippetbox_telemetry::init_logging(&config.logging.to_log_config())
        .context("failed to initialize logging")?;

    let app = Arc::new(Application::from_config(&config)?);
    let handler = routes(app)?;
    let server = Server::new(handler, &config.server)?;

    if let Err(err) = server.run().await {
        tracing::error!(error = %err, "server error");
        return Err(err.into());
    }
    Ok(())
}
