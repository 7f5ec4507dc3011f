//! Shared state and options every command is constructed with
//!
//! General connection options are parsed per command and resolved against
//! the [`Config`] here, so no command reads global parser state. The config
//! file and environment are only read once a command asks for a client.

use anyhow::Result;
use clap::{builder::BoolishValueParser, Args};
use std::path::PathBuf;
use std::sync::Arc;

use crate::api;
use crate::config::{Config, ConfigLoader, DEFAULT_ADDRESS};
use crate::tls::CaSource;
use crate::ui::Ui;

/// Help for the flags shared by every command that talks to a server
pub const GENERAL_OPTIONS_HELP: &str = "\
General Options:

  -address=addr           The address of the Vault server.
                          Overrides the VAULT_ADDR environment variable.

  -ca-cert=path           Path to a PEM encoded CA cert file used to
                          verify the Vault server's TLS certificate.
                          Overrides the VAULT_CACERT environment variable.

  -ca-path=path           Path to a directory of PEM encoded CA cert files
                          used to verify the Vault server's TLS certificate.
                          If both -ca-cert and -ca-path are specified,
                          -ca-path is used. Overrides VAULT_CAPATH.

  -tls-skip-verify        Do not verify the server's TLS certificate. Not
                          recommended, least of all when unsealing.
                          Overrides VAULT_SKIP_VERIFY.";

/// Connection flags accepted by every server-facing command.
///
/// Empty values (`-ca-path=`) count as not given.
#[derive(Debug, Clone, Default, Args)]
pub struct GeneralFlags {
    /// The address of the Vault server
    #[arg(long, value_name = "addr")]
    pub address: Option<String>,

    /// PEM encoded CA cert file
    #[arg(long, value_name = "path")]
    pub ca_cert: Option<String>,

    /// Directory of PEM encoded CA cert files
    #[arg(long, value_name = "path")]
    pub ca_path: Option<String>,

    /// Do not verify TLS certificates
    #[arg(
        long,
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true",
        value_parser = BoolishValueParser::new()
    )]
    pub tls_skip_verify: Option<bool>,
}

impl GeneralFlags {
    /// Layer flags over the config file and environment.
    ///
    /// The CA pair is taken as a unit: if either CA flag is set, neither CA
    /// setting from the lower layers applies.
    pub fn resolve(self, config: &Config, token: Option<String>) -> GeneralOptions {
        let given = |value: Option<String>| value.filter(|v| !v.is_empty());

        let address = given(self.address);
        let flag_ca_cert = given(self.ca_cert).map(PathBuf::from);
        let flag_ca_path = given(self.ca_path).map(PathBuf::from);

        let (ca_cert, ca_path) = if flag_ca_cert.is_some() || flag_ca_path.is_some() {
            (flag_ca_cert, flag_ca_path)
        } else {
            (config.ca_cert.clone(), config.ca_path.clone())
        };

        GeneralOptions {
            address: address
                .or_else(|| config.address.clone())
                .unwrap_or_else(|| DEFAULT_ADDRESS.to_string()),
            ca_cert,
            ca_path,
            tls_skip_verify: self
                .tls_skip_verify
                .or(config.tls_skip_verify)
                .unwrap_or(false),
            token,
        }
    }
}

/// Fully resolved connection settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneralOptions {
    pub address: String,
    pub ca_cert: Option<PathBuf>,
    pub ca_path: Option<PathBuf>,
    pub tls_skip_verify: bool,
    pub token: Option<String>,
}

impl Default for GeneralOptions {
    fn default() -> Self {
        Self {
            address: DEFAULT_ADDRESS.to_string(),
            ca_cert: None,
            ca_path: None,
            tls_skip_verify: false,
            token: None,
        }
    }
}

impl GeneralOptions {
    /// Effective CA roots; a CA directory takes precedence over a CA file
    pub fn ca_source(&self) -> Option<CaSource> {
        self.ca_path
            .clone()
            .map(CaSource::Directory)
            .or_else(|| self.ca_cert.clone().map(CaSource::File))
    }
}

/// Operations a command needs from a server handle
pub trait VaultClient {
    async fn seal(&self) -> Result<()>;
}

impl VaultClient for api::Client {
    async fn seal(&self) -> Result<()> {
        self.sys().seal().await?;
        Ok(())
    }
}

/// Produces server handles from resolved options
pub trait ClientFactory {
    type Client: VaultClient;

    fn client(&self, options: &GeneralOptions) -> Result<Self::Client>;
}

/// Factory backed by the reqwest client in [`api`]
#[derive(Debug, Default, Clone, Copy)]
pub struct HttpClientFactory;

impl ClientFactory for HttpClientFactory {
    type Client = api::Client;

    fn client(&self, options: &GeneralOptions) -> Result<Self::Client> {
        tracing::debug!(address = %options.address, "initializing client");
        Ok(api::Client::new(options)?)
    }
}

/// Collaborators injected into every command
pub struct Meta<F> {
    ui: Arc<dyn Ui>,
    factory: F,
    loader: ConfigLoader,
}

impl<F: ClientFactory> Meta<F> {
    pub fn new(ui: Arc<dyn Ui>, factory: F, loader: ConfigLoader) -> Self {
        Self {
            ui,
            factory,
            loader,
        }
    }

    pub fn ui(&self) -> &dyn Ui {
        self.ui.as_ref()
    }

    /// Load config and environment, apply the flags, and build a client.
    ///
    /// Any failure here is a client initialization failure.
    pub fn client(&self, flags: GeneralFlags) -> Result<F::Client> {
        let config = self.loader.load()?;
        let token = self.loader.token(&config);
        let options = flags.resolve(&config, token);

        tracing::debug!(
            address = %options.address,
            ca_cert = ?options.ca_cert,
            ca_path = ?options.ca_path,
            tls_skip_verify = options.tls_skip_verify,
            "resolved general options"
        );

        self.factory.client(&options)
    }
}

/// Split arguments the way Go's flag package does: flags end at the first
/// positional argument or after a bare `--`.
///
/// Single-dash long flags (`-address=x`) are rewritten to `--address=x`, and
/// a flag that takes a value without `=` keeps the following argument with it.
/// Returns the flag arguments for clap and the ignored remainder.
pub fn split_flag_args<I>(cmd: &clap::Command, args: I) -> (Vec<String>, Vec<String>)
where
    I: IntoIterator<Item = String>,
{
    let mut flags = Vec::new();
    let mut args = args.into_iter();

    while let Some(arg) = args.next() {
        if arg == "--" {
            break;
        }
        if arg == "-" || !arg.starts_with('-') {
            return (flags, std::iter::once(arg).chain(args).collect());
        }

        let arg = if arg.len() > 2 && !arg.starts_with("--") {
            format!("-{}", arg)
        } else {
            arg
        };

        let separate_value = !arg.contains('=') && takes_separate_value(cmd, &arg);
        flags.push(arg);
        if separate_value {
            flags.extend(args.next());
        }
    }

    (flags, args.collect())
}

fn takes_separate_value(cmd: &clap::Command, flag: &str) -> bool {
    let Some(name) = flag.strip_prefix("--") else {
        return false;
    };

    cmd.get_arguments().any(|arg| {
        arg.get_long() == Some(name)
            && arg.get_action().takes_values()
            && !arg.is_require_equals_set()
    })
}
