//! Seal command - make the server discard its key material
//!
//! One request, no retries. Sealing an already sealed server is a success.

use clap::{CommandFactory, Parser};

use super::{Command, CommandError};
use crate::meta::{
    split_flag_args, ClientFactory, GeneralFlags, Meta, VaultClient, GENERAL_OPTIONS_HELP,
};

const SEALED_MESSAGE: &str = "Vault is now sealed.";

const SEAL_HELP: &str = r#"
Usage: vault seal [options]

  Seal the Vault server.

  A sealed server throws away the master key it holds in memory and refuses
  every data access request until it is unsealed again, either with the
  "unseal" command or through the API.

  Sealing is idempotent: sealing a server that is already sealed succeeds
  and changes nothing.

  If an unseal is in progress, sealing resets it and every key share has to
  be entered again. This is the same as running "vault unseal -reset".
"#;

/// Arguments accepted by `vault seal`
#[derive(Debug, Parser)]
#[command(name = "seal", no_binary_name = true, disable_version_flag = true)]
struct SealArgs {
    #[command(flatten)]
    general: GeneralFlags,
}

/// `vault seal`
pub struct SealCommand<F> {
    meta: Meta<F>,
}

impl<F: ClientFactory> SealCommand<F> {
    pub fn new(meta: Meta<F>) -> Self {
        Self { meta }
    }

    async fn execute(&self, args: Vec<String>) -> Result<(), CommandError> {
        let mut cmd = SealArgs::command();
        cmd.build();

        // Positional arguments end the flags and are ignored
        let (flags, rest) = split_flag_args(&cmd, args);
        if !rest.is_empty() {
            tracing::debug!(?rest, "ignoring positional arguments");
        }

        let parsed = SealArgs::try_parse_from(flags).map_err(|e| {
            tracing::debug!(kind = ?e.kind(), "rejected seal arguments");
            CommandError::Usage { help: self.help() }
        })?;

        let client = self
            .meta
            .client(parsed.general)
            .map_err(CommandError::Initialization)?;

        client
            .seal()
            .await
            .map_err(|cause| CommandError::Operation {
                action: "sealing",
                cause,
            })
    }
}

impl<F: ClientFactory> Command for SealCommand<F> {
    fn help(&self) -> String {
        format!("{}\n\n{}", SEAL_HELP.trim(), GENERAL_OPTIONS_HELP)
    }

    fn synopsis(&self) -> &'static str {
        "Seals the vault server"
    }

    async fn run(&self, args: Vec<String>) -> i32 {
        match self.execute(args).await {
            Ok(()) => {
                self.meta.ui().output(SEALED_MESSAGE);
                0
            }
            Err(e) => {
                self.meta.ui().error(&e.to_string());
                e.exit_code()
            }
        }
    }
}
