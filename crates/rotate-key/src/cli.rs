use core::time::Duration;
use std::process::ExitCode;

use clap::Parser;
use const_format::concatcp;
use url::Url;

use crate::invoker::{ProcessInvoker, DEFAULT_CLIENT, DEFAULT_CONTRACT};
use crate::output::{Format, Output};
use crate::parser::DEFAULT_EXPLORER_URL;
use crate::payload::{Permission, UpdateAuthRequest};
use crate::KeyRotation;

pub const EXAMPLES: &str = r"
  # Rotate the active key of an account
  $ xpr-rotate-key dcdoit PUB_K1_6MRy...

  # Rotate the owner key
  $ xpr-rotate-key dcdoit PUB_K1_6MRy... owner

  # Run the client through npx and print only the JSON result
  $ xpr-rotate-key --client npx --client-arg @proton/cli --output-format json dcdoit PUB_K1_6MRy...
";

#[derive(Debug, Parser)]
#[command(author, version, about = "Rotate an XPR Network account permission key", long_about = None)]
#[command(after_help = concatcp!(
    "Environment variables:\n",
    "  XPR_CLIENT          External chain client binary\n",
    "  XPR_EXPLORER_URL    Explorer base URL for transaction links\n",
    "  RUST_LOG            Log filter directives\n\n",
    "Examples:",
    EXAMPLES
))]
pub struct RootCommand {
    #[command(flatten)]
    pub args: RootArgs,

    /// Account whose key is rotated
    #[arg(value_name = "ACCOUNT", value_parser = non_empty_string)]
    pub account: String,

    /// Public key that replaces the current one
    #[arg(value_name = "NEW_PUBLIC_KEY", value_parser = non_empty_string)]
    pub new_public_key: String,

    /// Permission to rotate, `active` or `owner`
    #[arg(value_name = "PERMISSION", default_value_t)]
    pub permission: Permission,
}

#[derive(Debug, Parser)]
pub struct RootArgs {
    /// External chain client binary
    #[arg(long, value_name = "PATH", default_value = DEFAULT_CLIENT)]
    #[arg(env = "XPR_CLIENT", hide_env_values = true)]
    pub client: String,

    /// Argument placed before `action` on the client command line, repeatable
    #[arg(long = "client-arg", value_name = "ARG", allow_hyphen_values = true)]
    pub client_args: Vec<String>,

    /// System contract that receives the updateauth action
    #[arg(long, value_name = "NAME", default_value = DEFAULT_CONTRACT)]
    pub contract: String,

    /// Explorer base URL; the transaction id is appended to it
    #[arg(long, value_name = "URL", default_value = DEFAULT_EXPLORER_URL)]
    #[arg(env = "XPR_EXPLORER_URL")]
    pub explorer_url: Url,

    /// Kill the client if it has not finished after this many seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    #[arg(long, value_name = "FORMAT", default_value_t, value_enum)]
    pub output_format: Format,
}

impl RootCommand {
    pub fn request(&self) -> UpdateAuthRequest {
        UpdateAuthRequest::new(
            self.account.clone(),
            self.new_public_key.clone(),
            self.permission.clone(),
        )
    }

    pub async fn run(self) -> ExitCode {
        let output = Output::new(self.args.output_format);
        let request = self.request();

        let rotation = KeyRotation::new(self.args.explorer_url)
            .with_client(self.args.client, self.args.client_args)
            .with_contract(self.args.contract);
        let invoker = ProcessInvoker::new(self.args.timeout.map(Duration::from_secs));

        let result = rotation.execute(&invoker, &request, &output).await;
        output.write(&result);

        result.exit_code()
    }
}

/// Clap value parser rejecting empty and whitespace-only values.
pub fn non_empty_string(s: &str) -> Result<String, String> {
    if s.trim().is_empty() {
        Err("value cannot be empty".to_owned())
    } else {
        Ok(s.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use clap::error::ErrorKind;

    use super::*;

    #[test]
    fn permission_defaults_to_active() {
        let command = RootCommand::try_parse_from(["xpr-rotate-key", "dcdoit", "PUB_K1_abc"])
            .unwrap();

        assert_eq!(command.permission, Permission::Active);
        assert_eq!(command.args.client, "proton");
        assert_eq!(command.args.contract, "eosio");
        assert_eq!(command.args.output_format, Format::PlainText);
        assert_eq!(command.args.timeout, None);
    }

    #[test]
    fn owner_and_custom_permissions_parse() {
        let owner =
            RootCommand::try_parse_from(["xpr-rotate-key", "dcdoit", "PUB_K1_abc", "owner"])
                .unwrap();
        let custom =
            RootCommand::try_parse_from(["xpr-rotate-key", "dcdoit", "PUB_K1_abc", "claim"])
                .unwrap();

        assert_eq!(owner.permission, Permission::Owner);
        assert_eq!(custom.permission, Permission::Other("claim".to_owned()));
    }

    #[test]
    fn public_key_is_required() {
        let err = RootCommand::try_parse_from(["xpr-rotate-key", "dcdoit"]).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn empty_account_is_rejected() {
        let err =
            RootCommand::try_parse_from(["xpr-rotate-key", " ", "PUB_K1_abc"]).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::ValueValidation);
    }

    #[test]
    fn client_args_are_collected_in_order() {
        let command = RootCommand::try_parse_from([
            "xpr-rotate-key",
            "--client",
            "npx",
            "--client-arg",
            "@proton/cli",
            "--client-arg",
            "--yes",
            "--timeout",
            "30",
            "dcdoit",
            "PUB_K1_abc",
        ])
        .unwrap();

        assert_eq!(command.args.client, "npx");
        assert_eq!(command.args.client_args, ["@proton/cli", "--yes"]);
        assert_eq!(command.args.timeout, Some(30));
    }

    #[test]
    fn request_carries_positionals() {
        let command =
            RootCommand::try_parse_from(["xpr-rotate-key", "dcdoit", "PUB_K1_abc", "owner"])
                .unwrap();

        assert_eq!(
            command.request(),
            UpdateAuthRequest::new("dcdoit", "PUB_K1_abc", Permission::Owner)
        );
    }
}
