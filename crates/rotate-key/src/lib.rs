//! Rotates an XPR Network account permission key by driving an external
//! chain client through an `updateauth` action.
//!
//! A rotation is a straight pipeline: build the payload, run the client once,
//! pull the transaction id out of whatever it printed, report. The client is
//! the only side effect and sits behind [`invoker::Invoker`].

use tracing::{error, info, warn};
use url::Url;

pub mod cli;
pub mod invoker;
pub mod output;
pub mod parser;
pub mod payload;
pub mod report;

use invoker::{Invocation, Invoker, DEFAULT_CLIENT, DEFAULT_CONTRACT};
use output::{InfoLine, Output};
use parser::{explorer_base, transaction_link, ResponseParser};
use payload::{Permission, UpdateAuthRequest};
use report::{FailureReport, InvocationResult, SuccessReport};

#[derive(Debug)]
pub struct KeyRotation {
    client: String,
    client_args: Vec<String>,
    contract: String,
    explorer: Url,
    parser: ResponseParser,
}

impl KeyRotation {
    pub fn new(explorer: Url) -> Self {
        Self {
            client: DEFAULT_CLIENT.to_owned(),
            client_args: Vec::new(),
            contract: DEFAULT_CONTRACT.to_owned(),
            explorer: explorer_base(explorer),
            parser: ResponseParser::default(),
        }
    }

    #[must_use]
    pub fn with_client(mut self, client: impl Into<String>, client_args: Vec<String>) -> Self {
        self.client = client.into();
        self.client_args = client_args;
        self
    }

    #[must_use]
    pub fn with_contract(mut self, contract: impl Into<String>) -> Self {
        self.contract = contract.into();
        self
    }

    #[must_use]
    pub fn with_parser(mut self, parser: ResponseParser) -> Self {
        self.parser = parser;
        self
    }

    /// Runs one rotation. Every failure is folded into the returned result.
    pub async fn execute<I: Invoker + ?Sized>(
        &self,
        invoker: &I,
        request: &UpdateAuthRequest,
        output: &Output,
    ) -> InvocationResult {
        if let Permission::Other(name) = &request.permission {
            warn!(permission = %name, "Unrecognized permission, passing it to the client as-is");
        }

        output.progress(&InfoLine(&format!(
            "Updating {} key for account {}",
            request.permission, request.account
        )));
        output.progress(&InfoLine(&format!(
            "New public key: {}",
            request.new_public_key
        )));

        let invocation =
            match Invocation::updateauth(&self.client, &self.client_args, &self.contract, request)
            {
                Ok(invocation) => invocation,
                Err(err) => return Self::failure(&err),
            };

        output.progress(&InfoLine(&format!(
            "Submitting {}::updateauth as {}",
            self.contract,
            request.authorization()
        )));

        let captured = match invoker.invoke(&invocation).await {
            Ok(captured) => captured,
            Err(err) => return Self::failure(&err),
        };

        if !captured.stderr.trim().is_empty() {
            warn!("Client succeeded but wrote to stderr");
        }

        let transaction_id = self.parser.transaction_id(&captured.stdout);
        match &transaction_id {
            Some(id) => info!(transaction_id = %id, "Key rotation submitted"),
            None => warn!("No transaction id found in client output"),
        }

        InvocationResult::Success(SuccessReport::new(
            request,
            transaction_id,
            |id| transaction_link(&self.explorer, id),
            captured,
        ))
    }

    fn failure(err: &invoker::InvocationError) -> InvocationResult {
        error!(%err, "Key rotation failed");
        InvocationResult::Failure(FailureReport::from(err))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use serde_json::{json, Value};

    use super::*;
    use crate::invoker::{CapturedOutput, InvocationError};
    use crate::output::Format;
    use crate::parser::DEFAULT_EXPLORER_URL;

    const ID: &str = "8a4f2c1b9d3e5f7a0b1c2d3e4f5a6b7c8d9e0f1a2b3c4d5e6f7a8b9c0d1e2f3a";

    #[derive(Debug)]
    struct FakeInvoker {
        reply: fn() -> Result<CapturedOutput, InvocationError>,
        calls: Mutex<Vec<Invocation>>,
    }

    impl FakeInvoker {
        fn new(reply: fn() -> Result<CapturedOutput, InvocationError>) -> Self {
            Self {
                reply,
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<Invocation> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Invoker for FakeInvoker {
        async fn invoke(
            &self,
            invocation: &Invocation,
        ) -> Result<CapturedOutput, InvocationError> {
            self.calls.lock().unwrap().push(invocation.clone());
            (self.reply)()
        }
    }

    fn rotation() -> KeyRotation {
        KeyRotation::new(Url::parse(DEFAULT_EXPLORER_URL).unwrap())
    }

    fn quiet() -> Output {
        Output::new(Format::Json)
    }

    fn labeled_stdout() -> Result<CapturedOutput, InvocationError> {
        Ok(CapturedOutput {
            stdout: format!("transaction_id: {ID}\n"),
            stderr: String::new(),
        })
    }

    #[tokio::test]
    async fn active_rotation_reports_transaction() {
        let invoker = FakeInvoker::new(labeled_stdout);
        let request = UpdateAuthRequest::new("dcdoit", "PUB_K1_abc", Permission::Active);

        let result = rotation().execute(&invoker, &request, &quiet()).await;

        assert_eq!(
            serde_json::to_value(&result).unwrap(),
            json!({
                "success": true,
                "account": "dcdoit",
                "permission": "active",
                "transactionId": ID,
                "transactionLink": format!("https://explorer.xprnetwork.org/transaction/{ID}"),
                "newPublicKey": "PUB_K1_abc"
            })
        );

        let calls = invoker.calls();
        assert_eq!(calls.len(), 1, "client must run exactly once");
        assert_eq!(calls[0].program, "proton");
        assert_eq!(calls[0].args[..3], ["action", "eosio", "updateauth"]);
        assert_eq!(calls[0].args[4], "dcdoit@active");
    }

    #[tokio::test]
    async fn owner_rotation_has_empty_parent() {
        let invoker = FakeInvoker::new(labeled_stdout);
        let request = UpdateAuthRequest::new("dcdoit", "PUB_K1_abc", Permission::Owner);

        let result = rotation().execute(&invoker, &request, &quiet()).await;
        assert!(result.is_success(), "owner rotation should succeed");

        let calls = invoker.calls();
        let payload: Value = serde_json::from_str(&calls[0].args[3]).unwrap();
        assert_eq!(payload["parent"], json!(""));
        assert_eq!(payload["permission"], json!("owner"));
        assert_eq!(calls[0].args[4], "dcdoit@owner");
    }

    #[tokio::test]
    async fn parse_miss_is_still_success() {
        let invoker = FakeInvoker::new(|| {
            Ok(CapturedOutput {
                stdout: "Success!\n".to_owned(),
                stderr: "deprecated flag\n".to_owned(),
            })
        });
        let request = UpdateAuthRequest::new("dcdoit", "PUB_K1_abc", Permission::Active);

        let result = rotation().execute(&invoker, &request, &quiet()).await;
        let value = serde_json::to_value(&result).unwrap();

        assert_eq!(value["success"], json!(true));
        assert_eq!(value["transactionId"], json!(null));
        assert_eq!(value["transactionLink"], json!(null));
    }

    #[tokio::test]
    async fn client_failure_is_reported() {
        let invoker = FakeInvoker::new(|| {
            Err(InvocationError::Failed {
                command: "proton action eosio updateauth".to_owned(),
                status: "exit status: 1".to_owned(),
                stderr: "Missing required authority\n".to_owned(),
            })
        });
        let request = UpdateAuthRequest::new("dcdoit", "PUB_K1_abc", Permission::Active);

        let result = rotation().execute(&invoker, &request, &quiet()).await;
        let value = serde_json::to_value(&result).unwrap();

        assert!(!result.is_success(), "failed client must fail the rotation");
        assert_eq!(value["success"], json!(false));
        assert_eq!(value["stderr"], json!("Missing required authority"));
        assert!(
            value["error"].as_str().is_some_and(|e| e.contains("Command failed")),
            "unexpected error: {value}"
        );
        assert!(value.get("transactionId").is_none(), "no transaction fields on failure");
        assert!(value.get("newPublicKey").is_none(), "no key on failure");
    }

    #[tokio::test]
    async fn configured_client_and_contract_are_used() {
        let invoker = FakeInvoker::new(labeled_stdout);
        let request = UpdateAuthRequest::new("dcdoit", "PUB_K1_abc", Permission::Active);

        let _result = rotation()
            .with_client("npx", vec!["@proton/cli".to_owned()])
            .with_contract("eosio.test")
            .execute(&invoker, &request, &quiet())
            .await;

        let calls = invoker.calls();
        assert_eq!(calls[0].program, "npx");
        assert_eq!(calls[0].args[..4], ["@proton/cli", "action", "eosio.test", "updateauth"]);
    }
}
