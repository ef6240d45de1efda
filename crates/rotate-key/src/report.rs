use std::process::ExitCode;

use color_eyre::owo_colors::OwoColorize;
use serde::Serialize;

use crate::invoker::{CapturedOutput, InvocationError};
use crate::output::{ErrorLine, InfoLine, Report, WarnLine};
use crate::payload::{Permission, UpdateAuthRequest};

/// Outcome of one rotation, serialized as the tool's public JSON contract.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum InvocationResult {
    Success(SuccessReport),
    Failure(FailureReport),
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SuccessReport {
    success: bool,
    pub account: String,
    pub permission: Permission,
    pub transaction_id: Option<String>,
    pub transaction_link: Option<String>,
    pub new_public_key: String,
    #[serde(skip)]
    pub output: CapturedOutput,
}

#[derive(Debug, Serialize)]
pub struct FailureReport {
    success: bool,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stderr: Option<String>,
}

impl SuccessReport {
    /// The link is derived from the id so one can never appear without the other.
    pub fn new(
        request: &UpdateAuthRequest,
        transaction_id: Option<String>,
        link: impl FnOnce(&str) -> String,
        output: CapturedOutput,
    ) -> Self {
        let transaction_link = transaction_id.as_deref().map(link);

        Self {
            success: true,
            account: request.account.clone(),
            permission: request.permission.clone(),
            transaction_id,
            transaction_link,
            new_public_key: request.new_public_key.clone(),
            output,
        }
    }
}

impl FailureReport {
    pub fn new(error: impl Into<String>, stderr: Option<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
            stderr,
        }
    }
}

impl From<&InvocationError> for FailureReport {
    fn from(err: &InvocationError) -> Self {
        Self::new(err.to_string(), err.stderr().map(str::to_owned))
    }
}

impl InvocationResult {
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub const fn exit_code(&self) -> ExitCode {
        match self {
            Self::Success(_) => ExitCode::SUCCESS,
            Self::Failure(_) => ExitCode::FAILURE,
        }
    }
}

impl Report for InvocationResult {
    fn report(&self) {
        match self {
            Self::Success(report) => report.report(),
            Self::Failure(report) => report.report(),
        }
        println!();
        println!("{}", "Result:".bold());
        match serde_json::to_string_pretty(self) {
            Ok(json) => println!("{json}"),
            Err(err) => eprintln!("Failed to serialize to JSON: {err}"),
        }
    }
}

impl Report for SuccessReport {
    fn report(&self) {
        let stdout = self.output.stdout.trim_end();
        if !stdout.is_empty() {
            println!("{stdout}");
        }

        let stderr = self.output.stderr.trim_end();
        if !stderr.is_empty() {
            WarnLine("Client reported warnings:").report();
            println!("{stderr}");
        }

        println!(
            "{} {} key updated for {}",
            "✅".green(),
            self.permission,
            self.account
        );
        match (&self.transaction_id, &self.transaction_link) {
            (Some(id), Some(link)) => {
                InfoLine(&format!("Transaction ID: {id}")).report();
                InfoLine(&format!("Explorer: {link}")).report();
            }
            _ => WarnLine("Could not find a transaction id in the client output").report(),
        }
    }
}

impl Report for FailureReport {
    fn report(&self) {
        ErrorLine(&format!("Key update failed: {}", self.error)).report();
        if let Some(stderr) = &self.stderr {
            println!("Details: {stderr}");
        }
    }
}
