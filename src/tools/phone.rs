use std::fmt;
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use serde::Deserialize;

use super::runner::CommandRunner;
use crate::providers::types::tool::{ParamSpec, ToolSpec};

static DIALABLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+?[0-9 ()\-.*#]+$").expect("valid phone number pattern"));

/// A dialable number: digits plus the usual separators, `+`, `*` and `#`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub struct PhoneNumber(String);

impl PhoneNumber {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for PhoneNumber {
    type Error = String;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        let number = raw.trim();
        if DIALABLE.is_match(number) && number.chars().any(|c| c.is_ascii_digit()) {
            Ok(Self(number.to_string()))
        } else {
            Err(format!("'{}' is not a valid phone number", raw))
        }
    }
}

impl fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Deserialize)]
pub struct CallArgs {
    pub phone_number: PhoneNumber,
}

#[derive(Debug, Deserialize)]
pub struct SmsArgs {
    pub phone_number: PhoneNumber,
    pub message: String,
}

pub fn call_spec() -> ToolSpec {
    ToolSpec::new(
        "make_call",
        "Initiate a GSM phone call to a specific number.",
        vec![ParamSpec::required("phone_number", "The phone number to call")],
    )
}

pub fn sms_spec() -> ToolSpec {
    ToolSpec::new(
        "send_sms",
        "Send an SMS text message.",
        vec![
            ParamSpec::required("phone_number", "The recipient's phone number"),
            ParamSpec::required("message", "The message content"),
        ],
    )
}

pub async fn make_call(runner: &dyn CommandRunner, number: &PhoneNumber, timeout: Duration) -> String {
    tracing::info!(%number, "calling");
    let args = [number.to_string()];

    match runner.run("termux-telephony-call", &args, timeout).await {
        Ok(output) => match output.failure_reason() {
            None => format!("Call initiated to {}", number),
            Some(reason) => format!("Failed to call {}: {}", number, reason),
        },
        Err(e) => format!("Failed to call {}: {}", number, e),
    }
}

pub async fn send_sms(
    runner: &dyn CommandRunner,
    number: &PhoneNumber,
    message: &str,
    timeout: Duration,
) -> String {
    tracing::info!(%number, message, "sending sms");
    let args = ["-n".to_string(), number.to_string(), message.to_string()];

    match runner.run("termux-sms-send", &args, timeout).await {
        Ok(output) => match output.failure_reason() {
            None => format!("SMS sent to {}", number),
            Some(reason) => format!("Failed to send SMS to {}: {}", number, reason),
        },
        Err(e) => format!("Failed to send SMS to {}: {}", number, e),
    }
}
