//! CLI response formatting and output.
//!
//! Provides the JSON envelope printed after the command transcript, and the
//! exit-code mapping for failed runs.

use parabuild::Error;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct CliResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<CliError>,
}

#[derive(Debug, Serialize)]
pub struct CliError {
    pub code: String,
    pub message: String,
}

impl<T: Serialize> CliResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }
}

impl CliResponse<()> {
    pub fn from_error(err: &Error) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(CliError {
                code: err.code().to_string(),
                message: err.to_string(),
            }),
        }
    }
}

fn print_response<T: Serialize>(response: &CliResponse<T>) {
    match serde_json::to_string_pretty(response) {
        Ok(payload) => println!("{}", payload),
        // Serialization of our own envelope failing is a bug; still emit
        // something machine-readable rather than nothing.
        Err(e) => println!(
            "{{\"success\": false, \"error\": {{\"code\": \"JSON_ERROR\", \"message\": \"{}\"}}}}",
            e
        ),
    }
}

/// Print the envelope for a command result and return the process exit
/// code: the command's own code on success, the error's mapped code (the
/// failing child's exit code for command failures) otherwise.
pub fn print_result<T: Serialize>(result: parabuild::Result<(T, i32)>) -> i32 {
    match result {
        Ok((data, exit_code)) => {
            print_response(&CliResponse::success(data));
            exit_code
        }
        Err(err) => {
            print_response(&CliResponse::from_error(&err));
            err.exit_code()
        }
    }
}
