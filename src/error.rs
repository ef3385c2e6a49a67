// SPDX-FileCopyrightText: 2025 Joost van der Laan <joost@fashionunited.com>
//
// SPDX-License-Identifier: AGPL-3.0-only

use thiserror::Error;

/// Every failure a conversion or directory lookup can end in.
///
/// `Validation` covers everything we can classify: upstream `result` errors,
/// malformed payloads, unknown currency codes and bad input. Anything else,
/// typically a transport failure, is `Unexpected`.
#[derive(Debug, Error)]
pub enum ConverterError {
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

impl ConverterError {
    pub fn validation(message: impl Into<String>) -> Self {
        ConverterError::Validation(message.into())
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, ConverterError::Validation(_))
    }

    /// Text shown to the user in the result region or on the command line.
    ///
    /// Unexpected errors show the outermost context and the root cause only;
    /// reqwest already folds its intermediate causes into its own message.
    pub fn user_message(&self) -> String {
        match self {
            ConverterError::Validation(msg) => format!("Error: {}", msg),
            ConverterError::Unexpected(err) => {
                let outer = err.to_string();
                let root = err.root_cause().to_string();
                if outer == root {
                    format!("Unexpected error: {}", outer)
                } else {
                    format!("Unexpected error: {}: {}", outer, root)
                }
            }
        }
    }
}

impl From<reqwest::Error> for ConverterError {
    fn from(err: reqwest::Error) -> Self {
        ConverterError::Unexpected(anyhow::Error::new(err).context("Failed to reach the rates service"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_message_distinguishes_kinds() {
        let err = ConverterError::validation("no rate for currency XYZ");
        assert!(err.is_validation());
        assert_eq!(err.user_message(), "Error: no rate for currency XYZ");

        let err = ConverterError::from(anyhow::anyhow!("connection reset"));
        assert!(!err.is_validation());
        assert_eq!(err.user_message(), "Unexpected error: connection reset");
    }

    #[test]
    fn test_unexpected_message_skips_intermediate_causes() {
        let err = ConverterError::from(
            anyhow::anyhow!("Connection refused")
                .context("error trying to connect: tcp connect error: Connection refused")
                .context("Failed to reach the rates service"),
        );
        assert_eq!(
            err.user_message(),
            "Unexpected error: Failed to reach the rates service: Connection refused"
        );
    }
}
