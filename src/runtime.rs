// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! User-facing notifications.
//!
//! Capture failures are reported here as warnings; questions that need a
//! decision (recording without output latency) go through `approve`.

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::{info, warn};

/// Informational message
#[derive(Debug, Clone, PartialEq)]
pub struct InfoRequest {
    pub headline: Option<String>,
    pub message: String,
}

/// Question with approve/cancel answers
#[derive(Debug, Clone, PartialEq)]
pub struct ApproveRequest {
    pub headline: Option<String>,
    pub message: String,
    pub approve_text: String,
    pub cancel_text: String,
}

#[async_trait]
pub trait RuntimeNotifier: Send + Sync {
    /// Fire-and-forget warning
    fn warn(&self, message: &str);

    async fn info(&self, request: InfoRequest);

    /// Resolves to true when the user approves.
    async fn approve(&self, request: ApproveRequest) -> bool;
}

/// Headless notifier: logs everything and answers approvals with a fixed
/// decision. Warnings are kept for inspection.
pub struct LogNotifier {
    approve: bool,
    warnings: Mutex<Vec<String>>,
}

impl LogNotifier {
    /// Approves every request
    pub fn new() -> Self {
        Self {
            approve: true,
            warnings: Mutex::new(Vec::new()),
        }
    }

    /// Declines every request
    pub fn declining() -> Self {
        Self {
            approve: false,
            ..Self::new()
        }
    }

    /// Warnings reported so far
    pub fn warnings(&self) -> Vec<String> {
        self.warnings.lock().clone()
    }
}

impl Default for LogNotifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RuntimeNotifier for LogNotifier {
    fn warn(&self, message: &str) {
        warn!("{}", message);
        self.warnings.lock().push(message.to_string());
    }

    async fn info(&self, request: InfoRequest) {
        match request.headline {
            Some(headline) => info!("{}: {}", headline, request.message),
            None => info!("{}", request.message),
        }
    }

    async fn approve(&self, request: ApproveRequest) -> bool {
        let answer = if self.approve {
            &request.approve_text
        } else {
            &request.cancel_text
        };
        info!("{} -> {}", request.message, answer);
        self.approve
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> ApproveRequest {
        ApproveRequest {
            headline: None,
            message: "Proceed?".into(),
            approve_text: "Yes".into(),
            cancel_text: "No".into(),
        }
    }

    #[tokio::test]
    async fn test_approval_answers() {
        assert!(LogNotifier::new().approve(request()).await);
        assert!(!LogNotifier::declining().approve(request()).await);
    }

    #[test]
    fn test_warnings_are_kept() {
        let notifier = LogNotifier::new();
        notifier.warn("Could not find device with id: 'mic-9'");
        assert_eq!(notifier.warnings().len(), 1);
    }
}
