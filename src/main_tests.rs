// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `main.rs` - log format selection and shutdown handling

#[cfg(test)]
mod tests {
    use super::super::{is_json_log_format, shutdown_signal};
    use std::time::Duration as StdDuration;
    use tokio::time::timeout;

    #[test]
    fn test_json_log_format_is_case_insensitive() {
        assert!(is_json_log_format("json"));
        assert!(is_json_log_format("JSON"));
        assert!(!is_json_log_format("text"));
        assert!(!is_json_log_format(""));
    }

    /// Test that SIGTERM signal handler can be created on Unix platforms
    #[tokio::test]
    #[cfg(unix)]
    async fn test_sigterm_signal_handler_creation() {
        use tokio::signal::unix::{signal, SignalKind};

        let result = signal(SignalKind::terminate());
        assert!(
            result.is_ok(),
            "Should be able to create SIGTERM signal handler"
        );
    }

    /// The shutdown future stays pending while no signal is delivered
    #[tokio::test]
    async fn test_shutdown_signal_pending_without_signal() {
        let result = timeout(StdDuration::from_millis(100), shutdown_signal()).await;

        assert!(
            result.is_err(),
            "shutdown_signal() should time out when no signal is sent"
        );
    }

    /// A long-running task loses the select race against shutdown
    #[tokio::test]
    async fn test_select_prefers_first_completed_branch() {
        let outcome = tokio::select! {
            () = async {
                tokio::time::sleep(StdDuration::from_millis(10)).await;
            } => "shutdown",
            () = std::future::pending::<()>() => "server",
        };

        assert_eq!(outcome, "shutdown");
    }
}
