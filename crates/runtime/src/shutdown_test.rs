#[cfg(test)]
mod tests {
    use crate::shutdown::ShutdownSignal;
    use std::time::Duration;
    use tokio::time;

    #[tokio::test]
    async fn signal_stays_pending_without_signals() {
        let shutdown = ShutdownSignal::new().unwrap();

        // No signal is delivered during the test, so the work future wins
        let result = tokio::select! {
            () = time::sleep(Duration::from_millis(50)) => "completed",
            () = shutdown => "shutdown",
        };
        assert_eq!(result, "completed");
    }

    #[tokio::test]
    async fn signal_is_debug_printable() {
        let shutdown = ShutdownSignal::new().unwrap();
        assert!(format!("{shutdown:?}").starts_with("ShutdownSignal"));
    }
}
