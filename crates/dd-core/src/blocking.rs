//! Offloading CPU-bound work (HTML parsing, markdown conversion) to Tokio's
//! blocking threadpool so page conversion never stalls the runtime.

use crate::Error;

/// Execute a CPU-intensive closure on Tokio's blocking threadpool.
///
/// # Example
///
/// ```ignore
/// let markdown = run_blocking(move || html_to_markdown(&html, 50_000)).await?;
/// ```
pub async fn run_blocking<F, T>(f: F) -> Result<T, Error>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| Error::Unknown(format!("Blocking task failed: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_run_blocking_returns_value() {
        let len = run_blocking(|| "<p>hello</p>".len()).await.unwrap();
        assert_eq!(len, 12);
    }

    #[tokio::test]
    async fn test_run_blocking_reports_panic() {
        let result: Result<(), Error> = run_blocking(|| panic!("boom")).await;
        assert!(matches!(result, Err(Error::Unknown(_))));
    }
}
