//! Periodic self-ping that keeps the hosting platform from idling the process.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Spawn the keep-alive loop. Failed pings are logged and never end the loop.
pub fn spawn(url: String, period: Duration) -> Result<JoinHandle<()>, reqwest::Error> {
    let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
    tracing::info!("Keep-alive pinging {} every {}s", url, period.as_secs());
    Ok(tokio::spawn(run(client, url, period)))
}

async fn run(client: reqwest::Client, url: String, period: Duration) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately.
    ticker.tick().await;

    loop {
        ticker.tick().await;
        tracing::debug!("Awake server every {}s", period.as_secs());
        if let Err(e) = ping(&client, &url).await {
            tracing::warn!("Keep-alive ping to {} failed: {}", url, e);
        }
    }
}

async fn ping(client: &reqwest::Client, url: &str) -> Result<String, reqwest::Error> {
    let resp = client.get(url).send().await?.error_for_status()?;
    let status = resp.status();
    let body = resp.text().await?;
    tracing::debug!("Keep-alive {}: {}", status, body);
    Ok(body)
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn serve(app: axum::Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_ping_returns_body() {
        let url = serve(axum::Router::new().route("/", axum::routing::get(|| async { "awake" }))).await;
        let client = reqwest::Client::new();

        assert_eq!(ping(&client, &url).await.unwrap(), "awake");
    }

    #[tokio::test]
    async fn test_ping_reports_http_errors() {
        let url = serve(axum::Router::new()).await;
        let client = reqwest::Client::new();

        let err = ping(&client, &format!("{}/missing", url)).await.unwrap_err();
        assert!(err.is_status());
    }

    #[tokio::test]
    async fn test_ping_reports_connection_errors() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = reqwest::Client::new();
        assert!(ping(&client, &format!("http://{}", addr)).await.is_err());
    }
}
