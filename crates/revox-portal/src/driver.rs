//! Locally launched `geckodriver` process

use crate::webdriver::WebDriverError;
use serde::Deserialize;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::{Child, Command};

const READY_POLLS: u32 = 40;
const READY_INTERVAL: Duration = Duration::from_millis(250);

#[derive(Debug, Deserialize)]
struct Status {
    value: StatusValue,
}

#[derive(Debug, Deserialize)]
struct StatusValue {
    ready: bool,
}

/// Driver child process, killed when dropped
#[derive(Debug)]
pub struct DriverProcess {
    child: Child,
    url: String,
}

impl DriverProcess {
    /// Start the driver on the port of `webdriver_url` and wait until ready
    ///
    /// # Errors
    /// The binary cannot be started, the URL is invalid, or the driver
    /// does not report ready in time.
    pub async fn spawn(driver_path: &str, webdriver_url: &str) -> Result<Self, WebDriverError> {
        let port = reqwest::Url::parse(webdriver_url)
            .ok()
            .and_then(|url| url.port_or_known_default())
            .ok_or_else(|| WebDriverError::Malformed(format!("no port in {webdriver_url}")))?;

        let child = Command::new(driver_path)
            .arg("--port")
            .arg(port.to_string())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()?;
        tracing::info!(driver = driver_path, port, "Driver started");

        let process = Self {
            child,
            url: webdriver_url.trim_end_matches('/').to_string(),
        };
        process.wait_ready().await?;
        Ok(process)
    }

    async fn wait_ready(&self) -> Result<(), WebDriverError> {
        let http = reqwest::Client::new();
        let status_url = format!("{}/status", self.url);

        for _ in 0..READY_POLLS {
            if let Ok(response) = http.get(&status_url).send().await {
                if let Ok(status) = response.json::<Status>().await {
                    if status.value.ready {
                        return Ok(());
                    }
                }
            }
            tokio::time::sleep(READY_INTERVAL).await;
        }

        Err(WebDriverError::NotReady(self.url.clone()))
    }

    /// Stop the driver
    pub async fn shutdown(mut self) {
        if let Err(e) = self.child.kill().await {
            tracing::warn!(error = %e, "Failed to stop driver");
        }
    }
}
