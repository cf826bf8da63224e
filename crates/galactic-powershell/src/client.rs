//! PowerShell remoting client

use crate::config::RemoteConfig;
use crate::error::{PowerShellError, Result};
use crate::output::{clean_error_stream, PowerShellOutput};
use crate::wsman::{
    parse_command_id, parse_receive, parse_shell_id, EnvelopeSettings, FAULT_TIMED_OUT,
};
use galactic_log::{EventEntry, EventLog, EventSeverity};
use galactic_rest::RestClient;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

const EVENT_SOURCE: &str = "galactic-powershell";
const SOAP_CONTENT_TYPE: &str = "application/soap+xml;charset=UTF-8";

/// Runs PowerShell scripts on a remote Windows host through WinRM.
///
/// Each script gets its own shell, which is deleted afterwards even when the
/// script fails.
pub struct PowerShellClient {
    rest: RestClient,
    settings: EnvelopeSettings,
    command_timeout: Duration,
    event_log: Option<Arc<dyn EventLog>>,
}

impl PowerShellClient {
    pub fn new(config: RemoteConfig) -> Result<Self> {
        config.validate()?;
        let rest = RestClient::builder(config.endpoint.clone())
            .basic(config.username.clone(), config.password.clone())
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            rest,
            settings: EnvelopeSettings {
                endpoint: config.endpoint,
                max_envelope_size: config.max_envelope_size,
                operation_timeout: Duration::from_secs(config.operation_timeout_secs),
                locale: config.locale,
            },
            command_timeout: Duration::from_secs(config.command_timeout_secs),
            event_log: None,
        })
    }

    /// Record script runs in an application event log
    pub fn with_event_log(mut self, event_log: Arc<dyn EventLog>) -> Self {
        self.event_log = Some(event_log);
        self
    }

    fn record_event(&self, severity: EventSeverity, message: String) {
        if let Some(log) = &self.event_log {
            log.log(EventEntry::new(severity, EVENT_SOURCE, &message));
        }
    }

    async fn post(&self, envelope: String) -> Result<String> {
        Ok(self.rest.post_text("", SOAP_CONTENT_TYPE, &envelope).await?)
    }

    /// Run `script` and collect its output. A non-zero exit code is not an
    /// error; check [`PowerShellOutput::is_success`].
    pub async fn run_script(&self, script: &str) -> Result<PowerShellOutput> {
        if script.trim().is_empty() {
            return Err(PowerShellError::InvalidArgument("Script cannot be empty".to_string()));
        }
        let shell_id = parse_shell_id(&self.post(self.settings.create_shell()).await?)?;
        debug!(shell_id = %shell_id, "Remote shell created");

        let result = self.run_in_shell(&shell_id, script).await;

        if let Err(e) = self.post(self.settings.delete_shell(&shell_id)).await {
            warn!(shell_id = %shell_id, error = %e, "Failed to delete remote shell");
        }

        match &result {
            Ok(output) if output.is_success() => {
                info!(endpoint = %self.settings.endpoint, "Remote script finished");
                self.record_event(
                    EventSeverity::Information,
                    format!("Ran script on {}", self.settings.endpoint),
                );
            }
            Ok(output) => self.record_event(
                EventSeverity::Warning,
                format!(
                    "Script on {} exited with code {}",
                    self.settings.endpoint, output.exit_code
                ),
            ),
            Err(e) => self.record_event(
                EventSeverity::Error,
                format!("Script on {} failed: {}", self.settings.endpoint, e),
            ),
        }
        result
    }

    async fn run_in_shell(&self, shell_id: &str, script: &str) -> Result<PowerShellOutput> {
        let command_id = parse_command_id(&self.post(self.settings.command(shell_id, script)).await?)?;
        let started = Instant::now();
        let mut stdout = Vec::new();
        let mut stderr = Vec::new();

        let exit_code = loop {
            if started.elapsed() > self.command_timeout {
                self.terminate(shell_id, &command_id).await;
                return Err(PowerShellError::Timeout(self.command_timeout));
            }
            match self.post(self.settings.receive(shell_id, &command_id)).await {
                Ok(body) => {
                    let output = parse_receive(&body)?;
                    stdout.extend(output.stdout);
                    stderr.extend(output.stderr);
                    if output.done {
                        break output.exit_code.unwrap_or(0);
                    }
                }
                // No output within the operation timeout; poll again
                Err(PowerShellError::Fault { code, .. }) if code == FAULT_TIMED_OUT => {}
                Err(e) => {
                    self.terminate(shell_id, &command_id).await;
                    return Err(e);
                }
            }
        };
        self.terminate(shell_id, &command_id).await;

        Ok(PowerShellOutput {
            stdout: String::from_utf8_lossy(&stdout).into_owned(),
            stderr: clean_error_stream(&String::from_utf8_lossy(&stderr)),
            exit_code,
        })
    }

    async fn terminate(&self, shell_id: &str, command_id: &str) {
        if let Err(e) = self.post(self.settings.terminate(shell_id, command_id)).await {
            debug!(command_id, error = %e, "Terminate signal failed");
        }
    }
}
