use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, error, info, warn};

use super::catalog::{ReportCatalog, ReportRecord};
use super::credentials::{CredentialResolver, Credentials};
use super::error::{ReportError, ScriptError};
use super::report_type::ReportStrategy;
use super::ReportType;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportSettings {
    pub report_dir: PathBuf,
    pub scripts_dir: PathBuf,
    /// Program used to run the scripts, e.g. `sh`. When unset the script is
    /// executed directly and must be executable.
    pub interpreter: Option<String>,
    /// No limit when unset.
    pub timeout: Option<Duration>,
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            report_dir: PathBuf::from("./report"),
            scripts_dir: PathBuf::from("./scripts"),
            interpreter: None,
            timeout: None,
        }
    }
}

/// Runs report scripts and reconciles what they claim to have produced with
/// what is actually in the report directory.
pub struct ReportService {
    settings: ReportSettings,
    catalog: ReportCatalog,
    credentials: CredentialResolver,
    locks: HashMap<ReportType, Arc<Mutex<()>>>,
}

impl ReportService {
    pub fn new(settings: ReportSettings, credentials: CredentialResolver) -> Self {
        let catalog = ReportCatalog::new(settings.report_dir.clone());
        let locks = ReportType::ALL
            .into_iter()
            .map(|report_type| (report_type, Arc::new(Mutex::new(()))))
            .collect();
        Self {
            settings,
            catalog,
            credentials,
            locks,
        }
    }

    pub fn catalog(&self) -> &ReportCatalog {
        &self.catalog
    }

    pub fn settings(&self) -> &ReportSettings {
        &self.settings
    }

    pub fn latest(&self, report_type: ReportType) -> std::io::Result<Option<ReportRecord>> {
        self.catalog.latest(report_type)
    }

    pub fn script_path(&self, report_type: ReportType) -> PathBuf {
        self.settings.scripts_dir.join(report_type.script_name())
    }

    /// Generates a report and returns the record of the file it produced.
    ///
    /// Only one invocation per report type runs at a time, a second request
    /// fails right away with [ScriptError::Busy]. The script runs on its own
    /// task, if the caller goes away it still completes and its output lands
    /// in the report directory.
    pub async fn run(self: &Arc<Self>, report_type: ReportType) -> Result<ReportRecord, ReportError> {
        let guard = self.try_lock(report_type)?;

        let credentials = if report_type.requires_credentials() {
            Some(self.credentials.resolve().map_err(|err| {
                error!("Cannot run {} report: {}", report_type, err);
                err
            })?)
        } else {
            None
        };

        let service = Arc::clone(self);
        let task = tokio::spawn(async move {
            let result = service.invoke(report_type, credentials).await;
            drop(guard);
            result
        });

        match task.await {
            Ok(result) => result.map_err(ReportError::from),
            Err(join_err) => Err(ReportError::Aborted(join_err.to_string())),
        }
    }

    fn try_lock(&self, report_type: ReportType) -> Result<OwnedMutexGuard<()>, ScriptError> {
        let lock = match self.locks.get(&report_type) {
            Some(lock) => Arc::clone(lock),
            None => return Err(ScriptError::Busy(report_type)),
        };
        lock.try_lock_owned().map_err(|_| {
            warn!("{} report requested while one is already running", report_type);
            ScriptError::Busy(report_type)
        })
    }

    async fn invoke(
        &self,
        report_type: ReportType,
        credentials: Option<Credentials>,
    ) -> Result<ReportRecord, ScriptError> {
        let script = self.script_path(report_type);
        let mut command = self.command_for(&script);
        // Arguments carry the password, they are never logged.
        if let Some(credentials) = credentials {
            command
                .arg(credentials.instance_id)
                .arg(credentials.username)
                .arg(credentials.password);
        }
        command
            .arg(self.settings.report_dir.as_os_str())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        // Own process group, so a timeout also stops whatever the script started.
        #[cfg(unix)]
        command.process_group(0);

        info!("Running {} report with {:?}", report_type, script);
        let start = Instant::now();

        let child = command.spawn().map_err(|err| {
            error!("Could not start {:?}: {}", script, err);
            ScriptError::SpawnFailed {
                script: script.clone(),
                reason: err.to_string(),
            }
        })?;

        let pid = child.id();
        let output = match self.settings.timeout {
            Some(limit) => match tokio::time::timeout(limit, child.wait_with_output()).await {
                Ok(output) => output?,
                Err(_) => {
                    // Dropping the wait future drops the child, which kills it.
                    kill_process_group(pid);
                    error!(
                        "{} report timed out after {:?}, script killed",
                        report_type, limit
                    );
                    return Err(ScriptError::Timeout { limit });
                }
            },
            None => child.wait_with_output().await?,
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            error!(
                "{} report script failed with {:?}: {}",
                report_type,
                output.status.code(),
                stderr
            );
            return Err(ScriptError::ExecutionFailed {
                exit_code: output.status.code(),
                stderr,
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let reported = last_non_empty_line(&stdout).ok_or_else(|| {
            error!("{} report script printed no filename", report_type);
            ScriptError::NoOutputFilename
        })?;

        let record = self.reconcile(report_type, reported)?;
        info!(
            "{} report generated as {} in {}ms",
            report_type,
            record.filename,
            start.elapsed().as_millis()
        );
        Ok(record)
    }

    fn command_for(&self, script: &Path) -> Command {
        match &self.settings.interpreter {
            Some(interpreter) => {
                let mut command = Command::new(interpreter);
                command.arg(script);
                command
            }
            None => Command::new(script),
        }
    }

    /// Checks the name printed by the script against the report directory.
    fn reconcile(&self, report_type: ReportType, reported: &str) -> Result<ReportRecord, ScriptError> {
        let strategy = report_type.strategy();
        let filename = match strategy {
            ReportStrategy::Fixed { filename } => {
                if reported != filename {
                    warn!(
                        "{} script reported {:?}, expected {:?}; using the expected name",
                        report_type, reported, filename
                    );
                }
                filename.to_string()
            }
            ReportStrategy::Prefix { .. } => {
                let name = Path::new(reported)
                    .file_name()
                    .and_then(|name| name.to_str())
                    .unwrap_or(reported)
                    .to_string();
                if !strategy.matches(&name) {
                    warn!(
                        "{} script reported {:?} which does not follow its naming pattern",
                        report_type, name
                    );
                }
                name
            }
        };

        match self.catalog.record_for(report_type, &filename)? {
            Some(record) => Ok(record),
            None => {
                error!(
                    "{} script reported {:?} but no such file is in {:?}",
                    report_type,
                    filename,
                    self.catalog.report_dir()
                );
                Err(ScriptError::OutputMissing { filename })
            }
        }
    }
}

fn last_non_empty_line(stdout: &str) -> Option<&str> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .last()
}

#[cfg(unix)]
fn kill_process_group(pid: Option<u32>) {
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    let Some(pid) = pid else { return };
    if let Err(err) = killpg(Pid::from_raw(pid as i32), Signal::SIGKILL) {
        // ESRCH when every process of the group already exited.
        debug!("Could not kill process group {}: {}", pid, err);
    }
}

#[cfg(not(unix))]
fn kill_process_group(_pid: Option<u32>) {}
