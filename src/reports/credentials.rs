use ini::{Ini, ParseOption};
use std::path::{Path, PathBuf};
use tracing::debug;

use super::error::ConfigError;

const USER_KEY: &str = "system_user";
const PASSWORD_KEY: &str = "system_password";

/// Where to look for the instance identifier and its credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialSettings {
    pub file: PathBuf,
    pub instance_env_var: String,
    pub oratab_path: PathBuf,
    pub default_instance: String,
    pub default_user: String,
}

impl Default for CredentialSettings {
    fn default() -> Self {
        Self {
            file: PathBuf::from("./config/db_credentials.ini"),
            instance_env_var: "ORACLE_SID".to_string(),
            oratab_path: PathBuf::from("/etc/oratab"),
            default_instance: "ORCL".to_string(),
            default_user: "system".to_string(),
        }
    }
}

/// Credentials for a single invocation. Built fresh every time and dropped
/// with the request, the password is never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub instance_id: String,
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("instance_id", &self.instance_id)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct CredentialResolver {
    settings: CredentialSettings,
}

impl CredentialResolver {
    pub fn new(settings: CredentialSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &CredentialSettings {
        &self.settings
    }

    /// Environment variable first, then the first entry of the oratab file,
    /// then the configured default.
    pub fn instance_id(&self) -> String {
        if let Ok(value) = std::env::var(&self.settings.instance_env_var) {
            let value = value.trim();
            if !value.is_empty() {
                debug!("Instance id {} from ${}", value, self.settings.instance_env_var);
                return value.to_string();
            }
        }
        if let Some(sid) = first_oratab_sid(&self.settings.oratab_path) {
            debug!(
                "Instance id {} from {:?}",
                sid, self.settings.oratab_path
            );
            return sid;
        }
        debug!("Instance id defaulted to {}", self.settings.default_instance);
        self.settings.default_instance.clone()
    }

    /// Re-reads the credential file on every call so rotated passwords are
    /// picked up without a restart.
    pub fn resolve(&self) -> Result<Credentials, ConfigError> {
        let instance_id = self.instance_id();
        let path = &self.settings.file;
        // Values are taken verbatim, passwords may contain quotes and backslashes.
        let options = ParseOption {
            enabled_quote: false,
            enabled_escape: false,
            ..ParseOption::default()
        };
        let ini = Ini::load_from_file_opt(path, options).map_err(|err| {
            ConfigError::CredentialFileUnreadable {
                path: path.clone(),
                reason: err.to_string(),
            }
        })?;

        let section = ini
            .section(Some(instance_id.as_str()))
            .ok_or_else(|| ConfigError::MissingSection {
                instance: instance_id.clone(),
            })?;

        let username = section
            .get(USER_KEY)
            .map(str::trim)
            .filter(|user| !user.is_empty())
            .unwrap_or(&self.settings.default_user)
            .to_string();

        let password = match section.get(PASSWORD_KEY) {
            Some(password) if !password.is_empty() => password.to_string(),
            _ => {
                return Err(ConfigError::MissingPassword {
                    instance: instance_id,
                })
            }
        };

        Ok(Credentials {
            instance_id,
            username,
            password,
        })
    }
}

/// The SID of the first non-comment `SID:ORACLE_HOME:FLAG` line.
fn first_oratab_sid(path: &Path) -> Option<String> {
    let content = std::fs::read_to_string(path).ok()?;
    parse_first_oratab_sid(&content)
}

fn parse_first_oratab_sid(content: &str) -> Option<String> {
    content
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty() && !line.starts_with('#'))
        .and_then(|line| line.split(':').next())
        .map(str::trim)
        .filter(|sid| !sid.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    // Env var names nobody sets, one per test, so no test mutates the environment.
    fn settings(dir: &TempDir, env_var: &str) -> CredentialSettings {
        CredentialSettings {
            file: dir.path().join("db_credentials.ini"),
            instance_env_var: env_var.to_string(),
            oratab_path: dir.path().join("oratab"),
            default_instance: "ORCL".to_string(),
            default_user: "system".to_string(),
        }
    }

    #[test]
    fn resolves_default_instance_section() {
        let dir = TempDir::new().unwrap();
        let settings = settings(&dir, "OPS_DASHBOARD_TEST_SID_UNSET_1");
        fs::write(
            &settings.file,
            "[ORCL]\nsystem_user = scott\nsystem_password = tiger\n",
        )
        .unwrap();

        let credentials = CredentialResolver::new(settings).resolve().unwrap();
        assert_eq!(credentials.instance_id, "ORCL");
        assert_eq!(credentials.username, "scott");
        assert_eq!(credentials.password, "tiger");
    }

    #[test]
    fn passwords_are_read_verbatim() {
        let dir = TempDir::new().unwrap();
        let settings = settings(&dir, "OPS_DASHBOARD_TEST_SID_UNSET_8");
        let resolver = CredentialResolver::new(settings.clone());

        for password in [r"Pa\ss", "'quoted'", "\"double\"", r"C:\x41"] {
            fs::write(
                &settings.file,
                format!("[ORCL]\nsystem_password = {}\n", password),
            )
            .unwrap();
            let credentials = resolver.resolve().unwrap();
            assert_eq!(credentials.password, password);
        }
    }

    #[test]
    fn oratab_first_entry_wins_over_default() {
        let dir = TempDir::new().unwrap();
        let settings = settings(&dir, "OPS_DASHBOARD_TEST_SID_UNSET_2");
        fs::write(
            &settings.oratab_path,
            "# comment line\n\nDEV:/u01/app/oracle/product/19c:N\nPROD:/u01/x:Y\n",
        )
        .unwrap();
        fs::write(&settings.file, "[DEV]\nsystem_password = devpw\n").unwrap();

        let credentials = CredentialResolver::new(settings).resolve().unwrap();
        assert_eq!(credentials.instance_id, "DEV");
        assert_eq!(credentials.username, "system");
        assert_eq!(credentials.password, "devpw");
    }

    #[test]
    fn missing_section_is_reported() {
        let dir = TempDir::new().unwrap();
        let settings = settings(&dir, "OPS_DASHBOARD_TEST_SID_UNSET_3");
        fs::write(&settings.file, "[OTHER]\nsystem_password = x\n").unwrap();

        let err = CredentialResolver::new(settings).resolve().unwrap_err();
        assert!(matches!(err, ConfigError::MissingSection { ref instance } if instance == "ORCL"));
    }

    #[test]
    fn empty_password_is_rejected() {
        let dir = TempDir::new().unwrap();
        let settings = settings(&dir, "OPS_DASHBOARD_TEST_SID_UNSET_4");
        fs::write(&settings.file, "[ORCL]\nsystem_user = scott\nsystem_password =\n").unwrap();

        let err = CredentialResolver::new(settings).resolve().unwrap_err();
        assert!(matches!(err, ConfigError::MissingPassword { .. }));
    }

    #[test]
    fn unreadable_file_is_reported() {
        let dir = TempDir::new().unwrap();
        let settings = settings(&dir, "OPS_DASHBOARD_TEST_SID_UNSET_5");

        let err = CredentialResolver::new(settings).resolve().unwrap_err();
        assert!(matches!(err, ConfigError::CredentialFileUnreadable { .. }));
    }

    #[test]
    fn file_is_reread_on_each_call() {
        let dir = TempDir::new().unwrap();
        let settings = settings(&dir, "OPS_DASHBOARD_TEST_SID_UNSET_6");
        fs::write(&settings.file, "[ORCL]\nsystem_password = first\n").unwrap();
        let resolver = CredentialResolver::new(settings.clone());
        assert_eq!(resolver.resolve().unwrap().password, "first");

        fs::write(&settings.file, "[ORCL]\nsystem_password = second\n").unwrap();
        assert_eq!(resolver.resolve().unwrap().password, "second");
    }

    #[test]
    fn debug_output_hides_the_password() {
        let credentials = Credentials {
            instance_id: "ORCL".to_string(),
            username: "scott".to_string(),
            password: "tiger".to_string(),
        };
        let printed = format!("{:?}", credentials);
        assert!(!printed.contains("tiger"));
        assert!(printed.contains("scott"));
    }

    #[test]
    fn oratab_parsing_skips_comments_and_blanks() {
        assert_eq!(
            parse_first_oratab_sid("#x\n   \n  TEST:/u01:N\n"),
            Some("TEST".to_string())
        );
        assert_eq!(parse_first_oratab_sid("# only comments\n"), None);
        assert_eq!(parse_first_oratab_sid(":/u01:N\n"), None);
    }
}
