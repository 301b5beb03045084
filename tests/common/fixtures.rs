//! Test fixture creation: user database, report scripts, credentials

use super::constants::*;
use anyhow::Result;
use ops_dashboard::reports::{ReportStrategy, ReportType};
use ops_dashboard::user::{SqliteUserStore, UserManager};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;

/// Layout of a test environment inside a single temp dir.
pub struct TestEnvironment {
    pub dir: TempDir,
    pub db_path: PathBuf,
    pub report_dir: PathBuf,
    pub scripts_dir: PathBuf,
    pub static_dir: PathBuf,
    pub credentials_file: PathBuf,
    pub oratab_path: PathBuf,
}

/// Shell script body that behaves like a well-written report script.
///
/// Fixed reports write the instance and user they received into the report
/// so tests can check the arguments, prefix reports write a unique
/// timestamped file.
pub fn default_script(report_type: ReportType) -> String {
    let report_dir_arg = if report_type.requires_credentials() {
        "$4"
    } else {
        "$1"
    };
    match report_type.strategy() {
        ReportStrategy::Fixed { filename } => format!(
            "echo \"<html>$1 $2</html>\" > \"{dir}/{file}\"\necho \"{file}\"\n",
            dir = report_dir_arg,
            file = filename
        ),
        ReportStrategy::Prefix { prefix, suffix } => format!(
            "name=\"{prefix}$(date +%Y%m%d%H%M%S)_$${suffix}\"\n\
             echo \"<html>{id}</html>\" > \"{dir}/$name\"\n\
             echo \"generated $name\" >&2\n\
             echo \"$name\"\n",
            prefix = prefix,
            suffix = suffix,
            id = report_type.id(),
            dir = report_dir_arg
        ),
    }
}

pub fn write_script(scripts_dir: &Path, report_type: ReportType, body: &str) -> Result<()> {
    fs::write(scripts_dir.join(report_type.script_name()), body)?;
    Ok(())
}

/// Creates the temp layout with one registered user and working scripts
/// for every report type.
pub fn create_test_environment() -> Result<TestEnvironment> {
    let dir = TempDir::new()?;
    let root = dir.path();

    let db_path = root.join("user.db");
    let user_manager = UserManager::new(
        Box::new(SqliteUserStore::new(&db_path)?),
        Duration::from_secs(3600),
    );
    user_manager.register(TEST_USER, TEST_PASS)?;

    let report_dir = root.join("report");
    let scripts_dir = root.join("scripts");
    let static_dir = root.join("static");
    fs::create_dir_all(&report_dir)?;
    fs::create_dir_all(&scripts_dir)?;
    fs::create_dir_all(&static_dir)?;

    for report_type in ReportType::ALL {
        write_script(&scripts_dir, report_type, &default_script(report_type))?;
    }

    fs::write(static_dir.join("index.html"), TEST_INDEX_HTML)?;
    fs::write(static_dir.join("login.html"), "<html>login</html>")?;

    let credentials_file = root.join("db_credentials.ini");
    fs::write(
        &credentials_file,
        format!(
            "[OTHERDB]\nsystem_user = nobody\nsystem_password = nothing\n\n\
             [{}]\nsystem_user = {}\nsystem_password = {}\n",
            TEST_INSTANCE, TEST_DB_USER, TEST_DB_PASSWORD
        ),
    )?;

    let oratab_path = root.join("oratab");
    fs::write(
        &oratab_path,
        format!(
            "# oratab for tests\n\n{}:/u01/app/oracle/product/19c:N\n",
            TEST_INSTANCE
        ),
    )?;

    Ok(TestEnvironment {
        dir,
        db_path,
        report_dir,
        scripts_dir,
        static_dir,
        credentials_file,
        oratab_path,
    })
}
