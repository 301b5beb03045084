use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

use ops_dashboard::user::{SqliteUserStore, UserManager};

use rustyline::{
    completion::Completer, highlight::Highlighter, hint::Hinter, history::FileHistory,
    validate::Validator, CompletionType, Config, Editor, Helper,
};

fn parse_path(s: &str) -> Result<PathBuf> {
    let original_path = PathBuf::from(s);
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(original_path))
}

#[derive(Parser, Debug)]
struct CliArgs {
    /// Path to the user database, usually `<db_dir>/user.db`.
    #[clap(value_parser = parse_path)]
    pub path: PathBuf,
}

#[derive(Parser)]
#[command(name = "")]
struct InnerCli {
    #[command(subcommand)]
    command: InnerCommand,
}

#[derive(Subcommand)]
enum InnerCommand {
    /// Creates a user with the given handle.
    AddUser { user_handle: String },

    /// Creates a password authentication for the given user.
    /// Fails if the user already has a password set.
    AddLogin {
        user_handle: String,
        password: String,
    },

    /// Change the password of a user, fails if no password was set.
    UpdateLogin {
        user_handle: String,
        password: String,
    },

    /// Deletes the password authentication for a given user.
    DeleteLogin { user_handle: String },

    /// Shows authentication information of a given user.
    Show { user_handle: String },

    /// Verifies the password of a given user without creating a session.
    CheckPassword {
        user_handle: String,
        password: String,
    },

    /// Shows all user handles.
    UserHandles,

    /// Shows the path of the current auth db.
    Where,

    /// Close this program.
    Exit,
}

enum CommandExecutionResult {
    Ok,
    Exit,
    Error(String),
}

const PROMPT: &str = ">> ";

// Sessions are never issued from here, the ttl is irrelevant.
const UNUSED_SESSION_TTL: Duration = Duration::from_secs(0);

fn execute_command(
    line: String,
    user_manager: &UserManager,
    db_path: &str,
) -> CommandExecutionResult {
    if line.is_empty() {
        return CommandExecutionResult::Ok;
    }

    let args =
        shlex::split(&line).unwrap_or_else(|| line.split_whitespace().map(String::from).collect());

    let cli = InnerCli::try_parse_from(std::iter::once(" ").chain(args.iter().map(String::as_str)));

    let cli = match cli {
        Ok(cli) => cli,
        Err(e) => {
            if e.print().is_err() {
                println!("{}", e);
            }
            return CommandExecutionResult::Ok;
        }
    };

    let result = match cli.command {
        InnerCommand::AddUser { user_handle } => user_manager
            .add_user(&user_handle)
            .map(|user_id| println!("Created user {} with id {}", user_handle, user_id)),
        InnerCommand::AddLogin {
            user_handle,
            password,
        } => user_manager.create_password_credentials(&user_handle, &password),
        InnerCommand::UpdateLogin {
            user_handle,
            password,
        } => user_manager.update_password_credentials(&user_handle, &password),
        InnerCommand::DeleteLogin { user_handle } => {
            user_manager.delete_password_credentials(&user_handle)
        }
        InnerCommand::Show { user_handle } => show_user(user_manager, &user_handle),
        InnerCommand::CheckPassword {
            user_handle,
            password,
        } => user_manager
            .check_password(&user_handle, &password)
            .map(|user_id| match user_id {
                Some(_) => println!("The password provided is correct!"),
                None => println!("Wrong password, or no such user."),
            }),
        InnerCommand::UserHandles => user_manager
            .get_all_user_handles()
            .map(|handles| println!("{:#?}", handles)),
        InnerCommand::Where => {
            println!("{}", db_path);
            Ok(())
        }
        InnerCommand::Exit => return CommandExecutionResult::Exit,
    };

    match result {
        Ok(()) => CommandExecutionResult::Ok,
        Err(err) => CommandExecutionResult::Error(format!("{:#}", err)),
    }
}

fn show_user(user_manager: &UserManager, user_handle: &str) -> Result<()> {
    let user_credentials = match user_manager.get_user_credentials(user_handle)? {
        Some(credentials) => credentials,
        None => anyhow::bail!("User {} not found.", user_handle),
    };
    println!("User Credentials:");
    println!("{:#?}", user_credentials);

    println!("\nAuth Tokens:");
    for token in user_manager.get_user_tokens(user_handle)?.iter() {
        println!(
            "  user_id={} created={:?} last_used={:?}",
            token.user_id, token.created, token.last_used
        );
    }
    Ok(())
}

struct MyHelper {
    commands_names: Vec<String>,
}

impl MyHelper {
    pub fn new() -> Self {
        let commands_names: Vec<String> = InnerCli::command()
            .get_subcommands()
            .map(|sc| sc.get_name().to_string())
            .collect();

        MyHelper { commands_names }
    }
}

impl Completer for MyHelper {
    type Candidate = String;

    fn complete(
        &self,
        line: &str,
        _pos: usize,
        _ctx: &rustyline::Context<'_>,
    ) -> rustyline::Result<(usize, Vec<String>)> {
        if line.contains(' ') {
            return Ok((0, Vec::with_capacity(0)));
        }
        let matches = self
            .commands_names
            .iter()
            .filter(|c| c.starts_with(line))
            .map(|c| c.to_string())
            .collect::<Vec<_>>();

        Ok((0, matches))
    }
}

impl Hinter for MyHelper {
    type Hint = String;
}
impl Highlighter for MyHelper {}
impl Validator for MyHelper {}
impl Helper for MyHelper {}

fn main() -> Result<()> {
    let cli_args = CliArgs::parse();
    let db_path = cli_args.path.display().to_string();
    let user_store = SqliteUserStore::new(&cli_args.path)?;
    let user_manager = UserManager::new(Box::new(user_store), UNUSED_SESSION_TTL);

    InnerCli::command().print_long_help()?;

    let config = Config::builder()
        .completion_type(CompletionType::List)
        .build();

    let mut rl = Editor::<MyHelper, FileHistory>::with_config(config)?;
    rl.set_helper(Some(MyHelper::new()));

    loop {
        match rl.readline(PROMPT) {
            Ok(line) => {
                let _ = rl.add_history_entry(&line);
                match execute_command(line, &user_manager, &db_path) {
                    CommandExecutionResult::Ok => {}
                    CommandExecutionResult::Exit => break,
                    CommandExecutionResult::Error(err) => {
                        eprintln!("Error: {}", err);
                        continue;
                    }
                }
            }
            Err(rustyline::error::ReadlineError::Interrupted) => {
                println!("CTRL-C");
                break;
            }
            Err(rustyline::error::ReadlineError::Eof) => {
                println!("CTRL-D: exiting.");
                break;
            }
            Err(e) => {
                println!("Error: {:?}", e);
                break;
            }
        }
    }
    Ok(())
}
