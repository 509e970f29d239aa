//! Account management commands
//!
//! Keys are stored in the config file and never printed.

use clap::Subcommand;
use serde::Serialize;

use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig};
use selstore_core::account::DEFAULT_AUTH_URL;
use selstore_core::path::is_valid_account_name;
use selstore_core::{Account, AccountManager, Error};

#[derive(Subcommand, Debug)]
pub enum AccountCommands {
    /// Add or update an account
    Set(SetArgs),

    /// List configured accounts
    List(ListArgs),

    /// Remove an account
    Remove(RemoveArgs),
}

#[derive(clap::Args, Debug)]
pub struct SetArgs {
    /// Account name used in paths (e.g. "main" in main/container/object)
    pub name: String,

    /// Storage user
    pub user: String,

    /// Storage key (password)
    pub key: String,

    /// v1 auth endpoint
    #[arg(long, default_value = DEFAULT_AUTH_URL)]
    pub auth_url: String,

    /// Container key used to sign download links
    #[arg(long)]
    pub temp_url_key: Option<String>,

    /// Public base URL of the account's containers
    #[arg(long)]
    pub public_url: Option<String>,

    /// Allow insecure TLS connections
    #[arg(long, default_value = "false")]
    pub insecure: bool,
}

#[derive(clap::Args, Debug)]
pub struct ListArgs {
    /// Show auth endpoint and public URL
    #[arg(short, long)]
    pub long: bool,
}

#[derive(clap::Args, Debug)]
pub struct RemoveArgs {
    pub name: String,
}

#[derive(Serialize)]
struct AccountListOutput {
    accounts: Vec<AccountInfo>,
}

/// Account information for output (without secrets)
#[derive(Serialize)]
struct AccountInfo {
    name: String,
    auth_url: String,
    user: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    public_url: Option<String>,
    can_sign: bool,
}

impl From<&Account> for AccountInfo {
    fn from(account: &Account) -> Self {
        Self {
            name: account.name.clone(),
            auth_url: account.auth_url.clone(),
            user: account.user.clone(),
            public_url: account.public_url.clone(),
            can_sign: account.temp_url_key.is_some(),
        }
    }
}

#[derive(Serialize)]
struct AccountOperationOutput {
    success: bool,
    account: String,
    message: String,
}

/// Execute an account subcommand
pub async fn execute(cmd: AccountCommands, output_config: OutputConfig) -> ExitCode {
    let formatter = Formatter::new(output_config);
    let manager = match AccountManager::new() {
        Ok(m) => m,
        Err(e) => return formatter.fail("Failed to load configuration", &e),
    };

    match cmd {
        AccountCommands::Set(args) => execute_set(args, &manager, &formatter),
        AccountCommands::List(args) => execute_list(args, &manager, &formatter),
        AccountCommands::Remove(args) => execute_remove(args, &manager, &formatter),
    }
}

fn execute_set(args: SetArgs, manager: &AccountManager, formatter: &Formatter) -> ExitCode {
    if !is_valid_account_name(&args.name) {
        formatter.error("Account name must use letters, digits, '_' or '-'");
        return ExitCode::UsageError;
    }

    if let Err(e) = url::Url::parse(&args.auth_url) {
        formatter.error(&format!("Invalid auth URL '{}': {e}", args.auth_url));
        return ExitCode::UsageError;
    }

    let mut account = Account::new(&args.name, &args.auth_url, &args.user, &args.key);
    account.temp_url_key = args.temp_url_key;
    account.public_url = args.public_url;
    account.insecure = args.insecure;

    match manager.set(account) {
        Ok(()) => {
            report(formatter, &args.name, "configured");
            ExitCode::Success
        }
        Err(e) => formatter.fail("Failed to save account", &e),
    }
}

fn execute_list(args: ListArgs, manager: &AccountManager, formatter: &Formatter) -> ExitCode {
    let accounts = match manager.list() {
        Ok(accounts) => accounts,
        Err(e) => return formatter.fail("Failed to list accounts", &e),
    };

    if formatter.is_json() {
        formatter.json(&AccountListOutput {
            accounts: accounts.iter().map(AccountInfo::from).collect(),
        });
    } else if accounts.is_empty() {
        formatter.println("No accounts configured.");
    } else {
        for account in &accounts {
            if args.long {
                formatter.println(&format!(
                    "{:<12} {:<10} {} (public: {}, signing: {})",
                    account.name,
                    account.user,
                    account.auth_url,
                    account.public_url.as_deref().unwrap_or("-"),
                    if account.temp_url_key.is_some() { "yes" } else { "no" }
                ));
            } else {
                formatter.println(&format!("{:<12} {}", account.name, account.user));
            }
        }
    }
    ExitCode::Success
}

fn execute_remove(args: RemoveArgs, manager: &AccountManager, formatter: &Formatter) -> ExitCode {
    match manager.remove(&args.name) {
        Ok(()) => {
            report(formatter, &args.name, "removed");
            ExitCode::Success
        }
        Err(Error::AccountNotFound(_)) => {
            formatter.error(&format!("Account '{}' not found", args.name));
            ExitCode::NotFound
        }
        Err(e) => formatter.fail("Failed to remove account", &e),
    }
}

fn report(formatter: &Formatter, name: &str, verb: &str) {
    let message = format!("Account '{name}' {verb} successfully");
    if formatter.is_json() {
        formatter.json(&AccountOperationOutput {
            success: true,
            account: name.to_string(),
            message,
        });
    } else {
        formatter.success(&message);
    }
}
