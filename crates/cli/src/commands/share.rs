//! share command - Generate a signed download link
//!
//! Signing is local. The account is only contacted when neither a base URL
//! nor a public URL is known and the storage URL has to be looked up.

use clap::Args;
use jiff::{SignedDuration, Timestamp};
use selstore_core::model::object_url;
use selstore_core::{
    Account, Config, Error, SignOptions, SignatureDigest, parse_remote_path, sign_download_link_with,
};
use url::Url;

use super::load_account;
use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig};

/// Generate a signed download link
#[derive(Args, Debug)]
pub struct ShareArgs {
    /// Object to share: account/container/object
    pub path: String,

    /// Link lifetime, e.g. 90s, 15m, 2h, 7d (default from config)
    #[arg(short, long, value_parser = parse_duration)]
    pub expires: Option<SignedDuration>,

    /// Absolute expiry as Unix time, instead of --expires
    #[arg(long, conflicts_with = "expires")]
    pub expires_at: Option<i64>,

    /// Signing key (default: the account's temp_url_key)
    #[arg(long, env = "SELSTORE_TEMP_URL_KEY", hide_env_values = true)]
    pub key: Option<String>,

    /// Base URL the container is served under; no account lookup needed
    #[arg(long)]
    pub base_url: Option<String>,

    /// HMAC digest the service verifies with: sha1, sha256 or sha512
    #[arg(long, default_value = "sha1", value_parser = parse_digest)]
    pub digest: SignatureDigest,

    /// File name for the download
    #[arg(long)]
    pub filename: Option<String>,
}

/// Execute the share command
pub async fn execute(args: ShareArgs, config: &Config, output_config: OutputConfig) -> ExitCode {
    let formatter = Formatter::new(output_config);

    let path = match parse_remote_path(&args.path) {
        Ok(p) => p,
        Err(e) => {
            formatter.error(&format!("Invalid path: {e}"));
            return ExitCode::UsageError;
        }
    };
    let object = match path.require_object() {
        Ok(o) => o.to_string(),
        Err(e) => {
            formatter.error(&e.to_string());
            return ExitCode::UsageError;
        }
    };

    let expires = match expiry(&args, config.defaults.link_ttl_secs, Timestamp::now()) {
        Ok(t) => t,
        Err(message) => {
            formatter.error(&message);
            return ExitCode::UsageError;
        }
    };

    // Offline: key and base URL given explicitly
    let account = if args.key.is_some() && args.base_url.is_some() {
        None
    } else {
        match load_account(&path.account, &formatter) {
            Ok(a) => Some(a),
            Err(code) => return code,
        }
    };

    let Some(key) = args
        .key
        .clone()
        .or_else(|| account.as_ref().and_then(|a| a.temp_url_key.clone()))
    else {
        formatter.error(&format!(
            "No signing key. Pass --key or set temp_url_key for account '{}'",
            path.account
        ));
        return ExitCode::UsageError;
    };

    let base = match (&args.base_url, &account) {
        (Some(base), _) => Url::parse(base).map_err(Error::from),
        (None, Some(account)) => storage_base(account).await,
        (None, None) => Err(Error::Config("no base URL and no account".into())),
    };
    let url = match base.and_then(|base| object_url(&base, &path.container, &object)) {
        Ok(url) => url,
        Err(e) => return formatter.fail("Cannot build object URL", &e),
    };

    let options = SignOptions {
        digest: args.digest,
        filename: args.filename.clone(),
        ..Default::default()
    };
    match sign_download_link_with(url.as_str(), expires, &key, &options) {
        Ok(signed) => {
            if formatter.is_json() {
                formatter.json(&serde_json::json!({
                    "url": signed,
                    "expires_at": expires.to_string(),
                    "expires": expires.as_second(),
                }));
            } else {
                println!("{signed}");
            }
            ExitCode::Success
        }
        Err(e) => formatter.fail("Failed to sign link", &e),
    }
}

/// Public URL if configured, otherwise the storage URL from a fresh token
async fn storage_base(account: &Account) -> selstore_core::Result<Url> {
    if let Some(public) = &account.public_url {
        return Ok(Url::parse(public)?);
    }
    let service = selstore_swift::connect(account)?;
    let credentials = service.session().credentials().await?;
    Ok(credentials.storage_url)
}

fn expiry(args: &ShareArgs, default_ttl_secs: u64, now: Timestamp) -> Result<Timestamp, String> {
    if let Some(secs) = args.expires_at {
        return Timestamp::from_second(secs).map_err(|e| format!("Invalid --expires-at: {e}"));
    }
    let ttl = args.expires.unwrap_or_else(|| {
        SignedDuration::from_secs(i64::try_from(default_ttl_secs).unwrap_or(i64::MAX))
    });
    now.checked_add(ttl)
        .map_err(|e| format!("Invalid link lifetime: {e}"))
}

fn parse_digest(s: &str) -> Result<SignatureDigest, String> {
    s.parse().map_err(|e: Error| e.to_string())
}

/// Parse `90`, `90s`, `15m`, `2h`, `7d` or `1w`
fn parse_duration(s: &str) -> Result<SignedDuration, String> {
    let s = s.trim();
    let split = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    let (number, unit) = s.split_at(split);
    let n: i64 = number
        .parse()
        .map_err(|_| format!("invalid duration '{s}'"))?;
    let scale = match unit {
        "" | "s" => 1,
        "m" => 60,
        "h" => 3_600,
        "d" => 86_400,
        "w" => 604_800,
        other => return Err(format!("unknown duration unit '{other}' (use s, m, h, d or w)")),
    };
    n.checked_mul(scale)
        .map(SignedDuration::from_secs)
        .ok_or_else(|| format!("duration '{s}' is too large"))
}
