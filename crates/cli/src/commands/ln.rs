//! ln command - Create a symlink object

use clap::Args;
use jiff::Timestamp;
use selstore_core::{SymLink, SymLinkType, parse_remote_path};

use super::load_account;
use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig};

/// Create a symlink pointing at an object of the same container
#[derive(Args, Debug)]
pub struct LnArgs {
    /// The link to create: account/container/link
    pub link: String,

    /// Object the link points to, relative to the container
    pub target: String,

    /// Link works for a single download only
    #[arg(long)]
    pub onetime: bool,

    /// Unix time after which the service deletes the link
    #[arg(long)]
    pub delete_at: Option<i64>,

    /// Password required to follow the link
    #[arg(long)]
    pub password: Option<String>,

    /// Content-Disposition served with the target (e.g. "attachment")
    #[arg(long)]
    pub disposition: Option<String>,
}

/// Execute the ln command
pub async fn execute(args: LnArgs, output_config: OutputConfig) -> ExitCode {
    let formatter = Formatter::new(output_config);

    let path = match parse_remote_path(&args.link) {
        Ok(p) => p,
        Err(e) => {
            formatter.error(&format!("Invalid link path: {e}"));
            return ExitCode::UsageError;
        }
    };
    let name = match path.require_object() {
        Ok(name) => name.to_string(),
        Err(e) => {
            formatter.error(&e.to_string());
            return ExitCode::UsageError;
        }
    };

    let link = match build_link(&name, &args) {
        Ok(link) => link,
        Err(message) => {
            formatter.error(&message);
            return ExitCode::UsageError;
        }
    };

    let account = match load_account(&path.account, &formatter) {
        Ok(a) => a,
        Err(code) => return code,
    };
    let container = match selstore_swift::container(&account, &path.container) {
        Ok(c) => c,
        Err(e) => return formatter.fail("Invalid public URL", &e),
    };
    let service = match selstore_swift::connect(&account) {
        Ok(s) => s,
        Err(e) => return formatter.fail("Failed to create client", &e),
    };

    match service.create_symlink(&container, &link).await {
        Ok(()) => {
            if formatter.is_json() {
                formatter.json(&serde_json::json!({
                    "status": "success",
                    "link": path.to_string(),
                    "location": link.location(&container),
                    "type": link.content_type(),
                }));
            } else {
                formatter.success(&format!("{path} -> {}", link.location(&container)));
            }
            ExitCode::Success
        }
        Err(e) => formatter.fail(&format!("Failed to create {path}"), &e),
    }
}

fn build_link(name: &str, args: &LnArgs) -> Result<SymLink, String> {
    let link_type = if args.onetime {
        SymLinkType::OneTime
    } else {
        SymLinkType::Permanent
    };
    let mut link = SymLink::new(name, args.target.trim_start_matches('/'), link_type);

    if let Some(secs) = args.delete_at {
        let at = Timestamp::from_second(secs).map_err(|e| format!("Invalid --delete-at: {e}"))?;
        link = link.with_delete_at(at);
    }
    if let Some(password) = &args.password {
        link = link.with_password(password);
    }
    if let Some(disposition) = &args.disposition {
        link = link.with_content_disposition(disposition);
    }
    Ok(link)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(target: &str) -> LnArgs {
        LnArgs {
            link: "main/c/l".into(),
            target: target.into(),
            onetime: false,
            delete_at: None,
            password: None,
            disposition: None,
        }
    }

    #[test]
    fn test_build_permanent_link() {
        let link = build_link("l", &args("/docs/a.pdf")).unwrap();
        assert_eq!(link.target(), "docs/a.pdf");
        assert_eq!(link.link_type(), SymLinkType::Permanent);
        assert!(link.delete_at().is_none());
    }

    #[test]
    fn test_build_onetime_secure_link() {
        let mut a = args("a.pdf");
        a.onetime = true;
        a.password = Some("pw".into());
        a.delete_at = Some(1_700_000_000);

        let link = build_link("l", &a).unwrap();
        assert_eq!(link.content_type(), "x-storage/onetime-symlink+secure");
        assert_eq!(link.delete_at().map(|t| t.as_second()), Some(1_700_000_000));
    }

    #[test]
    fn test_invalid_delete_at() {
        let mut a = args("a.pdf");
        a.delete_at = Some(i64::MAX);
        assert!(build_link("l", &a).is_err());
    }
}
