use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

use inbox_texter::app::{Paths, RunOptions, RunOutcome, run};
use inbox_texter::auth::FileTokenStore;
use inbox_texter::sms::SendResult;

#[derive(Parser)]
#[command(name = "inbox_texter")]
#[command(about = "Search Gmail and text yourself how many messages match", long_about = None)]
struct Cli {
    /// Keyword(s) to search for
    #[arg(short = 'q', long = "query", alias = "q", default_value = "", allow_hyphen_values = true)]
    query: String,

    /// Phone number to text
    #[arg(long, default_value = "", allow_hyphen_values = true)]
    phone: String,

    /// Gmail user id
    #[arg(long, default_value = "me")]
    user: String,

    /// Include a snippet of every matching message
    #[arg(long)]
    previews: bool,

    /// Exit non-zero when Twilio rejects the message
    #[arg(long)]
    fail_on_send_error: bool,

    #[arg(long, default_value = "config.json")]
    config: PathBuf,

    /// OAuth client secret file from the Google Cloud console
    #[arg(long, default_value = "credentials.json")]
    credentials: PathBuf,

    #[arg(long, default_value = "token.json")]
    token: PathBuf,
}

/// Options that consume the following argument as their value.
const VALUE_FLAGS: &[&str] = &[
    "-q", "--q", "--query", "--phone", "--user", "--config", "--credentials", "--token",
];

/// Accept the single-dash `-phone` spelling older scripts use. Only arguments
/// in flag position are rewritten, so `-q -phone` still searches for "-phone".
fn legacy_flags(args: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut out = Vec::new();
    let mut takes_value = false;
    let mut positional_only = false;

    for a in args {
        if takes_value || positional_only {
            takes_value = false;
            out.push(a);
            continue;
        }

        let a = match a.strip_prefix("-phone") {
            Some(rest) if rest.is_empty() || rest.starts_with('=') => format!("--phone{rest}"),
            _ => a,
        };
        positional_only = a == "--";
        takes_value = VALUE_FLAGS.contains(&a.as_str());
        out.push(a);
    }
    out
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse_from(legacy_flags(std::env::args()));

    let opts = RunOptions {
        query: cli.query,
        phone: cli.phone,
        user: cli.user,
        include_previews: cli.previews,
        fail_on_send_error: cli.fail_on_send_error,
        paths: Paths {
            config: cli.config,
            credentials: cli.credentials,
            token: cli.token,
        },
    };

    let store = FileTokenStore::new(opts.paths.token.clone());
    let mut input = std::io::stdin().lock();
    let mut output = std::io::stdout();

    let outcome = run(&opts, &store, &mut input, &mut output)
        .with_context(|| format!("search for \"{}\" failed", opts.query))?;

    match outcome {
        RunOutcome::NoMatches => log::info!("No matching messages; nothing sent"),
        RunOutcome::Sent {
            matches,
            result: SendResult::Accepted { .. },
        } => log::info!("Sent summary of {matches} messages to {}", opts.phone),
        RunOutcome::Sent { .. } => log::warn!("Summary was not delivered"),
        RunOutcome::SendFailed { reason, .. } => log::warn!("Summary was not delivered: {reason}"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn rewrites_single_dash_phone() {
        assert_eq!(
            legacy_flags(args(&["bin", "-q", "invoice", "-phone", "+1555"])),
            args(&["bin", "-q", "invoice", "--phone", "+1555"])
        );
        assert_eq!(legacy_flags(args(&["-phone=+1"])), args(&["--phone=+1"]));
        assert_eq!(legacy_flags(args(&["-phones"])), args(&["-phones"]));
    }

    #[test]
    fn leaves_option_values_alone() {
        assert_eq!(
            legacy_flags(args(&["bin", "-q", "-phone", "-phone", "+1"])),
            args(&["bin", "-q", "-phone", "--phone", "+1"])
        );

        let cli = Cli::parse_from(legacy_flags(args(&["bin", "-q", "-phone", "-phone", "+1"])));
        assert_eq!(cli.query, "-phone");
        assert_eq!(cli.phone, "+1");
    }

    #[test]
    fn accepts_double_dash_q() {
        let cli = Cli::parse_from(legacy_flags(args(&["bin", "--q", "invoice"])));
        assert_eq!(cli.query, "invoice");
    }

    #[test]
    fn parses_defaults() {
        let cli = Cli::parse_from(legacy_flags(args(&["bin", "-q", "rent", "-phone", "+1"])));
        assert_eq!(cli.query, "rent");
        assert_eq!(cli.phone, "+1");
        assert_eq!(cli.user, "me");
        assert!(!cli.previews);
        assert_eq!(cli.token, PathBuf::from("token.json"));
    }
}
