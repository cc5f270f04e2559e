use binday::config::{
    AdminConfig, AppConfig, AuthConfig, ConfigError, DEFAULT_DELIVERY_TIMEOUT, DEFAULT_LISTEN,
    DEFAULT_SWEEP_AT, FileConfig, SweepConfig, parse_listen, parse_sweep_at, parse_utc_offset,
};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use time::UtcOffset;

#[allow(clippy::large_enum_variant)]
pub(crate) enum RunOutcome {
    Serve(AppConfig),
    Exit(i32),
}

pub(crate) fn run() -> RunOutcome {
    let cli = Cli::parse();
    if let Some(Command::Init(args)) = cli.command {
        let code = run_init(args);
        return RunOutcome::Exit(code);
    }
    if let Some(Command::AuthKey) = cli.command {
        let code = run_auth_key();
        return RunOutcome::Exit(code);
    }

    let file = match cli.config.as_deref() {
        Some(path) => match FileConfig::load(path) {
            Ok(file) => file,
            Err(err) => {
                eprintln!("error: {err}");
                return RunOutcome::Exit(2);
            }
        },
        None => FileConfig::default(),
    };

    let local_offset = UtcOffset::current_local_offset().ok();
    match resolve_config(&cli, file, local_offset) {
        Ok(config) => RunOutcome::Serve(config),
        Err(err) => {
            eprintln!("error: {err}");
            RunOutcome::Exit(2)
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "binday",
    version,
    about = "Waste collection schedules with push reminders"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
    /// TOML file with the same keys as the flags; flags win.
    #[arg(long, env = "BINDAY_CONFIG")]
    config: Option<PathBuf>,
    #[arg(long, env = "BINDAY_LISTEN")]
    listen: Option<String>,
    #[arg(long, env = "BINDAY_DATA_DIR")]
    data_dir: Option<PathBuf>,
    #[arg(long, env = "BINDAY_AUTH_KEY")]
    auth_key: Option<String>,
    #[arg(long, env = "BINDAY_VAPID_PRIVATE_KEY")]
    vapid_private_key: Option<String>,
    #[arg(long, env = "BINDAY_VAPID_PUBLIC_KEY")]
    vapid_public_key: Option<String>,
    #[arg(long, env = "BINDAY_VAPID_SUBJECT")]
    vapid_subject: Option<String>,
    /// Daily sweep time, HH:MM.
    #[arg(long, env = "BINDAY_SWEEP_AT")]
    sweep_at: Option<String>,
    /// Offset of the sweep time and calendar days, e.g. +01:00 or UTC.
    #[arg(long, env = "BINDAY_UTC_OFFSET")]
    utc_offset: Option<String>,
    /// Seconds before a single push delivery is abandoned.
    #[arg(long, env = "BINDAY_DELIVERY_TIMEOUT")]
    delivery_timeout: Option<u64>,
    #[arg(long, env = "BINDAY_ADMIN_EMAIL")]
    admin_email: Option<String>,
    #[arg(long, env = "BINDAY_ADMIN_PASSWORD")]
    admin_password: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print a fresh VAPID key pair.
    Init(InitArgs),
    /// Print a fresh token signing key.
    AuthKey,
}

#[derive(Args, Debug)]
struct InitArgs {
    #[arg(long)]
    subject: Option<String>,
}

fn run_init(args: InitArgs) -> i32 {
    let keys = match binday::generate_vapid_keys() {
        Ok(keys) => keys,
        Err(err) => {
            eprintln!("failed to generate VAPID keys: {err}");
            return 1;
        }
    };
    let (subject, show_subject_note) = match args.subject {
        Some(subject) => (subject, false),
        None => ("mailto:you@example.com".to_string(), true),
    };

    println!("VAPID keys generated.");
    println!();
    println!("BINDAY_VAPID_PRIVATE_KEY=\"{}\"", keys.private_key);
    println!("BINDAY_VAPID_PUBLIC_KEY=\"{}\"", keys.public_key);
    println!("BINDAY_VAPID_SUBJECT=\"{subject}\"");
    if show_subject_note {
        println!();
        println!("Note: replace BINDAY_VAPID_SUBJECT with a contact URI you control.");
    }
    0
}

fn run_auth_key() -> i32 {
    let secret = match binday::auth::generate_auth_key() {
        Ok(secret) => secret,
        Err(err) => {
            eprintln!("failed to generate auth key: {err}");
            return 1;
        }
    };
    println!("{secret}");
    0
}

/// Flags (and their env fallbacks) override the file; missing values take defaults.
fn resolve_config(
    cli: &Cli,
    file: FileConfig,
    local_offset: Option<UtcOffset>,
) -> Result<AppConfig, ConfigError> {
    let listen = match cli.listen.as_deref().or(file.listen.as_deref()) {
        Some(raw) => parse_listen(raw)?,
        None => parse_listen(DEFAULT_LISTEN)?,
    };

    let auth_key = cli
        .auth_key
        .clone()
        .or(file.auth_key)
        .map(|key| key.trim().to_string())
        .filter(|key| !key.is_empty())
        .ok_or(ConfigError::Missing(
            "--auth-key is required (generate one with `binday auth-key`)",
        ))?;

    let at = match cli.sweep_at.as_deref().or(file.sweep_at.as_deref()) {
        Some(raw) => parse_sweep_at(raw)?,
        None => DEFAULT_SWEEP_AT,
    };
    let utc_offset = match cli.utc_offset.as_deref().or(file.utc_offset.as_deref()) {
        Some(raw) => parse_utc_offset(raw)?,
        None => local_offset.unwrap_or(UtcOffset::UTC),
    };
    let delivery_timeout = match cli.delivery_timeout.or(file.delivery_timeout_secs) {
        Some(0) => {
            return Err(ConfigError::Invalid {
                field: "delivery-timeout",
                value: "0".to_string(),
            });
        }
        Some(secs) => Duration::from_secs(secs),
        None => DEFAULT_DELIVERY_TIMEOUT,
    };

    let admin_email = cli.admin_email.clone().or(file.admin_email);
    let admin_password = cli.admin_password.clone().or(file.admin_password);
    let admin = match (admin_email, admin_password) {
        (Some(email), Some(password)) => Some(AdminConfig { email, password }),
        (None, None) => None,
        _ => {
            return Err(ConfigError::Missing(
                "--admin-email and --admin-password must be set together",
            ));
        }
    };

    Ok(AppConfig {
        listen,
        data_dir: cli.data_dir.clone().or(file.data_dir),
        auth: AuthConfig { key: auth_key },
        vapid_private_key: cli.vapid_private_key.clone().or(file.vapid_private_key),
        vapid_public_key: cli.vapid_public_key.clone().or(file.vapid_public_key),
        vapid_subject: cli.vapid_subject.clone().or(file.vapid_subject),
        sweep: SweepConfig {
            at,
            utc_offset,
            delivery_timeout,
        },
        admin,
    })
}
