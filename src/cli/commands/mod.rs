use clap::{
    builder::{
        styling::{AnsiColor, Effects, Styles},
        ValueParser,
    },
    Arg, ColorChoice, Command,
};
use url::Url;

pub const ARG_VERBOSITY: &str = "verbosity";

const MIN_SESSION_SECRET_LEN: usize = 32;

pub fn validator_log_level() -> ValueParser {
    ValueParser::from(move |level: &str| -> std::result::Result<u8, String> {
        if let Ok(parsed) = level.parse::<u8>() {
            // Successfully parsed as a number
            if parsed <= 5 {
                return Ok(parsed);
            }
        }

        match level.to_lowercase().as_str() {
            "error" => Ok(0),
            "warn" => Ok(1),
            "info" => Ok(2),
            "debug" => Ok(3),
            "trace" => Ok(4),
            _ => Err("invalid log level".to_string()),
        }
    })
}

pub fn validator_url() -> ValueParser {
    ValueParser::from(move |value: &str| -> std::result::Result<String, String> {
        let url = Url::parse(value).map_err(|e| format!("invalid URL: {e}"))?;
        match url.scheme() {
            "http" | "https" => Ok(value.to_string()),
            scheme => Err(format!("unsupported URL scheme: {scheme}")),
        }
    })
}

pub fn validator_session_secret() -> ValueParser {
    ValueParser::from(move |value: &str| -> std::result::Result<String, String> {
        if value.len() < MIN_SESSION_SECRET_LEN {
            return Err(format!(
                "session secret must be at least {MIN_SESSION_SECRET_LEN} bytes"
            ));
        }
        Ok(value.to_string())
    })
}

pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    Command::new("oauthgate")
        .about("OAuth2 login gateway")
        .version(env!("CARGO_PKG_VERSION"))
        .color(ColorChoice::Auto)
        .styles(styles)
        .arg(
            Arg::new("port")
                .short('p')
                .long("port")
                .help("Port to listen on")
                .default_value("3000")
                .env("OAUTHGATE_PORT")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new("client-id")
                .long("client-id")
                .help("OAuth2 client id issued by the identity provider")
                .env("OAUTHGATE_CLIENT_ID")
                .required(true),
        )
        .arg(
            Arg::new("client-secret")
                .long("client-secret")
                .help("OAuth2 client secret issued by the identity provider")
                .env("OAUTHGATE_CLIENT_SECRET")
                .hide_env_values(true)
                .required(true),
        )
        .arg(
            Arg::new("callback-url")
                .long("callback-url")
                .help("Callback URL registered with the identity provider")
                .default_value("http://localhost:3000/auth/google/callback")
                .env("OAUTHGATE_CALLBACK_URL")
                .value_parser(validator_url()),
        )
        .arg(
            Arg::new("session-secret")
                .long("session-secret")
                .help("Secret used to sign session cookies (at least 32 bytes)")
                .env("OAUTHGATE_SESSION_SECRET")
                .hide_env_values(true)
                .required(true)
                .value_parser(validator_session_secret()),
        )
        .arg(
            Arg::new("state-ttl")
                .long("state-ttl")
                .help("Seconds a login attempt may take before its state token expires")
                .default_value("600")
                .env("OAUTHGATE_STATE_TTL_SECONDS")
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
        .arg(
            Arg::new("state-sweep-interval")
                .long("state-sweep-interval")
                .help("Seconds between sweeps of expired state tokens")
                .default_value("60")
                .env("OAUTHGATE_STATE_SWEEP_SECONDS")
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
        .arg(
            Arg::new("session-ttl")
                .long("session-ttl")
                .help("Session lifetime in seconds")
                .default_value("43200")
                .env("OAUTHGATE_SESSION_TTL_SECONDS")
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
        .arg(
            Arg::new(ARG_VERBOSITY)
                .short('v')
                .long("verbose")
                .help("Verbosity level: ERROR, WARN, INFO, DEBUG, TRACE (default: ERROR)")
                .env("OAUTHGATE_LOG_LEVEL")
                .global(true)
                .action(clap::ArgAction::Count)
                .value_parser(validator_log_level()),
        )
}
