use clap::{
    builder::{
        styling::{AnsiColor, Effects, Styles},
        ValueParser,
    },
    Arg, ColorChoice, Command,
};

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

pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    Command::new("identigo")
        .about("Account identity and session service")
        .version(env!("CARGO_PKG_VERSION"))
        .color(ColorChoice::Auto)
        .styles(styles)
        .arg(
            Arg::new("port")
                .short('p')
                .long("port")
                .help("Port to listen on")
                .default_value("8080")
                .env("IDENTIGO_PORT")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new("dsn")
                .short('d')
                .long("dsn")
                .help("Database connection string")
                .env("IDENTIGO_DSN")
                .required(true),
        )
        .arg(
            Arg::new("worker-id")
                .long("worker-id")
                .help("Id generator worker id, must be unique per instance [0-31]")
                .default_value("0")
                .env("IDENTIGO_WORKER_ID")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new("datacenter-id")
                .long("datacenter-id")
                .help("Id generator datacenter id, must be unique per site [0-31]")
                .default_value("0")
                .env("IDENTIGO_DATACENTER_ID")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new("admin-secret")
                .long("admin-secret")
                .help("Secret for the default admin account created on an empty database")
                .default_value("admin123")
                .env("IDENTIGO_ADMIN_SECRET")
                .hide_env_values(true),
        )
        .arg(
            Arg::new("verbosity")
                .short('v')
                .long("verbose")
                .help("Verbosity level: ERROR, WARN, INFO, DEBUG, TRACE (default: ERROR)")
                .env("IDENTIGO_LOG_LEVEL")
                .global(true)
                .action(clap::ArgAction::Count)
                .value_parser(validator_log_level()),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new() {
        let command = new();

        assert_eq!(command.get_name(), "identigo");
        assert_eq!(
            command.get_about().unwrap().to_string(),
            "Account identity and session service"
        );
        assert_eq!(
            command.get_version().unwrap().to_string(),
            env!("CARGO_PKG_VERSION")
        );
    }

    #[test]
    fn test_check_port_and_dsn() {
        temp_env::with_vars(
            [
                ("IDENTIGO_WORKER_ID", None::<&str>),
                ("IDENTIGO_DATACENTER_ID", None),
            ],
            || {
                let matches = new().get_matches_from(vec![
                    "identigo",
                    "--dsn",
                    "postgres://user@localhost:5432/identigo",
                    "--port",
                    "8081",
                ]);

                assert_eq!(matches.get_one::<u16>("port").copied(), Some(8081));
                assert_eq!(
                    matches.get_one::<String>("dsn").map(String::as_str),
                    Some("postgres://user@localhost:5432/identigo")
                );
                // Generator ids fall back to 0 so a single instance needs no flags.
                assert_eq!(matches.get_one::<u64>("worker-id").copied(), Some(0));
                assert_eq!(matches.get_one::<u64>("datacenter-id").copied(), Some(0));
            },
        );
    }

    #[test]
    fn test_env_fallbacks() {
        temp_env::with_vars(
            [
                ("IDENTIGO_DSN", Some("postgres://env@localhost/identigo")),
                ("IDENTIGO_WORKER_ID", Some("3")),
                ("IDENTIGO_DATACENTER_ID", Some("7")),
            ],
            || {
                let matches = new().get_matches_from(vec!["identigo"]);
                assert_eq!(
                    matches.get_one::<String>("dsn").map(String::as_str),
                    Some("postgres://env@localhost/identigo")
                );
                assert_eq!(matches.get_one::<u64>("worker-id").copied(), Some(3));
                assert_eq!(matches.get_one::<u64>("datacenter-id").copied(), Some(7));
            },
        );
    }
}
