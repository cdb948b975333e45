mod cmd;
mod exit;
mod logging;
mod output;

use clap::Parser;

use crate::cmd::{Command, ConnectArgs};
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "tsnd", version, about = "TSND151 motion sensor CLI")]
struct Cli {
    #[command(flatten)]
    connect: ConnectArgs,

    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(long, value_name = "LEVEL", default_value = "info", global = true)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    let result = cmd::run(cli.command, &cli.connect, format);

    match result {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_port_after_subcommand() {
        let cli = Cli::try_parse_from(["tsnd", "mode", "--port", "/dev/rfcomm0"])
            .expect("mode args should parse");
        assert!(matches!(cli.command, Command::Mode));
        assert_eq!(cli.connect.port.as_deref(), Some("/dev/rfcomm0"));
        assert_eq!(cli.connect.baud, tsnd_transport::DEFAULT_BAUD_RATE);
    }

    #[test]
    fn parses_sampling_lists() {
        let cli = Cli::try_parse_from([
            "tsnd",
            "--port",
            "COM3",
            "configure",
            "--acc-gyro",
            "10,1,0",
            "--overwrite-protection",
            "true",
            "--option-button",
            "start-stop",
        ])
        .expect("configure args should parse");

        let Command::Configure(args) = cli.command else {
            panic!("expected configure");
        };
        assert_eq!(args.acc_gyro, Some(vec![10, 1, 0]));
        assert_eq!(args.overwrite_protection, Some(true));
        assert!(args.option_button.is_some());
    }

    #[test]
    fn parses_record_flags() {
        let cli = Cli::try_parse_from(["tsnd", "record", "--force", "--count", "100"])
            .expect("record args should parse");
        let Command::Record(args) = cli.command else {
            panic!("expected record");
        };
        assert!(args.force);
        assert_eq!(args.count, Some(100));
        assert!(!args.keep_recording);
    }

    #[test]
    fn download_requires_an_index() {
        let err = Cli::try_parse_from(["tsnd", "download"]).expect_err("index is required");
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }
}
