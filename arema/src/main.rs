mod timetable;
mod watch;

use std::sync::Arc;

use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;

use arema_core::config;
use arema_core::config::Config;
use arema_core::error::Error;
use arema_core::tracing_ext::init_tracing;

#[derive(Parser)]
#[command(author, version, about)]
struct CommandLine {
    /// Path to a configuration file in a YAML format.
    ///
    /// The AREMA_CONFIG environment variable is used if this option is not
    /// specified.  Its value has to be an absolute path.  Defaults are used
    /// when neither is specified.
    #[arg(short, long, env = "AREMA_CONFIG")]
    config: Option<String>,

    /// Logging format.
    #[arg(long, env = "AREMA_LOG_FORMAT", value_enum, default_value = "text")]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    Timetable(timetable::CommandLine),
    Watch(watch::CommandLine),
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

impl LogFormat {
    fn as_str(&self) -> &'static str {
        match self {
            LogFormat::Text => "text",
            LogFormat::Json => "json",
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    let cl = CommandLine::parse();

    init_tracing(cl.log_format.as_str());

    let config = match cl.config {
        Some(ref path) => config::load(path),
        None => Arc::new(Config::default()),
    };

    match cl.command {
        Command::Timetable(ref cl) => timetable::main(config, cl).await,
        Command::Watch(ref cl) => watch::main(config, cl).await,
    }
}

// </coverage:exclude>
