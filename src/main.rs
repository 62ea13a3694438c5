use clap::{ArgAction, Parser};
use prefork_web::{limits::ServerLimits, Server, Site};
use std::{
    net::{IpAddr, Ipv4Addr, SocketAddr},
    path::PathBuf,
    process::ExitCode,
};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Preforking static file and `/calc` server.
#[derive(Parser, Debug)]
#[command(name = "prefork-web", version, about, disable_help_flag = true)]
struct Cli {
    /// Address to listen on (`localhost` means 127.0.0.1)
    #[arg(short = 'h', long, default_value = "127.0.0.1", value_parser = parse_host)]
    host: IpAddr,

    /// TCP port
    #[arg(short, long, default_value_t = 11777)]
    port: u16,

    /// Static root directory
    #[arg(short, long, default_value_os_t = std::env::temp_dir())]
    directory: PathBuf,

    /// Number of worker processes
    #[arg(short, long, default_value_t = num_cpus::get(), value_parser = parse_workers)]
    workers: usize,

    /// Print help
    #[arg(long, action = ArgAction::Help)]
    help: Option<bool>,
}

fn parse_host(value: &str) -> Result<IpAddr, String> {
    match value {
        "localhost" => Ok(IpAddr::V4(Ipv4Addr::LOCALHOST)),
        other => other
            .parse()
            .map_err(|_| format!("`{other}` is not an IP address")),
    }
}

fn parse_workers(value: &str) -> Result<usize, String> {
    match value.parse::<usize>() {
        Ok(0) => Err(String::from("at least one worker is required")),
        Ok(n) => Ok(n),
        Err(err) => Err(err.to_string()),
    }
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "prefork_web=info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let addr = SocketAddr::new(cli.host, cli.port);
    info!(
        %addr,
        directory = %cli.directory.display(),
        workers = cli.workers,
        "prefork-web v{} starting",
        env!("CARGO_PKG_VERSION")
    );

    let listener = match Server::bind(addr) {
        Ok(listener) => listener,
        Err(err) => {
            error!(%addr, error = %err, "cannot listen");
            return ExitCode::FAILURE;
        }
    };

    let launched = Server::builder()
        .listener(listener)
        .handler(Site::directory(&cli.directory))
        .server_limits(ServerLimits {
            worker_count: cli.workers,
            ..ServerLimits::default()
        })
        .build()
        .launch();

    match launched {
        Ok(()) => {
            info!("shutdown complete");
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!(error = %err, "server stopped");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cli = Cli::try_parse_from(["prefork-web"]).unwrap();

        assert_eq!(cli.host, IpAddr::V4(Ipv4Addr::LOCALHOST));
        assert_eq!(cli.port, 11777);
        assert_eq!(cli.directory, std::env::temp_dir());
        assert_eq!(cli.workers, num_cpus::get());
    }

    #[test]
    fn short_flags() {
        let cli = Cli::try_parse_from([
            "prefork-web", "-h", "localhost", "-p", "8080", "-d", "/srv", "-w", "3",
        ])
        .unwrap();

        assert_eq!(cli.host, IpAddr::V4(Ipv4Addr::LOCALHOST));
        assert_eq!(cli.port, 8080);
        assert_eq!(cli.directory, PathBuf::from("/srv"));
        assert_eq!(cli.workers, 3);
    }

    #[test]
    fn rejects_bad_values() {
        #[rustfmt::skip]
        let cases: [&[&str]; 4] = [
            &["prefork-web", "-h", "example.invalid"],
            &["prefork-web", "-w", "0"],
            &["prefork-web", "-p", "70000"],
            &["prefork-web", "--bogus"],
        ];

        for args in cases {
            assert!(Cli::try_parse_from(args).is_err(), "{args:?}");
        }
    }

    #[test]
    fn help_is_long_only() {
        let err = Cli::try_parse_from(["prefork-web", "--help"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
    }
}
