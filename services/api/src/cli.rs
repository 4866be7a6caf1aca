use crate::search::{run_search, SearchArgs};
use crate::server;
use charity_finder::error::AppError;
use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "Charity Finder",
    about = "Find, describe and rank charities near a location",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Run one discovery query and print the ranked charities
    Search(SearchArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Search(args) => run_search(args).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use charity_finder::discovery::Category;

    #[test]
    fn defaults_to_serve() {
        let cli = Cli::try_parse_from(["charity-finder-api"]).expect("parses");
        assert!(cli.command.is_none());
    }

    #[test]
    fn parses_search_arguments() {
        let cli = Cli::try_parse_from([
            "charity-finder-api",
            "search",
            "--lat",
            "40.0",
            "--lon=-73.9",
            "--category",
            "food",
            "--json",
        ])
        .expect("parses");

        match cli.command {
            Some(Command::Search(args)) => {
                assert_eq!(args.lat, 40.0);
                assert_eq!(args.lon, -73.9);
                assert_eq!(args.category, Some(Category::Food));
                assert!(args.json);
            }
            other => panic!("expected search command, got {other:?}"),
        }
    }
}
