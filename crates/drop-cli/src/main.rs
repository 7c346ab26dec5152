use clap::{CommandFactory, Parser};
use drop_cli::cli::Cli;
use drop_cli::logging::LogConfig;
use drop_cli::{Console, Dispatcher, Locator, XSelection};
use drop_core::Result;
use drop_storage::{BackendRegistry, StoreConfig};
use std::io;
use std::process::ExitCode;
use tracing::warn;

fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut log_config = LogConfig::for_verbosity(cli.verbose);
    if let Some(path) = &cli.log_file {
        log_config = log_config.with_both(path);
    }
    let _guard = match log_config.init() {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("drop: {}", e);
            None
        }
    };

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let Some(operation) = cli.operation() else {
        Cli::command().print_help()?;
        return Ok(());
    };

    let registry = BackendRegistry::default();
    let path = Locator::from_env(cli.file).locate(&registry)?;
    let mut store = registry.open(&path, &StoreConfig::default())?;

    let result = {
        let stdin = io::stdin();
        let mut lines = Console::new(stdin.lock(), io::stdout());
        let (mut out, mut err) = (io::stdout(), io::stderr());
        let mut selections = XSelection;

        let mut dispatcher = Dispatcher::new(
            store.as_mut(),
            &mut out,
            &mut err,
            &mut lines,
            &mut selections,
        );
        dispatcher.run(operation)
    };

    if let Err(e) = store.close() {
        warn!(path = %path.display(), error = %e, "close failed");
        eprintln!("Error closing database. Continuing: {}", e);
    }
    result
}
