use log::{trace, warn};
use route_progress::cli::Cli;
use route_progress::{config_file, Config};
use simplelog::{TermLogger, TerminalMode};
use std::fs::File;
use structopt::StructOpt;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let opt = Cli::from_args();

    // missing config is fine, every tunable has a default, but the replay
    // command will refuse to run without a configured routing service
    let config = match File::open(config_file()) {
        Ok(mut fp) => Config::load(&mut fp)?,
        Err(e) => {
            let config = Config::default();
            TermLogger::init(
                opt.verbosity(config.log_level()),
                simplelog::Config::default(),
                TerminalMode::Mixed,
            )?;
            warn!("could not open config file {:?}: {}", config_file(), e);
            return opt.execute_subcommand(config);
        }
    };

    TermLogger::init(
        opt.verbosity(config.log_level()),
        simplelog::Config::default(),
        TerminalMode::Mixed,
    )?;
    trace!("loaded configuration from {:?}", config_file());

    opt.execute_subcommand(config)
}
