mod cli;
mod commands;
mod env_loader;
mod error;
mod logging;
mod rollover;
mod store;

use crate::error::RolloverError;

fn main() {
    env_loader::load_dotenv();
    logging::init();

    if let Err(err) = cli::run() {
        let code = err
            .downcast_ref::<RolloverError>()
            .map_or("E000_UNCLASSIFIED", |e| e.code().as_str());
        log::error!("stage=exit status=failed code={code}");
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
