use clap::Parser;
use pagegrab::cli::{self, App};
use pagegrab::prelude::*;
use pagegrab::Pipeline;
use std::process::ExitCode;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    env_logger::init();
    color_eyre::install()?;

    let app = App::parse();
    cli::announce(&app);

    // Returning, rather than exiting, lets the runtime wait for a browser
    // still rendering after a deadline so it can be dropped and killed.
    match cli::execute(&Pipeline::default(), &app).await {
        Ok(result) => {
            cli::output(&result, app.json)?;
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            cli::report_error(&err, app.json)?;
            Ok(ExitCode::FAILURE)
        }
    }
}
