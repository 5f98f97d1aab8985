use jwlmerge::Console;
use jwlmerge::cli::Cli;
use jwlmerge::error::ErrorKind;
use jwlmerge::{logging, run};
use std::process::ExitCode;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse_legacy();
    logging::init(cli.verbose);

    let mut console = Console::stdout();
    match run::run(&cli, &run::executable_dir(), &mut console).await {
        Ok(_) => ExitCode::SUCCESS,
        // Already explained on the console.
        Err(err) if matches!(&*err, ErrorKind::NotEnoughArchives(_)) => ExitCode::FAILURE,
        Err(err) => {
            tracing::error!(error = ?err, "Run failed");
            console.step(format_args!("An error occurred while processing. Detail: {err}"));
            ExitCode::FAILURE
        },
    }
}
