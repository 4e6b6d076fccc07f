use hrm_console::args::TopLevelCmd;
use hrm_console::console::render_outcome;
use hrm_console::errors::AppError;
use hrm_console::panic_handler::initialize_panic_handler;

use std::process::ExitCode;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> color_eyre::Result<ExitCode> {
    initialize_panic_handler()?;
    let arg_config: TopLevelCmd = argh::from_env();

    let parent_token = CancellationToken::new();
    let ctrl_c_token = parent_token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c_token.cancel();
        }
    });

    let exit_code = match hrm_console::run(arg_config, parent_token).await {
        Ok(end) => {
            print_lines(render_outcome(&Ok(end)));
            ExitCode::SUCCESS
        }
        Err(AppError::Session(e)) => {
            print_lines(render_outcome(&Err(e)));
            ExitCode::FAILURE
        }
        Err(e) => {
            println!("\nTop-level error: {e}");
            ExitCode::FAILURE
        }
    };

    Ok(exit_code)
}

fn print_lines(lines: Vec<String>) {
    for line in lines {
        println!("{line}");
    }
}
