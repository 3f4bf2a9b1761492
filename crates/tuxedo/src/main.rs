use std::env;
use std::io::{self, BufRead, Write};
use std::process::ExitCode;
use std::rc::Rc;

use editor::{HttpBackend, RetainedCanvas};
use tracing::{error, info};

mod bootstrap;
mod commands;
mod shell;

use bootstrap::{init_tracing, load_config, parse_args, usage_text};
use shell::{LineOutcome, Shell};

fn main() -> ExitCode {
    let args = env::args().skip(1).collect::<Vec<_>>();
    let cli = match parse_args(&args) {
        Ok(cli) => cli,
        Err(message) => {
            eprintln!("{message}\n\n{}", usage_text());
            return ExitCode::from(2);
        }
    };
    if cli.show_help {
        println!("{}", usage_text());
        return ExitCode::SUCCESS;
    }

    init_tracing();
    info!("=== Tuxedo Startup ===");
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            error!(error = %message, "startup_failed");
            ExitCode::from(1)
        }
    }
}

fn run(cli: &bootstrap::CliArgs) -> Result<(), String> {
    let config = load_config(cli)?;
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|error| format!("failed to start runtime: {error}"))?;

    let backend = Rc::new(HttpBackend::new(&config.server).map_err(|error| error.to_string())?);
    let canvas = RetainedCanvas::with_source(backend.clone());
    let mut shell = Shell::new(config, canvas, backend.clone(), backend);

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    for line in stdin.lock().lines() {
        let line = line.map_err(|error| format!("failed to read stdin: {error}"))?;
        match runtime.block_on(shell.run_line(&line)) {
            LineOutcome::Continue(output) => {
                for text in output {
                    writeln!(stdout, "{text}").map_err(|error| error.to_string())?;
                }
                stdout.flush().map_err(|error| error.to_string())?;
            }
            LineOutcome::Quit => break,
        }
    }
    info!("shell_exited");
    Ok(())
}
