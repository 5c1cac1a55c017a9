use access_scanner::cli::{Args, OutputFormat};
use access_scanner::config::ScanConfig;
use access_scanner::report::{ConsoleReporter, JsonReporter, Reporter};
use access_scanner::{logging, prompt, scan, ScanError, Selection};
use clap::Parser;
use colored::Colorize;
use std::io;
use tracing::warn;

#[tokio::main]
async fn main() {
    let args = Args::parse();

    if let Err(e) = logging::init_tracing(&args.log_level) {
        eprintln!("warning: {}", e);
    }

    // The scan itself is blocking; race it against Ctrl-C so an interrupt
    // ends the process even mid-file or while waiting on the prompt.
    let task = tokio::task::spawn_blocking(move || run(args));
    let interrupted = async {
        if tokio::signal::ctrl_c().await.is_err() {
            warn!("could not install Ctrl-C handler");
            std::future::pending::<()>().await;
        }
    };

    let code = tokio::select! {
        joined = task => match joined {
            Ok(Ok(())) => 0,
            Ok(Err(e)) => {
                report_error(&e);
                e.exit_code()
            }
            Err(e) => {
                eprintln!("{} scan task failed: {}", "error:".red().bold(), e);
                1
            }
        },
        _ = interrupted => {
            let e = ScanError::Interrupted;
            eprintln!("\n{}", e);
            e.exit_code()
        }
    };

    std::process::exit(code);
}

fn run(args: Args) -> Result<(), ScanError> {
    let mut config = match &args.config {
        Some(path) => ScanConfig::from_file(path)?,
        None => ScanConfig::default(),
    };
    args.apply_to(&mut config);

    let selection = args.selection();
    if selection == Selection::All && !args.yes {
        let mut input = io::stdin().lock();
        let mut out = io::stdout();
        if !prompt::confirm(&mut input, &mut out, prompt::DUPLICATES_WARNING)? {
            return Ok(());
        }
    }

    let reporter: Box<dyn Reporter> = match args.format {
        OutputFormat::Text => Box::new(ConsoleReporter::stdout()),
        OutputFormat::Json => Box::new(JsonReporter::new(io::stdout())),
    };

    let (outcome, _) = scan::run_scan(&config, selection, reporter)?;
    if outcome.skipped > 0 {
        warn!(skipped = outcome.skipped, "some log entries were malformed and not checked");
    }
    Ok(())
}

fn report_error(e: &ScanError) {
    match e {
        ScanError::Load { .. } => eprintln!(
            "{} {}. Ensure the file exists and try again.",
            "error:".red().bold(),
            e
        ),
        _ => eprintln!("{} {}", "error:".red().bold(), e),
    }
}
