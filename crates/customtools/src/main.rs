//! customtools CLI entry point

// CLI binary needs to output to stderr - this is intentional
#![allow(clippy::print_stderr)]

use customtools::cli::{EXIT_CLI, EXIT_OK, parse};
use customtools::tracing::{TracingConfig, init_tracing};

#[tokio::main]
async fn main() {
    // NOTE: tracing may be unusable during a panic, so print directly.
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("Application panicked: {panic_info}");
        eprintln!("Internal error occurred. Run with RUST_LOG=debug for more information.");
    }));

    let cli = parse();
    let tracing_config = TracingConfig {
        format: cli.log_format,
        level: cli.level.into(),
        ..TracingConfig::default()
    };
    if let Err(e) = init_tracing(tracing_config) {
        eprintln!("{e:?}");
        std::process::exit(EXIT_CLI);
    }

    match customtools::run(cli).await {
        Ok(EXIT_OK) => {}
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("{:?}", miette::Report::new(e));
            std::process::exit(EXIT_CLI);
        }
    }
}
