use clap::Parser;
use tailwind_generator::{build, handle_pipe_command, watch_build, Cli, Commands};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn init_logging(verbose: bool) {
    let default_level = if verbose {
        "tailwind_generator=debug"
    } else {
        "tailwind_generator=info"
    };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_level.into()))
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Build(args) => {
            init_logging(args.verbose);

            let outcome = if args.watch {
                watch_build(args).await
            } else {
                build(args).await.map(|result| {
                    println!("Build successful!");
                    println!("  - Processed {} files", result.total_files_processed);
                    println!("  - Generated CSS for {} classes", result.total_classes);
                })
            };

            if let Err(e) = outcome {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
            Ok(())
        }
        Commands::Pipe(args) => {
            init_logging(false);
            handle_pipe_command(args).await?;
            Ok(())
        }
    }
}
