use std::fs;
use std::io;

use clap::Parser;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use biodendro_cli::{BioDendroArgs, BioDendroError};

#[cfg(feature = "mimalloc")]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

/// Log to STDERR, and to `args.log_file` when one is given. The returned guard
/// must outlive all logging or the file's tail may be lost.
fn configure_log(args: &BioDendroArgs) -> Result<Option<WorkerGuard>, BioDendroError> {
    let level = if args.quiet { Level::WARN } else { Level::INFO };

    let (file_layer, guard) = match args.log_file.as_ref() {
        Some(path) => {
            let file = fs::File::create(path).map_err(BioDendroError::write_failed(path))?;
            let (writer, guard) = tracing_appender::non_blocking(file);
            let layer = fmt::layer()
                .compact()
                .with_ansi(false)
                .with_timer(fmt::time::ChronoLocal::rfc_3339())
                .with_writer(writer)
                .with_filter(
                    EnvFilter::builder()
                        .with_default_directive(Level::DEBUG.into())
                        .from_env_lossy(),
                );
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .compact()
                .with_timer(fmt::time::ChronoLocal::rfc_3339())
                .with_writer(io::stderr)
                .with_filter(
                    EnvFilter::builder()
                        .with_default_directive(level.into())
                        .from_env_lossy(),
                ),
        )
        .with(file_layer)
        .init();
    Ok(guard)
}

fn main() -> Result<(), BioDendroError> {
    let args = BioDendroArgs::parse();
    let _guard = configure_log(&args)?;
    let driver = args.load()?;
    driver.main()
}
