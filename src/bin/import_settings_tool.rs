use kestrel_import_settings::cli::{run, ToolArgs};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "kestrel_import_settings=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = match ToolArgs::parse_from_env() {
        Ok(args) => args,
        Err(err) => {
            eprintln!("[cli] {err}");
            std::process::exit(2);
        }
    };
    match run(&args) {
        Ok(output) => print!("{output}"),
        Err(err) => {
            tracing::error!("import_settings_tool failed: {err:?}");
            std::process::exit(1);
        }
    }
}
