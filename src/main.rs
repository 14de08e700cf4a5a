use bmkg::{
    run::{run, today},
    Config,
};
use tracing_subscriber::{fmt, EnvFilter};

fn main() -> miette::Result<()> {
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_writer(std::io::stderr)
        .init();

    let config = Config::default();
    let mut stdout = std::io::stdout().lock();
    run(&config, today(), &mut stdout)?;
    Ok(())
}
