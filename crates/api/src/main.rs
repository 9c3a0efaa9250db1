use std::io::{BufRead, Write};
use std::path::Path;

use anyhow::Context;

use lendledger_api::app::App;
use lendledger_api::app::seed::{SEED_FILE_ENV, Seed};
use lendledger_infra::config::CirculationConfig;

fn main() -> anyhow::Result<()> {
    lendledger_observability::init();

    let config = CirculationConfig::from_env()?;
    let seed = match std::env::var_os(SEED_FILE_ENV) {
        Some(path) if !path.is_empty() => Some(
            Seed::from_file(Path::new(&path))
                .with_context(|| format!("{SEED_FILE_ENV} is set but could not be loaded"))?,
        ),
        _ => None,
    };
    let app = App::build(config, seed.as_ref())?;

    tracing::info!("reading requests from stdin");

    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout().lock();
    for line in stdin.lock().lines() {
        let line = line.context("reading request")?;
        if line.trim().is_empty() {
            continue;
        }
        writeln!(stdout, "{}", app.handle_line(&line)).context("writing response")?;
        stdout.flush().context("writing response")?;
    }

    tracing::info!("stdin closed; shutting down");
    Ok(())
}
