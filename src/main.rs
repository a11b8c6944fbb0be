use std::env;
use std::fs;
use std::time::Instant;

use anyhow::{bail, Context, Result};
use galaxy_field::{generate_galaxy, GalaxyParameters};
use log::info;

const USAGE: &str = "usage: galaxy_field [PARAMS.json] [--seed N] [--lines]";

fn main() -> Result<()> {
    env_logger::init();

    let mut params_path = None;
    let mut seed = None;
    let mut force_lines = false;

    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--seed" => {
                let value = args.next().context("--seed needs a value")?;
                seed = Some(
                    value
                        .parse::<u64>()
                        .with_context(|| format!("invalid seed {value}"))?,
                );
            }
            "--lines" => force_lines = true,
            "-h" | "--help" => {
                println!("{USAGE}");
                return Ok(());
            }
            flag if flag.starts_with('-') => bail!("unknown flag {flag}\n{USAGE}"),
            path if params_path.is_none() => params_path = Some(path.to_string()),
            extra => bail!("unexpected argument {extra}\n{USAGE}"),
        }
    }

    let mut params = match &params_path {
        Some(path) => {
            let json = fs::read_to_string(path)
                .with_context(|| format!("failed to read parameters from {path}"))?;
            GalaxyParameters::from_json(&json)
                .with_context(|| format!("failed to parse parameters in {path}"))?
        }
        None => GalaxyParameters::default(),
    };
    if let Some(seed) = seed {
        params.seed = Some(seed);
    }
    if force_lines {
        params.show_lines = true;
    }

    let started = Instant::now();
    let geometry = generate_galaxy(&params).context("galaxy generation failed")?;
    info!("generation took {:?}", started.elapsed());

    let stats = geometry.stats();
    println!("{}", serde_json::to_string_pretty(&stats)?);

    Ok(())
}
