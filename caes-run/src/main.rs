//! # CAES cavern run
//!
//! ```sh
//! cargo run -p caes-run --release -- demos/kamioka/run.toml
//! ```
//!
//! Set `RUST_LOG=debug` to log every iteration.

use std::{env, path::PathBuf};

use anyhow::{Result, bail};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut args = env::args_os().skip(1);
    let (Some(path), None) = (args.next(), args.next()) else {
        bail!("usage: caes-run <run.toml>");
    };

    let report = caes_run::run(&PathBuf::from(path))?;
    println!("{report}");

    Ok(())
}
