use std::{env, io};

use emb_converter::{Args, rank_from_env, run};
use log::{error, info};

fn main() -> io::Result<()> {
    env_logger::init();

    if let Err(e) = try_main() {
        error!("{e}");
        return Err(e.into());
    }

    Ok(())
}

fn try_main() -> emb_converter::Result<()> {
    let args = Args::parse(env::args_os())?;
    let rank = rank_from_env()?;

    let stats = run(&args, rank)?;
    info!(files = stats.files, records = stats.records; "conversion finished");
    Ok(())
}
