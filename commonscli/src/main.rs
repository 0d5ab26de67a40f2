use anyhow::Result;
use clap::Parser;
use commonscli::{run, Cli};

fn main() -> Result<()> {
    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        log::error!("{:#}", e);
        return Err(e);
    }
    Ok(())
}
