//! Cat command
//!
//! Usage: bundlegate cat <URI|BUNDLE_ID> [--output <FILE>]

use bundlegate_core::ContentUri;
use bundlegate_engine::Gateway;
use clap::Args;
use std::fs::File;
use std::io;
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct CatArgs {
    /// `content://` URI or bare hex bundle id
    pub target: String,

    /// Output file path (default: stdout)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

fn target_uri(target: &str, authority: &str) -> Result<ContentUri, bundlegate_core::GwError> {
    if target.contains("://") {
        target.parse()
    } else {
        Ok(ContentUri::new(authority, target))
    }
}

pub fn execute(args: CatArgs, gateway: &Gateway) -> Result<(), Box<dyn std::error::Error>> {
    let uri = target_uri(&args.target, gateway.authority())?;
    let mut handle = gateway.open(&uri, "r")?;

    match args.output {
        Some(path) => {
            let mut file = File::create(&path)?;
            io::copy(&mut handle, &mut file)?;
        }
        None => {
            let stdout = io::stdout();
            let mut lock = stdout.lock();
            io::copy(&mut handle, &mut lock)?;
        }
    }
    Ok(())
}
