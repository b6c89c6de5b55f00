//! Insert command
//!
//! Usage: bundlegate insert [--path <FILE>] [--manifest <FILE>] [--name <NAME>] ...

use bundlegate_core::InsertRequest;
use bundlegate_core_types::{RequestContext, Sensitive};
use bundlegate_engine::Gateway;
use bundlegate_store::AddOptions;
use clap::Args;
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct InsertArgs {
    /// Payload file
    #[arg(long)]
    pub path: Option<PathBuf>,

    /// Existing manifest to start from
    #[arg(long)]
    pub manifest: Option<PathBuf>,

    /// Author subscriber id (hex); pass "" to publish without an author
    #[arg(long)]
    pub author: Option<String>,

    #[arg(long)]
    pub version: Option<u64>,

    /// Date in milliseconds since the epoch
    #[arg(long)]
    pub date: Option<i64>,

    /// File name recorded in the manifest
    #[arg(long)]
    pub name: Option<String>,

    /// Write the store's canonical manifest here after adding
    #[arg(long)]
    pub save_manifest: Option<PathBuf>,

    /// Bundle secret for updating a bundle this identity did not create
    #[arg(long, env = "BUNDLEGATE_BUNDLE_SECRET", hide_env_values = true)]
    pub secret: Option<String>,
}

pub fn execute(args: InsertArgs, gateway: &Gateway) -> Result<(), Box<dyn std::error::Error>> {
    let request = InsertRequest {
        payload_path: args.path,
        manifest_path: args.manifest,
        author: args.author,
        version: args.version,
        date_millis: args.date,
        name: args.name,
        save_manifest_path: args.save_manifest,
    };
    let options = args.secret.map(|secret| AddOptions {
        bundle_secret: Some(Sensitive::new(secret)),
    });

    let uri = gateway.insert_with_context(&RequestContext::new(), &request, options.as_ref())?;
    println!("{}", uri);
    Ok(())
}
