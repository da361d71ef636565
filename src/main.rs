//! slugfit - Batch Slug Test Analysis
//!
//! スラグ試験データから透水係数を一括推定

// coverage_nightly cfg が設定されている場合のみ coverage_attribute を有効化
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

use anyhow::Result;
use clap::Parser;

use slugfit::adapter::config::Config;
use slugfit::driver::{Args, SlugAnalysisWorkflow};

#[cfg_attr(coverage_nightly, coverage(off))]
#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let args = Args::parse();

    // Load configuration
    let config = Config::load(&args.config)?;

    // Create workflow with injected dependencies
    let mut workflow = SlugAnalysisWorkflow::new(config);

    workflow.execute(args).await?;
    Ok(())
}
