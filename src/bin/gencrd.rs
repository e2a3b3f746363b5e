use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Parser;
use kube::CustomResourceExt;
use operator::crd::{KogitoBuild, KogitoRuntime};

#[derive(Parser, Debug)]
#[command(version, about = "Write the Kogito CustomResourceDefinitions as YAML", long_about = None)]
struct Args {
    /// Output directory
    #[arg(short, long, default_value = ".")]
    output: PathBuf,
}

fn write_crd<K: CustomResourceExt>(dir: &Path, file: &str) -> anyhow::Result<()> {
    let path = dir.join(file);
    let yaml = serde_yaml::to_string(&K::crd())?;
    std::fs::write(&path, yaml).with_context(|| format!("writing {}", path.display()))
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    std::fs::create_dir_all(&args.output)
        .with_context(|| format!("creating {}", args.output.display()))?;
    write_crd::<KogitoRuntime>(&args.output, "kogitoruntime.yaml")?;
    write_crd::<KogitoBuild>(&args.output, "kogitobuild.yaml")?;
    Ok(())
}
