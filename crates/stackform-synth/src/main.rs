//! Synthesizes a CloudFormation template from a stackform manifest.
//!
//! Run with `RUST_LOG=debug` to see how each function is planned.
//!
//! ```sh
//! cargo run -p stackform-synth -- --manifest stack.toml template
//! cargo run -p stackform-synth -- --manifest stack.toml --branch master plan
//! cargo run -p stackform-synth -- validate
//! ```
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use form::manifest::Manifest;

#[derive(Parser)]
#[command(name = "synth", about = "Render lambda stacks from a manifest")]
struct Cli {
    /// Path of the TOML manifest.
    #[arg(long, default_value = "stack.toml")]
    manifest: PathBuf,

    /// Branch being deployed. `master` publishes the `prd` alias, any other
    /// branch publishes `dta`.
    #[arg(long, env = "BRANCH_PREFIX")]
    branch: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the template JSON.
    Template {
        /// Write to this file instead of stdout.
        #[clap(long, short)]
        output: Option<PathBuf>,
    },
    /// Print the deploy order of the declared resources.
    Plan,
    /// Check that every reference in the stack resolves.
    Validate,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let contents = std::fs::read_to_string(&cli.manifest)
        .with_context(|| format!("could not read {}", cli.manifest.display()))?;
    let manifest: Manifest = contents.parse()?;
    log::debug!(
        "manifest declares {} functions and {} layers",
        manifest.functions.len(),
        manifest.layers.len()
    );
    let (stack, factory) = manifest.synthesize(cli.branch.as_deref())?;

    match cli.command {
        Command::Template { output } => {
            let template = serde_json::to_string_pretty(&stack.template()?)?;
            match output {
                Some(path) => {
                    std::fs::write(&path, template)
                        .with_context(|| format!("could not write {}", path.display()))?;
                    log::info!("wrote {}", path.display());
                }
                None => println!("{template}"),
            }
        }
        Command::Plan => {
            print!("{}", stack.get_schedule_string()?);
        }
        Command::Validate => {
            stack.validate()?;
            let mut names = factory
                .generated_functions()
                .map(|(name, generated)| format!("{name} -> {}", generated.alias.name))
                .collect::<Vec<_>>();
            names.sort();
            println!("Stack is valid.");
            for name in names {
                println!("  {name}");
            }
        }
    }
    Ok(())
}
