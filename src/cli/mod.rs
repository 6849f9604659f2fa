//! Command-line interface: clap definitions and dispatch to the orchestrator.

mod clap_parser;

pub use clap_parser::{Cli, Command, FormatOpt, LookupArgs, ScorerOpt, ScoringArgs, SearchArgs};

use anyhow::{Context, Result};

use crate::orchestrator::{run_lookup, run_search};
use crate::util::envfile::write_env_template;

pub fn dispatch(cli: &Cli) -> Result<()> {
    match &cli.command {
        Command::Search(args) => {
            let cfg = args.to_app_config()?;
            let report = run_search(&cfg)?;
            if report.outcome.cancelled {
                log::warn!(
                    "Search stopped after {} of {} queries",
                    report.run.queries_processed,
                    report.run.needle_rows
                );
            }
            for p in &report.written {
                println!("{}", p.display());
            }
        }
        Command::Lookup(args) => {
            let report = run_lookup(
                &args.haystack,
                args.haystack_sheet.as_deref(),
                &args.first_name,
                &args.last_name,
                &args.dob,
                &args.scoring.options(),
            )?;
            if args.json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&report).context("serializing lookup report")?
                );
            } else {
                print!("{}", report.render());
            }
        }
        Command::EnvTemplate { path } => {
            write_env_template(path).with_context(|| format!("writing {}", path))?;
            log::info!("Wrote environment template to {}", path);
        }
    }
    Ok(())
}
