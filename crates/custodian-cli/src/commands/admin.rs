use anyhow::Result;
use clap::CommandFactory;
use clap_complete::generate;
use custodian_core::AppConfig;
use std::io;

use crate::output::print_json;
use crate::{Cli, CompletionsArgs};

pub(crate) fn run_config(cfg: &AppConfig, json_mode: bool) -> Result<()> {
    if json_mode {
        print_json(cfg)?;
    } else {
        println!("{}", serde_json::to_string_pretty(cfg)?);
    }
    Ok(())
}

pub(crate) fn run_completions(args: CompletionsArgs) -> Result<()> {
    let mut cmd = Cli::command();
    generate(args.shell, &mut cmd, "custodian", &mut io::stdout());
    Ok(())
}
