//! `bugs check` subcommand: parse a program without running it.

use std::path::Path;

use anyhow::{Context, Result};
use bugs_core::{parse_program, Program};
use clap::ArgMatches;

pub fn run(matches: &ArgMatches) -> Result<()> {
    let file = matches
        .get_one::<String>("file")
        .context("--file is required")?;
    let source = super::read_source(Path::new(file))?;

    let program =
        parse_program(&source).with_context(|| format!("{} is not a valid program", file))?;

    if !matches.get_flag("quiet") {
        print!("{}", summarize(file, &program));
    }
    Ok(())
}

fn summarize(file: &str, program: &Program) -> String {
    let globals: usize = program
        .allbugs
        .variables
        .iter()
        .map(|declaration| declaration.names.len())
        .sum();

    let mut out = format!("✓ {} parsed\n", file);
    out.push_str(&format!(
        "  Allbugs: {} variable(s), {} function(s)\n",
        globals,
        program.allbugs.functions.len()
    ));
    for bug in &program.bugs {
        out.push_str(&format!(
            "  Bug {}: {} statement(s), {} function(s)\n",
            bug.name,
            bug.body.statements.len(),
            bug.functions.len()
        ));
    }
    out
}
