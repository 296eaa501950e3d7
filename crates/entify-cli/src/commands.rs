use std::fs;
use std::io::{self, Write};

use anyhow::{Context, Result};
use comfy_table::Table;
use entify_model::Directive;
use tracing::{debug, info};

use entify_cli::run::{
    OutputFormat, PageRequest, RulesInput, RunOutcome, RunRequest, execute, load_options,
};

use crate::cli::{OutputFormatArg, RunArgs};
use crate::summary::apply_table_style;

pub fn run_directives() -> Result<()> {
    let mut table = Table::new();
    table.set_header(vec!["Directive", "Required", "Description"]);
    apply_table_style(&mut table);
    for directive in Directive::ALL {
        let required = if Directive::REQUIRED.contains(&directive) {
            "yes"
        } else {
            ""
        };
        table.add_row(vec![directive.as_str(), required, directive.description()]);
    }
    println!("{table}");
    Ok(())
}

pub fn run_entity(args: &RunArgs) -> Result<RunOutcome> {
    let request = build_request(args)?;
    let outcome = execute(&request)?;

    match &args.output {
        Some(path) => {
            fs::write(path, &outcome.rendered)
                .with_context(|| format!("write output {}", path.display()))?;
            info!(path = %path.display(), "wrote output");
        }
        None => {
            let mut stdout = io::stdout().lock();
            stdout
                .write_all(outcome.rendered.as_bytes())
                .context("write output to stdout")?;
            if !outcome.rendered.ends_with('\n') {
                writeln!(stdout).context("write output to stdout")?;
            }
        }
    }
    Ok(outcome)
}

fn build_request(args: &RunArgs) -> Result<RunRequest> {
    let rules = match (&args.rules, &args.rules_dir, &args.model) {
        (Some(path), _, _) => RulesInput::File(path.clone()),
        (None, Some(dir), Some(name)) => RulesInput::Model {
            dir: dir.clone(),
            name: name.clone(),
        },
        _ => anyhow::bail!("either --rules or --rules-dir with --model is required"),
    };

    let mut request = RunRequest::new(args.data.clone(), rules);
    if let Some(path) = &args.options {
        request.options = load_options(path)?;
        debug!(path = %path.display(), "loaded options file");
    }
    apply_option_flags(args, &mut request);

    request.page = args.per_page.map(|per_page| PageRequest {
        page: args.page.unwrap_or(1),
        per_page,
    });
    request.messages = args.messages.clone();
    request.format = match args.format {
        OutputFormatArg::Json => OutputFormat::Json,
        OutputFormatArg::Csv => OutputFormat::Csv,
    };
    request.pretty = args.pretty;
    Ok(request)
}

/// Flags only ever switch behavior on top of the options file.
fn apply_option_flags(args: &RunArgs, request: &mut RunRequest) {
    let options = &mut request.options;
    if args.skip_validation {
        options.set_skip_validation(true);
    }
    if args.skip_filters {
        options.set_skip_filters(true);
    }
    if args.keep_redundant {
        options.set_delete_redundant(false);
    }
    if args.continue_on_missing {
        options.set_return_if_not_exists_errors(false);
    }
    if args.stop_on_invalid {
        options.set_return_if_validation_errors(true);
    }
    for list in &args.skip_filter {
        options.skip_filter(list);
    }
}
