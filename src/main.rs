//! Datacol - typed, undoable spreadsheet columns from the command line

mod config;
mod error;

use std::env;
use std::path::PathBuf;

use anyhow::Context;
use datacol_core::{
    FormulaEvaluator, RhaiEvaluator, Selection, Settings, Table, TableSnapshot, build_evaluator,
};
use datacol_engine::{ColumnMode, FormulaValue, column_to_dynamic};
use tracing_subscriber::EnvFilter;

use crate::error::CliError;

fn print_usage() {
    eprintln!("Usage: datacol [OPTIONS] [TABLE]");
    eprintln!();
    eprintln!("Arguments:");
    eprintln!("  [TABLE]                   Table snapshot to load (.json)");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  -c, --eval <FORMULA>      Evaluate one formula (row 1, column 1) and print it");
    eprintln!("  -f, --functions <FILE>    Load custom Rhai functions (can be repeated)");
    eprintln!("  --no-default-functions    Do not load default.rhai from the config dir");
    eprintln!("  --config <FILE>           Settings file (default: datacol.toml in the config dir)");
    eprintln!("  --formula <COL>=<FORMULA> Apply a formula to every row of a column");
    eprintln!("  --rename <OLD>=<NEW>      Rename a column, rewriting formulas that use it");
    eprintln!("  --recalc                  Recalculate all formulas");
    eprintln!("  -o, --output <FILE>       Write the table here instead of stdout");
    eprintln!("  -h, --help                Print help");
    eprintln!();
    eprintln!("Set DATACOL_LOG (e.g. DATACOL_LOG=debug) for diagnostics on stderr.");
}

#[derive(Debug, Default, PartialEq)]
struct Options {
    table: Option<PathBuf>,
    eval: Option<String>,
    functions: Vec<PathBuf>,
    no_default_functions: bool,
    config: Option<PathBuf>,
    formulas: Vec<(String, String)>,
    renames: Vec<(String, String)>,
    recalc: bool,
    output: Option<PathBuf>,
    help: bool,
}

fn split_assignment(value: &str) -> error::Result<(String, String)> {
    match value.split_once('=') {
        Some((name, rest)) if !name.is_empty() => Ok((name.to_string(), rest.to_string())),
        _ => Err(CliError::BadAssignment(value.to_string())),
    }
}

fn parse_args(args: &[String]) -> error::Result<Options> {
    let mut options = Options::default();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        let mut value = |flag: &str| {
            iter.next()
                .cloned()
                .ok_or_else(|| CliError::MissingValue(flag.to_string()))
        };
        let flag = arg.as_str();
        match flag {
            "-h" | "--help" => options.help = true,
            "-c" | "--eval" => options.eval = Some(value(flag)?),
            "-f" | "--functions" => options.functions.push(PathBuf::from(value(flag)?)),
            "--no-default-functions" => options.no_default_functions = true,
            "--config" => options.config = Some(PathBuf::from(value(flag)?)),
            "--formula" => options.formulas.push(split_assignment(&value(flag)?)?),
            "--rename" => options.renames.push(split_assignment(&value(flag)?)?),
            "--recalc" => options.recalc = true,
            "-o" | "--output" => options.output = Some(PathBuf::from(value(flag)?)),
            _ if flag.starts_with('-') => return Err(CliError::UnknownOption(flag.to_string())),
            _ => {
                if options.table.is_some() {
                    return Err(CliError::UnexpectedArgument(arg.to_string()));
                }
                options.table = Some(PathBuf::from(arg));
            }
        }
    }
    Ok(options)
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("DATACOL_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    init_tracing();

    let args: Vec<String> = env::args().skip(1).collect();
    let mut options = match parse_args(&args) {
        Ok(options) => options,
        Err(e) => {
            eprintln!("Error: {}", e);
            print_usage();
            std::process::exit(1);
        }
    };
    if options.help {
        print_usage();
        return;
    }
    config::prepend_default_functions_if_present(&mut options.functions, options.no_default_functions);

    match run(options) {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

fn run(options: Options) -> anyhow::Result<i32> {
    let settings = config::load_settings(options.config.as_deref())?;
    let functions = config::read_functions(&options.functions)?;
    let mut evaluator = build_evaluator(functions.as_deref())?;

    let table = match &options.table {
        Some(path) => {
            let snapshot = TableSnapshot::load(path)
                .with_context(|| format!("Failed to load table {}", path.display()))?;
            Some(Table::from_snapshot(snapshot, settings.clone()))
        }
        None => None,
    };

    if let Some(formula) = &options.eval {
        return Ok(eval_once(&mut evaluator, table.as_ref(), &settings, formula));
    }

    let Some(mut table) = table else {
        return Err(CliError::MissingTable.into());
    };
    edit_table(&mut table, &mut evaluator, &options)?;

    let snapshot = table.snapshot();
    match &options.output {
        Some(path) => {
            snapshot
                .save(path)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            eprintln!("Wrote {}", path.display());
        }
        None => println!("{}", snapshot.to_json()?),
    }
    Ok(0)
}

/// Evaluate `formula` at row 1, column 1 and print the result. Returns the
/// exit code.
fn eval_once(evaluator: &mut RhaiEvaluator, table: Option<&Table>, settings: &Settings, formula: &str) -> i32 {
    if let Some(table) = table {
        for column in table.columns() {
            evaluator.publish_column(&column.name(), column_to_dynamic(&column.storage()));
        }
    }
    match evaluator.evaluate(formula, 0, 0) {
        Ok(FormulaValue::Number(v)) => {
            println!("{}", settings.output_filter(ColumnMode::Numeric).format_number(v));
            0
        }
        Ok(FormulaValue::Text(text)) => {
            println!("{}", text);
            0
        }
        Err(e) => {
            println!("#ERR: {}", e);
            1
        }
    }
}

fn edit_table(table: &mut Table, evaluator: &mut RhaiEvaluator, options: &Options) -> anyhow::Result<()> {
    for (old, new) in &options.renames {
        let index = column_index(table, old)?;
        table.rename_column(index, new)?;
    }
    for (name, formula) in &options.formulas {
        let index = column_index(table, name)?;
        let summary = table.apply_formula(evaluator, &Selection::columns([index]), formula);
        report_failures(name, summary.failed);
    }
    if options.recalc {
        let summary = table.recalculate(evaluator, &Selection::all());
        report_failures("table", summary.failed);
    }
    Ok(())
}

fn column_index(table: &Table, name: &str) -> anyhow::Result<usize> {
    table
        .column_by_name(name)
        .and_then(|column| table.column_index(column))
        .ok_or_else(|| datacol_core::DatacolError::UnknownColumn(name.to_string()).into())
}

fn report_failures(what: &str, failed: usize) {
    if failed > 0 {
        eprintln!("Warning: {} cell(s) in {} could not be evaluated", failed, what);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn parses_table_and_flags() {
        let options = parse_args(&args(&[
            "t.json",
            "--recalc",
            "-f",
            "a.rhai",
            "--formula",
            "y=col(\"x\", i) * 2",
            "-o",
            "out.json",
        ]))
        .unwrap();
        assert_eq!(options.table, Some(PathBuf::from("t.json")));
        assert!(options.recalc);
        assert_eq!(options.functions, vec![PathBuf::from("a.rhai")]);
        assert_eq!(
            options.formulas,
            vec![("y".to_string(), "col(\"x\", i) * 2".to_string())]
        );
        assert_eq!(options.output, Some(PathBuf::from("out.json")));
    }

    #[test]
    fn rejects_bad_invocations() {
        assert_eq!(
            parse_args(&args(&["-o"])),
            Err(CliError::MissingValue("-o".to_string()))
        );
        assert_eq!(
            parse_args(&args(&["--bogus"])),
            Err(CliError::UnknownOption("--bogus".to_string()))
        );
        assert_eq!(
            parse_args(&args(&["a.json", "b.json"])),
            Err(CliError::UnexpectedArgument("b.json".to_string()))
        );
        assert!(matches!(
            parse_args(&args(&["--rename", "nonsense"])),
            Err(CliError::BadAssignment(_))
        ));
    }
}
