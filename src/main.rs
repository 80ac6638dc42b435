use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use lexopt::prelude::*;
use log::LevelFilter;
use miette::{IntoDiagnostic, Result, WrapErr};
use simplelog::{ColorChoice, Config, TermLogger, TerminalMode};
use textfsm_clitable::records_to_table;
use textfsm_core::{Template, TextFsm};
use textfsm_table::FormatOptions;

const USAGE: &str =
    "usage: textfsm [--json | --format] [--loglevel LEVEL] TEMPLATE [INPUT [EXPECTED]]";

#[derive(Debug)]
struct Args {
    json: bool,
    format: bool,
    loglevel: Option<String>,
    template: PathBuf,
    input: Option<PathBuf>,
    expected: Option<PathBuf>,
}

fn parse_args() -> Result<Args, lexopt::Error> {
    let mut json = false;
    let mut format = false;
    let mut loglevel = None;
    let mut positional: Vec<PathBuf> = Vec::new();

    let mut parser = lexopt::Parser::from_env();
    while let Some(arg) = parser.next()? {
        match arg {
            Short('j') | Long("json") => json = true,
            Short('f') | Long("format") => format = true,
            Long("loglevel") => loglevel = Some(parser.value()?.string()?),
            Short('h') | Long("help") => {
                println!("{USAGE}");
                std::process::exit(0);
            }
            Value(value) if positional.len() < 3 => positional.push(value.into()),
            _ => return Err(arg.unexpected()),
        }
    }

    let mut positional = positional.into_iter();
    let template = positional
        .next()
        .ok_or_else(|| lexopt::Error::Custom("missing TEMPLATE argument".into()))?;
    Ok(Args {
        json,
        format,
        loglevel,
        template,
        input: positional.next(),
        expected: positional.next(),
    })
}

fn init_logger(level: Option<&str>) {
    let level = match level {
        Some("error") => LevelFilter::Error,
        Some("info") => LevelFilter::Info,
        Some("debug") => LevelFilter::Debug,
        Some("trace") => LevelFilter::Trace,
        _ => LevelFilter::Warn,
    };
    let _ = TermLogger::init(
        level,
        Config::default(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    );
}

fn run(args: &Args) -> Result<ExitCode> {
    let source = fs::read_to_string(&args.template)
        .into_diagnostic()
        .wrap_err_with(|| format!("cannot read template '{}'", args.template.display()))?;
    let template = Template::parse(&source).into_diagnostic()?;
    println!("FSM Template:");
    print!("{template}");
    println!();

    let Some(input) = &args.input else {
        return Ok(ExitCode::SUCCESS);
    };
    let data = fs::read_to_string(input)
        .into_diagnostic()
        .wrap_err_with(|| format!("cannot read input '{}'", input.display()))?;

    let mut fsm = TextFsm::new(template);
    let rendered = if args.json {
        let records = fsm.parse_text_to_dicts(&data, true).into_diagnostic()?;
        let mut out = serde_json::to_string_pretty(&records).into_diagnostic()?;
        out.push('\n');
        out
    } else {
        let records = fsm.parse_text(&data, true).into_diagnostic()?;
        let table = records_to_table(&fsm.header(), &records).into_diagnostic()?;
        if args.format {
            table.formatted(&FormatOptions::new()).into_diagnostic()?
        } else {
            table.to_string()
        }
    };

    println!("FSM Table:");
    print!("{rendered}");

    // The third argument is a golden copy to verify against.
    if let Some(expected) = &args.expected {
        let want = fs::read_to_string(expected)
            .into_diagnostic()
            .wrap_err_with(|| format!("cannot read expected output '{}'", expected.display()))?;
        if want != rendered {
            println!("Data mis-match!");
            return Ok(ExitCode::FAILURE);
        }
        println!("Data match!");
    }

    Ok(ExitCode::SUCCESS)
}

fn main() -> ExitCode {
    let args = match parse_args() {
        Ok(args) => args,
        Err(err) => {
            eprintln!("{err}");
            eprintln!("{USAGE}");
            return ExitCode::from(2);
        }
    };
    init_logger(args.loglevel.as_deref());

    match run(&args) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:?}");
            ExitCode::from(2)
        }
    }
}
