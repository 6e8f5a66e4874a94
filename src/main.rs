use std::env;
use std::process;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use rawk_io::input::parse_assignment;
use rawk_io::{Globals, IoConfig, IoContext, JSON_RS, Redirection, Runtime, StdStreams};

fn main() {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env())
        .init();

    let args: Vec<String> = env::args().collect();

    match run(&args[1..]) {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("rawk-io: {}", e);
            process::exit(2);
        }
    }
}

fn run(args: &[String]) -> Result<i32, Box<dyn std::error::Error>> {
    let mut config = IoConfig::default();
    let mut operands: Vec<String> = Vec::new();
    let mut variables: Vec<(String, String)> = Vec::new();
    let mut tee: Option<(Redirection, String)> = None;
    let mut print_fields = false;

    let mut i = 0;
    while i < args.len() {
        let arg = &args[i];

        if arg == "--help" || arg == "-h" {
            print_help();
            return Ok(0);
        }

        if arg == "--version" {
            println!("rawk-io {}", env!("CARGO_PKG_VERSION"));
            return Ok(0);
        }

        match arg.as_str() {
            "-F" => config.fs = option_value(args, &mut i, "-F")?,
            "-R" => config.rs = option_value(args, &mut i, "-R")?,
            "-O" => config.ofs = option_value(args, &mut i, "-O")?,
            "-v" => {
                let assignment = option_value(args, &mut i, "-v")?;
                match parse_assignment(&assignment) {
                    Some((name, value)) => variables.push((name.to_string(), value)),
                    None => return Err(format!("invalid variable assignment: {}", assignment).into()),
                }
            }
            "--json" => config.rs = JSON_RS.to_string(),
            "--fields" => print_fields = true,
            "--sandbox" => config.no_file_reads = true,
            "--tee-to" => tee = Some((Redirection::Truncate, option_value(args, &mut i, "--tee-to")?)),
            "--tee-append" => tee = Some((Redirection::Append, option_value(args, &mut i, "--tee-append")?)),
            "--tee-pipe" => tee = Some((Redirection::PipeTo, option_value(args, &mut i, "--tee-pipe")?)),
            "--" => {
                operands.extend(args[i + 1..].iter().cloned());
                break;
            }
            _ => {
                if let Some(fs) = arg.strip_prefix("-F") {
                    config.fs = fs.to_string();
                } else if arg.starts_with('-') && arg != "-" {
                    return Err(format!("unknown option: {}", arg).into());
                } else {
                    operands.push(arg.clone());
                }
            }
        }

        i += 1;
    }

    let streams = StdStreams::process(&config);
    let mut ctx = IoContext::new(config, streams)?;

    // ARGV[0] is the program name, the operands follow
    let mut argv = vec!["rawk-io".to_string()];
    argv.extend(operands);
    let mut globals = Globals::new(argv);

    for (name, value) in &variables {
        globals.set_var(name, value)?;
        ctx.settings_mut().assign_special(name, value)?;
    }

    let result = dump_records(&mut ctx, &mut globals, print_fields, tee.as_ref());
    let summary = ctx.shutdown();
    tracing::debug!(
        streams = summary.streams_closed,
        commands = summary.commands_waited,
        "shut down"
    );
    result?;

    Ok(0)
}

fn dump_records(
    ctx: &mut IoContext,
    globals: &mut Globals,
    print_fields: bool,
    tee: Option<&(Redirection, String)>,
) -> rawk_io::Result<()> {
    while ctx.next_record(globals)? {
        let line = if print_fields && !ctx.record().is_object() {
            ctx.record().fields().join(ctx.settings().config().ofs.as_str())
        } else {
            ctx.record().text().to_string()
        };
        ctx.print(&line, None)?;
        if let Some((kind, name)) = tee {
            ctx.print(&line, Some((*kind, name.as_str())))?;
        }
    }
    Ok(())
}

fn option_value(args: &[String], i: &mut usize, option: &str) -> Result<String, String> {
    *i += 1;
    args.get(*i)
        .cloned()
        .ok_or_else(|| format!("option {} requires an argument", option))
}

fn print_help() {
    println!(
        r#"Usage: rawk-io [OPTIONS] [file | var=value | -] ...

Read records the way AWK does and print them, one per line.

Options:
  -F fs              Set the field separator to fs
  -R rs              Set the record separator to rs ("" for paragraph mode)
  -O ofs             Set the output field separator
  -v var=val         Assign a variable before reading
  --json             Read newline-delimited JSON objects
  --fields           Print the fields joined by OFS instead of the record
  --tee-to file      Also write each record to file
  --tee-append file  Also append each record to file
  --tee-pipe cmd     Also pipe each record to cmd
  --sandbox          Refuse to read files named on the command line
  --version          Print version information
  --help             Print this help message

Examples:
  rawk-io -F: --fields -O, /etc/passwd
  rawk-io -R '' notes.txt
  rawk-io --json events.ndjson
  rawk-io --tee-pipe 'sort' FS=, data.csv
"#
    );
}
