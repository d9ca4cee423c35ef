use std::{env, io::Write, process};

use candelize::{
    output::{self, OutputFormat},
    sources::MtGox,
    Asset, Candelize, Window,
};

const USAGE: &str = "\
USAGE: candelize <database> <item> <currency> <interval-secs> [OPTIONS]

OPTIONS:
    --start <unix-secs>         Window start, also anchors bucket boundaries
    --end <unix-secs>           Window end, inclusive
    --format <csv|json|pretty>  Output format, default pretty";

struct Args {
    database: String,
    item: String,
    currency: String,
    interval: i64,
    start: Option<i64>,
    end: Option<i64>,
    format: OutputFormat,
}

fn parse_args() -> Result<Args, String> {
    let mut args = env::args().skip(1);

    let database = args.next().ok_or("Missing <database>.")?;
    let item = args.next().ok_or("Missing <item>.")?;
    let currency = args.next().ok_or("Missing <currency>.")?;
    let interval = args
        .next()
        .ok_or("Missing <interval-secs>.")?
        .parse::<i64>()
        .map_err(|err| format!("Invalid interval: {}.", err))?;

    let mut parsed = Args {
        database,
        item,
        currency,
        interval,
        start: None,
        end: None,
        format: OutputFormat::Pretty,
    };

    while let Some(flag) = args.next() {
        let value = args
            .next()
            .ok_or_else(|| format!("Missing value for {}.", flag))?;
        match flag.as_str() {
            "--start" => {
                parsed.start =
                    Some(value.parse().map_err(|err| format!("Invalid --start: {}.", err))?)
            }
            "--end" => {
                parsed.end =
                    Some(value.parse().map_err(|err| format!("Invalid --end: {}.", err))?)
            }
            "--format" => parsed.format = value.parse()?,
            other => return Err(format!("Unknown option {}.", other)),
        }
    }

    Ok(parsed)
}

async fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let source = MtGox::open(&args.database).await?;

    let series = Candelize {
        interval: args.interval,
        window: Window {
            start: args.start,
            end: args.end,
        },
    }
    .run(&source, Asset::new(&args.item), Asset::new(&args.currency))
    .await?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    match args.format {
        OutputFormat::Csv => output::write_csv(&mut out, &series)?,
        OutputFormat::Json => output::write_json(&mut out, &series)?,
        OutputFormat::Pretty => output::write_pretty(&mut out, &series)?,
    }
    out.flush()?;

    Ok(())
}

#[tokio::main]
async fn main() {
    simple_logger::SimpleLogger::new()
        .with_level(log::LevelFilter::Info)
        .with_utc_timestamps()
        .init()
        .unwrap();

    let args = match parse_args() {
        Ok(args) => args,
        Err(err) => {
            eprintln!("{}\n\n{}", err, USAGE);
            process::exit(2);
        }
    };

    if let Err(err) = run(args).await {
        eprintln!("{}", err);
        process::exit(1);
    }
}
