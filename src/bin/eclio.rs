use std::io::{self, Write};
use std::path::PathBuf;

use anyhow as ah;
use env_logger::{Builder, Env};
use serde::Serialize;
use structopt::StructOpt;

use eclipse_io::{EGrid, EclFile, ESmry};

#[derive(StructOpt)]
#[structopt(
    name = "eclio",
    about = "Inspect Eclipse-format grid (EGRID) and summary (SMSPEC/UNSMRY) files."
)]
struct Opt {
    #[structopt(subcommand)]
    cmd: Command,
}

#[derive(StructOpt)]
enum Command {
    /// List every record in a binary or formatted container file.
    List {
        #[structopt(parse(from_os_str))]
        input: PathBuf,
    },
    /// Print grid dimensions and active cell count from an EGRID file.
    GridInfo {
        #[structopt(parse(from_os_str))]
        input: PathBuf,
    },
    /// Print every resolved summary key and its unit, as JSON.
    Keys {
        #[structopt(parse(from_os_str))]
        input: PathBuf,
    },
    /// Write a summary run's vectors to CSV on stdout.
    ToCsv {
        #[structopt(parse(from_os_str))]
        input: PathBuf,
    },
    /// Build the compact derived ESMRY file for a single (non-restarted) run.
    MakeEsmry {
        #[structopt(parse(from_os_str))]
        input: PathBuf,
        #[structopt(parse(from_os_str), short, long)]
        output: Option<PathBuf>,
    },
}

fn init_logger() {
    let env = Env::default()
        .filter_or("ECLIO_LOG_LEVEL", "info")
        .write_style_or("ECLIO_LOG_STYLE", "auto");

    let mut builder = Builder::from_env(env);
    builder
        .format(|buf, record| writeln!(buf, "[{} - {}] {}", record.level(), record.target(), record.args()))
        .init();
}

#[derive(Serialize)]
struct KeyEntry<'a> {
    key: &'a str,
    unit: Option<&'a str>,
}

fn cmd_list(input: PathBuf) -> ah::Result<()> {
    let file = EclFile::open(&input)?;
    for (name, kind, count) in file.list() {
        println!("{:<8} {:?}[{}]", name, kind, count);
    }
    Ok(())
}

fn cmd_grid_info(input: PathBuf) -> ah::Result<()> {
    let grid = EGrid::open(&input)?;
    let (nx, ny, nz) = grid.nijk();
    println!("dimensions: {} x {} x {}", nx, ny, nz);
    println!("reservoirs: {}", grid.numres());
    println!("radial: {}", grid.is_radial());
    println!("active cells: {}", grid.nactive());
    if !grid.lgr_names().is_empty() {
        println!("LGRs: {}", grid.lgr_names().join(", "));
    }
    Ok(())
}

fn cmd_keys(input: PathBuf) -> ah::Result<()> {
    let smry = ESmry::open(&input)?;
    let entries: Vec<KeyEntry> = smry
        .keys()
        .iter()
        .map(|k| KeyEntry {
            key: k.as_str(),
            unit: smry.unit(k),
        })
        .collect();
    serde_json::to_writer_pretty(io::stdout(), &entries)?;
    println!();
    Ok(())
}

fn cmd_to_csv(input: PathBuf) -> ah::Result<()> {
    let mut smry = ESmry::open(&input)?;
    smry.load_all()?;
    let keys = smry.keys().to_vec();

    let mut wtr = csv::Writer::from_writer(io::stdout());
    wtr.write_record(&keys)?;
    wtr.write_record(keys.iter().map(|k| smry.unit(k).unwrap_or("").to_string()))?;

    for step in 0..smry.num_time_steps() {
        let mut row = Vec::with_capacity(keys.len());
        for k in &keys {
            let v = smry.get(k)?[step];
            row.push(v.to_string());
        }
        wtr.write_record(&row)?;
    }
    wtr.flush()?;
    Ok(())
}

fn cmd_make_esmry(input: PathBuf, output: Option<PathBuf>) -> ah::Result<()> {
    let mut smry = ESmry::open(&input)?;
    let output = output.unwrap_or_else(|| input.with_extension("ESMRY"));
    if smry.make_esmry_file(&output)? {
        log::info!("wrote {}", output.display());
    } else {
        log::warn!("{} already exists, nothing written", output.display());
    }
    Ok(())
}

fn main() -> ah::Result<()> {
    init_logger();
    let opt = Opt::from_args();
    match opt.cmd {
        Command::List { input } => cmd_list(input),
        Command::GridInfo { input } => cmd_grid_info(input),
        Command::Keys { input } => cmd_keys(input),
        Command::ToCsv { input } => cmd_to_csv(input),
        Command::MakeEsmry { input, output } => cmd_make_esmry(input, output),
    }
}
