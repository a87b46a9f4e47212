use clap::{ArgAction, Parser as ClapParser};
use std::{io, path::PathBuf, process};

mod driver;

use driver::{EX_IOERR, Options};

#[derive(ClapParser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Script to check; stdin when omitted or `-`
    #[arg(help = "The .lox script to resolve")]
    script: Option<PathBuf>,

    /// Print the binding table after a successful run
    #[arg(long, help = "Print `line:column name -> distance` per reference")]
    bindings: bool,

    /// Print the parsed statements before resolving
    #[arg(long, help = "Dump the AST")]
    dump_ast: bool,

    /// Raise log verbosity; repeat for more
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn init_logging(verbose: u8) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    match verbose {
        0 => {}
        1 => {
            builder.filter_level(log::LevelFilter::Info);
        }
        2 => {
            builder.filter_level(log::LevelFilter::Debug);
        }
        _ => {
            builder.filter_level(log::LevelFilter::Trace);
        }
    }
    builder.init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let source = match driver::read_source(cli.script.as_deref()) {
        Ok(source) => source,
        Err(err) => {
            let name = cli
                .script
                .as_ref()
                .map_or_else(|| "<stdin>".to_string(), |path| path.display().to_string());
            eprintln!("failed to read {name}: {err}");
            process::exit(EX_IOERR);
        }
    };

    let options = Options {
        bindings: cli.bindings,
        dump_ast: cli.dump_ast,
    };
    let stdout = io::stdout();
    if let Err(err) = driver::run(&source, options, &mut stdout.lock()) {
        eprintln!("{err}");
        process::exit(err.exit_code());
    }
}
