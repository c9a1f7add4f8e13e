//! Punto de entrada ("driver").
//!
//! Este módulo orquesta las diferentes fases del proceso de
//! traducción y expone una CLI.

use anyhow::{self, bail, Context};
use clap::{self, crate_version, Arg, Command};
use cosmos::{
    link::{BuildOptions, Compiler, DEFAULT_COMPILER},
    TranslateError,
};

use log::{LevelFilter, Log, Metadata, Record};
use std::{
    env,
    fs::{self, File},
    io::{self, BufWriter, Write},
};

fn main() -> anyhow::Result<()> {
    // Parsing de CLI
    let args = Command::new("CosmosCode compiler")
        .version(crate_version!())
        .arg(
            Arg::new("input")
                .required(true)
                .value_name("FILE")
                .help("Source file"),
        )
        .arg(
            Arg::new("emit")
                .long("emit")
                .value_name("KIND")
                .takes_value(true)
                .default_value("exe")
                .possible_values(["tokens", "ast", "c", "exe"])
                .help("Kind of output to produce"),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .takes_value(true)
                .value_name("FILE")
                .help("Output file ('-' for stdout, except executables)"),
        )
        .arg(
            Arg::new("cc")
                .long("cc")
                .takes_value(true)
                .value_name("COMMAND")
                .help("C compiler used to build executables [default: $CC or cc]"),
        )
        .arg(Arg::new("strip").short('s').help("Strip executables"))
        .arg(Arg::new("optimize").short('O').help("Optimize executables"))
        .arg(
            Arg::new("verbose")
                .short('v')
                .multiple_occurrences(true)
                .help("Increase logging verbosity"),
        )
        .get_matches();

    init_logging(args.occurrences_of("verbose"))?;

    // Se extraen argumentos necesarios
    let input = args.value_of("input").context("No input file")?;
    let emit = args.value_of("emit").unwrap_or("exe");
    let output = args.value_of("output");

    let text =
        fs::read_to_string(input).with_context(|| format!("Failed to read: {}", input))?;

    match (emit, output) {
        // Volcados de depuración de las fases delanteras
        ("tokens", output) => {
            let tokens = cosmos::tokenize(&text, input).map_err(|error| report(input, error))?;
            write_all(output, format!("{:#?}\n", tokens).as_bytes())?;
        }

        ("ast", output) => {
            let ast = cosmos::parse_source(&text, input).map_err(|error| report(input, error))?;
            write_all(output, format!("{:#?}\n", ast).as_bytes())?;
        }

        // Salida de código C, sin compilar
        ("c", output) => {
            let code = cosmos::translate(&text, input).map_err(|error| report(input, error))?;
            write_all(output, code.as_bytes())?;
        }

        // Salida a stdout con compilación
        (_, Some("-")) => bail!("Refusing to write executable to stdout"),

        // Salida a archivo con compilación
        (_, output) => {
            let code = cosmos::translate(&text, input).map_err(|error| report(input, error))?;
            let path = output.unwrap_or("a.out");

            let compiler = args
                .value_of("cc")
                .map(String::from)
                .or_else(|| env::var("CC").ok())
                .unwrap_or_else(|| String::from(DEFAULT_COMPILER));

            let mut options = BuildOptions::empty();
            if args.is_present("strip") {
                options |= BuildOptions::STRIP;
            }

            if args.is_present("optimize") {
                options |= BuildOptions::OPTIMIZE;
            }

            let mut cc = Compiler::spawn(&compiler, &path, options)
                .with_context(|| format!("Failed to start C compiler: {}", compiler))?;

            cc.stdin()
                .write_all(code.as_bytes())
                .context("Failed to send generated code to C compiler")?;

            cc.finish()
                .with_context(|| format!("Failed to generate executable: {}", path))?;
        }
    };

    Ok(())
}

/// Muestra el diagnóstico completo y lo reduce a un error de alto nivel.
fn report(input: &str, error: TranslateError) -> anyhow::Error {
    eprint!("{}", error.diagnostics());
    anyhow::anyhow!("Failed to translate {}", input)
}

/// Escribe a un archivo o a stdout si la ruta es `-` o no existe.
fn write_all(output: Option<&str>, contents: &[u8]) -> anyhow::Result<()> {
    match output {
        None | Some("-") => {
            let stdout = io::stdout();
            let mut stdout = stdout.lock();

            stdout.write_all(contents).context("Failed to emit to stdout")?;
            stdout.flush().context("Failed to emit to stdout")?;
        }

        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to open for writing: {}", path))?;

            let mut file = BufWriter::new(file);
            file.write_all(contents)
                .and_then(|()| file.flush())
                .with_context(|| format!("Failed to emit to file: {}", path))?;
        }
    }

    Ok(())
}

/// Bitácora mínima hacia stderr.
struct StderrLogger;

static LOGGER: StderrLogger = StderrLogger;

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record<'_>) {
        if self.enabled(record.metadata()) {
            eprintln!("[{}] {}", record.level(), record.args());
        }
    }

    fn flush(&self) {}
}

fn init_logging(verbosity: u64) -> anyhow::Result<()> {
    let level = match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };

    log::set_logger(&LOGGER)?;
    log::set_max_level(level);

    Ok(())
}
