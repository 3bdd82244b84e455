#![forbid(unsafe_code)]

mod config;

use std::{
    env, fs,
    io::{self, Read, Write},
    path::{Path, PathBuf},
};

use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, NamedSource, WrapErr};
use sharpc_lex::{Category, Token};
use sharpc_parse::{ConvertConfig, ConvertError, LineEnding, convert_with_tokens};
use tracing::debug;

#[derive(Parser, Debug)]
#[command(name = "sharpc", version, about = "Converts sharp surface syntax to C#")]
struct Cli {
    /// Log conversion progress to stderr (same as `RUST_LOG=debug`).
    #[arg(long, short, global = true)]
    verbose: bool,

    /// Spaces per indentation level. Overrides `sharpc.toml`.
    #[arg(long, global = true)]
    indent_width: Option<usize>,

    /// Output line ending. Overrides `sharpc.toml`.
    #[arg(long, value_enum, global = true)]
    line_ending: Option<LineEndingArg>,

    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum LineEndingArg {
    Crlf,
    Lf,
}

impl From<LineEndingArg> for LineEnding {
    fn from(arg: LineEndingArg) -> Self {
        match arg {
            LineEndingArg::Crlf => LineEnding::CrLf,
            LineEndingArg::Lf => LineEnding::Lf,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Convert a source file and print or write the C# output
    Convert {
        /// Input file, or `-` for stdin
        #[arg(default_value = "-")]
        path: PathBuf,

        /// Write the output here instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Print the annotated token table of a source file
    Tokens {
        /// Input file, or `-` for stdin
        #[arg(default_value = "-")]
        path: PathBuf,
    },

    /// Check that a source file converts, without printing the output
    Check {
        /// Input file, or `-` for stdin
        #[arg(default_value = "-")]
        path: PathBuf,
    },
}

struct Input {
    name: String,
    text: String,
    /// Directory searched for `sharpc.toml`.
    dir: PathBuf,
}

impl Input {
    fn read(path: &Path) -> miette::Result<Self> {
        if path == Path::new("-") {
            let mut text = String::new();
            io::stdin()
                .read_to_string(&mut text)
                .into_diagnostic()
                .wrap_err("failed to read stdin")?;
            let dir = env::current_dir().into_diagnostic()?;
            return Ok(Self {
                name: "<stdin>".to_string(),
                text,
                dir,
            });
        }

        let text = fs::read_to_string(path)
            .into_diagnostic()
            .wrap_err_with(|| format!("failed to read {}", display_path(path)))?;
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => env::current_dir().into_diagnostic()?,
        };
        Ok(Self {
            name: display_path(path),
            text,
            dir,
        })
    }

    fn report(&self, err: ConvertError) -> miette::Report {
        let source = NamedSource::new(self.name.clone(), self.text.clone());
        miette::Report::new(err).with_source_code(source)
    }
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter = if verbose {
        EnvFilter::new("debug")
    } else if env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        return;
    };
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_writer(io::stderr))
        .with(filter)
        .init();
}

fn resolve_config(cli: &Cli, input: &Input) -> miette::Result<ConvertConfig> {
    let (mut config, origin) = config::load_config(&input.dir)?;
    if let Some(origin) = origin {
        debug!(path = %origin.display(), "loaded config");
    }
    if let Some(width) = cli.indent_width {
        if width == 0 {
            return Err(miette::miette!("--indent-width must be at least 1"));
        }
        config.indent_width = width;
    }
    if let Some(ending) = cli.line_ending {
        config.line_ending = ending.into();
    }
    Ok(config)
}

/// One line of the `tokens` table: span, category, kind and text.
fn token_row(token: &Token) -> String {
    let kind = token
        .kind()
        .map(|k| k.to_string())
        .unwrap_or_else(|| "-".to_string());
    format!(
        "{:>5}..{:<5} {:<16} {:<36} {:?}",
        token.start,
        token.end,
        token.category.as_str(),
        kind,
        token.text
    )
}

fn main() -> miette::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match &cli.cmd {
        Cmd::Convert { path, output } => {
            let input = Input::read(path)?;
            let config = resolve_config(&cli, &input)?;
            let conversion =
                convert_with_tokens(&input.text, &config).map_err(|e| input.report(e))?;
            match output {
                Some(out) => fs::write(out, &conversion.output)
                    .into_diagnostic()
                    .wrap_err_with(|| format!("failed to write {}", display_path(out)))?,
                None => {
                    let mut stdout = io::stdout().lock();
                    stdout.write_all(conversion.output.as_bytes()).into_diagnostic()?;
                    stdout.flush().into_diagnostic()?;
                }
            }
            Ok(())
        }
        Cmd::Tokens { path } => {
            let input = Input::read(path)?;
            let config = resolve_config(&cli, &input)?;
            let conversion =
                convert_with_tokens(&input.text, &config).map_err(|e| input.report(e))?;
            let mut stdout = io::stdout().lock();
            let rows = conversion
                .tokens
                .iter()
                .filter(|t| !matches!(t.category, Category::Space | Category::LineBreak));
            for token in rows {
                writeln!(stdout, "{}", token_row(token)).into_diagnostic()?;
            }
            Ok(())
        }
        Cmd::Check { path } => {
            let input = Input::read(path)?;
            let config = resolve_config(&cli, &input)?;
            convert_with_tokens(&input.text, &config).map_err(|e| input.report(e))?;
            println!("{}: ok", input.name);
            Ok(())
        }
    }
}

fn display_path(p: &Path) -> String {
    p.to_string_lossy().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use pretty_assertions::assert_eq;
    use sharpc_lex::Lexer;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn global_overrides_parse_after_subcommand() {
        let cli = Cli::parse_from([
            "sharpc",
            "convert",
            "in.sharp",
            "--line-ending",
            "lf",
            "-o",
            "out.cs",
        ]);
        assert_eq!(cli.line_ending, Some(LineEndingArg::Lf));
        let Cmd::Convert { path, output } = cli.cmd else {
            panic!("expected convert");
        };
        assert_eq!(path, PathBuf::from("in.sharp"));
        assert_eq!(output, Some(PathBuf::from("out.cs")));
    }

    #[test]
    fn unannotated_token_row_shows_dash() {
        let tokens = Lexer::new("total").lex().unwrap();
        assert_eq!(
            token_row(&tokens[0]),
            format!("{:>5}..{:<5} {:<16} {:<36} {:?}", 0, 5, "identifier", "-", "total")
        );
    }
}
