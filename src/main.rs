//! `scrubber` CLI: sanitizes an HTML fragment from stdin onto stdout.

use std::env;
use std::io::{self, Write};
use std::process::ExitCode;

use tracing::debug;
use tracing_subscriber::EnvFilter;

use scrubber::{Options, Sanitizer};

fn main() -> ExitCode {
    // Logs go to stderr, stdout carries the sanitized markup.
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("scrubber=warn")),
        )
        .init();

    let cli = match Cli::parse(env::args().skip(1)) {
        Ok(Command::Run(cli)) => cli,
        Ok(Command::Help) => {
            println!("{}", USAGE);
            return ExitCode::SUCCESS;
        }
        Ok(Command::Version) => {
            println!("scrubber {}", env!("CARGO_PKG_VERSION"));
            return ExitCode::SUCCESS;
        }
        Err(message) => {
            // stdout is reserved for sanitized markup.
            let _ = write_usage_error(&mut io::stderr(), &message);
            return ExitCode::from(2);
        }
    };

    debug!(?cli, "sanitizing stdin");
    let options = cli.into_options();
    let sanitizer = Sanitizer::new(&options);
    match sanitizer.sanitize_fragment(&mut io::stdin(), &mut io::stdout()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("scrubber: {}", e);
            ExitCode::FAILURE
        }
    }
}

const USAGE: &str = r#"scrubber - sanitize an HTML fragment read from stdin

USAGE:
    scrubber [OPTIONS] < input.html > output.html

OPTIONS:
    --keep-contents              Replace disallowed elements with their children
                                 instead of dropping them with their contents
    --strip-tag <TAG>            Always drop TAG with its contents (repeatable)
    --allow-id-prefix <PREFIX>   Keep ids starting with PREFIX (repeatable)
    --allow-class-prefix <PREFIX>
                                 Keep class names starting with PREFIX (repeatable)
    --link-rel <RELS>            Comma-separated rel values set on every link
    -h, --help                   Print this help
    -V, --version                Print version

Logging is controlled with RUST_LOG (default: scrubber=warn)."#;

fn write_usage_error(out: &mut impl Write, message: &str) -> io::Result<()> {
    writeln!(out, "{}\n\n{}", message, USAGE)
}

#[derive(Debug)]
enum Command {
    Run(Cli),
    Help,
    Version,
}

#[derive(Debug, Default, PartialEq)]
struct Cli {
    keep_contents: bool,
    strip_tags: Vec<String>,
    id_prefixes: Vec<String>,
    class_prefixes: Vec<String>,
    link_rels: Vec<String>,
}

impl Cli {
    fn parse(args: impl IntoIterator<Item = String>) -> Result<Command, String> {
        let mut cli = Cli::default();
        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "-h" | "--help" => return Ok(Command::Help),
                "-V" | "--version" => return Ok(Command::Version),
                "--keep-contents" => cli.keep_contents = true,
                "--strip-tag" => cli
                    .strip_tags
                    .push(value_for(&arg, args.next())?.to_ascii_uppercase()),
                "--allow-id-prefix" => cli.id_prefixes.push(value_for(&arg, args.next())?),
                "--allow-class-prefix" => cli.class_prefixes.push(value_for(&arg, args.next())?),
                "--link-rel" => cli.link_rels.extend(
                    value_for(&arg, args.next())?
                        .split(',')
                        .map(str::trim)
                        .filter(|rel| !rel.is_empty())
                        .map(String::from),
                ),
                other => return Err(format!("Unknown option: {}", other)),
            }
        }
        Ok(Command::Run(cli))
    }

    fn into_options(self) -> Options {
        let Cli {
            keep_contents,
            strip_tags,
            id_prefixes,
            class_prefixes,
            link_rels,
        } = self;

        let mut options = Options::new().remove_contents(!keep_contents);
        if !strip_tags.is_empty() {
            options = options.remove_content_tag(move |tag| strip_tags.iter().any(|t| t == tag));
        }
        if !id_prefixes.is_empty() {
            options = options
                .allow_element_id(move |id| id_prefixes.iter().any(|p| id.starts_with(p.as_str())));
        }
        if !class_prefixes.is_empty() {
            options = options.allow_class_name(move |class_name| {
                class_prefixes
                    .iter()
                    .any(|p| class_name.starts_with(p.as_str()))
            });
        }
        if !link_rels.is_empty() {
            options = options.add_link_rel(move |_| Some(link_rels.clone()));
        }
        options
    }
}

fn value_for(flag: &str, value: Option<String>) -> Result<String, String> {
    value.ok_or_else(|| format!("Missing value for {}", flag))
}
