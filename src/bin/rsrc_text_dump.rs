use anyhow::{Context, Result, bail, format_err};
use clap::{Arg, ArgAction, ArgGroup, ArgMatches, Command};
use dialoguer::Confirm;
use indoc::indoc;

use encoding::all::encodings;
use encoding::Encoding;
use rsrc_text::{
    ExtractSettings, Extractor, IndirectString, OutputFormat, RecordWriter, ResourceKind,
};
use simplelog::{ColorChoice, Config, LevelFilter, TermLogger, TerminalMode};

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

enum Mode {
    Extract {
        input: PathBuf,
        kind: ResourceKind,
        format: OutputFormat,
    },
    Indirect(IndirectString),
}

struct RsrcTextDump {
    mode: Mode,
    settings: ExtractSettings,
    output: Box<dyn Write>,
    verbosity_level: LevelFilter,
}

impl RsrcTextDump {
    pub fn from_cli_matches(matches: &ArgMatches) -> Result<Self> {
        let language = matches.get_one::<u16>("lang").copied();

        let num_threads = matches.get_one::<usize>("num-threads").copied().unwrap_or(0);
        let num_threads = match (cfg!(feature = "multithreading"), num_threads) {
            (true, number) => number,
            (false, 0 | 1) => 1,
            (false, _) => {
                eprintln!(
                    "turned on threads, but library was compiled without `multithreading` feature! using fallback sync decoding"
                );
                1
            }
        };

        let codec_name = matches
            .get_one::<String>("ansi-codec")
            .map(String::as_str)
            .unwrap_or("windows-1252");
        let ansi_codec = *encodings()
            .iter()
            .find(|c| c.name() == codec_name)
            .ok_or_else(|| format_err!("Unknown ANSI codec `{}`", codec_name))?;

        let verbosity_level = match matches.get_count("verbose") {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Info,
            2 => LevelFilter::Debug,
            3 => LevelFilter::Trace,
            _ => {
                eprintln!("using more than -vvv does not affect verbosity level");
                LevelFilter::Trace
            }
        };

        let kind = if matches.get_flag("strings") {
            Some(ResourceKind::Strings)
        } else if matches.get_flag("dialogs") {
            Some(ResourceKind::Dialogs)
        } else if matches.get_flag("messages") {
            Some(ResourceKind::Messages)
        } else if matches.get_flag("menus") {
            Some(ResourceKind::Menus)
        } else {
            None
        };

        let mode = match (matches.get_one::<String>("indirect"), kind) {
            (Some(reference), _) => Mode::Indirect(
                reference
                    .parse::<IndirectString>()
                    .with_context(|| format!("Invalid indirect string `{}`", reference))?,
            ),
            (None, Some(kind)) => {
                let input = matches
                    .get_one::<String>("INPUT")
                    .map(PathBuf::from)
                    .context("Resource file not specified.")?;
                let format = matches
                    .get_one::<String>("output-format")
                    .map(|s| s.parse::<OutputFormat>())
                    .transpose()
                    .map_err(|e| format_err!(e))?
                    .unwrap_or_default();
                Mode::Extract {
                    input,
                    kind,
                    format,
                }
            }
            (None, None) => bail!("Must pick one of -s, -d, -m, or -n."),
        };

        let output: Box<dyn Write> = if let Some(path) = matches.get_one::<String>("output-target") {
            let file = Self::create_output_file(path, !matches.get_flag("no-confirm-overwrite"))
                .with_context(|| {
                    format!("An error occurred while creating output file at `{}`", path)
                })?;
            Box::new(BufWriter::new(file))
        } else {
            Box::new(BufWriter::new(io::stdout()))
        };

        Ok(RsrcTextDump {
            mode,
            settings: ExtractSettings::new()
                .kind(kind.unwrap_or(ResourceKind::Strings))
                .language(language)
                .ansi_codec(ansi_codec)
                .num_threads(num_threads),
            output,
            verbosity_level,
        })
    }

    /// Main entry point for `RsrcTextDump`
    pub fn run(&mut self) -> Result<()> {
        self.try_to_initialize_logging();

        match &self.mode {
            Mode::Indirect(reference) => {
                let text = reference
                    .resolve(self.settings.get_language())
                    .with_context(|| format!("Failed to resolve `{}`", reference))?;
                writeln!(self.output, "{}", text)?;
                self.output.flush()?;
                Ok(())
            }
            Mode::Extract {
                input,
                kind,
                format,
            } => {
                let extractor = Extractor::new(self.settings.clone());
                let extraction = extractor.extract_from_path(input).with_context(|| {
                    format!("Cannot load resource file {}", input.display())
                })?;

                let mut writer = RecordWriter::new(&mut self.output, *kind, *format);
                writer.write_header()?;
                for record in &extraction.records {
                    writer.write_record(record)?;
                }
                writer.flush()?;

                if !extraction.failures.is_empty() {
                    for failure in &extraction.failures {
                        eprintln!("{}", failure);
                    }
                    bail!(
                        "{} {} resource(s) could not be decoded",
                        extraction.failures.len(),
                        kind
                    );
                }
                Ok(())
            }
        }
    }

    /// If `prompt` is passed, will display a confirmation prompt before overwriting files.
    fn create_output_file(path: impl AsRef<Path>, prompt: bool) -> Result<File> {
        let p = path.as_ref();

        if p.is_dir() {
            bail!(
                "There is a directory at {}, refusing to overwrite",
                p.display()
            );
        }

        if p.exists() {
            if prompt {
                match Confirm::new()
                    .with_prompt(format!(
                        "Are you sure you want to override output file at {}",
                        p.display()
                    ))
                    .default(false)
                    .interact()
                {
                    Ok(true) => Ok(File::create(p)?),
                    Ok(false) => bail!("Cancelled"),
                    Err(e) => bail!(
                        "Failed to write confirmation prompt to term caused by\n{}",
                        e
                    ),
                }
            } else {
                Ok(File::create(p)?)
            }
        } else {
            // Ok to assume p is not an existing directory
            match p.parent() {
                Some(parent) if !parent.as_os_str().is_empty() && !parent.exists() => {
                    fs::create_dir_all(parent)?;
                    Ok(File::create(p)?)
                }
                Some(_) => Ok(File::create(p)?),
                None => bail!("Output file cannot be root."),
            }
        }
    }

    fn try_to_initialize_logging(&self) {
        if let Err(e) = TermLogger::init(
            self.verbosity_level,
            Config::default(),
            TerminalMode::Stderr,
            ColorChoice::Auto,
        ) {
            eprintln!("Failed to initialize logging: {:?}", e)
        }
    }
}

fn parse_lang_id(value: &str) -> Result<u16, String> {
    let parsed = match value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        Some(hex) => u16::from_str_radix(hex, 16),
        None => value.parse::<u16>(),
    };
    parsed.map_err(|_| {
        format!(
            "Expected a numeric language id (e.g. 1033 or 0x0409), got `{}`",
            value
        )
    })
}

fn command() -> Command {
    let codec_names: Vec<&'static str> = encodings().iter().map(|e| e.name()).collect();

    Command::new("rsrc_text_dump")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Extracts localized text from the resources of PE files (EXE/DLL/MUI)")
        .long_about(indoc!(r#"
            Extracts localized text from the named file's string table, dialogs, message table,
            or menu resources, as tab-delimited text with headers (or JSON lines).

            The resource file is parsed offline, it is never loaded or executed.

            Examples:
                rsrc_text_dump -d wsecedit.dll -o wsecedit-dlg.txt
                rsrc_text_dump -s -o wsecedit-strings.txt fr-FR/wsecedit.dll.mui
                rsrc_text_dump -m msprivs.dll -l 0x040c -o msprivs-French.txt
                rsrc_text_dump --indirect "@shell32.dll,-21787"
        "#))
        .arg(
            Arg::new("INPUT")
                .required_unless_present("indirect")
                .help("The resource PE file (e.g., EXE or DLL, or an associated .mui file)."),
        )
        .arg(
            Arg::new("strings")
                .short('s')
                .long("strings")
                .action(ArgAction::SetTrue)
                .help("Output contents of the string table."),
        )
        .arg(
            Arg::new("dialogs")
                .short('d')
                .long("dialogs")
                .action(ArgAction::SetTrue)
                .help("Output text in dialog resources."),
        )
        .arg(
            Arg::new("messages")
                .short('m')
                .long("messages")
                .action(ArgAction::SetTrue)
                .help("Output contents of the message table."),
        )
        .arg(
            Arg::new("menus")
                .short('n')
                .long("menus")
                .action(ArgAction::SetTrue)
                .help("Output text in menu resources."),
        )
        .group(
            ArgGroup::new("kind")
                .args(["strings", "dialogs", "messages", "menus"])
                .multiple(false),
        )
        .arg(
            Arg::new("indirect")
                .long("indirect")
                .value_name("REFERENCE")
                .conflicts_with_all(["kind", "INPUT"])
                .help("Resolve a single indirect string reference (`@<module>,-<id>`, `%VAR%` expanded in the module path) and print it."),
        )
        .arg(
            Arg::new("lang")
                .short('l')
                .long("lang")
                .value_name("LANGID")
                .value_parser(parse_lang_id)
                .help("Use the resources of the given language id (decimal or 0x hex) when present, instead of the first language listed."),
        )
        .arg(
            Arg::new("output-target")
                .short('o')
                .long("output")
                .value_name("PATH")
                .help(
                    "Writes output to the file specified (UTF-8) instead of stdout. \
                     Will ask for confirmation before overwriting files, to allow overwriting, pass `--no-confirm-overwrite`. \
                     Will create parent directories if needed.",
                ),
        )
        .arg(
            Arg::new("no-confirm-overwrite")
                .long("no-confirm-overwrite")
                .action(ArgAction::SetTrue)
                .help("When set, will not ask for confirmation before overwriting files, useful for automation"),
        )
        .arg(
            Arg::new("output-format")
                .short('f')
                .long("format")
                .value_parser(["tsv", "jsonl"])
                .default_value("tsv")
                .help("Sets the output format"),
        )
        .arg(
            Arg::new("ansi-codec")
                .long("ansi-codec")
                .value_parser(codec_names)
                .default_value(encoding::all::WINDOWS_1252.name())
                .help("When set, will use the given codec for decoding non-unicode message table entries."),
        )
        .arg(
            Arg::new("num-threads")
                .short('t')
                .long("threads")
                .value_parser(clap::value_parser!(usize))
                .help("Sets the number of worker threads, defaults to number of CPU cores."),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .action(ArgAction::Count)
                .help(indoc!(r#"
                    Sets debug prints level for the application:
                        -v   - info
                        -vv  - debug
                        -vvv - trace
                    Warnings are always shown."#)),
        )
}

fn main() -> Result<()> {
    let matches = command().get_matches();

    RsrcTextDump::from_cli_matches(&matches)?.run()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_is_consistent() {
        command().debug_assert();
    }

    #[test]
    fn test_parse_lang_id() {
        assert_eq!(parse_lang_id("1033"), Ok(0x0409));
        assert_eq!(parse_lang_id("0x040c"), Ok(0x040c));
        assert!(parse_lang_id("fr-FR").is_err());
    }
}
