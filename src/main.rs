//! beepnote: play beep notation sheets into a WAV stream
//!
//! Usage: beepnote [OPTIONS] [FILES]...
//!
//! Each file is rendered in turn and the audio of every source that
//! succeeds is written to `--output` as one WAV stream.

use anyhow::{bail, Context};
use beepnote::midi::{load_midi, midi_to_notation};
use beepnote::pipeline::Sink;
use beepnote::sheet::{SheetStore, DEMO};
use beepnote::wav::{interleave, write_wav_stereo};
use beepnote::{EngineConfig, Line, Music};
use clap::Parser;
use std::fs::File;
use std::io::{self, BufWriter, Cursor, Write};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "beepnote", version, about = "Beep notation music engine")]
struct Cli {
    /// Sheets to play; `demo` plays the built-in sheet, none reads stdin
    files: Vec<String>,

    /// WAV destination, `-` for stdout
    #[arg(short, long, value_name = "PATH")]
    output: Option<PathBuf>,

    /// Volume percent
    #[arg(short, long, value_parser = clap::value_parser!(u8).range(1..=100))]
    volume: Option<u8>,

    /// Do not echo the sheet while playing
    #[arg(short, long)]
    quiet: bool,

    /// Echo note names while playing
    #[arg(short, long)]
    notes: bool,

    /// Print the demo sheet (Mozart K33b) and exit
    #[arg(short = 'p', long)]
    print_demo: bool,

    /// Use synthesized voices even when natural samples are installed
    #[arg(long)]
    computer_voice: bool,

    /// Play notes given on the command line
    #[arg(long, value_name = "NOTES")]
    play: Option<String>,

    /// Play a MIDI file
    #[arg(long, value_name = "FILE")]
    midi: Option<PathBuf>,

    /// Print the notation of a MIDI file and exit
    #[arg(long, value_name = "FILE")]
    midi_notes: Option<PathBuf>,

    /// Engine config (TOML)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
}

/// One notation input and the label it is reported under
struct Source {
    label: String,
    notation: String,
}

/// Echoes sheet text and note names, and keeps the audio of one source
struct Console {
    print_sheet: bool,
    print_notes: bool,
    to_stderr: bool,
    interleaved: Vec<i16>,
}

impl Console {
    fn echo(&self, text: &str) -> io::Result<()> {
        if self.to_stderr {
            writeln!(io::stderr().lock(), "{}", text)
        } else {
            writeln!(io::stdout().lock(), "{}", text)
        }
    }
}

impl Sink for Console {
    fn play(&mut self, line: &Line) -> beepnote::Result<()> {
        if self.print_sheet {
            self.echo(&line.text)?;
        }
        if self.print_notes && !line.notes.is_empty() {
            self.echo(&line.notes.join(" "))?;
        }
        interleave(line.left(), line.right(), &mut self.interleaved);
        Ok(())
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<EngineConfig> {
    let mut config = match &cli.config {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => EngineConfig::default(),
    };
    if let Some(volume) = cli.volume {
        config.volume = volume;
    }
    config.computer_voice |= cli.computer_voice;
    config.print_sheet &= !cli.quiet;
    config.print_notes |= cli.notes;
    Ok(config)
}

/// Read one file argument: the demo, a file on disk or a stored sheet
fn read_sheet(name: &str, store: Option<&SheetStore>) -> anyhow::Result<String> {
    if name == "demo" {
        return Ok(DEMO.to_string());
    }
    let path = Path::new(name);
    if path.is_file() {
        return std::fs::read_to_string(path).with_context(|| format!("reading {}", name));
    }
    match store {
        Some(store) => Ok(store.load(name)?),
        None => bail!("sheet not found: {}", name),
    }
}

fn collect_sources(cli: &Cli, config: &EngineConfig) -> Vec<anyhow::Result<Source>> {
    let mut sources = Vec::new();
    if let Some(notes) = &cli.play {
        sources.push(Ok(Source {
            label: "--play".into(),
            notation: notes.clone(),
        }));
    }
    if let Some(path) = &cli.midi {
        let label = path.display().to_string();
        sources.push(
            load_midi(path)
                .with_context(|| format!("reading MIDI {}", label))
                .map(|notation| Source { label, notation }),
        );
    }

    let store = SheetStore::from_config(config);
    for name in &cli.files {
        sources.push(read_sheet(name, store.as_ref()).map(|notation| Source {
            label: name.clone(),
            notation,
        }));
    }
    sources
}

fn read_stdin() -> anyhow::Result<Source> {
    let mut notation = String::new();
    io::Read::read_to_string(&mut io::stdin().lock(), &mut notation).context("reading stdin")?;
    Ok(Source {
        label: "stdin".into(),
        notation,
    })
}

fn write_output(output: &Path, interleaved: &[i16]) -> anyhow::Result<()> {
    if output == Path::new("-") {
        let mut stdout = io::stdout().lock();
        write_wav_stereo(&mut stdout, interleaved).context("writing WAV to stdout")?;
    } else {
        let file = File::create(output).with_context(|| format!("creating {}", output.display()))?;
        let mut writer = BufWriter::new(file);
        write_wav_stereo(&mut writer, interleaved)
            .with_context(|| format!("writing {}", output.display()))?;
        log::info!("wrote {}", output.display());
    }
    Ok(())
}

fn run(cli: Cli) -> anyhow::Result<bool> {
    if cli.print_demo {
        print!("{}", DEMO);
        return Ok(true);
    }
    if let Some(path) = &cli.midi_notes {
        let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
        print!("{}", midi_to_notation(&bytes)?);
        return Ok(true);
    }

    let config = load_config(&cli)?;
    let mut sources = collect_sources(&cli, &config);
    if sources.is_empty() {
        sources.push(read_stdin());
    }
    if cli.output.is_none() {
        log::warn!("no --output given, audio is discarded");
    }

    let to_stderr = cli.output.as_deref() == Some(Path::new("-"));
    let music = Music::new(config).context("loading voices")?;
    let mut audio = Vec::new();
    let mut ok = true;

    for source in sources {
        let source = match source {
            Ok(source) => source,
            Err(e) => {
                log::error!("{:#}", e);
                ok = false;
                continue;
            }
        };
        let console = Console {
            print_sheet: music.config().print_sheet,
            print_notes: music.config().print_notes,
            to_stderr,
            interleaved: Vec::new(),
        };
        let reader = Cursor::new(source.notation.into_bytes());
        match music.play(reader, console) {
            Ok(console) => audio.extend_from_slice(&console.interleaved),
            Err(e) => {
                log::error!("{}: {}", source.label, e);
                ok = false;
            }
        }
    }

    if let Some(output) = &cli.output {
        write_output(output, &audio)?;
    }
    Ok(ok)
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    if !run(cli)? {
        std::process::exit(1);
    }
    Ok(())
}
