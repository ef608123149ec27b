//! Plot note envelopes for a set of sustain levels
//!
//! Usage: plot-envelope [--attack N] [--decay N] [--sustain N] [--release N] <output.svg>
//!
//! Draws, over one whole note, the synthesized ADSR gain curve and the
//! raise/release shapes the natural piano and violin voices use.

use beepnote::generator::envelope::{adsr_gains, raise, release, Sustain, MAX_LEVEL};
use beepnote::generator::{SAMPLE_RATE_F64, WHOLE_NOTE};
use clap::Parser;
use plotters::prelude::*;

/// Samples plotted per curve point
const STEP: usize = 64;
const FULL_SCALE: i16 = i16::MAX;

#[derive(Parser, Debug)]
#[command(name = "plot-envelope", about = "Plot beep note envelopes as SVG")]
struct Args {
    #[arg(long, default_value_t = 8)]
    attack: u8,
    #[arg(long, default_value_t = 4)]
    decay: u8,
    #[arg(long, default_value_t = 4)]
    sustain: u8,
    #[arg(long, default_value_t = 9)]
    release: u8,
    output: String,
}

fn levels(args: &Args) -> Result<Sustain, Box<dyn std::error::Error>> {
    let mut sustain = Sustain::default();
    for (param, level) in [
        ('A', args.attack),
        ('D', args.decay),
        ('S', args.sustain),
        ('R', args.release),
    ] {
        if !sustain.set_level(param, level) {
            return Err(format!("level {} out of range 0-{}", level, MAX_LEVEL).into());
        }
    }
    Ok(sustain)
}

/// Gains of a natural voice: attack ramp divisor differs per instrument
fn natural_gains(sustain: &Sustain, raise_ratio: f64) -> Vec<f64> {
    let mut buf = vec![FULL_SCALE; WHOLE_NOTE];
    raise(&mut buf, raise_ratio);
    release(&mut buf, 0, (1 + sustain.release) as f64 / 10.0);
    buf.iter().map(|&s| s as f64 / FULL_SCALE as f64).collect()
}

fn points(gains: &[f64]) -> Vec<(f64, f64)> {
    gains
        .iter()
        .enumerate()
        .step_by(STEP)
        .map(|(i, &g)| (i as f64 * 1000.0 / SAMPLE_RATE_F64, g))
        .collect()
}

fn create_plot(args: &Args, sustain: &Sustain) -> Result<(), Box<dyn std::error::Error>> {
    let attack_room = (MAX_LEVEL - sustain.attack) as f64;
    let curves = [
        ("synthesized ADSR", adsr_gains(WHOLE_NOTE, sustain), BLUE),
        ("natural piano", natural_gains(sustain, attack_room / 100.0 * 2.0), RED),
        ("natural violin", natural_gains(sustain, attack_room / 10.0), GREEN),
    ];

    let root = SVGBackend::new(&args.output, (900, 420)).into_drawing_area();
    root.fill(&WHITE)?;

    let title = format!(
        "Envelope: SA{} SD{} SS{} SR{}",
        sustain.attack, sustain.decay, sustain.sustain, sustain.release
    );
    let max_time = WHOLE_NOTE as f64 * 1000.0 / SAMPLE_RATE_F64;

    let mut chart = ChartBuilder::on(&root)
        .caption(&title, ("sans-serif", 20))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(0f64..max_time, 0f64..1.1f64)?;

    chart
        .configure_mesh()
        .x_desc("Time (ms)")
        .y_desc("Gain")
        .x_labels(10)
        .y_labels(10)
        .draw()?;

    for (label, gains, color) in curves {
        chart
            .draw_series(LineSeries::new(points(&gains), color.stroke_width(2)))?
            .label(label)
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color));
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;

    root.present()?;
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let sustain = levels(&args)?;

    println!("Envelope Plot Generator");
    println!("=======================");
    println!("  Attack: {}", sustain.attack);
    println!("  Decay: {}", sustain.decay);
    println!("  Sustain: {}", sustain.sustain);
    println!("  Release: {}", sustain.release);
    println!();

    print!("  Creating plot... ");
    create_plot(&args, &sustain)?;
    println!("done");
    println!("Output: {}", args.output);

    Ok(())
}
