// Copyright 2025 Cornell University
// released under MIT License

use clap::ColorChoice;
use clap::Parser;
use clap_verbosity_flag::{Verbosity, WarnLevel};
use env_logger::WriteStyle;
use plc_uppaal::config::{ChannelScheme, GeneratorConfig};
use plc_uppaal::diagnostic::DiagnosticHandler;
use plc_uppaal::setup::run;

/// Generates UPPAAL timed-automata stubs for a PLC and its environment
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to the PLC signal configuration (.xml)
    #[arg(value_name = "CONFIG_FILE")]
    config: String,

    /// Path of the UPPAAL model to write
    #[arg(value_name = "OUTPUT_FILE")]
    output: String,

    /// How the controller and environment stubs are connected
    #[arg(long, value_enum, default_value_t = ChannelScheme::Buffered)]
    scheme: ChannelScheme,

    /// Worst-case latency of a delay buffer, in model time units
    #[arg(long, default_value_t = 1000)]
    delay: u32,

    /// Users can specify `-v` or `--verbose` to toggle logging
    #[command(flatten)]
    verbosity: Verbosity<WarnLevel>,

    /// Pass in `--color never` to suppress colored error messages.
    #[arg(long, value_name = "COLOR_CHOICE", default_value = "auto")]
    color: ColorChoice,
}

/// Example:
/// `cargo run -- tests/configs/conveyor.xml conveyor_model.xml --scheme direct -v`
fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // For concision, we disable timestamps in the log
    let write_style = if cli.color == ColorChoice::Never {
        WriteStyle::Never
    } else {
        WriteStyle::Auto
    };
    env_logger::Builder::new()
        .format_timestamp(None)
        .filter_level(cli.verbosity.log_level_filter())
        .write_style(write_style)
        .init();

    let config = GeneratorConfig {
        scheme: cli.scheme,
        delay: cli.delay,
        ..GeneratorConfig::default()
    };
    let handler = &mut DiagnosticHandler::new(cli.color);
    run(&cli.config, &cli.output, &config, handler)
}
