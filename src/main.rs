mod classify;
mod cmd;
mod diagnostics;
mod exports;
mod money;
mod period;
mod reference;
mod schedule;
mod sheet;
mod tax;
mod xlsx;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "catax", version, about = "Fill in the California sales tax Schedule A from store exports")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Classify orders, total each district and write the completed worksheet
    Report(cmd::report::ReportCommand),
    /// Write the normalized city to county reference table
    Reference(cmd::reference::ReferenceCommand),
    /// Show the county and district of every taxable order
    Classify(cmd::classify::ClassifyCommand),
    /// Describe the expected input files
    Schema(cmd::schema::SchemaCommand),
}

fn main() -> anyhow::Result<()> {
    init_logging();

    let cli = Cli::parse();
    match cli.command {
        Command::Report(report) => report.exec(),
        Command::Reference(reference) => reference.exec(),
        Command::Classify(classify) => classify.exec(),
        Command::Schema(schema) => schema.exec(),
    }
}

fn init_logging() {
    let mut builder = pretty_env_logger::formatted_builder();
    builder.filter_level(log::LevelFilter::Info);
    if let Ok(filters) = std::env::var("RUST_LOG") {
        builder.parse_filters(&filters);
    }
    builder.init();
}
