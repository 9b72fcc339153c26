//! Wirenet CLI - compile saved schematics into SPICE netlists from the command line.

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use wirenet::solver::{ProcessSolver, ResultTable, SolverOutcome};
use wirenet::topology::Terminal;
use wirenet::{CompileResult, Config, WirenetCore};

#[derive(Parser)]
#[command(name = "wirenet")]
#[command(about = "Schematic wire-graph to SPICE netlist compiler", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the netlist for a saved schematic
    Netlist {
        /// Path to a schematic document (.json)
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Editor and simulation settings
        #[arg(short, long, value_name = "CFG")]
        config: Option<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "human")]
        format: OutputFormat,
    },

    /// Print the net partition of a saved schematic
    Nets {
        /// Path to a schematic document (.json)
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Editor and simulation settings
        #[arg(short, long, value_name = "CFG")]
        config: Option<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "human")]
        format: OutputFormat,
    },

    /// Compile a schematic and run it through the configured solver
    Simulate {
        /// Path to a schematic document (.json)
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Editor and simulation settings
        #[arg(short, long, value_name = "CFG")]
        config: Option<PathBuf>,
    },
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Human-readable output
    Human,
    /// JSON output for tooling
    Json,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let exit_code = match cli.command {
        Commands::Netlist {
            file,
            config,
            format,
        } => handle_netlist(&file, config.as_deref(), format),
        Commands::Nets {
            file,
            config,
            format,
        } => handle_nets(&file, config.as_deref(), format),
        Commands::Simulate { file, config } => handle_simulate(&file, config.as_deref()),
    };

    process::exit(exit_code);
}

fn compile(file: &Path, config_path: Option<&Path>) -> anyhow::Result<(Config, CompileResult)> {
    let config = match config_path {
        Some(path) => Config::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => Config::default(),
    };
    let result = WirenetCore::compile_file(file, &config)
        .with_context(|| format!("failed to compile {}", file.display()))?;
    Ok((config, result))
}

fn report_error(e: &anyhow::Error) -> i32 {
    eprintln!("Error: {:#}", e);
    1
}

fn handle_netlist(file: &Path, config_path: Option<&Path>, format: OutputFormat) -> i32 {
    let result = match compile(file, config_path) {
        Ok((_, result)) => result,
        Err(e) => return report_error(&e),
    };

    match format {
        OutputFormat::Human => {
            print!("{}", result.netlist.text);
            for warning in &result.netlist.warnings {
                eprintln!("warning: {}", warning);
            }
        }
        OutputFormat::Json => {
            let output = serde_json::json!({
                "file": file.display().to_string(),
                "netlist": result.netlist.text,
                "directives": result
                    .netlist
                    .directives
                    .iter()
                    .map(|d| serde_json::json!({
                        "probe": d.probe(),
                        "key": d.key(),
                        "line": d.to_string(),
                    }))
                    .collect::<Vec<_>>(),
                "warnings": result
                    .netlist
                    .warnings
                    .iter()
                    .map(|w| w.to_string())
                    .collect::<Vec<_>>(),
                "node_nets": result.netlist.node_nets,
                "stats": result.stats,
            });
            print_json(&output);
        }
    }
    0
}

fn handle_nets(file: &Path, config_path: Option<&Path>, format: OutputFormat) -> i32 {
    let result = match compile(file, config_path) {
        Ok((_, result)) => result,
        Err(e) => return report_error(&e),
    };

    match format {
        OutputFormat::Human => {
            println!("File: {}", file.display());
            println!("{}", "─".repeat(60));
            for net in result.partition.nets() {
                let label = if net.is_ground {
                    format!("{} (ground)", net.id)
                } else {
                    net.id.to_string()
                };
                let members: Vec<String> = net.members.iter().map(describe_terminal).collect();
                println!("  net {:<10} {}", label, members.join(", "));
            }
            println!("\n  Summary:");
            println!("    Nodes:    {}", result.stats.nodes);
            println!("    Segments: {}", result.stats.segments);
            println!("    Nets:     {}", result.stats.nets);
        }
        OutputFormat::Json => {
            let output = serde_json::json!({
                "file": file.display().to_string(),
                "nets": result.partition.nets(),
                "stats": result.stats,
            });
            print_json(&output);
        }
    }
    0
}

fn describe_terminal(terminal: &Terminal) -> String {
    match terminal {
        Terminal::Node(id) => format!("node {}", id),
        Terminal::FloatingPin { component, pin } => {
            format!("component {} pin #{}", component, pin)
        }
    }
}

fn handle_simulate(file: &Path, config_path: Option<&Path>) -> i32 {
    let (config, result) = match compile(file, config_path) {
        Ok(compiled) => compiled,
        Err(e) => return report_error(&e),
    };
    for warning in &result.netlist.warnings {
        eprintln!("warning: {}", warning);
    }

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Error: failed to start runtime: {}", e);
            return 1;
        }
    };

    let response = runtime.block_on(WirenetCore::simulate(
        &result.netlist,
        &config.simulation,
        Arc::new(ProcessSolver::new()),
    ));

    match response {
        Ok(response) => match response.outcome {
            SolverOutcome::Completed(table) => {
                print_table(&table, &result.netlist.measurement_keys());
                0
            }
            SolverOutcome::Failed {
                diagnostic,
                console,
            } => {
                eprintln!("Error: simulation failed: {}", diagnostic);
                if !console.is_empty() {
                    eprintln!("{}", console.trim_end());
                }
                1
            }
        },
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

/// Print the measured columns first, then whatever else the solver reported
fn print_table(table: &ResultTable, keys: &[String]) {
    let mut order: Vec<usize> = Vec::new();
    for key in keys {
        if let Some(idx) = table.columns.iter().position(|c| c.eq_ignore_ascii_case(key)) {
            order.push(idx);
        }
    }
    for idx in 0..table.columns.len() {
        if !order.contains(&idx) {
            order.push(idx);
        }
    }

    let header: Vec<String> = order.iter().map(|&i| format!("{:>14}", table.columns[i])).collect();
    println!("{}", header.join(" "));
    for row in &table.rows {
        let cells: Vec<String> = order
            .iter()
            .map(|&i| match row.get(i) {
                Some(value) => format!("{:>14.6e}", value),
                None => format!("{:>14}", "-"),
            })
            .collect();
        println!("{}", cells.join(" "));
    }
}

fn print_json(value: &serde_json::Value) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{}", text),
        Err(e) => eprintln!("Error: failed to encode JSON: {}", e),
    }
}
