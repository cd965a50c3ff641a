use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use tracing::info;

use cam_controls as cc;
use cam_controls::{ControlTool, DispatchEvent, DispatchObserver, Grouping};

#[derive(Parser, Debug)]
#[command(
    name = "camctl",
    version,
    about = "Discover and drive UVC camera controls through uvcdynctrl",
    disable_help_subcommand = true
)]
struct Cli {
    /// YAML config file (utility path, timeout, nudge sizes, motor names)
    #[arg(long, global = true)]
    config: Option<String>,

    /// Use the in-process mock utility instead of uvcdynctrl
    #[arg(long, action = ArgAction::SetTrue, global = true)]
    mock: bool,

    /// Print Prometheus metrics after the command
    #[arg(long, action = ArgAction::SetTrue, global = true)]
    metrics: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List discovered controls by grouping
    List {
        /// Emit the registry as JSON
        #[arg(long, action = ArgAction::SetTrue)]
        json: bool,
    },
    /// Set a control to a raw value
    Set {
        /// Control name as listed, e.g. "Brightness"
        name: String,
        /// Value passed through to the utility
        #[arg(allow_hyphen_values = true)]
        value: String,
    },
    /// Select a choice control entry by its label
    Choose {
        name: String,
        label: String,
    },
    /// Switch a toggle control on or off
    Toggle {
        name: String,
        #[arg(value_enum)]
        state: Switch,
    },
    /// Nudge the camera left
    PanLeft,
    /// Nudge the camera right
    PanRight,
    /// Nudge the camera up
    TiltUp,
    /// Nudge the camera down
    TiltDown,
    /// Send pan reset then tilt reset
    Reset,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum Switch {
    On,
    Off,
}

/// Prints each command line as it goes out, like the old message pane.
struct ConsoleObserver;

impl DispatchObserver for ConsoleObserver {
    fn on_dispatch(&mut self, event: &DispatchEvent) {
        println!("-> {}", event.command);
    }

    fn on_outcome(&mut self, event: &DispatchEvent, outcome: &cc::Result<()>) {
        if let Err(e) = outcome {
            eprintln!("!! {}: {e}", event.control);
        }
    }
}

fn main() -> Result<()> {
    setup_tracing();
    let cli = Cli::parse();

    let config = match cli.config.as_deref() {
        Some(path) => cc::load_config_file(path)?,
        None => cc::Config::default(),
    };
    let hub = cc::MetricsHub::new().map_err(|e| anyhow::anyhow!(e))?;

    let outcome = if cli.mock {
        let tool = cc::MockTool::new().with_utility(&config.utility);
        run(tool, &config, &hub, cli.command)
    } else {
        let tool = cc::UvcDynCtrl::from_config(&config)
            .with_context(|| "cannot use the device utility; aborting")?;
        run(tool, &config, &hub, cli.command)
    };

    if cli.metrics {
        print!("{}", hub.encode_text());
    }
    outcome
}

fn setup_tracing() {
    // Best-effort; avoid panics if already set
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .try_init();
}

fn run<T: ControlTool>(
    mut tool: T,
    config: &cc::Config,
    hub: &cc::MetricsHub,
    command: Commands,
) -> Result<()> {
    match command {
        Commands::List { json } => {
            let reg = cc::discover(&mut tool)?;
            hub.record_discovery(&reg);
            if json {
                println!("{}", serde_json::to_string_pretty(&reg)?);
            } else {
                print_registry(&reg);
            }
            Ok(())
        }
        Commands::Set { name, value } => {
            let op = cc::Operation::Set {
                control: name,
                value: cc::ControlValue::parse(&value),
            };
            dispatcher(tool, config, hub).perform(op)?;
            Ok(())
        }
        Commands::Choose { name, label } => {
            let reg = cc::discover(&mut tool)?;
            hub.record_discovery(&reg);
            let control = reg
                .choice_controls()
                .get(&name)
                .cloned()
                .ok_or_else(|| cc::Error::UnknownControl(name.clone()))?;
            dispatcher(tool, config, hub).select_choice(&control, &label)?;
            Ok(())
        }
        Commands::Toggle { name, state } => {
            dispatcher(tool, config, hub).set_toggle(&name, state == Switch::On)?;
            Ok(())
        }
        Commands::PanLeft => motor(tool, config, hub, cc::Operation::PanLeft),
        Commands::PanRight => motor(tool, config, hub, cc::Operation::PanRight),
        Commands::TiltUp => motor(tool, config, hub, cc::Operation::TiltUp),
        Commands::TiltDown => motor(tool, config, hub, cc::Operation::TiltDown),
        Commands::Reset => motor(tool, config, hub, cc::Operation::ResetToOrigin),
    }
}

fn dispatcher<T: ControlTool>(
    tool: T,
    config: &cc::Config,
    hub: &cc::MetricsHub,
) -> cc::Dispatcher<T, ConsoleObserver> {
    cc::Dispatcher::with_observer(tool, config, ConsoleObserver).with_metrics(hub.clone())
}

fn motor<T: ControlTool>(
    tool: T,
    config: &cc::Config,
    hub: &cc::MetricsHub,
    op: cc::Operation,
) -> Result<()> {
    info!(?op, "motor command");
    dispatcher(tool, config, hub).perform(op)?;
    Ok(())
}

fn print_registry(reg: &cc::ControlRegistry) {
    println!("device: {}", reg.device_id().unwrap_or("unknown"));
    for g in Grouping::ALL {
        let group = reg.group(g);
        if group.is_empty() {
            continue;
        }
        println!("[{}]", g.as_str());
        for (name, c) in group {
            let kind = c
                .kind
                .as_ref()
                .map(|k| k.to_string())
                .unwrap_or_default();
            let mut line = format!("  {name:<36} {kind:<8}");
            if let (Some(min), Some(max)) = (c.min, c.max) {
                line.push_str(&format!(" {min}..{max}"));
                if let Some(step) = c.step {
                    line.push_str(&format!(" step {step}"));
                }
            }
            if let Some(choices) = &c.choices {
                let labels: Vec<String> = choices
                    .iter()
                    .map(|(k, l)| format!("{l}={k}"))
                    .collect();
                line.push_str(&format!(" {{{}}}", labels.join(", ")));
            }
            match (g, c.default) {
                (Grouping::Choice, Some(_)) => {
                    if let Some(label) = c.default_label() {
                        line.push_str(&format!(" default {label}"));
                    }
                }
                (_, Some(d)) => line.push_str(&format!(" default {d}")),
                (_, None) => {}
            }
            println!("{line}");
        }
    }
    for d in reg.diagnostics() {
        eprintln!("warning: {d}");
    }
}
