mod invocation;
mod modem_lines;
mod relay_ctl;
mod relay_frame;
mod relay_types;
#[cfg(test)]
mod sim_link;
mod tty;

use anyhow::Result;
use clap::ArgAction;
use clap::Parser;
use invocation::Invocation;
use log::error;
use log::warn;
use relay_ctl::RelayControl;
use tty::PortSettings;

/// Switches relays on an RS-232 relay board.
///
/// Examples: `rs232-relay 0 1 on`, `rs232-relay 0 2 off`.
#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// '0' for /dev/ttyS0, anything else for /dev/ttyUSB0
    port: Option<String>,

    /// Relay 1-4, or 'on'/'off' for the paired relay 1 + relay 2 sequence
    select: Option<String>,

    /// 'on' or 'off', applied to every relay frame
    state: Option<String>,

    /// Line speed
    #[arg(long, default_value_t = 9600)]
    baud: u32,

    /// Log every modem control line snapshot (needs -vv)
    #[arg(long)]
    debug_lines: bool,

    /// Increase logging verbosity
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Silence all logging
    #[arg(short, long)]
    quiet: bool,
}

fn run(args: Args) -> Result<()> {
    let invocation = Invocation::from_args(
        args.port.as_deref(),
        args.select.as_deref(),
        args.state.as_deref(),
        |e| {
            warn!("{}", e);
            None
        },
    )?;

    let path = invocation.port.path();
    let settings = PortSettings {
        baud: args.baud,
        ..PortSettings::default()
    };

    let mut ctl = match RelayControl::open(path, &settings, args.debug_lines) {
        Ok(ctl) => ctl,
        Err(e) => {
            println!("{}", e);
            println!("Cannot open COM port {}", path);
            return Ok(());
        }
    };
    println!("{}", path);

    let response = ctl.run(&invocation.steps());
    ctl.close();

    println!();
    println!("{}", response?);
    Ok(())
}

fn main() {
    let args = Args::parse();

    if let Err(e) = stderrlog::new()
        .module(module_path!())
        .quiet(args.quiet)
        .verbosity(args.verbose as usize + 1)
        .timestamp(stderrlog::Timestamp::Off)
        .init()
    {
        eprintln!("Failed to initialize logging: {}", e);
    }

    // Failures are reported, the exit status stays 0.
    if let Err(e) = run(args) {
        error!("{:#}", e);
    }
}
