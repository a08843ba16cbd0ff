//! d20 EVSE Node - simulated ISO 15118-20 DC sessions
//!
//! Runs the d20 session driver against a scripted EV and a simulated
//! charge controller, all in one process. Requests and responses cross a
//! JSON byte relay the way EXI payloads would cross a V2GTP connection.
//!
//! # Usage
//!
//! ```bash
//! # Complete session, EV stops after 10 charge loops
//! d20-evse-node --charge-loops 10
//!
//! # Charger stops the session after 3 charge loops
//! d20-evse-node --scenario charger-stop --interrupt-after 3
//!
//! # Pause, reconnect and resume
//! d20-evse-node --scenario pause --config evse.json
//! ```

mod charger;
mod ev;

use std::path::PathBuf;
use std::time::Duration;

use charger::{Charger, ChargerConfig, Interrupt};
use clap::{Parser, ValueEnum};
use d20_core::{
    session_channel, DriverConfig, EvseSetupConfig, JsonCodec, PauseContext, SessionDriver,
    SessionOutcome,
};
use d20_core::feedback::ChannelFeedback;
use ev::{EvEnd, Link, SimulatedEv};
use tokio::sync::mpsc;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Scenario {
    /// EV charges, then terminates
    Full,
    /// Charger stops the charge loop
    ChargerStop,
    /// Charger pauses, EV reconnects and resumes
    Pause,
}

/// Simulated ISO 15118-20 DC charging sessions
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// EVSE id (ignored when --config is given)
    #[arg(short, long, default_value = "DE*EK3*E0001*1")]
    evse_id: String,

    /// EVSE setup as JSON
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Session scenario
    #[arg(short, long, value_enum, default_value = "full")]
    scenario: Scenario,

    /// DC_ChargeLoopReq messages the EV sends at most
    #[arg(long, default_value = "10")]
    charge_loops: u32,

    /// Charge loops before the charger interrupts (charger-stop, pause)
    #[arg(long, default_value = "3")]
    interrupt_after: u32,

    /// Simulated cable check duration in milliseconds
    #[arg(long, default_value = "300")]
    cable_check_ms: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let args = Args::parse();

    // Setup logging
    let level = match args.log_level.as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let setup = match &args.config {
        Some(path) => EvseSetupConfig::from_file(path)?,
        None => EvseSetupConfig::new(&args.evse_id),
    };
    let driver_config = DriverConfig::default();

    // Print banner
    println!();
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║            d20 EVSE Node - ISO 15118-20 DC Session           ║");
    println!("╠══════════════════════════════════════════════════════════════╣");
    println!("║  EVSE:     {:<50} ║", setup.evse_id);
    println!("║  Scenario: {:<50} ║", format!("{:?}", args.scenario));
    println!("║  Loops:    {:<50} ║", args.charge_loops);
    println!("║  Services: {:<50} ║", format!("{:?}", setup.supported_energy_services));
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!();

    let mut charger = ChargerConfig {
        cable_check_delay: Duration::from_millis(args.cable_check_ms),
        ..Default::default()
    };
    charger.interrupt = match args.scenario {
        Scenario::Full => None,
        Scenario::ChargerStop => Some((Interrupt::Stop, args.interrupt_after)),
        Scenario::Pause => Some((Interrupt::Pause, args.interrupt_after)),
    };

    let mut ev = SimulatedEv::new("WMIV1234567890ABCDEX", args.charge_loops);

    let (outcome, end) = run_connection(&setup, &driver_config, charger, &mut ev, None).await?;
    info!("Session {} ended: {:?}", ev.session_id(), outcome);

    if let (SessionOutcome::Paused(pause_ctx), Some(EvEnd::Paused)) = (outcome, end) {
        tokio::time::sleep(Duration::from_secs(1)).await;
        info!("EV reconnecting to resume session {}", ev.session_id());

        let charger = ChargerConfig {
            cable_check_delay: Duration::from_millis(args.cable_check_ms),
            ..Default::default()
        };
        let (outcome, _) =
            run_connection(&setup, &driver_config, charger, &mut ev, Some(pause_ctx)).await?;
        info!("Resumed session {} ended: {:?}", ev.session_id(), outcome);
    }

    Ok(())
}

/// One V2G connection: driver, relay, charger and EV until the session ends
async fn run_connection(
    setup: &EvseSetupConfig,
    config: &DriverConfig,
    charger: ChargerConfig,
    ev: &mut SimulatedEv,
    pause_ctx: Option<PauseContext>,
) -> Result<(SessionOutcome, Option<EvEnd>), BoxError> {
    let (feedback, feedback_rx) = ChannelFeedback::new();
    let resume = pause_ctx.is_some();
    let driver = match pause_ctx {
        Some(pause_ctx) => {
            SessionDriver::resume(pause_ctx, setup, Box::new(feedback), config.clone())
        }
        None => SessionDriver::new(setup, Box::new(feedback), config.clone()),
    };

    let (mut handle, channels) = session_channel(config);
    let charger_task = tokio::spawn(Charger::new(handle.control.clone(), charger).run(feedback_rx));
    let driver_task = tokio::spawn(driver.run(channels));

    let (ev_tx, inbound) = mpsc::channel(4);
    let (outbound, ev_rx) = mpsc::channel(4);
    let relay_task =
        tokio::spawn(async move { handle.relay(&JsonCodec, inbound, outbound).await });

    let mut link = Link { tx: ev_tx, rx: ev_rx };
    let end = match ev.run_session(&mut link, resume).await {
        Ok(end) => Some(end),
        Err(e) => {
            warn!("EV aborted: {}", e);
            None
        }
    };
    drop(link);

    let outcome = driver_task.await??;
    relay_task.await??;
    charger_task.await?;

    Ok((outcome, end))
}
