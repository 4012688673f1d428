use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use sas_egm::codec::{calculate_and_append_crc, check_crc};
use sas_egm::sas::registry::{lookup, LongPoll};
use sas_egm::sas::serial::{SerialConfig, SerialTransport};
use sas_egm::util::hex::{decode_hex, format_hex_compact};
use sas_egm::{
    init_logger_with_default, log_info, ClientExit, LoggingPlatform, MemoryExceptionQueue,
    SasClient, SasClientConfig, SasTransport,
};

#[derive(Parser)]
#[command(name = "sas-egm")]
#[command(about = "Gaming machine side of the SAS protocol")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Answer a SAS host on a serial port
    Run {
        port: String,
        #[arg(short, long)]
        address: Option<u8>,
        /// JSON client configuration
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Append the SAS CRC to a frame
    Crc { hex: String },
    /// Describe a long poll and check its CRC
    Inspect { hex: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logger_with_default("info");

    let cli = Cli::parse();
    match cli.command {
        Commands::Run {
            port,
            address,
            config,
        } => run(&port, address, config).await,
        Commands::Crc { hex } => {
            let bytes = decode_hex(&hex).context("invalid frame")?;
            println!("{}", format_hex_compact(&calculate_and_append_crc(&bytes)));
            Ok(())
        }
        Commands::Inspect { hex } => inspect(&hex),
    }
}

async fn run(port: &str, address: Option<u8>, config: Option<PathBuf>) -> anyhow::Result<()> {
    let mut config = match config {
        Some(path) => SasClientConfig::from_json_file(&path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => SasClientConfig::default(),
    };
    if let Some(address) = address {
        config.address = address;
    }

    let mut transport = SerialTransport::new(SerialConfig::default());
    transport
        .open(port)
        .await
        .with_context(|| format!("opening {port}"))?;

    let queue = Arc::new(Mutex::new(MemoryExceptionQueue::new()));
    let mut client = SasClient::new(config, transport, queue, Arc::new(LoggingPlatform))
        .context("invalid client configuration")?;

    let stop = Arc::new(AtomicBool::new(false));
    let on_signal = stop.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_signal.store(true, Ordering::SeqCst);
        }
    });

    let exit = client.run(stop).await;
    if let Ok(json) = client.diagnostics().to_json() {
        log_info(&format!("diagnostics: {json}"));
    }
    client.transport_mut().close().await?;

    if exit == ClientExit::Fatal {
        bail!("gaming machine reported a storage failure; SAS address reset to 0");
    }
    Ok(())
}

fn inspect(hex: &str) -> anyhow::Result<()> {
    let frame = decode_hex(hex).context("invalid frame")?;
    if frame.len() < 2 {
        bail!("a long poll has at least an address and a command byte");
    }

    let (address, command) = (frame[0], frame[1]);
    let info = lookup(command);
    let name = LongPoll::from_u8(command)
        .map(|poll| format!("{poll:?}"))
        .unwrap_or_else(|| "unknown".into());

    println!("address:   {address}");
    println!("command:   0x{command:02X} ({name})");
    if !info.is_supported() {
        println!("registry:  unsupported");
        return Ok(());
    }
    if info.is_type_r() {
        println!("registry:  type R, 2 bytes, no CRC");
        return Ok(());
    }

    let expected = if info.variable_length {
        match frame.get(2) {
            Some(&len) => info.total_length(len),
            None => bail!("variable-length poll is missing its length byte"),
        }
    } else {
        info.total_length(0)
    };
    println!(
        "registry:  {} bytes{}{}",
        expected,
        if info.variable_length { ", variable" } else { "" },
        if info.broadcast_allowed { ", broadcast allowed" } else { "" }
    );
    println!("length:    {} bytes", frame.len());
    println!(
        "crc:       {}",
        if check_crc(&frame) { "ok" } else { "mismatch" }
    );
    Ok(())
}
