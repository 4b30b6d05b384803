//! # Bus RPC Host Daemon
//!
//! Main entry point for the bus RPC host.

use busrpcd::{HostRuntime, HostRuntimeConfig};
use core_types::ServiceId;
use ipc::DeliveryMode;
use remote_ipc::RpcConfig;
use std::env;
use std::io;
use std::process;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(io::stderr)
        .init();

    let args: Vec<String> = env::args().collect();

    let config = parse_args(&args).unwrap_or_else(|e| {
        eprintln!("Error: {}", e);
        print_usage(&args[0]);
        process::exit(1);
    });

    let mut runtime = HostRuntime::new(config).unwrap_or_else(|e| {
        eprintln!("Failed to create runtime: {}", e);
        process::exit(1);
    });

    let result = runtime.run(io::stdin().lock(), io::stdout().lock());
    if let Err(e) = runtime.shutdown() {
        eprintln!("Shutdown error: {}", e);
    }
    if let Err(e) = result {
        eprintln!("Runtime error: {}", e);
        process::exit(1);
    }
}

fn parse_args(args: &[String]) -> Result<HostRuntimeConfig, String> {
    let mut config = HostRuntimeConfig::default();
    let mut config_path = None;
    let mut timeout_ms = None;
    let mut i = 1;

    while i < args.len() {
        match args[i].as_str() {
            "--config" | "-c" => {
                i += 1;
                if i >= args.len() {
                    return Err("Missing value for --config".to_string());
                }
                config_path = Some(args[i].clone());
            }
            "--id" => {
                i += 1;
                if i >= args.len() {
                    return Err("Missing value for --id".to_string());
                }
                let id = ServiceId::new(args[i].as_str())
                    .map_err(|e| format!("Invalid service ID: {}", e))?;
                config.service_id = Some(id);
            }
            "--timeout-ms" | "-t" => {
                i += 1;
                if i >= args.len() {
                    return Err("Missing value for --timeout-ms".to_string());
                }
                let millis: u64 = args[i]
                    .parse()
                    .map_err(|_| format!("Invalid timeout-ms value: {}", args[i]))?;
                timeout_ms = Some(millis);
            }
            "--background" => {
                config.delivery = DeliveryMode::Background;
            }
            "--help" | "-h" => {
                print_usage(&args[0]);
                process::exit(0);
            }
            other if other.starts_with('-') => {
                return Err(format!("Unknown option: {}", other));
            }
            command => {
                config.commands.push(command.to_string());
            }
        }
        i += 1;
    }

    // Flags override the file regardless of their order on the command line.
    if let Some(path) = config_path {
        config.rpc = RpcConfig::from_file(&path).map_err(|e| e.to_string())?;
    }
    if let Some(millis) = timeout_ms {
        let timeout = (millis > 0).then(|| Duration::from_millis(millis));
        config.rpc = config.rpc.with_call_timeout(timeout);
    }

    Ok(config)
}

fn print_usage(program: &str) {
    eprintln!("Usage: {} [OPTIONS] [COMMAND...]", program);
    eprintln!();
    eprintln!("Options:");
    eprintln!("  -c, --config <FILE>      JSON timing configuration");
    eprintln!("      --id <ID>            Service ID to serve under");
    eprintln!("                           (default: $BUSRPC_SERVICE_ID, then the program name)");
    eprintln!("  -t, --timeout-ms <N>     Call deadline in milliseconds (0 = wait forever)");
    eprintln!("      --background         Deliver bus messages on a background thread");
    eprintln!("  -h, --help               Show this help message");
    eprintln!();
    eprintln!("Commands (read from stdin when none are given):");
    eprintln!("  call <path> [arg...]             Call one of this host's methods");
    eprintln!("  remote <service> <path> [arg...] Call another service's method");
    eprintln!("  list                             List live methods");
    eprintln!("  quit                             Stop reading commands");
    eprintln!();
    eprintln!("Examples:");
    eprintln!("  {} --id calculator \"call math.add 2 3\"", program);
    eprintln!("  {} --timeout-ms 500 \"call math.sum 1 2 3\" list", program);
}
