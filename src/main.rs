use clap::Parser;
use dhcp_dora::{config::parse_mac_address, Args, ClientError, DhcpClient};
use tokio::fs;
use tracing_subscriber::EnvFilter;

/// Reads the hardware (MAC) address of `interface` from sysfs.
async fn interface_mac(interface: &str) -> Result<[u8; 6], ClientError> {
    let mac_path = format!("/sys/class/net/{interface}/address");
    let mac_str = fs::read_to_string(&mac_path)
        .await
        .map_err(|_| ClientError::InterfaceInvalid(interface.to_string()))?;
    parse_mac_address(mac_str.trim())
}

#[tokio::main]
async fn main() -> Result<(), ClientError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    let mac_addr = match &args.mac {
        Some(mac) => parse_mac_address(mac)?,
        None => interface_mac(&args.interface).await?,
    };
    tracing::info!(
        "Using interface '{}' with MAC address {}",
        args.interface,
        mac_addr.map(|b| format!("{b:02x}")).join(":")
    );

    let config = args.into_config(mac_addr);
    let mut client = DhcpClient::bind(config).await?;

    match client.run().await {
        Ok(lease) => {
            tracing::info!("Assigned IP: {}", lease.assigned_ip);
            Ok(())
        }
        Err(e) => {
            tracing::error!("DHCP process failed: {}", e);
            Err(e)
        }
    }
}
