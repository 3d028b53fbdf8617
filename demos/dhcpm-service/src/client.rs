//! DHCP Management Client
//!
//! Command-line client for the `dhcpsrv` management interface.
//!
//! USAGE:
//!   dhcpm-client [OPTIONS] <COMMAND>
//!
//! EXAMPLES:
//!   dhcpm-client version
//!   dhcpm-client create-subnet 192.168.1.0 255.255.255.0 --name lab
//!   dhcpm-client add-range 192.168.1.0 192.168.1.10 192.168.1.99
//!   dhcpm-client add-reservation 192.168.1.0 192.168.1.50 00:11:22:33:44:55
//!   dhcpm-client set-option 192.168.1.0 3 192.168.1.1
//!   dhcpm-client clients 192.168.1.0
//!   dhcpm-client --big-endian subnets

mod common;

use std::net::{Ipv4Addr, SocketAddr};

use clap::{Parser, Subcommand};
use common::*;
use dcerpc::DceRpcClientConfig;
use dhcpm::error::check;
use dhcpm::ops::*;
use dhcpm::types::*;
use dhcpm::DhcpSrvClient;
use ndr::{LpWStr, NdrContext, UniquePtr};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "dhcpm-client")]
#[command(version)]
#[command(about = "DHCP management client - manages scopes, options and leases")]
#[command(
    long_about = "A demonstration client for the DHCP Server Management Protocol (MS-DHCPM).\n\n\
Binds the dhcpsrv interface (v1.0) over DCE RPC / TCP and issues one\n\
operation per invocation. Run dhcpm-server first."
)]
struct Args {
    /// Host address to connect to
    #[arg(long, default_value = DEFAULT_HOST)]
    host: String,

    /// Port number to connect to
    #[arg(long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Marshal requests in big-endian byte order
    #[arg(long)]
    big_endian: bool,

    /// Quiet mode - suppress informational output
    #[arg(short, long)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show the server version
    Version,
    /// List scopes
    Subnets,
    /// Create a scope
    CreateSubnet {
        subnet: Ipv4Addr,
        mask: Ipv4Addr,
        #[arg(long, default_value = "")]
        name: String,
        #[arg(long)]
        comment: Option<String>,
    },
    /// Show a scope
    GetSubnet { subnet: Ipv4Addr },
    /// Delete a scope and its leases
    DeleteSubnet {
        subnet: Ipv4Addr,
        /// Delete even if addresses are leased
        #[arg(long)]
        force: bool,
    },
    /// Set the address range of a scope
    AddRange {
        subnet: Ipv4Addr,
        start: Ipv4Addr,
        end: Ipv4Addr,
    },
    /// Exclude addresses from a scope's range
    AddExclusion {
        subnet: Ipv4Addr,
        start: Ipv4Addr,
        end: Ipv4Addr,
    },
    /// Reserve an address for a hardware address
    AddReservation {
        subnet: Ipv4Addr,
        address: Ipv4Addr,
        /// Hardware address, e.g. 00:11:22:33:44:55
        mac: String,
    },
    /// List the elements of a scope
    Elements { subnet: Ipv4Addr },
    /// List leases of a scope, or of all scopes with 0.0.0.0
    Clients { subnet: Ipv4Addr },
    /// Define an option
    CreateOption {
        id: u32,
        name: String,
        #[arg(long)]
        comment: Option<String>,
    },
    /// List option definitions
    Options,
    /// Set an IP address option value on a scope
    SetOption {
        subnet: Ipv4Addr,
        id: u32,
        addresses: Vec<Ipv4Addr>,
    },
    /// Show options a client would receive
    ClientOptions { address: Ipv4Addr, mask: Ipv4Addr },
    /// Show server statistics
    Mib,
    /// Show the server configuration
    Config,
    /// Check a scope's leases against its range
    Scan {
        subnet: Ipv4Addr,
        /// Remove the leases found
        #[arg(long)]
        fix: bool,
    },
    /// Show superscope membership
    SuperScopes,
    /// Add a scope to a superscope
    SetSuperScope { subnet: Ipv4Addr, name: String },
}

fn parse_mac(mac: &str) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
    mac.split([':', '-'])
        .map(|octet| u8::from_str_radix(octet, 16).map_err(Into::into))
        .collect()
}

/// Enumeration results, where running out of entries is not an error
fn listed<R: DhcpResponse>(response: R) -> dhcpm::Result<R> {
    if response.return_value() == dhcpm::error::ERROR_NO_MORE_ITEMS {
        Ok(response)
    } else {
        check(response)
    }
}

async fn run(client: &DhcpSrvClient, command: Command) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Command::Version => {
            let version = check(client.get_version(Default::default()).await?)?;
            println!("{}.{}", version.major_version, version.minor_version);
        }
        Command::Subnets => {
            let mut resume_handle = 0;
            loop {
                let response = client
                    .enum_subnets(EnumSubnetsRequest {
                        resume_handle,
                        preferred_maximum: 64,
                        ..Default::default()
                    })
                    .await?;
                if response.return_value == dhcpm::error::ERROR_NO_MORE_ITEMS {
                    break;
                }
                let response = check(response)?;
                let subnets = response.enum_info.into_inner().unwrap_or_default();
                for subnet in subnets.elements.iter() {
                    let info = check(
                        client
                            .get_subnet_info_vq(GetSubnetInfoVqRequest {
                                subnet_address: *subnet,
                                ..Default::default()
                            })
                            .await?,
                    )?;
                    let info = info.subnet_info.into_inner().unwrap_or_default();
                    println!(
                        "{:15} {:15} {:?} {}",
                        ipv4(info.subnet_address),
                        ipv4(info.subnet_mask),
                        info.subnet_state,
                        info.subnet_name.as_str().unwrap_or("")
                    );
                }
                if response.return_value != dhcpm::error::ERROR_MORE_DATA {
                    break;
                }
                resume_handle = response.resume_handle;
            }
        }
        Command::CreateSubnet {
            subnet,
            mask,
            name,
            comment,
        } => {
            check(
                client
                    .create_subnet(CreateSubnetRequest {
                        server_ip_address: LpWStr::null(),
                        subnet_address: dhcp_ip(subnet),
                        subnet_info: DhcpSubnetInfo {
                            subnet_address: dhcp_ip(subnet),
                            subnet_mask: dhcp_ip(mask),
                            subnet_name: name.as_str().into(),
                            subnet_comment: comment.map_or_else(LpWStr::null, LpWStr::from),
                            ..Default::default()
                        },
                    })
                    .await?,
            )?;
            println!("Created {}", subnet);
        }
        Command::GetSubnet { subnet } => {
            let response = check(
                client
                    .get_subnet_info(GetSubnetInfoRequest {
                        subnet_address: dhcp_ip(subnet),
                        ..Default::default()
                    })
                    .await?,
            )?;
            println!("{:#?}", response.subnet_info.into_inner().unwrap_or_default());
        }
        Command::DeleteSubnet { subnet, force } => {
            check(
                client
                    .delete_subnet(DeleteSubnetRequest {
                        subnet_address: dhcp_ip(subnet),
                        force_flag: if force {
                            DhcpForceFlag::FullForce
                        } else {
                            DhcpForceFlag::NoForce
                        },
                        ..Default::default()
                    })
                    .await?,
            )?;
            println!("Deleted {}", subnet);
        }
        Command::AddRange { subnet, start, end } => {
            let range = DhcpIpRange::new(dhcp_ip(start), dhcp_ip(end));
            add_element(client, subnet, DhcpSubnetElementDataV4::IpRange(UniquePtr::new(range)))
                .await?;
        }
        Command::AddExclusion { subnet, start, end } => {
            let range = DhcpIpRange::new(dhcp_ip(start), dhcp_ip(end));
            add_element(
                client,
                subnet,
                DhcpSubnetElementDataV4::ExcludeIpRange(UniquePtr::new(range)),
            )
            .await?;
        }
        Command::AddReservation { subnet, address, mac } => {
            let reservation = DhcpIpReservationV4 {
                reserved_ip_address: dhcp_ip(address),
                reserved_for_client: UniquePtr::new(DhcpBinaryData::from_mac(&parse_mac(&mac)?)),
                allowed_client_types: client_type::BOTH,
            };
            add_element(
                client,
                subnet,
                DhcpSubnetElementDataV4::ReservedIp(UniquePtr::new(reservation)),
            )
            .await?;
        }
        Command::Elements { subnet } => {
            for element_type in [
                DhcpSubnetElementType::IpRanges,
                DhcpSubnetElementType::ExcludedIpRanges,
                DhcpSubnetElementType::ReservedIps,
            ] {
                let response = listed(
                    client
                        .enum_subnet_elements_v4(EnumSubnetElementsV4Request {
                            subnet_address: dhcp_ip(subnet),
                            enum_element_type: element_type,
                            preferred_maximum: u32::MAX,
                            ..Default::default()
                        })
                        .await?,
                )?;
                let elements = response.enum_element_info.into_inner().unwrap_or_default();
                for element in elements.elements.iter() {
                    print_element(element);
                }
            }
        }
        Command::Clients { subnet } => {
            let response = listed(
                client
                    .enum_subnet_clients_vq(EnumSubnetClientsVqRequest {
                        subnet_address: dhcp_ip(subnet),
                        preferred_maximum: u32::MAX,
                        ..Default::default()
                    })
                    .await?,
            )?;
            let clients = response.client_info.into_inner().unwrap_or_default();
            for lease in clients.clients.iter().filter_map(|c| c.get()) {
                println!(
                    "{:15} {:20} {:?} {}",
                    ipv4(lease.client_ip_address),
                    lease.client_hardware_address,
                    lease.status,
                    lease.client_name.as_str().unwrap_or("")
                );
            }
            println!("{} of {} leases", response.clients_read, response.clients_total);
        }
        Command::CreateOption { id, name, comment } => {
            check(
                client
                    .create_option(CreateOptionRequest {
                        option_id: id,
                        option_info: DhcpOption {
                            option_id: id,
                            option_name: name.as_str().into(),
                            option_comment: comment.map_or_else(LpWStr::null, LpWStr::from),
                            ..Default::default()
                        },
                        ..Default::default()
                    })
                    .await?,
            )?;
            println!("Created option {}", id);
        }
        Command::Options => {
            let response = listed(
                client
                    .enum_options(EnumOptionsRequest {
                        preferred_maximum: u32::MAX,
                        ..Default::default()
                    })
                    .await?,
            )?;
            let options = response.options.into_inner().unwrap_or_default();
            for option in options.options.iter() {
                println!(
                    "{:3} {:30} {:?}",
                    option.option_id,
                    option.option_name.as_str().unwrap_or(""),
                    option.option_type
                );
            }
        }
        Command::SetOption {
            subnet,
            id,
            addresses,
        } => {
            let addresses: Vec<DhcpIpAddress> = addresses.into_iter().map(dhcp_ip).collect();
            check(
                client
                    .set_option_value(SetOptionValueRequest {
                        option_id: id,
                        scope_info: DhcpOptionScopeInfo::Subnet(dhcp_ip(subnet)),
                        option_value: DhcpOptionData::ip_addresses(&addresses),
                        ..Default::default()
                    })
                    .await?,
            )?;
            println!("Set option {} on {}", id, subnet);
        }
        Command::ClientOptions { address, mask } => {
            let response = check(
                client
                    .get_client_options(GetClientOptionsRequest {
                        client_ip_address: dhcp_ip(address),
                        client_subnet_mask: dhcp_ip(mask),
                        ..Default::default()
                    })
                    .await?,
            )?;
            let list = response.client_options.into_inner().unwrap_or_default();
            for value in list.options.iter() {
                println!("{:3} {:?}", value.option_id, value.value.elements);
            }
        }
        Command::Mib => {
            let response = check(client.get_mib_info_vq(Default::default()).await?)?;
            let mib = response.mib_info.into_inner().unwrap_or_default();
            println!(
                "discovers={} offers={} requests={} acks={} naks={} declines={} releases={}",
                mib.discovers, mib.offers, mib.requests, mib.acks, mib.naks, mib.declines, mib.releases
            );
            for scope in mib.scope_info.iter() {
                println!(
                    "{:15} in use {:5} free {:5} pending {:5}",
                    ipv4(scope.subnet),
                    scope.num_addresses_inuse,
                    scope.num_addresses_free,
                    scope.num_pending_offers
                );
            }
        }
        Command::Config => {
            let response = check(client.server_get_config_vq(Default::default()).await?)?;
            println!("{:#?}", response.config_info.into_inner().unwrap_or_default());
        }
        Command::Scan { subnet, fix } => {
            let response = check(
                client
                    .scan_database(ScanDatabaseRequest {
                        subnet_address: dhcp_ip(subnet),
                        fix_flag: fix as u32,
                        ..Default::default()
                    })
                    .await?,
            )?;
            let list = response.scan_list.into_inner().unwrap_or_default();
            for item in list.scan_items.iter() {
                println!("{:15} {:?}", ipv4(item.ip_address), item.scan_flag);
            }
            println!("{} inconsistencies", list.scan_items.len());
        }
        Command::SuperScopes => {
            let response = check(client.get_super_scope_info_v4(Default::default()).await?)?;
            let table = response.super_scope_table.into_inner().unwrap_or_default();
            for entry in table.entries.iter() {
                println!(
                    "{:15} {}",
                    ipv4(entry.subnet_address),
                    entry.super_scope_name.as_str().unwrap_or("-")
                );
            }
        }
        Command::SetSuperScope { subnet, name } => {
            check(
                client
                    .set_super_scope_v4(SetSuperScopeV4Request {
                        subnet_address: dhcp_ip(subnet),
                        super_scope_name: name.as_str().into(),
                        change_existing: true.into(),
                        ..Default::default()
                    })
                    .await?,
            )?;
            println!("Added {} to {}", subnet, name);
        }
    }
    Ok(())
}

async fn add_element(
    client: &DhcpSrvClient,
    subnet: Ipv4Addr,
    element: DhcpSubnetElementDataV4,
) -> Result<(), Box<dyn std::error::Error>> {
    check(
        client
            .add_subnet_element_v4(AddSubnetElementV4Request {
                subnet_address: dhcp_ip(subnet),
                add_element_info: element,
                ..Default::default()
            })
            .await?,
    )?;
    println!("Added to {}", subnet);
    Ok(())
}

fn print_element(element: &DhcpSubnetElementDataV4) {
    match element {
        DhcpSubnetElementDataV4::IpRange(range)
        | DhcpSubnetElementDataV4::IpRangeDhcpOnly(range)
        | DhcpSubnetElementDataV4::IpRangeDhcpBootp(range)
        | DhcpSubnetElementDataV4::IpRangeBootpOnly(range) => {
            if let Some(r) = range.get() {
                println!(
                    "range     {} - {} ({:?})",
                    ipv4(r.start_address),
                    ipv4(r.end_address),
                    element.element_type()
                );
            }
        }
        DhcpSubnetElementDataV4::ExcludeIpRange(range) => {
            if let Some(r) = range.get() {
                println!("exclude   {} - {}", ipv4(r.start_address), ipv4(r.end_address));
            }
        }
        DhcpSubnetElementDataV4::ReservedIp(reservation) => {
            if let Some(r) = reservation.get() {
                let uid = r.reserved_for_client.get().cloned().unwrap_or_default();
                println!("reserved  {} {}", ipv4(r.reserved_ip_address), uid);
            }
        }
        other => println!("{:?}", other),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(if args.quiet { Level::WARN } else { Level::INFO })
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let config = DceRpcClientConfig {
        ndr: NdrContext::with_byte_order(!args.big_endian),
        ..Default::default()
    };

    info!("Connecting to {}", addr);
    let client = DhcpSrvClient::connect_with_config(addr, config).await?;
    info!("Bound dhcpsrv v{}.{}", dhcpm::DHCPSRV_VERSION.0, dhcpm::DHCPSRV_VERSION.1);

    run(&client, args.command).await
}
