use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use dcerpc::{DceRpcClientConfig, DceRpcServer, FaultStatus, Result, RpcError};
use dhcpm::error::{self, check, DhcpError};
use dhcpm::ops::*;
use dhcpm::types::*;
use dhcpm::{create_dhcpsrv_interface, DhcpSrvClient, DhcpSrvServer};
use ndr::{LpWStr, NdrContext, UniquePtr};
use tokio::net::TcpListener;

#[derive(Default)]
struct ScopeStore {
    subnets: Mutex<BTreeMap<DhcpIpAddress, DhcpSubnetInfo>>,
}

#[async_trait::async_trait]
impl DhcpSrvServer for ScopeStore {
    async fn create_subnet(&self, request: CreateSubnetRequest) -> Result<CreateSubnetResponse> {
        let mut subnets = self.subnets.lock().unwrap();
        let status = if subnets.contains_key(&request.subnet_address) {
            error::ERROR_DHCP_SUBNET_EXITS
        } else {
            subnets.insert(request.subnet_address, request.subnet_info);
            error::ERROR_SUCCESS
        };
        Ok(CreateSubnetResponse::from_status(status))
    }

    async fn get_subnet_info(&self, request: GetSubnetInfoRequest) -> Result<GetSubnetInfoResponse> {
        Ok(match self.subnets.lock().unwrap().get(&request.subnet_address) {
            Some(info) => GetSubnetInfoResponse {
                subnet_info: UniquePtr::new(info.clone()),
                return_value: error::ERROR_SUCCESS,
            },
            None => GetSubnetInfoResponse::from_status(error::ERROR_DHCP_SUBNET_NOT_PRESENT),
        })
    }

    async fn enum_subnets(&self, request: EnumSubnetsRequest) -> Result<EnumSubnetsResponse> {
        let subnets = self.subnets.lock().unwrap();
        let total = subnets.len() as u32;
        let start = request.resume_handle as usize;
        if start >= subnets.len() {
            return Ok(EnumSubnetsResponse::from_status(error::ERROR_NO_MORE_ITEMS));
        }
        let page: Vec<DhcpIpAddress> = subnets
            .keys()
            .skip(start)
            .take(request.preferred_maximum.max(1) as usize)
            .copied()
            .collect();
        let next = start + page.len();
        Ok(EnumSubnetsResponse {
            resume_handle: next as u32,
            elements_read: page.len() as u32,
            elements_total: total,
            enum_info: UniquePtr::new(DhcpIpArray {
                elements: page.into(),
            }),
            return_value: if next < subnets.len() {
                error::ERROR_MORE_DATA
            } else {
                error::ERROR_SUCCESS
            },
        })
    }

    async fn delete_subnet(&self, request: DeleteSubnetRequest) -> Result<DeleteSubnetResponse> {
        let removed = self.subnets.lock().unwrap().remove(&request.subnet_address);
        Ok(DeleteSubnetResponse::from_status(match removed {
            Some(_) => error::ERROR_SUCCESS,
            None => error::ERROR_DHCP_SUBNET_NOT_PRESENT,
        }))
    }

    async fn get_version(&self, _request: GetVersionRequest) -> Result<GetVersionResponse> {
        Ok(GetVersionResponse {
            major_version: 10,
            minor_version: 0,
            return_value: error::ERROR_SUCCESS,
        })
    }

    async fn server_get_config_v4(
        &self,
        _request: ServerGetConfigV4Request,
    ) -> Result<ServerGetConfigV4Response> {
        Ok(ServerGetConfigV4Response {
            config_info: UniquePtr::new(DhcpServerConfigInfoV4 {
                api_protocol_support: api_protocol::RPC_OVER_TCPIP,
                database_name: "dhcp.mdb".into(),
                ping_retries: 2,
                boot_table: BootTableString::new("a,b,c\0d,e,f"),
                ..Default::default()
            }),
            return_value: error::ERROR_SUCCESS,
        })
    }
}

async fn start_server() -> SocketAddr {
    let server = DceRpcServer::new();
    server
        .register_interface(create_dhcpsrv_interface(Arc::new(ScopeStore::default())))
        .await;
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = server.serve_until(listener, std::future::pending()).await;
    });
    addr
}

fn subnet(address: DhcpIpAddress, name: &str) -> DhcpSubnetInfo {
    DhcpSubnetInfo {
        subnet_address: address,
        subnet_mask: 0xFFFFFF00,
        subnet_name: name.into(),
        subnet_comment: LpWStr::null(),
        primary_host: DhcpHostInfo::new(0x7F000001),
        subnet_state: DhcpSubnetState::Enabled,
    }
}

async fn create(client: &DhcpSrvClient, address: DhcpIpAddress, name: &str) -> u32 {
    client
        .create_subnet(CreateSubnetRequest {
            server_ip_address: "127.0.0.1".into(),
            subnet_address: address,
            subnet_info: subnet(address, name),
        })
        .await
        .unwrap()
        .return_value
}

#[tokio::test]
async fn test_subnet_lifecycle() {
    let addr = start_server().await;
    let client = DhcpSrvClient::connect(addr).await.unwrap();

    let version = check(client.get_version(Default::default()).await.unwrap()).unwrap();
    assert_eq!((version.major_version, version.minor_version), (10, 0));

    assert_eq!(create(&client, 0xC0A80100, "office").await, error::ERROR_SUCCESS);
    assert_eq!(create(&client, 0xC0A80100, "office").await, error::ERROR_DHCP_SUBNET_EXITS);

    let info = client
        .get_subnet_info(GetSubnetInfoRequest {
            server_ip_address: LpWStr::null(),
            subnet_address: 0xC0A80100,
        })
        .await
        .unwrap();
    assert_eq!(info.return_value, error::ERROR_SUCCESS);
    let info = info.subnet_info.into_inner().unwrap();
    assert_eq!(info, subnet(0xC0A80100, "office"));

    let deleted = client
        .delete_subnet(DeleteSubnetRequest {
            server_ip_address: LpWStr::null(),
            subnet_address: 0xC0A80100,
            force_flag: DhcpForceFlag::FullForce,
        })
        .await
        .unwrap();
    assert!(check(deleted).is_ok());

    let missing = client
        .get_subnet_info(GetSubnetInfoRequest {
            server_ip_address: LpWStr::null(),
            subnet_address: 0xC0A80100,
        })
        .await
        .unwrap();
    assert!(missing.subnet_info.get().is_none());
    match check(missing) {
        Err(err @ DhcpError::Status(_)) => {
            assert_eq!(err.name(), Some("ERROR_DHCP_SUBNET_NOT_PRESENT"))
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[tokio::test]
async fn test_enumeration_pages() {
    let addr = start_server().await;
    let client = DhcpSrvClient::connect(addr).await.unwrap();
    for (i, name) in ["a", "b", "c"].iter().enumerate() {
        create(&client, 0x0A000000 + ((i as u32) << 8), name).await;
    }

    let mut resume_handle = 0;
    let mut seen = Vec::new();
    loop {
        let page = client
            .enum_subnets(EnumSubnetsRequest {
                server_ip_address: LpWStr::null(),
                resume_handle,
                preferred_maximum: 2,
            })
            .await
            .unwrap();
        if page.return_value == error::ERROR_NO_MORE_ITEMS {
            break;
        }
        let page = check(page).unwrap();
        assert_eq!(page.elements_total, 3);
        let addresses = page.enum_info.into_inner().unwrap().elements.into_vec();
        assert_eq!(addresses.len() as u32, page.elements_read);
        seen.extend(addresses);
        resume_handle = page.resume_handle;
    }
    assert_eq!(seen, vec![0x0A000000, 0x0A000100, 0x0A000200]);
}

#[tokio::test]
async fn test_unimplemented_operation_faults() {
    let addr = start_server().await;
    let client = DhcpSrvClient::connect(addr).await.unwrap();

    let err = client.get_mib_info(Default::default()).await.unwrap_err();
    assert!(matches!(err, RpcError::Fault(status) if status == FaultStatus::OpRngError as u32));

    // The association survives the fault
    assert!(client.get_version(Default::default()).await.is_ok());
}

#[tokio::test]
async fn test_big_endian_client_and_fragmentation() {
    let addr = start_server().await;
    let config = DceRpcClientConfig {
        ndr: NdrContext::big_endian(),
        max_xmit_frag: 256,
        max_recv_frag: 256,
        ..Default::default()
    };
    let client = DhcpSrvClient::connect_with_config(addr, config).await.unwrap();
    assert_eq!(client.rpc().fragment_sizes(), (256, 256));

    let long_name = "x".repeat(300);
    assert_eq!(create(&client, 0xAC100000, &long_name).await, error::ERROR_SUCCESS);

    let info = client
        .get_subnet_info(GetSubnetInfoRequest {
            server_ip_address: LpWStr::null(),
            subnet_address: 0xAC100000,
        })
        .await
        .unwrap();
    let info = info.subnet_info.into_inner().unwrap();
    assert_eq!(info.subnet_name.as_str(), Some(long_name.as_str()));
}

#[tokio::test]
async fn test_boot_table_over_the_wire() {
    let addr = start_server().await;
    let client = DhcpSrvClient::connect(addr).await.unwrap();
    let config = client
        .server_get_config_v4(Default::default())
        .await
        .unwrap()
        .config_info
        .into_inner()
        .unwrap();
    assert_eq!(config.ping_retries, 2);
    assert_eq!(config.database_name.as_str(), Some("dhcp.mdb"));
    assert_eq!(config.boot_table.to_string_lossy().as_deref(), Some("a,b,c\0d,e,f"));
}
