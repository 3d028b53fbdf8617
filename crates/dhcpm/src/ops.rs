//! Parameter records of every `dhcpsrv` operation
//!
//! `XxxRequest` holds the `[in]` and `[in, out]` parameters in IDL order,
//! `XxxResponse` the `[in, out]` and `[out]` parameters followed by the
//! status the server returned. Each parameter is marshalled as its own
//! top-level construct:
//!
//! | IDL parameter                    | Rust field        |
//! |----------------------------------|-------------------|
//! | `[in, unique, string] LPWSTR`    | `LpWStr`          |
//! | `[in, ref] T*`                   | `T`               |
//! | `[in, out] DWORD*`               | `u32` both ways   |
//! | `[out] T**`                      | `UniquePtr<T>`    |
//! | `[in, ref, string] WCHAR*`       | `NdrWString`      |

use ndr::{Bool32, LpWStr, NdrWString, UniquePtr};

use crate::types::*;

/// Invoke `$callback!` with the operation table, one
/// `opnum => Variant, method, "IDL name", Request, Response;` row per
/// operation.
macro_rules! dhcpsrv_operations {
    ($callback:ident) => {
        $callback! {
            0 => CreateSubnet, create_subnet, "R_DhcpCreateSubnet", CreateSubnetRequest, CreateSubnetResponse;
            1 => SetSubnetInfo, set_subnet_info, "R_DhcpSetSubnetInfo", SetSubnetInfoRequest, SetSubnetInfoResponse;
            2 => GetSubnetInfo, get_subnet_info, "R_DhcpGetSubnetInfo", GetSubnetInfoRequest, GetSubnetInfoResponse;
            3 => EnumSubnets, enum_subnets, "R_DhcpEnumSubnets", EnumSubnetsRequest, EnumSubnetsResponse;
            4 => AddSubnetElement, add_subnet_element, "R_DhcpAddSubnetElement", AddSubnetElementRequest, AddSubnetElementResponse;
            5 => EnumSubnetElements, enum_subnet_elements, "R_DhcpEnumSubnetElements", EnumSubnetElementsRequest, EnumSubnetElementsResponse;
            6 => RemoveSubnetElement, remove_subnet_element, "R_DhcpRemoveSubnetElement", RemoveSubnetElementRequest, RemoveSubnetElementResponse;
            7 => DeleteSubnet, delete_subnet, "R_DhcpDeleteSubnet", DeleteSubnetRequest, DeleteSubnetResponse;
            8 => CreateOption, create_option, "R_DhcpCreateOption", CreateOptionRequest, CreateOptionResponse;
            9 => SetOptionInfo, set_option_info, "R_DhcpSetOptionInfo", SetOptionInfoRequest, SetOptionInfoResponse;
            10 => GetOptionInfo, get_option_info, "R_DhcpGetOptionInfo", GetOptionInfoRequest, GetOptionInfoResponse;
            11 => RemoveOption, remove_option, "R_DhcpRemoveOption", RemoveOptionRequest, RemoveOptionResponse;
            12 => SetOptionValue, set_option_value, "R_DhcpSetOptionValue", SetOptionValueRequest, SetOptionValueResponse;
            13 => GetOptionValue, get_option_value, "R_DhcpGetOptionValue", GetOptionValueRequest, GetOptionValueResponse;
            14 => EnumOptionValues, enum_option_values, "R_DhcpEnumOptionValues", EnumOptionValuesRequest, EnumOptionValuesResponse;
            15 => RemoveOptionValue, remove_option_value, "R_DhcpRemoveOptionValue", RemoveOptionValueRequest, RemoveOptionValueResponse;
            16 => CreateClientInfo, create_client_info, "R_DhcpCreateClientInfo", CreateClientInfoRequest, CreateClientInfoResponse;
            17 => SetClientInfo, set_client_info, "R_DhcpSetClientInfo", SetClientInfoRequest, SetClientInfoResponse;
            18 => GetClientInfo, get_client_info, "R_DhcpGetClientInfo", GetClientInfoRequest, GetClientInfoResponse;
            19 => DeleteClientInfo, delete_client_info, "R_DhcpDeleteClientInfo", DeleteClientInfoRequest, DeleteClientInfoResponse;
            20 => EnumSubnetClients, enum_subnet_clients, "R_DhcpEnumSubnetClients", EnumSubnetClientsRequest, EnumSubnetClientsResponse;
            21 => GetClientOptions, get_client_options, "R_DhcpGetClientOptions", GetClientOptionsRequest, GetClientOptionsResponse;
            22 => GetMibInfo, get_mib_info, "R_DhcpGetMibInfo", GetMibInfoRequest, GetMibInfoResponse;
            23 => EnumOptions, enum_options, "R_DhcpEnumOptions", EnumOptionsRequest, EnumOptionsResponse;
            24 => SetOptionValues, set_option_values, "R_DhcpSetOptionValues", SetOptionValuesRequest, SetOptionValuesResponse;
            25 => ServerSetConfig, server_set_config, "R_DhcpServerSetConfig", ServerSetConfigRequest, ServerSetConfigResponse;
            26 => ServerGetConfig, server_get_config, "R_DhcpServerGetConfig", ServerGetConfigRequest, ServerGetConfigResponse;
            27 => ScanDatabase, scan_database, "R_DhcpScanDatabase", ScanDatabaseRequest, ScanDatabaseResponse;
            28 => GetVersion, get_version, "R_DhcpGetVersion", GetVersionRequest, GetVersionResponse;
            29 => AddSubnetElementV4, add_subnet_element_v4, "R_DhcpAddSubnetElementV4", AddSubnetElementV4Request, AddSubnetElementV4Response;
            30 => EnumSubnetElementsV4, enum_subnet_elements_v4, "R_DhcpEnumSubnetElementsV4", EnumSubnetElementsV4Request, EnumSubnetElementsV4Response;
            31 => RemoveSubnetElementV4, remove_subnet_element_v4, "R_DhcpRemoveSubnetElementV4", RemoveSubnetElementV4Request, RemoveSubnetElementV4Response;
            32 => CreateClientInfoV4, create_client_info_v4, "R_DhcpCreateClientInfoV4", CreateClientInfoV4Request, CreateClientInfoV4Response;
            33 => SetClientInfoV4, set_client_info_v4, "R_DhcpSetClientInfoV4", SetClientInfoV4Request, SetClientInfoV4Response;
            34 => GetClientInfoV4, get_client_info_v4, "R_DhcpGetClientInfoV4", GetClientInfoV4Request, GetClientInfoV4Response;
            35 => EnumSubnetClientsV4, enum_subnet_clients_v4, "R_DhcpEnumSubnetClientsV4", EnumSubnetClientsV4Request, EnumSubnetClientsV4Response;
            36 => SetSuperScopeV4, set_super_scope_v4, "R_DhcpSetSuperScopeV4", SetSuperScopeV4Request, SetSuperScopeV4Response;
            37 => GetSuperScopeInfoV4, get_super_scope_info_v4, "R_DhcpGetSuperScopeInfoV4", GetSuperScopeInfoV4Request, GetSuperScopeInfoV4Response;
            38 => DeleteSuperScopeV4, delete_super_scope_v4, "R_DhcpDeleteSuperScopeV4", DeleteSuperScopeV4Request, DeleteSuperScopeV4Response;
            39 => ServerSetConfigV4, server_set_config_v4, "R_DhcpServerSetConfigV4", ServerSetConfigV4Request, ServerSetConfigV4Response;
            40 => ServerGetConfigV4, server_get_config_v4, "R_DhcpServerGetConfigV4", ServerGetConfigV4Request, ServerGetConfigV4Response;
            41 => ServerSetConfigVq, server_set_config_vq, "R_DhcpServerSetConfigVQ", ServerSetConfigVqRequest, ServerSetConfigVqResponse;
            42 => ServerGetConfigVq, server_get_config_vq, "R_DhcpServerGetConfigVQ", ServerGetConfigVqRequest, ServerGetConfigVqResponse;
            43 => GetMibInfoVq, get_mib_info_vq, "R_DhcpGetMibInfoVQ", GetMibInfoVqRequest, GetMibInfoVqResponse;
            44 => CreateClientInfoVq, create_client_info_vq, "R_DhcpCreateClientInfoVQ", CreateClientInfoVqRequest, CreateClientInfoVqResponse;
            45 => SetClientInfoVq, set_client_info_vq, "R_DhcpSetClientInfoVQ", SetClientInfoVqRequest, SetClientInfoVqResponse;
            46 => EnumSubnetClientsVq, enum_subnet_clients_vq, "R_DhcpEnumSubnetClientsVQ", EnumSubnetClientsVqRequest, EnumSubnetClientsVqResponse;
            47 => GetClientInfoVq, get_client_info_vq, "R_DhcpGetClientInfoVQ", GetClientInfoVqRequest, GetClientInfoVqResponse;
            48 => CreateSubnetVq, create_subnet_vq, "R_DhcpCreateSubnetVQ", CreateSubnetVqRequest, CreateSubnetVqResponse;
            49 => GetSubnetInfoVq, get_subnet_info_vq, "R_DhcpGetSubnetInfoVQ", GetSubnetInfoVqRequest, GetSubnetInfoVqResponse;
            50 => SetSubnetInfoVq, set_subnet_info_vq, "R_DhcpSetSubnetInfoVQ", SetSubnetInfoVqRequest, SetSubnetInfoVqResponse;
        }
    };
}

pub(crate) use dhcpsrv_operations;

macro_rules! define_opnum {
    ($($opnum:literal => $variant:ident, $method:ident, $idl:literal, $req:ident, $resp:ident;)*) => {
        /// Operation numbers of the `dhcpsrv` interface
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[repr(u16)]
        pub enum Opnum {
            $(
                #[doc = $idl]
                $variant = $opnum,
            )*
        }

        impl Opnum {
            pub const ALL: &'static [Opnum] = &[$(Opnum::$variant),*];

            /// Name of the operation in the IDL
            pub fn name(&self) -> &'static str {
                match self {
                    $( Opnum::$variant => $idl, )*
                }
            }
        }

        impl TryFrom<u16> for Opnum {
            type Error = u16;

            fn try_from(value: u16) -> Result<Self, u16> {
                match value {
                    $( $opnum => Ok(Opnum::$variant), )*
                    other => Err(other),
                }
            }
        }
    };
}

dhcpsrv_operations!(define_opnum);

impl From<Opnum> for u16 {
    fn from(opnum: Opnum) -> u16 {
        opnum as u16
    }
}

impl std::fmt::Display for Opnum {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name(), *self as u16)
    }
}

ndr::ndr_params! {
    pub struct CreateSubnetRequest {
        pub server_ip_address: DhcpSrvHandle,
        pub subnet_address: DhcpIpAddress,
        pub subnet_info: DhcpSubnetInfo,
    }
    pub struct CreateSubnetResponse {
        pub return_value: u32,
    }

    pub struct SetSubnetInfoRequest {
        pub server_ip_address: DhcpSrvHandle,
        pub subnet_address: DhcpIpAddress,
        pub subnet_info: DhcpSubnetInfo,
    }
    pub struct SetSubnetInfoResponse {
        pub return_value: u32,
    }

    pub struct GetSubnetInfoRequest {
        pub server_ip_address: DhcpSrvHandle,
        pub subnet_address: DhcpIpAddress,
    }
    pub struct GetSubnetInfoResponse {
        pub subnet_info: UniquePtr<DhcpSubnetInfo>,
        pub return_value: u32,
    }

    pub struct EnumSubnetsRequest {
        pub server_ip_address: DhcpSrvHandle,
        pub resume_handle: DhcpResumeHandle,
        pub preferred_maximum: u32,
    }
    pub struct EnumSubnetsResponse {
        pub resume_handle: DhcpResumeHandle,
        pub enum_info: UniquePtr<DhcpIpArray>,
        pub elements_read: u32,
        pub elements_total: u32,
        pub return_value: u32,
    }

    pub struct AddSubnetElementRequest {
        pub server_ip_address: DhcpSrvHandle,
        pub subnet_address: DhcpIpAddress,
        pub add_element_info: DhcpSubnetElementData,
    }
    pub struct AddSubnetElementResponse {
        pub return_value: u32,
    }

    pub struct EnumSubnetElementsRequest {
        pub server_ip_address: DhcpSrvHandle,
        pub subnet_address: DhcpIpAddress,
        pub enum_element_type: DhcpSubnetElementType,
        pub resume_handle: DhcpResumeHandle,
        pub preferred_maximum: u32,
    }
    pub struct EnumSubnetElementsResponse {
        pub resume_handle: DhcpResumeHandle,
        pub enum_element_info: UniquePtr<DhcpSubnetElementInfoArray>,
        pub elements_read: u32,
        pub elements_total: u32,
        pub return_value: u32,
    }

    pub struct RemoveSubnetElementRequest {
        pub server_ip_address: DhcpSrvHandle,
        pub subnet_address: DhcpIpAddress,
        pub remove_element_info: DhcpSubnetElementData,
        pub force_flag: DhcpForceFlag,
    }
    pub struct RemoveSubnetElementResponse {
        pub return_value: u32,
    }

    pub struct DeleteSubnetRequest {
        pub server_ip_address: DhcpSrvHandle,
        pub subnet_address: DhcpIpAddress,
        pub force_flag: DhcpForceFlag,
    }
    pub struct DeleteSubnetResponse {
        pub return_value: u32,
    }

    pub struct CreateOptionRequest {
        pub server_ip_address: DhcpSrvHandle,
        pub option_id: DhcpOptionId,
        pub option_info: DhcpOption,
    }
    pub struct CreateOptionResponse {
        pub return_value: u32,
    }

    pub struct SetOptionInfoRequest {
        pub server_ip_address: DhcpSrvHandle,
        pub option_id: DhcpOptionId,
        pub option_info: DhcpOption,
    }
    pub struct SetOptionInfoResponse {
        pub return_value: u32,
    }

    pub struct GetOptionInfoRequest {
        pub server_ip_address: DhcpSrvHandle,
        pub option_id: DhcpOptionId,
    }
    pub struct GetOptionInfoResponse {
        pub option_info: UniquePtr<DhcpOption>,
        pub return_value: u32,
    }

    pub struct RemoveOptionRequest {
        pub server_ip_address: DhcpSrvHandle,
        pub option_id: DhcpOptionId,
    }
    pub struct RemoveOptionResponse {
        pub return_value: u32,
    }

    pub struct SetOptionValueRequest {
        pub server_ip_address: DhcpSrvHandle,
        pub option_id: DhcpOptionId,
        pub scope_info: DhcpOptionScopeInfo,
        pub option_value: DhcpOptionData,
    }
    pub struct SetOptionValueResponse {
        pub return_value: u32,
    }

    pub struct GetOptionValueRequest {
        pub server_ip_address: DhcpSrvHandle,
        pub option_id: DhcpOptionId,
        pub scope_info: DhcpOptionScopeInfo,
    }
    pub struct GetOptionValueResponse {
        pub option_value: UniquePtr<DhcpOptionValue>,
        pub return_value: u32,
    }

    pub struct EnumOptionValuesRequest {
        pub server_ip_address: DhcpSrvHandle,
        pub scope_info: DhcpOptionScopeInfo,
        pub resume_handle: DhcpResumeHandle,
        pub preferred_maximum: u32,
    }
    pub struct EnumOptionValuesResponse {
        pub resume_handle: DhcpResumeHandle,
        pub option_values: UniquePtr<DhcpOptionValueArray>,
        pub options_read: u32,
        pub options_total: u32,
        pub return_value: u32,
    }

    pub struct RemoveOptionValueRequest {
        pub server_ip_address: DhcpSrvHandle,
        pub option_id: DhcpOptionId,
        pub scope_info: DhcpOptionScopeInfo,
    }
    pub struct RemoveOptionValueResponse {
        pub return_value: u32,
    }

    pub struct CreateClientInfoRequest {
        pub server_ip_address: DhcpSrvHandle,
        pub client_info: DhcpClientInfo,
    }
    pub struct CreateClientInfoResponse {
        pub return_value: u32,
    }

    pub struct SetClientInfoRequest {
        pub server_ip_address: DhcpSrvHandle,
        pub client_info: DhcpClientInfo,
    }
    pub struct SetClientInfoResponse {
        pub return_value: u32,
    }

    pub struct GetClientInfoRequest {
        pub server_ip_address: DhcpSrvHandle,
        pub search_info: DhcpSearchInfo,
    }
    pub struct GetClientInfoResponse {
        pub client_info: UniquePtr<DhcpClientInfo>,
        pub return_value: u32,
    }

    pub struct DeleteClientInfoRequest {
        pub server_ip_address: DhcpSrvHandle,
        pub client_info: DhcpSearchInfo,
    }
    pub struct DeleteClientInfoResponse {
        pub return_value: u32,
    }

    pub struct EnumSubnetClientsRequest {
        pub server_ip_address: DhcpSrvHandle,
        pub subnet_address: DhcpIpAddress,
        pub resume_handle: DhcpResumeHandle,
        pub preferred_maximum: u32,
    }
    pub struct EnumSubnetClientsResponse {
        pub resume_handle: DhcpResumeHandle,
        pub client_info: UniquePtr<DhcpClientInfoArray>,
        pub clients_read: u32,
        pub clients_total: u32,
        pub return_value: u32,
    }

    pub struct GetClientOptionsRequest {
        pub server_ip_address: DhcpSrvHandle,
        pub client_ip_address: DhcpIpAddress,
        pub client_subnet_mask: DhcpIpMask,
    }
    pub struct GetClientOptionsResponse {
        pub client_options: UniquePtr<DhcpOptionList>,
        pub return_value: u32,
    }

    pub struct GetMibInfoRequest {
        pub server_ip_address: DhcpSrvHandle,
    }
    pub struct GetMibInfoResponse {
        pub mib_info: UniquePtr<DhcpMibInfo>,
        pub return_value: u32,
    }

    pub struct EnumOptionsRequest {
        pub server_ip_address: DhcpSrvHandle,
        pub resume_handle: DhcpResumeHandle,
        pub preferred_maximum: u32,
    }
    pub struct EnumOptionsResponse {
        pub resume_handle: DhcpResumeHandle,
        pub options: UniquePtr<DhcpOptionArray>,
        pub options_read: u32,
        pub options_total: u32,
        pub return_value: u32,
    }

    pub struct SetOptionValuesRequest {
        pub server_ip_address: DhcpSrvHandle,
        pub scope_info: DhcpOptionScopeInfo,
        pub option_values: DhcpOptionValueArray,
    }
    pub struct SetOptionValuesResponse {
        pub return_value: u32,
    }

    pub struct ServerSetConfigRequest {
        pub server_ip_address: DhcpSrvHandle,
        pub fields_to_set: u32,
        pub config_info: DhcpServerConfigInfo,
    }
    pub struct ServerSetConfigResponse {
        pub return_value: u32,
    }

    pub struct ServerGetConfigRequest {
        pub server_ip_address: DhcpSrvHandle,
    }
    pub struct ServerGetConfigResponse {
        pub config_info: UniquePtr<DhcpServerConfigInfo>,
        pub return_value: u32,
    }

    pub struct ScanDatabaseRequest {
        pub server_ip_address: DhcpSrvHandle,
        pub subnet_address: DhcpIpAddress,
        /// Non-zero to repair the inconsistencies found
        pub fix_flag: u32,
    }
    pub struct ScanDatabaseResponse {
        pub scan_list: UniquePtr<DhcpScanList>,
        pub return_value: u32,
    }

    pub struct GetVersionRequest {
        pub server_ip_address: DhcpSrvHandle,
    }
    pub struct GetVersionResponse {
        pub major_version: u32,
        pub minor_version: u32,
        pub return_value: u32,
    }

    pub struct AddSubnetElementV4Request {
        pub server_ip_address: DhcpSrvHandle,
        pub subnet_address: DhcpIpAddress,
        pub add_element_info: DhcpSubnetElementDataV4,
    }
    pub struct AddSubnetElementV4Response {
        pub return_value: u32,
    }

    pub struct EnumSubnetElementsV4Request {
        pub server_ip_address: DhcpSrvHandle,
        pub subnet_address: DhcpIpAddress,
        pub enum_element_type: DhcpSubnetElementType,
        pub resume_handle: DhcpResumeHandle,
        pub preferred_maximum: u32,
    }
    pub struct EnumSubnetElementsV4Response {
        pub resume_handle: DhcpResumeHandle,
        pub enum_element_info: UniquePtr<DhcpSubnetElementInfoArrayV4>,
        pub elements_read: u32,
        pub elements_total: u32,
        pub return_value: u32,
    }

    pub struct RemoveSubnetElementV4Request {
        pub server_ip_address: DhcpSrvHandle,
        pub subnet_address: DhcpIpAddress,
        pub remove_element_info: DhcpSubnetElementDataV4,
        pub force_flag: DhcpForceFlag,
    }
    pub struct RemoveSubnetElementV4Response {
        pub return_value: u32,
    }

    pub struct CreateClientInfoV4Request {
        pub server_ip_address: DhcpSrvHandle,
        pub client_info: DhcpClientInfoV4,
    }
    pub struct CreateClientInfoV4Response {
        pub return_value: u32,
    }

    pub struct SetClientInfoV4Request {
        pub server_ip_address: DhcpSrvHandle,
        pub client_info: DhcpClientInfoV4,
    }
    pub struct SetClientInfoV4Response {
        pub return_value: u32,
    }

    pub struct GetClientInfoV4Request {
        pub server_ip_address: DhcpSrvHandle,
        pub search_info: DhcpSearchInfo,
    }
    pub struct GetClientInfoV4Response {
        pub client_info: UniquePtr<DhcpClientInfoV4>,
        pub return_value: u32,
    }

    pub struct EnumSubnetClientsV4Request {
        pub server_ip_address: DhcpSrvHandle,
        pub subnet_address: DhcpIpAddress,
        pub resume_handle: DhcpResumeHandle,
        pub preferred_maximum: u32,
    }
    pub struct EnumSubnetClientsV4Response {
        pub resume_handle: DhcpResumeHandle,
        pub client_info: UniquePtr<DhcpClientInfoArrayV4>,
        pub clients_read: u32,
        pub clients_total: u32,
        pub return_value: u32,
    }

    pub struct SetSuperScopeV4Request {
        pub server_ip_address: DhcpSrvHandle,
        pub subnet_address: DhcpIpAddress,
        /// Null removes the subnet from its superscope
        pub super_scope_name: LpWStr,
        pub change_existing: Bool32,
    }
    pub struct SetSuperScopeV4Response {
        pub return_value: u32,
    }

    pub struct GetSuperScopeInfoV4Request {
        pub server_ip_address: DhcpSrvHandle,
    }
    pub struct GetSuperScopeInfoV4Response {
        pub super_scope_table: UniquePtr<DhcpSuperScopeTable>,
        pub return_value: u32,
    }

    pub struct DeleteSuperScopeV4Request {
        pub server_ip_address: DhcpSrvHandle,
        pub super_scope_name: NdrWString,
    }
    pub struct DeleteSuperScopeV4Response {
        pub return_value: u32,
    }

    pub struct ServerSetConfigV4Request {
        pub server_ip_address: DhcpSrvHandle,
        pub fields_to_set: u32,
        pub config_info: DhcpServerConfigInfoV4,
    }
    pub struct ServerSetConfigV4Response {
        pub return_value: u32,
    }

    pub struct ServerGetConfigV4Request {
        pub server_ip_address: DhcpSrvHandle,
    }
    pub struct ServerGetConfigV4Response {
        pub config_info: UniquePtr<DhcpServerConfigInfoV4>,
        pub return_value: u32,
    }

    pub struct ServerSetConfigVqRequest {
        pub server_ip_address: DhcpSrvHandle,
        pub fields_to_set: u32,
        pub config_info: DhcpServerConfigInfoVq,
    }
    pub struct ServerSetConfigVqResponse {
        pub return_value: u32,
    }

    pub struct ServerGetConfigVqRequest {
        pub server_ip_address: DhcpSrvHandle,
    }
    pub struct ServerGetConfigVqResponse {
        pub config_info: UniquePtr<DhcpServerConfigInfoVq>,
        pub return_value: u32,
    }

    pub struct GetMibInfoVqRequest {
        pub server_ip_address: DhcpSrvHandle,
    }
    pub struct GetMibInfoVqResponse {
        pub mib_info: UniquePtr<DhcpMibInfoVq>,
        pub return_value: u32,
    }

    pub struct CreateClientInfoVqRequest {
        pub server_ip_address: DhcpSrvHandle,
        pub client_info: DhcpClientInfoVq,
    }
    pub struct CreateClientInfoVqResponse {
        pub return_value: u32,
    }

    pub struct SetClientInfoVqRequest {
        pub server_ip_address: DhcpSrvHandle,
        pub client_info: DhcpClientInfoVq,
    }
    pub struct SetClientInfoVqResponse {
        pub return_value: u32,
    }

    pub struct EnumSubnetClientsVqRequest {
        pub server_ip_address: DhcpSrvHandle,
        pub subnet_address: DhcpIpAddress,
        pub resume_handle: DhcpResumeHandle,
        pub preferred_maximum: u32,
    }
    pub struct EnumSubnetClientsVqResponse {
        pub resume_handle: DhcpResumeHandle,
        pub client_info: UniquePtr<DhcpClientInfoArrayVq>,
        pub clients_read: u32,
        pub clients_total: u32,
        pub return_value: u32,
    }

    pub struct GetClientInfoVqRequest {
        pub server_ip_address: DhcpSrvHandle,
        pub search_info: DhcpSearchInfo,
    }
    pub struct GetClientInfoVqResponse {
        pub client_info: UniquePtr<DhcpClientInfoVq>,
        pub return_value: u32,
    }

    pub struct CreateSubnetVqRequest {
        pub server_ip_address: DhcpSrvHandle,
        pub subnet_address: DhcpIpAddress,
        pub subnet_info: DhcpSubnetInfoVq,
    }
    pub struct CreateSubnetVqResponse {
        pub return_value: u32,
    }

    pub struct GetSubnetInfoVqRequest {
        pub server_ip_address: DhcpSrvHandle,
        pub subnet_address: DhcpIpAddress,
    }
    pub struct GetSubnetInfoVqResponse {
        pub subnet_info: UniquePtr<DhcpSubnetInfoVq>,
        pub return_value: u32,
    }

    pub struct SetSubnetInfoVqRequest {
        pub server_ip_address: DhcpSrvHandle,
        pub subnet_address: DhcpIpAddress,
        pub subnet_info: DhcpSubnetInfoVq,
    }
    pub struct SetSubnetInfoVqResponse {
        pub return_value: u32,
    }
}

/// Responses that end with a status code
pub trait DhcpResponse {
    fn return_value(&self) -> u32;

    /// Response carrying only `status`, every out parameter left empty
    fn from_status(status: u32) -> Self;
}

macro_rules! impl_dhcp_response {
    ($($opnum:literal => $variant:ident, $method:ident, $idl:literal, $req:ident, $resp:ident;)*) => {
        $(
            impl DhcpResponse for $resp {
                fn return_value(&self) -> u32 {
                    self.return_value
                }

                fn from_status(status: u32) -> Self {
                    Self {
                        return_value: status,
                        ..Default::default()
                    }
                }
            }
        )*
    };
}

dhcpsrv_operations!(impl_dhcp_response);
