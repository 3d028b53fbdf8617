//! In-memory DHCP server behind the `dhcpsrv` interface
//!
//! Scopes, option definitions, option values, leases and the server
//! configuration live in one [`State`] guarded by a mutex. Every
//! operation of the interface is served; version variants share the same
//! records and convert on the way in and out.

use std::collections::BTreeMap;
use std::time::SystemTime;

use dcerpc::Result;
use dhcpm::error::*;
use dhcpm::ops::*;
use dhcpm::types::*;
use dhcpm::DhcpSrvServer;
use ndr::{LpWStr, UniquePtr};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::common::{SERVER_VERSION_MAJOR, SERVER_VERSION_MINOR};

/// Outcome of a state change: `Err` holds the status to return
type Status<T = ()> = std::result::Result<T, u32>;

fn status_of(result: Status) -> u32 {
    result.err().unwrap_or(ERROR_SUCCESS)
}

#[derive(Debug, Default)]
struct Scope {
    info: DhcpSubnetInfoVq,
    elements: Vec<DhcpSubnetElementDataV4>,
    option_values: BTreeMap<DhcpOptionId, DhcpOptionData>,
    super_scope: Option<String>,
}

impl Scope {
    fn contains(&self, address: DhcpIpAddress) -> bool {
        address & self.info.subnet_mask == self.info.subnet_address
    }

    fn ip_range(&self) -> Option<DhcpIpRange> {
        self.elements.iter().find_map(|e| e.ip_range().and_then(|r| r.get().copied()))
    }

    fn reservation(&self, address: DhcpIpAddress) -> Option<&DhcpIpReservationV4> {
        self.elements.iter().find_map(|e| match e {
            DhcpSubnetElementDataV4::ReservedIp(r) => {
                r.get().filter(|r| r.reserved_ip_address == address)
            }
            _ => None,
        })
    }

    /// Addresses the scope can lease: its range minus exclusions.
    ///
    /// Exclusions are clipped to the range and merged, so overlapping ones
    /// are subtracted once.
    fn capacity(&self) -> u32 {
        let Some(range) = self.ip_range() else {
            return 0;
        };
        let mut exclusions: Vec<(u64, u64)> = self
            .elements
            .iter()
            .filter_map(|e| match e {
                DhcpSubnetElementDataV4::ExcludeIpRange(r) => r.get(),
                _ => None,
            })
            .map(|r| {
                (
                    r.start_address.max(range.start_address) as u64,
                    r.end_address.min(range.end_address) as u64,
                )
            })
            .filter(|(start, end)| start <= end)
            .collect();
        exclusions.sort_unstable();

        let mut excluded = 0u64;
        let mut covered_to: Option<u64> = None;
        for (start, end) in exclusions {
            let start = covered_to.map_or(start, |c| start.max(c + 1));
            if start <= end {
                excluded += end - start + 1;
            }
            covered_to = Some(covered_to.map_or(end, |c| c.max(end)));
        }
        let total = range.end_address as u64 - range.start_address as u64 + 1;
        total.saturating_sub(excluded).min(u32::MAX as u64) as u32
    }
}

/// One page of an enumeration
struct Page<T> {
    items: Vec<T>,
    resume_handle: u32,
    total: u32,
    status: u32,
}

impl<T> Page<T> {
    /// Entries from `resume_handle` on, at most `preferred_maximum` of them.
    /// The resume handle is the index of the next entry.
    fn of(items: Vec<T>, resume_handle: u32, preferred_maximum: u32) -> Self {
        let total = items.len();
        let start = resume_handle as usize;
        if start >= total {
            return Self {
                items: Vec::new(),
                resume_handle,
                total: total as u32,
                status: ERROR_NO_MORE_ITEMS,
            };
        }
        let items: Vec<T> = items
            .into_iter()
            .skip(start)
            .take((preferred_maximum as usize).max(1))
            .collect();
        let next = start + items.len();
        Self {
            items,
            resume_handle: next as u32,
            total: total as u32,
            status: if next < total {
                ERROR_MORE_DATA
            } else {
                ERROR_SUCCESS
            },
        }
    }

    fn read(&self) -> u32 {
        self.items.len() as u32
    }

    fn is_exhausted(&self) -> bool {
        self.status == ERROR_NO_MORE_ITEMS
    }
}

#[derive(Debug, Default)]
struct State {
    scopes: BTreeMap<DhcpIpAddress, Scope>,
    options: BTreeMap<DhcpOptionId, DhcpOption>,
    global_values: BTreeMap<DhcpOptionId, DhcpOptionData>,
    /// Values set on reservations, keyed by reserved address
    reserved_values: BTreeMap<DhcpIpAddress, BTreeMap<DhcpOptionId, DhcpOptionData>>,
    clients: BTreeMap<DhcpIpAddress, DhcpClientInfoVq>,
    config: DhcpServerConfigInfoVq,
}

impl State {
    fn scope(&self, subnet: DhcpIpAddress) -> Status<&Scope> {
        self.scopes.get(&subnet).ok_or(ERROR_DHCP_SUBNET_NOT_PRESENT)
    }

    fn scope_mut(&mut self, subnet: DhcpIpAddress) -> Status<&mut Scope> {
        self.scopes.get_mut(&subnet).ok_or(ERROR_DHCP_SUBNET_NOT_PRESENT)
    }

    fn scope_of(&self, address: DhcpIpAddress) -> Option<&Scope> {
        self.scopes.values().find(|s| s.contains(address))
    }

    fn is_reserved(&self, address: DhcpIpAddress) -> bool {
        self.scope_of(address)
            .map_or(false, |s| s.reservation(address).is_some())
    }

    fn create_subnet(&mut self, subnet: DhcpIpAddress, info: DhcpSubnetInfoVq) -> Status {
        if self.scopes.contains_key(&subnet) {
            return Err(ERROR_DHCP_SUBNET_EXITS);
        }
        let mask = info.subnet_mask;
        let consistent = mask != 0 && info.subnet_address == subnet && subnet & !mask == 0;
        let overlaps = self.scopes.values().any(|s| {
            let common = mask & s.info.subnet_mask;
            subnet & common == s.info.subnet_address & common
        });
        if !consistent || overlaps {
            return Err(ERROR_DHCP_SUBNET_EXISTS);
        }
        info!("Created scope {} ({})", ipv4(subnet), info.subnet_name.as_str().unwrap_or(""));
        self.scopes.insert(
            subnet,
            Scope {
                info,
                ..Default::default()
            },
        );
        Ok(())
    }

    /// Rename or change the state of a scope; address and mask are fixed
    fn set_subnet(&mut self, subnet: DhcpIpAddress, info: DhcpSubnetInfoVq) -> Status {
        let scope = self.scope_mut(subnet)?;
        if info.subnet_address != subnet || info.subnet_mask != scope.info.subnet_mask {
            return Err(ERROR_INVALID_PARAMETER);
        }
        scope.info = info;
        Ok(())
    }

    fn delete_subnet(&mut self, subnet: DhcpIpAddress, force: DhcpForceFlag) -> Status {
        let scope = self.scope(subnet)?;
        let leased: Vec<DhcpIpAddress> =
            self.clients.keys().copied().filter(|ip| scope.contains(*ip)).collect();
        if force == DhcpForceFlag::NoForce && !leased.is_empty() {
            return Err(ERROR_DHCP_ELEMENT_CANT_REMOVE);
        }
        for ip in leased {
            self.clients.remove(&ip);
            self.reserved_values.remove(&ip);
        }
        self.scopes.remove(&subnet);
        info!("Deleted scope {}", ipv4(subnet));
        Ok(())
    }

    fn add_element(&mut self, subnet: DhcpIpAddress, element: DhcpSubnetElementDataV4) -> Status {
        let scope = self.scope_mut(subnet)?;
        match &element {
            DhcpSubnetElementDataV4::IpRange(range)
            | DhcpSubnetElementDataV4::IpRangeDhcpOnly(range)
            | DhcpSubnetElementDataV4::IpRangeDhcpBootp(range)
            | DhcpSubnetElementDataV4::IpRangeBootpOnly(range) => {
                let range = *range.get().ok_or(ERROR_INVALID_PARAMETER)?;
                if range.start_address > range.end_address
                    || !scope.contains(range.start_address)
                    || !scope.contains(range.end_address)
                {
                    return Err(ERROR_DHCP_INVALID_RANGE);
                }
                match scope.ip_range() {
                    Some(existing) if existing == range => return Err(ERROR_DHCP_IPRANGE_EXITS),
                    Some(existing)
                        if range.start_address <= existing.start_address
                            && range.end_address >= existing.end_address =>
                    {
                        // Extending the range replaces it
                        scope.elements.retain(|e| e.ip_range().is_none());
                    }
                    Some(_) => return Err(ERROR_DHCP_INVALID_RANGE),
                    None => {}
                }
                scope.elements.push(element);
            }
            DhcpSubnetElementDataV4::ExcludeIpRange(range) => {
                let range = range.get().ok_or(ERROR_INVALID_PARAMETER)?;
                if range.start_address > range.end_address
                    || !scope.contains(range.start_address)
                    || !scope.contains(range.end_address)
                {
                    return Err(ERROR_DHCP_INVALID_RANGE);
                }
                if scope.elements.contains(&element) {
                    return Err(ERROR_DHCP_IPRANGE_EXITS);
                }
                scope.elements.push(element);
            }
            DhcpSubnetElementDataV4::ReservedIp(reservation) => {
                let reservation = reservation.get().ok_or(ERROR_INVALID_PARAMETER)?.clone();
                let address = reservation.reserved_ip_address;
                if !scope.contains(address) {
                    return Err(ERROR_INVALID_PARAMETER);
                }
                let uid = reservation.reserved_for_client.get().cloned().unwrap_or_default();
                let taken = scope.elements.iter().any(|e| match e {
                    DhcpSubnetElementDataV4::ReservedIp(r) => r.get().map_or(false, |r| {
                        r.reserved_ip_address == address
                            || (!uid.is_empty() && r.reserved_for_client.get() == Some(&uid))
                    }),
                    _ => false,
                });
                if taken {
                    return Err(ERROR_DHCP_RESERVEDIP_EXITS);
                }
                let mask = scope.info.subnet_mask;
                scope.elements.push(element);

                let client = self.clients.entry(address).or_default();
                client.client_ip_address = address;
                client.subnet_mask = mask;
                client.client_hardware_address = uid;
                client.client_lease_expires = DateTime::INFINITE;
                client.client_type = reservation.allowed_client_types;
                client.address_state = address_state::ACTIVE;
                info!("Reserved {} in scope {}", ipv4(address), ipv4(subnet));
            }
            DhcpSubnetElementDataV4::SecondaryHost(_)
            | DhcpSubnetElementDataV4::IpUsedCluster(_) => {
                if !scope.elements.contains(&element) {
                    scope.elements.push(element);
                }
            }
        }
        Ok(())
    }

    fn remove_element(
        &mut self,
        subnet: DhcpIpAddress,
        element: &DhcpSubnetElementDataV4,
        force: DhcpForceFlag,
    ) -> Status {
        let scope = self.scope(subnet)?;
        match element {
            DhcpSubnetElementDataV4::IpRange(range)
            | DhcpSubnetElementDataV4::IpRangeDhcpOnly(range)
            | DhcpSubnetElementDataV4::IpRangeDhcpBootp(range)
            | DhcpSubnetElementDataV4::IpRangeBootpOnly(range) => {
                let range = range.get().ok_or(ERROR_INVALID_PARAMETER)?;
                if scope.ip_range().as_ref() != Some(range) {
                    return Err(ERROR_DHCP_INVALID_RANGE);
                }
                let in_use = self
                    .clients
                    .keys()
                    .any(|ip| range.contains(*ip) && scope.reservation(*ip).is_none());
                if force == DhcpForceFlag::NoForce && in_use {
                    return Err(ERROR_DHCP_ELEMENT_CANT_REMOVE);
                }
                // One range per scope, whatever client kind it was added for
                let scope = self.scope_mut(subnet)?;
                scope.elements.retain(|e| e.ip_range().is_none());
                return Ok(());
            }
            DhcpSubnetElementDataV4::ReservedIp(reservation) => {
                let address = reservation
                    .get()
                    .ok_or(ERROR_INVALID_PARAMETER)?
                    .reserved_ip_address;
                if scope.reservation(address).is_none() {
                    return Err(ERROR_DHCP_NOT_RESERVED_CLIENT);
                }
                self.clients.remove(&address);
                self.reserved_values.remove(&address);
                let scope = self.scope_mut(subnet)?;
                scope.elements.retain(|e| match e {
                    DhcpSubnetElementDataV4::ReservedIp(r) => {
                        r.get().map_or(true, |r| r.reserved_ip_address != address)
                    }
                    _ => true,
                });
                return Ok(());
            }
            DhcpSubnetElementDataV4::ExcludeIpRange(_) => {
                if !scope.elements.contains(element) {
                    return Err(ERROR_DHCP_INVALID_RANGE);
                }
            }
            _ => {
                if !scope.elements.contains(element) {
                    return Err(ERROR_DHCP_ELEMENT_CANT_REMOVE);
                }
            }
        }
        let scope = self.scope_mut(subnet)?;
        scope.elements.retain(|e| e != element);
        Ok(())
    }

    fn elements(
        &self,
        subnet: DhcpIpAddress,
        element_type: DhcpSubnetElementType,
    ) -> Status<Vec<DhcpSubnetElementDataV4>> {
        let ranges = matches!(
            element_type,
            DhcpSubnetElementType::IpRanges
                | DhcpSubnetElementType::IpRangesDhcpOnly
                | DhcpSubnetElementType::IpRangesDhcpBootp
                | DhcpSubnetElementType::IpRangesBootpOnly
        );
        Ok(self
            .scope(subnet)?
            .elements
            .iter()
            .filter(|e| {
                if ranges {
                    e.ip_range().is_some()
                } else {
                    e.element_type() == element_type
                }
            })
            .cloned()
            .collect())
    }

    fn create_option(&mut self, option_id: DhcpOptionId, mut option: DhcpOption) -> Status {
        if self.options.contains_key(&option_id) {
            return Err(ERROR_DHCP_OPTION_EXITS);
        }
        option.option_id = option_id;
        self.options.insert(option_id, option);
        Ok(())
    }

    fn option_mut(&mut self, option_id: DhcpOptionId) -> Status<&mut DhcpOption> {
        self.options
            .get_mut(&option_id)
            .ok_or(ERROR_DHCP_OPTION_NOT_PRESENT)
    }

    fn remove_option(&mut self, option_id: DhcpOptionId) -> Status {
        self.options
            .remove(&option_id)
            .ok_or(ERROR_DHCP_OPTION_NOT_PRESENT)?;
        self.global_values.remove(&option_id);
        for scope in self.scopes.values_mut() {
            scope.option_values.remove(&option_id);
        }
        for values in self.reserved_values.values_mut() {
            values.remove(&option_id);
        }
        Ok(())
    }

    /// Value table of a scope level other than the defaults
    fn values_mut(
        &mut self,
        scope: &DhcpOptionScopeInfo,
    ) -> Status<&mut BTreeMap<DhcpOptionId, DhcpOptionData>> {
        match scope {
            DhcpOptionScopeInfo::Global => Ok(&mut self.global_values),
            DhcpOptionScopeInfo::Subnet(subnet) => Ok(&mut self.scope_mut(*subnet)?.option_values),
            DhcpOptionScopeInfo::Reserved(reserved) => {
                let address = reserved.reserved_ip_address;
                if self
                    .scope(reserved.reserved_ip_subnet_address)?
                    .reservation(address)
                    .is_none()
                {
                    return Err(ERROR_DHCP_NOT_RESERVED_CLIENT);
                }
                Ok(self.reserved_values.entry(address).or_default())
            }
            DhcpOptionScopeInfo::MScope(_) => Err(ERROR_NOT_SUPPORTED),
            DhcpOptionScopeInfo::Default => Err(ERROR_INVALID_PARAMETER),
        }
    }

    fn set_option_value(
        &mut self,
        option_id: DhcpOptionId,
        scope: &DhcpOptionScopeInfo,
        value: DhcpOptionData,
    ) -> Status {
        let option = self.option_mut(option_id)?;
        if let DhcpOptionScopeInfo::Default = scope {
            option.default_value = value;
            return Ok(());
        }
        self.values_mut(scope)?.insert(option_id, value);
        Ok(())
    }

    fn option_value(
        &mut self,
        option_id: DhcpOptionId,
        scope: &DhcpOptionScopeInfo,
    ) -> Status<DhcpOptionValue> {
        let value = match scope {
            DhcpOptionScopeInfo::Default => self.option_mut(option_id)?.default_value.clone(),
            _ => self
                .values_mut(scope)?
                .get(&option_id)
                .cloned()
                .ok_or(ERROR_DHCP_OPTION_NOT_PRESENT)?,
        };
        Ok(DhcpOptionValue { option_id, value })
    }

    fn option_values(&mut self, scope: &DhcpOptionScopeInfo) -> Status<Vec<DhcpOptionValue>> {
        let values = match scope {
            DhcpOptionScopeInfo::Default => self
                .options
                .values()
                .map(|o| DhcpOptionValue {
                    option_id: o.option_id,
                    value: o.default_value.clone(),
                })
                .collect(),
            _ => self
                .values_mut(scope)?
                .iter()
                .map(|(id, value)| DhcpOptionValue {
                    option_id: *id,
                    value: value.clone(),
                })
                .collect(),
        };
        Ok(values)
    }

    fn remove_option_value(&mut self, option_id: DhcpOptionId, scope: &DhcpOptionScopeInfo) -> Status {
        self.values_mut(scope)?
            .remove(&option_id)
            .map(|_| ())
            .ok_or(ERROR_DHCP_OPTION_NOT_PRESENT)
    }

    /// Options a client receives: global values, overridden by its scope,
    /// overridden by its reservation
    fn client_options(&self, address: DhcpIpAddress, mask: DhcpIpMask) -> Status<DhcpOptionList> {
        let scope = self.scope(address & mask)?;
        let mut merged = self.global_values.clone();
        merged.extend(scope.option_values.clone());
        if let Some(values) = self.reserved_values.get(&address) {
            merged.extend(values.clone());
        }
        Ok(DhcpOptionList {
            options: merged
                .into_iter()
                .map(|(option_id, value)| DhcpOptionValue { option_id, value })
                .collect(),
        })
    }

    fn create_client(&mut self, mut client: DhcpClientInfoVq) -> Status {
        let address = client.client_ip_address;
        let mask = self
            .scope_of(address)
            .ok_or(ERROR_DHCP_SUBNET_NOT_PRESENT)?
            .info
            .subnet_mask;
        if self.clients.contains_key(&address) {
            return Err(ERROR_DHCP_CLIENT_EXISTS);
        }
        if client.subnet_mask == 0 {
            client.subnet_mask = mask;
        }
        debug!("Created lease for {} ({})", ipv4(address), client.client_hardware_address);
        self.clients.insert(address, client);
        Ok(())
    }

    fn set_client(&mut self, client: DhcpClientInfoVq) -> Status {
        let existing = self
            .clients
            .get_mut(&client.client_ip_address)
            .ok_or(ERROR_DHCP_INVALID_DHCP_CLIENT)?;
        *existing = client;
        Ok(())
    }

    fn find_client(&self, search: &DhcpSearchInfo) -> Status<&DhcpClientInfoVq> {
        let client = match search {
            DhcpSearchInfo::ClientIpAddress(ip) => self.clients.get(ip),
            _ => self.clients.values().find(|c| search.matches(c)),
        };
        client.ok_or(ERROR_DHCP_INVALID_DHCP_CLIENT)
    }

    fn delete_client(&mut self, search: &DhcpSearchInfo) -> Status {
        let address = self.find_client(search)?.client_ip_address;
        if self.is_reserved(address) {
            return Err(ERROR_DHCP_RESERVED_CLIENT);
        }
        self.clients.remove(&address);
        Ok(())
    }

    /// Leases of one scope, or of every scope for subnet 0
    fn clients_of(&self, subnet: DhcpIpAddress) -> Status<Vec<DhcpClientInfoVq>> {
        if subnet == 0 {
            return Ok(self.clients.values().cloned().collect());
        }
        let scope = self.scope(subnet)?;
        Ok(self
            .clients
            .values()
            .filter(|c| scope.contains(c.client_ip_address))
            .cloned()
            .collect())
    }

    fn mib(&self, started: DateTime) -> DhcpMibInfoVq {
        let mut mib = DhcpMibInfoVq {
            server_start_time: started,
            ..Default::default()
        };
        for client in self.clients.values() {
            match client.address_state {
                address_state::ACTIVE => mib.acks += 1,
                address_state::OFFERED => mib.offers += 1,
                address_state::DECLINED => mib.declines += 1,
                _ => {}
            }
            mib.qtn_num_leases += 1;
            match client.status {
                QuarantineStatus::Probation => mib.qtn_probation_leases += 1,
                QuarantineStatus::Exempt => mib.qtn_exempt_leases += 1,
                QuarantineStatus::NoQuarantine => mib.qtn_non_qtn_leases += 1,
                _ => {}
            }
            if client.quarantine_capable.0 {
                mib.qtn_capable_clients += 1;
            }
        }
        mib.scope_info = self
            .scopes
            .values()
            .map(|scope| {
                let leases: Vec<&DhcpClientInfoVq> = self
                    .clients
                    .values()
                    .filter(|c| scope.contains(c.client_ip_address))
                    .collect();
                let in_use = leases
                    .iter()
                    .filter(|c| c.address_state == address_state::ACTIVE)
                    .count() as u32;
                let pending = leases
                    .iter()
                    .filter(|c| c.address_state == address_state::OFFERED)
                    .count() as u32;
                ScopeMibInfoVq {
                    subnet: scope.info.subnet_address,
                    num_addresses_inuse: in_use,
                    num_addresses_free: scope.capacity().saturating_sub(in_use + pending),
                    num_pending_offers: pending,
                    qtn_capable_clients: leases.iter().filter(|c| c.quarantine_capable.0).count()
                        as u32,
                    ..Default::default()
                }
            })
            .collect();
        mib
    }

    /// Leases outside the scope's range that are not reservations
    fn scan(&mut self, subnet: DhcpIpAddress, fix: bool) -> Status<DhcpScanList> {
        let scope = self.scope(subnet)?;
        let range = scope.ip_range();
        let stale: Vec<DhcpIpAddress> = self
            .clients
            .keys()
            .copied()
            .filter(|ip| scope.contains(*ip))
            .filter(|ip| scope.reservation(*ip).is_none())
            .filter(|ip| !range.map_or(false, |r| r.contains(*ip)))
            .collect();
        if fix {
            for ip in &stale {
                self.clients.remove(ip);
            }
            info!("Scan of {} removed {} stale leases", ipv4(subnet), stale.len());
        }
        Ok(DhcpScanList {
            scan_items: stale
                .into_iter()
                .map(|ip_address| DhcpScanItem {
                    ip_address,
                    scan_flag: DhcpScanFlag::DatabaseFix,
                })
                .collect(),
        })
    }

    fn set_super_scope(
        &mut self,
        subnet: DhcpIpAddress,
        name: Option<String>,
        change_existing: bool,
    ) -> Status {
        let scope = self.scope_mut(subnet)?;
        if name.is_some() && scope.super_scope.is_some() && !change_existing {
            return Err(ERROR_DHCP_SUBNET_EXITS);
        }
        scope.super_scope = name;
        Ok(())
    }

    /// Every scope in address order. Members of a superscope are chained
    /// through `next_in_super_scope`; the last member and standalone scopes
    /// hold `u32::MAX`.
    fn super_scope_table(&self) -> DhcpSuperScopeTable {
        let mut names: Vec<&String> = self.scopes.values().filter_map(|s| s.super_scope.as_ref()).collect();
        names.sort();
        names.dedup();

        let scopes: Vec<&Scope> = self.scopes.values().collect();
        let entries = scopes
            .iter()
            .enumerate()
            .map(|(index, scope)| {
                let (number, next) = match &scope.super_scope {
                    Some(name) => {
                        let number = names.iter().position(|n| *n == name).unwrap_or_default();
                        let next = scopes
                            .iter()
                            .enumerate()
                            .skip(index + 1)
                            .find(|(_, s)| s.super_scope.as_ref() == Some(name))
                            .map_or(u32::MAX, |(i, _)| i as u32);
                        (number as u32, next)
                    }
                    None => (u32::MAX, u32::MAX),
                };
                DhcpSuperScopeTableEntry {
                    subnet_address: scope.info.subnet_address,
                    super_scope_number: number,
                    next_in_super_scope: next,
                    super_scope_name: scope.super_scope.as_deref().map_or_else(LpWStr::null, LpWStr::from),
                }
            })
            .collect();
        DhcpSuperScopeTable { entries }
    }

    fn delete_super_scope(&mut self, name: &str) -> Status {
        let mut found = false;
        for scope in self.scopes.values_mut() {
            if scope.super_scope.as_deref() == Some(name) {
                scope.super_scope = None;
                found = true;
            }
        }
        if found {
            Ok(())
        } else {
            Err(ERROR_FILE_NOT_FOUND)
        }
    }
}

/// DHCP server keeping everything in memory
pub struct MemoryDhcpServer {
    state: Mutex<State>,
    started: DateTime,
}

impl Default for MemoryDhcpServer {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDhcpServer {
    pub fn new() -> Self {
        let config = DhcpServerConfigInfoVq {
            api_protocol_support: api_protocol::RPC_OVER_TCPIP,
            database_name: "dhcp.mdb".into(),
            database_path: "memory".into(),
            backup_interval: 60,
            database_cleanup_interval: 60,
            audit_log: true.into(),
            ..Default::default()
        };
        Self {
            state: Mutex::new(State {
                config,
                ..Default::default()
            }),
            started: DateTime::from_system_time(SystemTime::now()),
        }
    }
}

macro_rules! enum_response {
    ($resp:ident { $field:ident: $array:ident { $items:ident }, $read:ident, $total:ident }, $page:expr) => {{
        let page = $page;
        if page.is_exhausted() {
            $resp::from_status(page.status)
        } else {
            $resp {
                resume_handle: page.resume_handle,
                $read: page.read(),
                $total: page.total,
                return_value: page.status,
                $field: UniquePtr::new($array {
                    $items: page.items.into_iter().collect(),
                }),
            }
        }
    }};
}

#[async_trait::async_trait]
impl DhcpSrvServer for MemoryDhcpServer {
    async fn create_subnet(&self, request: CreateSubnetRequest) -> Result<CreateSubnetResponse> {
        let mut state = self.state.lock().await;
        let status = state.create_subnet(request.subnet_address, request.subnet_info.into());
        Ok(CreateSubnetResponse::from_status(status_of(status)))
    }

    async fn set_subnet_info(&self, request: SetSubnetInfoRequest) -> Result<SetSubnetInfoResponse> {
        let mut state = self.state.lock().await;
        // The plain record carries no quarantine setting; keep the current one
        let quarantine_on = state
            .scope(request.subnet_address)
            .map(|scope| scope.info.quarantine_on);
        let status = quarantine_on.and_then(|quarantine_on| {
            let info = DhcpSubnetInfoVq {
                quarantine_on,
                ..request.subnet_info.into()
            };
            state.set_subnet(request.subnet_address, info)
        });
        Ok(SetSubnetInfoResponse::from_status(status_of(status)))
    }

    async fn get_subnet_info(&self, request: GetSubnetInfoRequest) -> Result<GetSubnetInfoResponse> {
        let state = self.state.lock().await;
        Ok(match state.scope(request.subnet_address) {
            Ok(scope) => GetSubnetInfoResponse {
                subnet_info: UniquePtr::new(scope.info.clone().into()),
                return_value: ERROR_SUCCESS,
            },
            Err(status) => GetSubnetInfoResponse::from_status(status),
        })
    }

    async fn enum_subnets(&self, request: EnumSubnetsRequest) -> Result<EnumSubnetsResponse> {
        let state = self.state.lock().await;
        let subnets: Vec<DhcpIpAddress> = state.scopes.keys().copied().collect();
        Ok(enum_response!(
            EnumSubnetsResponse { enum_info: DhcpIpArray { elements }, elements_read, elements_total },
            Page::of(subnets, request.resume_handle, request.preferred_maximum)
        ))
    }

    async fn add_subnet_element(
        &self,
        request: AddSubnetElementRequest,
    ) -> Result<AddSubnetElementResponse> {
        let mut state = self.state.lock().await;
        let status = state.add_element(request.subnet_address, request.add_element_info.into());
        Ok(AddSubnetElementResponse::from_status(status_of(status)))
    }

    async fn enum_subnet_elements(
        &self,
        request: EnumSubnetElementsRequest,
    ) -> Result<EnumSubnetElementsResponse> {
        let state = self.state.lock().await;
        Ok(match state.elements(request.subnet_address, request.enum_element_type) {
            Ok(elements) => {
                let elements: Vec<DhcpSubnetElementData> =
                    elements.into_iter().map(DhcpSubnetElementData::from).collect();
                enum_response!(
                    EnumSubnetElementsResponse {
                        enum_element_info: DhcpSubnetElementInfoArray { elements },
                        elements_read,
                        elements_total
                    },
                    Page::of(elements, request.resume_handle, request.preferred_maximum)
                )
            }
            Err(status) => EnumSubnetElementsResponse::from_status(status),
        })
    }

    async fn remove_subnet_element(
        &self,
        request: RemoveSubnetElementRequest,
    ) -> Result<RemoveSubnetElementResponse> {
        let mut state = self.state.lock().await;
        let element: DhcpSubnetElementDataV4 = request.remove_element_info.into();
        let status = state.remove_element(request.subnet_address, &element, request.force_flag);
        Ok(RemoveSubnetElementResponse::from_status(status_of(status)))
    }

    async fn delete_subnet(&self, request: DeleteSubnetRequest) -> Result<DeleteSubnetResponse> {
        let mut state = self.state.lock().await;
        let status = state.delete_subnet(request.subnet_address, request.force_flag);
        Ok(DeleteSubnetResponse::from_status(status_of(status)))
    }

    async fn create_option(&self, request: CreateOptionRequest) -> Result<CreateOptionResponse> {
        let mut state = self.state.lock().await;
        let status = state.create_option(request.option_id, request.option_info);
        Ok(CreateOptionResponse::from_status(status_of(status)))
    }

    async fn set_option_info(&self, request: SetOptionInfoRequest) -> Result<SetOptionInfoResponse> {
        let mut state = self.state.lock().await;
        let status = state.option_mut(request.option_id).map(|option| {
            *option = DhcpOption {
                option_id: request.option_id,
                ..request.option_info
            };
        });
        Ok(SetOptionInfoResponse::from_status(status_of(status)))
    }

    async fn get_option_info(&self, request: GetOptionInfoRequest) -> Result<GetOptionInfoResponse> {
        let mut state = self.state.lock().await;
        Ok(match state.option_mut(request.option_id) {
            Ok(option) => GetOptionInfoResponse {
                option_info: UniquePtr::new(option.clone()),
                return_value: ERROR_SUCCESS,
            },
            Err(status) => GetOptionInfoResponse::from_status(status),
        })
    }

    async fn remove_option(&self, request: RemoveOptionRequest) -> Result<RemoveOptionResponse> {
        let mut state = self.state.lock().await;
        let status = state.remove_option(request.option_id);
        Ok(RemoveOptionResponse::from_status(status_of(status)))
    }

    async fn set_option_value(&self, request: SetOptionValueRequest) -> Result<SetOptionValueResponse> {
        let mut state = self.state.lock().await;
        let status =
            state.set_option_value(request.option_id, &request.scope_info, request.option_value);
        Ok(SetOptionValueResponse::from_status(status_of(status)))
    }

    async fn get_option_value(&self, request: GetOptionValueRequest) -> Result<GetOptionValueResponse> {
        let mut state = self.state.lock().await;
        Ok(match state.option_value(request.option_id, &request.scope_info) {
            Ok(value) => GetOptionValueResponse {
                option_value: UniquePtr::new(value),
                return_value: ERROR_SUCCESS,
            },
            Err(status) => GetOptionValueResponse::from_status(status),
        })
    }

    async fn enum_option_values(
        &self,
        request: EnumOptionValuesRequest,
    ) -> Result<EnumOptionValuesResponse> {
        let mut state = self.state.lock().await;
        Ok(match state.option_values(&request.scope_info) {
            Ok(values) => enum_response!(
                EnumOptionValuesResponse {
                    option_values: DhcpOptionValueArray { values },
                    options_read,
                    options_total
                },
                Page::of(values, request.resume_handle, request.preferred_maximum)
            ),
            Err(status) => EnumOptionValuesResponse::from_status(status),
        })
    }

    async fn remove_option_value(
        &self,
        request: RemoveOptionValueRequest,
    ) -> Result<RemoveOptionValueResponse> {
        let mut state = self.state.lock().await;
        let status = state.remove_option_value(request.option_id, &request.scope_info);
        Ok(RemoveOptionValueResponse::from_status(status_of(status)))
    }

    async fn create_client_info(
        &self,
        request: CreateClientInfoRequest,
    ) -> Result<CreateClientInfoResponse> {
        let mut state = self.state.lock().await;
        let status = state.create_client(request.client_info.into());
        Ok(CreateClientInfoResponse::from_status(status_of(status)))
    }

    async fn set_client_info(&self, request: SetClientInfoRequest) -> Result<SetClientInfoResponse> {
        let mut state = self.state.lock().await;
        let status = state.set_client(request.client_info.into());
        Ok(SetClientInfoResponse::from_status(status_of(status)))
    }

    async fn get_client_info(&self, request: GetClientInfoRequest) -> Result<GetClientInfoResponse> {
        let state = self.state.lock().await;
        Ok(match state.find_client(&request.search_info) {
            Ok(client) => GetClientInfoResponse {
                client_info: UniquePtr::new(client.clone().into()),
                return_value: ERROR_SUCCESS,
            },
            Err(status) => GetClientInfoResponse::from_status(status),
        })
    }

    async fn delete_client_info(
        &self,
        request: DeleteClientInfoRequest,
    ) -> Result<DeleteClientInfoResponse> {
        let mut state = self.state.lock().await;
        let status = state.delete_client(&request.client_info);
        Ok(DeleteClientInfoResponse::from_status(status_of(status)))
    }

    async fn enum_subnet_clients(
        &self,
        request: EnumSubnetClientsRequest,
    ) -> Result<EnumSubnetClientsResponse> {
        let state = self.state.lock().await;
        Ok(match state.clients_of(request.subnet_address) {
            Ok(clients) => {
                let clients: Vec<UniquePtr<DhcpClientInfo>> = clients
                    .into_iter()
                    .map(|c| UniquePtr::new(c.into()))
                    .collect();
                enum_response!(
                    EnumSubnetClientsResponse {
                        client_info: DhcpClientInfoArray { clients },
                        clients_read,
                        clients_total
                    },
                    Page::of(clients, request.resume_handle, request.preferred_maximum)
                )
            }
            Err(status) => EnumSubnetClientsResponse::from_status(status),
        })
    }

    async fn get_client_options(
        &self,
        request: GetClientOptionsRequest,
    ) -> Result<GetClientOptionsResponse> {
        let state = self.state.lock().await;
        Ok(
            match state.client_options(request.client_ip_address, request.client_subnet_mask) {
                Ok(options) => GetClientOptionsResponse {
                    client_options: UniquePtr::new(options),
                    return_value: ERROR_SUCCESS,
                },
                Err(status) => GetClientOptionsResponse::from_status(status),
            },
        )
    }

    async fn get_mib_info(&self, _request: GetMibInfoRequest) -> Result<GetMibInfoResponse> {
        let state = self.state.lock().await;
        Ok(GetMibInfoResponse {
            mib_info: UniquePtr::new(state.mib(self.started).into()),
            return_value: ERROR_SUCCESS,
        })
    }

    async fn enum_options(&self, request: EnumOptionsRequest) -> Result<EnumOptionsResponse> {
        let state = self.state.lock().await;
        let options: Vec<DhcpOption> = state.options.values().cloned().collect();
        Ok(enum_response!(
            EnumOptionsResponse { options: DhcpOptionArray { options }, options_read, options_total },
            Page::of(options, request.resume_handle, request.preferred_maximum)
        ))
    }

    async fn set_option_values(
        &self,
        request: SetOptionValuesRequest,
    ) -> Result<SetOptionValuesResponse> {
        let mut state = self.state.lock().await;
        let status = request
            .option_values
            .values
            .into_iter()
            .try_for_each(|v| state.set_option_value(v.option_id, &request.scope_info, v.value));
        Ok(SetOptionValuesResponse::from_status(status_of(status)))
    }

    async fn server_set_config(
        &self,
        request: ServerSetConfigRequest,
    ) -> Result<ServerSetConfigResponse> {
        let mut state = self.state.lock().await;
        let update: DhcpServerConfigInfoVq = request.config_info.into();
        state.config.apply(request.fields_to_set & config_fields::BASE, &update);
        Ok(ServerSetConfigResponse::from_status(ERROR_SUCCESS))
    }

    async fn server_get_config(
        &self,
        _request: ServerGetConfigRequest,
    ) -> Result<ServerGetConfigResponse> {
        let state = self.state.lock().await;
        Ok(ServerGetConfigResponse {
            config_info: UniquePtr::new(state.config.clone().into()),
            return_value: ERROR_SUCCESS,
        })
    }

    async fn scan_database(&self, request: ScanDatabaseRequest) -> Result<ScanDatabaseResponse> {
        let mut state = self.state.lock().await;
        Ok(match state.scan(request.subnet_address, request.fix_flag != 0) {
            Ok(list) => ScanDatabaseResponse {
                scan_list: UniquePtr::new(list),
                return_value: ERROR_SUCCESS,
            },
            Err(status) => ScanDatabaseResponse::from_status(status),
        })
    }

    async fn get_version(&self, _request: GetVersionRequest) -> Result<GetVersionResponse> {
        Ok(GetVersionResponse {
            major_version: SERVER_VERSION_MAJOR,
            minor_version: SERVER_VERSION_MINOR,
            return_value: ERROR_SUCCESS,
        })
    }

    async fn add_subnet_element_v4(
        &self,
        request: AddSubnetElementV4Request,
    ) -> Result<AddSubnetElementV4Response> {
        let mut state = self.state.lock().await;
        let status = state.add_element(request.subnet_address, request.add_element_info);
        Ok(AddSubnetElementV4Response::from_status(status_of(status)))
    }

    async fn enum_subnet_elements_v4(
        &self,
        request: EnumSubnetElementsV4Request,
    ) -> Result<EnumSubnetElementsV4Response> {
        let state = self.state.lock().await;
        Ok(match state.elements(request.subnet_address, request.enum_element_type) {
            Ok(elements) => enum_response!(
                EnumSubnetElementsV4Response {
                    enum_element_info: DhcpSubnetElementInfoArrayV4 { elements },
                    elements_read,
                    elements_total
                },
                Page::of(elements, request.resume_handle, request.preferred_maximum)
            ),
            Err(status) => EnumSubnetElementsV4Response::from_status(status),
        })
    }

    async fn remove_subnet_element_v4(
        &self,
        request: RemoveSubnetElementV4Request,
    ) -> Result<RemoveSubnetElementV4Response> {
        let mut state = self.state.lock().await;
        let status = state.remove_element(
            request.subnet_address,
            &request.remove_element_info,
            request.force_flag,
        );
        Ok(RemoveSubnetElementV4Response::from_status(status_of(status)))
    }

    async fn create_client_info_v4(
        &self,
        request: CreateClientInfoV4Request,
    ) -> Result<CreateClientInfoV4Response> {
        let mut state = self.state.lock().await;
        let status = state.create_client(request.client_info.into());
        Ok(CreateClientInfoV4Response::from_status(status_of(status)))
    }

    async fn set_client_info_v4(
        &self,
        request: SetClientInfoV4Request,
    ) -> Result<SetClientInfoV4Response> {
        let mut state = self.state.lock().await;
        let status = state.set_client(request.client_info.into());
        Ok(SetClientInfoV4Response::from_status(status_of(status)))
    }

    async fn get_client_info_v4(
        &self,
        request: GetClientInfoV4Request,
    ) -> Result<GetClientInfoV4Response> {
        let state = self.state.lock().await;
        Ok(match state.find_client(&request.search_info) {
            Ok(client) => GetClientInfoV4Response {
                client_info: UniquePtr::new(client.clone().into()),
                return_value: ERROR_SUCCESS,
            },
            Err(status) => GetClientInfoV4Response::from_status(status),
        })
    }

    async fn enum_subnet_clients_v4(
        &self,
        request: EnumSubnetClientsV4Request,
    ) -> Result<EnumSubnetClientsV4Response> {
        let state = self.state.lock().await;
        Ok(match state.clients_of(request.subnet_address) {
            Ok(clients) => {
                let clients: Vec<UniquePtr<DhcpClientInfoV4>> = clients
                    .into_iter()
                    .map(|c| UniquePtr::new(c.into()))
                    .collect();
                enum_response!(
                    EnumSubnetClientsV4Response {
                        client_info: DhcpClientInfoArrayV4 { clients },
                        clients_read,
                        clients_total
                    },
                    Page::of(clients, request.resume_handle, request.preferred_maximum)
                )
            }
            Err(status) => EnumSubnetClientsV4Response::from_status(status),
        })
    }

    async fn set_super_scope_v4(
        &self,
        request: SetSuperScopeV4Request,
    ) -> Result<SetSuperScopeV4Response> {
        let mut state = self.state.lock().await;
        let name = request.super_scope_name.as_str().map(str::to_string);
        let status = state.set_super_scope(request.subnet_address, name, request.change_existing.0);
        Ok(SetSuperScopeV4Response::from_status(status_of(status)))
    }

    async fn get_super_scope_info_v4(
        &self,
        _request: GetSuperScopeInfoV4Request,
    ) -> Result<GetSuperScopeInfoV4Response> {
        let state = self.state.lock().await;
        Ok(GetSuperScopeInfoV4Response {
            super_scope_table: UniquePtr::new(state.super_scope_table()),
            return_value: ERROR_SUCCESS,
        })
    }

    async fn delete_super_scope_v4(
        &self,
        request: DeleteSuperScopeV4Request,
    ) -> Result<DeleteSuperScopeV4Response> {
        let mut state = self.state.lock().await;
        let status = state.delete_super_scope(request.super_scope_name.as_str());
        Ok(DeleteSuperScopeV4Response::from_status(status_of(status)))
    }

    async fn server_set_config_v4(
        &self,
        request: ServerSetConfigV4Request,
    ) -> Result<ServerSetConfigV4Response> {
        let mut state = self.state.lock().await;
        let update: DhcpServerConfigInfoVq = request.config_info.into();
        state.config.apply(request.fields_to_set & config_fields::V4, &update);
        Ok(ServerSetConfigV4Response::from_status(ERROR_SUCCESS))
    }

    async fn server_get_config_v4(
        &self,
        _request: ServerGetConfigV4Request,
    ) -> Result<ServerGetConfigV4Response> {
        let state = self.state.lock().await;
        Ok(ServerGetConfigV4Response {
            config_info: UniquePtr::new(state.config.clone().into()),
            return_value: ERROR_SUCCESS,
        })
    }

    async fn server_set_config_vq(
        &self,
        request: ServerSetConfigVqRequest,
    ) -> Result<ServerSetConfigVqResponse> {
        let mut state = self.state.lock().await;
        state.config.apply(request.fields_to_set, &request.config_info);
        Ok(ServerSetConfigVqResponse::from_status(ERROR_SUCCESS))
    }

    async fn server_get_config_vq(
        &self,
        _request: ServerGetConfigVqRequest,
    ) -> Result<ServerGetConfigVqResponse> {
        let state = self.state.lock().await;
        Ok(ServerGetConfigVqResponse {
            config_info: UniquePtr::new(state.config.clone()),
            return_value: ERROR_SUCCESS,
        })
    }

    async fn get_mib_info_vq(&self, _request: GetMibInfoVqRequest) -> Result<GetMibInfoVqResponse> {
        let state = self.state.lock().await;
        Ok(GetMibInfoVqResponse {
            mib_info: UniquePtr::new(state.mib(self.started)),
            return_value: ERROR_SUCCESS,
        })
    }

    async fn create_client_info_vq(
        &self,
        request: CreateClientInfoVqRequest,
    ) -> Result<CreateClientInfoVqResponse> {
        let mut state = self.state.lock().await;
        let status = state.create_client(request.client_info);
        Ok(CreateClientInfoVqResponse::from_status(status_of(status)))
    }

    async fn set_client_info_vq(
        &self,
        request: SetClientInfoVqRequest,
    ) -> Result<SetClientInfoVqResponse> {
        let mut state = self.state.lock().await;
        let status = state.set_client(request.client_info);
        Ok(SetClientInfoVqResponse::from_status(status_of(status)))
    }

    async fn enum_subnet_clients_vq(
        &self,
        request: EnumSubnetClientsVqRequest,
    ) -> Result<EnumSubnetClientsVqResponse> {
        let state = self.state.lock().await;
        Ok(match state.clients_of(request.subnet_address) {
            Ok(clients) => {
                let clients: Vec<UniquePtr<DhcpClientInfoVq>> =
                    clients.into_iter().map(UniquePtr::new).collect();
                enum_response!(
                    EnumSubnetClientsVqResponse {
                        client_info: DhcpClientInfoArrayVq { clients },
                        clients_read,
                        clients_total
                    },
                    Page::of(clients, request.resume_handle, request.preferred_maximum)
                )
            }
            Err(status) => EnumSubnetClientsVqResponse::from_status(status),
        })
    }

    async fn get_client_info_vq(
        &self,
        request: GetClientInfoVqRequest,
    ) -> Result<GetClientInfoVqResponse> {
        let state = self.state.lock().await;
        Ok(match state.find_client(&request.search_info) {
            Ok(client) => GetClientInfoVqResponse {
                client_info: UniquePtr::new(client.clone()),
                return_value: ERROR_SUCCESS,
            },
            Err(status) => GetClientInfoVqResponse::from_status(status),
        })
    }

    async fn create_subnet_vq(&self, request: CreateSubnetVqRequest) -> Result<CreateSubnetVqResponse> {
        let mut state = self.state.lock().await;
        let status = state.create_subnet(request.subnet_address, request.subnet_info);
        Ok(CreateSubnetVqResponse::from_status(status_of(status)))
    }

    async fn get_subnet_info_vq(
        &self,
        request: GetSubnetInfoVqRequest,
    ) -> Result<GetSubnetInfoVqResponse> {
        let state = self.state.lock().await;
        Ok(match state.scope(request.subnet_address) {
            Ok(scope) => GetSubnetInfoVqResponse {
                subnet_info: UniquePtr::new(scope.info.clone()),
                return_value: ERROR_SUCCESS,
            },
            Err(status) => GetSubnetInfoVqResponse::from_status(status),
        })
    }

    async fn set_subnet_info_vq(
        &self,
        request: SetSubnetInfoVqRequest,
    ) -> Result<SetSubnetInfoVqResponse> {
        let mut state = self.state.lock().await;
        let status = state.set_subnet(request.subnet_address, request.subnet_info);
        Ok(SetSubnetInfoVqResponse::from_status(status_of(status)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SUBNET: DhcpIpAddress = 0xC0A80100;

    fn scope_info(name: &str) -> DhcpSubnetInfo {
        DhcpSubnetInfo {
            subnet_address: SUBNET,
            subnet_mask: 0xFFFFFF00,
            subnet_name: name.into(),
            ..Default::default()
        }
    }

    async fn server_with_scope() -> MemoryDhcpServer {
        let server = MemoryDhcpServer::new();
        let created = server
            .create_subnet(CreateSubnetRequest {
                server_ip_address: LpWStr::null(),
                subnet_address: SUBNET,
                subnet_info: scope_info("lab"),
            })
            .await
            .unwrap();
        assert_eq!(created.return_value, ERROR_SUCCESS);
        let range = server
            .add_subnet_element(AddSubnetElementRequest {
                server_ip_address: LpWStr::null(),
                subnet_address: SUBNET,
                add_element_info: DhcpSubnetElementData::IpRange(UniquePtr::new(DhcpIpRange::new(
                    SUBNET + 10,
                    SUBNET + 19,
                ))),
            })
            .await
            .unwrap();
        assert_eq!(range.return_value, ERROR_SUCCESS);
        server
    }

    fn reservation(ip: DhcpIpAddress, mac: &[u8]) -> DhcpSubnetElementDataV4 {
        DhcpSubnetElementDataV4::ReservedIp(UniquePtr::new(DhcpIpReservationV4 {
            reserved_ip_address: ip,
            reserved_for_client: UniquePtr::new(DhcpBinaryData::from_mac(mac)),
            allowed_client_types: client_type::BOTH,
        }))
    }

    #[test]
    fn test_page() {
        let page = Page::of(vec![1, 2, 3], 0, 2);
        assert_eq!((page.read(), page.resume_handle, page.status), (2, 2, ERROR_MORE_DATA));
        let page = Page::of(vec![1, 2, 3], 2, 2);
        assert_eq!(page.items, vec![3]);
        assert_eq!(page.status, ERROR_SUCCESS);
        assert!(Page::of(vec![1, 2, 3], 3, 2).is_exhausted());
        assert_eq!(Page::of(vec![1, 2, 3], 0, u32::MAX).read(), 3);
    }

    #[tokio::test]
    async fn test_scope_rules() {
        let server = server_with_scope().await;
        let mut state = server.state.lock().await;

        let mut overlapping = DhcpSubnetInfoVq::from(scope_info("wide"));
        overlapping.subnet_address = 0xC0A80000;
        overlapping.subnet_mask = 0xFFFF0000;
        assert_eq!(state.create_subnet(0xC0A80000, overlapping), Err(ERROR_DHCP_SUBNET_EXISTS));
        assert_eq!(
            state.create_subnet(SUBNET, scope_info("again").into()),
            Err(ERROR_DHCP_SUBNET_EXITS)
        );

        let outside = DhcpSubnetElementDataV4::IpRange(UniquePtr::new(DhcpIpRange::new(
            SUBNET + 10,
            SUBNET + 300,
        )));
        assert_eq!(state.add_element(SUBNET, outside), Err(ERROR_DHCP_INVALID_RANGE));
        let same = DhcpSubnetElementDataV4::IpRange(UniquePtr::new(DhcpIpRange::new(
            SUBNET + 10,
            SUBNET + 19,
        )));
        assert_eq!(state.add_element(SUBNET, same), Err(ERROR_DHCP_IPRANGE_EXITS));
        let wider = DhcpSubnetElementDataV4::IpRange(UniquePtr::new(DhcpIpRange::new(
            SUBNET + 5,
            SUBNET + 50,
        )));
        assert_eq!(state.add_element(SUBNET, wider), Ok(()));
        assert_eq!(
            state.scope(SUBNET).unwrap().ip_range(),
            Some(DhcpIpRange::new(SUBNET + 5, SUBNET + 50))
        );
    }

    #[tokio::test]
    async fn test_reservation_creates_lease() {
        let server = server_with_scope().await;
        let mut state = server.state.lock().await;
        assert_eq!(state.add_element(SUBNET, reservation(SUBNET + 50, &[1, 2, 3])), Ok(()));
        assert_eq!(
            state.add_element(SUBNET, reservation(SUBNET + 51, &[1, 2, 3])),
            Err(ERROR_DHCP_RESERVEDIP_EXITS)
        );

        let lease = state
            .find_client(&DhcpSearchInfo::ClientHardwareAddress(DhcpBinaryData::from_mac(&[1, 2, 3])))
            .unwrap();
        assert_eq!(lease.client_ip_address, SUBNET + 50);
        assert_eq!(lease.client_lease_expires, DateTime::INFINITE);

        assert_eq!(
            state.delete_client(&DhcpSearchInfo::ClientIpAddress(SUBNET + 50)),
            Err(ERROR_DHCP_RESERVED_CLIENT)
        );
        assert_eq!(
            state.remove_element(SUBNET, &reservation(SUBNET + 50, &[]), DhcpForceFlag::FullForce),
            Ok(())
        );
        assert!(state.clients.is_empty());
    }

    #[tokio::test]
    async fn test_option_value_levels() {
        let server = server_with_scope().await;
        let mut state = server.state.lock().await;
        state
            .create_option(
                3,
                DhcpOption {
                    option_name: "Router".into(),
                    option_type: DhcpOptionType::Array,
                    ..Default::default()
                },
            )
            .unwrap();
        state
            .add_element(SUBNET, reservation(SUBNET + 60, &[9]))
            .unwrap();

        let global = DhcpOptionData::ip_addresses(&[1]);
        let scoped = DhcpOptionData::ip_addresses(&[2]);
        let reserved = DhcpOptionData::ip_addresses(&[3]);
        state.set_option_value(3, &DhcpOptionScopeInfo::Global, global.clone()).unwrap();
        state.set_option_value(3, &DhcpOptionScopeInfo::Subnet(SUBNET), scoped.clone()).unwrap();
        let reserved_scope = DhcpOptionScopeInfo::Reserved(DhcpReservedScope {
            reserved_ip_address: SUBNET + 60,
            reserved_ip_subnet_address: SUBNET,
        });
        state.set_option_value(3, &reserved_scope, reserved.clone()).unwrap();

        let options = state.client_options(SUBNET + 11, 0xFFFFFF00).unwrap();
        assert_eq!(options.options[0].value, scoped);
        let options = state.client_options(SUBNET + 60, 0xFFFFFF00).unwrap();
        assert_eq!(options.options[0].value, reserved);

        assert_eq!(
            state.set_option_value(4, &DhcpOptionScopeInfo::Global, global),
            Err(ERROR_DHCP_OPTION_NOT_PRESENT)
        );
        let not_reserved = DhcpOptionScopeInfo::Reserved(DhcpReservedScope {
            reserved_ip_address: SUBNET + 61,
            reserved_ip_subnet_address: SUBNET,
        });
        assert_eq!(
            state.option_value(3, &not_reserved),
            Err(ERROR_DHCP_NOT_RESERVED_CLIENT)
        );

        state.remove_option(3).unwrap();
        assert!(state.global_values.is_empty());
        assert!(state.scope(SUBNET).unwrap().option_values.is_empty());
    }

    #[test]
    fn test_capacity_of_wide_scope() {
        let exclusion = |start, end| {
            DhcpSubnetElementDataV4::ExcludeIpRange(UniquePtr::new(DhcpIpRange::new(start, end)))
        };
        let mut scope = Scope {
            info: DhcpSubnetInfoVq {
                subnet_address: 0x0A000000,
                subnet_mask: 0xFF000000,
                ..Default::default()
            },
            elements: vec![
                DhcpSubnetElementDataV4::IpRangeDhcpOnly(UniquePtr::new(DhcpIpRange::new(
                    0x0A000001, 0x0AFFFFFE,
                ))),
                exclusion(0x0A000001, 0x0A0000FF),
                exclusion(0x0A000080, 0x0A00017F),
                exclusion(0x0A000100, 0x0A000100),
                exclusion(0x0AFFFF00, 0x0AFFFFFF),
                exclusion(0x0B000000, 0x0B0000FF),
            ],
            ..Default::default()
        };
        // 0x0A000001..=0x0A00017F and 0x0AFFFF00..=0x0AFFFFFE are excluded
        assert_eq!(scope.capacity(), 0x00FFFFFE - 0x17F - 0xFF);

        scope.elements.push(exclusion(0x0A000000, 0x0AFFFFFF));
        assert_eq!(scope.capacity(), 0);

        scope.elements.retain(|e| e.ip_range().is_some());
        assert_eq!(scope.capacity(), 0x00FFFFFE);
    }

    #[tokio::test]
    async fn test_dhcp_only_range_keeps_its_type() {
        let server = MemoryDhcpServer::new();
        server
            .create_subnet(CreateSubnetRequest {
                server_ip_address: LpWStr::null(),
                subnet_address: SUBNET,
                subnet_info: scope_info("lab"),
            })
            .await
            .unwrap();
        let range = DhcpSubnetElementDataV4::IpRangeDhcpOnly(UniquePtr::new(DhcpIpRange::new(
            SUBNET + 10,
            SUBNET + 19,
        )));
        let added = server
            .add_subnet_element_v4(AddSubnetElementV4Request {
                server_ip_address: LpWStr::null(),
                subnet_address: SUBNET,
                add_element_info: range.clone(),
            })
            .await
            .unwrap();
        assert_eq!(added.return_value, ERROR_SUCCESS);

        let state = server.state.lock().await;
        assert_eq!(
            state.elements(SUBNET, DhcpSubnetElementType::IpRanges),
            Ok(vec![range.clone()])
        );
        assert_eq!(
            state.elements(SUBNET, DhcpSubnetElementType::IpRangesBootpOnly),
            Ok(vec![range])
        );
        assert_eq!(state.scope(SUBNET).map(Scope::capacity), Ok(10));
    }

    #[tokio::test]
    async fn test_delete_subnet_needs_force_with_leases() {
        let server = server_with_scope().await;
        let mut state = server.state.lock().await;
        state
            .create_client(DhcpClientInfoVq {
                client_ip_address: SUBNET + 12,
                address_state: address_state::ACTIVE,
                ..Default::default()
            })
            .unwrap();
        assert_eq!(
            state.clients[&(SUBNET + 12)].subnet_mask,
            0xFFFFFF00,
            "mask filled in from the scope"
        );
        assert_eq!(
            state.delete_subnet(SUBNET, DhcpForceFlag::NoForce),
            Err(ERROR_DHCP_ELEMENT_CANT_REMOVE)
        );

        let mib = state.mib(DateTime::default());
        assert_eq!(mib.scope_info[0].num_addresses_inuse, 1);
        assert_eq!(mib.scope_info[0].num_addresses_free, 9);

        assert_eq!(state.delete_subnet(SUBNET, DhcpForceFlag::FullForce), Ok(()));
        assert!(state.clients.is_empty());
    }

    #[tokio::test]
    async fn test_scan_finds_leases_outside_range() {
        let server = server_with_scope().await;
        let mut state = server.state.lock().await;
        for ip in [SUBNET + 12, SUBNET + 200] {
            state
                .create_client(DhcpClientInfoVq {
                    client_ip_address: ip,
                    ..Default::default()
                })
                .unwrap();
        }
        let list = state.scan(SUBNET, false).unwrap();
        assert_eq!(list.scan_items.len(), 1);
        assert_eq!(list.scan_items[0].ip_address, SUBNET + 200);
        assert_eq!(state.clients.len(), 2);

        state.scan(SUBNET, true).unwrap();
        assert_eq!(state.clients.len(), 1);
    }

    #[tokio::test]
    async fn test_super_scope_chain() {
        let server = MemoryDhcpServer::new();
        let mut state = server.state.lock().await;
        for (i, subnet) in [0x0A000000u32, 0x0A000100, 0x0A000200].iter().enumerate() {
            let info = DhcpSubnetInfoVq {
                subnet_address: *subnet,
                subnet_mask: 0xFFFFFF00,
                ..Default::default()
            };
            state.create_subnet(*subnet, info).unwrap();
            if i != 1 {
                state.set_super_scope(*subnet, Some("campus".into()), false).unwrap();
            }
        }
        assert_eq!(
            state.set_super_scope(0x0A000000, Some("other".into()), false),
            Err(ERROR_DHCP_SUBNET_EXITS)
        );

        let table = state.super_scope_table();
        assert_eq!(table.entries.len(), 3);
        assert_eq!(table.entries[0].next_in_super_scope, 2);
        assert_eq!(table.entries[0].super_scope_name.as_str(), Some("campus"));
        assert_eq!(table.entries[1].super_scope_number, u32::MAX);
        assert_eq!(table.entries[2].next_in_super_scope, u32::MAX);

        assert_eq!(state.delete_super_scope("campus"), Ok(()));
        assert_eq!(state.delete_super_scope("campus"), Err(ERROR_FILE_NOT_FOUND));
    }

    #[tokio::test]
    async fn test_config_versions_share_one_record() {
        let server = MemoryDhcpServer::new();
        server
            .server_set_config_v4(ServerSetConfigV4Request {
                server_ip_address: LpWStr::null(),
                fields_to_set: config_fields::PING_RETRIES | config_fields::QUARANTINE_ON,
                config_info: DhcpServerConfigInfoV4 {
                    ping_retries: 4,
                    ..Default::default()
                },
            })
            .await
            .unwrap();
        let vq = server
            .server_get_config_vq(Default::default())
            .await
            .unwrap()
            .config_info
            .into_inner()
            .unwrap();
        assert_eq!(vq.ping_retries, 4);
        assert_eq!(vq.database_name.as_str(), Some("dhcp.mdb"));
    }
}
