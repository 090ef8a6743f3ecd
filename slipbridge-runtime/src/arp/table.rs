use slipbridge_packets::MacAddr;
use std::fmt;
use std::net::Ipv4Addr;

/// `created_at` of a static binding. No learned binding can be this old or this new, so
/// static bindings never age and are never picked for eviction while a learned one exists.
pub const STATIC_TIMESTAMP: u64 = u64::MAX;

/// One slot of the address table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AddressBinding {
    pub mac: MacAddr,
    pub ip: Ipv4Addr,
    /// Milliseconds on the bridge clock when the binding was learned or last refreshed.
    pub created_at: u64,
    pub occupied: bool,
}

impl AddressBinding {
    pub const EMPTY: AddressBinding = AddressBinding {
        mac: MacAddr::ZERO,
        ip: Ipv4Addr::UNSPECIFIED,
        created_at: 0,
        occupied: false,
    };

    pub fn is_static(&self) -> bool {
        self.occupied && self.created_at == STATIC_TIMESTAMP
    }
}

impl Default for AddressBinding {
    fn default() -> Self {
        AddressBinding::EMPTY
    }
}

/// Fixed capacity IPv4 to MAC cache.
///
/// Among occupied slots no two bindings share an IP and no two share a MAC. Inserting into a
/// full table reuses a slot instead of growing. Time is passed in by the caller, which keeps
/// the table free of any clock.
#[derive(Clone, Debug)]
pub struct AddressTable {
    entries: Vec<AddressBinding>,
}

impl AddressTable {
    /// Creates an empty table. A capacity of zero is raised to one slot.
    pub fn new(capacity: usize) -> Self {
        AddressTable {
            entries: vec![AddressBinding::EMPTY; capacity.max(1)],
        }
    }

    pub fn capacity(&self) -> usize {
        self.entries.len()
    }

    /// Number of occupied slots.
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Occupied bindings in slot order.
    pub fn iter(&self) -> impl Iterator<Item = &AddressBinding> {
        self.entries.iter().filter(|entry| entry.occupied)
    }

    pub fn find_by_ip(&self, ip: Ipv4Addr) -> Option<&AddressBinding> {
        self.iter().find(|entry| entry.ip == ip)
    }

    pub fn find_by_mac(&self, mac: MacAddr) -> Option<&AddressBinding> {
        self.iter().find(|entry| entry.mac == mac)
    }

    /// Records that `ip` is reachable at `mac`.
    ///
    /// An existing binding for `ip` is updated first, then one for `mac`, then a free slot is
    /// used, and finally the oldest learned binding is replaced. Bindings that conflict with a
    /// static binding leave the table unchanged and return the static binding.
    pub fn upsert(&mut self, mac: MacAddr, ip: Ipv4Addr, now: u64) -> AddressBinding {
        if let Some(slot) = self.position_by_ip(ip) {
            if self.entries[slot].is_static() {
                return self.entries[slot];
            }
            if let Some(other) = self.position_by_mac(mac) {
                if other != slot {
                    if self.entries[other].is_static() {
                        return self.entries[other];
                    }
                    self.entries[other] = AddressBinding::EMPTY;
                }
            }
            let entry = &mut self.entries[slot];
            entry.mac = mac;
            entry.created_at = now;
            return *entry;
        }

        if let Some(slot) = self.position_by_mac(mac) {
            let entry = &mut self.entries[slot];
            if !entry.is_static() {
                entry.ip = ip;
                entry.created_at = now;
            }
            return *entry;
        }

        let entry = self.claim_slot();
        *entry = AddressBinding {
            mac,
            ip,
            created_at: now,
            occupied: true,
        };
        *entry
    }

    /// Pins `ip` to `mac` so aging and eviction leave it alone. Any learned binding for the
    /// same IP or MAC is replaced.
    pub fn insert_static(&mut self, ip: Ipv4Addr, mac: MacAddr) -> AddressBinding {
        let slot = match (self.position_by_ip(ip), self.position_by_mac(mac)) {
            (Some(by_ip), Some(by_mac)) => {
                if by_ip != by_mac {
                    self.entries[by_mac] = AddressBinding::EMPTY;
                }
                by_ip
            }
            (Some(slot), None) | (None, Some(slot)) => slot,
            (None, None) => self.free_or_oldest(),
        };

        self.entries[slot] = AddressBinding {
            mac,
            ip,
            created_at: STATIC_TIMESTAMP,
            occupied: true,
        };
        self.entries[slot]
    }

    /// Empties and returns the slot that should be reused next: the first unoccupied slot,
    /// otherwise the learned binding with the smallest `created_at`. Slot 0 is used when every
    /// slot holds a static binding.
    pub fn evict_oldest(&mut self) -> &mut AddressBinding {
        let slot = self.free_or_oldest();
        let entry = &mut self.entries[slot];
        *entry = AddressBinding::EMPTY;
        entry
    }

    /// Clears every slot, static bindings included.
    pub fn flush(&mut self) {
        for entry in self.entries.iter_mut() {
            *entry = AddressBinding::EMPTY;
        }
    }

    fn claim_slot(&mut self) -> &mut AddressBinding {
        self.evict_oldest()
    }

    fn free_or_oldest(&self) -> usize {
        if let Some(free) = self.entries.iter().position(|entry| !entry.occupied) {
            return free;
        }
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, entry)| !entry.is_static())
            .min_by_key(|(_, entry)| entry.created_at)
            .map(|(slot, _)| slot)
            .unwrap_or(0)
    }

    fn position_by_ip(&self, ip: Ipv4Addr) -> Option<usize> {
        self.entries
            .iter()
            .position(|entry| entry.occupied && entry.ip == ip)
    }

    fn position_by_mac(&self, mac: MacAddr) -> Option<usize> {
        self.entries
            .iter()
            .position(|entry| entry.occupied && entry.mac == mac)
    }
}

impl fmt::Display for AddressTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "ARP table contents:")?;
        for entry in self.iter() {
            write!(f, "MAC: {}\tIP: {}", entry.mac, entry.ip)?;
            if entry.is_static() {
                write!(f, "\t(static)")?;
            }
            writeln!(f)?;
        }
        write!(f, "End of ARP table contents. {} entries.", self.len())
    }
}
