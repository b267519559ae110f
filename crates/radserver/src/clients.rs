use crate::server::ServerError;
use ipnetwork::IpNetwork;
use std::collections::HashMap;
use std::net::IpAddr;

/// Per-client shared secrets
///
/// Keys containing `/` are networks in CIDR notation and are matched in the
/// order they were added. Plain addresses are exact matches and take
/// precedence over any network.
#[derive(Debug, Clone, Default)]
pub struct ClientTable {
    exact: HashMap<IpAddr, Vec<u8>>,
    nets: Vec<(IpNetwork, Vec<u8>)>,
}

impl ClientTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from `(key, secret)` pairs, keeping their order
    pub fn from_clients<'a, I>(clients: I) -> Result<Self, ServerError>
    where
        I: IntoIterator<Item = &'a (String, Vec<u8>)>,
    {
        let mut table = ClientTable::new();
        for (key, secret) in clients {
            table.insert(key, secret.clone())?;
        }
        Ok(table)
    }

    /// Add a client by IP address or CIDR network
    pub fn insert(&mut self, key: &str, secret: Vec<u8>) -> Result<(), ServerError> {
        let key = key.trim();
        if key.contains('/') {
            let network = key
                .parse::<IpNetwork>()
                .map_err(|_| ServerError::InvalidClient(key.to_string()))?;
            self.nets.push((network, secret));
            return Ok(());
        }

        let ip = key
            .parse::<IpAddr>()
            .map_err(|_| ServerError::InvalidClient(key.to_string()))?;
        self.exact.insert(ip.to_canonical(), secret);
        Ok(())
    }

    /// Find the secret for a source address
    ///
    /// IPv4-mapped IPv6 addresses are matched as IPv4.
    pub fn resolve(&self, source_ip: IpAddr) -> Option<&[u8]> {
        let source_ip = source_ip.to_canonical();
        if let Some(secret) = self.exact.get(&source_ip) {
            return Some(secret.as_slice());
        }
        self.nets
            .iter()
            .find(|(network, _)| network.contains(source_ip))
            .map(|(_, secret)| secret.as_slice())
    }

    pub fn len(&self) -> usize {
        self.exact.len() + self.nets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exact.is_empty() && self.nets.is_empty()
    }
}
