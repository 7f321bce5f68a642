//! Relay target resolution
//!
//! Every network forwards to at most one other network. An explicit
//! `relay_to` names the target by identifier; otherwise the next entry in
//! configuration order is used, wrapping around to form a ring.

use crate::{config::NetworkConfig, Error, Result};

/// Index of each network's relay target, parallel to `networks`.
///
/// A network never targets itself, so a single-entry ring has no target.
pub fn resolve_targets(networks: &[NetworkConfig]) -> Result<Vec<Option<usize>>> {
    let count = networks.len();
    let mut targets = Vec::with_capacity(count);

    for (index, network) in networks.iter().enumerate() {
        let target = match &network.relay_to {
            Some(id) => {
                let found = networks
                    .iter()
                    .position(|n| &n.network_identifier == id)
                    .ok_or_else(|| {
                        Error::Config(format!(
                            "Network [{}] relays to unknown network [{}]",
                            network.network_identifier, id
                        ))
                    })?;
                if found == index {
                    return Err(Error::Config(format!(
                        "Network [{}] cannot relay to itself",
                        network.network_identifier
                    )));
                }
                Some(found)
            }
            None if count > 1 => Some((index + 1) % count),
            None => None,
        };
        targets.push(target);
    }

    Ok(targets)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn net(id: &str) -> NetworkConfig {
        NetworkConfig::new(format!("irc.{}.example", id.to_lowercase()), 6697, "relay", "#lobby", id)
    }

    #[test]
    fn test_implicit_ring() {
        let networks = vec![net("A"), net("B"), net("C")];
        assert_eq!(resolve_targets(&networks).unwrap(), vec![Some(1), Some(2), Some(0)]);
    }

    #[test]
    fn test_single_network_has_no_target() {
        assert_eq!(resolve_targets(&[net("A")]).unwrap(), vec![None]);
    }

    #[test]
    fn test_explicit_star() {
        let mut networks = vec![net("HUB"), net("B"), net("C")];
        networks[0].relay_to = Some("B".to_string());
        networks[1].relay_to = Some("HUB".to_string());
        networks[2].relay_to = Some("HUB".to_string());
        assert_eq!(resolve_targets(&networks).unwrap(), vec![Some(1), Some(0), Some(0)]);
    }

    #[test]
    fn test_self_and_unknown_targets_rejected() {
        let mut networks = vec![net("A"), net("B")];
        networks[0].relay_to = Some("A".to_string());
        assert!(resolve_targets(&networks).is_err());

        networks[0].relay_to = Some("Z".to_string());
        assert!(resolve_targets(&networks).is_err());
    }
}
