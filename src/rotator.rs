// src/rotator.rs
use dashmap::DashMap;

#[derive(Debug)]
struct EndpointSet {
    urls: Vec<String>,
    cursor: usize,    // index of the current endpoint
    rotations: u64,   // cumulative advances, never wraps
}

/// Round-robin cursor over each network's RPC endpoints.
///
/// There is one cursor per network shared by every caller; `advance` moves it
/// under the map's per-key lock so concurrent failovers never skip or repeat a slot.
#[derive(Debug, Default)]
pub struct EndpointRotator {
    sets: DashMap<String, EndpointSet>,
}

impl EndpointRotator {
    pub fn new<I>(networks: I) -> Self
    where
        I: IntoIterator<Item = (String, Vec<String>)>,
    {
        let sets = DashMap::new();
        for (network, urls) in networks {
            sets.insert(
                network,
                EndpointSet {
                    urls,
                    cursor: 0,
                    rotations: 0,
                },
            );
        }
        Self { sets }
    }

    /// Configured endpoints of a network, in configured order
    pub fn endpoints(&self, network: &str) -> Vec<String> {
        self.sets
            .get(network)
            .map(|set| set.urls.clone())
            .unwrap_or_default()
    }

    /// Endpoint the cursor currently points at
    pub fn current(&self, network: &str) -> Option<String> {
        let set = self.sets.get(network)?;
        set.urls.get(set.cursor).cloned()
    }

    /// Move the cursor one step (wrapping) and return the endpoint that was
    /// current before the move.
    pub fn advance(&self, network: &str) -> Option<String> {
        let mut entry = self.sets.get_mut(network)?;
        let set = &mut *entry;
        let previous = set.urls.get(set.cursor)?.clone();
        set.cursor = (set.cursor + 1) % set.urls.len();
        set.rotations += 1;
        Some(previous)
    }

    /// How many times `advance` moved this network's cursor
    pub fn rotations(&self, network: &str) -> u64 {
        self.sets.get(network).map(|set| set.rotations).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn urls(prefix: &str, n: usize) -> Vec<String> {
        (1..=n).map(|i| format!("https://{}-{}.test", prefix, i)).collect()
    }

    fn rotator() -> EndpointRotator {
        EndpointRotator::new(vec![
            ("Ethereum".to_string(), urls("eth", 3)),
            ("Base".to_string(), urls("base", 1)),
        ])
    }

    #[test]
    fn test_current_starts_at_first_endpoint() {
        let r = rotator();
        assert_eq!(r.current("Ethereum").as_deref(), Some("https://eth-1.test"));
        // reading does not move the cursor
        assert_eq!(r.current("Ethereum").as_deref(), Some("https://eth-1.test"));
        assert_eq!(r.rotations("Ethereum"), 0);
    }

    #[test]
    fn test_advance_cycles_through_every_endpoint_once() {
        let r = rotator();
        let seen: Vec<String> = (0..3).filter_map(|_| r.advance("Ethereum")).collect();
        assert_eq!(seen, urls("eth", 3));

        // and then repeats from the start
        assert_eq!(r.advance("Ethereum").as_deref(), Some("https://eth-1.test"));
        assert_eq!(r.current("Ethereum").as_deref(), Some("https://eth-2.test"));
        assert_eq!(r.rotations("Ethereum"), 4);
    }

    #[test]
    fn test_single_endpoint_rotates_to_itself() {
        let r = rotator();
        for _ in 0..3 {
            assert_eq!(r.advance("Base").as_deref(), Some("https://base-1.test"));
        }
        assert_eq!(r.current("Base").as_deref(), Some("https://base-1.test"));
    }

    #[test]
    fn test_networks_rotate_independently() {
        let r = rotator();
        r.advance("Ethereum");
        assert_eq!(r.rotations("Base"), 0);
        assert_eq!(r.current("Base").as_deref(), Some("https://base-1.test"));
    }

    #[test]
    fn test_unknown_network() {
        let r = rotator();
        assert!(r.current("Nope").is_none());
        assert!(r.advance("Nope").is_none());
        assert!(r.endpoints("Nope").is_empty());
        assert_eq!(r.rotations("Nope"), 0);
    }

    #[test]
    fn test_empty_endpoint_list_does_not_panic() {
        let r = EndpointRotator::new(vec![("Empty".to_string(), Vec::new())]);
        assert!(r.current("Empty").is_none());
        assert!(r.advance("Empty").is_none());
    }

    #[test]
    fn test_concurrent_advances_are_not_lost() {
        let r = rotator();
        std::thread::scope(|s| {
            for _ in 0..8 {
                s.spawn(|| {
                    for _ in 0..100 {
                        r.advance("Ethereum");
                    }
                });
            }
        });
        assert_eq!(r.rotations("Ethereum"), 800);
        // 800 % 3 == 2
        assert_eq!(r.current("Ethereum").as_deref(), Some("https://eth-3.test"));
    }
}
