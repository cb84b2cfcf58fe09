use super::{Backend, ServiceSnapshot};
use helios_core::{BalancerConfig, BalancerType};
use rand::Rng;
use std::collections::HashMap;
use std::sync::Arc;

const FNV_OFFSET_BASIS: u32 = 0x811c_9dc5;
const FNV_PRIME: u32 = 0x0100_0193;

/// 后端选择器
///
/// 算法由配置决定；选择本身除了推进轮询游标之外没有副作用，
/// 连接计数由调用方自行维护
#[derive(Debug, Clone)]
pub struct BackendSelector {
    algorithm: BalancerType,
    weights: HashMap<String, u32>,
}

impl BackendSelector {
    pub fn new(algorithm: BalancerType) -> Self {
        Self {
            algorithm,
            weights: HashMap::new(),
        }
    }

    pub fn from_config(config: &BalancerConfig) -> Self {
        // 同名服务以第一项为准
        let weights = config
            .weights
            .iter()
            .filter_map(|w| {
                config
                    .weight_for(&w.service_name)
                    .map(|weight| (w.service_name.clone(), weight))
            })
            .collect();

        Self {
            algorithm: config.algorithm,
            weights,
        }
    }

    pub fn algorithm(&self) -> BalancerType {
        self.algorithm
    }

    /// 从快照中选择一个后端，没有可用后端时返回 `None`
    pub fn select(&self, snapshot: &ServiceSnapshot, client_id: &str) -> Option<Arc<Backend>> {
        if snapshot.is_empty() {
            return None;
        }

        match self.algorithm {
            BalancerType::RoundRobin => self.round_robin(snapshot),
            BalancerType::LeastConnection => self.least_connection(&snapshot.backends),
            BalancerType::WeightedRoundRobin => self.weighted_round_robin(snapshot),
            BalancerType::IPHash => self.ip_hash(&snapshot.backends, client_id),
            BalancerType::RandomSelection => self.random(&snapshot.backends),
        }
    }

    /// 轮询
    ///
    /// 不过滤健康状态，游标落在哪个后端就返回哪个
    fn round_robin(&self, snapshot: &ServiceSnapshot) -> Option<Arc<Backend>> {
        let index = snapshot.cursor().advance() % snapshot.backends.len();
        snapshot.backends.get(index).cloned()
    }

    /// 最少连接，相同连接数时取第一个
    fn least_connection(&self, backends: &[Arc<Backend>]) -> Option<Arc<Backend>> {
        let mut selected: Option<&Arc<Backend>> = None;
        let mut least = u32::MAX;

        for backend in backends.iter().filter(|b| b.is_healthy()) {
            let connections = backend.connections();
            if selected.is_none() || connections < least {
                least = connections;
                selected = Some(backend);
            }
        }

        selected.cloned()
    }

    /// 后端的有效权重：服务级覆盖 > 后端自身权重 > 1
    fn effective_weight(&self, backend: &Backend) -> u64 {
        let weight = self
            .weights
            .get(&backend.service_name)
            .copied()
            .unwrap_or(backend.weight);
        u64::from(weight.max(1))
    }

    /// 加权轮询
    fn weighted_round_robin(&self, snapshot: &ServiceSnapshot) -> Option<Arc<Backend>> {
        let healthy: Vec<(&Arc<Backend>, u64)> = snapshot
            .backends
            .iter()
            .filter(|b| b.is_healthy())
            .map(|b| (b, self.effective_weight(b)))
            .collect();

        let total_weight: u64 = healthy.iter().map(|(_, w)| w).sum();
        if total_weight == 0 {
            return None;
        }

        let mut point = snapshot.cursor().advance() as u64 % total_weight;
        for (backend, weight) in &healthy {
            if point < *weight {
                return Some(Arc::clone(backend));
            }
            point -= weight;
        }

        healthy.first().map(|(backend, _)| Arc::clone(backend))
    }

    /// 按客户端标识哈希，健康集合不变时同一客户端总是落到同一后端
    fn ip_hash(&self, backends: &[Arc<Backend>], client_id: &str) -> Option<Arc<Backend>> {
        let healthy = healthy_backends(backends);
        if healthy.is_empty() {
            return None;
        }

        let index = fnv1a_32(client_id.as_bytes()) as usize % healthy.len();
        healthy.get(index).map(|b| Arc::clone(b))
    }

    fn random(&self, backends: &[Arc<Backend>]) -> Option<Arc<Backend>> {
        let healthy = healthy_backends(backends);
        if healthy.is_empty() {
            return None;
        }

        let index = rand::rng().random_range(0..healthy.len());
        healthy.get(index).map(|b| Arc::clone(b))
    }
}

fn healthy_backends(backends: &[Arc<Backend>]) -> Vec<&Arc<Backend>> {
    backends.iter().filter(|b| b.is_healthy()).collect()
}

/// 32位 FNV-1a 哈希
pub fn fnv1a_32(bytes: &[u8]) -> u32 {
    bytes.iter().fold(FNV_OFFSET_BASIS, |hash, byte| {
        (hash ^ u32::from(*byte)).wrapping_mul(FNV_PRIME)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loadbalance::BackendRegistry;

    fn registry_with(backends: Vec<Backend>) -> BackendRegistry {
        let registry = BackendRegistry::new();
        for backend in backends {
            registry.add_backend(backend);
        }
        registry
    }

    fn healthy(address: &str, weight: u32) -> Backend {
        Backend::new(address, 80, "test-service")
            .with_weight(weight)
            .with_healthy(true)
    }

    fn snapshot(registry: &BackendRegistry) -> ServiceSnapshot {
        registry.service_snapshot("test-service").unwrap()
    }

    #[test]
    fn test_fnv1a_known_values() {
        assert_eq!(fnv1a_32(b""), 0x811c_9dc5);
        assert_eq!(fnv1a_32(b"a"), 0xe40c_292c);
        assert_eq!(fnv1a_32(b"foobar"), 0xbf9c_f968);
    }

    #[test]
    fn test_round_robin_visits_each_backend_once() {
        let registry = registry_with(vec![
            healthy("192.168.1.1", 1),
            healthy("192.168.1.2", 1),
            healthy("192.168.1.3", 1),
        ]);
        let selector = BackendSelector::new(BalancerType::RoundRobin);
        let snap = snapshot(&registry);

        let picks: Vec<String> = (0..4)
            .map(|_| selector.select(&snap, "").unwrap().address.clone())
            .collect();

        let mut first_round = picks[..3].to_vec();
        first_round.sort();
        first_round.dedup();
        assert_eq!(first_round.len(), 3);
        assert_eq!(picks[3], picks[0]);
    }

    #[test]
    fn test_round_robin_ignores_health() {
        let registry = registry_with(vec![
            Backend::new("192.168.1.1", 80, "test-service"),
            Backend::new("192.168.1.2", 80, "test-service"),
        ]);
        let selector = BackendSelector::new(BalancerType::RoundRobin);
        assert!(selector.select(&snapshot(&registry), "").is_some());
    }

    #[test]
    fn test_least_connection_picks_minimum() {
        let registry = registry_with(vec![
            healthy("192.168.1.1", 1).with_connections(5),
            healthy("192.168.1.2", 1).with_connections(2),
            Backend::new("192.168.1.3", 80, "test-service"),
        ]);
        let selector = BackendSelector::new(BalancerType::LeastConnection);

        let picked = selector.select(&snapshot(&registry), "").unwrap();
        assert_eq!(picked.address, "192.168.1.2");
    }

    #[test]
    fn test_least_connection_tie_is_first() {
        let registry = registry_with(vec![
            healthy("192.168.1.1", 1).with_connections(3),
            healthy("192.168.1.2", 1).with_connections(3),
        ]);
        let selector = BackendSelector::new(BalancerType::LeastConnection);
        let snap = snapshot(&registry);

        for _ in 0..5 {
            assert_eq!(selector.select(&snap, "").unwrap().address, "192.168.1.1");
        }
    }

    #[test]
    fn test_least_connection_no_healthy() {
        let registry = registry_with(vec![Backend::new("192.168.1.1", 80, "test-service")]);
        let selector = BackendSelector::new(BalancerType::LeastConnection);
        assert!(selector.select(&snapshot(&registry), "").is_none());
    }

    #[test]
    fn test_weighted_round_robin_ratio() {
        let registry = registry_with(vec![healthy("192.168.1.1", 2), healthy("192.168.1.2", 1)]);
        let selector = BackendSelector::new(BalancerType::WeightedRoundRobin);
        let snap = snapshot(&registry);

        let mut selections: HashMap<String, u32> = HashMap::new();
        for _ in 0..30 {
            let backend = selector.select(&snap, "").unwrap();
            *selections.entry(backend.address.clone()).or_insert(0) += 1;
        }

        let ratio = f64::from(selections["192.168.1.1"]) / f64::from(selections["192.168.1.2"]);
        assert!((1.5..=2.5).contains(&ratio), "unexpected ratio {ratio}");
    }

    #[test]
    fn test_weighted_round_robin_override() {
        let registry = registry_with(vec![healthy("192.168.1.1", 5), healthy("192.168.1.2", 1)]);
        // 覆盖后两个后端权重相同
        let config = BalancerConfig::new(BalancerType::WeightedRoundRobin).with_weight("test-service", 1);
        let selector = BackendSelector::from_config(&config);
        let snap = snapshot(&registry);

        let mut selections: HashMap<String, u32> = HashMap::new();
        for _ in 0..20 {
            let backend = selector.select(&snap, "").unwrap();
            *selections.entry(backend.address.clone()).or_insert(0) += 1;
        }
        assert_eq!(selections["192.168.1.1"], 10);
        assert_eq!(selections["192.168.1.2"], 10);
    }

    #[test]
    fn test_duplicate_override_first_entry_wins() {
        let registry = registry_with(vec![healthy("192.168.1.1", 1), healthy("192.168.1.2", 1)]);
        let other = Backend::new("192.168.2.1", 80, "other").with_weight(7);
        let config = BalancerConfig::new(BalancerType::WeightedRoundRobin)
            .with_weight("test-service", 3)
            .with_weight("test-service", 1);
        let selector = BackendSelector::from_config(&config);

        assert_eq!(selector.effective_weight(&snapshot(&registry).backends[0]), 3);
        assert_eq!(selector.effective_weight(&other), 7);
    }

    #[test]
    fn test_weighted_round_robin_zero_weight_counts_as_one() {
        let registry = registry_with(vec![healthy("192.168.1.1", 0), healthy("192.168.1.2", 0)]);
        let selector = BackendSelector::new(BalancerType::WeightedRoundRobin);
        let snap = snapshot(&registry);

        let first = selector.select(&snap, "").unwrap();
        let second = selector.select(&snap, "").unwrap();
        assert_ne!(first.address, second.address);
    }

    #[test]
    fn test_weighted_round_robin_skips_unhealthy() {
        let registry = registry_with(vec![
            Backend::new("192.168.1.1", 80, "test-service").with_weight(10),
            healthy("192.168.1.2", 1),
        ]);
        let selector = BackendSelector::new(BalancerType::WeightedRoundRobin);
        let snap = snapshot(&registry);

        for _ in 0..10 {
            assert_eq!(selector.select(&snap, "").unwrap().address, "192.168.1.2");
        }
    }

    #[test]
    fn test_weighted_round_robin_no_healthy() {
        let registry = registry_with(vec![Backend::new("192.168.1.1", 80, "test-service")]);
        let selector = BackendSelector::new(BalancerType::WeightedRoundRobin);
        assert!(selector.select(&snapshot(&registry), "").is_none());
    }

    #[test]
    fn test_ip_hash_is_sticky() {
        let registry = registry_with(vec![healthy("192.168.1.1", 1), healthy("192.168.1.2", 1)]);
        let selector = BackendSelector::new(BalancerType::IPHash);
        let snap = snapshot(&registry);

        let first = selector.select(&snap, "10.0.0.1").unwrap();
        for _ in 0..5 {
            let got = selector.select(&snap, "10.0.0.1").unwrap();
            assert!(Arc::ptr_eq(&first, &got));
        }

        // 空标识同样是确定的
        let anonymous = selector.select(&snap, "").unwrap();
        let expected = fnv1a_32(b"") as usize % 2;
        assert!(Arc::ptr_eq(&anonymous, &snap.backends[expected]));
    }

    #[test]
    fn test_ip_hash_only_healthy() {
        let registry = registry_with(vec![
            Backend::new("192.168.1.1", 80, "test-service"),
            healthy("192.168.1.2", 1),
        ]);
        let selector = BackendSelector::new(BalancerType::IPHash);
        let snap = snapshot(&registry);

        for client in ["10.0.0.1", "10.0.0.2", "10.0.0.3", ""] {
            assert_eq!(selector.select(&snap, client).unwrap().address, "192.168.1.2");
        }
    }

    #[test]
    fn test_random_selection_distribution() {
        let registry = registry_with(vec![
            healthy("192.168.1.1", 1),
            healthy("192.168.1.2", 1),
            Backend::new("192.168.1.3", 80, "test-service"),
        ]);
        let selector = BackendSelector::new(BalancerType::RandomSelection);
        let snap = snapshot(&registry);

        let iterations = 2000;
        let mut selections: HashMap<String, u32> = HashMap::new();
        for _ in 0..iterations {
            let backend = selector.select(&snap, "").unwrap();
            *selections.entry(backend.address.clone()).or_insert(0) += 1;
        }

        assert_eq!(selections.len(), 2);
        assert!(!selections.contains_key("192.168.1.3"));
        for count in selections.values() {
            let ratio = f64::from(*count) / f64::from(iterations);
            assert!((0.4..=0.6).contains(&ratio), "biased distribution: {ratio}");
        }
    }

    #[test]
    fn test_random_selection_no_healthy() {
        let registry = registry_with(vec![Backend::new("192.168.1.1", 80, "test-service")]);
        let selector = BackendSelector::new(BalancerType::RandomSelection);
        assert!(selector.select(&snapshot(&registry), "").is_none());
    }

    #[test]
    fn test_empty_snapshot() {
        let registry = registry_with(vec![healthy("192.168.1.1", 1)]);
        registry.remove_backend("192.168.1.1", "test-service");
        let snap = snapshot(&registry);

        for algorithm in [
            BalancerType::RoundRobin,
            BalancerType::LeastConnection,
            BalancerType::WeightedRoundRobin,
            BalancerType::IPHash,
            BalancerType::RandomSelection,
        ] {
            assert!(BackendSelector::new(algorithm).select(&snap, "").is_none());
        }
    }
}
