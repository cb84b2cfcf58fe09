use super::{Backend, BackendRegistry, BackendSelector, HealthChecker, LoadBalancerStats};
use helios_core::{BalancerConfig, MetricsRecorder};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// 负载均衡管理器
///
/// 整合后端注册表、选择器和健康检查器，提供统一的接口。
/// 启用健康检查时，构造函数会在当前 tokio runtime 中启动后台检查任务，
/// 因此必须在 runtime 内调用。
pub struct LoadBalanceManager {
    config: Arc<BalancerConfig>,
    registry: Arc<BackendRegistry>,
    selector: BackendSelector,
    recorder: Option<Arc<dyn MetricsRecorder>>,
    cancel: CancellationToken,
    health_task: Mutex<Option<JoinHandle<()>>>,
}

impl LoadBalanceManager {
    /// 创建新的负载均衡管理器
    pub fn new(config: BalancerConfig) -> Self {
        Self::build(config, None)
    }

    /// 创建带指标记录器的负载均衡管理器
    ///
    /// 只有 `metrics_enabled` 为 true 时才会向记录器推送选择结果和探测结果
    pub fn with_metrics(config: BalancerConfig, recorder: Arc<dyn MetricsRecorder>) -> Self {
        Self::build(config, Some(recorder))
    }

    fn build(config: BalancerConfig, recorder: Option<Arc<dyn MetricsRecorder>>) -> Self {
        let recorder = recorder.filter(|_| config.metrics_enabled);
        let registry = Arc::new(BackendRegistry::new());
        let selector = BackendSelector::from_config(&config);
        let cancel = CancellationToken::new();

        let health_task = if config.health_check {
            let mut checker = HealthChecker::new(
                registry.clone(),
                config.check_interval(),
                config.probe_timeout(),
            );
            if let Some(recorder) = &recorder {
                checker = checker.with_recorder(recorder.clone());
            }
            Some(Arc::new(checker).spawn(cancel.clone()))
        } else {
            None
        };

        info!(
            "Initialized load balancer: algorithm={}, health_check={}",
            config.algorithm, config.health_check
        );

        Self {
            config: Arc::new(config),
            registry,
            selector,
            recorder,
            cancel,
            health_task: Mutex::new(health_task),
        }
    }

    /// 添加后端
    pub fn add_backend(&self, backend: impl Into<Arc<Backend>>) -> Arc<Backend> {
        self.registry.add_backend(backend)
    }

    /// 删除后端，按地址和服务名匹配第一个
    pub fn remove_backend(&self, address: &str, service_name: &str) -> Option<Arc<Backend>> {
        self.registry.remove_backend(address, service_name)
    }

    /// 为指定服务选择下一个后端
    ///
    /// `client_id` 只在 IPHash 算法下使用；没有可用后端时返回 `None`
    pub fn next_backend(&self, service_name: &str, client_id: &str) -> Option<Arc<Backend>> {
        let selected = self
            .registry
            .service_snapshot(service_name)
            .and_then(|snapshot| self.selector.select(&snapshot, client_id));

        match &selected {
            Some(backend) => debug!(
                "Selected backend {} for service {} using {}",
                backend.endpoint(),
                service_name,
                self.selector.algorithm()
            ),
            None => debug!("No backend available for service {}", service_name),
        }

        if let Some(recorder) = &self.recorder {
            let status = if selected.is_some() { "success" } else { "no_backend" };
            recorder.record_operation(service_name, "select", status);
        }

        selected
    }

    /// 连接数加一，由调用方在实际建立连接后调用
    pub fn increment_connections(&self, backend: &Backend) {
        backend.increment_connections();
    }

    /// 连接数减一
    pub fn decrement_connections(&self, backend: &Backend) {
        backend.decrement_connections();
    }

    /// 获取服务统计，未知服务返回全零
    pub fn get_stats(&self, service_name: &str) -> LoadBalancerStats {
        self.registry.stats(service_name)
    }

    /// 把所有后端的健康状态和连接数推送给指标记录器
    pub fn update_metrics(&self, recorder: &dyn MetricsRecorder) {
        for (service_name, backends) in self.registry.snapshot_all() {
            for backend in backends {
                recorder.record_backend_health(&backend.address, &service_name, backend.is_healthy());
                recorder.record_backend_connections(
                    &backend.address,
                    &service_name,
                    f64::from(backend.connections()),
                );
            }
        }
    }

    /// 获取注册表的引用
    pub fn registry(&self) -> Arc<BackendRegistry> {
        self.registry.clone()
    }

    /// 获取配置的引用
    pub fn get_config(&self) -> Arc<BalancerConfig> {
        self.config.clone()
    }

    /// 健康检查任务是否仍在运行
    pub async fn is_running(&self) -> bool {
        self.health_task
            .lock()
            .await
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }

    /// 停止健康检查
    ///
    /// 可重复调用。返回时后台任务和正在进行的一轮探测都已结束，
    /// 之后不会再有健康状态写入。
    pub async fn stop(&self) {
        let mut task = self.health_task.lock().await;
        self.cancel.cancel();

        // 句柄在任务结束后才移除，`stop()` 中途被取消时下一次调用仍会等待
        if let Some(handle) = task.as_mut() {
            let result = handle.await;
            *task = None;
            if let Err(e) = result {
                tracing::error!("Health check task failed: {}", e);
            }
            info!("Load balancer stopped");
        }
    }
}

impl Drop for LoadBalanceManager {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
