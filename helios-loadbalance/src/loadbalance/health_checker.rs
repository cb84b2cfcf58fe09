use super::{Backend, BackendRegistry};
use futures::future::join_all;
use helios_core::MetricsRecorder;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tokio::time::{interval, timeout, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// 健康检查器
///
/// 定期对注册表中的所有后端做一次TCP连通性探测。
/// 每轮先在读锁下拷贝后端列表，随后不持锁进行网络I/O，
/// 避免探测超时期间阻塞后端增删和选择。
pub struct HealthChecker {
    registry: Arc<BackendRegistry>,
    check_interval: Duration,
    probe_timeout: Duration,
    recorder: Option<Arc<dyn MetricsRecorder>>,
}

impl HealthChecker {
    /// 创建新的健康检查器
    pub fn new(registry: Arc<BackendRegistry>, check_interval: Duration, probe_timeout: Duration) -> Self {
        Self {
            registry,
            check_interval,
            probe_timeout,
            recorder: None,
        }
    }

    /// 每次探测后把结果推送给指标记录器
    pub fn with_recorder(mut self, recorder: Arc<dyn MetricsRecorder>) -> Self {
        self.recorder = Some(recorder);
        self
    }

    pub fn check_interval(&self) -> Duration {
        self.check_interval
    }

    /// 启动健康检查循环
    ///
    /// 第一轮检查立即执行，之后按间隔执行。`cancel` 触发后循环在当前一轮
    /// 检查结束后退出，等待返回的 `JoinHandle` 即可保证不再有健康状态写入。
    pub fn spawn(self: Arc<Self>, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!(
                "Starting health checker with interval: {:?}, probe timeout: {:?}",
                self.check_interval, self.probe_timeout
            );

            let mut ticker = interval(self.check_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        self.check_all_backends().await;
                    }
                }
            }

            info!("Health checker stopped");
        })
    }

    /// 执行一轮健康检查
    pub async fn check_all_backends(&self) {
        let start_time = Instant::now();
        let services = self.registry.snapshot_all();

        let backends: Vec<Arc<Backend>> = services
            .into_iter()
            .flat_map(|(_, backends)| backends)
            .collect();

        if backends.is_empty() {
            debug!("No backends registered, skipping health check");
            return;
        }

        debug!("Starting health check for {} backends", backends.len());

        let results = join_all(backends.iter().map(|backend| self.check_backend(backend))).await;
        let healthy = results.iter().filter(|ok| **ok).count();

        debug!(
            "Completed health check: {}/{} backends healthy in {}ms",
            healthy,
            results.len(),
            start_time.elapsed().as_millis()
        );
    }

    /// 检查单个后端并更新其健康标记
    async fn check_backend(&self, backend: &Backend) -> bool {
        let healthy = Self::probe(backend, self.probe_timeout).await;
        let was_healthy = backend.is_healthy();
        backend.set_healthy(healthy);

        if was_healthy && !healthy {
            warn!("Backend {} marked as unhealthy", backend);
        } else if !was_healthy && healthy {
            info!("Backend {} marked as healthy", backend);
        }

        if let Some(recorder) = &self.recorder {
            recorder.record_backend_health(&backend.address, &backend.service_name, healthy);
        }

        healthy
    }

    /// TCP连通性探测，建立连接即视为健康，连接随即关闭
    pub async fn probe(backend: &Backend, probe_timeout: Duration) -> bool {
        let attempt = async {
            match backend.address.parse::<IpAddr>() {
                Ok(ip) => TcpStream::connect(SocketAddr::new(ip, backend.port)).await,
                Err(_) => TcpStream::connect(backend.endpoint()).await,
            }
        };

        match timeout(probe_timeout, attempt).await {
            Ok(Ok(stream)) => {
                drop(stream);
                true
            }
            Ok(Err(e)) => {
                debug!("Probe to {} failed: {}", backend.endpoint(), e);
                false
            }
            Err(_) => {
                debug!(
                    "Probe to {} timed out after {}ms",
                    backend.endpoint(),
                    probe_timeout.as_millis()
                );
                false
            }
        }
    }
}
