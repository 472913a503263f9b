//! Periodic self-ping that keeps the hosting platform from idling the service.
//!
//! Ticks are fire-and-forget: every tick runs on its own task, so a ping that
//! outlives the interval overlaps with the next one instead of delaying it.
//! Failures are logged and never leave the scheduler.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use codereview_genai::truncate_utf8;
use tokio::task::JoinSet;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info, warn};
use url::Url;

use crate::{config::KeepaliveConfig, http_client, tasks::TaskHandle};

const BODY_LOG_LIMIT: usize = 512;

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum PingOutcome {
    Ok { status: u16 },
    /// Remote answered with a non-success status.
    Status { status: u16, body: String },
    /// No response at all: DNS, connect, or timeout failure.
    Unreachable { error: String },
}

#[async_trait]
pub(crate) trait Probe: Send + Sync + 'static {
    fn target(&self) -> &str;

    async fn probe(&self) -> PingOutcome;
}

pub(crate) struct HttpProbe {
    url: Url,
    client: reqwest::Client,
}

impl HttpProbe {
    pub fn new(url: Url, timeout: Duration) -> Result<Self, reqwest::Error> {
        Ok(Self {
            url,
            client: http_client::client_with_timeout(timeout)?,
        })
    }
}

#[async_trait]
impl Probe for HttpProbe {
    fn target(&self) -> &str {
        self.url.as_str()
    }

    async fn probe(&self) -> PingOutcome {
        let resp = match self.client.get(self.url.clone()).send().await {
            Ok(resp) => resp,
            Err(err) => {
                return PingOutcome::Unreachable {
                    error: err.to_string(),
                }
            }
        };
        let status = resp.status();
        if status.is_success() {
            return PingOutcome::Ok {
                status: status.as_u16(),
            };
        }
        let body = resp.text().await.unwrap_or_default();
        PingOutcome::Status {
            status: status.as_u16(),
            body: truncate_utf8(body.trim(), BODY_LOG_LIMIT).to_string(),
        }
    }
}

pub(crate) struct Pinger {
    probe: Arc<dyn Probe>,
    period: Duration,
}

impl Pinger {
    pub fn new(probe: Arc<dyn Probe>, period: Duration) -> Self {
        Self { probe, period }
    }

    /// Start ticking immediately, then every `period`. Stop via the returned handle;
    /// stopping also aborts pings still in flight.
    pub fn start(self) -> TaskHandle {
        info!(
            target: "codereview::keepalive",
            url = self.probe.target(),
            period_secs = self.period.as_secs(),
            "scheduling self-ping"
        );
        TaskHandle::interval("keepalive.ping", tokio::spawn(self.run()))
    }

    async fn run(self) {
        let mut ticker = interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut inflight = JoinSet::new();
        loop {
            ticker.tick().await;
            while let Some(res) = inflight.try_join_next() {
                log_join(res);
            }
            let probe = self.probe.clone();
            inflight.spawn(async move {
                ping_once(probe.as_ref()).await;
            });
        }
    }
}

/// Build and start the pinger described by `cfg`, or `None` when disabled.
pub(crate) fn start(cfg: &KeepaliveConfig) -> Result<Option<TaskHandle>, reqwest::Error> {
    if !cfg.enabled {
        info!(target: "codereview::keepalive", "self-ping disabled");
        return Ok(None);
    }
    let probe = HttpProbe::new(cfg.url.clone(), cfg.timeout)?;
    Ok(Some(Pinger::new(Arc::new(probe), cfg.interval).start()))
}

pub(crate) async fn ping_once(probe: &dyn Probe) -> PingOutcome {
    let outcome = probe.probe().await;
    let at = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
    let url = probe.target();
    match &outcome {
        PingOutcome::Ok { status } => {
            info!(target: "codereview::keepalive", url, status, %at, "self-ping successful");
        }
        PingOutcome::Status { status, body } => {
            warn!(
                target: "codereview::keepalive",
                url,
                status,
                body = %body,
                %at,
                "self-ping failed: remote returned an error status"
            );
        }
        PingOutcome::Unreachable { error } => {
            warn!(
                target: "codereview::keepalive",
                url,
                error = %error,
                %at,
                "self-ping failed: no response received"
            );
        }
    }
    outcome
}

fn log_join(res: Result<(), tokio::task::JoinError>) {
    if let Err(err) = res {
        if err.is_panic() {
            error!(target: "codereview::keepalive", "self-ping tick panicked");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, routing::get, Router};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tokio::time::Instant;

    const PERIOD: Duration = Duration::from_secs(870);

    enum Behaviour {
        Succeed,
        Fail,
        PanicFirst,
        Slow(Duration),
    }

    struct FakeProbe {
        origin: Instant,
        behaviour: Behaviour,
        calls: Mutex<Vec<Duration>>,
        active: AtomicUsize,
        peak: AtomicUsize,
    }

    impl FakeProbe {
        fn new(behaviour: Behaviour) -> Arc<Self> {
            Arc::new(Self {
                origin: Instant::now(),
                behaviour,
                calls: Mutex::new(Vec::new()),
                active: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
            })
        }

        fn offsets_secs(&self) -> Vec<u64> {
            self.calls
                .lock()
                .expect("calls lock")
                .iter()
                .map(Duration::as_secs)
                .collect()
        }
    }

    #[async_trait]
    impl Probe for FakeProbe {
        fn target(&self) -> &str {
            "http://fake.invalid/"
        }

        async fn probe(&self) -> PingOutcome {
            let n = {
                let mut calls = self.calls.lock().expect("calls lock");
                calls.push(self.origin.elapsed());
                calls.len()
            };
            match self.behaviour {
                Behaviour::Succeed => PingOutcome::Ok { status: 200 },
                Behaviour::Fail => PingOutcome::Unreachable {
                    error: "connection refused".into(),
                },
                Behaviour::PanicFirst => {
                    if n == 1 {
                        panic!("probe exploded");
                    }
                    PingOutcome::Ok { status: 200 }
                }
                Behaviour::Slow(delay) => {
                    let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
                    self.peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(delay).await;
                    self.active.fetch_sub(1, Ordering::SeqCst);
                    PingOutcome::Ok { status: 200 }
                }
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn ticks_at_start_then_every_period() {
        let probe = FakeProbe::new(Behaviour::Succeed);
        let handle = Pinger::new(probe.clone(), PERIOD).start();
        tokio::time::sleep(PERIOD * 2 + Duration::from_secs(1)).await;
        assert_eq!(probe.offsets_secs(), vec![0, 870, 1740]);
        handle.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn failures_do_not_stop_schedule() {
        let probe = FakeProbe::new(Behaviour::Fail);
        let handle = Pinger::new(probe.clone(), PERIOD).start();
        tokio::time::sleep(PERIOD * 5 + Duration::from_secs(1)).await;
        assert_eq!(probe.offsets_secs().len(), 6);
        assert!(!handle.is_finished());
        handle.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn panicking_tick_stays_inside_scheduler() {
        let probe = FakeProbe::new(Behaviour::PanicFirst);
        let handle = Pinger::new(probe.clone(), PERIOD).start();
        tokio::time::sleep(PERIOD * 2 + Duration::from_secs(1)).await;
        assert_eq!(probe.offsets_secs(), vec![0, 870, 1740]);
        assert!(!handle.is_finished());
        handle.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn stop_halts_future_ticks() {
        let probe = FakeProbe::new(Behaviour::Succeed);
        let handle = Pinger::new(probe.clone(), PERIOD).start();
        tokio::time::sleep(Duration::from_secs(1)).await;
        handle.stop().await;
        tokio::time::sleep(PERIOD * 10).await;
        assert_eq!(probe.offsets_secs(), vec![0]);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_ticks_overlap_instead_of_delaying_schedule() {
        let probe = FakeProbe::new(Behaviour::Slow(PERIOD * 3));
        let handle = Pinger::new(probe.clone(), PERIOD).start();
        tokio::time::sleep(PERIOD * 2 + Duration::from_secs(1)).await;
        assert_eq!(probe.offsets_secs(), vec![0, 870, 1740]);
        assert_eq!(probe.peak.load(Ordering::SeqCst), 3);
        handle.stop().await;
    }

    async fn serve(status: StatusCode, body: &'static str) -> Url {
        let app = Router::new().route("/", get(move || async move { (status, body) }));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind");
        let addr = listener.local_addr().expect("addr");
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        Url::parse(&format!("http://{addr}/")).expect("url")
    }

    #[tokio::test]
    async fn http_probe_reports_success() {
        let url = serve(StatusCode::OK, "Hello, AI!").await;
        let probe = HttpProbe::new(url, Duration::from_secs(5)).expect("probe");
        assert_eq!(ping_once(&probe).await, PingOutcome::Ok { status: 200 });
    }

    #[tokio::test]
    async fn http_probe_reports_error_status_with_body() {
        let url = serve(StatusCode::SERVICE_UNAVAILABLE, "waking up").await;
        let probe = HttpProbe::new(url, Duration::from_secs(5)).expect("probe");
        assert_eq!(
            ping_once(&probe).await,
            PingOutcome::Status {
                status: 503,
                body: "waking up".into()
            }
        );
    }

    #[tokio::test]
    async fn http_probe_truncates_long_error_body() {
        let long: &'static str = Box::leak("x".repeat(BODY_LOG_LIMIT + 100).into_boxed_str());
        let url = serve(StatusCode::BAD_GATEWAY, long).await;
        let probe = HttpProbe::new(url, Duration::from_secs(5)).expect("probe");
        match ping_once(&probe).await {
            PingOutcome::Status { status, body } => {
                assert_eq!(status, 502);
                assert_eq!(body.len(), BODY_LOG_LIMIT);
            }
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[tokio::test]
    async fn http_probe_reports_unreachable_target() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind");
        let addr = listener.local_addr().expect("addr");
        drop(listener);
        let url = Url::parse(&format!("http://{addr}/")).expect("url");
        let probe = HttpProbe::new(url, Duration::from_secs(5)).expect("probe");
        assert!(matches!(
            ping_once(&probe).await,
            PingOutcome::Unreachable { .. }
        ));
    }

    #[test]
    fn disabled_config_starts_nothing() {
        let cfg = KeepaliveConfig {
            enabled: false,
            url: Url::parse("http://127.0.0.1:1/").expect("url"),
            interval: PERIOD,
            timeout: Duration::from_secs(1),
        };
        assert!(start(&cfg).expect("start").is_none());
    }
}
