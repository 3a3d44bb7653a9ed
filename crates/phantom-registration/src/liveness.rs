//! Statistical liveness probe for phantom addresses.
//!
//! A live host answers a SYN within about a second from nearly every
//! vantage point, so several parallel connects that all stay silent for the
//! statistical window are taken as "not live". A negative answer means
//! insufficient evidence within budget, not proof of absence.

use crate::config::ProbeConfig;
use crate::error::{RegistrationError, RegistrationResult};
use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tracing::{debug, instrument};

/// Parallel fixed-latency TCP reachability check.
#[derive(Debug, Clone)]
pub struct LivenessProber {
    width: usize,
    statistical_timeout: Duration,
    attempt_timeout: Duration,
}

impl Default for LivenessProber {
    fn default() -> Self {
        Self::from_config(&ProbeConfig::default())
    }
}

impl LivenessProber {
    pub fn new(width: usize, statistical_timeout: Duration, attempt_timeout: Duration) -> Self {
        Self {
            width: width.max(1),
            statistical_timeout,
            attempt_timeout,
        }
    }

    pub fn from_config(config: &ProbeConfig) -> Self {
        Self::new(
            config.width,
            config.statistical_timeout,
            config.attempt_timeout,
        )
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn statistical_timeout(&self) -> Duration {
        self.statistical_timeout
    }

    /// Decide whether something is listening on `target`.
    ///
    /// Always takes the full statistical window. `Ok(())` means at least one
    /// attempt connected; otherwise the error says whether an attempt
    /// failed outright or nothing came back in time.
    #[instrument(skip(self))]
    pub async fn probe(&self, target: SocketAddr) -> RegistrationResult<()> {
        let attempt_timeout = self.attempt_timeout;
        let result = self
            .decide(move || bounded_attempt(attempt_timeout, TcpStream::connect(target)))
            .await;

        match &result {
            Ok(()) => debug!("{} is live", target),
            Err(e) => debug!("{} not live: {}", target, e),
        }
        result
    }

    /// [`probe`](Self::probe) collapsed to a yes/no answer.
    pub async fn is_live(&self, target: SocketAddr) -> bool {
        self.probe(target).await.is_ok()
    }

    /// Run `width` attempts in parallel and judge them once the statistical
    /// window closes. An attempt yielding `None` never reports.
    async fn decide<F, Fut>(&self, attempt: F) -> RegistrationResult<()>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Option<io::Result<()>>> + Send + 'static,
    {
        // Capacity `width` lets every attempt deposit its outcome without
        // blocking, including the ones that finish after we stop listening.
        let (tx, mut rx) = mpsc::channel::<io::Result<()>>(self.width);

        for _ in 0..self.width {
            let tx = tx.clone();
            let attempt = attempt();
            tokio::spawn(async move {
                if let Some(outcome) = attempt.await {
                    let _ = tx.try_send(outcome);
                }
            });
        }
        drop(tx);

        tokio::time::sleep(self.statistical_timeout).await;

        match rx.try_recv() {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(RegistrationError::ProbeDialError(e)),
            Err(_) => Err(RegistrationError::ProbeTimeout(self.statistical_timeout)),
        }
    }
}

/// Connect then immediately close, with no data exchanged.
///
/// An attempt that outlives `attempt_timeout` is abandoned without a report,
/// so a silent host is never mistaken for a dial failure.
async fn bounded_attempt<S, C>(attempt_timeout: Duration, connect: C) -> Option<io::Result<()>>
where
    C: Future<Output = io::Result<S>>,
{
    match tokio::time::timeout(attempt_timeout, connect).await {
        Ok(Ok(stream)) => {
            drop(stream);
            Some(Ok(()))
        }
        Ok(Err(e)) => Some(Err(e)),
        Err(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::future::pending;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Instant;
    use tokio::net::TcpListener;

    fn quick_prober() -> LivenessProber {
        LivenessProber::new(8, Duration::from_millis(200), Duration::from_secs(1))
    }

    #[test]
    fn test_defaults() {
        let prober = LivenessProber::default();
        assert_eq!(prober.width(), 8);
        assert_eq!(prober.statistical_timeout(), Duration::from_millis(750));
    }

    #[test]
    fn test_zero_width_is_clamped() {
        let prober = LivenessProber::new(0, Duration::from_millis(1), Duration::from_millis(1));
        assert_eq!(prober.width(), 1);
    }

    #[tokio::test]
    async fn test_listening_port_is_live() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let target = listener.local_addr().unwrap();

        let prober = quick_prober();
        assert!(prober.probe(target).await.is_ok());
        assert!(prober.is_live(target).await);
    }

    #[tokio::test]
    async fn test_closed_port_is_dial_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let target = listener.local_addr().unwrap();
        drop(listener);

        let result = quick_prober().probe(target).await;
        assert!(matches!(result, Err(RegistrationError::ProbeDialError(_))));
    }

    #[tokio::test]
    async fn test_closed_port_decision_latency_is_bounded() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let target = listener.local_addr().unwrap();
        drop(listener);

        let prober = quick_prober();
        let start = Instant::now();
        let _ = prober.probe(target).await;
        let elapsed = start.elapsed();

        assert!(elapsed >= Duration::from_millis(200));
        assert!(elapsed < Duration::from_millis(700), "took {:?}", elapsed);
    }

    #[tokio::test]
    async fn test_zero_window_is_never_live() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let target = listener.local_addr().unwrap();
        drop(listener);

        let prober = LivenessProber::new(4, Duration::ZERO, Duration::from_secs(1));
        let result = prober.probe(target).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_silent_target_times_out_within_window() {
        let prober = LivenessProber::default();
        let window = prober.statistical_timeout();

        let start = Instant::now();
        let result = prober
            .decide(|| bounded_attempt(Duration::from_secs(5), pending::<io::Result<()>>()))
            .await;
        let elapsed = start.elapsed();

        assert!(matches!(result, Err(RegistrationError::ProbeTimeout(t)) if t == window));
        assert!(elapsed >= window);
        assert!(elapsed < window + Duration::from_millis(250), "took {:?}", elapsed);
    }

    #[tokio::test]
    async fn test_attempt_timeout_shorter_than_window_is_not_dial_error() {
        let prober = LivenessProber::new(8, Duration::from_millis(300), Duration::from_millis(50));
        let attempt_timeout = prober.attempt_timeout;

        let result = prober
            .decide(move || bounded_attempt(attempt_timeout, pending::<io::Result<()>>()))
            .await;

        assert!(matches!(result, Err(RegistrationError::ProbeTimeout(_))));
    }

    #[tokio::test]
    async fn test_stragglers_do_not_block_and_release_their_slot() {
        let prober = LivenessProber::new(8, Duration::from_millis(100), Duration::from_secs(1));
        let finished = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&finished);
        let start = Instant::now();
        let result = prober
            .decide(move || {
                let counter = Arc::clone(&counter);
                async move {
                    tokio::time::sleep(Duration::from_millis(200)).await;
                    counter.fetch_add(1, Ordering::SeqCst);
                    Some(Ok(()))
                }
            })
            .await;

        assert!(matches!(result, Err(RegistrationError::ProbeTimeout(_))));
        assert!(start.elapsed() < Duration::from_millis(200));

        // Late attempts still run to completion against the dropped receiver.
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(finished.load(Ordering::SeqCst), 8);
    }

    #[tokio::test]
    async fn test_bounded_attempt_outcomes() {
        let ok = bounded_attempt(Duration::from_secs(1), async { Ok::<_, io::Error>(()) }).await;
        assert!(matches!(ok, Some(Ok(()))));

        let refused = bounded_attempt(Duration::from_secs(1), async {
            Err::<(), _>(io::Error::from(io::ErrorKind::ConnectionRefused))
        })
        .await;
        assert!(matches!(refused, Some(Err(e)) if e.kind() == io::ErrorKind::ConnectionRefused));

        let silent = bounded_attempt(Duration::from_millis(10), pending::<io::Result<()>>()).await;
        assert!(silent.is_none());
    }

    #[test]
    fn test_timeout_error_message() {
        let err = RegistrationError::ProbeTimeout(Duration::from_millis(750));
        assert_eq!(err.to_string(), "Reached statistical timeout 750 ms");
    }
}
