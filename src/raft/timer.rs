use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio::sync::mpsc;

/// Draws one election timeout: a fixed base plus a uniform jitter window.
/// Jitter keeps two followers from timing out in lockstep and splitting
/// the vote.
pub fn random_election_timeout(base_ms: u64, jitter_ms: u64) -> Duration {
    if jitter_ms == 0 {
        return Duration::from_millis(base_ms);
    }
    let mut rng = rand::thread_rng();
    Duration::from_millis(base_ms + rng.gen_range(0..jitter_ms))
}

#[derive(Debug)]
enum TimerCommand {
    Reset,
    Stop,
}

/// A cancellable recurring timer.
///
/// The timer is an armed/disarmed state machine owned by a single tokio
/// task, controlled through `reset` and `stop`. Each (re)arming draws a
/// fresh interval from the supplied closure, so the election timer gets
/// exactly one jitter draw per reset. On fire the callback is invoked
/// once and the timer rearms itself unless a `stop` is already queued:
/// the control channel is drained before an elapsed countdown is
/// honored, so the last intent always wins.
///
/// Timers start disarmed. Dropping the handle shuts the task down.
pub struct PeriodicTimer {
    ctrl: mpsc::UnboundedSender<TimerCommand>,
    armed: Arc<AtomicBool>,
}

impl PeriodicTimer {
    pub fn spawn<I, F, Fut>(mut interval: I, mut on_fire: F) -> Self
    where
        I: FnMut() -> Duration + Send + 'static,
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (ctrl, mut rx) = mpsc::unbounded_channel();
        let armed = Arc::new(AtomicBool::new(false));
        let armed_flag = armed.clone();

        tokio::spawn(async move {
            let mut is_armed = false;
            loop {
                if !is_armed {
                    match rx.recv().await {
                        Some(TimerCommand::Reset) => {
                            is_armed = true;
                            armed_flag.store(true, Ordering::SeqCst);
                        }
                        Some(TimerCommand::Stop) => {}
                        None => return,
                    }
                    continue;
                }

                let sleep = tokio::time::sleep(interval());
                tokio::pin!(sleep);
                tokio::select! {
                    biased;
                    cmd = rx.recv() => match cmd {
                        // restart the countdown with a fresh draw
                        Some(TimerCommand::Reset) => {}
                        Some(TimerCommand::Stop) => {
                            is_armed = false;
                            armed_flag.store(false, Ordering::SeqCst);
                        }
                        None => return,
                    },
                    () = &mut sleep => {
                        on_fire().await;
                    }
                }
            }
        });

        Self { ctrl, armed }
    }

    /// (Re)arms the timer. A running countdown restarts from a freshly
    /// drawn interval.
    pub fn reset(&self) {
        let _ = self.ctrl.send(TimerCommand::Reset);
    }

    /// Disarms the timer. A stop issued while a fire is in flight
    /// prevents any further fires.
    pub fn stop(&self) {
        let _ = self.ctrl.send(TimerCommand::Stop);
    }

    pub fn is_armed(&self) -> bool {
        self.armed.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn counting_timer(interval_ms: u64) -> (PeriodicTimer, Arc<AtomicUsize>) {
        let fires = Arc::new(AtomicUsize::new(0));
        let counter = fires.clone();
        let timer = PeriodicTimer::spawn(
            move || Duration::from_millis(interval_ms),
            move || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                }
            },
        );
        (timer, fires)
    }

    #[tokio::test]
    async fn starts_disarmed_and_never_fires() {
        let (timer, fires) = counting_timer(10);
        tokio::time::sleep(Duration::from_millis(80)).await;
        assert!(!timer.is_armed());
        assert_eq!(fires.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn fires_periodically_after_reset() {
        let (timer, fires) = counting_timer(10);
        timer.reset();
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(timer.is_armed());
        // ~20 fires expected, allow plenty of scheduling slack
        assert!(fires.load(Ordering::SeqCst) >= 3);
    }

    #[tokio::test]
    async fn stop_prevents_further_fires() {
        let (timer, fires) = counting_timer(10);
        timer.reset();
        tokio::time::sleep(Duration::from_millis(60)).await;
        timer.stop();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!timer.is_armed());
        let after_stop = fires.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(fires.load(Ordering::SeqCst), after_stop);
    }

    #[tokio::test]
    async fn reset_restarts_the_countdown() {
        let (timer, fires) = counting_timer(200);
        timer.reset();
        tokio::time::sleep(Duration::from_millis(120)).await;
        timer.reset();
        // 120ms into the original countdown plus 60ms into the new one:
        // the original would have fired by now, the restarted one not yet
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(fires.load(Ordering::SeqCst), 0);
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(fires.load(Ordering::SeqCst) >= 1);
    }

    #[tokio::test]
    async fn stop_then_reset_rearms() {
        let (timer, fires) = counting_timer(10);
        timer.reset();
        timer.stop();
        timer.reset();
        tokio::time::sleep(Duration::from_millis(80)).await;
        assert!(timer.is_armed());
        assert!(fires.load(Ordering::SeqCst) >= 1);
    }

    #[test]
    fn election_timeout_within_window() {
        for _ in 0..100 {
            let d = random_election_timeout(2000, 1000);
            assert!(d >= Duration::from_millis(2000));
            assert!(d < Duration::from_millis(3000));
        }
    }

    #[test]
    fn election_timeout_without_jitter_is_fixed() {
        assert_eq!(random_election_timeout(500, 0), Duration::from_millis(500));
    }
}
