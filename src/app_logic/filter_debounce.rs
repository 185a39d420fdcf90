/*
 * Single-shot debounce for the search box. Every edit replaces the pending
 * text and restarts the quiet window; nothing queues up. The event loop
 * polls with the current instant and receives the text once the window has
 * passed without further edits.
 */
use std::time::{Duration, Instant};

#[derive(Debug)]
pub struct FilterDebouncer {
    delay: Duration,
    pending: Option<(String, Instant)>,
}

impl FilterDebouncer {
    pub fn new(delay: Duration) -> Self {
        FilterDebouncer {
            delay,
            pending: None,
        }
    }

    /// Records an edit made at `now`, cancelling any pending one.
    pub fn input(&mut self, text: String, now: Instant) {
        self.pending = Some((text, now + self.delay));
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|(_, deadline)| *deadline)
    }

    /// Returns the pending text if its quiet window has elapsed at `now`.
    pub fn poll(&mut self, now: Instant) -> Option<String> {
        match &self.pending {
            Some((_, deadline)) if now >= *deadline => self.pending.take().map(|(text, _)| text),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DELAY: Duration = Duration::from_millis(200);

    #[test]
    fn test_nothing_before_the_delay() {
        let start = Instant::now();
        let mut debouncer = FilterDebouncer::new(DELAY);
        debouncer.input("ri".to_string(), start);

        assert_eq!(debouncer.poll(start + Duration::from_millis(199)), None);
        assert_eq!(debouncer.poll(start + DELAY), Some("ri".to_string()));
        assert_eq!(debouncer.poll(start + Duration::from_secs(5)), None);
    }

    #[test]
    fn test_only_last_of_rapid_inputs_fires() {
        let start = Instant::now();
        let mut debouncer = FilterDebouncer::new(DELAY);
        debouncer.input("r".to_string(), start);
        debouncer.input("ri".to_string(), start + Duration::from_millis(100));
        debouncer.input("rig".to_string(), start + Duration::from_millis(150));

        // The first deadline has passed, but it was restarted.
        assert_eq!(debouncer.poll(start + Duration::from_millis(250)), None);
        assert_eq!(
            debouncer.deadline(),
            Some(start + Duration::from_millis(350))
        );
        assert_eq!(
            debouncer.poll(start + Duration::from_millis(350)),
            Some("rig".to_string())
        );
        assert_eq!(debouncer.deadline(), None);
    }
}
