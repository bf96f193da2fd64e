use std::path::Path;
use std::time::{Duration, Instant};

pub fn segment_count(dir: &Path) -> usize {
    segment::list_segment_ids(dir).unwrap().len()
}

/// Polls `condition` until it is true or `timeout` elapses, sleeping briefly
/// between attempts. Used to observe background compactor ticks without a
/// fixed sleep racing the tick interval.
pub fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let start = Instant::now();
    loop {
        if condition() {
            return true;
        }
        if start.elapsed() > timeout {
            return false;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
}
