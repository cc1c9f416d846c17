use std::time::Instant;

use crate::PROGRESS_FREQUENCY_SECONDS;

pub fn elapsed_seconds(since: Instant) -> f64 {
    let dt = since.elapsed();
    (dt.as_secs() as f64) + (f64::from(dt.subsec_nanos()) * 1e-9)
}

pub fn prettyprint_usize(x: usize) -> String {
    let num = format!("{}", x);
    let mut result = String::new();
    let mut i = num.len();
    for c in num.chars() {
        result.push(c);
        i -= 1;
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
    }
    result
}

pub fn prettyprint_time(seconds: f64) -> String {
    format!("{:.4}s", seconds)
}

struct Progress {
    label: String,
    processed_items: usize,
    total_items: usize,
    started_at: Instant,
    last_printed_at: Instant,
}

impl Progress {
    fn new(label: String, total_items: usize) -> Progress {
        Progress {
            label,
            processed_items: 0,
            total_items,
            started_at: Instant::now(),
            last_printed_at: Instant::now(),
        }
    }

    // Returns when done
    fn next(&mut self) -> Option<(f64, String)> {
        self.processed_items += 1;
        if self.processed_items > self.total_items {
            log::warn!(
                "{} is too few items for {} progress",
                prettyprint_usize(self.total_items),
                self.label
            );
        }

        if self.processed_items >= self.total_items {
            let elapsed = elapsed_seconds(self.started_at);
            let line = format!(
                "{} ({})... {}",
                self.label,
                prettyprint_usize(self.total_items),
                prettyprint_time(elapsed)
            );
            log::debug!("{}", line);
            return Some((elapsed, line));
        } else if elapsed_seconds(self.last_printed_at) >= PROGRESS_FREQUENCY_SECONDS {
            self.last_printed_at = Instant::now();
            log::debug!(
                "{}: {}/{}... {}",
                self.label,
                prettyprint_usize(self.processed_items),
                prettyprint_usize(self.total_items),
                prettyprint_time(elapsed_seconds(self.started_at))
            );
        }
        None
    }
}

enum StackEntry {
    TimerSpan(TimerSpan),
    Progress(Progress),
}

struct TimerSpan {
    name: String,
    started_at: Instant,
    nested_results: Vec<String>,
    nested_time: f64,
}

/// Hierarchial magic. Spans nest; each one reports how long it took when it stops, and the
/// outermost span prints a summary of everything (plus any notes and warnings) when the Timer is
/// dropped.
pub struct Timer {
    results: Vec<String>,
    stack: Vec<StackEntry>,

    outermost_name: String,

    notes: Vec<String>,
    warnings: Vec<String>,
}

impl Timer {
    pub fn new<S: Into<String>>(raw_name: S) -> Timer {
        let name = raw_name.into();
        let mut t = Timer {
            results: Vec::new(),
            stack: Vec::new(),
            outermost_name: name.clone(),
            notes: Vec::new(),
            warnings: Vec::new(),
        };
        t.start(name);
        t
    }

    /// For callers that don't care about the timing output.
    pub fn throwaway() -> Timer {
        Timer::new("throwaway")
    }

    /// Log immediately, but also repeat at the end, to avoid having to scroll up and find
    /// interesting debug stuff.
    pub fn note<S: Into<String>>(&mut self, raw_line: S) {
        let line = raw_line.into();
        log::info!("{}", line);
        self.notes.push(line);
    }

    pub fn warn<S: Into<String>>(&mut self, raw_line: S) {
        let line = raw_line.into();
        log::warn!("{}", line);
        self.warnings.push(line);
    }

    pub fn warnings(&self) -> &Vec<String> {
        &self.warnings
    }

    /// Used to end the scope of a timer early.
    pub fn done(self) {}

    pub fn start<S: Into<String>>(&mut self, raw_name: S) {
        let name = raw_name.into();
        log::debug!("{}...", name);
        self.stack.push(StackEntry::TimerSpan(TimerSpan {
            name,
            started_at: Instant::now(),
            nested_results: Vec::new(),
            nested_time: 0.0,
        }));
    }

    pub fn stop<S: Into<String>>(&mut self, raw_name: S) {
        let name = raw_name.into();
        let span = match self.stack.pop() {
            Some(StackEntry::TimerSpan(s)) => s,
            Some(StackEntry::Progress(p)) => {
                log::warn!("stop({}) while {} is still in progress", name, p.label);
                return;
            }
            None => {
                log::warn!("stop({}) with nothing started", name);
                return;
            }
        };
        if span.name != name {
            log::warn!("stop({}) doesn't match the open span {}", name, span.name);
        }
        let elapsed = elapsed_seconds(span.started_at);
        let line = format!("{} took {}", name, prettyprint_time(elapsed));

        let padding = "  ".repeat(self.stack.len());
        match self.stack.last_mut() {
            Some(StackEntry::TimerSpan(ref mut s)) => {
                s.nested_results.push(format!("{}- {}", padding, line));
                s.nested_results.extend(span.nested_results);
                if span.nested_time != 0.0 {
                    s.nested_results.push(format!(
                        "  {}- ... plus {}",
                        padding,
                        prettyprint_time(elapsed - span.nested_time)
                    ));
                }
                s.nested_time += elapsed;
            }
            Some(StackEntry::Progress(_)) => {}
            None => {
                self.results.push(format!("{}- {}", padding, line));
                self.results.extend(span.nested_results);
                if span.nested_time != 0.0 {
                    self.results.push(format!(
                        "  - ... plus {}",
                        prettyprint_time(elapsed - span.nested_time)
                    ));
                }
                // Don't bother tracking excess time that the Timer has existed but had no spans
            }
        }

        log::debug!("{}", line);
    }

    /// Track progress through a known number of items. Call `next` once per item.
    pub fn start_iter<S: Into<String>>(&mut self, raw_name: S, total_items: usize) {
        if total_items == 0 {
            return;
        }
        let name = raw_name.into();
        if let Some(StackEntry::Progress(p)) = self.stack.last() {
            log::warn!(
                "Can't start_iter({}) while Progress({}) is top of the stack",
                name,
                p.label
            );
            return;
        }

        self.stack
            .push(StackEntry::Progress(Progress::new(name, total_items)));
    }

    pub fn next(&mut self) {
        let maybe_result =
            if let Some(StackEntry::Progress(ref mut progress)) = self.stack.last_mut() {
                progress.next()
            } else {
                log::warn!("Can't next() while a TimerSpan is top of the stack");
                None
            };
        if let Some((elapsed, result)) = maybe_result {
            self.stack.pop();
            self.add_result(elapsed, result);
        }
    }

    fn add_result(&mut self, elapsed: f64, line: String) {
        let padding = "  ".repeat(self.stack.len());
        match self.stack.last_mut() {
            Some(StackEntry::TimerSpan(ref mut s)) => {
                s.nested_results.push(format!("{}- {}", padding, line));
                s.nested_time += elapsed;
            }
            Some(StackEntry::Progress(_)) => {}
            None => {
                self.results.push(format!("{}- {}", padding, line));
            }
        }
    }
}

impl std::ops::Drop for Timer {
    fn drop(&mut self) {
        let stop_name = self.outermost_name.clone();

        // Unbalanced spans usually mean an early return with `?`. Summarize what we have.
        while self.stack.len() > 1 {
            match self.stack.pop() {
                Some(StackEntry::TimerSpan(s)) => {
                    log::debug!("{} was never stopped", s.name);
                }
                Some(StackEntry::Progress(p)) => {
                    log::debug!("{} stopped early", p.label);
                }
                None => {}
            }
        }
        if self.stack.is_empty() {
            return;
        }
        self.stop(stop_name);

        if self.outermost_name == "throwaway" {
            return;
        }
        for line in &self.results {
            log::debug!("{}", line);
        }

        if !self.notes.is_empty() {
            log::debug!("{} notes:", self.notes.len());
            for line in &self.notes {
                log::debug!("{}", line);
            }
        }

        if !self.warnings.is_empty() {
            log::debug!("{} warnings:", self.warnings.len());
            for line in &self.warnings {
                log::debug!("{}", line);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pretty_numbers() {
        assert_eq!(prettyprint_usize(0), "0");
        assert_eq!(prettyprint_usize(999), "999");
        assert_eq!(prettyprint_usize(1234567), "1,234,567");
    }

    #[test]
    fn nested_spans() {
        let mut timer = Timer::new("outer");
        timer.start("inner");
        timer.start_iter("items", 3);
        for _ in 0..3 {
            timer.next();
        }
        timer.stop("inner");
        timer.warn("something odd");
        assert_eq!(timer.warnings(), &vec!["something odd".to_string()]);
        // Leaving a span open doesn't blow up on drop
        timer.start("forgotten");
    }
}
