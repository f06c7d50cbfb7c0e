use crate::collectors::WarnOnce;
use crate::drivers::FormatDriver;
use crate::error::{CaptureError, FieldError, TargetError};
use crate::record::{Record, Tags};
use chrono::Utc;
use log::{debug, error, info};
use std::fmt;
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// One configured collection target: a command and the driver for its output
#[derive(Clone)]
pub struct Target {
    /// Identity used in errors and for warn-once de-duplication
    pub name: String,
    pub program: String,
    pub args: Vec<String>,
    pub timeout: Duration,
    /// Append stderr to the captured text
    pub combined_output: bool,
    /// Tags copied onto every record of this target
    pub base_tags: Tags,
    pub driver: Arc<dyn FormatDriver>,
}

impl Target {
    pub fn new(name: impl Into<String>, program: impl Into<String>, driver: Arc<dyn FormatDriver>) -> Self {
        Self {
            name: name.into(),
            program: program.into(),
            args: Vec::new(),
            timeout: Duration::from_secs(3),
            combined_output: false,
            base_tags: Tags::new(),
            driver,
        }
    }

    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_combined_output(mut self) -> Self {
        self.combined_output = true;
        self
    }

    pub fn with_base_tags(mut self, tags: Tags) -> Self {
        self.base_tags = tags;
        self
    }

    /// Run the command through `sudo -n`
    pub fn with_sudo(mut self) -> Self {
        let program = std::mem::replace(&mut self.program, "sudo".to_string());
        let mut args = vec!["-n".to_string(), program];
        args.append(&mut self.args);
        self.args = args;
        self
    }
}

impl fmt::Debug for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Target")
            .field("name", &self.name)
            .field("program", &self.program)
            .field("args", &self.args)
            .field("timeout", &self.timeout)
            .field("combined_output", &self.combined_output)
            .field("base_tags", &self.base_tags)
            .field("driver", &self.driver.name())
            .finish()
    }
}

/// Source of the raw text for a target
#[cfg_attr(test, mockall::automock)]
pub trait TextSource: Send + Sync {
    /// Run the target's command (or client call) and return its output
    fn capture(&self, target: &Target) -> Result<String, CaptureError>;
}

/// Receiver of emitted records
pub trait Sink: Send + Sync {
    fn emit(&self, record: Record);
}

impl Sink for Sender<Record> {
    fn emit(&self, record: Record) {
        if self.send(record).is_err() {
            debug!("Record receiver dropped, discarding record");
        }
    }
}

/// Outcome of one collection cycle over all targets
#[derive(Debug, Default)]
pub struct CycleReport {
    pub emitted: usize,
    pub errors: Vec<TargetError>,
    pub field_errors: Vec<FieldError>,
}

impl CycleReport {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty() && self.field_errors.is_empty()
    }
}

type TargetOutcome = Result<(usize, Vec<FieldError>), TargetError>;

/// Collection façade: capture, parse and emit for every configured target
///
/// A failing target never stops its siblings; failures are accumulated in the
/// returned [`CycleReport`].
pub struct Collector<S: TextSource> {
    source: S,
    concurrent: bool,
    stamp: bool,
    warned: WarnOnce,
}

impl<S: TextSource> Collector<S> {
    /// Create a collector over a text source
    ///
    /// # Arguments
    ///
    /// * `source` - Where target output comes from (normally [`super::SystemRunner`])
    /// * `concurrent` - Collect targets on parallel threads
    pub fn new(source: S, concurrent: bool) -> Self {
        Self {
            source,
            concurrent,
            stamp: true,
            warned: WarnOnce::new(),
        }
    }

    /// Whether records get the capture time as timestamp
    pub fn with_timestamps(mut self, stamp: bool) -> Self {
        self.stamp = stamp;
        self
    }

    pub fn warned(&self) -> &WarnOnce {
        &self.warned
    }

    /// Run one cycle over all targets
    pub fn collect_once(&self, targets: &[Target], sink: &dyn Sink) -> CycleReport {
        debug!("Collecting {} targets (concurrent: {})", targets.len(), self.concurrent);

        let outcomes: Vec<TargetOutcome> = if self.concurrent && targets.len() > 1 {
            thread::scope(|scope| {
                let handles: Vec<_> = targets
                    .iter()
                    .map(|target| scope.spawn(move || self.collect_target(target, sink)))
                    .collect();
                handles
                    .into_iter()
                    .zip(targets)
                    .map(|(handle, target)| {
                        handle.join().unwrap_or_else(|_| {
                            Err(TargetError::Capture {
                                target: target.name.clone(),
                                source: CaptureError::Spawn("collection thread panicked".to_string()),
                            })
                        })
                    })
                    .collect()
            })
        } else {
            targets.iter().map(|target| self.collect_target(target, sink)).collect()
        };

        let mut report = CycleReport::default();
        for outcome in outcomes {
            match outcome {
                Ok((emitted, field_errors)) => {
                    report.emitted += emitted;
                    report.field_errors.extend(field_errors);
                }
                Err(e) => report.errors.push(e),
            }
        }

        info!(
            "Cycle finished: {} records, {} target errors, {} dropped fields",
            report.emitted,
            report.errors.len(),
            report.field_errors.len()
        );
        report
    }

    fn collect_target(&self, target: &Target, sink: &dyn Sink) -> TargetOutcome {
        let text = match self.source.capture(target) {
            Ok(text) => {
                self.warned.clear(&target.name);
                text
            }
            Err(e) => {
                match &e {
                    CaptureError::NotFound(program) => {
                        self.warned
                            .warn(&target.name, &format!("executable {} not found", program));
                    }
                    other => error!("{}: capture failed: {}", target.name, other),
                }
                return Err(TargetError::Capture {
                    target: target.name.clone(),
                    source: e,
                });
            }
        };
        let captured_at = Utc::now();

        let output = target
            .driver
            .parse(&text, &target.base_tags)
            .map_err(|e| {
                error!("{}: {}", target.name, e);
                TargetError::Parse {
                    target: target.name.clone(),
                    source: e,
                }
            })?;

        for field_error in &output.field_errors {
            debug!("{}: {}", target.name, field_error);
        }

        let emitted = output.records.len();
        for mut record in output.records {
            if self.stamp {
                record.timestamp = Some(captured_at);
            }
            sink.emit(record);
        }
        debug!("{}: emitted {} records", target.name, emitted);
        Ok((emitted, output.field_errors))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::{BbuDriver, IptablesDriver, ListingMode, PikaInfoDriver};
    use crate::error::ParseError;
    use std::sync::mpsc;

    const BBU: &str = "BBU status for Adapter: 0\nBatteryType: BBU\nBattery State: Optimal\nRelative State of Charge: 90 %\nCharger Status: Complete\nisSOHGood: Yes\n";

    fn targets() -> Vec<Target> {
        vec![
            Target::new("megacli bbu", "MegaCli", Arc::new(BbuDriver)),
            Target::new(
                "iptables filter INPUT",
                "iptables",
                Arc::new(IptablesDriver::new("filter", "INPUT", ListingMode::Chain)),
            ),
            Target::new("pika localhost:9221", "redis-cli", Arc::new(PikaInfoDriver::new())),
        ]
    }

    fn source() -> MockTextSource {
        let mut source = MockTextSource::new();
        source.expect_capture().returning(|target: &Target| match target.program.as_str() {
            "MegaCli" => Ok(BBU.to_string()),
            "iptables" => Ok("-P INPUT ACCEPT\n-A INPUT -j DROP\n".to_string()),
            _ => Err(CaptureError::Timeout(Duration::from_secs(3))),
        });
        source
    }

    #[test]
    fn test_failing_target_does_not_stop_siblings() {
        for concurrent in [false, true] {
            let collector = Collector::new(source(), concurrent);
            let (tx, rx) = mpsc::channel();
            let report = collector.collect_once(&targets(), &tx);
            drop(tx);

            let records: Vec<Record> = rx.iter().collect();
            assert_eq!(report.emitted, 2);
            assert_eq!(records.len(), 2);
            assert_eq!(report.errors.len(), 1);
            assert_eq!(report.errors[0].target(), "pika localhost:9221");
            assert!(matches!(
                report.errors[0],
                TargetError::Capture {
                    source: CaptureError::Timeout(_),
                    ..
                }
            ));
        }
    }

    #[test]
    fn test_parse_error_is_reported_per_target() {
        let mut source = MockTextSource::new();
        source
            .expect_capture()
            .returning(|_| Ok("Adapter 0: Get BBU Status Failed.\n".to_string()));
        let collector = Collector::new(source, false);
        let (tx, _rx) = mpsc::channel();

        let report = collector.collect_once(&targets()[..1], &tx);
        assert_eq!(report.emitted, 0);
        assert!(matches!(
            report.errors[0],
            TargetError::Parse {
                source: ParseError::Structural(_),
                ..
            }
        ));
    }

    #[test]
    fn test_records_are_stamped_and_tagged() {
        let mut base = Tags::new();
        base.insert("host".to_string(), "raid01".to_string());
        let target = Target::new("megacli bbu", "MegaCli", Arc::new(BbuDriver)).with_base_tags(base);

        let (tx, rx) = mpsc::channel();
        Collector::new(source(), false).collect_once(&[target.clone()], &tx);
        let record = rx.try_recv().unwrap();
        assert!(record.timestamp.is_some());
        assert_eq!(record.tag("host"), Some("raid01"));

        let (tx, rx) = mpsc::channel();
        Collector::new(source(), false)
            .with_timestamps(false)
            .collect_once(&[target], &tx);
        assert!(rx.try_recv().unwrap().timestamp.is_none());
    }

    #[test]
    fn test_missing_executable_warns_once_and_clears() {
        let mut source = MockTextSource::new();
        let mut seq = mockall::Sequence::new();
        source
            .expect_capture()
            .times(2)
            .in_sequence(&mut seq)
            .returning(|t: &Target| Err(CaptureError::NotFound(t.program.clone())));
        source
            .expect_capture()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(BBU.to_string()));

        let collector = Collector::new(source, false);
        let (tx, _rx) = mpsc::channel();
        let bbu = &targets()[..1];

        collector.collect_once(bbu, &tx);
        assert!(collector.warned().contains("megacli bbu"));
        collector.collect_once(bbu, &tx);
        assert_eq!(collector.warned().len(), 1);

        let report = collector.collect_once(bbu, &tx);
        assert!(report.is_clean());
        assert!(collector.warned().is_empty());
    }

    #[test]
    fn test_with_sudo_wraps_command() {
        let target = Target::new("iptables filter INPUT", "/sbin/iptables", Arc::new(BbuDriver))
            .with_args(vec!["-S".to_string(), "INPUT".to_string()])
            .with_sudo();
        assert_eq!(target.program, "sudo");
        assert_eq!(target.args, vec!["-n", "/sbin/iptables", "-S", "INPUT"]);
    }
}
