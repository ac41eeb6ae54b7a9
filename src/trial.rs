// CLASSIFICATION: COMMUNITY
// Filename: trial.rs v0.1
// Author: Lukas Bower
// Date Modified: 2026-10-16

//! Sequential trial loop.
//!
//! Trials run strictly one after another: trial `i` has produced its
//! results and disarmed the interceptor before trial `i + 1` arms it.
//! Within a trial the probes run in the order they were registered.

use log::info;
use serde::{Deserialize, Serialize};

use crate::config::{HarnessConfig, TestSelection};
use crate::guard::{CrashGuard, RunResult};
use crate::interceptor::{FaultInterceptor, PlatformInterceptor};
use crate::probe::{FaultProbe, HeapOverflowProbe, KernelAccessProbe, ProbeError, ProbeKind};
use crate::report::ReportError;
use crate::HarnessError;

/// One labelled result.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrialRecord {
    /// 1-based trial number.
    pub trial: u32,
    pub kind: ProbeKind,
    pub result: RunResult,
}

pub struct TrialRunner<I: FaultInterceptor = PlatformInterceptor> {
    guard: CrashGuard<I>,
    probes: Vec<Box<dyn FaultProbe>>,
}

impl TrialRunner<PlatformInterceptor> {
    /// Runner for the probes `config.selection` names, on the platform guard.
    pub fn from_config(config: &HarnessConfig) -> Result<Self, ProbeError> {
        let mut runner = Self::new(CrashGuard::new());
        for kind in config.selection.kinds() {
            let probe: Box<dyn FaultProbe> = match kind {
                ProbeKind::Heap => Box::new(HeapOverflowProbe::new(
                    config.allocation_size,
                    config.overrun_size,
                )?),
                ProbeKind::Kernel => Box::new(KernelAccessProbe::new(config.address)?),
            };
            runner.add_probe(probe);
        }
        Ok(runner)
    }
}

impl<I: FaultInterceptor> TrialRunner<I> {
    pub fn new(guard: CrashGuard<I>) -> Self {
        Self {
            guard,
            probes: Vec::new(),
        }
    }

    pub fn add_probe(&mut self, probe: Box<dyn FaultProbe>) {
        self.probes.push(probe);
    }

    pub fn probe_kinds(&self) -> Vec<ProbeKind> {
        self.probes.iter().map(|p| p.kind()).collect()
    }

    pub fn guard(&self) -> &CrashGuard<I> {
        &self.guard
    }

    /// Run `trials` trials, handing each record to `sink` as soon as it
    /// exists. Nothing is retained; returns the number of records produced.
    /// The first guard or sink error stops the loop.
    pub fn stream<F>(&mut self, trials: u32, mut sink: F) -> Result<u64, HarnessError>
    where
        F: FnMut(&TrialRecord) -> Result<(), ReportError>,
    {
        let mut produced = 0u64;
        for trial in 1..=trials {
            for probe in self.probes.iter_mut() {
                let result = self.guard.run(probe.as_mut())?;
                let record = TrialRecord {
                    trial,
                    kind: probe.kind(),
                    result,
                };
                sink(&record)?;
                produced += 1;
            }
            info!("trial {}/{} complete", trial, trials);
        }
        Ok(produced)
    }

    /// As [`TrialRunner::stream`], also returning every record in execution
    /// order.
    pub fn run<F>(&mut self, trials: u32, mut sink: F) -> Result<Vec<TrialRecord>, HarnessError>
    where
        F: FnMut(&TrialRecord) -> Result<(), ReportError>,
    {
        let mut records = Vec::new();
        self.stream(trials, |record| {
            sink(record)?;
            records.push(*record);
            Ok(())
        })?;
        Ok(records)
    }
}

/// Convenience wrapper: run `trials` trials of `selection` with default
/// probe parameters, collecting results only.
pub fn run_selection(selection: TestSelection, trials: u32) -> Result<Vec<TrialRecord>, HarnessError> {
    let config = HarnessConfig {
        selection,
        trials,
        ..HarnessConfig::default()
    };
    let mut runner = TrialRunner::from_config(&config).map_err(crate::guard::GuardError::Setup)?;
    runner.run(trials, |_| Ok(()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interceptor::{ArmToken, InterceptorError, Outcome, ProtectedOp};

    #[derive(Default)]
    struct AlwaysFaults {
        armed: bool,
    }

    impl FaultInterceptor for AlwaysFaults {
        fn name(&self) -> &'static str {
            "always-faults"
        }
        fn arm(&mut self) -> Result<ArmToken, InterceptorError> {
            assert!(!self.armed, "armed twice without disarm");
            self.armed = true;
            Ok(ArmToken::new())
        }
        fn run_protected(
            &mut self,
            _token: ArmToken,
            _operation: ProtectedOp<'_>,
        ) -> Result<Outcome, InterceptorError> {
            Ok(Outcome::Faulted)
        }
        fn disarm(&mut self) -> Result<(), InterceptorError> {
            self.armed = false;
            Ok(())
        }
        fn is_armed(&self) -> bool {
            self.armed
        }
    }

    struct Labelled(ProbeKind);

    impl FaultProbe for Labelled {
        fn kind(&self) -> ProbeKind {
            self.0
        }
        fn execute(&mut self) -> Result<(), ProbeError> {
            Ok(())
        }
    }

    fn runner() -> TrialRunner<AlwaysFaults> {
        let mut runner = TrialRunner::new(CrashGuard::with_interceptor(AlwaysFaults::default()));
        runner.add_probe(Box::new(Labelled(ProbeKind::Heap)));
        runner.add_probe(Box::new(Labelled(ProbeKind::Kernel)));
        runner
    }

    #[test]
    fn records_follow_execution_order() {
        let mut runner = runner();
        let records = runner.run(3, |_| Ok(())).unwrap();
        let order: Vec<(u32, ProbeKind)> = records.iter().map(|r| (r.trial, r.kind)).collect();
        assert_eq!(
            order,
            vec![
                (1, ProbeKind::Heap),
                (1, ProbeKind::Kernel),
                (2, ProbeKind::Heap),
                (2, ProbeKind::Kernel),
                (3, ProbeKind::Heap),
                (3, ProbeKind::Kernel),
            ]
        );
        assert!(records.iter().all(|r| r.result.crashed));
        assert_eq!(runner.guard().runs(), 6);
    }

    #[test]
    fn sink_sees_every_record_before_return() {
        let mut runner = runner();
        let mut seen = Vec::new();
        let records = runner
            .run(2, |rec| {
                seen.push(*rec);
                Ok(())
            })
            .unwrap();
        assert_eq!(seen, records);
    }

    #[test]
    fn sink_error_stops_the_loop() {
        let mut runner = runner();
        let mut calls = 0;
        let err = runner
            .run(5, |_| {
                calls += 1;
                Err(ReportError::Row {
                    line: calls,
                    reason: "sink full".into(),
                })
            })
            .unwrap_err();
        assert!(matches!(err, HarnessError::Report(ReportError::Row { line: 1, .. })));
        assert_eq!(calls, 1);
        assert!(!runner.guard().interceptor().is_armed());
    }

    #[test]
    fn huge_trial_count_reserves_nothing_up_front() {
        let mut runner = runner();
        let mut calls = 0u32;
        let err = runner
            .run(u32::MAX, |_| {
                calls += 1;
                if calls == 3 {
                    return Err(ReportError::Header {
                        found: "stop".into(),
                    });
                }
                Ok(())
            })
            .unwrap_err();
        assert!(matches!(err, HarnessError::Report(ReportError::Header { .. })));
        assert_eq!(calls, 3);
        assert_eq!(runner.guard().runs(), 3);
    }

    #[test]
    fn stream_counts_without_collecting() {
        let mut runner = runner();
        let mut kinds = Vec::new();
        let produced = runner
            .stream(4, |rec| {
                kinds.push(rec.kind);
                Ok(())
            })
            .unwrap();
        assert_eq!(produced, 8);
        assert_eq!(kinds.len(), 8);
        assert_eq!(kinds[6..], [ProbeKind::Heap, ProbeKind::Kernel]);
    }

    #[test]
    fn from_config_builds_selected_probes() {
        let both = TrialRunner::from_config(&HarnessConfig::default()).unwrap();
        assert_eq!(both.probe_kinds(), vec![ProbeKind::Heap, ProbeKind::Kernel]);
        let heap_only = TrialRunner::from_config(&HarnessConfig {
            selection: TestSelection::Heap,
            ..HarnessConfig::default()
        })
        .unwrap();
        assert_eq!(heap_only.probe_kinds(), vec![ProbeKind::Heap]);
    }
}
