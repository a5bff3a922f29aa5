//! Trajectory execution module state

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, error, info};
use serde::Serialize;

// Internal
use super::*;
use crate::mnvr::{GuidCmdSink, LongMnvr, MnvrInputs, MnvrKind};
use util::{
    archive::{Archived, Archiver},
    session::Session,
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A boxed manoeuvre borrowing collaborators for `'a`.
pub type BoxedMnvr<'a> = Box<dyn LongMnvr<'a> + 'a>;

/// An entry in a manoeuvre sequence.
pub struct SeqItem<'a> {
    /// The unplanned manoeuvre
    pub mnvr: BoxedMnvr<'a>,

    /// Length to give the manoeuvre once planned, for manoeuvres which have no
    /// intrinsic length (i.e. steady speed).
    pub length_m: Option<f64>,
}

pub struct TrajExec<'a> {
    params: Params,

    /// Executing mode
    mode: TrajExecMode,

    inputs: &'a dyn MnvrInputs,
    sink: &'a dyn GuidCmdSink,

    /// The planned sequence of manoeuvres to execute.
    sequence: Option<Vec<BoxedMnvr<'a>>>,

    /// Index of the active manoeuvre within the sequence
    mnvr_index: usize,

    report: StatusReport,
    arch_report: Archiver,
}

/// The status report of one cycle of trajectory execution.
#[derive(Default, Copy, Clone, Debug, Serialize)]
pub struct StatusReport {
    /// Distance along the route at the start of the cycle
    pub dist_m: f64,

    /// Index of the active manoeuvre, if one was executed
    pub mnvr_index: Option<usize>,

    /// Type of the active manoeuvre, if one was executed
    pub mnvr_kind: Option<MnvrKind>,

    /// Bounds of the active manoeuvre
    pub start_dist_m: f64,
    pub end_dist_m: f64,

    /// Number of manoeuvres retired during this cycle
    pub num_retired: usize,

    /// True on the cycle the end of the sequence was reached
    pub sequence_finished: bool,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// The possible modes of execution of TrajExec. Each mode is handled by a
/// `mode_xyz` function.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TrajExecMode {
    Off,
    Executing,
    SequenceFinished,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl<'a> SeqItem<'a> {
    /// A manoeuvre which keeps the length it plans itself.
    pub fn new(mnvr: BoxedMnvr<'a>) -> Self {
        Self {
            mnvr,
            length_m: None,
        }
    }

    /// A manoeuvre stretched to the given length once planned.
    pub fn with_length(mnvr: BoxedMnvr<'a>, length_m: f64) -> Self {
        Self {
            mnvr,
            length_m: Some(length_m),
        }
    }
}

impl<'a> TrajExec<'a> {
    /// Create a new executor with no sequence loaded.
    pub fn new(
        params: Params,
        inputs: &'a dyn MnvrInputs,
        sink: &'a dyn GuidCmdSink,
    ) -> Self {
        Self {
            params,
            mode: TrajExecMode::Off,
            inputs,
            sink,
            sequence: None,
            mnvr_index: 0,
            report: StatusReport::default(),
            arch_report: Archiver::default(),
        }
    }

    /// Start archiving status reports into the session.
    pub fn init_archives(&mut self, session: &Session) -> Result<(), Box<dyn std::error::Error>> {
        self.arch_report = Archiver::from_path(session, "traj_exec/status_report.csv")?;
        Ok(())
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn mode(&self) -> TrajExecMode {
        self.mode
    }

    /// Number of manoeuvres in the loaded sequence.
    pub fn sequence_len(&self) -> usize {
        self.sequence.as_ref().map_or(0, |s| s.len())
    }

    /// Index and bounds of the active manoeuvre.
    pub fn active_mnvr(&self) -> Option<(usize, f64, f64)> {
        let seq = self.sequence.as_ref()?;
        seq.get(self.mnvr_index)
            .map(|m| (self.mnvr_index, m.start_dist_m(), m.end_dist_m()))
    }

    /// Begin executing a manoeuvre sequence.
    ///
    /// All manoeuvres are planned back to back starting from `start_dist_m`.
    /// Item lengths must be finite and non-negative so that every manoeuvre
    /// ends no earlier than it starts. Execution begins on the next call to
    /// `proc`.
    ///
    /// Loading a new sequence before the current one has been finished will
    /// result in an error. To stop a sequence whilst it's executing you must
    /// call `abort_sequence`.
    pub fn begin_sequence(
        &mut self,
        seq: Vec<SeqItem<'a>>,
        start_dist_m: f64,
    ) -> Result<(), TrajExecError> {
        // Check to see if there's already a sequence loaded
        if self.sequence.is_some() {
            return Err(TrajExecError::SequenceAlreadyLoaded);
        }

        if seq.is_empty() {
            return Err(TrajExecError::EmptySequence);
        }

        // Plan each manoeuvre from the end of the previous one
        let mut planned = Vec::with_capacity(seq.len());
        let mut dist_m = start_dist_m;

        for (index, item) in seq.into_iter().enumerate() {
            let mut mnvr = item.mnvr;

            if let Some(length_m) = item.length_m {
                if !length_m.is_finite() || length_m < 0.0 {
                    return Err(TrajExecError::PlanFailed {
                        index,
                        source: MnvrError::InvalidLength(length_m),
                    });
                }
            }

            mnvr.plan(self.inputs, self.sink, dist_m)
                .map_err(|source| TrajExecError::PlanFailed { index, source })?;

            if let Some(length_m) = item.length_m {
                mnvr.override_end_dist(dist_m + length_m)
                    .map_err(|source| TrajExecError::PlanFailed { index, source })?;
            }

            debug!(
                "Manoeuvre {} ({}) planned over [{:.2}, {:.2}] m",
                index,
                mnvr.kind(),
                mnvr.start_dist_m(),
                mnvr.end_dist_m()
            );

            dist_m = mnvr.end_dist_m();
            planned.push(mnvr);
        }

        info!(
            "Loaded sequence of {} manoeuvres over [{:.2}, {:.2}] m",
            planned.len(),
            start_dist_m,
            dist_m
        );

        self.sequence = Some(planned);
        self.mnvr_index = 0;
        self.mode = TrajExecMode::Executing;

        Ok(())
    }

    /// Abort the currently executing sequence.
    ///
    /// The sequence is dropped immediately, no further commands will be
    /// issued by it.
    pub fn abort_sequence(&mut self) {
        if self.sequence.is_some() {
            info!("Manoeuvre sequence aborted");
        }

        self.clear();
    }

    /// Finish the sequence if the vehicle has come to rest in its last
    /// manoeuvre and that manoeuvre brings the vehicle to a stop.
    ///
    /// A final stop never passes the end distance, so `proc` alone can't
    /// detect the end of such a sequence. Returns true if the sequence was
    /// finished, any other stop is left for the owner to abort.
    pub fn finish_at_stop(&mut self) -> bool {
        let is_final_stop = match self.sequence {
            Some(ref seq) => {
                self.mnvr_index + 1 == seq.len()
                    && seq[self.mnvr_index].base().target_speed_ms() == Some(0.0)
            }
            None => false,
        };

        if is_final_stop {
            info!("Vehicle stopped in the final manoeuvre, sequence finished");
            self.report.sequence_finished = true;
            self.clear();
        }

        is_final_stop
    }

    /// Process trajectory execution for one cycle.
    pub fn proc(&mut self) -> Result<StatusReport, TrajExecError> {
        // Setup cycle data
        self.report = StatusReport::default();
        self.report.dist_m = self.inputs.dist_from_route_start_m();

        match self.mode {
            TrajExecMode::Off => self.mode_off(),
            TrajExecMode::Executing => self.mode_executing(),
            TrajExecMode::SequenceFinished => self.mode_seq_finished(),
        }?;

        Ok(self.report)
    }

    /// Mode not executing.
    ///
    /// No actions are taken in this mode. To move into Executing the user must
    /// call `begin_sequence`.
    fn mode_off(&mut self) -> Result<(), TrajExecError> {
        Ok(())
    }

    /// Mode executing.
    ///
    /// Retires manoeuvres the vehicle has passed, then steps the active one.
    fn mode_executing(&mut self) -> Result<(), TrajExecError> {
        let dist_m = self.report.dist_m;

        let seq = match self.sequence {
            Some(ref mut s) => s,
            None => return Err(TrajExecError::NoSequence),
        };

        // ---- RETIREMENT ----

        while self.mnvr_index < seq.len() && dist_m > seq[self.mnvr_index].end_dist_m() {
            info!(
                "Manoeuvre {} ({}) complete at {:.2} m",
                self.mnvr_index,
                seq[self.mnvr_index].kind(),
                dist_m
            );
            self.mnvr_index += 1;
            self.report.num_retired += 1;
        }

        // Past the end of the last manoeuvre, the sequence is complete.
        if self.mnvr_index >= seq.len() {
            self.mode = TrajExecMode::SequenceFinished;
            return self.mode_seq_finished();
        }

        // ---- EXECUTION ----

        let mnvr = &mut seq[self.mnvr_index];
        self.report.mnvr_index = Some(self.mnvr_index);
        self.report.mnvr_kind = Some(mnvr.kind());
        self.report.start_dist_m = mnvr.start_dist_m();
        self.report.end_dist_m = mnvr.end_dist_m();

        if let Err(source) = mnvr.execute_time_step() {
            let index = self.mnvr_index;
            error!("Manoeuvre {} failed, aborting sequence: {}", index, source);
            self.clear();
            return Err(TrajExecError::MnvrFailed { index, source });
        }

        Ok(())
    }

    /// Mode sequence finished.
    ///
    /// Run when the vehicle has passed the end of the last manoeuvre. Clears
    /// the sequence and switches off.
    fn mode_seq_finished(&mut self) -> Result<(), TrajExecError> {
        info!("Manoeuvre sequence finished");

        self.report.sequence_finished = true;
        self.clear();

        Ok(())
    }

    fn clear(&mut self) {
        self.sequence = None;
        self.mnvr_index = 0;
        self.mode = TrajExecMode::Off;
    }
}

impl<'a> Archived for TrajExec<'a> {
    fn write(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.arch_report.serialise(self.report)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::mnvr::{
        test_util::{TestInputs, TestSink},
        MnvrError, SlowDown, SpeedCmd, SpeedUp, SteadySpeed,
    };

    fn steady<'a>(target_speed_ms: f64) -> BoxedMnvr<'a> {
        let mut m = SteadySpeed::new();
        m.set_target_speed(target_speed_ms).unwrap();
        m.set_max_accel(2.0).unwrap();
        Box::new(m)
    }

    fn speed_up<'a>(start_speed_ms: f64, target_speed_ms: f64) -> BoxedMnvr<'a> {
        let mut m = SpeedUp::new();
        m.set_speeds(start_speed_ms, target_speed_ms).unwrap();
        m.set_max_accel(2.0).unwrap();
        Box::new(m)
    }

    fn slow_down<'a>(start_speed_ms: f64, target_speed_ms: f64) -> BoxedMnvr<'a> {
        let mut m = SlowDown::new();
        m.set_speeds(start_speed_ms, target_speed_ms).unwrap();
        m.set_max_accel(2.0).unwrap();
        Box::new(m)
    }

    #[test]
    fn test_chained_planning() {
        let inputs = TestInputs::at(0.0);
        let sink = TestSink::default();
        let mut te = TrajExec::new(Params::default(), &inputs, &sink);

        te.begin_sequence(
            vec![
                SeqItem::new(speed_up(0.0, 10.0)),
                SeqItem::with_length(steady(10.0), 100.0),
                SeqItem::new(slow_down(10.0, 0.0)),
            ],
            0.0,
        )
        .unwrap();

        assert_eq!(te.mode(), TrajExecMode::Executing);
        assert_eq!(te.sequence_len(), 3);
        assert_eq!(te.active_mnvr(), Some((0, 0.0, 25.0)));

        // Sequences can't be stacked
        assert!(matches!(
            te.begin_sequence(vec![SeqItem::new(steady(1.0))], 0.0),
            Err(TrajExecError::SequenceAlreadyLoaded)
        ));
    }

    #[test]
    fn test_invalid_length_rejected() {
        let inputs = TestInputs::at(0.0);
        let sink = TestSink::default();
        let mut te = TrajExec::new(Params::default(), &inputs, &sink);

        for length_m in [-10.0, f64::NAN, f64::INFINITY].iter() {
            let r = te.begin_sequence(
                vec![
                    SeqItem::new(speed_up(0.0, 10.0)),
                    SeqItem::with_length(steady(10.0), *length_m),
                ],
                0.0,
            );
            match r {
                Err(TrajExecError::PlanFailed {
                    index: 1,
                    source: MnvrError::InvalidLength(l),
                }) => assert!(l == *length_m || (l.is_nan() && length_m.is_nan())),
                r => panic!("Expected invalid length, got {:?}", r),
            }
            assert_eq!(te.mode(), TrajExecMode::Off);
            assert_eq!(te.sequence_len(), 0);
        }

        // A zero length is allowed
        te.begin_sequence(vec![SeqItem::with_length(steady(10.0), 0.0)], 5.0)
            .unwrap();
        assert_eq!(te.active_mnvr(), Some((0, 5.0, 5.0)));
    }

    #[test]
    fn test_run_through_sequence() {
        let inputs = TestInputs::at(0.0);
        let sink = TestSink::default();
        let mut te = TrajExec::new(Params::default(), &inputs, &sink);

        te.begin_sequence(
            vec![
                SeqItem::new(speed_up(0.0, 10.0)),
                SeqItem::with_length(steady(10.0), 100.0),
                SeqItem::new(slow_down(10.0, 0.0)),
            ],
            0.0,
        )
        .unwrap();

        // Speed up over [0, 25]
        let r = te.proc().unwrap();
        assert_eq!(r.mnvr_kind, Some(MnvrKind::SpeedUp));
        assert_eq!(
            sink.last(),
            Some(SpeedCmd { speed_ms: 10.0, max_accel_mss: 2.0 })
        );

        // Boundary belongs to the manoeuvre ending there
        inputs.dist_m.set(25.0);
        assert_eq!(te.proc().unwrap().mnvr_index, Some(0));

        // Steady speed over [25, 125], half the acceleration
        inputs.dist_m.set(60.0);
        let r = te.proc().unwrap();
        assert_eq!(r.mnvr_index, Some(1));
        assert_eq!(r.num_retired, 1);
        assert_eq!(
            sink.last(),
            Some(SpeedCmd { speed_ms: 10.0, max_accel_mss: 1.0 })
        );

        // Slow down over [125, 150], skipping nothing
        inputs.dist_m.set(130.0);
        let r = te.proc().unwrap();
        assert_eq!(r.mnvr_kind, Some(MnvrKind::SlowDown));
        assert_eq!((r.start_dist_m, r.end_dist_m), (125.0, 150.0));
        assert_eq!(
            sink.last(),
            Some(SpeedCmd { speed_ms: 0.0, max_accel_mss: 2.0 })
        );

        let num_cmds = sink.count();

        // Passing the end finishes the sequence without a command
        inputs.dist_m.set(150.5);
        let r = te.proc().unwrap();
        assert!(r.sequence_finished);
        assert_eq!(r.mnvr_index, None);
        assert_eq!(te.mode(), TrajExecMode::Off);
        assert_eq!(sink.count(), num_cmds);

        // Nothing more happens once off
        assert!(!te.proc().unwrap().sequence_finished);
        assert_eq!(sink.count(), num_cmds);
    }

    #[test]
    fn test_zero_length_steady_is_skipped() {
        let inputs = TestInputs::at(0.0);
        let sink = TestSink::default();
        let mut te = TrajExec::new(Params::default(), &inputs, &sink);

        te.begin_sequence(
            vec![
                SeqItem::new(speed_up(0.0, 10.0)),
                SeqItem::new(steady(10.0)),
                SeqItem::new(slow_down(10.0, 0.0)),
            ],
            0.0,
        )
        .unwrap();

        inputs.dist_m.set(30.0);
        let r = te.proc().unwrap();
        assert_eq!(r.num_retired, 2);
        assert_eq!(r.mnvr_kind, Some(MnvrKind::SlowDown));
    }

    #[test]
    fn test_plan_failure_loads_nothing() {
        let inputs = TestInputs::at(0.0);
        let sink = TestSink::default();
        let mut te = TrajExec::new(Params::default(), &inputs, &sink);

        assert!(matches!(
            te.begin_sequence(vec![], 0.0),
            Err(TrajExecError::EmptySequence)
        ));

        let result = te.begin_sequence(
            vec![
                SeqItem::with_length(steady(10.0), 10.0),
                SeqItem::new(steady(-5.0)),
            ],
            0.0,
        );
        match result {
            Err(TrajExecError::PlanFailed { index, source }) => {
                assert_eq!(index, 1);
                assert_eq!(source, MnvrError::InvalidTargetSpeed(-5.0));
            }
            r => panic!("Expected plan failure, got {:?}", r.err()),
        }

        // Speed changes can't be stretched
        let result = te.begin_sequence(vec![SeqItem::with_length(speed_up(0.0, 5.0), 100.0)], 0.0);
        assert!(matches!(result, Err(TrajExecError::PlanFailed { index: 0, .. })));

        assert_eq!(te.mode(), TrajExecMode::Off);
        assert_eq!(te.sequence_len(), 0);
        assert_eq!(sink.count(), 0);
    }

    #[test]
    fn test_out_of_bounds_aborts() {
        let inputs = TestInputs::at(0.0);
        let sink = TestSink::default();
        let mut te = TrajExec::new(Params::default(), &inputs, &sink);

        te.begin_sequence(vec![SeqItem::with_length(steady(10.0), 50.0)], 20.0)
            .unwrap();

        // Vehicle behind the start of the sequence
        match te.proc() {
            Err(TrajExecError::MnvrFailed { index, source }) => {
                assert_eq!(index, 0);
                assert!(source.is_bounds_error());
            }
            r => panic!("Expected execution failure, got {:?}", r),
        }

        assert_eq!(te.mode(), TrajExecMode::Off);
        assert_eq!(te.sequence_len(), 0);
        assert_eq!(sink.count(), 0);
    }

    #[test]
    fn test_finish_at_stop() {
        let inputs = TestInputs::at(0.0);
        let sink = TestSink::default();
        let mut te = TrajExec::new(Params::default(), &inputs, &sink);

        te.begin_sequence(
            vec![
                SeqItem::with_length(steady(10.0), 50.0),
                SeqItem::new(slow_down(10.0, 0.0)),
            ],
            0.0,
        )
        .unwrap();

        // Stopped in the first manoeuvre, not the end of the sequence
        te.proc().unwrap();
        assert!(!te.finish_at_stop());
        assert_eq!(te.mode(), TrajExecMode::Executing);

        // Stopped in the final slow down to zero
        inputs.dist_m.set(70.0);
        te.proc().unwrap();
        assert_eq!(te.active_mnvr(), Some((1, 50.0, 75.0)));
        assert!(te.finish_at_stop());
        assert_eq!(te.mode(), TrajExecMode::Off);
        assert_eq!(te.sequence_len(), 0);

        // Nothing loaded
        assert!(!te.finish_at_stop());
    }

    #[test]
    fn test_stop_in_final_steady_speed_not_finished() {
        let inputs = TestInputs::at(0.0);
        let sink = TestSink::default();
        let mut te = TrajExec::new(Params::default(), &inputs, &sink);

        te.begin_sequence(vec![SeqItem::with_length(steady(10.0), 50.0)], 0.0)
            .unwrap();
        te.proc().unwrap();
        assert!(!te.finish_at_stop());
        assert_eq!(te.mode(), TrajExecMode::Executing);
    }

    #[test]
    fn test_abort_sequence() {
        let inputs = TestInputs::at(0.0);
        let sink = TestSink::default();
        let mut te = TrajExec::new(Params::default(), &inputs, &sink);

        te.begin_sequence(vec![SeqItem::with_length(steady(10.0), 50.0)], 0.0)
            .unwrap();
        te.proc().unwrap();
        te.abort_sequence();

        assert_eq!(te.mode(), TrajExecMode::Off);
        te.proc().unwrap();
        assert_eq!(sink.count(), 1);

        // A new sequence may be loaded after an abort
        te.begin_sequence(vec![SeqItem::with_length(steady(5.0), 10.0)], 0.0)
            .unwrap();
    }
}
