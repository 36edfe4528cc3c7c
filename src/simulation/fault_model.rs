// src/simulation/fault_model.rs
//! Fault injection on top of nominal runs
//!
//! Every fault is a monotonic tanh-shaped (or linear) perturbation of one or
//! more channels, layered on a freshly generated nominal run so that each
//! faulty run carries its own noise realization.

use super::signal_model::{gaussian, tanh_ramp, SignalModel};
use super::types::{Channel, Label, Run};
use crate::error::{EngineError, EngineErrorBuilder, EngineResult, PipelineStage};
use rand::Rng;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Catalog of simulated failure modes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FaultKind {
    /// Slow chamber pressure decay over the whole run
    PressureDecay,
    /// Turbopump overspeed in the second half of the run
    TurbopumpOverspeed,
    /// Strong injector temperature rise late in the run
    TempRise,
    /// Global vibration increase (imbalance, cavitation)
    VibrationIncrease,
    /// Fuel flow increase while chamber pressure and thrust degrade
    FuelLeak,
    /// Bearing overheating with increased vibration
    BearingOverheat,
}

impl FaultKind {
    pub const ALL: [FaultKind; 6] = [
        FaultKind::PressureDecay,
        FaultKind::TurbopumpOverspeed,
        FaultKind::TempRise,
        FaultKind::VibrationIncrease,
        FaultKind::FuelLeak,
        FaultKind::BearingOverheat,
    ];

    /// Tag written to the `label` column
    pub fn tag(self) -> &'static str {
        match self {
            FaultKind::PressureDecay => "pressure_decay",
            FaultKind::TurbopumpOverspeed => "turbopump_overspeed",
            FaultKind::TempRise => "temp_rise",
            FaultKind::VibrationIncrease => "vibration_increase",
            FaultKind::FuelLeak => "fuel_leak",
            FaultKind::BearingOverheat => "bearing_overheat",
        }
    }

    /// Channels this fault perturbs
    pub fn affected_channels(self) -> &'static [Channel] {
        match self {
            FaultKind::PressureDecay => &[Channel::Pc],
            FaultKind::TurbopumpOverspeed => &[Channel::NPump],
            FaultKind::TempRise => &[Channel::TIn],
            FaultKind::VibrationIncrease => &[Channel::Vib],
            FaultKind::FuelLeak => &[Channel::FuelFlow, Channel::Pc, Channel::Thrust],
            FaultKind::BearingOverheat => &[Channel::BearingTemp, Channel::Vib],
        }
    }
}

impl fmt::Display for FaultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for FaultKind {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FaultKind::ALL
            .into_iter()
            .find(|kind| kind.tag() == s)
            .ok_or_else(|| {
                EngineErrorBuilder::new(PipelineStage::FaultInjection, "parse_fault")
                    .configuration(format!("unrecognized fault type '{}'", s))
            })
    }
}

/// Perturb `run` with `fault` and relabel it
///
/// Only `vibration_increase` draws from `rng`.
pub fn apply_fault<R: Rng + ?Sized>(mut run: Run, fault: FaultKind, rng: &mut R) -> Run {
    match fault {
        FaultKind::PressureDecay => pressure_decay(&mut run),
        FaultKind::TurbopumpOverspeed => turbopump_overspeed(&mut run),
        FaultKind::TempRise => temp_rise(&mut run),
        FaultKind::VibrationIncrease => vibration_increase(&mut run, rng),
        FaultKind::FuelLeak => fuel_leak(&mut run),
        FaultKind::BearingOverheat => bearing_overheat(&mut run),
    }
    run.relabel(Label::Fault(fault));
    run
}

/// Add `delta(t)` to one channel of the run
fn perturb(run: &mut Run, channel: Channel, delta: impl Fn(f64) -> f64) {
    let time = run.time().to_vec();
    for (value, t) in run.channel_mut(channel).iter_mut().zip(time) {
        *value += delta(t);
    }
}

fn pressure_decay(run: &mut Run) {
    let t_max = run.t_max().unwrap_or(0.0);
    if t_max <= 0.0 {
        return;
    }
    perturb(run, Channel::Pc, |t| -0.1 * (t / t_max) * 30.0);
}

fn turbopump_overspeed(run: &mut Run) {
    perturb(run, Channel::NPump, |t| {
        if t > 150.0 {
            tanh_ramp(t, 150.0, 10.0, 2000.0)
        } else {
            0.0
        }
    });
}

fn temp_rise(run: &mut Run) {
    perturb(run, Channel::TIn, |t| tanh_ramp(t, 200.0, 10.0, 100.0));
}

fn vibration_increase<R: Rng + ?Sized>(run: &mut Run, rng: &mut R) {
    perturb(run, Channel::Vib, |t| tanh_ramp(t, 180.0, 10.0, 1.5));
    for value in run.channel_mut(Channel::Vib) {
        *value += gaussian(rng, 0.1);
    }
}

fn fuel_leak(run: &mut Run) {
    let leak = |t: f64| tanh_ramp(t, 160.0, 15.0, 10.0);
    perturb(run, Channel::FuelFlow, leak);
    perturb(run, Channel::Pc, |t| -0.4 * leak(t));
    perturb(run, Channel::Thrust, |t| -0.6 * leak(t));
}

fn bearing_overheat(run: &mut Run) {
    perturb(run, Channel::BearingTemp, |t| tanh_ramp(t, 170.0, 10.0, 40.0));
    perturb(run, Channel::Vib, |t| tanh_ramp(t, 170.0, 10.0, 0.5));
}

/// Generator for faulty runs
#[derive(Debug, Clone, Default)]
pub struct FaultModel {
    signal_model: SignalModel,
}

impl FaultModel {
    pub fn new(signal_model: SignalModel) -> Self {
        Self { signal_model }
    }

    /// Fresh nominal run over `time` with `fault` injected
    pub fn faulty_run<R: Rng + ?Sized>(
        &self,
        time: &[f64],
        fault: FaultKind,
        rng: &mut R,
    ) -> EngineResult<Run> {
        let nominal = self.signal_model.generate_nominal(time, rng)?;
        debug!("Injecting {} into a {}-sample run", fault, nominal.len());
        Ok(apply_fault(nominal, fault, rng))
    }

    /// Like [`FaultModel::faulty_run`] for a free-text fault tag
    pub fn faulty_run_tagged<R: Rng + ?Sized>(
        &self,
        time: &[f64],
        tag: &str,
        rng: &mut R,
    ) -> EngineResult<Run> {
        let fault = tag.parse::<FaultKind>()?;
        self.faulty_run(time, fault, rng)
    }
}
