// src/simulation/types.rs
//! Core telemetry types: channels, run labels and runs

use super::fault_model::FaultKind;
use crate::config::classifier::REFERENCE_LABEL;
use crate::error::{EngineError, EngineErrorBuilder, EngineResult, PipelineStage};
use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Number of telemetry channels in every run
pub const CHANNEL_COUNT: usize = 7;

/// Physical measurement streams recorded during a test
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Channel {
    /// Chamber pressure
    Pc,
    /// Turbopump speed (RPM)
    NPump,
    /// Injector inlet temperature
    TIn,
    /// Overall vibration level
    Vib,
    /// Fuel mass flow (kg/s)
    FuelFlow,
    BearingTemp,
    /// Simplified thrust proxy
    Thrust,
}

impl Channel {
    /// All channels in column order
    pub const ALL: [Channel; CHANNEL_COUNT] = [
        Channel::Pc,
        Channel::NPump,
        Channel::TIn,
        Channel::Vib,
        Channel::FuelFlow,
        Channel::BearingTemp,
        Channel::Thrust,
    ];

    /// Column name used in run files
    pub fn name(self) -> &'static str {
        match self {
            Channel::Pc => "Pc",
            Channel::NPump => "N_pump",
            Channel::TIn => "T_in",
            Channel::Vib => "Vib",
            Channel::FuelFlow => "fuel_flow",
            Channel::BearingTemp => "bearing_temp",
            Channel::Thrust => "thrust",
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_name(name: &str) -> Option<Channel> {
        Channel::ALL.into_iter().find(|channel| channel.name() == name)
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Ground-truth regime of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Label {
    Normal,
    Fault(FaultKind),
}

impl Label {
    /// Every label, nominal first
    pub fn all() -> Vec<Label> {
        std::iter::once(Label::Normal)
            .chain(FaultKind::ALL.into_iter().map(Label::Fault))
            .collect()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Label::Normal => REFERENCE_LABEL,
            Label::Fault(kind) => kind.tag(),
        }
    }

    pub fn is_normal(&self) -> bool {
        matches!(self, Label::Normal)
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Label {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl FromStr for Label {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == REFERENCE_LABEL {
            Ok(Label::Normal)
        } else {
            s.parse::<FaultKind>().map(Label::Fault)
        }
    }
}

/// One complete telemetry time series with a single ground-truth label
///
/// Stored column-wise: a time axis plus one vector per [`Channel`], all of the
/// same length. The time axis is strictly increasing.
#[derive(Debug, Clone, PartialEq)]
pub struct Run {
    time: Vec<f64>,
    channels: [Vec<f64>; CHANNEL_COUNT],
    label: Label,
}

impl Run {
    /// Build a run, checking that the columns line up and time is strictly increasing
    pub fn new(time: Vec<f64>, channels: [Vec<f64>; CHANNEL_COUNT], label: Label) -> EngineResult<Self> {
        let error = |reason: String| {
            EngineErrorBuilder::new(PipelineStage::SignalGeneration, "build_run")
                .data_shape(format!("{} run", label), reason)
        };

        for channel in Channel::ALL {
            let len = channels[channel.index()].len();
            if len != time.len() {
                return Err(error(format!(
                    "channel {} has {} samples but the time axis has {}",
                    channel,
                    len,
                    time.len()
                )));
            }
        }

        if let Some(bad) = time.iter().position(|t| !t.is_finite()) {
            return Err(error(format!("time value at row {} is not finite", bad)));
        }

        if let Some(row) = time.windows(2).position(|pair| pair[1] <= pair[0]) {
            return Err(error(format!(
                "time is not strictly increasing at row {} ({} -> {})",
                row + 1,
                time[row],
                time[row + 1]
            )));
        }

        Ok(Self { time, channels, label })
    }

    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    pub fn label(&self) -> Label {
        self.label
    }

    pub fn time(&self) -> &[f64] {
        &self.time
    }

    /// Last timestamp of the run
    pub fn t_max(&self) -> Option<f64> {
        self.time.last().copied()
    }

    pub fn channel(&self, channel: Channel) -> &[f64] {
        &self.channels[channel.index()]
    }

    /// Look a channel up by its column name
    pub fn channel_by_name(&self, name: &str) -> Option<&[f64]> {
        Channel::from_name(name).map(|channel| self.channel(channel))
    }

    /// All channel values of one sample, in [`Channel::ALL`] order
    pub fn sample(&self, index: usize) -> [f64; CHANNEL_COUNT] {
        Channel::ALL.map(|channel| self.channels[channel.index()][index])
    }

    pub(crate) fn channel_mut(&mut self, channel: Channel) -> &mut [f64] {
        &mut self.channels[channel.index()]
    }

    pub(crate) fn relabel(&mut self, label: Label) {
        self.label = label;
    }
}
