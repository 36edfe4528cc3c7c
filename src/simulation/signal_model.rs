// src/simulation/signal_model.rs
//! Nominal engine telemetry generation
//!
//! Each channel is a hand-tuned smooth trend plus independent Gaussian noise.
//! The engine starts up around t = 30 s and shuts down around t = 270 s; the
//! remaining channels drift slowly or oscillate.

use super::types::{Channel, Label, Run, CHANNEL_COUNT};
use crate::error::{EngineErrorBuilder, EngineResult, PipelineStage};
use rand::Rng;
use rand_distr::{Distribution, StandardNormal};
use tracing::debug;

/// `magnitude * tanh((t - center) / tau)`
pub(crate) fn tanh_ramp(t: f64, center: f64, tau: f64, magnitude: f64) -> f64 {
    magnitude * ((t - center) / tau).tanh()
}

/// Noise-free channel trends
pub mod trend {
    use super::tanh_ramp;

    pub fn chamber_pressure(t: f64) -> f64 {
        50.0 + tanh_ramp(t, 30.0, 10.0, 30.0) - tanh_ramp(t, 270.0, 10.0, 30.0)
    }

    pub fn pump_speed(t: f64) -> f64 {
        3000.0 + tanh_ramp(t, 30.0, 15.0, 1500.0) - tanh_ramp(t, 270.0, 15.0, 1500.0)
    }

    pub fn inlet_temperature(t: f64) -> f64 {
        300.0 + 20.0 * (t / 50.0).sin()
    }

    pub fn vibration(_t: f64) -> f64 {
        0.3
    }

    pub fn fuel_flow(t: f64) -> f64 {
        100.0 + tanh_ramp(t, 40.0, 20.0, 5.0)
    }

    pub fn bearing_temperature(t: f64) -> f64 {
        80.0 + tanh_ramp(t, 60.0, 40.0, 5.0)
    }

    /// Thrust proxy as a mix of chamber pressure and fuel flow
    pub fn thrust(pc: f64, fuel_flow: f64) -> f64 {
        0.8 * pc + 0.2 * fuel_flow
    }
}

/// Standard deviation of the additive noise on each channel
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoiseLevels {
    pub sigma: [f64; CHANNEL_COUNT],
}

impl NoiseLevels {
    /// No noise at all: every channel follows its trend exactly
    pub fn noiseless() -> Self {
        Self { sigma: [0.0; CHANNEL_COUNT] }
    }

    pub fn of(&self, channel: Channel) -> f64 {
        self.sigma[channel.index()]
    }
}

impl Default for NoiseLevels {
    fn default() -> Self {
        Self {
            //       Pc   N_pump T_in  Vib   fuel  bearing thrust
            sigma: [0.5, 20.0, 1.0, 0.05, 0.5, 0.5, 1.0],
        }
    }
}

/// Draw `sigma * N(0, 1)`
pub(crate) fn gaussian<R: Rng + ?Sized>(rng: &mut R, sigma: f64) -> f64 {
    let z: f64 = StandardNormal.sample(rng);
    sigma * z
}

/// Generator for nominal runs
#[derive(Debug, Clone, Default)]
pub struct SignalModel {
    noise: NoiseLevels,
}

impl SignalModel {
    pub fn new(noise: NoiseLevels) -> Self {
        Self { noise }
    }

    pub fn noise(&self) -> &NoiseLevels {
        &self.noise
    }

    /// Time axis `0, 1/fs, 2/fs, ...` holding `duration_s * sample_rate_hz` samples
    pub fn generate_time_axis(duration_s: f64, sample_rate_hz: f64) -> EngineResult<Vec<f64>> {
        if !(duration_s.is_finite() && duration_s > 0.0)
            || !(sample_rate_hz.is_finite() && sample_rate_hz > 0.0)
        {
            return Err(
                EngineErrorBuilder::new(PipelineStage::SignalGeneration, "generate_time_axis")
                    .configuration(format!(
                        "duration ({} s) and sample rate ({} Hz) must be positive",
                        duration_s, sample_rate_hz
                    )),
            );
        }

        let samples = (duration_s * sample_rate_hz).round() as usize;
        Ok((0..samples).map(|i| i as f64 / sample_rate_hz).collect())
    }

    /// Nominal run over `time`, labeled `normal`
    ///
    /// Noise is drawn channel by channel in [`Channel::ALL`] order, one draw
    /// per sample, so the same generator state always yields the same run.
    pub fn generate_nominal<R: Rng + ?Sized>(&self, time: &[f64], rng: &mut R) -> EngineResult<Run> {
        let noisy = |rng: &mut R, channel: Channel, trend: fn(f64) -> f64| -> Vec<f64> {
            let sigma = self.noise.of(channel);
            time.iter().map(|&t| trend(t) + gaussian(rng, sigma)).collect()
        };

        let pc = noisy(&mut *rng, Channel::Pc, trend::chamber_pressure);
        let n_pump = noisy(&mut *rng, Channel::NPump, trend::pump_speed);
        let t_in = noisy(&mut *rng, Channel::TIn, trend::inlet_temperature);
        let vib = noisy(&mut *rng, Channel::Vib, trend::vibration);
        let fuel_flow = noisy(&mut *rng, Channel::FuelFlow, trend::fuel_flow);
        let bearing_temp = noisy(&mut *rng, Channel::BearingTemp, trend::bearing_temperature);

        let thrust_sigma = self.noise.of(Channel::Thrust);
        let thrust = pc
            .iter()
            .zip(&fuel_flow)
            .map(|(&pc, &flow)| trend::thrust(pc, flow) + gaussian(rng, thrust_sigma))
            .collect();

        let run = Run::new(
            time.to_vec(),
            [pc, n_pump, t_in, vib, fuel_flow, bearing_temp, thrust],
            Label::Normal,
        )?;
        debug!("Generated nominal run with {} samples", run.len());
        Ok(run)
    }
}
