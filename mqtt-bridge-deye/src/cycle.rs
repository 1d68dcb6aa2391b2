//! One acquisition pass: read registers, decode sensors.

use chrono::{DateTime, Utc};
use tracing::Instrument;

use crate::observation::Observation;
use crate::range::{RegisterRange, merge_ranges};
use crate::reader::{ReadError, RegisterReader};
use crate::registers::RegisterMap;
use crate::sensor::Sensor;

/// Error type for acquisition cycles.
#[derive(Debug, thiserror::Error)]
pub enum CycleError {
    #[error("Failed to read registers {range}: {source}")]
    Read {
        range: RegisterRange,
        #[source]
        source: ReadError,
    },
}

/// Register map used instead of inverter reads in simulate mode.
pub fn simulated_registers() -> RegisterMap {
    [(60, [0x00, 0x03])].into_iter().collect()
}

/// Reads and decodes a fixed set of sensors.
pub struct Acquisition<R> {
    reader: R,
    sensors: Vec<&'static Sensor>,
    ranges: Vec<RegisterRange>,
    simulate: bool,
    span: tracing::Span,
}

impl<R: RegisterReader> Acquisition<R> {
    /// Create an acquisition for `sensors`, decoded in the given order.
    pub fn new(reader: R, sensors: Vec<&'static Sensor>, span: tracing::Span) -> Self {
        let ranges = merge_ranges(sensors.iter().map(|s| s.range()));
        Self {
            reader,
            sensors,
            ranges,
            simulate: false,
            span,
        }
    }

    /// Use the fixed simulated register map instead of the reader.
    pub fn with_simulate(mut self, simulate: bool) -> Self {
        self.simulate = simulate;
        self
    }

    /// Merged ranges read on every cycle.
    pub fn ranges(&self) -> &[RegisterRange] {
        &self.ranges
    }

    pub fn sensors(&self) -> &[&'static Sensor] {
        &self.sensors
    }

    /// Run one cycle and return the observations stamped with `now`.
    ///
    /// Any failed range read fails the whole cycle. Sensors whose registers
    /// are missing or report no data are left out.
    pub async fn acquire(&mut self, now: DateTime<Utc>) -> Result<Vec<Observation>, CycleError> {
        let span = self.span.clone();
        async move {
            let registers = if self.simulate {
                tracing::debug!("Simulate mode, skipping inverter reads");
                simulated_registers()
            } else {
                self.read_all().await?
            };

            if !registers.is_empty() {
                tracing::debug!(registers = %registers, "Register map");
            }

            let observations = self.decode(&registers, now);
            tracing::info!(
                registers = registers.len(),
                sensors = self.sensors.len(),
                observations = observations.len(),
                "Acquisition complete"
            );
            Ok(observations)
        }
        .instrument(span)
        .await
    }

    async fn read_all(&mut self) -> Result<RegisterMap, CycleError> {
        let mut registers = RegisterMap::new();

        for &range in &self.ranges {
            match self.reader.read_registers(range).await {
                Ok(map) => registers.merge(map),
                Err(source) => {
                    self.reader.reset();
                    return Err(CycleError::Read { range, source });
                }
            }
        }

        Ok(registers)
    }

    fn decode(&self, registers: &RegisterMap, now: DateTime<Utc>) -> Vec<Observation> {
        self.sensors
            .iter()
            .filter_map(|&sensor| {
                let value = sensor.read_value(registers)?;
                tracing::debug!(sensor = sensor.name, value = %value, unit = sensor.unit, "Observation");
                Some(Observation::new(sensor, now, value))
            })
            .collect()
    }
}
