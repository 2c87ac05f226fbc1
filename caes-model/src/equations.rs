use log::trace;
use ndarray::{Axis, Zip};
use uom::si::{
    area::square_meter,
    dynamic_viscosity::pascal_second,
    heat_transfer::watt_per_square_meter_kelvin,
    length::meter,
    mass_density::kilogram_per_cubic_meter,
    pressure::pascal,
    specific_heat_capacity::joule_per_kilogram_kelvin,
    thermodynamic_temperature::kelvin,
    volume::cubic_meter,
};

use crate::{Feedback, ModelError, Parameters, SimulationState, TimeGrid, TimeSeries};

/// Coefficient of the radial Darcy flow formula for a compressible gas,
/// in the consistent SI form used by the leakage equation.
const RADIAL_FLOW_COEFFICIENT: f64 = 1.0967e-2;

/// Relative size below which the energy-balance bracket counts as zero.
const BRACKET_RELATIVE_TOL: f64 = 1e-12;

/// Cavern state equations evaluated over the whole time grid.
///
/// Holds the sampled injection rate `mi` (non-negative) and extraction rate
/// `me` (non-positive, extraction is stored as negative mass rate) for the
/// life of a solver run.
/// Every evaluation is a pure function of those series, the parameters, and
/// the leakage series passed in.
/// Dependent quantities are recomputed on each call, so density, temperature,
/// and pressure are only mutually consistent when computed from the same
/// leakage series.
#[derive(Debug, Clone)]
pub struct StateEquations<'a> {
    params: &'a Parameters,
    injection: TimeSeries,
    extraction: TimeSeries,
    coeffs: Coefficients,
}

/// SI values of the constants used by the equations.
#[derive(Debug, Clone, Copy)]
struct Coefficients {
    dt: f64,
    volume: f64,
    rho0: f64,
    t0: f64,
    t_injection: f64,
    t_wall: f64,
    cp: f64,
    cv: f64,
    r: f64,
    /// Wall conductance `hc·Ac`, W/K.
    wall_ua: f64,
    p_edge: f64,
    /// `C·k·H` numerator factor of the leakage formula.
    flow_factor: f64,
    /// `μ·Z·ln(rₑ/r₀)` denominator factor of the leakage formula.
    resistance: f64,
}

impl Coefficients {
    fn new(params: &Parameters) -> Self {
        let c = params.config();
        let r_e = params.reservoir_radius().get::<meter>();
        let r_0 = c.cavern_radius.get::<meter>();

        Self {
            dt: params.time_grid().step(),
            volume: c.cavern_volume.get::<cubic_meter>(),
            rho0: c.initial_density.get::<kilogram_per_cubic_meter>(),
            t0: c.initial_temperature.get::<kelvin>(),
            t_injection: c.injection_temperature.get::<kelvin>(),
            t_wall: c.wall_temperature.get::<kelvin>(),
            cp: c.cp.get::<joule_per_kilogram_kelvin>(),
            cv: c.cv.get::<joule_per_kilogram_kelvin>(),
            r: c.gas_constant.get::<joule_per_kilogram_kelvin>(),
            wall_ua: c
                .heat_transfer_coefficient
                .get::<watt_per_square_meter_kelvin>()
                * c.cavern_surface_area.get::<square_meter>(),
            p_edge: c.edge_pressure.get::<pascal>(),
            flow_factor: RADIAL_FLOW_COEFFICIENT
                * c.rock_permeability.get::<square_meter>()
                * c.cavern_length.get::<meter>(),
            resistance: c.air_viscosity.get::<pascal_second>()
                * c.compressibility_factor
                * (r_e / r_0).ln(),
        }
    }
}

impl<'a> StateEquations<'a> {
    /// Creates the equations for sampled injection and extraction series.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::InvalidConfiguration`] if either series does not
    /// match the time grid, holds non-finite values, or has the wrong sign
    /// (injection must be non-negative, extraction non-positive).
    pub fn new(
        params: &'a Parameters,
        injection: TimeSeries,
        extraction: TimeSeries,
    ) -> Result<Self, ModelError> {
        let grid = params.time_grid();
        check_series("injection", &injection, grid)?;
        check_series("extraction", &extraction, grid)?;

        if let Some(value) = injection.iter().find(|&&v| v < 0.0) {
            return Err(ModelError::invalid(format!(
                "injection rate must be non-negative, got {value} kg/s"
            )));
        }
        if let Some(value) = extraction.iter().find(|&&v| v > 0.0) {
            return Err(ModelError::invalid(format!(
                "extraction rate must be non-positive, got {value} kg/s"
            )));
        }

        Ok(Self {
            params,
            injection,
            extraction,
            coeffs: Coefficients::new(params),
        })
    }

    /// Returns the parameters of the run.
    #[must_use]
    pub fn parameters(&self) -> &'a Parameters {
        self.params
    }

    /// Returns the shared time grid.
    #[must_use]
    pub fn time_grid(&self) -> &'a TimeGrid {
        self.params.time_grid()
    }

    /// Returns the injection rate `mi`, kg/s.
    #[must_use]
    pub fn injection(&self) -> &TimeSeries {
        &self.injection
    }

    /// Returns the extraction rate `me`, kg/s (non-positive).
    #[must_use]
    pub fn extraction(&self) -> &TimeSeries {
        &self.extraction
    }

    /// Computes air density from the mass balance.
    ///
    /// `ρ = ρ₀ + (Σmi·dt + Σme·dt − Σml·dt) / V`, floored at `ρ₀`.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::InvalidConfiguration`] if the leakage series does
    /// not match the grid, or [`ModelError::NumericalInstability`] if it holds
    /// non-finite values.
    pub fn air_density(&self, leakage: &TimeSeries) -> Result<TimeSeries, ModelError> {
        self.check_leakage(leakage)?;

        let Coefficients {
            dt, volume, rho0, ..
        } = self.coeffs;

        let injected = cumulative(&self.injection, dt);
        let extracted = cumulative(&self.extraction, dt);
        let leaked = cumulative(leakage, dt);

        let density = Zip::from(&injected)
            .and(&extracted)
            .and(&leaked)
            .map_collect(|&mi, &me, &ml| (rho0 + (mi + me - ml) / volume).max(rho0));

        ensure_finite("air density", &density)?;
        Ok(density)
    }

    /// Computes air temperature from the closed-form energy balance.
    ///
    /// Pointwise, with `ml` the leakage when `feedback` includes it and zero
    /// otherwise:
    ///
    /// - `D = mi·(R − cp) + (me − ml)·R − hc·Ac`
    /// - `α = (mi·cp·Tᵢ + hc·Ac·T_rw) / D`
    /// - `β = D / (V·ρ·cv)` with `ρ` the [air density](Self::air_density)
    /// - `T = (T₀ + α)·exp(β·t) − α`
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::NumericalInstability`] if `D` vanishes or any
    /// coefficient or temperature is not finite and positive.
    pub fn temperature(
        &self,
        leakage: &TimeSeries,
        feedback: Feedback,
    ) -> Result<TimeSeries, ModelError> {
        let density = self.air_density(leakage)?;
        self.temperature_at(leakage, &density, feedback)
    }

    /// Computes air pressure from the ideal gas law, floored at the edge pressure.
    ///
    /// # Errors
    ///
    /// Propagates errors from [`StateEquations::temperature`].
    pub fn pressure(
        &self,
        leakage: &TimeSeries,
        feedback: Feedback,
    ) -> Result<TimeSeries, ModelError> {
        let density = self.air_density(leakage)?;
        let temperature = self.temperature_at(leakage, &density, feedback)?;
        self.pressure_at(&density, &temperature)
    }

    /// Computes the leakage rate through the rock from radial Darcy flow.
    ///
    /// `ml = C·k·H·(p² − pₑ²) / (μ·Z·T·ln(rₑ/r₀))`
    ///
    /// # Errors
    ///
    /// Propagates errors from [`StateEquations::temperature`], and returns
    /// [`ModelError::NumericalInstability`] if the result is not finite.
    pub fn leakage(
        &self,
        leakage: &TimeSeries,
        feedback: Feedback,
    ) -> Result<TimeSeries, ModelError> {
        Ok(self.state(leakage, feedback)?.leakage)
    }

    /// Computes density, temperature, pressure, and the resulting leakage
    /// from a single leakage estimate.
    ///
    /// The returned `leakage` is the updated rate, not the estimate passed in.
    ///
    /// # Errors
    ///
    /// Propagates errors from the individual equations.
    pub fn state(
        &self,
        leakage: &TimeSeries,
        feedback: Feedback,
    ) -> Result<SimulationState, ModelError> {
        let density = self.air_density(leakage)?;
        let temperature = self.temperature_at(leakage, &density, feedback)?;
        let pressure = self.pressure_at(&density, &temperature)?;
        let leakage = self.leakage_at(&pressure, &temperature)?;

        Ok(SimulationState {
            density,
            temperature,
            pressure,
            leakage,
        })
    }

    /// Computes the state with no leakage and full feedback.
    ///
    /// This is the starting estimate of the fixed-point iteration.
    ///
    /// # Errors
    ///
    /// Propagates errors from [`StateEquations::state`].
    pub fn initial_state(&self) -> Result<SimulationState, ModelError> {
        self.state(&self.time_grid().zeros(), Feedback::WithLeakage)
    }

    fn temperature_at(
        &self,
        leakage: &TimeSeries,
        density: &TimeSeries,
        feedback: Feedback,
    ) -> Result<TimeSeries, ModelError> {
        let Coefficients {
            volume,
            t0,
            t_injection,
            t_wall,
            cp,
            cv,
            r,
            wall_ua,
            ..
        } = self.coeffs;

        let include_leakage = feedback.includes_leakage();
        let times = self.time_grid().times();
        let mut temperature = self.time_grid().zeros();

        for (index, t_out) in temperature.iter_mut().enumerate() {
            let mi = self.injection[index];
            let me = self.extraction[index];
            let ml = if include_leakage { leakage[index] } else { 0.0 };

            let bracket = mi * (r - cp) + (me - ml) * r - wall_ua;
            let scale = (mi * (r - cp)).abs() + ((me - ml) * r).abs() + wall_ua;
            if !bracket.is_finite() || bracket.abs() <= BRACKET_RELATIVE_TOL * scale {
                return Err(ModelError::NumericalInstability {
                    quantity: "energy balance bracket",
                    index,
                    value: bracket,
                });
            }

            let alpha = (mi * cp * t_injection + wall_ua * t_wall) / bracket;
            let beta = bracket / (volume * density[index] * cv);
            if !alpha.is_finite() || !beta.is_finite() {
                return Err(ModelError::NumericalInstability {
                    quantity: "temperature coefficients",
                    index,
                    value: if alpha.is_finite() { beta } else { alpha },
                });
            }

            let value = (t0 + alpha) * (beta * times[index]).exp() - alpha;
            if !value.is_finite() || value <= 0.0 {
                return Err(ModelError::NumericalInstability {
                    quantity: "temperature",
                    index,
                    value,
                });
            }
            *t_out = value;
        }

        trace!(
            "temperature spans {:.3} K to {:.3} K",
            temperature.fold(f64::INFINITY, |a, &b| a.min(b)),
            temperature.fold(f64::NEG_INFINITY, |a, &b| a.max(b)),
        );

        Ok(temperature)
    }

    fn pressure_at(
        &self,
        density: &TimeSeries,
        temperature: &TimeSeries,
    ) -> Result<TimeSeries, ModelError> {
        let Coefficients { r, p_edge, .. } = self.coeffs;

        let pressure = Zip::from(density)
            .and(temperature)
            .map_collect(|&rho, &t| (rho * r * t).max(p_edge));

        ensure_finite("pressure", &pressure)?;
        Ok(pressure)
    }

    fn leakage_at(
        &self,
        pressure: &TimeSeries,
        temperature: &TimeSeries,
    ) -> Result<TimeSeries, ModelError> {
        let Coefficients {
            p_edge,
            flow_factor,
            resistance,
            ..
        } = self.coeffs;

        let leakage = Zip::from(pressure)
            .and(temperature)
            .map_collect(|&p, &t| flow_factor * (p * p - p_edge * p_edge) / (resistance * t));

        ensure_finite("leakage", &leakage)?;
        Ok(leakage)
    }

    fn check_leakage(&self, leakage: &TimeSeries) -> Result<(), ModelError> {
        let expected = self.time_grid().len();
        if leakage.len() != expected {
            return Err(ModelError::invalid(format!(
                "leakage series has {} values but the time grid has {expected}",
                leakage.len()
            )));
        }
        ensure_finite("leakage estimate", leakage)
    }
}

/// Running sum of `series·dt`.
fn cumulative(series: &TimeSeries, dt: f64) -> TimeSeries {
    let mut sum = series.mapv(|v| v * dt);
    sum.accumulate_axis_inplace(Axis(0), |&prev, curr| *curr += prev);
    sum
}

fn check_series(name: &str, series: &TimeSeries, grid: &TimeGrid) -> Result<(), ModelError> {
    if series.len() != grid.len() {
        return Err(ModelError::invalid(format!(
            "{name} series has {} values but the time grid has {}",
            series.len(),
            grid.len()
        )));
    }
    if let Some(value) = series.iter().find(|v| !v.is_finite()) {
        return Err(ModelError::invalid(format!(
            "{name} series must be finite, got {value}"
        )));
    }
    Ok(())
}

fn ensure_finite(quantity: &'static str, series: &TimeSeries) -> Result<(), ModelError> {
    match series.iter().position(|v| !v.is_finite()) {
        Some(index) => Err(ModelError::NumericalInstability {
            quantity,
            index,
            value: series[index],
        }),
        None => Ok(()),
    }
}
