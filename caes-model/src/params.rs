use serde::Deserialize;
use uom::si::{
    area::square_meter,
    dynamic_viscosity::pascal_second,
    f64::{
        Area, DynamicViscosity, HeatTransfer, Length, MassDensity, Pressure,
        SpecificHeatCapacity, ThermodynamicTemperature, Time, Volume,
    },
    heat_transfer::watt_per_square_meter_kelvin,
    length::meter,
    mass_density::kilogram_per_cubic_meter,
    pressure::pascal,
    specific_heat_capacity::joule_per_kilogram_kelvin,
    thermodynamic_temperature::kelvin,
    time::second,
    volume::cubic_meter,
};

use crate::{ModelError, TimeGrid, units::SpecificGasConstant};

/// Characteristic diffusion time used to size the reservoir radius, in seconds.
///
/// The radius of influence of the pressure disturbance is
/// `√(k·pₑ·t / (φ·μ))` evaluated at this time.
const RADIUS_OF_INFLUENCE_TIME: f64 = 5.0e6;

/// Physical constants and time controls for a cavern run.
///
/// All quantities are plain values and carry no invariants of their own.
/// Call [`ParametersConfig::build`] to validate them and derive the
/// reservoir radius, producing an immutable [`Parameters`].
///
/// Deserializes from SI base-unit values.
/// Missing fields fall back to the [Kamioka pilot test](ParametersConfig::kamioka).
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ParametersConfig {
    /// Cavern length `H`.
    pub cavern_length: Length,
    /// Cavern wall area in contact with the air `Ac`.
    pub cavern_surface_area: Area,
    /// Cavern volume `V`.
    pub cavern_volume: Volume,
    /// Radius of the cylinder equivalent to the cavern `r₀`.
    pub cavern_radius: Length,
    /// Temperature of the injected air `Tᵢ`.
    pub injection_temperature: ThermodynamicTemperature,
    /// Air-to-wall heat transfer coefficient `hc`.
    pub heat_transfer_coefficient: HeatTransfer,
    /// Air temperature at `t = 0`.
    pub initial_temperature: ThermodynamicTemperature,
    /// Cavern wall temperature `T_rw`.
    pub wall_temperature: ThermodynamicTemperature,
    /// Rock permeability `k`.
    pub rock_permeability: Area,
    /// Rock porosity `φ`, as a fraction in `(0, 1]`.
    pub rock_porosity: f64,
    /// Dynamic viscosity of air `μ`.
    pub air_viscosity: DynamicViscosity,
    /// Pore pressure at the reservoir edge `pₑ`.
    pub edge_pressure: Pressure,
    /// Air density at `t = 0`, also the lower bound on density `ρ₀`.
    pub initial_density: MassDensity,
    /// Specific heat of air at constant pressure `cp`.
    pub cp: SpecificHeatCapacity,
    /// Specific heat of air at constant volume `cv`.
    pub cv: SpecificHeatCapacity,
    /// Specific gas constant of air `R`.
    pub gas_constant: SpecificGasConstant,
    /// Gas compressibility factor `Z`.
    pub compressibility_factor: f64,
    /// Fixed radius of the reservoir edge.
    ///
    /// When `None`, the radius is derived from permeability, edge pressure,
    /// porosity, and viscosity every time the config is built.
    pub reservoir_radius: Option<Length>,
    /// Step of the time grid.
    pub time_step: Time,
    /// End of the time grid.
    pub time_end: Time,
}

impl ParametersConfig {
    /// Returns the parameters of the Kamioka pilot CAES test.
    ///
    /// The run covers twelve hours at a one second step.
    #[must_use]
    pub fn kamioka() -> Self {
        Self {
            cavern_length: Length::new::<meter>(9.0),
            cavern_surface_area: Area::new::<square_meter>(211.5),
            cavern_volume: Volume::new::<cubic_meter>(222.75),
            cavern_radius: Length::new::<meter>(2.8068),
            injection_temperature: ThermodynamicTemperature::new::<kelvin>(30.82 + 273.0),
            heat_transfer_coefficient: HeatTransfer::new::<watt_per_square_meter_kelvin>(30.0),
            initial_temperature: ThermodynamicTemperature::new::<kelvin>(20.0 + 273.0),
            wall_temperature: ThermodynamicTemperature::new::<kelvin>(20.0 + 273.0),
            rock_permeability: Area::new::<square_meter>(5e-14),
            rock_porosity: 0.1,
            air_viscosity: DynamicViscosity::new::<pascal_second>(1.79e-5),
            edge_pressure: Pressure::new::<pascal>(1.0133e5),
            initial_density: MassDensity::new::<kilogram_per_cubic_meter>(1.2754),
            cp: SpecificHeatCapacity::new::<joule_per_kilogram_kelvin>(1004.0),
            cv: SpecificHeatCapacity::new::<joule_per_kilogram_kelvin>(717.0),
            gas_constant: SpecificGasConstant::new::<joule_per_kilogram_kelvin>(286.7),
            compressibility_factor: 1.0,
            reservoir_radius: None,
            time_step: Time::new::<second>(1.0),
            time_end: Time::new::<second>(720.0 * 60.0),
        }
    }

    /// Validates the config and derives the dependent quantities.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::InvalidConfiguration`] if any constant is
    /// non-finite or outside its physical range, if the time controls do not
    /// form a grid, or if the reservoir radius does not exceed the cavern radius.
    pub fn build(self) -> Result<Parameters, ModelError> {
        Parameters::new(self)
    }
}

impl Default for ParametersConfig {
    fn default() -> Self {
        Self::kamioka()
    }
}

/// Validated, immutable parameter set for a single cavern run.
///
/// Built only through [`ParametersConfig::build`], so the reservoir radius
/// and time grid are always consistent with the constants they derive from.
/// Comparative studies build a fresh value per run.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameters {
    config: ParametersConfig,
    reservoir_radius: Length,
    time_grid: TimeGrid,
}

impl Parameters {
    /// Creates parameters from a config.
    ///
    /// # Errors
    ///
    /// See [`ParametersConfig::build`].
    pub fn new(config: ParametersConfig) -> Result<Self, ModelError> {
        validate(&config)?;

        let time_grid = TimeGrid::new(config.time_end, config.time_step)?;

        let reservoir_radius = match config.reservoir_radius {
            Some(radius) => radius,
            None => derived_reservoir_radius(&config),
        };
        let r_e = reservoir_radius.get::<meter>();
        let r_0 = config.cavern_radius.get::<meter>();
        if !r_e.is_finite() || r_e <= r_0 {
            return Err(ModelError::invalid(format!(
                "reservoir radius ({r_e} m) must exceed the cavern radius ({r_0} m)"
            )));
        }

        Ok(Self {
            config,
            reservoir_radius,
            time_grid,
        })
    }

    /// Returns the constants these parameters were built from.
    #[must_use]
    pub fn config(&self) -> &ParametersConfig {
        &self.config
    }

    /// Returns the radius of the reservoir edge.
    #[must_use]
    pub fn reservoir_radius(&self) -> Length {
        self.reservoir_radius
    }

    /// Returns `true` if the reservoir radius was derived rather than fixed.
    #[must_use]
    pub fn is_reservoir_radius_derived(&self) -> bool {
        self.config.reservoir_radius.is_none()
    }

    /// Returns the time grid shared by every series of the run.
    #[must_use]
    pub fn time_grid(&self) -> &TimeGrid {
        &self.time_grid
    }
}

/// Computes `√(k·pₑ·t / (φ·μ))` with `t` the radius-of-influence time.
fn derived_reservoir_radius(config: &ParametersConfig) -> Length {
    let k = config.rock_permeability.get::<square_meter>();
    let p_e = config.edge_pressure.get::<pascal>();
    let mu = config.air_viscosity.get::<pascal_second>();
    let phi = config.rock_porosity;

    Length::new::<meter>((k * p_e * RADIUS_OF_INFLUENCE_TIME / (phi * mu)).sqrt())
}

fn validate(config: &ParametersConfig) -> Result<(), ModelError> {
    let strictly_positive = [
        ("cavern_length", config.cavern_length.get::<meter>()),
        (
            "cavern_surface_area",
            config.cavern_surface_area.get::<square_meter>(),
        ),
        ("cavern_volume", config.cavern_volume.get::<cubic_meter>()),
        ("cavern_radius", config.cavern_radius.get::<meter>()),
        (
            "injection_temperature",
            config.injection_temperature.get::<kelvin>(),
        ),
        (
            "initial_temperature",
            config.initial_temperature.get::<kelvin>(),
        ),
        ("wall_temperature", config.wall_temperature.get::<kelvin>()),
        (
            "rock_permeability",
            config.rock_permeability.get::<square_meter>(),
        ),
        ("rock_porosity", config.rock_porosity),
        ("air_viscosity", config.air_viscosity.get::<pascal_second>()),
        ("edge_pressure", config.edge_pressure.get::<pascal>()),
        (
            "initial_density",
            config.initial_density.get::<kilogram_per_cubic_meter>(),
        ),
        ("cp", config.cp.get::<joule_per_kilogram_kelvin>()),
        ("cv", config.cv.get::<joule_per_kilogram_kelvin>()),
        (
            "gas_constant",
            config.gas_constant.get::<joule_per_kilogram_kelvin>(),
        ),
        ("compressibility_factor", config.compressibility_factor),
    ];

    for (name, value) in strictly_positive {
        if !value.is_finite() || value <= 0.0 {
            return Err(ModelError::invalid(format!(
                "{name} must be finite and strictly positive, got {value}"
            )));
        }
    }

    let h_c = config
        .heat_transfer_coefficient
        .get::<watt_per_square_meter_kelvin>();
    if !h_c.is_finite() || h_c < 0.0 {
        return Err(ModelError::invalid(format!(
            "heat_transfer_coefficient must be finite and non-negative, got {h_c}"
        )));
    }

    if config.rock_porosity > 1.0 {
        return Err(ModelError::invalid(format!(
            "rock_porosity must not exceed 1, got {}",
            config.rock_porosity
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_relative_eq;

    #[test]
    fn kamioka_builds_with_derived_radius() {
        let params = ParametersConfig::kamioka().build().unwrap();

        assert!(params.is_reservoir_radius_derived());
        assert_relative_eq!(
            params.reservoir_radius().get::<meter>(),
            118.963_165,
            epsilon = 1e-5
        );
        assert_eq!(params.time_grid().len(), 43_201);
    }

    #[test]
    fn radius_follows_permeability() {
        let base = ParametersConfig::kamioka().build().unwrap();
        let tighter = ParametersConfig {
            rock_permeability: Area::new::<square_meter>(5e-16),
            ..ParametersConfig::kamioka()
        }
        .build()
        .unwrap();

        // Radius scales with √k, so a hundredfold drop shrinks it tenfold.
        assert_relative_eq!(
            tighter.reservoir_radius().get::<meter>() * 10.0,
            base.reservoir_radius().get::<meter>(),
            epsilon = 1e-9
        );
    }

    #[test]
    fn fixed_radius_overrides_derivation() {
        let params = ParametersConfig {
            reservoir_radius: Some(Length::new::<meter>(500.0)),
            ..ParametersConfig::kamioka()
        }
        .build()
        .unwrap();

        assert!(!params.is_reservoir_radius_derived());
        assert_relative_eq!(params.reservoir_radius().get::<meter>(), 500.0);
    }

    #[test]
    fn radius_equal_to_cavern_radius_is_rejected() {
        let config = ParametersConfig::kamioka();
        let result = ParametersConfig {
            reservoir_radius: Some(config.cavern_radius),
            ..config
        }
        .build();

        assert!(matches!(
            result,
            Err(ModelError::InvalidConfiguration { .. })
        ));
    }

    #[test]
    fn derived_radius_inside_cavern_is_rejected() {
        let result = ParametersConfig {
            rock_permeability: Area::new::<square_meter>(1e-20),
            ..ParametersConfig::kamioka()
        }
        .build();

        assert!(matches!(
            result,
            Err(ModelError::InvalidConfiguration { .. })
        ));
    }

    #[test]
    fn rejects_non_physical_constants() {
        let configs = [
            ParametersConfig {
                cavern_volume: Volume::new::<cubic_meter>(0.0),
                ..ParametersConfig::kamioka()
            },
            ParametersConfig {
                rock_porosity: 1.5,
                ..ParametersConfig::kamioka()
            },
            ParametersConfig {
                heat_transfer_coefficient: HeatTransfer::new::<watt_per_square_meter_kelvin>(-1.0),
                ..ParametersConfig::kamioka()
            },
            ParametersConfig {
                initial_density: MassDensity::new::<kilogram_per_cubic_meter>(f64::NAN),
                ..ParametersConfig::kamioka()
            },
            ParametersConfig {
                time_step: Time::new::<second>(0.0),
                ..ParametersConfig::kamioka()
            },
        ];

        for config in configs {
            assert!(matches!(
                config.build(),
                Err(ModelError::InvalidConfiguration { .. })
            ));
        }
    }

    #[test]
    fn deserializes_partial_config_over_kamioka() {
        let config: ParametersConfig = toml::from_str(
            r"
            rock_permeability = 5e-12
            reservoir_radius = 500.0
            time_end = 3600
            ",
        )
        .unwrap();

        assert_relative_eq!(config.rock_permeability.get::<square_meter>(), 5e-12);
        assert_relative_eq!(config.reservoir_radius.unwrap().get::<meter>(), 500.0);
        assert_relative_eq!(config.time_end.get::<second>(), 3600.0);
        assert_relative_eq!(config.cavern_volume.get::<cubic_meter>(), 222.75);
    }

    #[test]
    fn rejects_unknown_fields() {
        let result: Result<ParametersConfig, _> = toml::from_str("cavern_depth = 3.0");
        assert!(result.is_err());
    }
}
