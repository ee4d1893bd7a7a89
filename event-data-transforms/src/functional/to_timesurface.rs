//! Time surfaces: per-pixel recency maps with exponential or linear decay

use std::fmt;
use std::str::FromStr;

use ndarray::{s, Array3, Array4, ArrayView3, Axis};
use serde::{Deserialize, Serialize};

use event_data_core::{Error, EventStream, Result, SensorSize};

/// Decay applied to the age of the last event at each pixel
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decay {
    /// `max(0, age / (3 tau) + 1)` with `age <= 0`
    #[serde(alias = "linear")]
    Lin,

    /// `exp(age / tau)` with `age <= 0`
    #[default]
    #[serde(alias = "exponential")]
    Exp,
}

impl Decay {
    /// Score of a pixel whose last event happened `age` time units ago
    /// (`age` is zero or negative)
    pub fn apply(self, age: f64, tau: f64) -> f64 {
        match self {
            Decay::Lin => (age / (3.0 * tau) + 1.0).max(0.0),
            Decay::Exp => (age / tau).exp(),
        }
    }
}

impl fmt::Display for Decay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Decay::Lin => write!(f, "lin"),
            Decay::Exp => write!(f, "exp"),
        }
    }
}

impl FromStr for Decay {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "lin" | "linear" => Ok(Decay::Lin),
            "exp" | "exponential" => Ok(Decay::Exp),
            other => Err(Error::config(format!("unknown decay: {other}"))),
        }
    }
}

/// Check time surface parameters
pub fn check_timesurface_config(
    surface_dimensions: Option<(usize, usize)>,
    tau: f64,
    delta_t: f64,
) -> Result<()> {
    if let Some((w, h)) = surface_dimensions {
        if w % 2 == 0 || h % 2 == 0 {
            return Err(Error::config(format!(
                "surface dimensions must be odd, got {w}x{h}"
            )));
        }
    }
    if !(tau > 0.0 && tau.is_finite()) {
        return Err(Error::config(format!("tau must be positive, got {tau}")));
    }
    if !(delta_t >= 0.0) {
        return Err(Error::config(format!("delta_t must be non-negative, got {delta_t}")));
    }
    Ok(())
}

/// Build time surfaces as `[surface, polarity, height, width]` scores
///
/// Without `surface_dimensions` each surface covers the whole sensor;
/// otherwise it is a window centred on the triggering event, with the sensor
/// padded so border windows stay in range. With `delta_t == 0` one surface is
/// emitted per event. With `delta_t > 0` a surface is emitted at the first
/// event more than `delta_t` after the previous emission, up to
/// `floor(duration / delta_t)` surfaces; unused slots stay zero.
pub fn to_timesurface(
    events: &EventStream,
    sensor_size: SensorSize,
    surface_dimensions: Option<(usize, usize)>,
    tau: f64,
    delta_t: f64,
    decay: Decay,
) -> Result<Array4<f64>> {
    sensor_size.validate()?;
    check_timesurface_config(surface_dimensions, tau, delta_t)?;

    let (width, height, polarities) = (sensor_size.width, sensor_size.height, sensor_size.polarities);
    let (surface_w, surface_h) = surface_dimensions.unwrap_or((width, height));
    let (rx, ry) = match surface_dimensions {
        Some((w, h)) => (w / 2, h / 2),
        None => (0, 0),
    };

    let n_surfaces = match (delta_t > 0.0, events.first_t()) {
        (false, _) => events.len(),
        (true, None) => 0,
        (true, Some(_)) => (events.duration() as f64 / delta_t).floor() as usize,
    };
    let mut surfaces = Array4::zeros((n_surfaces, polarities, surface_h, surface_w));

    // Never-seen pixels start old enough to decay to 0 (linear) or ~0 (exp)
    let sentinel = -(3.0 * tau) - 1.0;
    let mut memory = Array3::from_elem((polarities, height + 2 * ry, width + 2 * rx), sentinel);

    let mut emitted = 0;
    let mut last_emission = events.first_t().unwrap_or_default();
    for (i, event) in events.iter().enumerate() {
        if !sensor_size.contains(event) {
            return Err(Error::EventOutOfBounds {
                x: event.x,
                y: event.y,
                p: event.p,
            });
        }
        let (x, y, p) = (event.x as usize, event.y as usize, event.p as usize);
        let t = event.t as f64;
        memory[[p, y + ry, x + rx]] = t;

        let slot = if delta_t == 0.0 {
            Some(i)
        } else if (event.t - last_emission) as f64 > delta_t && emitted < n_surfaces {
            last_emission = event.t;
            emitted += 1;
            Some(emitted - 1)
        } else {
            None
        };

        if let Some(slot) = slot {
            let context: ArrayView3<'_, f64> = if surface_dimensions.is_some() {
                memory.slice(s![.., y..y + surface_h, x..x + surface_w])
            } else {
                memory.view()
            };
            surfaces
                .index_axis_mut(Axis(0), slot)
                .assign(&context.mapv(|m| decay.apply(m - t, tau)));
        }
    }

    Ok(surfaces)
}
