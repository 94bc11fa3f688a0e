use crate::error::GovernorError;

/// Mean earth radius in nautical miles.
const EARTH_RADIUS_NM: f64 = 3440.065;

/// Great-circle distance in nautical miles between two `(lat, lon)` pairs
/// given in degrees, via the haversine formula.
///
/// # Errors
/// Returns [`GovernorError::Geometry`] when any coordinate is non-finite.
pub fn great_circle_nm(from: (f64, f64), to: (f64, f64)) -> Result<f64, GovernorError> {
    check_finite(from)?;
    check_finite(to)?;
    let (lat1, lon1) = (from.0.to_radians(), from.1.to_radians());
    let (lat2, lon2) = (to.0.to_radians(), to.1.to_radians());
    let d_lat = lat2 - lat1;
    let d_lon = lon2 - lon1;
    let a = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
    // Clamp guards against rounding pushing the radicand past 1.
    let c = 2.0 * a.sqrt().clamp(0.0, 1.0).asin();
    Ok(EARTH_RADIUS_NM * c)
}

/// Initial great-circle bearing in degrees `[0, 360)` from `from` to `to`.
/// Directional display only; never used in safety decisions.
pub fn initial_bearing_deg(from: (f64, f64), to: (f64, f64)) -> Result<f64, GovernorError> {
    check_finite(from)?;
    check_finite(to)?;
    let (lat1, lon1) = (from.0.to_radians(), from.1.to_radians());
    let (lat2, lon2) = (to.0.to_radians(), to.1.to_radians());
    let d_lon = lon2 - lon1;
    let y = d_lon.sin() * lat2.cos();
    let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * d_lon.cos();
    Ok((y.atan2(x).to_degrees() + 360.0) % 360.0)
}

fn check_finite(coord: (f64, f64)) -> Result<(), GovernorError> {
    if coord.0.is_finite() && coord.1.is_finite() {
        Ok(())
    } else {
        Err(GovernorError::Geometry(format!(
            "non-finite coordinate ({}, {})",
            coord.0, coord.1
        )))
    }
}
