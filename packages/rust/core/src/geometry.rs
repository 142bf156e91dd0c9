//! Small-angle sky geometry.

const ARCSEC_PER_DEGREE: f64 = 3600.0;

/// Angular separation in arcseconds between two positions given in degrees.
///
/// Flat-sky approximation: the RA difference is scaled by the cosine of the
/// mean declination and combined in quadrature with the Dec difference. Good
/// for separations of a few arcminutes; meaningless near the poles, where the
/// cosine term collapses. Inputs are not range-checked.
///
/// RA differences are taken the short way round, so positions straddling
/// RA = 0/360 are not reported as half a sky apart.
pub fn angular_separation(ra1: f64, dec1: f64, ra2: f64, dec2: f64) -> f64 {
    let mean_dec = ((dec1 + dec2) / 2.0).to_radians();

    let mut d_ra_deg = (ra1 - ra2) % 360.0;
    if d_ra_deg > 180.0 {
        d_ra_deg -= 360.0;
    } else if d_ra_deg < -180.0 {
        d_ra_deg += 360.0;
    }

    let d_ra = d_ra_deg * mean_dec.cos() * ARCSEC_PER_DEGREE;
    let d_dec = (dec1 - dec2) * ARCSEC_PER_DEGREE;
    d_ra.hypot(d_dec)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ARCSEC: f64 = 1.0 / 3600.0;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn identical_positions_are_zero() {
        assert_eq!(angular_separation(188.736, 45.209, 188.736, 45.209), 0.0);
    }

    #[test]
    fn declination_offset_is_unscaled() {
        let sep = angular_separation(10.0, 20.0, 10.0, 20.0 + 3.0 * ARCSEC);
        assert!(close(sep, 3.0), "got {sep}");
    }

    #[test]
    fn ra_offset_scaled_by_cos_dec() {
        // At Dec 60 one arcsecond of RA spans half an arcsecond of sky.
        let sep = angular_separation(100.0, 60.0, 100.0 + ARCSEC, 60.0);
        assert!((sep - 0.5).abs() < 1e-4, "got {sep}");

        let equator = angular_separation(100.0, 0.0, 100.0 + ARCSEC, 0.0);
        assert!(close(equator, 1.0), "got {equator}");
    }

    #[test]
    fn quadrature_sum() {
        let sep = angular_separation(0.5, 0.0, 0.5 + 3.0 * ARCSEC, 4.0 * ARCSEC);
        assert!((sep - 5.0).abs() < 1e-4, "got {sep}");
    }

    #[test]
    fn symmetric() {
        let a = angular_separation(29.50, 65.72, 29.51, 65.70);
        let b = angular_separation(29.51, 65.70, 29.50, 65.72);
        assert!(close(a, b));
    }

    #[test]
    fn inside_and_outside_match_radius() {
        assert!(angular_separation(188.736, 45.209, 188.736, 45.209 + 9.0 * ARCSEC) < 10.0);
        assert!(angular_separation(188.736, 45.209, 188.736, 45.209 + 11.0 * ARCSEC) > 10.0);
        assert!(angular_separation(188.736, 45.209, 188.8, 45.3) > 10.0);
    }

    #[test]
    fn monotonic_in_offset() {
        let mut last = 0.0;
        for step in 1..20 {
            let sep = angular_separation(50.0, -30.0, 50.0 + step as f64 * ARCSEC, -30.0 + step as f64 * ARCSEC);
            assert!(sep > last);
            last = sep;
        }
    }

    #[test]
    fn wraps_at_zero_ra() {
        let sep = angular_separation(359.9999, 10.0, 0.0001, 10.0);
        assert!(sep < 1.0, "got {sep}");
    }
}
