//! Ellipsoidal American Polyconic (`+proj=poly`), which `proj4rs` does not
//! provide. Used by the Japanese survey zones.
//!
//! Formulas follow Snyder, USGS Prof. Paper 1395, ch. 18. Angles are taken
//! and returned in degrees; projected coordinates are in the definition's
//! `to_meter` unit.

use foundation::Vec2;

/// Convergence threshold for the inverse iteration (radians).
const INVERSE_EPSILON: f64 = 1e-12;
const INVERSE_MAX_ITERATIONS: usize = 20;
const EQUATOR_EPSILON: f64 = 1e-10;
/// Distance from the equator, in meters, treated as on it by the inverse.
const EQUATOR_TOLERANCE_M: f64 = 1e-6;

/// Reference ellipsoid given by semi-major axis and squared eccentricity.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Ellipsoid {
    pub a: f64,
    pub es: f64,
}

impl Ellipsoid {
    pub fn from_axes(a: f64, b: f64) -> Self {
        Self {
            a,
            es: 1.0 - (b * b) / (a * a),
        }
    }

    pub fn from_flattening(a: f64, rf: f64) -> Self {
        let f = 1.0 / rf;
        Self {
            a,
            es: 2.0 * f - f * f,
        }
    }

    /// Ellipsoids addressable with `+ellps=`.
    pub fn named(name: &str) -> Option<Self> {
        Some(match name {
            "clrk66" => Self::from_axes(6_378_206.4, 6_356_583.8),
            "bessel" => Self::from_flattening(6_377_397.155, 299.152_812_8),
            "GRS80" => Self::from_flattening(6_378_137.0, 298.257_222_101),
            "WGS84" => Self::from_flattening(6_378_137.0, 298.257_223_563),
            "intl" => Self::from_flattening(6_378_388.0, 297.0),
            _ => return None,
        })
    }

    fn series(&self) -> [f64; 4] {
        let e2 = self.es;
        let e4 = e2 * e2;
        let e6 = e4 * e2;
        [
            1.0 - e2 / 4.0 - 3.0 * e4 / 64.0 - 5.0 * e6 / 256.0,
            3.0 * e2 / 8.0 + 3.0 * e4 / 32.0 + 45.0 * e6 / 1024.0,
            15.0 * e4 / 256.0 + 45.0 * e6 / 1024.0,
            35.0 * e6 / 3072.0,
        ]
    }

    /// Meridian arc from the equator to `phi` (radians), in meters.
    pub fn meridian_arc(&self, phi: f64) -> f64 {
        let [c0, c2, c4, c6] = self.series();
        self.a
            * (c0 * phi - c2 * (2.0 * phi).sin() + c4 * (4.0 * phi).sin()
                - c6 * (6.0 * phi).sin())
    }

    /// Derivative of [`Self::meridian_arc`] divided by `a`.
    fn meridian_arc_slope(&self, phi: f64) -> f64 {
        let [c0, c2, c4, c6] = self.series();
        c0 - 2.0 * c2 * (2.0 * phi).cos() + 4.0 * c4 * (4.0 * phi).cos()
            - 6.0 * c6 * (6.0 * phi).cos()
    }
}

/// A parsed `+proj=poly` definition.
#[derive(Debug, Clone, PartialEq)]
pub struct Polyconic {
    ellipsoid: Ellipsoid,
    ellps: String,
    lon_0: f64,
    x_0: f64,
    y_0: f64,
    to_meter: f64,
    m0: f64,
}

fn number(key: &str, value: &str) -> Result<f64, String> {
    value
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| format!("invalid value for +{key}: {value}"))
}

impl Polyconic {
    /// Parse a proj string. `Ok(None)` when it is not a polyconic definition.
    pub fn from_proj_string(definition: &str) -> Result<Option<Self>, String> {
        let mut params = Vec::new();
        for token in definition.split_whitespace() {
            let token = token.trim_start_matches('+');
            match token.split_once('=') {
                Some((k, v)) => params.push((k, v)),
                None => params.push((token, "")),
            }
        }
        if !params.iter().any(|&(k, v)| k == "proj" && v == "poly") {
            return Ok(None);
        }

        let mut ellps = "GRS80".to_string();
        let (mut a, mut b, mut rf) = (None, None, None);
        let (mut lat_0, mut lon_0, mut x_0, mut y_0, mut to_meter) = (0.0, 0.0, 0.0, 0.0, 1.0);
        for (k, v) in params {
            match k {
                "ellps" => ellps = v.to_string(),
                "a" => a = Some(number(k, v)?),
                "b" => b = Some(number(k, v)?),
                "rf" => rf = Some(number(k, v)?),
                "lat_0" => lat_0 = number(k, v)?,
                "lon_0" => lon_0 = number(k, v)?,
                "x_0" => x_0 = number(k, v)?,
                "y_0" => y_0 = number(k, v)?,
                "to_meter" => to_meter = number(k, v)?,
                "proj" | "no_defs" | "units" | "towgs84" => {}
                "datum" => return Err("+datum is not supported with +proj=poly".into()),
                other => return Err(format!("unsupported parameter +{other}")),
            }
        }
        let ellipsoid = match (a, b, rf) {
            (Some(a), Some(b), _) => Ellipsoid::from_axes(a, b),
            (Some(a), None, Some(rf)) => Ellipsoid::from_flattening(a, rf),
            (Some(a), None, None) => Ellipsoid { a, es: 0.0 },
            (None, ..) => {
                Ellipsoid::named(&ellps).ok_or_else(|| format!("unknown ellipsoid {ellps}"))?
            }
        };
        if to_meter <= 0.0 {
            return Err(format!("invalid value for +to_meter: {to_meter}"));
        }
        let lat_0 = lat_0.to_radians();
        Ok(Some(Self {
            ellipsoid,
            ellps,
            lon_0: lon_0.to_radians(),
            x_0,
            y_0,
            to_meter,
            m0: ellipsoid.meridian_arc(lat_0),
        }))
    }

    /// Geographic system on the same ellipsoid, for `proj4rs`.
    pub fn geographic_definition(&self, definition: &str) -> String {
        let datum_shift = definition
            .split_whitespace()
            .find(|t| t.starts_with("+towgs84="))
            .map(|t| format!(" {t}"))
            .unwrap_or_default();
        let Ellipsoid { a, es } = self.ellipsoid;
        if Ellipsoid::named(&self.ellps) == Some(self.ellipsoid) {
            format!("+proj=longlat +ellps={}{datum_shift} +no_defs", self.ellps)
        } else {
            let b = a * (1.0 - es).sqrt();
            format!("+proj=longlat +a={a} +b={b}{datum_shift} +no_defs")
        }
    }

    /// Lon/lat in degrees to projected coordinates.
    pub fn forward(&self, lonlat: Vec2) -> Option<Vec2> {
        let Ellipsoid { a, es } = self.ellipsoid;
        let lam = lonlat.x.to_radians() - self.lon_0;
        let phi = lonlat.y.to_radians();
        let (x, y) = if phi.abs() < EQUATOR_EPSILON {
            (a * lam, -self.m0)
        } else {
            let e = lam * phi.sin();
            let n_cot = a / (1.0 - es * phi.sin().powi(2)).sqrt() / phi.tan();
            (
                n_cot * e.sin(),
                self.ellipsoid.meridian_arc(phi) - self.m0 + n_cot * (1.0 - e.cos()),
            )
        };
        let out = Vec2::new((x + self.x_0) / self.to_meter, (y + self.y_0) / self.to_meter);
        out.is_finite().then_some(out)
    }

    /// Projected coordinates to lon/lat in degrees. `None` if the
    /// iteration does not converge.
    pub fn inverse(&self, p: Vec2) -> Option<Vec2> {
        let Ellipsoid { a, es } = self.ellipsoid;
        let x = p.x * self.to_meter - self.x_0;
        let y = p.y * self.to_meter - self.y_0;
        if (y + self.m0).abs() < EQUATOR_TOLERANCE_M {
            return Some(Vec2::new((x / a + self.lon_0).to_degrees(), 0.0));
        }

        let big_a = (self.m0 + y) / a;
        let big_b = x * x / (a * a) + big_a * big_a;
        let mut phi = big_a;
        let mut converged = false;
        for _ in 0..INVERSE_MAX_ITERATIONS {
            let sin_2phi = (2.0 * phi).sin();
            let c = (1.0 - es * phi.sin().powi(2)).sqrt() * phi.tan();
            let mn = self.ellipsoid.meridian_arc(phi) / a;
            let mn_slope = self.ellipsoid.meridian_arc_slope(phi);
            let numerator = big_a * (c * mn + 1.0) - mn - 0.5 * (mn * mn + big_b) * c;
            let denominator = es * sin_2phi * (mn * mn + big_b - 2.0 * big_a * mn) / (4.0 * c)
                + (big_a - mn) * (c * mn_slope - 2.0 / sin_2phi)
                - mn_slope;
            let delta = numerator / denominator;
            if !delta.is_finite() {
                return None;
            }
            phi -= delta;
            if delta.abs() < INVERSE_EPSILON {
                converged = true;
                break;
            }
        }
        if !converged {
            return None;
        }

        let c = (1.0 - es * phi.sin().powi(2)).sqrt() * phi.tan();
        let lam = (x * c / a).asin() / phi.sin();
        let out = Vec2::new((lam + self.lon_0).to_degrees(), phi.to_degrees());
        out.is_finite().then_some(out)
    }
}

#[cfg(test)]
mod tests {
    use super::{Ellipsoid, Polyconic};
    use foundation::Vec2;

    const ZONE_B: &str = "+proj=poly +lat_0=40.5 +lon_0=135 +x_0=914398.5307444408 +y_0=1828797.0614888816 +ellps=clrk66 +to_meter=0.9143985307444408 +no_defs";

    fn assert_close(a: f64, b: f64, eps: f64) {
        let diff = (a - b).abs();
        assert!(diff <= eps, "expected {a} ~= {b} (diff {diff})");
    }

    fn zone_b() -> Polyconic {
        Polyconic::from_proj_string(ZONE_B).unwrap().unwrap()
    }

    #[test]
    fn other_projections_are_not_parsed() {
        assert_eq!(Polyconic::from_proj_string("+proj=longlat +ellps=clrk66").unwrap(), None);
    }

    #[test]
    fn bad_parameters_are_rejected() {
        assert!(Polyconic::from_proj_string("+proj=poly +ellps=nowhere").is_err());
        assert!(Polyconic::from_proj_string("+proj=poly +lat_0=north").is_err());
        assert!(Polyconic::from_proj_string("+proj=poly +datum=NAD27").is_err());
        assert!(Polyconic::from_proj_string("+proj=poly +to_meter=0").is_err());
    }

    #[test]
    fn clarke_meridian_arc_to_forty_five_degrees() {
        let clrk66 = Ellipsoid::named("clrk66").unwrap();
        // Numerically integrated arc length, equator to 45N.
        assert_close(clrk66.meridian_arc(45f64.to_radians()), 4_984_727.100, 0.01);
    }

    #[test]
    fn zone_origin_is_the_false_origin() {
        let p = zone_b().forward(Vec2::new(135.0, 40.5)).unwrap();
        assert_close(p.x, 1_000_000.0, 1e-6);
        assert_close(p.y, 2_000_000.0, 1e-6);
    }

    #[test]
    fn central_meridian_is_true_to_scale() {
        // Clarke 1866 arc from 35.5 to 40.5 degrees, in yards.
        let p = zone_b().forward(Vec2::new(135.0, 35.5)).unwrap();
        assert_close(p.x, 1_000_000.0, 1e-6);
        assert_close(p.y, 1_393_075.017, 0.01);
    }

    #[test]
    fn inverse_recovers_lonlat() {
        let poly = zone_b();
        for ll in [
            Vec2::new(139.7, 35.68),
            Vec2::new(131.0, 33.5),
            Vec2::new(141.0, 43.0),
            Vec2::new(136.0, 0.5),
        ] {
            let p = poly.forward(ll).unwrap();
            let back = poly.inverse(p).unwrap();
            assert_close(back.x, ll.x, 1e-9);
            assert_close(back.y, ll.y, 1e-9);
        }
    }

    #[test]
    fn equator_is_handled_directly() {
        let poly = zone_b();
        let p = poly.forward(Vec2::new(136.0, 0.0)).unwrap();
        let back = poly.inverse(p).unwrap();
        assert_close(back.x, 136.0, 1e-9);
        assert_close(back.y, 0.0, 1e-12);
    }

    #[test]
    fn geographic_base_keeps_the_ellipsoid() {
        assert_eq!(
            zone_b().geographic_definition(ZONE_B),
            "+proj=longlat +ellps=clrk66 +no_defs"
        );
    }
}
