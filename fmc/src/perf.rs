// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Joe Pearson
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Aircraft performance model.
//!
//! Pure ISA atmosphere conversions, the aircraft performance file parser
//! and the average max-thrust estimate the trajectory builder uses to pick
//! a representative speed at each join.

use log::warn;

use crate::error::{Error, Result};
use crate::geom::{kt2mps, Bezier, Vec2, FEET_IN_METER};

const ISA_SL_TEMP: f64 = 15.0; // ISA sea level temperature in degC
const ISA_SL_TEMP_K: f64 = 288.15; // ISA sea level temperature in K
const ISA_SL_PRESS: f64 = 1013.25; // ISA sea level pressure in hPa
const ISA_ELR_PER_1000: f64 = 1.98; // ISA environmental lapse rate
const ISA_TLR_PER_M: f64 = 0.0065; // ISA temperature lapse rate K/m

const EARTH_GRAVITY: f64 = 9.80665;
const DRY_AIR_MOL: f64 = 0.0289644; // molar mass of dry air
const GAMMA: f64 = 1.4; // specific heat ratio of dry air
const SPEED_SOUND_ISA: f64 = 340.3; // speed of sound at 15 degrees C, m/s
const R_UNIV: f64 = 8.31447; // universal gas constant
const R_SPEC: f64 = 287.058; // specific gas constant of dry air

const ACFT_PERF_MIN_VERSION: u32 = 1;
const ACFT_PERF_MAX_VERSION: u32 = 1;

fn c2kelvin(c: f64) -> f64 {
    c + 273.15
}

fn kelvin2c(k: f64) -> f64 {
    k - 273.15
}

fn mps2kt(mps: f64) -> f64 {
    mps / crate::geom::KNOTS_IN_MPS
}

/// Speed of sound in dry air at `oat` degrees C (static). For common flight
/// temperatures the approximation is below 0.1% off.
pub fn speed_sound(oat: f64) -> f64 {
    20.05 * c2kelvin(oat).sqrt()
}

/// Converts a true airspeed in knots to Mach number at `oat` degrees C.
pub fn ktas2mach(ktas: f64, oat: f64) -> f64 {
    kt2mps(ktas) / speed_sound(oat)
}

/// Converts Mach number to true airspeed in knots at `oat` degrees C.
pub fn mach2ktas(mach: f64, oat: f64) -> f64 {
    mps2kt(mach * speed_sound(oat))
}

/// Air density in kg/m^3 from static pressure in hPa and `oat` in degrees C
/// (`rho = p / (R_spec * T)`).
pub fn air_density(pressure: f64, oat: f64) -> f64 {
    (pressure * 100.0) / (R_SPEC * c2kelvin(oat))
}

/// Impact pressure (dynamic pressure with compressibility) in hPa. In
/// isentropic flow for air, `qc = P*((1 + 0.2*M^2)^3.5 - 1)`.
pub fn impact_press(mach: f64, pressure: f64) -> f64 {
    pressure * ((1.0 + 0.2 * mach * mach).powf(3.5) - 1.0)
}

/// Dynamic pressure in hPa from true airspeed in knots.
pub fn dyn_press(ktas: f64, press: f64, oat: f64) -> f64 {
    0.5 * air_density(press, oat) * kt2mps(ktas) * kt2mps(ktas) / 100.0
}

/// Converts true airspeed to calibrated airspeed, both in knots.
pub fn ktas2kcas(ktas: f64, pressure: f64, oat: f64) -> f64 {
    let qc = impact_press(ktas2mach(ktas, oat), pressure);
    mps2kt(SPEED_SOUND_ISA * (5.0 * ((qc / ISA_SL_PRESS + 1.0).powf(2.0 / 7.0) - 1.0)).sqrt())
}

/// Converts calibrated airspeed to true airspeed, both in knots.
pub fn kcas2ktas(kcas: f64, pressure: f64, oat: f64) -> f64 {
    // solve the CAS equation for impact pressure, then the impact pressure
    // equation for Mach, then convert at local temperature
    let v = kt2mps(kcas);
    let qc =
        ISA_SL_PRESS * ((v * v / (5.0 * SPEED_SOUND_ISA * SPEED_SOUND_ISA) + 1.0).powf(3.5) - 1.0);
    let mach = (5.0 * ((qc / pressure + 1.0).powf(2.0 / 7.0) - 1.0)).sqrt();
    mach2ktas(mach, oat)
}

/// Converts Mach number to equivalent airspeed in knots at static pressure
/// `press` in hPa.
pub fn mach2keas(mach: f64, press: f64) -> f64 {
    mps2kt(SPEED_SOUND_ISA * mach * (press / ISA_SL_PRESS).sqrt())
}

/// Converts equivalent airspeed in knots to Mach number.
pub fn keas2mach(keas: f64, press: f64) -> f64 {
    kt2mps(keas) / (SPEED_SOUND_ISA * (press / ISA_SL_PRESS).sqrt())
}

/// Static air pressure in hPa at pressure altitude `alt` feet and local
/// QNH.
pub fn alt2press(alt: f64, qnh: f64) -> f64 {
    qnh * (1.0 - (ISA_TLR_PER_M * alt * FEET_IN_METER) / ISA_SL_TEMP_K)
        .powf((EARTH_GRAVITY * DRY_AIR_MOL) / (R_UNIV * ISA_TLR_PER_M))
}

/// Pressure altitude in feet from static air pressure in hPa and local QNH.
pub fn press2alt(press: f64, qnh: f64) -> f64 {
    (ISA_SL_TEMP_K
        * (1.0 - (press / qnh).powf((R_UNIV * ISA_TLR_PER_M) / (EARTH_GRAVITY * DRY_AIR_MOL))))
        / ISA_TLR_PER_M
        / FEET_IN_METER
}

/// Converts pressure altitude in feet to a flight level number.
pub fn alt2fl(alt: f64, qnh: f64) -> f64 {
    press2alt(alt2press(alt, qnh), ISA_SL_PRESS) / 100.0
}

/// Converts a flight level number to pressure altitude in feet.
pub fn fl2alt(fl: f64, qnh: f64) -> f64 {
    press2alt(alt2press(fl * 100.0, ISA_SL_PRESS), qnh)
}

/// Converts static air temperature to total air temperature, degrees C.
pub fn sat2tat(sat: f64, mach: f64) -> f64 {
    kelvin2c(c2kelvin(sat) * (1.0 + ((GAMMA - 1.0) / 2.0) * mach * mach))
}

/// Converts total air temperature to static air temperature, degrees C.
pub fn tat2sat(tat: f64, mach: f64) -> f64 {
    kelvin2c(c2kelvin(tat) / (1.0 + ((GAMMA - 1.0) / 2.0) * mach * mach))
}

/// ISA deviation in degrees C from flight level and static air temperature.
pub fn sat2isadev(fl: f64, sat: f64) -> f64 {
    sat - (ISA_SL_TEMP - ((fl / 10.0) * ISA_ELR_PER_1000))
}

/// Static air temperature in degrees C from flight level and ISA deviation.
pub fn isadev2sat(fl: f64, isadev: f64) -> f64 {
    isadev + ISA_SL_TEMP - ((fl / 10.0) * ISA_ELR_PER_1000)
}

/// Fixed aircraft performance limits parsed from the performance file.
#[derive(Clone, PartialEq, Debug)]
pub struct AircraftPerf {
    pub acft_type: String,
    pub eng_type: String,
    /// Max thrust in Newtons at SL ISA.
    pub eng_max_thr: f64,
    /// Reference zero-fuel weight in kg.
    pub ref_zfw: f64,
    pub max_fuel: f64,
    pub max_gw: f64,
    /// Max thrust fraction depending on air density.
    pub thr_dens_curve: Bezier,
    /// Max thrust fraction depending on ISA deviation.
    pub thr_isa_curve: Bezier,
    /// Specific fuel consumption depending on thrust.
    pub sfc_thr_curve: Bezier,
    /// Specific fuel consumption depending on air density.
    pub sfc_dens_curve: Bezier,
    /// Specific fuel consumption depending on ISA deviation.
    pub sfc_isa_curve: Bezier,
}

/// Per-flight performance selections.
#[derive(Clone, PartialEq, Debug)]
pub struct FlightPerf {
    pub crz_lvl: f64,
    pub crz_tas: f64,
    /// Fraction of `eng_max_thr` used for derated operations.
    pub thr_derate: f64,
}

impl FlightPerf {
    /// Default flight limits for an aircraft: full rated thrust.
    pub fn new(_acft: &AircraftPerf) -> Self {
        FlightPerf {
            crz_lvl: 350.0,
            crz_tas: 450.0,
            thr_derate: 1.0,
        }
    }
}

impl AircraftPerf {
    /// Parses the aircraft performance file contents: `KEY,VALUE` records
    /// plus `CURVE_KEY,N` headers followed by `N` control point records
    /// with strictly increasing x. The first record must be a supported
    /// `VERSION`.
    pub fn parse(contents: &str) -> Result<AircraftPerf> {
        let mut lines = contents.lines().enumerate();
        let err = |lineno: usize, msg: &str| Error::Parse {
            file: "acft.perf".to_string(),
            line: lineno + 1,
            msg: msg.to_string(),
        };

        let mut version_seen = false;
        let mut acft_type: Option<String> = None;
        let mut eng_type: Option<String> = None;
        let mut eng_max_thr = 0.0f64;
        let mut ref_zfw = 0.0f64;
        let mut max_fuel = 0.0f64;
        let mut max_gw = 0.0f64;
        let mut curves: [Option<Bezier>; 5] = [None, None, None, None, None];
        const CURVE_KEYS: [&str; 5] = ["THRDENS", "THRISA", "SFCTHR", "SFCDENS", "SFCISA"];

        while let Some((lineno, line)) = lines.next() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let comps: Vec<&str> = line.split(',').collect();
            if comps.len() != 2 {
                return Err(err(lineno, "malformed line"));
            }
            let (key, value) = (comps[0], comps[1].trim());

            if key == "VERSION" {
                if version_seen {
                    return Err(err(lineno, "duplicate VERSION line"));
                }
                let vers: u32 = value
                    .parse()
                    .map_err(|_| err(lineno, "malformed VERSION line"))?;
                if !(ACFT_PERF_MIN_VERSION..=ACFT_PERF_MAX_VERSION).contains(&vers) {
                    warn!("unsupported acft perf file version {vers}");
                    return Err(err(lineno, "unsupported file version"));
                }
                version_seen = true;
                continue;
            }
            if !version_seen {
                return Err(err(lineno, "first line was not VERSION"));
            }

            let mut scalar = |slot: &mut f64| -> Result<()> {
                if *slot != 0.0 {
                    return Err(err(lineno, "duplicate scalar line"));
                }
                *slot = value.parse().map_err(|_| err(lineno, "invalid value"))?;
                if *slot <= 0.0 {
                    return Err(err(lineno, "invalid value"));
                }
                Ok(())
            };

            match key {
                "ACFTTYPE" => {
                    if acft_type.replace(value.to_string()).is_some() {
                        return Err(err(lineno, "duplicate ACFTTYPE line"));
                    }
                }
                "ENGTYPE" => {
                    if eng_type.replace(value.to_string()).is_some() {
                        return Err(err(lineno, "duplicate ENGTYPE line"));
                    }
                }
                "MAXTHR" => scalar(&mut eng_max_thr)?,
                "REFZFW" => scalar(&mut ref_zfw)?,
                "MAXFUEL" => scalar(&mut max_fuel)?,
                "MAXGW" => scalar(&mut max_gw)?,
                key if CURVE_KEYS.contains(&key) => {
                    let idx = CURVE_KEYS.iter().position(|&k| k == key).unwrap_or(0);
                    if curves[idx].is_some() {
                        return Err(err(lineno, "duplicate curve"));
                    }
                    let n: usize = value
                        .parse()
                        .map_err(|_| err(lineno, "invalid curve point count"))?;
                    if n < 3 {
                        return Err(err(lineno, "invalid curve point count"));
                    }
                    let mut pts = Vec::with_capacity(n);
                    for _ in 0..n {
                        let Some((pt_lineno, pt_line)) = lines.next() else {
                            return Err(err(lineno, "truncated curve"));
                        };
                        let pt: Vec<&str> = pt_line.trim().split(',').collect();
                        if pt.len() != 2 {
                            return Err(err(pt_lineno, "malformed curve point"));
                        }
                        let x: f64 = pt[0]
                            .trim()
                            .parse()
                            .map_err(|_| err(pt_lineno, "malformed curve point"))?;
                        let y: f64 = pt[1]
                            .trim()
                            .parse()
                            .map_err(|_| err(pt_lineno, "malformed curve point"))?;
                        pts.push(Vec2::new(x, y));
                    }
                    curves[idx] =
                        Some(Bezier::new(pts).ok_or_else(|| err(lineno, "malformed curve"))?);
                }
                _ => return Err(err(lineno, "unknown line")),
            }
        }

        let [thr_dens, thr_isa, sfc_thr, sfc_dens, sfc_isa] = curves;
        match (acft_type, eng_type, thr_dens, thr_isa, sfc_thr, sfc_dens, sfc_isa) {
            (
                Some(acft_type),
                Some(eng_type),
                Some(thr_dens_curve),
                Some(thr_isa_curve),
                Some(sfc_thr_curve),
                Some(sfc_dens_curve),
                Some(sfc_isa_curve),
            ) if eng_max_thr > 0.0 && ref_zfw > 0.0 && max_fuel > 0.0 && max_gw > 0.0 => {
                Ok(AircraftPerf {
                    acft_type,
                    eng_type,
                    eng_max_thr,
                    ref_zfw,
                    max_fuel,
                    max_gw,
                    thr_dens_curve,
                    thr_isa_curve,
                    sfc_thr_curve,
                    sfc_dens_curve,
                    sfc_isa_curve,
                })
            }
            _ => Err(Error::Parse {
                file: "acft.perf".to_string(),
                line: 0,
                msg: "missing or corrupt data fields".to_string(),
            }),
        }
    }
}

/// Maximum average engine thrust attainable between two altitudes during a
/// climb, weighted by the average air density and ISA deviation along it
/// and multiplied by the flight's thrust derate.
///
/// `alt1`/`alt2` in feet, `ktas` the climb TAS in knots, `qnh` in hPa,
/// `isadev` in degrees C and `tp_alt` the tropopause altitude in feet.
pub fn eng_max_thr_avg(
    flt: &FlightPerf,
    acft: &AircraftPerf,
    alt1: f64,
    alt2: f64,
    ktas: f64,
    qnh: f64,
    isadev: f64,
    tp_alt: f64,
) -> f64 {
    let avg_alt = (alt1 + alt2) / 2.0;
    // convert altitudes to flight levels to calculate the average temp
    let alt1_fl = alt2fl(alt1, qnh);
    let alt2_fl = alt2fl(alt2, qnh);
    let tp_fl = alt2fl(tp_alt, qnh);

    let avg_temp =
        (isadev2sat(alt1_fl, isadev) + isadev2sat(alt2_fl.min(tp_fl), isadev)) / 2.0;
    // Ps is the average static pressure between alt1 and alt2; the dynamic
    // pressure rise yields the total effective air pressure.
    let ps = alt2press(avg_alt, qnh);
    let pd = dyn_press(ktas, ps, avg_temp);
    let p = ps + pd;

    let isadev = sat2isadev(alt2fl(avg_alt, qnh), avg_temp);
    let d = air_density(p + pd, isadev);

    acft.thr_dens_curve.eval(d) * acft.thr_isa_curve.eval(isadev) * flt.thr_derate
}

#[cfg(test)]
mod tests {
    use super::*;

    const PERF: &str = "\
VERSION,1
ACFTTYPE,B738
ENGTYPE,CFM56-7B26
MAXTHR,117300
REFZFW,62700
MAXFUEL,20800
MAXGW,79000
THRDENS,3
0.4,0.45
0.8,0.75
1.3,1.0
THRISA,3
-30,1.1
0,1.0
40,0.82
SFCTHR,3
0.2,0.8
0.6,0.62
1.0,0.55
SFCDENS,3
0.4,1.25
0.8,1.1
1.3,1.0
SFCISA,3
-30,0.95
0,1.0
40,1.08
";

    #[test]
    fn parses_complete_file() {
        let acft = AircraftPerf::parse(PERF).expect("perf file should parse");
        assert_eq!(acft.acft_type, "B738");
        assert_eq!(acft.eng_max_thr, 117_300.0);
        assert!((acft.thr_isa_curve.eval(0.0) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn rejects_missing_curve() {
        let truncated: String = PERF
            .lines()
            .take_while(|l| !l.starts_with("SFCISA"))
            .map(|l| format!("{l}\n"))
            .collect();
        assert!(AircraftPerf::parse(&truncated).is_err());
    }

    #[test]
    fn rejects_wrong_version() {
        assert!(AircraftPerf::parse("VERSION,99\n").is_err());
    }

    #[test]
    fn isa_sea_level_sanity() {
        assert!((alt2press(0.0, ISA_SL_PRESS) - ISA_SL_PRESS).abs() < 1e-9);
        assert!((isadev2sat(0.0, 0.0) - 15.0).abs() < 1e-12);
        // pressure altitude round trip
        let p = alt2press(10_000.0, ISA_SL_PRESS);
        assert!((press2alt(p, ISA_SL_PRESS) - 10_000.0).abs() < 0.1);
    }

    #[test]
    fn mach_speed_round_trip() {
        let m = ktas2mach(450.0, -40.0);
        assert!((mach2ktas(m, -40.0) - 450.0).abs() < 1e-9);
    }

    #[test]
    fn cas_equals_tas_at_sea_level_isa() {
        let kcas = ktas2kcas(250.0, ISA_SL_PRESS, ISA_SL_TEMP);
        assert!((kcas - 250.0).abs() < 1.0, "kcas {kcas}");
        let ktas = kcas2ktas(kcas, ISA_SL_PRESS, ISA_SL_TEMP);
        assert!((ktas - 250.0).abs() < 1.0);
    }

    #[test]
    fn thrust_derate_scales_linearly(){
        let acft = AircraftPerf::parse(PERF).expect("perf file should parse");
        let mut flt = FlightPerf::new(&acft);
        let full = eng_max_thr_avg(&flt, &acft, 3000.0, 9000.0, 280.0, 1013.25, 0.0, 36_089.0);
        flt.thr_derate = 0.9;
        let derated = eng_max_thr_avg(&flt, &acft, 3000.0, 9000.0, 280.0, 1013.25, 0.0, 36_089.0);
        assert!((derated / full - 0.9).abs() < 1e-9);
    }
}
