#![allow(dead_code)]

//! GRIB1 message builder for integration tests. Produces regular lat/lon
//! fields with the ECMWF seasonal local section (definition 16) and simple
//! packing, which is what CDS returns for seasonal monthly statistics.

use std::path::{Path, PathBuf};

pub const MARS_FCMEAN: u8 = 80;
pub const MARS_FCSTDEV: u8 = 83;

#[derive(Debug, Clone)]
pub struct TestGrid {
    pub ni: u16,
    pub nj: u16,
    pub la1: f64,
    pub lo1: f64,
    pub la2: f64,
    pub lo2: f64,
}

/// Lat [10, 0, -10] x lon [0, 90, 180, 270]
pub fn small_grid() -> TestGrid {
    TestGrid {
        ni: 4,
        nj: 3,
        la1: 10.0,
        lo1: 0.0,
        la2: -10.0,
        lo2: 270.0,
    }
}

#[derive(Debug, Clone)]
pub struct TestField {
    pub table_version: u8,
    pub parameter: u8,
    pub mars_type: u8,
    pub number: u16,
    pub forecast_month: u16,
    pub year: i32,
    pub month: u32,
    pub grid: TestGrid,
    pub decimal_scale: i16,
    /// Row-major, north row first; NaN marks a missing point
    pub values: Vec<f32>,
}

/// GRIB (table version, parameter) for a variable name
pub fn parameter_for(vname: &str) -> (u8, u8) {
    match vname {
        "pre" => (228, 172),
        "tmax" => (128, 51),
        "tmin" => (128, 52),
        _ => (128, 34),
    }
}

fn push_u16(buf: &mut Vec<u8>, v: u16) {
    buf.extend_from_slice(&v.to_be_bytes());
}

fn push_u24(buf: &mut Vec<u8>, v: u32) {
    buf.extend_from_slice(&v.to_be_bytes()[1..]);
}

fn u24(v: usize) -> [u8; 3] {
    let b = (v as u32).to_be_bytes();
    [b[1], b[2], b[3]]
}

fn sm16(v: i16) -> [u8; 2] {
    let mag = v.unsigned_abs() & 0x7FFF;
    let raw = if v < 0 { mag | 0x8000 } else { mag };
    raw.to_be_bytes()
}

fn sm24_millidegrees(deg: f64) -> [u8; 3] {
    let v = (deg * 1000.0).round() as i32;
    let mag = v.unsigned_abs() & 0x7F_FFFF;
    let raw = if v < 0 { mag | 0x80_0000 } else { mag };
    u24(raw as usize)
}

/// IBM System/360 single precision; exact for integers below 2^21.
pub fn f64_to_ibm(v: f64) -> [u8; 4] {
    if v == 0.0 {
        return [0; 4];
    }
    let sign: u8 = if v < 0.0 { 0x80 } else { 0 };
    let mut m = v.abs();
    let mut exponent: i32 = 64;
    while m >= 1.0 {
        m /= 16.0;
        exponent += 1;
    }
    while m < 1.0 / 16.0 {
        m *= 16.0;
        exponent -= 1;
    }
    let mantissa = (m * 16_777_216.0) as u32;
    let b = mantissa.to_be_bytes();
    [sign | exponent as u8, b[1], b[2], b[3]]
}

fn pds(field: &TestField, has_bitmap: bool) -> Vec<u8> {
    let century = (field.year - 1) / 100 + 1;
    let year_of_century = field.year - (century - 1) * 100;

    let mut p = vec![0u8; 64];
    p[0..3].copy_from_slice(&u24(64));
    p[3] = field.table_version;
    p[4] = 98;
    p[5] = 151;
    p[6] = 255;
    p[7] = 0x80 | if has_bitmap { 0x40 } else { 0 };
    p[8] = field.parameter;
    p[9] = 1;
    p[12] = year_of_century as u8;
    p[13] = field.month as u8;
    p[14] = 1;
    p[17] = 1;
    p[20] = 10;
    p[24] = century as u8;
    p[26..28].copy_from_slice(&sm16(field.decimal_scale));
    p[40] = 16;
    p[41] = 1;
    p[42] = field.mars_type;
    p[43..45].copy_from_slice(&1091u16.to_be_bytes());
    p[45..49].copy_from_slice(b"0001");
    p[49..51].copy_from_slice(&field.number.to_be_bytes());
    p[51..53].copy_from_slice(&51u16.to_be_bytes());
    p[60..62].copy_from_slice(&field.forecast_month.to_be_bytes());
    p
}

fn gds(grid: &TestGrid) -> Vec<u8> {
    let mut g = vec![0u8; 32];
    g[0..3].copy_from_slice(&u24(32));
    g[4] = 255;
    g[5] = 0;
    g[6..8].copy_from_slice(&grid.ni.to_be_bytes());
    g[8..10].copy_from_slice(&grid.nj.to_be_bytes());
    g[10..13].copy_from_slice(&sm24_millidegrees(grid.la1));
    g[13..16].copy_from_slice(&sm24_millidegrees(grid.lo1));
    g[16] = 0x80;
    g[17..20].copy_from_slice(&sm24_millidegrees(grid.la2));
    g[20..23].copy_from_slice(&sm24_millidegrees(grid.lo2));
    g[27] = 0;
    g
}

fn bms(values: &[f32]) -> Vec<u8> {
    let nbytes = values.len().div_ceil(8);
    let mut b = Vec::with_capacity(6 + nbytes);
    push_u24(&mut b, (6 + nbytes) as u32);
    b.push(((8 - values.len() % 8) % 8) as u8);
    push_u16(&mut b, 0);
    let mut bits = vec![0u8; nbytes];
    for (k, v) in values.iter().enumerate() {
        if !v.is_nan() {
            bits[k / 8] |= 0x80 >> (k % 8);
        }
    }
    b.extend_from_slice(&bits);
    b
}

fn bds(values: &[f32], decimal_scale: i16) -> Vec<u8> {
    let scale = 10f64.powi(i32::from(decimal_scale));
    let scaled: Vec<i64> = values
        .iter()
        .filter(|v| !v.is_nan())
        .map(|&v| (f64::from(v) * scale).round() as i64)
        .collect();
    let reference = scaled.iter().copied().min().unwrap_or(0);
    let span = scaled.iter().map(|y| y - reference).max().unwrap_or(0) as u64;
    let bits = if span == 0 { 0 } else { 64 - span.leading_zeros() as usize };

    let mut packed = vec![0u8; (scaled.len() * bits).div_ceil(8)];
    let mut pos = 0;
    for y in &scaled {
        let x = (y - reference) as u64;
        for k in (0..bits).rev() {
            if (x >> k) & 1 == 1 {
                packed[pos / 8] |= 0x80 >> (pos % 8);
            }
            pos += 1;
        }
    }

    let len = 11 + packed.len();
    let mut b = Vec::with_capacity(len);
    push_u24(&mut b, len as u32);
    b.push(((packed.len() * 8 - scaled.len() * bits) & 0x0F) as u8);
    b.extend_from_slice(&sm16(0));
    b.extend_from_slice(&f64_to_ibm(reference as f64));
    b.push(bits as u8);
    b.extend_from_slice(&packed);
    b
}

/// Encode one field as a complete GRIB1 message.
pub fn encode(field: &TestField) -> Vec<u8> {
    let has_bitmap = field.values.iter().any(|v| v.is_nan());
    let mut body = pds(field, has_bitmap);
    body.extend(gds(&field.grid));
    if has_bitmap {
        body.extend(bms(&field.values));
    }
    body.extend(bds(&field.values, field.decimal_scale));

    let total = 8 + body.len() + 4;
    let mut msg = Vec::with_capacity(total);
    msg.extend_from_slice(b"GRIB");
    msg.extend_from_slice(&u24(total));
    msg.push(1);
    msg.extend(body);
    msg.extend_from_slice(b"7777");
    msg
}

pub fn write_grib(path: &Path, fields: &[TestField]) {
    let bytes: Vec<u8> = fields.iter().flat_map(encode).collect();
    std::fs::write(path, bytes).unwrap();
}

/// Value of member `number`, lead `lead` (1-based), point `k` of a field.
pub type ValueFn = dyn Fn(u32, u16, u16, usize) -> f32;

/// Fields of one statistic for `members` x leads 1..=`leads` on
/// `small_grid()`. `f` receives `(year, number, lead, point)`.
pub fn seas5_fields(
    vname: &str,
    year: i32,
    month: u32,
    members: u16,
    leads: u16,
    mars_type: u8,
    f: &ValueFn,
) -> Vec<TestField> {
    let (table_version, parameter) = parameter_for(vname);
    let grid = small_grid();
    let npoints = usize::from(grid.ni) * usize::from(grid.nj);
    let decimal_scale = if vname == "pre" { 10 } else { 2 };

    let mut fields = Vec::new();
    for number in 0..members {
        for lead in 1..=leads {
            fields.push(TestField {
                table_version,
                parameter,
                mars_type,
                number,
                forecast_month: lead,
                year,
                month,
                grid: grid.clone(),
                decimal_scale,
                values: (0..npoints).map(|k| f(year as u32, number, lead, k)).collect(),
            });
        }
    }
    fields
}

pub fn seas5_path(dir: &Path, vname: &str, year: i32, month: u32) -> PathBuf {
    dir.join(format!("{vname}_{year}_{month:02}.grib"))
}

/// Write `{vname}_{year}_{month:02}.grib` under `dir` with fcmean and
/// fcstdev fields for the same members and leads.
pub fn write_seas5_file(
    dir: &Path,
    vname: &str,
    year: i32,
    month: u32,
    members: u16,
    leads: u16,
    mean: &ValueFn,
    stdev: &ValueFn,
) -> PathBuf {
    let mut fields = seas5_fields(vname, year, month, members, leads, MARS_FCMEAN, mean);
    fields.extend(seas5_fields(vname, year, month, members, leads, MARS_FCSTDEV, stdev));

    let path = seas5_path(dir, vname, year, month);
    write_grib(&path, &fields);
    path
}
