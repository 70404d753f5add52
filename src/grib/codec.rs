//! GRIB edition 1 message decoding: regular lat/lon grids with simple
//! grid-point packing, plus the ECMWF local extension of the PDS.

use crate::error::{Result, Seas5Error};
use crate::grib::tables;
use chrono::{Datelike, Duration, Months, NaiveDate, NaiveDateTime};

const ECMWF_CENTRE: u8 = 98;
const END_MARKER: &[u8; 4] = b"7777";

/// ECMWF local section (PDS octets 41 onwards)
#[derive(Debug, Clone, PartialEq)]
pub struct LocalSection {
    pub definition: u8,
    pub class: u8,
    pub mars_type: u8,
    pub stream: u16,
    pub experiment: String,
    pub number: Option<u16>,
    pub forecast_month: Option<u16>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    pub ni: usize,
    pub nj: usize,
    pub la1: f64,
    pub lo1: f64,
    pub la2: f64,
    pub lo2: f64,
    pub scanning_mode: u8,
}

impl Grid {
    /// Row latitudes, first row first
    pub fn latitudes(&self) -> Vec<f64> {
        linspace(self.la1, self.la2, self.nj)
    }

    /// Column longitudes, first column first
    pub fn longitudes(&self) -> Vec<f64> {
        let mut lo2 = self.lo2;
        if self.scanning_mode & 0x80 == 0 {
            if lo2 < self.lo1 {
                lo2 += 360.0;
            }
        } else if lo2 > self.lo1 {
            lo2 -= 360.0;
        }
        linspace(self.lo1, lo2, self.ni)
    }
}

fn linspace(first: f64, last: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![first],
        _ => {
            let step = (last - first) / (n - 1) as f64;
            // round to microdegrees to drop float noise
            (0..n)
                .map(|k| ((first + step * k as f64) * 1e6).round() / 1e6)
                .collect()
        }
    }
}

/// One decoded GRIB1 message
#[derive(Debug, Clone)]
pub struct Message {
    pub table_version: u8,
    pub centre: u8,
    pub parameter: u8,
    pub level_type: u8,
    pub level: u16,
    pub reference_time: NaiveDateTime,
    pub time_unit: u8,
    pub p1: u8,
    pub p2: u8,
    pub time_range_indicator: u8,
    pub local: Option<LocalSection>,
    pub grid: Grid,
    /// Row-major `[nj][ni]`, rows ordered as `grid.latitudes()`; missing points are NaN
    pub values: Vec<f32>,
}

impl Message {
    pub fn short_name(&self) -> String {
        tables::short_name(self.table_version, self.parameter)
    }

    pub fn data_type(&self) -> &'static str {
        match &self.local {
            Some(local) => tables::data_type(local.mars_type),
            None => "unknown",
        }
    }

    /// Ensemble member; 0 when the message carries none
    pub fn number(&self) -> u16 {
        self.local.as_ref().and_then(|l| l.number).unwrap_or(0)
    }

    /// Start of the period the message is valid for. Seasonal monthly
    /// products carry a forecast month counted from the initialisation month;
    /// everything else is offset by P1.
    pub fn valid_time(&self) -> Result<NaiveDateTime> {
        if let Some(month) = self.local.as_ref().and_then(|l| l.forecast_month) {
            let reference = self.reference_time.date();
            return NaiveDate::from_ymd_opt(reference.year(), reference.month(), 1)
                .and_then(|first| {
                    first.checked_add_months(Months::new(u32::from(month.saturating_sub(1))))
                })
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .ok_or_else(|| Seas5Error::Grib(format!("forecast month {month} out of range")));
        }
        let p1 = i64::from(self.p1);
        let offset = match self.time_unit {
            0 => Duration::minutes(p1),
            1 => Duration::hours(p1),
            2 => Duration::days(p1),
            3 => {
                return self
                    .reference_time
                    .checked_add_months(Months::new(u32::from(self.p1)))
                    .ok_or_else(|| Seas5Error::Grib("month offset out of range".into()))
            }
            10 => Duration::hours(3 * p1),
            11 => Duration::hours(6 * p1),
            12 => Duration::hours(12 * p1),
            254 => Duration::seconds(p1),
            unit => return Err(Seas5Error::Grib(format!("unsupported time unit {unit}"))),
        };
        Ok(self.reference_time + offset)
    }
}

/// Split a buffer into messages and decode each one. Bytes between
/// messages are skipped.
pub fn decode_messages(bytes: &[u8]) -> Result<Vec<Message>> {
    let mut messages = Vec::new();
    let mut pos = 0;
    while let Some(start) = find_indicator(bytes, pos) {
        let header = bytes
            .get(start..start + 8)
            .ok_or_else(|| grib_err("truncated indicator section"))?;
        let edition = header[7];
        if edition != 1 {
            return Err(Seas5Error::Grib(format!("unsupported edition {edition}")));
        }
        let length = read_u24(&header[4..7]) as usize;
        let end = start + length;
        let message = bytes
            .get(start..end)
            .ok_or_else(|| grib_err("message extends past end of file"))?;
        messages.push(decode_message(message)?);
        pos = end;
    }
    Ok(messages)
}

fn find_indicator(bytes: &[u8], from: usize) -> Option<usize> {
    bytes
        .get(from..)?
        .windows(4)
        .position(|w| w == b"GRIB")
        .map(|p| p + from)
}

/// Decode one complete message starting at `GRIB` and ending with `7777`.
pub fn decode_message(msg: &[u8]) -> Result<Message> {
    if msg.len() < 12 || &msg[0..4] != b"GRIB" {
        return Err(grib_err("missing GRIB indicator"));
    }
    if &msg[msg.len() - 4..] != END_MARKER {
        return Err(grib_err("missing 7777 end marker"));
    }

    let pds = section(msg, 8)?;
    if pds.len() < 28 {
        return Err(grib_err("product definition section too short"));
    }
    let flag = pds[7];
    let has_gds = flag & 0x80 != 0;
    let has_bms = flag & 0x40 != 0;

    let century = i32::from(pds[24]);
    let year = (century - 1) * 100 + i32::from(pds[12]);
    let reference_time = NaiveDate::from_ymd_opt(year, u32::from(pds[13]), u32::from(pds[14]))
        .and_then(|d| d.and_hms_opt(u32::from(pds[15]), u32::from(pds[16]), 0))
        .ok_or_else(|| grib_err("invalid reference date"))?;
    let decimal_scale = read_i16_sm(&pds[26..28]);
    let centre = pds[4];
    let local = if centre == ECMWF_CENTRE && pds.len() > 44 {
        Some(decode_local(pds))
    } else {
        None
    };

    let mut offset = 8 + pds.len();
    if !has_gds {
        return Err(grib_err("messages without a grid description are not supported"));
    }
    let gds = section(msg, offset)?;
    let grid = decode_grid(gds)?;
    offset += gds.len();

    let npoints = grid.ni * grid.nj;
    let bitmap = if has_bms {
        let bms = section(msg, offset)?;
        offset += bms.len();
        if bms.len() < 6 || read_u16(&bms[4..6]) != 0 {
            return Err(grib_err("predefined bitmaps are not supported"));
        }
        Some(bms[6..].to_vec())
    } else {
        None
    };

    let bds = section(msg, offset)?;
    let scanned = decode_data(bds, npoints, bitmap.as_deref(), decimal_scale)?;
    let values = reorder(scanned, &grid);

    Ok(Message {
        table_version: pds[3],
        centre,
        parameter: pds[8],
        level_type: pds[9],
        level: read_u16(&pds[10..12]),
        reference_time,
        time_unit: pds[17],
        p1: pds[18],
        p2: pds[19],
        time_range_indicator: pds[20],
        local,
        grid,
        values,
    })
}

fn decode_local(pds: &[u8]) -> LocalSection {
    let definition = pds[40];
    let experiment = String::from_utf8_lossy(&pds[45..49.min(pds.len())]).trim().to_string();
    let (number, forecast_month) = match definition {
        1 if pds.len() > 49 => (Some(u16::from(pds[49])), None),
        16 if pds.len() >= 62 => (Some(read_u16(&pds[49..51])), Some(read_u16(&pds[60..62]))),
        _ => (None, None),
    };
    LocalSection {
        definition,
        class: pds[41],
        mars_type: pds[42],
        stream: read_u16(&pds[43..45]),
        experiment,
        number,
        forecast_month,
    }
}

fn decode_grid(gds: &[u8]) -> Result<Grid> {
    if gds.len() < 28 {
        return Err(grib_err("grid description section too short"));
    }
    let representation = gds[5];
    if representation != 0 {
        return Err(Seas5Error::Grib(format!(
            "unsupported grid representation {representation}, only regular lat/lon"
        )));
    }
    let ni = read_u16(&gds[6..8]);
    let nj = read_u16(&gds[8..10]);
    if ni == 0xFFFF || nj == 0xFFFF {
        return Err(grib_err("quasi-regular grids are not supported"));
    }
    Ok(Grid {
        ni: usize::from(ni),
        nj: usize::from(nj),
        la1: f64::from(read_i24_sm(&gds[10..13])) / 1000.0,
        lo1: f64::from(read_i24_sm(&gds[13..16])) / 1000.0,
        la2: f64::from(read_i24_sm(&gds[17..20])) / 1000.0,
        lo2: f64::from(read_i24_sm(&gds[20..23])) / 1000.0,
        scanning_mode: gds[27],
    })
}

fn decode_data(
    bds: &[u8],
    npoints: usize,
    bitmap: Option<&[u8]>,
    decimal_scale: i16,
) -> Result<Vec<f32>> {
    if bds.len() < 11 {
        return Err(grib_err("binary data section too short"));
    }
    let flag = bds[3];
    if flag & 0x80 != 0 {
        return Err(grib_err("spherical harmonic data is not supported"));
    }
    if flag & 0x40 != 0 {
        return Err(grib_err("complex packing is not supported"));
    }
    let binary_scale = read_i16_sm(&bds[4..6]);
    let reference = ibm_to_f64([bds[6], bds[7], bds[8], bds[9]]);
    let bits = usize::from(bds[10]);
    let data = &bds[11..];

    let two_e = 2f64.powi(i32::from(binary_scale));
    let ten_d = 10f64.powi(i32::from(decimal_scale));

    let mut values = Vec::with_capacity(npoints);
    let mut packed_index = 0usize;
    for point in 0..npoints {
        if let Some(bitmap) = bitmap {
            let byte = bitmap
                .get(point / 8)
                .ok_or_else(|| grib_err("bitmap shorter than grid"))?;
            if byte & (0x80 >> (point % 8)) == 0 {
                values.push(f32::NAN);
                continue;
            }
        }
        let x = if bits == 0 {
            0
        } else {
            read_bits(data, packed_index * bits, bits)
                .ok_or_else(|| grib_err("packed data shorter than grid"))?
        };
        packed_index += 1;
        values.push(((reference + x as f64 * two_e) / ten_d) as f32);
    }
    Ok(values)
}

/// Put column-major (`j` consecutive) scans into row-major order.
fn reorder(values: Vec<f32>, grid: &Grid) -> Vec<f32> {
    if grid.scanning_mode & 0x20 == 0 {
        return values;
    }
    let mut out = vec![f32::NAN; values.len()];
    for i in 0..grid.ni {
        for j in 0..grid.nj {
            out[j * grid.ni + i] = values[i * grid.nj + j];
        }
    }
    out
}

fn section(msg: &[u8], offset: usize) -> Result<&[u8]> {
    let head = msg
        .get(offset..offset + 3)
        .ok_or_else(|| grib_err("truncated section header"))?;
    let len = read_u24(head) as usize;
    if len < 3 {
        return Err(grib_err("invalid section length"));
    }
    msg.get(offset..offset + len)
        .ok_or_else(|| grib_err("section extends past end of message"))
}

fn grib_err(msg: &str) -> Seas5Error {
    Seas5Error::Grib(msg.to_string())
}

fn read_u16(b: &[u8]) -> u16 {
    u16::from_be_bytes([b[0], b[1]])
}

fn read_u24(b: &[u8]) -> u32 {
    u32::from_be_bytes([0, b[0], b[1], b[2]])
}

/// Sign-and-magnitude 16 bit integer
fn read_i16_sm(b: &[u8]) -> i16 {
    let v = read_u16(b);
    let magnitude = (v & 0x7FFF) as i16;
    if v & 0x8000 != 0 {
        -magnitude
    } else {
        magnitude
    }
}

/// Sign-and-magnitude 24 bit integer
fn read_i24_sm(b: &[u8]) -> i32 {
    let v = read_u24(b);
    let magnitude = (v & 0x7F_FFFF) as i32;
    if v & 0x80_0000 != 0 {
        -magnitude
    } else {
        magnitude
    }
}

/// IBM System/360 single precision float
pub fn ibm_to_f64(b: [u8; 4]) -> f64 {
    let sign = if b[0] & 0x80 != 0 { -1.0 } else { 1.0 };
    let exponent = i32::from(b[0] & 0x7F) - 64;
    let mantissa = f64::from(u32::from_be_bytes([0, b[1], b[2], b[3]])) / 16_777_216.0;
    sign * mantissa * 16f64.powi(exponent)
}

/// Read `nbits` big-endian bits starting at bit `start`.
fn read_bits(data: &[u8], start: usize, nbits: usize) -> Option<u64> {
    if nbits > 64 {
        return None;
    }
    let mut out: u64 = 0;
    for bit in start..start + nbits {
        let byte = *data.get(bit / 8)?;
        let set = (byte >> (7 - bit % 8)) & 1;
        out = (out << 1) | u64::from(set);
    }
    Some(out)
}
