use crate::error::{Result, Seas5Error};
use chrono::NaiveDateTime;
use ndarray::{s, Array4};

pub const DIMENSIONS: [&str; 4] = ["number", "time", "latitude", "longitude"];

/// A labelled `[number, time, latitude, longitude]` array.
#[derive(Debug, Clone)]
pub struct Cube {
    pub name: String,
    pub units: String,
    pub numbers: Vec<u16>,
    pub times: Vec<NaiveDateTime>,
    pub latitudes: Vec<f64>,
    pub longitudes: Vec<f64>,
    pub values: Array4<f32>,
}

impl Cube {
    pub fn shape(&self) -> [usize; 4] {
        [
            self.numbers.len(),
            self.times.len(),
            self.latitudes.len(),
            self.longitudes.len(),
        ]
    }

    /// Stack cubes along `time` in the order given. Member axes are
    /// outer-joined with NaN for members a cube lacks; the horizontal grids
    /// must be identical.
    pub fn concat_time(cubes: &[Cube]) -> Result<Cube> {
        let first = cubes
            .first()
            .ok_or_else(|| Seas5Error::NoData("nothing to concatenate".into()))?;

        for cube in &cubes[1..] {
            if cube.latitudes != first.latitudes || cube.longitudes != first.longitudes {
                return Err(Seas5Error::GridMismatch(format!(
                    "{} latitudes x {} longitudes cannot be stacked with {} x {}",
                    cube.latitudes.len(),
                    cube.longitudes.len(),
                    first.latitudes.len(),
                    first.longitudes.len()
                )));
            }
        }

        let mut numbers: Vec<u16> = cubes.iter().flat_map(|c| c.numbers.iter().copied()).collect();
        numbers.sort_unstable();
        numbers.dedup();
        let times: Vec<NaiveDateTime> = cubes.iter().flat_map(|c| c.times.iter().copied()).collect();

        let (nlat, nlon) = (first.latitudes.len(), first.longitudes.len());
        let mut values = Array4::<f32>::from_elem((numbers.len(), times.len(), nlat, nlon), f32::NAN);

        let mut t0 = 0;
        for cube in cubes {
            let nt = cube.times.len();
            for (k, number) in cube.numbers.iter().enumerate() {
                let n = numbers.binary_search(number).unwrap_or_default();
                values
                    .slice_mut(s![n, t0..t0 + nt, .., ..])
                    .assign(&cube.values.slice(s![k, .., .., ..]));
            }
            t0 += nt;
        }

        Ok(Cube {
            name: first.name.clone(),
            units: first.units.clone(),
            numbers,
            times,
            latitudes: first.latitudes.clone(),
            longitudes: first.longitudes.clone(),
            values,
        })
    }

    /// Place this cube on `numbers` x `times`, both supersets of its own
    /// labels, with NaN where it has no data.
    pub fn reindex(&self, numbers: &[u16], times: &[NaiveDateTime]) -> Result<Cube> {
        let (nlat, nlon) = (self.latitudes.len(), self.longitudes.len());
        let mut values = Array4::<f32>::from_elem((numbers.len(), times.len(), nlat, nlon), f32::NAN);

        for (k, number) in self.numbers.iter().enumerate() {
            let n = numbers
                .iter()
                .position(|x| x == number)
                .ok_or_else(|| Seas5Error::GridMismatch(format!("member {number} missing from target axis")))?;
            for (j, time) in self.times.iter().enumerate() {
                let t = times
                    .iter()
                    .position(|x| x == time)
                    .ok_or_else(|| Seas5Error::GridMismatch(format!("time {time} missing from target axis")))?;
                values
                    .slice_mut(s![n, t, .., ..])
                    .assign(&self.values.slice(s![k, j, .., ..]));
            }
        }

        Ok(Cube {
            name: self.name.clone(),
            units: self.units.clone(),
            numbers: numbers.to_vec(),
            times: times.to_vec(),
            latitudes: self.latitudes.clone(),
            longitudes: self.longitudes.clone(),
            values,
        })
    }

    /// Outer-join two cubes on `number` and `time` so they share both axes.
    /// The horizontal grids must be identical.
    pub fn align(a: &Cube, b: &Cube) -> Result<(Cube, Cube)> {
        if a.latitudes != b.latitudes || a.longitudes != b.longitudes {
            return Err(Seas5Error::GridMismatch(format!(
                "{} is on a {}x{} grid, {} on {}x{}",
                a.name,
                a.latitudes.len(),
                a.longitudes.len(),
                b.name,
                b.latitudes.len(),
                b.longitudes.len()
            )));
        }
        if a.numbers == b.numbers && a.times == b.times {
            return Ok((a.clone(), b.clone()));
        }

        let mut numbers: Vec<u16> = a.numbers.iter().chain(&b.numbers).copied().collect();
        numbers.sort_unstable();
        numbers.dedup();
        let mut times: Vec<NaiveDateTime> = a.times.iter().chain(&b.times).copied().collect();
        times.sort_unstable();
        times.dedup();

        Ok((a.reindex(&numbers, &times)?, b.reindex(&numbers, &times)?))
    }
}
