//! Binary cache for the field model tables.
//!
//! Building the tables takes a noticeable fraction of a second on robot
//! hardware, so they are computed once and cached on disk, keyed by a
//! fingerprint of the field geometry. A stale or foreign cache is rejected
//! and the caller rebuilds.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use crate::core::types::pose::Point2D;
use crate::error::{LocError, Result};

use super::goal_net::{GoalNetTable, NET_SECTORS};
use super::tables::{ClosestPointTable, FieldModel};

const CACHE_MAGIC: u32 = 0x4D4C_464D; // "MLFM"
const CACHE_VERSION: u32 = 1;

/// Save the field model and goal-net table to a binary cache file.
pub fn save<P: AsRef<Path>>(
    path: P,
    geometry_key: u64,
    model: &FieldModel,
    goal_net: &GoalNetTable,
) -> Result<()> {
    let file = File::create(path)?;
    let mut w = BufWriter::new(file);

    write_u32(&mut w, CACHE_MAGIC)?;
    write_u32(&mut w, CACHE_VERSION)?;
    w.write_all(&geometry_key.to_le_bytes())?;
    w.write_all(&model.max_crossing_length().to_le_bytes())?;

    for table in model.tables() {
        write_table(&mut w, table)?;
    }

    let x_corners = model.x_corner_list();
    write_u32(&mut w, x_corners.len() as u32)?;
    for c in x_corners {
        w.write_all(&c.x.to_le_bytes())?;
        w.write_all(&c.y.to_le_bytes())?;
    }

    let (nx, ny, _) = goal_net.dimensions();
    write_u32(&mut w, nx as u32)?;
    write_u32(&mut w, ny as u32)?;
    write_u32(&mut w, NET_SECTORS as u32)?;
    for v in goal_net.raw() {
        w.write_all(&v.to_le_bytes())?;
    }

    w.flush()?;
    Ok(())
}

/// Load the field model and goal-net table from a binary cache file.
///
/// Fails when the file is missing, was written by a different version, or
/// belongs to a different field geometry.
pub fn load<P: AsRef<Path>>(path: P, geometry_key: u64) -> Result<(FieldModel, GoalNetTable)> {
    let file = File::open(path)?;
    let mut r = BufReader::new(file);

    if read_u32(&mut r)? != CACHE_MAGIC {
        return Err(LocError::Cache("bad magic number".into()));
    }
    let version = read_u32(&mut r)?;
    if version != CACHE_VERSION {
        return Err(LocError::Cache(format!("unsupported version {}", version)));
    }
    let mut key_bytes = [0u8; 8];
    r.read_exact(&mut key_bytes)?;
    if u64::from_le_bytes(key_bytes) != geometry_key {
        return Err(LocError::Cache("geometry key mismatch".into()));
    }
    let max_crossing_length = read_f32(&mut r)?;

    let mut tables = Vec::with_capacity(12);
    for _ in 0..12 {
        tables.push(read_table(&mut r)?);
    }
    // Reassemble in the order written by `FieldModel::tables`.
    let mut it = tables.into_iter();
    let mut next = || it.next().expect("twelve tables were just read");
    let line_tables = [[next(), next()], [next(), next()]];
    let t_corner_tables = [next(), next(), next(), next()];
    let l_corner_tables = [next(), next(), next(), next()];

    let n_x = read_u32(&mut r)? as usize;
    if n_x > 64 {
        return Err(LocError::Cache(format!("implausible X corner count {}", n_x)));
    }
    let mut x_corners = Vec::with_capacity(n_x);
    for _ in 0..n_x {
        let x = read_f32(&mut r)?;
        let y = read_f32(&mut r)?;
        x_corners.push(Point2D::new(x, y));
    }

    let nx = read_u32(&mut r)? as usize;
    let ny = read_u32(&mut r)? as usize;
    let sectors = read_u32(&mut r)? as usize;
    if sectors != NET_SECTORS {
        return Err(LocError::Cache(format!(
            "goal net sector count {} does not match {}",
            sectors, NET_SECTORS
        )));
    }
    let mut net_data = vec![0i16; nx * ny * sectors];
    read_i16s(&mut r, &mut net_data)?;

    let model = FieldModel::from_parts(
        line_tables,
        t_corner_tables,
        l_corner_tables,
        x_corners,
        max_crossing_length,
    );
    let goal_net = GoalNetTable::from_raw(nx, ny, net_data);
    Ok((model, goal_net))
}

fn write_table<W: Write>(w: &mut W, table: &ClosestPointTable) -> Result<()> {
    let (x_size, y_size) = table.dimensions();
    write_u32(w, x_size as u32)?;
    write_u32(w, y_size as u32)?;
    for [x, y] in table.raw() {
        w.write_all(&x.to_le_bytes())?;
        w.write_all(&y.to_le_bytes())?;
    }
    Ok(())
}

fn read_table<R: Read>(r: &mut R) -> Result<ClosestPointTable> {
    let x_size = read_u32(r)? as usize;
    let y_size = read_u32(r)? as usize;
    if x_size == 0 || y_size == 0 || x_size * y_size > 4_000_000 {
        return Err(LocError::Cache(format!(
            "implausible table size {}x{}",
            x_size, y_size
        )));
    }
    let mut flat = vec![0i16; x_size * y_size * 2];
    read_i16s(r, &mut flat)?;
    let points = flat
        .chunks_exact(2)
        .map(|c| [c[0], c[1]])
        .collect::<Vec<_>>();
    Ok(ClosestPointTable::from_raw(x_size, y_size, points))
}

fn write_u32<W: Write>(w: &mut W, v: u32) -> Result<()> {
    w.write_all(&v.to_le_bytes())?;
    Ok(())
}

fn read_u32<R: Read>(r: &mut R) -> Result<u32> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

fn read_f32<R: Read>(r: &mut R) -> Result<f32> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(f32::from_le_bytes(buf))
}

fn read_i16s<R: Read>(r: &mut R, out: &mut [i16]) -> Result<()> {
    let mut buf = vec![0u8; out.len() * 2];
    r.read_exact(&mut buf)?;
    for (i, chunk) in buf.chunks_exact(2).enumerate() {
        out[i] = i16::from_le_bytes([chunk[0], chunk[1]]);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::field::{FieldDimensions, FieldGeometry};
    use crate::core::types::IntersectionKind;

    #[test]
    fn test_cache_roundtrip_preserves_answers() {
        let field = FieldDimensions::default();
        let model = FieldModel::build(&field, 300.0);
        let goal_net = GoalNetTable::build(&field);
        let key = field.geometry_key();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("field_model.tab");
        save(&path, key, &model, &goal_net).unwrap();
        let (loaded_model, loaded_net) = load(&path, key).unwrap();

        // A fixed probe set must answer identically.
        let probes = [
            (Point2D::new(500.0, 1900.0), Point2D::new(900.0, 1900.0)),
            (Point2D::new(100.0, 500.0), Point2D::new(100.0, 900.0)),
            (Point2D::new(-2500.0, -1000.0), Point2D::new(-2500.0, -600.0)),
            (Point2D::new(650.0, 50.0), Point2D::new(650.0, 250.0)),
        ];
        for (p, n) in probes {
            for len_sq in [150.0f32 * 150.0, 800.0 * 800.0] {
                assert_eq!(
                    model.closest_line_point(&p, &n, len_sq),
                    loaded_model.closest_line_point(&p, &n, len_sq)
                );
            }
            for kind in [IntersectionKind::X, IntersectionKind::T, IntersectionKind::L] {
                assert_eq!(
                    model.closest_corner(&p, kind, 0.3),
                    loaded_model.closest_corner(&p, kind, 0.3)
                );
            }
        }
        assert_eq!(goal_net, loaded_net);
    }

    #[test]
    fn test_cache_rejects_other_geometry() {
        let field = FieldDimensions::default();
        let model = FieldModel::build(&field, 300.0);
        let goal_net = GoalNetTable::build(&field);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("field_model.tab");
        save(&path, field.geometry_key(), &model, &goal_net).unwrap();

        let mut other = FieldGeometry::default();
        other.field_length += 1000.0;
        let err = load(&path, other.geometry_key());
        assert!(err.is_err(), "cache for another field must be rejected");
    }

    #[test]
    fn test_cache_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("garbage.tab");
        std::fs::write(&path, b"not a field model").unwrap();
        assert!(load(&path, 0).is_err());
    }
}
