//! Length-prefixed primitives shared by every binary reader/writer.
use crate::error::DeserializeError;
use bytemuck::cast_slice;
use rustc_hash::FxHashMap;
use std::io::{Read, Write};

pub fn write_u32(out: &mut Vec<u8>, v: u32) {
    out.extend_from_slice(&v.to_le_bytes());
}
pub fn write_u64(out: &mut Vec<u8>, v: u64) {
    out.extend_from_slice(&v.to_le_bytes());
}
pub fn write_i32(out: &mut Vec<u8>, v: i32) {
    out.extend_from_slice(&v.to_le_bytes());
}
pub fn write_i64(out: &mut Vec<u8>, v: i64) {
    out.extend_from_slice(&v.to_le_bytes());
}
pub fn write_f64(out: &mut Vec<u8>, v: f64) {
    out.extend_from_slice(&v.to_le_bytes());
}
pub fn write_bool(out: &mut Vec<u8>, v: bool) {
    out.push(v as u8);
}

pub fn write_string(out: &mut Vec<u8>, s: &str) {
    write_u32(out, s.len() as u32);
    out.extend_from_slice(s.as_bytes());
}

pub fn write_f64_vec(out: &mut Vec<u8>, v: &[f64]) {
    write_u32(out, v.len() as u32);
    out.extend_from_slice(cast_slice::<f64, u8>(v));
}

pub fn write_i64_vec(out: &mut Vec<u8>, v: &[i64]) {
    write_u32(out, v.len() as u32);
    for x in v {
        write_i64(out, *x);
    }
}

pub fn write_string_f64_map(out: &mut Vec<u8>, map: &FxHashMap<String, f64>) {
    write_u32(out, map.len() as u32);
    let mut keys: Vec<&String> = map.keys().collect();
    keys.sort();
    for key in keys {
        write_string(out, key);
        write_f64(out, map[key]);
    }
}

pub struct Reader<'a> {
    cursor: std::io::Cursor<&'a [u8]>,
}

impl<'a> Reader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self {
            cursor: std::io::Cursor::new(bytes),
        }
    }

    fn fill(&mut self, buf: &mut [u8], what: &str) -> Result<(), DeserializeError> {
        self.cursor
            .read_exact(buf)
            .map_err(|_| DeserializeError(format!("truncated stream reading {what}")))
    }

    pub fn read_u32(&mut self) -> Result<u32, DeserializeError> {
        let mut buf = [0u8; 4];
        self.fill(&mut buf, "u32")?;
        Ok(u32::from_le_bytes(buf))
    }
    pub fn read_u64(&mut self) -> Result<u64, DeserializeError> {
        let mut buf = [0u8; 8];
        self.fill(&mut buf, "u64")?;
        Ok(u64::from_le_bytes(buf))
    }
    pub fn read_i32(&mut self) -> Result<i32, DeserializeError> {
        let mut buf = [0u8; 4];
        self.fill(&mut buf, "i32")?;
        Ok(i32::from_le_bytes(buf))
    }
    pub fn read_i64(&mut self) -> Result<i64, DeserializeError> {
        let mut buf = [0u8; 8];
        self.fill(&mut buf, "i64")?;
        Ok(i64::from_le_bytes(buf))
    }
    pub fn read_f64(&mut self) -> Result<f64, DeserializeError> {
        let mut buf = [0u8; 8];
        self.fill(&mut buf, "f64")?;
        Ok(f64::from_le_bytes(buf))
    }
    pub fn read_bool(&mut self) -> Result<bool, DeserializeError> {
        let mut buf = [0u8; 1];
        self.fill(&mut buf, "bool")?;
        Ok(buf[0] != 0)
    }

    pub fn read_string(&mut self) -> Result<String, DeserializeError> {
        let len = self.read_u32()? as usize;
        let mut buf = vec![0u8; len];
        self.fill(&mut buf, "string")?;
        String::from_utf8(buf).map_err(|_| DeserializeError("string is not valid utf-8".into()))
    }

    pub fn read_f64_vec(&mut self) -> Result<Vec<f64>, DeserializeError> {
        let len = self.read_u32()? as usize;
        let mut buf = vec![0u8; len * std::mem::size_of::<f64>()];
        self.fill(&mut buf, "f64 vec")?;
        Ok(cast_slice::<u8, f64>(&buf).to_vec())
    }

    pub fn read_i64_vec(&mut self) -> Result<Vec<i64>, DeserializeError> {
        let len = self.read_u32()? as usize;
        (0..len).map(|_| self.read_i64()).collect()
    }

    pub fn read_string_f64_map(&mut self) -> Result<FxHashMap<String, f64>, DeserializeError> {
        let len = self.read_u32()? as usize;
        let mut map = FxHashMap::default();
        for _ in 0..len {
            let key = self.read_string()?;
            let value = self.read_f64()?;
            map.insert(key, value);
        }
        Ok(map)
    }
}

pub fn flush_to_writer<W: Write>(writer: &mut W, bytes: &[u8]) -> std::io::Result<()> {
    writer.write_all(bytes)
}
