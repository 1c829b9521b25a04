//! CSV exports for spreadsheet tools: UTF-8 with a byte-order mark.

use crate::data::Breakdown;
use crate::error::Result;
use crate::types::Entity;
use std::io::Write;

const BOM: &[u8] = b"\xEF\xBB\xBF";

fn writer<W: Write>(mut out: W) -> Result<csv::Writer<W>> {
    out.write_all(BOM)?;
    Ok(csv::WriterBuilder::new().from_writer(out))
}

fn tons(value: f64) -> String {
    format!("{}", value.floor() as i64)
}

/// Every processing type per district, values floored to whole tons
pub fn write_breakdown<W: Write>(out: W, rows: &[Breakdown]) -> Result<()> {
    let mut w = writer(out)?;
    w.write_record(["시군구", "총계(톤)", "자가처리(톤)", "위탁처리(톤)", "공공처리(톤)"])?;
    for row in rows {
        w.write_record([
            row.name.clone(),
            tons(row.total),
            tons(row.self_treated),
            tons(row.consigned),
            tons(row.public),
        ])?;
    }
    w.flush()?;
    Ok(())
}

/// One value per region for a single processing type
pub fn write_regions<W: Write>(out: W, rows: &[(String, f64)]) -> Result<()> {
    let mut w = writer(out)?;
    w.write_record(["지역", "폐기물량(톤)"])?;
    for (name, value) in rows {
        w.write_record([name.clone(), tons(*value)])?;
    }
    w.flush()?;
    Ok(())
}

pub fn write_entities<W: Write>(out: W, entities: &[Entity]) -> Result<()> {
    let mut w = writer(out)?;
    w.write_record(["업체명", "대표자", "연락처", "폐기물", "위도", "경도"])?;
    for e in entities {
        w.write_record([
            e.name.clone(),
            e.representative.clone(),
            e.phone.clone(),
            e.waste_type.clone(),
            e.coordinate.lat.to_string(),
            e.coordinate.lng.to_string(),
        ])?;
    }
    w.flush()?;
    Ok(())
}
