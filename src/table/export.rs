//! Flat record export of design tables.

use std::io::Write;

use super::DesignTable;
use crate::error::Result;

const UNIT_COLUMN: &str = "unit_id";
const BLOCK_COLUMN: &str = "block";

impl DesignTable {
    fn has_units(&self) -> bool {
        self.unit_column.is_some() || self.runs.iter().any(|r| r.unit_id.is_some())
    }

    fn has_blocks(&self) -> bool {
        self.block_column.is_some() || self.runs.iter().any(|r| r.block.is_some())
    }

    fn has_replication(&self) -> bool {
        self.runs.iter().any(|r| r.replication.is_some())
    }

    fn has_point_types(&self) -> bool {
        self.runs.iter().any(|r| r.point_type.is_some())
    }

    /// Column names of the flat export, in order.
    ///
    /// Factor columns come first, then the unit and block columns when present,
    /// `replication` and `point_type` when present, `std_order`, `run_order` and
    /// finally the response columns.
    #[must_use]
    pub fn header(&self) -> Vec<String> {
        let mut header: Vec<String> = self.factors.iter().map(|f| f.name().to_string()).collect();
        if self.has_units() {
            header.push(self.unit_column.as_deref().unwrap_or(UNIT_COLUMN).to_string());
        }
        if self.has_blocks() {
            header.push(self.block_column.as_deref().unwrap_or(BLOCK_COLUMN).to_string());
        }
        if self.has_replication() {
            header.push("replication".to_string());
        }
        if self.has_point_types() {
            header.push("point_type".to_string());
        }
        header.push("std_order".to_string());
        header.push("run_order".to_string());
        header.extend(self.responses.iter().map(|r| r.name.clone()));
        header
    }

    /// Rows of the flat export, aligned with [`header`](Self::header).
    ///
    /// Unassigned levels and missing metadata render as empty fields.
    #[must_use]
    pub fn records(&self) -> Vec<Vec<String>> {
        let units = self.has_units();
        let blocks = self.has_blocks();
        let replication = self.has_replication();
        let point_types = self.has_point_types();

        self.runs
            .iter()
            .enumerate()
            .map(|(i, run)| {
                let mut record: Vec<String> = run.levels.iter().map(ToString::to_string).collect();
                if units {
                    record.push(run.unit_id.clone().unwrap_or_default());
                }
                if blocks {
                    record.push(run.block.clone().unwrap_or_default());
                }
                if replication {
                    record.push(run.replication.map(|r| r.to_string()).unwrap_or_default());
                }
                if point_types {
                    record.push(run.point_type.map(|p| p.to_string()).unwrap_or_default());
                }
                record.push(run.std_order.to_string());
                record.push(run.run_order.to_string());
                for response in &self.responses {
                    let value = response.values[i];
                    record.push(if value.is_nan() { String::new() } else { value.to_string() });
                }
                record
            })
            .collect()
    }

    /// Write the table as CSV with a header row.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Export`](crate::Error::Export) if writing fails.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut csv_writer = csv::Writer::from_writer(writer);
        csv_writer.write_record(self.header())?;
        for record in self.records() {
            csv_writer.write_record(&record)?;
        }
        csv_writer.flush().map_err(|err| crate::Error::Export {
            message: err.to_string(),
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::{DesignSummary, PointType};
    use super::*;
    use ndarray::array;

    fn rsm_table() -> DesignTable {
        let m = array![[1.0, 0.0], [0.0, 0.0]];
        DesignTable::from_matrix(
            &["x1".to_string(), "x2".to_string()],
            &m,
            Some(&[PointType::Axial, PointType::Center]),
            DesignSummary::new("rsm", 1),
        )
        .unwrap()
    }

    #[test]
    fn test_header_layout() {
        let table = rsm_table().with_response("yield", vec![1.5, f64::NAN]).unwrap();
        assert_eq!(
            table.header(),
            vec!["x1", "x2", "point_type", "std_order", "run_order", "yield"]
        );
        let records = table.records();
        assert_eq!(records[0], vec!["1", "0", "Axial", "1", "1", "1.5"]);
        assert_eq!(records[1][5], "");
    }

    #[test]
    fn test_write_csv() {
        let mut buf = Vec::new();
        rsm_table().write_csv(&mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("x1,x2,point_type,std_order,run_order"));
        assert_eq!(lines.next(), Some("1,0,Axial,1,1"));
        assert_eq!(lines.next(), Some("0,0,Center,2,2"));
        assert_eq!(lines.next(), None);
    }
}
