//! CSV export of committed rows.

use std::io::Write;

use rusqlite::Connection;

use crate::error::StoreResult;
use crate::schema;

/// Header labels for the fixed columns.
const BASE_HEADERS: [&str; 4] = ["Name", "Fullpath", "Extension", "Size"];

/// Stream every row of the `files` table to `writer` as CSV.
///
/// The header is `Name,Fullpath,Extension,Size,tag_1..tag_K`; rows follow
/// in whatever order the store returns them. Returns the number of data rows.
pub fn export_csv<W: Write>(conn: &Connection, tag_count: usize, writer: W) -> StoreResult<u64> {
    let mut csv_writer = csv::Writer::from_writer(writer);

    let header = BASE_HEADERS
        .iter()
        .map(|h| h.to_string())
        .chain((1..=tag_count).map(schema::tag_column));
    csv_writer.write_record(header)?;

    let mut stmt = conn.prepare(&schema::select_sql(tag_count))?;
    let mut rows = stmt.query([])?;
    let column_count = schema::BASE_COLUMNS.len() + tag_count;
    let mut exported = 0u64;
    let mut fields: Vec<String> = Vec::with_capacity(column_count);

    while let Some(row) = rows.next()? {
        fields.clear();
        fields.push(row.get::<_, Option<String>>(0)?.unwrap_or_default());
        fields.push(row.get::<_, Option<String>>(1)?.unwrap_or_default());
        fields.push(row.get::<_, Option<String>>(2)?.unwrap_or_default());
        fields.push(row.get::<_, Option<i64>>(3)?.unwrap_or_default().to_string());
        for i in schema::BASE_COLUMNS.len()..column_count {
            fields.push(row.get::<_, Option<String>>(i)?.unwrap_or_default());
        }
        csv_writer.write_record(&fields)?;
        exported += 1;
    }

    csv_writer.flush()?;
    tracing::info!(rows = exported, "exported store to CSV");
    Ok(exported)
}
