//! Text and JSON rendering of a [`RecordView`].

use crate::pipeline::RecordView;
use crate::record::ConnectionRecord;

/// Column headers of the text table.
pub const COLUMN_HEADERS: [&str; 7] = [
    "Local Address",
    "Local Port",
    "Foreign Address",
    "Foreign Port",
    "State",
    "PID",
    "Actions",
];

/// Numeric columns are right-aligned.
const RIGHT_ALIGNED: [bool; 7] = [false, true, false, true, false, true, false];

/// Label shown in the Actions column for rows whose process can be killed.
pub const KILL_ACTION: &str = "kill";

fn cells(record: &ConnectionRecord) -> [String; 7] {
    [
        record.local_address.clone(),
        record.local_port.to_string(),
        record.foreign_address.clone(),
        record.foreign_port.clone(),
        record.state.to_string(),
        record.pid.clone(),
        if record.is_killable() {
            KILL_ACTION.to_string()
        } else {
            String::new()
        },
    ]
}

/// Render the view as an aligned text table followed by a `Count:` line.
pub fn render_table(view: &RecordView<'_>) -> String {
    let rows: Vec<[String; 7]> = view.iter().map(cells).collect();

    let mut widths = COLUMN_HEADERS.map(str::len);
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row.iter()) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut output = String::with_capacity(128 * (rows.len() + 2));
    let header = COLUMN_HEADERS.map(str::to_string);
    for row in std::iter::once(&header).chain(rows.iter()) {
        let mut line = String::new();
        for (i, cell) in row.iter().enumerate() {
            if i > 0 {
                line.push_str("  ");
            }
            if RIGHT_ALIGNED[i] {
                line.push_str(&format!("{:>width$}", cell, width = widths[i]));
            } else {
                line.push_str(&format!("{:<width$}", cell, width = widths[i]));
            }
        }
        output.push_str(line.trim_end());
        output.push('\n');
    }

    output.push_str(&format!("Count: {}\n", view.count));
    output
}

/// Render the view as pretty-printed JSON: `{"count": N, "records": [...]}`.
pub fn render_json(view: &RecordView<'_>) -> serde_json::Result<String> {
    serde_json::to_string_pretty(view)
}
