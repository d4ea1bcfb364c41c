// CSV export: one row per tick, columns flattened per target
use crate::error::ExportError;
use crate::models::time_label;
use crate::monitor::HistorySnapshot;

const COLUMN_SUFFIXES: [&str; 7] = [
    "CPU(%)",
    "Memory(MB)",
    "Network(Mbps)",
    "Disk(MB/s)",
    "GPU(%)",
    "PID",
    "User",
];

pub fn to_csv(snapshot: &HistorySnapshot) -> Result<String, ExportError> {
    if snapshot.is_empty() {
        return Err(ExportError::NoData);
    }

    let mut out = String::new();

    let mut header = vec!["Time".to_string()];
    for name in snapshot.target_names() {
        header.extend(COLUMN_SUFFIXES.iter().map(|suffix| format!("{}_{}", name, suffix)));
    }
    push_row(&mut out, &header);

    for i in 0..snapshot.len() {
        let Some((timestamp, samples)) = snapshot.tick(i) else {
            continue;
        };
        let mut row = vec![time_label(&timestamp)];
        for (_, sample) in samples {
            row.push(sample.cpu.to_string());
            row.push(sample.memory.to_string());
            row.push(sample.network.to_string());
            row.push(sample.disk.to_string());
            row.push(sample.gpu.to_string());
            row.push(sample.pid.map(|pid| pid.to_string()).unwrap_or_default());
            row.push(sample.username.clone());
        }
        push_row(&mut out, &row);
    }

    Ok(out)
}

fn push_row(out: &mut String, cells: &[String]) {
    let line: Vec<String> = cells.iter().map(|cell| escape(cell)).collect();
    out.push_str(&line.join(","));
    out.push_str("\r\n");
}

/// Quote cells containing separators, quotes or line breaks
fn escape(cell: &str) -> String {
    if cell.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", cell.replace('"', "\"\""))
    } else {
        cell.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::test_support::sample_snapshot;

    #[test]
    fn test_csv_header_and_rows() {
        let csv = to_csv(&sample_snapshot()).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(
            lines[0],
            "Time,app_CPU(%),app_Memory(MB),app_Network(Mbps),app_Disk(MB/s),app_GPU(%),app_PID,app_User,\
System_CPU(%),System_Memory(MB),System_Network(Mbps),System_Disk(MB/s),System_GPU(%),System_PID,System_User"
        );
        assert_eq!(lines[1], "09:30:00,12.5,256,0.5,1.25,40,7,alice,5,0,0,0,0,,alice");
    }

    #[test]
    fn test_escape() {
        assert_eq!(escape("plain"), "plain");
        assert_eq!(escape("a,b"), "\"a,b\"");
        assert_eq!(escape("say \"hi\""), "\"say \"\"hi\"\"\"");
    }
}
