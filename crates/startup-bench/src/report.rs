//! Summary statistics and the result table.

/// Min/mean/max over one measurement column.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Summary {
    pub min: f64,
    pub mean: f64,
    pub max: f64,
}

pub fn summarize(samples: &[f64]) -> Option<Summary> {
    if samples.is_empty() {
        return None;
    }
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    let mut sum = 0.0;
    for &sample in samples {
        min = min.min(sample);
        max = max.max(sample);
        sum += sample;
    }
    Some(Summary {
        min,
        mean: sum / samples.len() as f64,
        max,
    })
}

pub fn format_millis(summary: Option<Summary>) -> String {
    match summary {
        Some(s) => format!("{:.1} [{:.1}..{:.1}]", s.mean, s.min, s.max),
        None => "-".to_string(),
    }
}

pub fn format_bytes(bytes: Option<u64>) -> String {
    match bytes {
        Some(b) if b >= 1024 * 1024 => format!("{:.1} MB", b as f64 / (1024.0 * 1024.0)),
        Some(b) if b >= 1024 => format!("{:.1} KB", b as f64 / 1024.0),
        Some(b) => format!("{b} B"),
        None => "-".to_string(),
    }
}

/// Renders an aligned text table with a header separator.
pub fn render_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let columns = headers.len();
    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate().take(columns) {
            widths[i] = widths[i].max(cell.len());
        }
    }

    let mut out = String::new();
    let render_row = |cells: Vec<&str>| -> String {
        let mut line = String::new();
        for (i, cell) in cells.iter().enumerate() {
            if i > 0 {
                line.push_str("  ");
            }
            line.push_str(&format!("{cell:<width$}", width = widths[i]));
        }
        line.trim_end().to_string()
    };

    out.push_str(&render_row(headers.to_vec()));
    out.push('\n');
    out.push_str(&"-".repeat(widths.iter().sum::<usize>() + 2 * (columns - 1)));
    out.push('\n');
    for row in rows {
        out.push_str(&render_row(row.iter().map(String::as_str).collect()));
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summarize_computes_min_mean_max() {
        let summary = summarize(&[4.0, 1.0, 7.0]).unwrap();
        assert_eq!(summary.min, 1.0);
        assert_eq!(summary.mean, 4.0);
        assert_eq!(summary.max, 7.0);
        assert!(summarize(&[]).is_none());
    }

    #[test]
    fn byte_counts_use_readable_units() {
        assert_eq!(format_bytes(Some(512)), "512 B");
        assert_eq!(format_bytes(Some(2048)), "2.0 KB");
        assert_eq!(format_bytes(Some(3 * 1024 * 1024)), "3.0 MB");
        assert_eq!(format_bytes(None), "-");
    }

    #[test]
    fn table_columns_are_aligned() {
        let table = render_table(
            &["App", "Startup (ms)"],
            &[
                vec!["hello-tcp".to_string(), "1.2 [1.0..1.5]".to_string()],
                vec!["todo-api-sqlite".to_string(), "9.8 [9.1..11.0]".to_string()],
            ],
        );
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines[0], "App              Startup (ms)");
        assert_eq!(lines[1], "-".repeat(32));
        assert_eq!(lines[2], "hello-tcp        1.2 [1.0..1.5]");
        assert_eq!(lines[3], "todo-api-sqlite  9.8 [9.1..11.0]");
    }
}
