use std::fmt::Write as _;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Alignment {
    #[default]
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportColumn {
    pub name: String,
    pub alignment: Alignment,
}

impl ReportColumn {
    pub fn new(name: impl Into<String>, alignment: Alignment) -> Self {
        Self {
            name: name.into(),
            alignment,
        }
    }
}

/// One named table: a header of columns and rows of cells.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct TableReport {
    pub name: String,
    pub columns: Vec<ReportColumn>,
    pub rows: Vec<Vec<String>>,
}

impl TableReport {
    pub fn new(name: impl Into<String>, columns: Vec<ReportColumn>) -> Self {
        Self {
            name: name.into(),
            columns,
            rows: Vec::new(),
        }
    }

    /// Appends a row, padding or truncating it to the column count.
    pub fn push_row<I, S>(&mut self, cells: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut row: Vec<String> = cells.into_iter().map(Into::into).collect();
        row.resize(self.columns.len(), String::new());
        self.rows.push(row);
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Plain-text rendering used by the command line.
    pub fn render_text(&self) -> String {
        let mut widths: Vec<usize> = self.columns.iter().map(|c| c.name.len()).collect();
        for row in &self.rows {
            for (w, cell) in widths.iter_mut().zip(row) {
                *w = (*w).max(cell.chars().count());
            }
        }

        let mut out = String::new();
        if !self.name.is_empty() {
            let _ = writeln!(out, "{}", self.name);
        }
        let header: Vec<String> = self.columns.iter().map(|c| c.name.clone()).collect();
        write_line(&mut out, &self.columns, &widths, &header);
        let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
        let _ = writeln!(out, "{}", rule.join("  "));
        for row in &self.rows {
            write_line(&mut out, &self.columns, &widths, row);
        }
        out
    }
}

fn write_line(out: &mut String, columns: &[ReportColumn], widths: &[usize], cells: &[String]) {
    let parts: Vec<String> = cells
        .iter()
        .zip(columns)
        .zip(widths)
        .map(|((cell, col), w)| match col.alignment {
            Alignment::Left => format!("{cell:<w$}"),
            Alignment::Center => format!("{cell:^w$}"),
            Alignment::Right => format!("{cell:>w$}"),
        })
        .collect();
    let _ = writeln!(out, "{}", parts.join("  ").trim_end());
}

/// Everything one report id produced for a stage.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct TaskReport {
    pub name: String,
    pub tables: Vec<TableReport>,
}

impl TaskReport {
    pub fn render_text(&self) -> String {
        let mut out = format!("== {} ==\n", self.name);
        for table in &self.tables {
            out.push('\n');
            out.push_str(&table.render_text());
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utilization() -> TableReport {
        let mut t = TableReport::new(
            "Resource usage",
            vec![
                ReportColumn::new("Resource", Alignment::Left),
                ReportColumn::new("Used", Alignment::Right),
            ],
        );
        t.push_row(["LUT", "1024"]);
        t.push_row(["DFF"]);
        t
    }

    #[test]
    fn rows_are_padded_to_columns() {
        let t = utilization();
        assert_eq!(t.rows[1], vec!["DFF".to_string(), String::new()]);
    }

    #[test]
    fn text_rendering_aligns_columns() {
        let text = utilization().render_text();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Resource usage");
        assert_eq!(lines[1], "Resource  Used");
        assert_eq!(lines[2], "--------  ----");
        assert_eq!(lines[3], "LUT       1024");
        assert_eq!(lines[4], "DFF");
    }
}
