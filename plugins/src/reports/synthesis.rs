//! Yosys `stat` output.

use lazy_static::lazy_static;
use regex::Regex;

use fabflow_core::report::{Alignment, ReportColumn, TableReport};

lazy_static! {
    static ref MODULE_HEADER: Regex = Regex::new(r"^=== (.+) ===$").expect("valid regex");
    static ref NUMBER_OF: Regex =
        Regex::new(r"^\s+Number of ([a-z ]+):\s+(\d+)").expect("valid regex");
    static ref CELL_TYPE: Regex = Regex::new(r"^\s{4,}(\S+)\s+(\d+)\s*$").expect("valid regex");
}

/// The last `=== module ===` block, which Yosys prints for the top module.
fn last_stat_block(log: &str) -> Option<Vec<&str>> {
    let lines: Vec<&str> = log.lines().collect();
    let start = lines.iter().rposition(|l| MODULE_HEADER.is_match(l.trim()))?;
    Some(lines[start + 1..].to_vec())
}

pub fn statistics(log: &str) -> TableReport {
    let mut table = TableReport::new(
        "",
        vec![
            ReportColumn::new("Statistic", Alignment::Left),
            ReportColumn::new("Value", Alignment::Right),
        ],
    );
    for line in last_stat_block(log).unwrap_or_default() {
        if let Some(caps) = NUMBER_OF.captures(line) {
            table.push_row([caps[1].trim(), &caps[2]]);
        }
    }
    table
}

/// Cell types listed under `Number of cells:`.
pub fn cell_usage(log: &str) -> TableReport {
    let mut table = TableReport::new(
        "",
        vec![
            ReportColumn::new("Cell", Alignment::Left),
            ReportColumn::new("Count", Alignment::Right),
        ],
    );
    let block = last_stat_block(log).unwrap_or_default();
    let cells = block
        .iter()
        .skip_while(|l| !l.trim_start().starts_with("Number of cells:"))
        .skip(1);
    for line in cells {
        match CELL_TYPE.captures(line) {
            Some(caps) => table.push_row([&caps[1], &caps[2]]),
            None => break,
        }
    }
    table
}

#[cfg(test)]
pub(crate) const SAMPLE_SYNTH_LOG: &str = "\
=== alu ===

   Number of wires:                  3
   Number of cells:                  1
     $lut                            1

=== counter ===

   Number of wires:                 10
   Number of wire bits:             40
   Number of public wires:           4
   Number of public wire bits:      34
   Number of memories:               0
   Number of memory bits:            0
   Number of processes:              0
   Number of cells:                 36
     $lut                           32
     dff                             4

End of script.
";

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn statistics_come_from_the_last_module() {
        let table = statistics(SAMPLE_SYNTH_LOG);
        assert_eq!(table.rows.len(), 8);
        assert_eq!(table.rows[0], vec!["wires", "10"]);
        assert_eq!(table.rows[7], vec!["cells", "36"]);
    }

    #[test]
    fn cell_usage_lists_cell_types() {
        let table = cell_usage(SAMPLE_SYNTH_LOG);
        assert_eq!(table.rows, vec![vec!["$lut", "32"], vec!["dff", "4"]]);
    }

    #[test]
    fn no_stat_block_no_rows() {
        assert!(statistics("yosys -s top.ys\n").is_empty());
        assert!(cell_usage("").is_empty());
    }
}
