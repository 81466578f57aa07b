//! Run statistics
//!
//! Collected by the orchestrator and rendered as two plain-text tables:
//! bindings per category and time per stage.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use serde::Serialize;
use weave_codegen::CategoryCount;
use weave_core::Category;

#[derive(Debug, Clone, Default, Serialize)]
pub struct RunStats {
    pub timestamp: String,
    pub fetch: Duration,
    pub parse: Duration,
    pub generate: Duration,
    pub binding_list: Duration,
    pub emit: Duration,
    pub modules: usize,
    pub symbols: usize,
    pub generic_impls: usize,
    pub by_category: BTreeMap<Category, CategoryCount>,
    pub written: usize,
    pub total: usize,
    pub warnings: usize,
}

impl RunStats {
    pub fn new() -> Self {
        Self {
            timestamp: chrono::Utc::now().to_rfc3339(),
            ..Self::default()
        }
    }

    /// Time spent after fetching.
    pub fn generation_time(&self) -> Duration {
        self.parse + self.generate + self.binding_list + self.emit
    }
}

#[derive(Clone, Copy)]
enum Align {
    Left,
    Center,
    Right,
}

fn pad(text: &str, width: usize, align: Align) -> String {
    let fill = width.saturating_sub(text.chars().count());
    let (left, right) = match align {
        Align::Left => (0, fill),
        Align::Right => (fill, 0),
        Align::Center => (fill / 2, fill - fill / 2),
    };
    format!("{}{}{}", " ".repeat(left), text, " ".repeat(right))
}

/// Renders a table with side borders and a header separator.
fn render_table(header: &[&str], rows: &[Vec<String>], align: &[Align]) -> String {
    let mut widths: Vec<usize> = header.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            widths[i] = widths[i].max(cell.chars().count());
        }
    }

    let line = |cells: Vec<String>| {
        let inner: Vec<String> = cells
            .iter()
            .enumerate()
            .map(|(i, c)| format!(" {} ", pad(c, widths[i], align[i])))
            .collect();
        format!("|{}|\n", inner.join("|"))
    };

    let mut out = line(
        header
            .iter()
            .enumerate()
            .map(|(i, h)| pad(h, widths[i], Align::Center))
            .collect(),
    );
    let sep: Vec<String> = widths.iter().map(|w| "-".repeat(w + 2)).collect();
    out.push_str(&format!("|{}|\n", sep.join("|")));
    for row in rows {
        out.push_str(&line(row.clone()));
    }
    out
}

fn percent(part: Duration, total: Duration) -> String {
    if total.is_zero() {
        return "0.00".to_string();
    }
    format!("{:.2}", part.as_secs_f64() / total.as_secs_f64() * 100.0)
}

impl fmt::Display for RunStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "==Binding stats==")?;
        writeln!(f, "Run at {}.", self.timestamp)?;
        writeln!(
            f,
            "Loaded {} symbols from {} modules.",
            self.symbols, self.modules
        )?;
        writeln!(
            f,
            "Generated {} generic interface implementations.",
            self.generic_impls
        )?;
        writeln!(
            f,
            "Number of generated builtins (excludes generic interface impls):"
        )?;
        let mut rows: Vec<Vec<String>> = self
            .by_category
            .iter()
            .map(|(category, count)| {
                vec![
                    category.to_string(),
                    format!("{}/{}", count.written, count.total),
                ]
            })
            .collect();
        rows.push(vec![
            "==TOTAL==".to_string(),
            format!("{}/{}", self.written, self.total),
        ]);
        f.write_str(&render_table(
            &["Category", "Written/Total"],
            &rows,
            &[Align::Left, Align::Center],
        ))?;
        writeln!(f)?;

        writeln!(f, "==Timing stats==")?;
        writeln!(f, "Fetched/checked source modules in {:?}.", self.fetch)?;
        writeln!(
            f,
            "Binding generation tasks (excludes fetching/checking source modules):"
        )?;
        let total = self.generation_time();
        let stages = [
            ("Build model", self.parse),
            ("Generate bindings", self.generate),
            ("Read/Write binding list", self.binding_list),
            ("Name and write code", self.emit),
        ];
        let mut rows: Vec<Vec<String>> = stages
            .iter()
            .map(|(task, time)| vec![task.to_string(), format!("{:?}", time), percent(*time, total)])
            .collect();
        rows.push(vec![
            "==TOTAL==".to_string(),
            format!("{:?}", total),
            "100".to_string(),
        ]);
        f.write_str(&render_table(
            &["Task", "Time", "Time %"],
            &rows,
            &[Align::Left, Align::Center, Align::Right],
        ))
    }
}
