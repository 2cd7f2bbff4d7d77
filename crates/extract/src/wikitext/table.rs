use super::{Nesting, next_top_level, split_top_level};
use crate::consts;

/// A single table cell, after its attributes have been split off.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cell {
    /// Cell content, whitespace-trimmed.
    pub value: String,
    /// Whether the cell was written with `!` (header) syntax.
    pub header: bool,
    pub rowspan: usize,
    pub colspan: usize,
}
impl Cell {
    fn from_raw(raw: &str, header: bool) -> Self {
        // Attributes can only appear on the line that opened the cell.
        let first_line = raw.find('\n').unwrap_or(raw.len());
        let (attributes, content) = match next_top_level(&raw[..first_line], &["|"]) {
            Some((position, length)) => (&raw[..position], &raw[position + length..]),
            None => ("", raw),
        };
        let (mut rowspan, mut colspan) = (1, 1);
        for captures in consts::SPAN_REGEX.captures_iter(attributes) {
            let Ok(span) = captures[2].parse::<usize>() else {
                continue;
            };
            if captures[1].eq_ignore_ascii_case("rowspan") {
                rowspan = span.clamp(1, consts::MAX_ROWSPAN);
            } else {
                colspan = span.clamp(1, consts::MAX_COLSPAN);
            }
        }
        Self {
            value: content.trim().to_string(),
            header,
            rowspan,
            colspan,
        }
    }
}

/// A wikitext table, as rows of cells in source order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    rows: Vec<Vec<Cell>>,
}
impl Table {
    /// Parses the body of a table: everything between the opening `{|` line
    /// and the closing `|}` line.
    pub(crate) fn parse(body: &str) -> Self {
        let mut rows: Vec<Vec<(bool, String)>> = vec![Vec::new()];
        let mut nesting = Nesting::default();
        let mut nested_tables = 0usize;
        let mut in_caption = false;
        for line in body.lines() {
            let trimmed = line.trim_start();
            if !nesting.is_top_level() || nested_tables > 0 {
                if nesting.is_top_level() {
                    if trimmed.starts_with("{|") {
                        nested_tables += 1;
                    } else if trimmed.starts_with("|}") {
                        nested_tables -= 1;
                    }
                }
                if !in_caption {
                    Self::continue_cell(&mut rows, line);
                }
            } else if trimmed.starts_with("{|") {
                nested_tables += 1;
                Self::continue_cell(&mut rows, line);
            } else if trimmed.starts_with("|}") {
                break;
            } else if trimmed.starts_with("|-") {
                rows.push(Vec::new());
                in_caption = false;
            } else if trimmed.starts_with("|+") {
                in_caption = true;
            } else if let Some(rest) = trimmed.strip_prefix('!') {
                in_caption = false;
                Self::open_cells(&mut rows, split_top_level(rest, &["!!", "||"]), true);
            } else if let Some(rest) = trimmed.strip_prefix('|') {
                in_caption = false;
                Self::open_cells(&mut rows, split_top_level(rest, &["||"]), false);
            } else if !in_caption {
                Self::continue_cell(&mut rows, line);
            }
            nesting.feed(line);
        }
        let rows = rows
            .into_iter()
            .filter(|row| !row.is_empty())
            .map(|row| row.into_iter().map(|(header, raw)| Cell::from_raw(&raw, header)).collect())
            .collect();
        Self { rows }
    }

    fn open_cells(rows: &mut [Vec<(bool, String)>], cells: Vec<&str>, header: bool) {
        if let Some(row) = rows.last_mut() {
            row.extend(cells.into_iter().map(|cell| (header, cell.to_string())));
        }
    }

    fn continue_cell(rows: &mut [Vec<(bool, String)>], line: &str) {
        // Text before the first cell of a row belongs to nothing.
        if let Some((_, raw)) = rows.last_mut().and_then(|row| row.last_mut()) {
            raw.push('\n');
            raw.push_str(line);
        }
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    /// Lays the table out as a grid of cell values.
    ///
    /// A cell spanning several rows or columns is copied into every position
    /// it covers. Positions no cell covers are `None`, and every row is
    /// padded with `None` to the width of the widest row. Row spans never
    /// extend the table past its last row.
    pub fn data(&self) -> Vec<Vec<Option<String>>> {
        let row_count = self.rows.len();
        let mut grid: Vec<Vec<Option<String>>> = vec![Vec::new(); row_count];
        for (r, row) in self.rows.iter().enumerate() {
            let mut column = 0;
            for cell in row {
                while grid[r].get(column).is_some_and(Option::is_some) {
                    column += 1;
                }
                let end = column + cell.colspan;
                let covered_rows = cell.rowspan.min(row_count - r);
                for covered in &mut grid[r..r + covered_rows] {
                    if covered.len() < end {
                        covered.resize(end, None);
                    }
                    for slot in &mut covered[column..end] {
                        // Whichever cell claimed a position first keeps it.
                        if slot.is_none() {
                            *slot = Some(cell.value.clone());
                        }
                    }
                }
                column = end;
            }
        }
        let width = grid.iter().map(Vec::len).max().unwrap_or(0);
        for row in &mut grid {
            row.resize(width, None);
        }
        grid
    }
}
