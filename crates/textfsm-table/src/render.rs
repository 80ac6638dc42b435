use nu_ansi_term::{Color, Style};

use crate::error::TableError;
use crate::table::TextTable;

/// Controls for [`TextTable::formatted`].
#[derive(Debug, Clone, Default)]
pub struct FormatOptions {
    /// Maximum table width; `0` leaves the width unconstrained.
    pub width: usize,
    pub hide_header: bool,
    /// Show only these columns, in header order.
    pub columns: Option<Vec<String>>,
}

impl FormatOptions {
    pub fn new() -> FormatOptions {
        FormatOptions::default()
    }

    pub fn width(mut self, width: usize) -> FormatOptions {
        self.width = width;
        self
    }

    pub fn hide_header(mut self) -> FormatOptions {
        self.hide_header = true;
        self
    }

    pub fn columns<I>(mut self, columns: I) -> FormatOptions
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.columns = Some(columns.into_iter().map(Into::into).collect());
        self
    }
}

impl TextTable {
    /// Renders the table with whitespace padding and row delimiters.
    ///
    /// Column widths fit the widest cell where space permits; otherwise
    /// wrappable columns shrink toward their longest single word and their
    /// cells wrap over several physical lines, with a `-` rule between
    /// neighbouring rows. ANSI escapes never count toward widths.
    pub fn formatted(&self, options: &FormatOptions) -> Result<String, TableError> {
        let columns: Vec<usize> = self
            .header()
            .iter()
            .enumerate()
            .filter(|(_, name)| {
                options
                    .columns
                    .as_ref()
                    .is_none_or(|wanted| wanted.iter().any(|w| &w == name))
            })
            .map(|(i, _)| i)
            .collect();

        let widths = self.negotiate_widths(&columns, options.width)?;
        let total: usize = widths.iter().sum();

        let mut lines: Vec<String> = Vec::new();

        if !options.hide_header {
            let names: Vec<String> = columns
                .iter()
                .map(|&c| self.header()[c].clone())
                .collect();
            let mut block = assemble(&names, &widths)?;
            block.push("=".repeat(total));
            paint(&mut block, self.header_color.as_deref());
            lines.append(&mut block);
        }

        let mut blocks: Vec<(Vec<String>, bool)> = Vec::new();
        for row in self.rows() {
            let cells: Vec<String> = columns
                .iter()
                .map(|&c| row.values()[c].to_string())
                .collect();
            let mut block = assemble(&cells, &widths)?;
            let multiline = block.len() > 1;
            paint(&mut block, row.color.as_deref());
            blocks.push((block, multiline));
        }

        let mut previous_multiline = None;
        for (block, multiline) in &mut blocks {
            if previous_multiline.is_some_and(|prev| prev || *multiline) {
                lines.push("-".repeat(total));
            }
            previous_multiline = Some(*multiline);
            lines.append(block);
        }

        Ok(lines.into_iter().map(|line| line + "\n").collect())
    }

    /// Picks a width per displayed column.
    ///
    /// `largest` is the widest cell, `smallest` the longest unbreakable
    /// word, both padded by a space on each side. Columns whose largest
    /// exceeds their smallest can wrap; spare width is handed to them in
    /// proportion to their deficit, remainder to the neediest.
    fn negotiate_widths(
        &self,
        columns: &[usize],
        width: usize,
    ) -> Result<Vec<usize>, TableError> {
        let mut largest = Vec::with_capacity(columns.len());
        let mut smallest = Vec::with_capacity(columns.len());
        for &c in columns {
            let name = &self.header()[c];
            largest.push(visible_len(name));
            smallest.push(longest_word(name));
        }

        for row in self.rows() {
            for (i, &c) in columns.iter().enumerate() {
                let cell = &row.values()[c];
                if cell.is_empty() {
                    continue;
                }
                let text = cell.to_string();
                largest[i] = largest[i].max(visible_len(&text));
                smallest[i] = smallest[i].max(longest_word(&text));
            }
        }

        let mut min_total = 0;
        let mut wrappable = vec![false; columns.len()];
        for i in 0..columns.len() {
            largest[i] += 2;
            smallest[i] += 2;
            if largest[i] > smallest[i] {
                wrappable[i] = true;
                min_total += smallest[i];
            } else {
                min_total += largest[i];
            }
        }

        if width > 0 && min_total > width {
            return Err(TableError::WidthTooNarrow);
        }

        let total_deficit: usize = (0..columns.len())
            .filter(|&i| wrappable[i])
            .map(|i| largest[i] - smallest[i])
            .sum();
        let spare = width.saturating_sub(min_total);

        let mut widths = Vec::with_capacity(columns.len());
        if width == 0 || spare >= total_deficit {
            widths.extend_from_slice(&largest);
        } else {
            let mut spent = 0;
            for i in 0..columns.len() {
                if wrappable[i] {
                    let extra = spare * (largest[i] - smallest[i]) / total_deficit;
                    spent += extra;
                    widths.push(smallest[i] + extra);
                } else {
                    widths.push(largest[i]);
                }
            }
            // The remainder goes to the neediest column, first one on ties.
            let mut neediest: Option<usize> = None;
            for i in 0..columns.len() {
                if wrappable[i]
                    && neediest.is_none_or(|n| {
                        largest[i] - smallest[i] > largest[n] - smallest[n]
                    })
                {
                    neediest = Some(i);
                }
            }
            let rest = spare - spent;
            if rest > 0
                && let Some(neediest) = neediest
            {
                widths[neediest] += rest;
            }
        }
        Ok(widths)
    }
}

/// Lays one logical row out over its physical lines.
fn assemble(cells: &[String], widths: &[usize]) -> Result<Vec<String>, TableError> {
    let mut wrapped = Vec::with_capacity(cells.len());
    for (cell, &width) in cells.iter().zip(widths) {
        wrapped.push(justify(cell, width)?);
    }
    let height = wrapped.iter().map(Vec::len).max().unwrap_or(0);

    let mut lines = Vec::with_capacity(height);
    for i in 0..height {
        let mut line = String::new();
        for (cell, &width) in wrapped.iter().zip(widths) {
            match cell.get(i) {
                Some(part) => line.push_str(part),
                None => line.push_str(&" ".repeat(width)),
            }
        }
        lines.push(line);
    }
    Ok(lines)
}

/// Pads `text` into lines of exactly `col_size` characters, wrapping
/// greedily on whitespace when it does not fit. A segment that fits is
/// kept verbatim, internal spacing included.
fn justify(text: &str, col_size: usize) -> Result<Vec<String>, TableError> {
    let width = col_size.saturating_sub(2);
    let text = text.replace('\t', " ");

    let mut lines = Vec::new();
    for segment in text.split('\n') {
        if visible_len(segment) <= width {
            lines.push(pad(segment, width));
            continue;
        }
        let mut current = String::new();
        let mut current_len = 0;
        for word in segment.split_whitespace() {
            let word_len = visible_len(word);
            if word_len > width {
                return Err(TableError::WordTooWide(strip(word)));
            }
            if current.is_empty() {
                current.push_str(word);
                current_len = word_len;
            } else if current_len + 1 + word_len <= width {
                current.push(' ');
                current.push_str(word);
                current_len += 1 + word_len;
            } else {
                lines.push(pad(&current, width));
                current.clear();
                current.push_str(word);
                current_len = word_len;
            }
        }
        lines.push(pad(&current, width));
    }
    Ok(lines)
}

fn pad(text: &str, width: usize) -> String {
    format!(" {text}{} ", " ".repeat(width - visible_len(text)))
}

fn strip(text: &str) -> String {
    strip_ansi_escapes::strip_str(text)
}

/// Character count with ANSI escape sequences ignored.
fn visible_len(text: &str) -> usize {
    strip(text).chars().count()
}

/// The longest unbreakable word, ANSI ignored; the floor a column can
/// shrink to.
fn longest_word(text: &str) -> usize {
    strip(text)
        .split_whitespace()
        .map(|word| word.chars().count())
        .max()
        .unwrap_or(0)
}

/// Wraps a block of physical lines in one SGR prefix/suffix pair.
fn paint(block: &mut [String], keywords: Option<&[String]>) {
    let Some(keywords) = keywords else { return };
    let style = style_from_keywords(keywords);
    if style.is_plain() || block.is_empty() {
        return;
    }
    block[0] = format!("{}{}", style.prefix(), block[0]);
    let last = block.len() - 1;
    block[last] = format!("{}{}", block[last], style.suffix());
}

/// Maps color keywords to a terminal style. Unknown keywords are ignored.
fn style_from_keywords(keywords: &[String]) -> Style {
    let mut style = Style::new();
    for word in keywords {
        style = match word.as_str() {
            "bold" => style.bold(),
            "dimmed" => style.dimmed(),
            "italic" => style.italic(),
            "underline" => style.underline(),
            "blink" => style.blink(),
            "reverse" => style.reverse(),
            "hidden" => style.hidden(),
            "strikethrough" => style.strikethrough(),
            word => {
                if let Some(bg) = word.strip_prefix("bg_").and_then(color_by_name) {
                    style.on(bg)
                } else if let Some(fg) = color_by_name(word) {
                    style.fg(fg)
                } else {
                    style
                }
            }
        };
    }
    style
}

fn color_by_name(name: &str) -> Option<Color> {
    match name {
        "black" => Some(Color::Black),
        "red" => Some(Color::Red),
        "green" => Some(Color::Green),
        "yellow" => Some(Color::Yellow),
        "blue" => Some(Color::Blue),
        "magenta" => Some(Color::Magenta),
        "cyan" => Some(Color::Cyan),
        "white" => Some(Color::White),
        _ => None,
    }
}
