use clap::builder::styling::{AnsiColor, Color, Style};
use clap::builder::Styles;
use crossterm::style::{Attribute, Color as CtColor, Stylize};
use std::io::{self, Write};
use unicode_width::UnicodeWidthStr;

// ═══════════════════════════════════════════════════════════════════════════════
// Clap Styles
// ═══════════════════════════════════════════════════════════════════════════════

pub fn get_styles() -> Styles {
    clap::builder::Styles::styled()
        .usage(
            Style::new()
                .bold()
                .underline()
                .fg_color(Some(Color::Ansi(AnsiColor::Green))),
        )
        .header(
            Style::new()
                .bold()
                .underline()
                .fg_color(Some(Color::Ansi(AnsiColor::Green))),
        )
        .literal(
            Style::new()
                .bold()
                .fg_color(Some(Color::Ansi(AnsiColor::Cyan))),
        )
        .invalid(
            Style::new()
                .bold()
                .fg_color(Some(Color::Ansi(AnsiColor::Red))),
        )
        .error(
            Style::new()
                .bold()
                .fg_color(Some(Color::Ansi(AnsiColor::Red))),
        )
        .valid(
            Style::new()
                .bold()
                .fg_color(Some(Color::Ansi(AnsiColor::Cyan))),
        )
        .placeholder(Style::new().fg_color(Some(Color::Ansi(AnsiColor::BrightBlack))))
}

// ═══════════════════════════════════════════════════════════════════════════════
// Color Palette
// ═══════════════════════════════════════════════════════════════════════════════

pub mod colors {
    use crossterm::style::Color;

    pub const GREEN: Color = Color::Rgb {
        r: 30,
        g: 215,
        b: 96,
    };
    pub const TEAL: Color = Color::Rgb {
        r: 0,
        g: 200,
        b: 200,
    };
    pub const ORANGE: Color = Color::Rgb {
        r: 255,
        g: 165,
        b: 0,
    };
    pub const RED: Color = Color::Rgb {
        r: 255,
        g: 85,
        b: 85,
    };
    pub const DIM: Color = Color::Rgb {
        r: 128,
        g: 128,
        b: 128,
    };
    pub const WHITE: Color = Color::Rgb {
        r: 255,
        g: 255,
        b: 255,
    };
}

// ═══════════════════════════════════════════════════════════════════════════════
// Box Drawing Characters
// ═══════════════════════════════════════════════════════════════════════════════

pub mod box_chars {
    pub const HORIZONTAL: &str = "─";
    pub const VERTICAL: &str = "│";

    pub const ROUND_TOP_LEFT: &str = "╭";
    pub const ROUND_TOP_RIGHT: &str = "╮";
    pub const ROUND_BOTTOM_LEFT: &str = "╰";
    pub const ROUND_BOTTOM_RIGHT: &str = "╯";

    pub const T_LEFT: &str = "├";
    pub const T_RIGHT: &str = "┤";
    pub const T_TOP: &str = "┬";
    pub const T_BOTTOM: &str = "┴";
    pub const CROSS: &str = "┼";

    pub const BULLET: &str = "●";
    pub const BULLET_EMPTY: &str = "○";
    pub const CHECK: &str = "✓";
    pub const CROSS_MARK: &str = "✗";
}

// ═══════════════════════════════════════════════════════════════════════════════
// Status Indicators
// ═══════════════════════════════════════════════════════════════════════════════

pub fn print_success(message: &str) {
    println!(
        " {} {}",
        box_chars::CHECK.with(colors::GREEN).bold(),
        message.with(colors::GREEN)
    );
}

pub fn print_error(message: &str) {
    eprintln!(
        " {} {}",
        box_chars::CROSS_MARK.with(colors::RED).bold(),
        message.with(colors::RED)
    );
}

pub fn print_warning(message: &str) {
    println!(
        " {} {}",
        "⚠".with(colors::ORANGE).bold(),
        message.with(colors::ORANGE)
    );
}

// ═══════════════════════════════════════════════════════════════════════════════
// Section Headers
// ═══════════════════════════════════════════════════════════════════════════════

const SECTION_WIDTH: usize = 60;

pub fn print_section_header(title: &str) {
    let title_len = title.width();
    let padding = SECTION_WIDTH.saturating_sub(title_len + 4) / 2;

    println!();
    print!("{}", box_chars::ROUND_TOP_LEFT.with(colors::GREEN));
    print!(
        "{}",
        box_chars::HORIZONTAL.repeat(padding).with(colors::GREEN)
    );
    print!(
        " {} ",
        title.with(colors::GREEN).bold().attribute(Attribute::Italic)
    );
    print!(
        "{}",
        box_chars::HORIZONTAL
            .repeat(SECTION_WIDTH.saturating_sub(title_len + 4 + padding))
            .with(colors::GREEN)
    );
    println!("{}", box_chars::ROUND_TOP_RIGHT.with(colors::GREEN));
}

pub fn print_section_footer() {
    print!("{}", box_chars::ROUND_BOTTOM_LEFT.with(colors::GREEN));
    print!(
        "{}",
        box_chars::HORIZONTAL
            .repeat(SECTION_WIDTH)
            .with(colors::GREEN)
    );
    println!("{}", box_chars::ROUND_BOTTOM_RIGHT.with(colors::GREEN));
    println!();
}

pub fn print_key_value(key: &str, value: &str) {
    println!(
        "  {} {} {}",
        box_chars::BULLET.with(colors::TEAL),
        format!("{}:", key).with(colors::DIM),
        value.with(colors::WHITE)
    );
}

pub fn print_empty_list(message: &str) {
    println!(
        "  {} {}",
        box_chars::BULLET_EMPTY.with(colors::DIM),
        message.with(colors::DIM).attribute(Attribute::Italic)
    );
}

// ═══════════════════════════════════════════════════════════════════════════════
// Table Display
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Align {
    Left,
    Right,
}

pub struct TableBuilder {
    headers: Vec<String>,
    aligns: Vec<Align>,
    rows: Vec<Vec<String>>,
    col_widths: Vec<usize>,
}

impl TableBuilder {
    pub fn new(headers: &[&str]) -> Self {
        TableBuilder {
            headers: headers.iter().map(|h| h.to_string()).collect(),
            aligns: vec![Align::Left; headers.len()],
            rows: Vec::new(),
            col_widths: headers.iter().map(|h| h.width()).collect(),
        }
    }

    /// Right-aligns the given column, for numbers.
    pub fn align_right(mut self, column: usize) -> Self {
        if let Some(align) = self.aligns.get_mut(column) {
            *align = Align::Right;
        }
        self
    }

    pub fn add_row(&mut self, row: Vec<String>) {
        for (i, cell) in row.iter().enumerate() {
            if i < self.col_widths.len() {
                self.col_widths[i] = self.col_widths[i].max(cell.width());
            }
        }
        self.rows.push(row);
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn paint(text: &str, color: CtColor, bold: bool, styled: bool) -> String {
        match (styled, bold) {
            (false, _) => text.to_string(),
            (true, false) => text.with(color).to_string(),
            (true, true) => text.with(color).bold().to_string(),
        }
    }

    fn write_border<W: Write>(
        &self,
        out: &mut W,
        (left, junction, right): (&str, &str, &str),
        styled: bool,
    ) -> io::Result<()> {
        let mut line = String::from(left);
        for (i, width) in self.col_widths.iter().enumerate() {
            line.push_str(&box_chars::HORIZONTAL.repeat(width + 2));
            if i + 1 < self.col_widths.len() {
                line.push_str(junction);
            }
        }
        line.push_str(right);
        writeln!(out, "{}", Self::paint(&line, colors::GREEN, false, styled))
    }

    fn write_cells<W: Write>(
        &self,
        out: &mut W,
        cells: &[String],
        color: CtColor,
        bold: bool,
        styled: bool,
    ) -> io::Result<()> {
        let vertical = Self::paint(box_chars::VERTICAL, colors::GREEN, false, styled);
        write!(out, "{}", vertical)?;
        for (i, width) in self.col_widths.iter().enumerate() {
            let cell = cells.get(i).map(String::as_str).unwrap_or("");
            let padding = " ".repeat(width.saturating_sub(cell.width()));
            let painted = Self::paint(cell, color, bold, styled);
            match self.aligns[i] {
                Align::Left => write!(out, " {}{} {}", painted, padding, vertical)?,
                Align::Right => write!(out, " {}{} {}", padding, painted, vertical)?,
            }
        }
        writeln!(out)
    }

    pub fn write_to<W: Write>(&self, out: &mut W, styled: bool) -> io::Result<()> {
        use box_chars::*;
        self.write_border(out, (ROUND_TOP_LEFT, T_TOP, ROUND_TOP_RIGHT), styled)?;
        self.write_cells(out, &self.headers, colors::GREEN, true, styled)?;
        self.write_border(out, (T_LEFT, CROSS, T_RIGHT), styled)?;
        for row in &self.rows {
            self.write_cells(out, row, colors::WHITE, false, styled)?;
        }
        self.write_border(out, (ROUND_BOTTOM_LEFT, T_BOTTOM, ROUND_BOTTOM_RIGHT), styled)
    }

    pub fn print(&self) -> io::Result<()> {
        let stdout = io::stdout();
        let mut out = stdout.lock();
        self.write_to(&mut out, true)?;
        out.flush()
    }
}
