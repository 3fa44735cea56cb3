use super::style;
use anyhow::{Context, Result};
use console::measure_text_width;
use qrcode::{Color, EcLevel, QrCode};

/// Light modules around the code; scanners need a quiet zone.
const QUIET_ZONE: usize = 2;
const BOX_PAD_X: usize = 2;

/// Encode `text` and draw it with Unicode half blocks, two module rows per
/// terminal line. `█` is a light/light pair, space is dark/dark.
pub fn qr_lines(text: &str) -> Result<Vec<String>> {
    let code = QrCode::with_error_correction_level(text.as_bytes(), EcLevel::M)
        .context("Failed to encode QR code")?;
    let width = code.width();
    let colors = code.to_colors();
    let size = width + 2 * QUIET_ZONE;

    let light = |x: usize, y: usize| -> bool {
        if x < QUIET_ZONE || y < QUIET_ZONE || x >= width + QUIET_ZONE || y >= width + QUIET_ZONE
        {
            return true;
        }
        colors[(y - QUIET_ZONE) * width + (x - QUIET_ZONE)] == Color::Light
    };

    let mut lines = Vec::with_capacity(size.div_ceil(2));
    for y in (0..size).step_by(2) {
        let line: String = (0..size)
            .map(|x| {
                let upper = light(x, y);
                let lower = y + 1 < size && light(x, y + 1);
                match (upper, lower) {
                    (true, true) => '█',
                    (true, false) => '▀',
                    (false, true) => '▄',
                    (false, false) => ' ',
                }
            })
            .collect();
        lines.push(line);
    }
    Ok(lines)
}

/// Terminal presentation of the shared URL and status messages.
pub struct Renderer {
    quiet: bool,
}

impl Renderer {
    pub fn new(quiet: bool) -> Self {
        Self { quiet }
    }

    pub fn is_quiet(&self) -> bool {
        self.quiet
    }

    /// Build the QR + URL block. Quiet mode drops the title, hint and frame.
    pub fn compose(&self, url: &str, is_public: bool) -> Result<String> {
        let qr: Vec<String> = qr_lines(url)?.into_iter().map(style::qr).collect();
        let styled_url = style::url(url);

        if self.quiet {
            let mut out = qr;
            out.push(styled_url);
            return Ok(center(&out).join("\n"));
        }

        let title = if is_public {
            "🌐 Public URL (via SSH tunnel)"
        } else {
            "📡 Local Network URL"
        };

        let mut content = vec![style::header(title), String::new()];
        content.extend(qr);
        content.push(styled_url);
        content.push(String::new());
        content.push(style::dim("Scan the QR code or visit the URL above"));
        Ok(framed(&center(&content)).join("\n"))
    }

    pub fn render_output(&self, url: &str, is_public: bool) -> Result<()> {
        println!("{}", self.compose(url, is_public)?);
        Ok(())
    }

    pub fn print_error(&self, message: &str) {
        if !self.quiet {
            eprintln!("{}", style::error(format!("✗ Error: {message}")));
        }
    }

    pub fn print_success(&self, message: &str) {
        if !self.quiet {
            println!("{}", style::success(format!("✓ {message}")));
        }
    }

    pub fn print_info(&self, message: &str) {
        if !self.quiet {
            println!("{}", style::dim(format!("ℹ {message}")));
        }
    }
}

fn center(lines: &[String]) -> Vec<String> {
    let width = lines
        .iter()
        .map(|l| measure_text_width(l))
        .max()
        .unwrap_or(0);
    lines
        .iter()
        .map(|l| {
            let gap = width - measure_text_width(l);
            let left = gap / 2;
            format!("{}{l}{}", " ".repeat(left), " ".repeat(gap - left))
        })
        .collect()
}

fn framed(lines: &[String]) -> Vec<String> {
    let inner = lines
        .iter()
        .map(|l| measure_text_width(l))
        .max()
        .unwrap_or(0)
        + 2 * BOX_PAD_X;
    let border = |s: &str| style::accent(s);
    let pad = " ".repeat(BOX_PAD_X);
    let blank = format!("{}{}{}", border("│"), " ".repeat(inner), border("│"));

    let mut out = Vec::with_capacity(lines.len() + 4);
    out.push(border(&format!("╭{}╮", "─".repeat(inner))));
    out.push(blank.clone());
    for line in lines {
        out.push(format!("{}{pad}{line}{pad}{}", border("│"), border("│")));
    }
    out.push(blank);
    out.push(border(&format!("╰{}╯", "─".repeat(inner))));
    out
}
