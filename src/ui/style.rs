use console::style;
use std::fmt::Display;

/// Green bold: success checkmarks, confirmations
pub fn success<D: Display>(text: D) -> String {
    style(text).green().bold().to_string()
}

/// Red bold: failures
pub fn error<D: Display>(text: D) -> String {
    style(text).red().bold().to_string()
}

/// Magenta bold: output box titles
pub fn header<D: Display>(text: D) -> String {
    style(text).magenta().bold().to_string()
}

/// Dim italic: hints and secondary text
pub fn dim<D: Display>(text: D) -> String {
    style(text).dim().italic().to_string()
}

/// Yellow: shell commands, warnings
pub fn yellow<D: Display>(text: D) -> String {
    style(text).yellow().to_string()
}

/// Green: confirmed values, paths, names
pub fn value<D: Display>(text: D) -> String {
    style(text).green().to_string()
}

/// Cyan bold: markers next to list entries
pub fn accent<D: Display>(text: D) -> String {
    style(text).cyan().bold().to_string()
}

/// Green bold on dark grey: the shared URL
pub fn url<D: Display>(text: D) -> String {
    style(format!(" {text} ")).green().bold().on_color256(235).to_string()
}

/// White on black: QR modules, so the code scans on light and dark themes
pub fn qr<D: Display>(text: D) -> String {
    style(text).white().on_black().to_string()
}
