//! Terminal styling for deploy progress and run summaries
//!
//! Errors go to stderr; everything else goes to stdout so CI logs keep ordering.

use owo_colors::OwoColorize;

const MINT: (u8, u8, u8) = (152, 225, 152);
const CORAL: (u8, u8, u8) = (255, 160, 160);
const CREAM: (u8, u8, u8) = (255, 230, 160);
const SKY: (u8, u8, u8) = (160, 200, 255);
const LAVENDER: (u8, u8, u8) = (181, 174, 254);
const GREY: (u8, u8, u8) = (160, 160, 160);

fn paint(text: &str, (r, g, b): (u8, u8, u8)) -> String {
    text.truecolor(r, g, b).to_string()
}

fn paint_bold(text: &str, (r, g, b): (u8, u8, u8)) -> String {
    text.truecolor(r, g, b).bold().to_string()
}

/// Print a success message with a green checkmark
pub fn success(message: &str) {
    println!("{} {}", paint_bold("✓", MINT), message.bright_white());
}

/// Print an error message with a red cross
pub fn error(message: &str) {
    eprintln!("{} {}", paint_bold("✗", CORAL), message.bright_white());
}

/// Print a warning message
pub fn warning(message: &str) {
    println!("{} {}", paint_bold("⚠", CREAM), message.bright_white());
}

/// Print an info message
pub fn info(message: &str) {
    println!("{} {}", paint_bold("ℹ", SKY), message.bright_white());
}

/// Print a section header with a separator line
pub fn section(title: &str) {
    println!("\n{}", paint_bold(title, LAVENDER));
    println!("{}", paint(&"─".repeat(50), GREY));
}

/// Print an indented key-value pair
pub fn key_value(key: &str, value: &str) {
    println!("  {} {}", paint(&format!("{}:", key), GREY), value.bright_white());
}

/// Print a dimmed/muted message
pub fn dimmed(message: &str) {
    println!("{}", paint(message, GREY));
}

/// Print a step indicator, e.g. `[3/8] Bootstrap`
pub fn step(number: usize, total: usize, description: &str) {
    println!(
        "\n{} {}",
        paint_bold(&format!("[{}/{}]", number, total), LAVENDER),
        description.bright_white()
    );
}

/// Print a present/missing check line
pub fn status_check(item: &str, ok: bool, detail: &str) {
    let mark = if ok {
        paint_bold("✓", MINT)
    } else {
        paint_bold("✗", CORAL)
    };
    println!("  {} {} {}", mark, item.bright_white(), paint(detail, GREY));
}

/// Print the target environment badge
pub fn environment_badge(env_name: &str) {
    println!("  {} {}", "Environment:".dimmed(), paint_bold(env_name, MINT));
}

/// Print a blank line for spacing
pub fn blank() {
    println!();
}
