//! Colored, human readable terminal output

use std::path::Path;

use chrono::{DateTime, Local};
use color_eyre::owo_colors::OwoColorize;
use engine::{Error, history::Recent, history::RecentEntry};

pub fn heading(text: &str) {
    println!("{}", text.bold().yellow());
}

pub fn prompt(prompt: &str) {
    println!("Prompt: {}", prompt.green());
}

pub fn source_image(path: &Path) {
    println!("Image: {}", path.display().cyan());
}

pub fn cost_estimate(usd: f64) {
    println!("Estimated cost: {}\n", format!("${usd:.2}").dimmed());
}

pub fn saved(label: &str, path: &Path) {
    println!("\n{}", format!("{label} → {}", path.display()).green());
}

pub fn preview_hint(path: &Path) {
    println!("Preview (macOS): open \"{}\"", path.display());
    println!("Preview (Linux): xdg-open \"{}\"", path.display());
}

pub fn success(text: &str) {
    println!("{}", text.green());
}

pub fn error(err: &Error) {
    eprintln!("{}", format!("Error: {err}").red());
    if let Some(hint) = err.hint() {
        eprintln!("{}", hint.yellow());
    }
}

pub fn tip(text: &str) {
    println!("\n{} {text}", "Tip:".bold().yellow());
}

pub fn recent(recent: &Recent, dir: &Path) {
    println!("{}\n", "Recent Nano Banana Pro generations:".bold().blue());

    if recent.entries.is_empty() {
        println!("No generations found.");
        return;
    }

    for (i, entry) in recent.entries.iter().enumerate() {
        println!("{}", format_entry(i + 1, entry));
    }

    if recent.hidden() > 0 {
        println!("\n... and {} more files", recent.hidden());
    }

    println!("\nOutput directory: {}", dir.display());
}

pub fn format_entry(n: usize, entry: &RecentEntry) -> String {
    let name = entry
        .path
        .file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_default();
    let size_kb = entry.size as f64 / 1024.0;
    let mtime = DateTime::<Local>::from(entry.modified).format("%Y-%m-%d %H:%M:%S");
    format!("{n:2}. {name:<40} {size_kb:>8.1} KB  {mtime}")
}

#[cfg(test)]
mod tests {
    use std::time::SystemTime;

    use super::*;

    #[test]
    fn entry_layout() {
        let modified = SystemTime::now();
        let entry = RecentEntry {
            path: "/out/nano_20250101_120000.png".into(),
            size: 2048,
            modified,
        };
        let mtime = DateTime::<Local>::from(modified).format("%Y-%m-%d %H:%M:%S");
        assert_eq!(
            format_entry(3, &entry),
            format!(" 3. nano_20250101_120000.png                     2.0 KB  {mtime}")
        );
    }
}
