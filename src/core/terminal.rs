use console::{Emoji, style};

pub static SUCCESS_ICON: Emoji<'_, '_> = Emoji("✅ ", "");
pub static INFO_ICON: Emoji<'_, '_> = Emoji("ℹ️  ", "");
pub static WARN_ICON: Emoji<'_, '_> = Emoji("⚠️  ", "");
pub static ERROR_ICON: Emoji<'_, '_> = Emoji("❌ ", "");
pub static GLOBE: Emoji<'_, '_> = Emoji("🌐 ", "");
pub static GEAR: Emoji<'_, '_> = Emoji("⚙️  ", "");
pub static SPARKLE: Emoji<'_, '_> = Emoji("✨ ", "");

pub fn print_success(msg: &str) {
    println!("{} {}", SUCCESS_ICON, style(msg).green());
}

pub fn print_info(msg: &str) {
    println!("{} {}", INFO_ICON, style(msg).blue());
}

pub fn print_warn(msg: &str) {
    println!("{} {}", WARN_ICON, style(msg).yellow());
}

pub fn print_error(msg: &str) {
    eprintln!("{} {}", ERROR_ICON, style(msg).red().bold());
}

pub fn print_status(label: &str, msg: &str) {
    println!("  {} {}: {}", GEAR, style(label).bold().cyan(), msg);
}

pub fn print_link(label: &str, url: &str) {
    println!(
        "  {} {}: {}",
        GLOBE,
        style(label).bold(),
        style(url).underlined().cyan()
    );
}

pub fn print_banner() {
    println!(
        "\n{} {}\n",
        SPARKLE,
        style("sheetpatch").bold().cyan()
    );
    println!("{}\n", style("Record updates from CSV and Excel headers.").dim());
}

/// A titled block of commands or key/value lines for help and status output.
pub struct GuideSection {
    title: String,
    lines: Vec<(String, String, bool)>,
}

impl GuideSection {
    pub fn new(title: &str) -> Self {
        Self {
            title: title.to_string(),
            lines: Vec::new(),
        }
    }

    pub fn command(mut self, name: &str, about: &str) -> Self {
        self.lines.push((name.to_string(), about.to_string(), true));
        self
    }

    pub fn status(mut self, label: &str, value: &str) -> Self {
        self.lines.push((label.to_string(), value.to_string(), false));
        self
    }

    pub fn print(self) {
        println!(" {}", style(&self.title).bold().underlined());
        let width = self.lines.iter().map(|(k, _, _)| k.len()).max().unwrap_or(0);
        for (key, value, is_command) in &self.lines {
            if *is_command {
                println!("   {:<width$}  {}", style(key).green(), value, width = width);
            } else {
                println!("   {:<width$}  {}", style(key).cyan(), value, width = width);
            }
        }
        println!();
    }
}
