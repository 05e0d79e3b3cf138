use colored::{Color, Colorize};
use url::Url;

use super::{models::ExchangeRecord, writer::create_preview};

pub fn print_exchange(record: &ExchangeRecord, preview_bytes: Option<usize>) {
    let status = record.response.status;
    let status_color = if status >= 400 {
        Color::Red
    } else if status >= 300 {
        Color::Yellow
    } else {
        Color::Green
    };

    println!(
        "{} {} {}",
        record.request.method.bold(),
        record.request.url.cyan(),
        format!("@ {}", record.request.time).dimmed()
    );
    println!(
        "{} {} {} {}",
        "Status:".bold(),
        format!("{status}").color(status_color),
        record.response.status_text.color(status_color),
        format!("({:.1} ms)", record.response.elapsed_ms).dimmed()
    );

    if !record.request.redirects.redirect_list.is_empty() {
        println!("{}", "Redirects".bold());
        for target in &record.request.redirects.redirect_list {
            println!("  -> {}", target.dimmed());
        }
    }

    for file in &record.request.files {
        println!(
            "{} {} {}",
            "Uploaded:".bold(),
            file.path.display(),
            format!("({} bytes)", file.size).dimmed()
        );
    }

    println!("{}", "Response headers".bold());
    for (name, value) in &record.response.headers {
        println!("  {}: {}", name.cyan(), value.dimmed());
    }

    for path in &record.response.files {
        println!("{} {}", "Body:".bold(), format_file_link(path));
    }

    if let Some(limit) = preview_bytes.filter(|limit| *limit > 0) {
        let rendered = match &record.response.data {
            serde_json::Value::Null => String::new(),
            serde_json::Value::String(text) => text.clone(),
            other => serde_json::to_string_pretty(other).unwrap_or_default(),
        };
        println!("{}", "Preview".bold());
        println!("{}", create_preview(rendered.as_bytes(), limit).dimmed());
    }
}

fn format_file_link(path: &std::path::Path) -> String {
    let display = path.to_string_lossy();
    match Url::from_file_path(path) {
        Ok(url) => format!("\x1b]8;;{}\x1b\\{}\x1b]8;;\x1b\\", url, display.cyan()),
        Err(_) => display.cyan().to_string(),
    }
}
