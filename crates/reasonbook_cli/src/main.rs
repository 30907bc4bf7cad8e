//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `reasonbook_core` linkage.
//! - Keep output deterministic for quick local sanity checks.

use reasonbook_core::ReasonApp;

fn main() {
    let mut app = match ReasonApp::open_in_memory() {
        Ok(app) => app,
        Err(err) => {
            eprintln!("reasonbook: failed to open store: {err}");
            std::process::exit(1);
        }
    };

    let text: String = std::env::args().skip(1).collect::<Vec<_>>().join(" ");
    if !text.is_empty() {
        if let Err(err) = app.add_reason(text) {
            eprintln!("reasonbook: failed to add reason: {err}");
            std::process::exit(1);
        }
    }

    println!("reasonbook_core version={}", reasonbook_core::core_version());
    println!("reasons={} renders={}", app.reasons().count(), app.renders());
    println!("{}", app.markup());
}
