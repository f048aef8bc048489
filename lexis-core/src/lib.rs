pub mod book;
pub mod config;
pub mod error;
pub mod export;
pub mod extract;

pub use error::{CoreError, Result};

use colored::Colorize;

const BANNER: &str = r#"
  ██╗     ███████╗██╗  ██╗██╗███████╗
  ██║     ██╔════╝╚██╗██╔╝██║██╔════╝
  ██║     █████╗   ╚███╔╝ ██║███████╗
  ██║     ██╔══╝   ██╔██╗ ██║╚════██║
  ███████╗███████╗██╔╝ ██╗██║███████║
  ╚══════╝╚══════╝╚═╝  ╚═╝╚═╝╚══════╝
"#;

pub fn print_banner() {
    println!("{}", BANNER.bright_cyan().bold());
    println!(
        "  {} {}\n",
        "catalog vocabulary extractor".bright_white(),
        format!("v{}", env!("CARGO_PKG_VERSION")).bright_black()
    );
}
