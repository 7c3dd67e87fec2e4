use std::{env, fs, path::PathBuf};

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-env-changed=OUT_DIR");

    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());
    let completions_dir = out_dir.join("completions");

    fs::create_dir_all(&completions_dir).unwrap();

    let mut cmd = clap::Command::new("threadmark")
        .version(env!("CARGO_PKG_VERSION"))
        .author("Threadmark Contributors")
        .about("Export conversation threads to Markdown with consistent citations")
        .arg(clap::arg!(<INPUT> "Saved page snapshot (HTML), exported Markdown with --export, or '-' for stdin"))
        .arg(clap::arg!(--export "Treat INPUT as a Markdown export payload instead of a page snapshot"))
        .arg(clap::arg!(--research "The export payload is a deep-research report"))
        .arg(
            clap::arg!(--capture <FILE> "Saved export payload served to the export strategy")
                .value_name("FILE")
                .value_parser(clap::value_parser!(std::path::PathBuf)),
        )
        .arg(
            clap::arg!(-s --style <STYLE> "Citation style")
                .value_name("STYLE")
                .value_parser(["endnotes", "footnotes", "inline", "parenthesized", "named", "none"]),
        )
        .arg(
            clap::arg!(--spacing <SPACING> "Blank-line policy")
                .value_name("SPACING")
                .value_parser(["standard", "compact"]),
        )
        .arg(clap::arg!(--priority <ORDER> "Strategy order, e.g. \"direct,export,copy\"").value_name("ORDER"))
        .arg(clap::arg!(--title <TITLE> "Document title, written as an H1 heading"))
        .arg(clap::arg!(--frontmatter "Include TOML frontmatter"))
        .arg(clap::arg!(--no_role_headings "Write turns without User/Assistant headings"))
        .arg(
            clap::arg!(-o --output <FILE> "Output file (default: stdout, or the stored preference)")
                .value_name("FILE")
                .value_parser(clap::value_parser!(std::path::PathBuf)),
        )
        .arg(
            clap::arg!(--config <FILE> "Preferences file")
                .value_name("FILE")
                .value_parser(clap::value_parser!(std::path::PathBuf)),
        )
        .arg(
            clap::arg!(--profile <FILE> "Markup profile JSON overriding the default selectors")
                .value_name("FILE")
                .value_parser(clap::value_parser!(std::path::PathBuf)),
        )
        .arg(clap::arg!(-v --verbose "Enable debug logging"));

    clap_complete::generate_to(clap_complete::shells::Bash, &mut cmd, "threadmark", &completions_dir).unwrap();
    clap_complete::generate_to(clap_complete::shells::Zsh, &mut cmd, "threadmark", &completions_dir).unwrap();
    clap_complete::generate_to(clap_complete::shells::Fish, &mut cmd, "threadmark", &completions_dir).unwrap();
    clap_complete::generate_to(clap_complete::shells::PowerShell, &mut cmd, "threadmark", &completions_dir).unwrap();

    println!(
        "cargo:warning=Shell completions generated in: {}",
        completions_dir.display()
    );
}
