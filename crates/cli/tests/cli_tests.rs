//! CLI integration tests
use predicates::prelude::*;
use tempfile::TempDir;

fn cmd() -> assert_cmd::Command {
    assert_cmd::cargo::cargo_bin_cmd!("threadmark")
}

fn get_fixture_path(name: &str) -> String {
    format!("../../tests/fixtures/{}", name)
}

fn absolute_fixture_path(name: &str) -> String {
    std::fs::canonicalize(get_fixture_path(name))
        .unwrap()
        .display()
        .to_string()
}

#[test]
fn test_cli_snapshot_input() {
    cmd()
        .arg(get_fixture_path("thread.html"))
        .assert()
        .success()
        .stdout(predicate::str::starts_with("## User\n\n"))
        .stdout(predicate::str::contains(
            "([1](https://doc.rust-lang.org/book/ch04-01-what-is-ownership.html#ownership-rules))",
        ));
}

#[test]
fn test_cli_stdin_input() {
    let html = std::fs::read_to_string(get_fixture_path("thread.html")).unwrap();
    cmd()
        .args(["--style", "endnotes", "-"])
        .write_stdin(html)
        .assert()
        .success()
        .stdout(predicate::str::ends_with(
            "[3] https://doc.rust-lang.org/book/ch04-02-references-and-borrowing.html\n",
        ));
}

#[test]
fn test_cli_export_input() {
    cmd()
        .args(["--export", "--style", "footnotes", &get_fixture_path("export.md")])
        .assert()
        .success()
        .stdout(predicate::str::contains("Moves transfer ownership[^2][^3][^4]"))
        .stdout(predicate::str::contains(
            "[^5]: https://doc.rust-lang.org/book/ch04-02-references-and-borrowing.html",
        ))
        .stdout(predicate::str::contains("unused.example.com").not());
}

#[test]
fn test_cli_research_export() {
    cmd()
        .args(["--export", "--research", "--style", "endnotes", &get_fixture_path("research.md")])
        .assert()
        .success()
        .stdout(predicate::str::contains("## Adoption"))
        .stdout(predicate::str::contains("[3] https://kernel.example.org/rust"));
}

#[test]
fn test_cli_research_requires_export() {
    cmd()
        .args(["--research", &get_fixture_path("research.md")])
        .assert()
        .failure();
}

#[test]
fn test_cli_capture_replay() {
    cmd()
        .args(["--capture", &get_fixture_path("export.md"), "--style", "endnotes"])
        .arg(get_fixture_path("thread.html"))
        .assert()
        .success()
        .stdout(predicate::str::contains("[3] https://blog.example.org/moves"));
}

#[test]
fn test_cli_capture_seeds_direct_scan() {
    cmd()
        .args(["--priority", "direct,export,copy", "--style", "endnotes"])
        .args(["--capture", &get_fixture_path("export.md")])
        .arg(get_fixture_path("thread.html"))
        .assert()
        .success()
        .stdout(predicate::str::contains("Moves transfer ownership[2][3][4]"))
        .stdout(predicate::str::contains("[4] https://forum.example.net/t/ownership"));
}

#[test]
fn test_cli_invalid_priority() {
    cmd()
        .args(["--priority", "direct,direct,copy", &get_fixture_path("thread.html")])
        .assert()
        .failure()
        .stderr(predicate::str::contains("strategy"));
}

#[test]
fn test_cli_invalid_style() {
    cmd()
        .args(["--style", "apa", &get_fixture_path("thread.html")])
        .assert()
        .failure();
}

#[test]
fn test_cli_output_file() {
    let tmp = TempDir::new().unwrap();
    let output = tmp.path().join("output.md");

    cmd()
        .args(["-o", output.to_str().unwrap()])
        .arg(get_fixture_path("thread.html"))
        .assert()
        .success()
        .stderr(predicate::str::contains("Output written to"));

    let written = std::fs::read_to_string(&output).unwrap();
    assert!(written.contains("## Assistant"));
}

#[test]
fn test_cli_frontmatter_and_title() {
    cmd()
        .args(["--frontmatter", "--title", "Rust ownership", &get_fixture_path("thread.html")])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("+++\ntitle = \"Rust ownership\""))
        .stdout(predicate::str::contains("citation_style = \"parenthesized\""))
        .stdout(predicate::str::contains("# Rust ownership\n"));
}

#[test]
fn test_cli_no_role_headings() {
    cmd()
        .args(["--no-role-headings", &get_fixture_path("thread.html")])
        .assert()
        .success()
        .stdout(predicate::str::contains("## User").not());
}

#[test]
fn test_cli_compact_spacing() {
    cmd()
        .args(["--spacing", "compact", "--no-role-headings", "--export", &get_fixture_path("export.md")])
        .assert()
        .success()
        .stdout(predicate::str::contains("\n\n\n").not());
}

#[test]
fn test_cli_config_file() {
    let tmp = TempDir::new().unwrap();
    let config = tmp.path().join("preferences.json");
    std::fs::write(&config, r#"{ "citation_style": "footnotes", "output": "stdout" }"#).unwrap();

    cmd()
        .args(["--config", config.to_str().unwrap(), &get_fixture_path("thread.html")])
        .assert()
        .success()
        .stdout(predicate::str::contains("[^1]: https://doc.rust-lang.org/"));
}

#[test]
fn test_cli_config_file_output() {
    let tmp = TempDir::new().unwrap();
    let config = tmp.path().join("preferences.json");
    std::fs::write(&config, r#"{ "output": "file" }"#).unwrap();

    cmd()
        .current_dir(tmp.path())
        .args(["--config", config.to_str().unwrap(), "--title", "Rust ownership"])
        .arg(absolute_fixture_path("thread.html"))
        .assert()
        .success();

    assert!(tmp.path().join("rust-ownership.md").exists());
}

#[test]
fn test_cli_missing_config() {
    cmd()
        .args(["--config", "nonexistent.json", &get_fixture_path("thread.html")])
        .assert()
        .failure()
        .stderr(predicate::str::contains("preferences"));
}

#[test]
fn test_cli_invalid_profile() {
    let tmp = TempDir::new().unwrap();
    let profile = tmp.path().join("profile.json");
    std::fs::write(&profile, r#"{ "user_block": "[[broken" }"#).unwrap();

    cmd()
        .args(["--profile", profile.to_str().unwrap(), &get_fixture_path("thread.html")])
        .assert()
        .failure();
}

#[test]
fn test_cli_no_content() {
    let tmp = TempDir::new().unwrap();
    let page = tmp.path().join("empty.html");
    std::fs::write(&page, "<html><body><p>Nothing to see</p></body></html>").unwrap();

    cmd()
        .arg(page.to_str().unwrap())
        .assert()
        .failure()
        .stderr(predicate::str::contains("no content found"));
}

#[test]
fn test_cli_invalid_file() {
    cmd().arg("nonexistent.html").assert().failure();
}

#[test]
fn test_cli_verbose() {
    cmd()
        .args(["-v", &get_fixture_path("thread.html")])
        .assert()
        .success()
        .stderr(predicate::str::contains("Threadmark"));
}

#[test]
fn test_cli_verbose_logs_output_sink() {
    cmd()
        .args(["-v", &get_fixture_path("thread.html")])
        .assert()
        .success()
        .stderr(predicate::str::contains("writing document"));
}
