mod common;

use assert_cmd::Command;
use common::{TestWorkspace, fixture_path};
use predicates::prelude::*;
use predicates::str::contains;
use serde_json::Value;

fn data_dir() -> String {
    fixture_path("customers.csv")
        .parent()
        .expect("fixture dir")
        .display()
        .to_string()
}

/// Runs the binary from an empty scratch directory so no stray config file
/// is picked up.
fn catalogue_cmd(workspace: &TestWorkspace) -> Command {
    let mut cmd = Command::cargo_bin("csv-catalogue").expect("binary exists");
    cmd.current_dir(workspace.path());
    cmd
}

#[test]
fn methods_lists_every_comparison_method() {
    let workspace = TestWorkspace::new();
    catalogue_cmd(&workspace)
        .arg("methods")
        .assert()
        .success()
        .stdout(contains("exact-value-match"))
        .stdout(contains("time-series-alignment"))
        .stdout(contains("name-jaro-winkler"));
}

#[test]
fn list_shows_catalogued_files_from_data_dir() {
    let workspace = TestWorkspace::new();
    catalogue_cmd(&workspace)
        .args(["list", "--data-dir", &data_dir()])
        .assert()
        .success()
        .stdout(contains("customers.csv"))
        .stdout(contains("orders.csv"));
}

#[test]
fn config_file_in_working_directory_supplies_data_dir() {
    let workspace = TestWorkspace::new();
    workspace.write(
        "catalogue.yml",
        &format!("data_dir: {:?}\nsample_rows: 0\n", data_dir()),
    );
    catalogue_cmd(&workspace)
        .arg("list")
        .assert()
        .success()
        .stdout(contains("customers.csv"));
}

#[test]
fn invalid_config_is_reported() {
    let workspace = TestWorkspace::new();
    workspace.write("catalogue.yml", "data_folder: somewhere\n");
    catalogue_cmd(&workspace)
        .arg("methods")
        .assert()
        .failure()
        .stderr(contains("Resolving catalogue configuration"));
}

#[test]
fn overview_resolves_names_against_data_dir() {
    let workspace = TestWorkspace::new();
    catalogue_cmd(&workspace)
        .args([
            "overview",
            "-f",
            "customers.csv",
            "--rows",
            "2",
            "--data-dir",
            &data_dir(),
        ])
        .assert()
        .success()
        .stdout(contains("Rows: 5  Columns: 4"))
        .stdout(contains("lifetime_value"))
        .stdout(contains("Grace Hopper"))
        .stdout(contains("Alan Turing").not());
}

#[test]
fn columns_reports_types_and_kinds() {
    let workspace = TestWorkspace::new();
    catalogue_cmd(&workspace)
        .args(["columns", "-f", "orders.csv", "--data-dir", &data_dir()])
        .assert()
        .success()
        .stdout(contains("ordered_on"))
        .stdout(contains("datetime"))
        .stdout(contains("No relationships recorded."));
}

#[test]
fn compare_prints_grid_and_committed_relationships() {
    let workspace = TestWorkspace::new();
    catalogue_cmd(&workspace)
        .args([
            "compare",
            "--data-dir",
            &data_dir(),
            "--origin",
            "orders.csv",
            "--target",
            "customers.csv",
            "-m",
            "exact-value-match",
            "--hide-origin",
            "ordered_on,total",
            "--approve",
            "customer:customer_id",
        ])
        .assert()
        .success()
        .stdout(contains("customer_id"))
        .stdout(contains("60.00"))
        .stdout(contains("customer -> customer_id: recorded"))
        .stdout(contains("moderate"));
}

#[test]
fn compare_json_carries_scores_and_approvals() {
    let workspace = TestWorkspace::new();
    let output = catalogue_cmd(&workspace)
        .args([
            "compare",
            "--data-dir",
            &data_dir(),
            "--origin",
            "orders.csv",
            "--target",
            "customers.csv",
            "--method",
            "exact-value-match=2",
            "--hide-origin",
            "ordered_on,total",
            "--hide-target",
            "signup_date,lifetime_value",
            "--approve",
            "customer:customer_id",
            "--json",
        ])
        .output()
        .expect("run compare");
    assert!(output.status.success());
    let report: Value = serde_json::from_slice(&output.stdout).expect("json report");

    assert_eq!(report["origin_columns"], serde_json::json!(["order_id", "customer"]));
    assert_eq!(
        report["target_columns"],
        serde_json::json!(["customer_id", "full_name"])
    );
    assert_eq!(report["scores"]["customer"]["customer_id"], serde_json::json!(60.0));
    assert_eq!(report["methods"][0]["weight"], serde_json::json!(2));
    assert_eq!(report["approvals"][0]["outcome"], serde_json::json!("recorded"));
    assert_eq!(report["approvals"][0]["certainty"], serde_json::json!(60.0));
}

#[test]
fn compare_rejects_unknown_methods_and_unscored_approvals() {
    let workspace = TestWorkspace::new();
    catalogue_cmd(&workspace)
        .args([
            "compare",
            "--data-dir",
            &data_dir(),
            "--origin",
            "orders.csv",
            "--target",
            "customers.csv",
            "-m",
            "fuzzy",
        ])
        .assert()
        .failure()
        .stderr(contains("Unknown comparison method 'fuzzy'"));

    catalogue_cmd(&workspace)
        .args([
            "compare",
            "--data-dir",
            &data_dir(),
            "--origin",
            "orders.csv",
            "--target",
            "customers.csv",
            "--approve",
            "customer:customer_id",
        ])
        .assert()
        .failure()
        .stderr(contains("has no score"));
}

#[test]
fn generate_writes_spread_files_that_list_picks_up() {
    let workspace = TestWorkspace::new();
    let data = workspace.path().join("generated");
    let data_dir = data.display().to_string();
    catalogue_cmd(&workspace)
        .args([
            "generate",
            "--data-dir",
            &data_dir,
            "--name",
            "spam",
            "--rows",
            "6",
            "--index",
            "datetime",
            "--continuous",
            "2",
            "--categoric",
            "1",
            "--spread",
            "2",
            "--seed",
            "11",
        ])
        .assert()
        .success()
        .stdout(contains("spam_1.csv"))
        .stdout(contains("index, continuous_2"));

    let first = std::fs::read_to_string(data.join("spam_1.csv")).expect("first file");
    assert!(first.starts_with("index,continuous_1,categoric_1\n2020-01-01 00:00:00,"));
    assert_eq!(first.lines().count(), 7);

    catalogue_cmd(&workspace)
        .args(["list", "--data-dir", &data_dir])
        .assert()
        .success()
        .stdout(contains("spam_1.csv"))
        .stdout(contains("spam_2.csv"));
}

#[test]
fn generate_rejects_names_outside_the_data_dir() {
    let workspace = TestWorkspace::new();
    catalogue_cmd(&workspace)
        .args([
            "generate",
            "--data-dir",
            &workspace.path().join("generated").display().to_string(),
            "--name",
            "../escape.csv",
        ])
        .assert()
        .failure()
        .stderr(contains("must be a plain name"));
}
