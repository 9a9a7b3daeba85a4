use assert_cmd::cargo_bin;
use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::path::Path;
use std::process::Command;
use tempfile::tempdir;

fn shipdesk(session_file: &Path) -> Command {
    let mut cmd = Command::new(cargo_bin!("shipdesk"));
    for var in [
        "SHIPDESK_DB_PATH",
        "SHIPDESK_PAYMENT_SUCCESS_RATE",
        "SHIPDESK_LATENCY_MS",
        "SHIPDESK_CURRENCY",
        "RUST_LOG",
    ] {
        cmd.env_remove(var);
    }
    cmd.arg("--session-file").arg(session_file);
    cmd
}

fn sign_in(session_file: &Path, email: &str, password: &str) {
    shipdesk(session_file)
        .args(["sign-in", "--email", email, "--password", password])
        .assert()
        .success();
}

#[test]
fn test_track_seeded_shipment() {
    let dir = tempdir().unwrap();
    shipdesk(&dir.path().join("session.json"))
        .args(["track", "SA123456789"])
        .assert()
        .success()
        .stdout(predicate::str::contains("SA123456789 in_transit"))
        .stdout(predicate::str::contains("event_time,status,description,location"))
        .stdout(predicate::str::contains("Package in transit to destination"));
}

#[test]
fn test_track_unknown_code_fails() {
    let dir = tempdir().unwrap();
    shipdesk(&dir.path().join("session.json"))
        .args(["track", "SA000000000"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Tracking code not found"));
}

#[test]
fn test_session_lifecycle() {
    let dir = tempdir().unwrap();
    let session = dir.path().join("session.json");

    shipdesk(&session)
        .arg("whoami")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Not signed in"));

    shipdesk(&session)
        .args(["sign-in", "--email", "customer@example.com", "--password", "wrong"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid email or password"));
    assert!(!session.exists());

    sign_in(&session, "customer@example.com", "customer123");
    shipdesk(&session)
        .arg("whoami")
        .assert()
        .success()
        .stdout(predicate::str::contains("John Doe <customer@example.com> (customer)"));

    shipdesk(&session).arg("sign-out").assert().success();
    shipdesk(&session).arg("sign-out").assert().success();
    shipdesk(&session).arg("whoami").assert().failure();
}

#[test]
fn test_corrupted_session_reads_as_signed_out() {
    let dir = tempdir().unwrap();
    let session = dir.path().join("session.json");
    std::fs::write(&session, "{\"version\":9,").unwrap();

    shipdesk(&session)
        .arg("whoami")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Not signed in"));
    assert!(!session.exists());
}

#[test]
fn test_create_charges_default_card() {
    let dir = tempdir().unwrap();
    let session = dir.path().join("session.json");
    sign_in(&session, "customer@example.com", "customer123");

    shipdesk(&session)
        .args([
            "--payment-success-rate",
            "1.0",
            "create",
            "--sender-name",
            "John Doe",
            "--sender-address",
            "123 Business St, New York, NY 10001",
            "--recipient-name",
            "Carol White",
            "--recipient-address",
            "9 Harbor Rd, Boston, MA 02110",
            "--weight",
            "5.5",
            "--service",
            "express",
        ])
        .assert()
        .success()
        .stdout(predicate::str::is_match(r"Created SA\d{9} for 19\.00 \(payment pay_\d{10}\)").unwrap());
}

#[test]
fn test_declined_create_reports_gateway_message() {
    let dir = tempdir().unwrap();
    let session = dir.path().join("session.json");
    sign_in(&session, "customer@example.com", "customer123");

    shipdesk(&session)
        .args([
            "--payment-success-rate",
            "0",
            "create",
            "--sender-name",
            "John Doe",
            "--sender-address",
            "123 Business St",
            "--recipient-name",
            "Carol White",
            "--recipient-address",
            "9 Harbor Rd",
            "--weight",
            "1",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "Payment failed. Please try again or use a different payment method.",
        ));
}

#[test]
fn test_admin_commands_require_admin() {
    let dir = tempdir().unwrap();
    let session = dir.path().join("session.json");
    sign_in(&session, "customer@example.com", "customer123");

    for args in [
        vec!["stats"],
        vec!["customers"],
        vec!["update-status", "SA456789123", "picked_up"],
    ] {
        shipdesk(&session)
            .args(&args)
            .assert()
            .failure()
            .stderr(predicate::str::contains("requires the admin role"));
    }
}

#[test]
fn test_admin_views() {
    let dir = tempdir().unwrap();
    let session = dir.path().join("session.json");
    sign_in(&session, "admin@shippingagency.com", "admin123");

    shipdesk(&session)
        .args(["customers", "--query", "jane"])
        .assert()
        .success()
        .stdout(predicate::str::contains("jane.smith@company.com,Jane Smith"))
        .stdout(predicate::str::contains("bob.wilson").not());

    shipdesk(&session)
        .args(["shipments", "--status", "delivered"])
        .assert()
        .success()
        .stdout(predicate::str::contains("SA987654321"))
        .stdout(predicate::str::contains("SA123456789").not());

    shipdesk(&session)
        .arg("stats")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"total_shipments\": 3"));

    shipdesk(&session)
        .args(["update-status", "SA456789123", "delivered"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Cannot move shipment from pending to delivered"));

    shipdesk(&session)
        .args(["update-status", "SA456789123", "picked_up", "--location", "Miami, FL"])
        .assert()
        .success()
        .stdout(predicate::str::contains("SA456789123 is now picked_up"));
}

#[test]
fn test_short_card_rejected() {
    let dir = tempdir().unwrap();
    let session = dir.path().join("session.json");
    sign_in(&session, "customer@example.com", "customer123");

    shipdesk(&session)
        .args([
            "add-card",
            "--number",
            "424242424242424",
            "--exp-month",
            "4",
            "--exp-year",
            "2030",
            "--cvc",
            "123",
            "--name",
            "John Doe",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid card number"));
}

#[test]
fn test_binary_session_file_reads_as_signed_out() {
    let dir = tempdir().unwrap();
    let session = dir.path().join("session.json");
    std::fs::write(&session, [0xff, 0xfe, 0x00, 0x7b]).unwrap();

    shipdesk(&session)
        .arg("whoami")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Not signed in"));
    assert!(!session.exists());
}

#[test]
fn test_edited_role_does_not_grant_admin() {
    let dir = tempdir().unwrap();
    let session = dir.path().join("session.json");
    sign_in(&session, "customer@example.com", "customer123");

    let raw = std::fs::read_to_string(&session).unwrap();
    let mut state: serde_json::Value = serde_json::from_str(&raw).unwrap();
    state["user"]["role"] = serde_json::Value::from("admin");
    std::fs::write(&session, state.to_string()).unwrap();

    shipdesk(&session)
        .arg("stats")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Not signed in"));
}
