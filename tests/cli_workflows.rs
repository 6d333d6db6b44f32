use fabtrack::catalog::task_id_for;
use predicates::str::contains;

mod support;
use support::TestDir;

#[test]
fn dependency_gate_blocks_until_prerequisite_passes() {
    let dir = TestDir::new();
    dir.cmd().arg("init").assert().success();

    // TC-CON-001 depends on TC-ACC-001, which is still T.B.E.
    dir.cmd()
        .args(["task", "check", "TC-CON-001", "--json"])
        .assert()
        .success()
        .stdout(contains("\"applied\": []"))
        .stdout(contains("blocked by unmet prerequisites"));

    dir.cmd()
        .args(["test", "set", "TC-ACC-001", "pass"])
        .assert()
        .success();

    dir.cmd()
        .args(["task", "check", "TC-CON-001", "--json"])
        .assert()
        .success()
        .stdout(contains("north-it"));

    let task_id = task_id_for("Verify fabric connectivity end to end");
    let cached = dir.read_cache().expect("cache written");
    assert!(cached.fabric_states["north-it"][&task_id]);
    assert!(cached.fabric_completion_dates["north-it"].contains_key(&task_id));
}

#[test]
fn fabric_switch_changes_the_status_target() {
    let dir = TestDir::new();
    dir.cmd().arg("init").assert().success();

    dir.cmd()
        .args(["fabric", "switch", "south-ot"])
        .assert()
        .success();

    dir.cmd()
        .args(["status", "--json"])
        .assert()
        .success()
        .stdout(contains("\"fabricId\": \"south-ot\""));
}

#[test]
fn notes_feed_the_weekly_report() {
    let dir = TestDir::new();
    dir.cmd().arg("init").assert().success();

    dir.cmd()
        .args(["task", "note", "TC-CON-001", "waiting on cabling"])
        .assert()
        .success();

    // The task is still open, so the note lands in the in-progress bucket.
    dir.cmd()
        .args(["week", "--json"])
        .assert()
        .success()
        .stdout(contains("\"weekStart\""))
        .stdout(contains("\"inProgress\""))
        .stdout(contains("Verify fabric connectivity end to end"));
}

#[test]
fn completed_lists_checked_tasks_across_fabrics() {
    let dir = TestDir::new();
    dir.cmd().arg("init").assert().success();

    dir.cmd()
        .args(["task", "check", "TC-ACC-001"])
        .assert()
        .success();
    dir.cmd()
        .args(["task", "check", "TC-ACC-001", "--fabric", "tertiary-it"])
        .assert()
        .success();

    dir.cmd()
        .args(["completed", "--json"])
        .assert()
        .success()
        .stdout(contains("\"completedAt\""))
        .stdout(contains("north-it"))
        .stdout(contains("tertiary-it"))
        .stdout(contains("Configure fabric access policies"));
}

#[test]
fn clone_copies_overlay_onto_target_fabric() {
    let dir = TestDir::new();
    dir.cmd().arg("init").assert().success();

    dir.cmd()
        .args(["task", "check", "TC-ACC-001"])
        .assert()
        .success();
    dir.cmd()
        .args(["task", "note", "TC-ACC-001", "done in lab"])
        .assert()
        .success();

    dir.cmd()
        .args(["task", "clone", "TC-ACC-001", "--to", "south-it"])
        .assert()
        .success();

    let task_id = task_id_for("Configure fabric access policies");
    let cached = dir.read_cache().expect("cache written");
    assert!(cached.fabric_states["south-it"][&task_id]);
    assert_eq!(cached.fabric_notes["south-it"][&task_id], "done in lab");
    // The source completion date is carried, not re-stamped.
    assert_eq!(
        cached.fabric_completion_dates["south-it"][&task_id],
        cached.fabric_completion_dates["north-it"][&task_id]
    );
}

#[test]
fn checklist_save_list_delete_round_trip() {
    let dir = TestDir::new();
    dir.cmd().arg("init").assert().success();

    dir.cmd()
        .args(["task", "check", "TC-ACC-001"])
        .assert()
        .success();

    dir.cmd()
        .args([
            "checklist",
            "save",
            "Phase1",
            "--tasks",
            "TC-ACC-001,TC-CON-001",
        ])
        .assert()
        .success();

    dir.cmd()
        .args(["checklist", "list", "--json"])
        .assert()
        .success()
        .stdout(contains("Phase1"))
        .stdout(contains("\"items\": 2"))
        .stdout(contains("\"checked\": 1"));

    dir.cmd()
        .args(["checklist", "delete", "Phase1"])
        .assert()
        .success();
    dir.cmd()
        .args(["checklist", "list", "--json"])
        .assert()
        .success()
        .stdout(contains("\"data\": []"));
}

#[test]
fn comment_mentions_are_extracted() {
    let dir = TestDir::new();
    dir.cmd().arg("init").assert().success();

    dir.cmd()
        .args([
            "comment",
            "add",
            "TC-ACC-001",
            "cc @[Alice](user-2) please verify",
            "--json",
        ])
        .assert()
        .success()
        .stdout(contains("user-2"));
}

#[test]
fn comments_and_notifications_survive_across_invocations() {
    let dir = TestDir::new();
    dir.cmd().arg("init").assert().success();

    dir.cmd()
        .args([
            "comment",
            "add",
            "TC-ACC-001",
            "ping @[Jordan](user-2) before cutover",
        ])
        .assert()
        .success();

    // A separate invocation still sees the thread and the mention.
    dir.cmd()
        .args(["comment", "list", "TC-ACC-001", "--json"])
        .assert()
        .success()
        .stdout(contains("ping @[Jordan](user-2) before cutover"));
    dir.cmd()
        .args(["notify", "list", "--json"])
        .assert()
        .success()
        .stdout(contains("user-2"));

    // Clearing persists too.
    dir.cmd().args(["notify", "clear"]).assert().success();
    dir.cmd()
        .args(["notify", "list", "--json"])
        .assert()
        .success()
        .stdout(contains("\"data\": []"));
}

#[test]
fn task_add_appends_to_the_catalog_file() {
    let dir = TestDir::new();
    dir.cmd().arg("init").assert().success();

    let text = "Validate NTP sync on leaf switches";
    dir.cmd()
        .args([
            "task",
            "add",
            text,
            "--section",
            "section1",
            "--subsection",
            "Non-Technical Tasks",
            "--json",
        ])
        .assert()
        .success()
        .stdout(contains(task_id_for(text)));

    let catalog = std::fs::read_to_string(dir.path().join("catalog.json")).unwrap();
    assert!(catalog.contains(text));

    dir.cmd()
        .args(["task", "list", "--json"])
        .assert()
        .success()
        .stdout(contains(text));
}

#[test]
fn sync_pushes_edits_and_a_fresh_workspace_pulls_them() {
    let dir = TestDir::new();
    let share = dir.share_dir();
    dir.write_config(&format!(
        "[sync]\nremote_dir = \"{}\"\n",
        share.display()
    ));
    dir.cmd().arg("init").assert().success();

    dir.cmd()
        .args(["task", "check", "TC-ACC-001"])
        .assert()
        .success();

    dir.cmd()
        .args(["sync", "--json"])
        .assert()
        .success()
        .stdout(contains("\"mode\": \"push\""))
        .stdout(contains("\"pushed\": true"));
    assert!(share.join("snapshot.json").exists());

    // Nothing changed, so a second sync is a no-op.
    dir.cmd()
        .args(["sync", "--json"])
        .assert()
        .success()
        .stdout(contains("\"pushed\": false"));

    // A fresh workspace pointed at the same share pulls the state.
    let other = TestDir::new();
    other.write_config(&format!(
        "[sync]\nremote_dir = \"{}\"\n",
        share.display()
    ));
    other
        .cmd()
        .args(["sync", "--json"])
        .assert()
        .success()
        .stdout(contains("\"mode\": \"pull\""));

    let task_id = task_id_for("Configure fabric access policies");
    let cached = other.read_cache().expect("cache pulled");
    assert!(cached.fabric_states["north-it"][&task_id]);
}
