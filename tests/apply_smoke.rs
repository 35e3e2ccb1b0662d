use std::process::Command;

use assert_cmd::prelude::*;
use assert_fs::prelude::*;
use predicates::prelude::*;

/// Build a hermetic fixture: mapping files plus a small source tree.
fn make_fixture() -> assert_fs::TempDir {
    let tmp = assert_fs::TempDir::new().expect("tempdir");

    tmp.child("mappings/fields.csv")
        .write_str(
            "searge,name,side,desc\r\nfield_1000_a,maxHealth,2,Maximum health of the entity.\r\nfield_1001_b,stepHeight,0,\r\n",
        )
        .expect("write fields.csv");
    tmp.child("mappings/methods.csv")
        .write_str(
            "searge,name,side,desc\r\nfunc_2000_a,getHealth,2,\"Returns the health.\\nNever negative.\"\r\n",
        )
        .expect("write methods.csv");
    tmp.child("mappings/params.csv")
        .write_str("param,name,side\r\np_entity_1_,entityIn,2\r\n")
        .expect("write params.csv");

    tmp.child("input/net/Entity.java")
        .write_str(
            "public class Entity {\r\n    public int field_1000_a = 20;\r\n\r\n    public int func_2000_a(int p_entity_1_) {\r\n        return field_1000_a + p_entity_1_;\r\n    }\r\n\r\n    @Override\r\n    public int func_2000_a() {\r\n        return 0;\r\n    }\r\n}\r\n",
        )
        .expect("write Entity.java");
    tmp.child("input/docs/readme.txt")
        .write_str("plain mirrored file\r\n")
        .expect("write readme.txt");

    tmp
}

fn apply_cmd(tmp: &assert_fs::TempDir) -> Command {
    let mut cmd = Command::cargo_bin("srcremap").expect("bin");
    cmd.current_dir(tmp.path())
        .arg("apply")
        .args(["--csv-dir", "mappings"])
        .args(["--src-dir", "input"])
        .args(["--out-dir", "output"])
        .args(["--project-type", "joined"])
        .arg("--quiet");
    cmd
}

#[test]
fn test_apply_rewrites_and_mirrors() {
    let tmp = make_fixture();

    apply_cmd(&tmp).assert().success();

    // Renames, injected field documentation, exact layout preserved
    tmp.child("output/net/Entity.java").assert(predicate::str::contains(
        "    /**\r\n     * Maximum health of the entity.\r\n     */\r\n    public int maxHealth = 20;",
    ));

    // Method documentation came quoted with an embedded \n sequence
    tmp.child("output/net/Entity.java").assert(predicate::str::contains(
        "    /**\r\n     * Returns the health.\r\n     * Never negative.\r\n     */\r\n    public int getHealth(int entityIn) {",
    ));

    // References inside the body are renamed without documentation
    tmp.child("output/net/Entity.java")
        .assert(predicate::str::contains("return maxHealth + entityIn;"));

    // The overriding declaration is renamed but stays undocumented
    tmp.child("output/net/Entity.java").assert(predicate::str::contains(
        "    @Override\r\n    public int getHealth() {",
    ));

    // Unrelated files are mirrored byte for byte
    tmp.child("output/docs/readme.txt")
        .assert("plain mirrored file\r\n");
}

#[test]
fn test_apply_fails_without_mapping_files() {
    let tmp = assert_fs::TempDir::new().expect("tempdir");
    tmp.child("mappings/.keep").write_str("").expect("seed");
    tmp.child("input/a.txt").write_str("x").expect("seed");

    apply_cmd(&tmp)
        .assert()
        .failure()
        .stderr(predicate::str::contains("mapping files"));
}

#[test]
fn test_apply_rejects_nested_output_directory() {
    let tmp = make_fixture();

    let mut cmd = Command::cargo_bin("srcremap").expect("bin");
    cmd.current_dir(tmp.path())
        .arg("apply")
        .args(["--csv-dir", "mappings"])
        .args(["--src-dir", "input"])
        .args(["--out-dir", "input/output"])
        .arg("--quiet");

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("overlap"));
}

#[test]
fn test_dry_run_creates_no_output() {
    let tmp = make_fixture();

    let mut cmd = apply_cmd(&tmp);
    cmd.arg("--dry-run");
    cmd.assert().success();

    tmp.child("output").assert(predicate::path::missing());
}

#[test]
fn test_config_file_supplies_directories() {
    let tmp = make_fixture();
    tmp.child("srcremap.toml")
        .write_str(
            "csv_dir = \"mappings\"\nsrc_dir = \"input\"\nout_dir = \"output\"\nproject_type = \"joined\"\n",
        )
        .expect("write config");

    let mut cmd = Command::cargo_bin("srcremap").expect("bin");
    cmd.current_dir(tmp.path()).arg("apply").arg("--quiet");
    cmd.assert().success();

    tmp.child("output/docs/readme.txt")
        .assert("plain mirrored file\r\n");
}
