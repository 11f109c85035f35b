use assert_cmd::cargo_bin_cmd;

/// Directory containing aggregated profiles for the test inputs
#[allow(dead_code)]
pub const PROFILES_DIR: &str = "tests/data/profiles";

/// Run flh-opt with the given arguments and check that it succeeds
#[allow(dead_code)]
pub fn assert_flh_opt_runs(args: &[&str]) {
    cargo_bin_cmd!("flh-opt")
        .env("FLH_OPT_USE_DEFAULT_SETTINGS", "1")
        .env("FLH_OPT_LOG_LEVEL", "off")
        .args(args)
        .assert()
        .success();
}

/// Run flh-opt with the given arguments and check that it fails
#[allow(dead_code)]
pub fn assert_flh_opt_fails(args: &[&str]) {
    cargo_bin_cmd!("flh-opt")
        .env("FLH_OPT_USE_DEFAULT_SETTINGS", "1")
        .env("FLH_OPT_LOG_LEVEL", "off")
        .args(args)
        .assert()
        .failure();
}

/// Run flh-opt with the given arguments and return what it printed to stdout
#[allow(dead_code)]
pub fn get_flh_opt_stdout(args: &[&str]) -> String {
    let output = cargo_bin_cmd!("flh-opt")
        .env("FLH_OPT_USE_DEFAULT_SETTINGS", "1")
        .env("FLH_OPT_LOG_LEVEL", "off")
        .args(args)
        .output()
        .unwrap();
    assert!(output.status.success());

    String::from_utf8(output.stdout).unwrap()
}
