#![allow(clippy::expect_used, clippy::unwrap_used)]

use assert_cmd::Command;
use std::path::PathBuf;
use std::time::Duration;
use tempfile::TempDir;

pub const CMD_TIMEOUT: Duration = Duration::from_secs(15);

const FIXTURES: &str = r#"
[pies]
primary_key = "id"
rows = [
    { id = 1, filling = "Tasty beef steak" },
    { id = 2, filling = "Tasty mushrooms with tarragon" },
    { id = 3, filling = "Mince" },
]

[ingredients]
rows = [
    { id = 1, pie_id = 1, name = "Beef" },
    { id = 2, pie_id = 2, name = "Mushrooms" },
    { id = 3, pie_id = 1, name = "Pastry" },
]
"#;

const CONFIG: &str = r#"
[[entity]]
name = "ConstantNamedPie"
table = "pies"

[entity.options]
name = "filling"

[[entity]]
name = "ConstantLongNamedPie"
table = "pies"

[entity.options]
name = "filling"
name_prefix = "a_"
name_suffix = "_pie"
"#;

/// Fixture and config files in a scratch directory.
pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("failed to create scratch dir");
        std::fs::write(dir.path().join("pies.toml"), FIXTURES).unwrap();
        std::fs::write(dir.path().join("constcache.toml"), CONFIG).unwrap();
        Self { dir }
    }

    pub fn fixtures(&self) -> PathBuf {
        self.dir.path().join("pies.toml")
    }

    pub fn config(&self) -> PathBuf {
        self.dir.path().join("constcache.toml")
    }

    /// A `constcache` command wired to this workspace's files.
    pub fn cmd(&self) -> Command {
        let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("constcache"));
        cmd.timeout(CMD_TIMEOUT);
        cmd.env("NO_COLOR", "1");
        cmd.env_remove("CONSTCACHE_FIXTURES");
        cmd.env_remove("CONSTCACHE_CONFIG");
        cmd.arg("--fixtures").arg(self.fixtures());
        cmd.arg("--config").arg(self.config());
        cmd
    }
}
