// tests/common/mod.rs

//! Shared test utilities and helpers for integration tests.

#![allow(dead_code)]

use rosdep::installers::{DetectFn, InstallTemplate, PackageManagerInstaller};
use rosdep::{
    CommandRunner, FixedOs, InstallCommand, InstallerContext, Result, RosdepConfig,
    register_platforms,
};
use std::cell::RefCell;
use std::collections::BTreeSet;
use std::fs;
use std::io::Write;
use std::path::Path;
use std::rc::Rc;
use tempfile::TempDir;

const ROS_RULES: &str = r#"
python: {ubuntu: python3, debian: python3, arch: python}
libtool: {ubuntu: libtool, debian: libtool}
boost: {ubuntu: libboost-dev}
atlas: {ubuntu: libatlas-base-dev}
"#;

const STACK1_RULES: &str = r#"
stack1_dep1: {ubuntu: dep1-ubuntu, debian: dep1-debian}
stack1_dep2: {ubuntu: [dep2-ubuntu, shared]}
stack1_p1_dep1:
  ubuntu:
    apt:
      packages: shared
stack1_p2_dep1:
  ubuntu:
    jammy: p2dep1-jammy
    focal: p2dep1-focal
pydep:
  ubuntu:
    pip:
      packages: [requests]
      depends: [python]
boost: {ubuntu: libboost-local-dev}
"#;

const CYCLE_RULES: &str = r#"
cyc_a: {ubuntu: {pip: {packages: [a], depends: [cyc_b]}}}
cyc_b: {ubuntu: {pip: {packages: [b], depends: [cyc_a]}}}
"#;

const SHARED_DEP_RULES: &str = r#"
ka: {ubuntu: {pip: {packages: [ka-pkg], depends: [kc]}}}
kb: {ubuntu: {pip: {packages: [kb-pkg], depends: [kc]}}}
kc: {ubuntu: cpkg}
"#;

const OVERRIDE_RULES: &str = "atlas: {ubuntu: libatlas-custom}\n";

fn write_unit(root: &Path, name: &str, manifest: &str, rules: &str) {
    let dir = root.join(name);
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("stack.toml"), manifest).unwrap();
    fs::write(dir.join("rosdep.yaml"), rules).unwrap();
}

/// Create a package tree with several units and a per-user override file.
///
/// Returns (TempDir, config) - keep the TempDir alive to prevent cleanup.
pub fn setup_stack_tree() -> (TempDir, RosdepConfig) {
    let temp_dir = tempfile::tempdir().unwrap();
    let stacks = temp_dir.path().join("stacks");
    let home = temp_dir.path().join("home");

    write_unit(
        &stacks,
        "ros",
        "name = \"ros\"\n[packages]\nroslib = [\"python\", \"libtool\"]\n",
        ROS_RULES,
    );
    write_unit(
        &stacks,
        "stack1",
        r#"
name = "stack1"
depends = ["ros"]

[packages]
stack1_p1 = ["stack1_dep1", "stack1_p1_dep1"]
stack1_p2 = ["stack1_dep1", "stack1_dep2", "stack1_p2_dep1"]
pyapp = ["pydep"]
empty_package = []
"#,
        STACK1_RULES,
    );
    write_unit(
        &stacks,
        "twin1",
        "name = \"twin1\"\n",
        "twin: {ubuntu: a}\nsolo: {ubuntu: solo-pkg}\n",
    );
    write_unit(&stacks, "twin2", "name = \"twin2\"\n", "twin: {ubuntu: b}\n");
    write_unit(
        &stacks,
        "both",
        "name = \"both\"\ndepends = [\"twin1\", \"twin2\"]\n[packages]\nboth_p = [\"twin\"]\nboth_ok = [\"solo\"]\n",
        "",
    );
    write_unit(
        &stacks,
        "invalid",
        "name = \"invalid\"\n[packages]\ninvalid_p = [\"x\"]\n",
        "- not\n- a mapping\n",
    );
    write_unit(
        &stacks,
        "cyc",
        "name = \"cyc\"\n[packages]\ncyc_p = [\"cyc_a\"]\n",
        CYCLE_RULES,
    );

    write_unit(
        &stacks,
        "deps",
        "name = \"deps\"\n[packages]\ndeps_p = [\"ka\", \"kb\"]\n",
        SHARED_DEP_RULES,
    );

    fs::create_dir_all(&home).unwrap();
    fs::write(home.join("rosdep.yaml"), OVERRIDE_RULES).unwrap();

    let config = RosdepConfig {
        ros_home: Some(home),
        package_path: vec![stacks],
        ..RosdepConfig::default()
    };
    (temp_dir, config)
}

/// Context for Ubuntu 22.04 with the bundled platforms registered
pub fn ubuntu_context() -> InstallerContext {
    let mut context =
        InstallerContext::with_os_detect(Box::new(FixedOs::new("ubuntu", "22.04", "jammy")));
    register_platforms(&mut context).unwrap();
    context
}

/// Cloneable in-memory writer for capturing installer output
#[derive(Clone, Default)]
pub struct SharedWriter(pub Rc<RefCell<Vec<u8>>>);

impl SharedWriter {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.borrow()).into_owned()
    }
}

impl Write for SharedWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// In-memory package state shared by fake backends and the fake runner
#[derive(Clone, Default)]
pub struct FakeSystem {
    pub installed: Rc<RefCell<BTreeSet<String>>>,
    pub log: Rc<RefCell<Vec<String>>>,
    /// Packages whose install command fails
    pub failing: Rc<RefCell<BTreeSet<String>>>,
    /// Packages whose install command succeeds without installing anything
    pub broken: Rc<RefCell<BTreeSet<String>>>,
    /// Installer output, see [`FakeSystem::output`]
    pub output: SharedWriter,
    /// Per run command: whether it had been printed before it ran
    pub announced: Rc<RefCell<Vec<bool>>>,
}

impl FakeSystem {
    pub fn preinstall(&self, package: &str) {
        self.installed.borrow_mut().insert(package.to_string());
    }

    pub fn is_installed(&self, package: &str) -> bool {
        self.installed.borrow().contains(package)
    }

    pub fn commands(&self) -> Vec<String> {
        self.log.borrow().clone()
    }

    pub fn backend(&self, name: &str) -> PackageManagerInstaller {
        let installed = Rc::clone(&self.installed);
        let detect: DetectFn = Box::new(move |packages: &[String]| {
            let installed = installed.borrow();
            Ok(packages
                .iter()
                .filter(|p| installed.contains(*p))
                .cloned()
                .collect())
        });
        let program = format!("fake-{}", name);
        PackageManagerInstaller::new(
            name,
            detect,
            InstallTemplate::new(&[program.as_str(), "install"]).with_noninteractive_flag("-y"),
        )
    }

    /// Replace the apt and pip backends of `context` with fakes
    pub fn install_backends(&self, context: &mut InstallerContext) {
        context.set_installer("apt", Box::new(self.backend("apt")));
        context.set_installer("pip", Box::new(self.backend("pip").with_depends()));
    }

    /// Writer to hand to `RosdepInstaller::with_output`
    pub fn output(&self) -> Box<dyn Write> {
        Box::new(self.output.clone())
    }

    pub fn runner(&self) -> Box<dyn CommandRunner> {
        Box::new(FakeRunner {
            system: self.clone(),
        })
    }
}

struct FakeRunner {
    system: FakeSystem,
}

impl CommandRunner for FakeRunner {
    fn run(&self, command: &InstallCommand) -> Result<bool> {
        let text = command.to_string();
        let printed = self.system.output.contents().contains(&text);
        self.system.announced.borrow_mut().push(printed);
        self.system.log.borrow_mut().push(text);

        let packages: Vec<&String> = command
            .args()
            .iter()
            .filter(|arg| arg.as_str() != "install" && !arg.starts_with('-'))
            .collect();

        if packages
            .iter()
            .any(|p| self.system.failing.borrow().contains(*p))
        {
            return Ok(false);
        }

        let broken = self.system.broken.borrow();
        let mut installed = self.system.installed.borrow_mut();
        for package in packages {
            if !broken.contains(package) {
                installed.insert(package.clone());
            }
        }
        Ok(true)
    }
}
