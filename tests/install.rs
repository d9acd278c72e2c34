// tests/install.rs

//! Integration tests for install orchestration.
//!
//! Backends and the command runner are replaced by an in-memory package
//! state so that installs can be observed without touching the host.

mod common;

use common::{FakeSystem, setup_stack_tree, ubuntu_context};
use rosdep::{Error, InstallOptions, RosdepInstaller, RosdepLookup};

fn packages(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

fn noninteractive() -> InstallOptions {
    InstallOptions {
        interactive: false,
        ..InstallOptions::default()
    }
}

#[test]
fn test_simulate_prints_without_running() {
    let (_temp, config) = setup_stack_tree();
    let mut lookup = RosdepLookup::create_from_config(&config).unwrap();
    let system = FakeSystem::default();
    let mut context = ubuntu_context();
    system.install_backends(&mut context);

    let options = InstallOptions {
        simulate: true,
        ..InstallOptions::default()
    };
    let mut installer = RosdepInstaller::with_runner(&context, &mut lookup, system.runner())
        .with_output(system.output());
    let report = installer.install(&packages(&["stack1_p1"]), &options).unwrap();

    assert_eq!(
        system.output.contents(),
        "# stack1_dep1 [apt]\nfake-apt install dep1-ubuntu\n\
         # stack1_p1_dep1 [apt]\nfake-apt install shared\n"
    );
    assert_eq!(report.simulated, vec!["stack1_dep1", "stack1_p1_dep1"]);
    assert!(report.installed.is_empty());
    let commands: Vec<String> = report.commands.iter().map(ToString::to_string).collect();
    assert_eq!(
        commands,
        vec!["fake-apt install dep1-ubuntu", "fake-apt install shared"]
    );
    assert!(system.commands().is_empty());
}

#[test]
fn test_verbose_prints_each_command_before_running_it() {
    let (_temp, config) = setup_stack_tree();
    let mut lookup = RosdepLookup::create_from_config(&config).unwrap();
    let system = FakeSystem::default();
    let mut context = ubuntu_context();
    system.install_backends(&mut context);

    let options = InstallOptions {
        verbose: true,
        ..noninteractive()
    };
    let mut installer = RosdepInstaller::with_runner(&context, &mut lookup, system.runner())
        .with_output(system.output());
    installer.install(&packages(&["pyapp"]), &options).unwrap();

    assert_eq!(
        system.output.contents(),
        "# python [apt]\nfake-apt install -y python3\n\
         # pydep [pip]\nfake-pip install -y requests\n"
    );
    assert_eq!(*system.announced.borrow(), vec![true, true]);
}

#[test]
fn test_quiet_install_prints_nothing() {
    let (_temp, config) = setup_stack_tree();
    let mut lookup = RosdepLookup::create_from_config(&config).unwrap();
    let system = FakeSystem::default();
    let mut context = ubuntu_context();
    system.install_backends(&mut context);

    let mut installer = RosdepInstaller::with_runner(&context, &mut lookup, system.runner())
        .with_output(system.output());
    let report = installer
        .install(&packages(&["stack1_p1"]), &noninteractive())
        .unwrap();

    assert_eq!(report.installed.len(), 2);
    assert!(system.output.contents().is_empty());
    assert_eq!(*system.announced.borrow(), vec![false, false]);
}

#[test]
fn test_install_missing_packages() {
    let (_temp, config) = setup_stack_tree();
    let mut lookup = RosdepLookup::create_from_config(&config).unwrap();
    let system = FakeSystem::default();
    system.preinstall("dep1-ubuntu");
    let mut context = ubuntu_context();
    system.install_backends(&mut context);

    let mut installer = RosdepInstaller::with_runner(&context, &mut lookup, system.runner());
    let report = installer
        .install(&packages(&["stack1_p2"]), &noninteractive())
        .unwrap();

    assert_eq!(report.skipped, vec!["stack1_dep1"]);
    assert_eq!(report.installed, vec!["stack1_dep2", "stack1_p2_dep1"]);
    assert_eq!(
        system.commands(),
        vec![
            "fake-apt install -y dep2-ubuntu shared",
            "fake-apt install -y p2dep1-jammy",
        ]
    );
    assert!(system.is_installed("shared"));
    assert!(system.is_installed("p2dep1-jammy"));
}

#[test]
fn test_second_install_is_a_no_op() {
    let (_temp, config) = setup_stack_tree();
    let mut lookup = RosdepLookup::create_from_config(&config).unwrap();
    let system = FakeSystem::default();
    let mut context = ubuntu_context();
    system.install_backends(&mut context);

    let mut installer = RosdepInstaller::with_runner(&context, &mut lookup, system.runner());
    installer
        .install(&packages(&["stack1_p1"]), &noninteractive())
        .unwrap();
    let report = installer
        .install(&packages(&["stack1_p1"]), &noninteractive())
        .unwrap();

    assert!(report.installed.is_empty());
    assert_eq!(report.skipped.len(), 2);
    assert_eq!(system.commands().len(), 2);
}

#[test]
fn test_dependencies_install_first() {
    let (_temp, config) = setup_stack_tree();
    let mut lookup = RosdepLookup::create_from_config(&config).unwrap();
    let system = FakeSystem::default();
    let mut context = ubuntu_context();
    system.install_backends(&mut context);

    let mut installer = RosdepInstaller::with_runner(&context, &mut lookup, system.runner());
    let report = installer
        .install(&packages(&["pyapp"]), &noninteractive())
        .unwrap();

    assert_eq!(report.installed, vec!["python", "pydep"]);
    assert_eq!(
        system.commands(),
        vec!["fake-apt install -y python3", "fake-pip install -y requests"]
    );
}

#[test]
fn test_dependency_cycle_is_detected() {
    let (_temp, config) = setup_stack_tree();
    let mut lookup = RosdepLookup::create_from_config(&config).unwrap();
    let system = FakeSystem::default();
    let mut context = ubuntu_context();
    system.install_backends(&mut context);

    let mut installer = RosdepInstaller::with_runner(&context, &mut lookup, system.runner());
    let err = installer
        .install(&packages(&["cyc_p"]), &noninteractive())
        .unwrap_err();

    match err {
        Error::CycleDetected(chain) => assert_eq!(chain, vec!["cyc_a", "cyc_b", "cyc_a"]),
        other => panic!("expected a cycle, got {}", other),
    }
    assert!(system.commands().is_empty());
}

#[test]
fn test_first_failure_aborts() {
    let (_temp, config) = setup_stack_tree();
    let mut lookup = RosdepLookup::create_from_config(&config).unwrap();
    let system = FakeSystem::default();
    system.failing.borrow_mut().insert("dep1-ubuntu".to_string());
    let mut context = ubuntu_context();
    system.install_backends(&mut context);

    let mut installer = RosdepInstaller::with_runner(&context, &mut lookup, system.runner());
    let err = installer
        .install(&packages(&["stack1_p2"]), &noninteractive())
        .unwrap_err();

    match err {
        Error::InstallFailed(failure) => {
            assert_eq!(failure.key, "stack1_dep1");
            assert_eq!(
                failure.command.as_deref(),
                Some("fake-apt install -y dep1-ubuntu")
            );
        }
        other => panic!("expected an install failure, got {}", other),
    }
    assert_eq!(system.commands().len(), 1);
}

#[test]
fn test_continue_on_error_collects_failures() {
    let (_temp, config) = setup_stack_tree();
    let mut lookup = RosdepLookup::create_from_config(&config).unwrap();
    let system = FakeSystem::default();
    system.failing.borrow_mut().insert("dep1-ubuntu".to_string());
    system.broken.borrow_mut().insert("p2dep1-jammy".to_string());
    let mut context = ubuntu_context();
    system.install_backends(&mut context);

    let options = InstallOptions {
        continue_on_error: true,
        ..noninteractive()
    };
    let mut installer = RosdepInstaller::with_runner(&context, &mut lookup, system.runner());
    let err = installer
        .install(&packages(&["stack1_p2"]), &options)
        .unwrap_err();

    match &err {
        Error::MultipleInstallsFailed(failures) => {
            let keys: Vec<&str> = failures.iter().map(|f| f.key.as_str()).collect();
            assert_eq!(keys, vec!["stack1_dep1", "stack1_p2_dep1"]);
            assert!(failures[1].cause.contains("p2dep1-jammy"));
        }
        other => panic!("expected aggregated failures, got {}", other),
    }
    assert!(err.to_string().starts_with("2 rosdep(s) failed to install"));
    assert!(system.is_installed("dep2-ubuntu"));
    assert_eq!(system.commands().len(), 3);
}

#[test]
fn test_unresolvable_key_fails_install() {
    let (_temp, config) = setup_stack_tree();
    let mut lookup = RosdepLookup::create_from_config(&config).unwrap();
    let system = FakeSystem::default();
    let mut context = ubuntu_context();
    system.install_backends(&mut context);

    let mut installer = RosdepInstaller::with_runner(&context, &mut lookup, system.runner());
    let err = installer
        .install(&packages(&["both_p"]), &noninteractive())
        .unwrap_err();

    match err {
        Error::InstallFailed(failure) => {
            assert_eq!(failure.key, "twin");
            assert!(failure.command.is_none());
        }
        other => panic!("expected an install failure, got {}", other),
    }
}

#[test]
fn test_get_uninstalled() {
    let (_temp, config) = setup_stack_tree();
    let mut lookup = RosdepLookup::create_from_config(&config).unwrap();
    let system = FakeSystem::default();
    system.preinstall("shared");
    let mut context = ubuntu_context();
    system.install_backends(&mut context);

    let mut installer = RosdepInstaller::with_runner(&context, &mut lookup, system.runner());
    let (uninstalled, errors) = installer
        .get_uninstalled(&packages(&["stack1_p1", "stack1_p2"]))
        .unwrap();

    assert!(errors.is_empty());
    assert_eq!(
        uninstalled["apt"],
        vec!["dep1-ubuntu", "dep2-ubuntu", "p2dep1-jammy"]
    );
}

#[test]
fn test_shared_failing_dependency_runs_once() {
    let (_temp, config) = setup_stack_tree();
    let mut lookup = RosdepLookup::create_from_config(&config).unwrap();
    let system = FakeSystem::default();
    system.failing.borrow_mut().insert("cpkg".to_string());
    let mut context = ubuntu_context();
    system.install_backends(&mut context);

    let options = InstallOptions {
        continue_on_error: true,
        ..noninteractive()
    };
    let mut installer = RosdepInstaller::with_runner(&context, &mut lookup, system.runner());
    let err = installer
        .install(&packages(&["deps_p"]), &options)
        .unwrap_err();

    match err {
        Error::MultipleInstallsFailed(failures) => {
            let keys: Vec<&str> = failures.iter().map(|f| f.key.as_str()).collect();
            assert_eq!(keys, vec!["kc", "ka", "kb"]);
            assert_eq!(failures[0].command.as_deref(), Some("fake-apt install -y cpkg"));
            for parent in &failures[1..] {
                assert!(parent.command.is_none());
                assert_eq!(parent.cause, "dependency [kc] failed");
            }
        }
        other => panic!("expected aggregated failures, got {}", other),
    }
    assert_eq!(system.commands(), vec!["fake-apt install -y cpkg"]);
    assert!(!system.is_installed("ka-pkg"));
    assert!(!system.is_installed("kb-pkg"));
}

#[test]
fn test_failing_dependency_aborts_parent() {
    let (_temp, config) = setup_stack_tree();
    let mut lookup = RosdepLookup::create_from_config(&config).unwrap();
    let system = FakeSystem::default();
    system.failing.borrow_mut().insert("cpkg".to_string());
    let mut context = ubuntu_context();
    system.install_backends(&mut context);

    let mut installer = RosdepInstaller::with_runner(&context, &mut lookup, system.runner());
    let err = installer
        .install(&packages(&["deps_p"]), &noninteractive())
        .unwrap_err();

    match err {
        Error::InstallFailed(failure) => assert_eq!(failure.key, "kc"),
        other => panic!("expected an install failure, got {}", other),
    }
    assert_eq!(system.commands().len(), 1);
}

#[test]
fn test_release_without_rule_fails_install() {
    let (_temp, config) = setup_stack_tree();
    let mut lookup = RosdepLookup::create_from_config(&config).unwrap();
    let system = FakeSystem::default();
    let mut context = ubuntu_context();
    context.set_os_override("ubuntu", "noble");
    system.install_backends(&mut context);

    let mut installer = RosdepInstaller::with_runner(&context, &mut lookup, system.runner());
    let err = installer
        .install(&packages(&["stack1_p2"]), &noninteractive())
        .unwrap_err();

    match err {
        Error::InstallFailed(failure) => {
            assert_eq!(failure.key, "stack1_p2_dep1");
            assert!(failure.command.is_none());
            assert!(failure.cause.contains("noble"), "{}", failure.cause);
        }
        other => panic!("expected an install failure, got {}", other),
    }
    assert_eq!(
        system.commands(),
        vec!["fake-apt install -y dep1-ubuntu", "fake-apt install -y dep2-ubuntu shared"]
    );
}
